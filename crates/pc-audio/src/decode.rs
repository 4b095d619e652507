use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use pc_core::error::CoreError;
use rubato::{FftFixedInOut, Resampler};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Extensions acceptées par le décodeur et le mode batch.
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg"];

/// `true` si le chemin a une extension audio reconnue.
#[must_use]
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| AUDIO_EXTENSIONS.iter().any(|a| e.eq_ignore_ascii_case(a)))
}

/// Frames per resampler block.
const RESAMPLE_CHUNK: usize = 1024;

/// Rééchantillonne un signal mono de `source_rate` vers `target_rate`.
///
/// Resampler FFT de rubato, ratio quelconque. Le retard du filtre est
/// compensé : la sortie fait `len * target_rate / source_rate` échantillons,
/// alignée sur l'entrée.
///
/// # Errors
/// Returns an error if either rate is zero or rubato rejects the ratio.
///
/// # Example
/// ```
/// use pc_audio::decode::resample;
/// let out = resample(&vec![0.0; 4410], 44_100, 16_000).unwrap();
/// assert_eq!(out.len(), 1600);
/// ```
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if source_rate == 0 || target_rate == 0 {
        return Err(CoreError::Config(format!(
            "taux d'échantillonnage nul ({source_rate}Hz → {target_rate}Hz)"
        ))
        .into());
    }
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler = FftFixedInOut::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        RESAMPLE_CHUNK,
        1,
    )
    .with_context(|| format!("Resampler {source_rate}Hz → {target_rate}Hz"))?;

    let expected = (samples.len() as u64 * u64::from(target_rate) / u64::from(source_rate)) as usize;
    let delay = resampler.output_delay();
    let mut input = vec![Vec::with_capacity(resampler.input_frames_max())];
    let mut output = vec![vec![0.0f32; resampler.output_frames_max()]];
    let mut resampled = Vec::with_capacity(expected + delay + resampler.output_frames_max());
    let mut pos = 0;

    // Blocs complétés par des zéros jusqu'à vider le retard du filtre.
    while resampled.len() < expected + delay {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(samples.len());
        input[0].clear();
        input[0].extend_from_slice(&samples[pos..end]);
        input[0].resize(needed, 0.0);
        pos = end;

        let (_, written) = resampler
            .process_into_buffer(&input, &mut output, None)
            .context("Échec du rééchantillonnage")?;
        resampled.extend_from_slice(&output[0][..written]);
    }

    resampled.drain(..delay);
    resampled.truncate(expected);
    Ok(resampled)
}

/// Decode an audio file into mono f32 samples at `target_rate`.
///
/// Supports WAV, MP3, FLAC, OGG via symphonia. Channels are averaged to
/// mono, then resampled to the target rate with [`resample`].
///
/// # Errors
/// Returns an error if the file cannot be opened, decoded or resampled.
///
/// # Example
/// ```no_run
/// use pc_audio::decode::decode_file;
/// let (samples, sample_rate) = decode_file("pass.wav", 16000).unwrap();
/// assert_eq!(sample_rate, 16000);
/// ```
pub fn decode_file(path: impl AsRef<Path>, target_rate: u32) -> Result<(Vec<f32>, u32)> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Cannot open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(
        Box::new(file),
        symphonia::core::io::MediaSourceStreamOptions::default(),
    );

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Failed to probe audio format")?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .context("No default audio track found")?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Audio track has no sample rate")?;
    let channels = track
        .codec_params
        .channels
        .map_or(1, symphonia::core::audio::Channels::count);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let track_id = track.id;
    let mut mono: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut max_sample_frames: usize = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Audio decode packet error: {e}");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Audio decode frame error: {e}");
                continue;
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.capacity();
        // Reuse SampleBuffer: only reallocate if this packet is bigger than current capacity
        if sample_buf.is_none() || num_frames > max_sample_frames {
            sample_buf = Some(SampleBuffer::<f32>::new(num_frames as u64, spec));
            max_sample_frames = num_frames;
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        for chunk in buf.samples().chunks(channels) {
            mono.push(chunk.iter().sum::<f32>() / channels as f32);
        }
    }

    let samples = resample(&mono, sample_rate, target_rate)
        .with_context(|| format!("Taux incompatible pour {}", path.display()))?;

    log::info!(
        "Decoded {} samples @ {}Hz (Original {}Hz) from {}",
        samples.len(),
        target_rate,
        sample_rate,
        path.display()
    );

    Ok((samples, target_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// WAV PCM 16 bits minimal.
    fn write_wav(path: &Path, rate: u32, channels: u16, frames: &[i16]) {
        let data_len = (frames.len() * 2) as u32;
        let mut f = File::create(path).unwrap();
        f.write_all(b"RIFF").unwrap();
        f.write_all(&(36 + data_len).to_le_bytes()).unwrap();
        f.write_all(b"WAVEfmt ").unwrap();
        f.write_all(&16u32.to_le_bytes()).unwrap();
        f.write_all(&1u16.to_le_bytes()).unwrap();
        f.write_all(&channels.to_le_bytes()).unwrap();
        f.write_all(&rate.to_le_bytes()).unwrap();
        f.write_all(&(rate * u32::from(channels) * 2).to_le_bytes()).unwrap();
        f.write_all(&(channels * 2).to_le_bytes()).unwrap();
        f.write_all(&16u16.to_le_bytes()).unwrap();
        f.write_all(b"data").unwrap();
        f.write_all(&data_len.to_le_bytes()).unwrap();
        for s in frames {
            f.write_all(&s.to_le_bytes()).unwrap();
        }
    }

    #[test]
    fn audio_extensions_are_case_insensitive() {
        assert!(is_audio_file(Path::new("a/b/pass.WAV")));
        assert!(is_audio_file(Path::new("pass.flac")));
        assert!(!is_audio_file(Path::new("notes.txt")));
        assert!(!is_audio_file(Path::new("noext")));
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let input = [0.5, -0.25, 0.125];
        assert_eq!(resample(&input, 16_000, 16_000).unwrap(), input.to_vec());
    }

    #[test]
    fn resample_zero_rate_is_rejected() {
        assert!(resample(&[0.0; 8], 0, 16_000).is_err());
        assert!(resample(&[0.0; 8], 16_000, 0).is_err());
    }

    #[test]
    fn resample_keeps_dc_level_and_alignment() {
        // 0,1 s à 48 kHz : un échelon à mi-parcours doit rester à mi-parcours.
        let mut input = vec![0.0f32; 2400];
        input.extend(vec![0.5f32; 2400]);
        let out = resample(&input, 48_000, 16_000).unwrap();
        assert_eq!(out.len(), 1600);
        assert!(out[400].abs() < 0.02, "{}", out[400]);
        assert!((out[1200] - 0.5).abs() < 0.02, "{}", out[1200]);
    }

    #[test]
    fn decode_stereo_wav_to_mono_and_resample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        // 3200 trames stéréo à 32 kHz : gauche 16384, droite 0 → mono 0.25
        let frames: Vec<i16> = (0..3200).flat_map(|_| [16384i16, 0]).collect();
        write_wav(&path, 32_000, 2, &frames);

        let (samples, rate) = decode_file(&path, 16_000).unwrap();
        assert_eq!(rate, 16_000);
        assert_eq!(samples.len(), 1600);
        for s in &samples[200..1400] {
            assert!((s - 0.25).abs() < 1e-2, "{s}");
        }
    }

    #[test]
    fn decode_non_integer_ratios() {
        let dir = tempfile::tempdir().unwrap();
        for (rate, frames) in [(44_100u32, 4410usize), (22_050, 2205)] {
            let path = dir.path().join(format!("pass_{rate}.wav"));
            write_wav(&path, rate, 1, &vec![8192i16; frames]);

            let (samples, out_rate) = decode_file(&path, 16_000).unwrap();
            assert_eq!(out_rate, 16_000);
            assert_eq!(samples.len(), 1600, "{rate}Hz");
            assert!((samples[800] - 0.25).abs() < 1e-2, "{rate}Hz: {}", samples[800]);
        }
    }
}
