//! Extracteur MFCC de référence.
//!
//! Frames centrées (padding reflect), Hann, spectre de puissance, banc de
//! filtres mel triangulaire, dB avec plancher à 80 dB sous le maximum, DCT-II
//! orthonormée. Sortie : coefficients × frames.

use pc_core::config::PassConfig;
use pc_core::error::PipelineError;
use pc_core::traits::FeatureExtractor;
use pc_core::window::{AudioWindow, FeatureMatrix};

use crate::fft::FftPipeline;

/// Dynamique conservée sous le maximum du spectrogramme mel.
const TOP_DB: f32 = 80.0;
/// Plancher de puissance avant passage en dB.
const AMIN: f32 = 1e-10;

/// Paramètres fixes de l'algorithme.
#[derive(Clone, Debug, PartialEq)]
pub struct MfccParams {
    /// Input sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per window.
    pub window_samples: usize,
    /// Output coefficients per frame.
    pub num_coefficients: usize,
    /// Mel bands.
    pub num_bands: usize,
    /// FFT frame size.
    pub fft_size: usize,
    /// Hop between frames.
    pub hop_size: usize,
    /// Lowest filter edge in Hz.
    pub f_min: f32,
    /// Highest filter edge in Hz.
    pub f_max: f32,
}

impl MfccParams {
    /// Parameters from the `[audio]` and `[features]` sections.
    #[must_use]
    pub fn from_config(config: &PassConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            window_samples: config.window_samples,
            num_coefficients: config.num_coefficients,
            num_bands: config.num_bands,
            fft_size: config.fft_size,
            hop_size: config.hop_size,
            f_min: config.f_min,
            f_max: config.f_max,
        }
    }

    /// Frames per window with centered framing.
    #[must_use]
    pub fn num_frames(&self) -> usize {
        1 + self.window_samples / self.hop_size.max(1)
    }
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// Banc de filtres mel triangulaire, `[num_bands][num_bins]` aplati.
fn mel_filter_bank(params: &MfccParams, num_bins: usize) -> Vec<f32> {
    let low_mel = hz_to_mel(params.f_min);
    let high_mel = hz_to_mel(params.f_max);
    let step = (high_mel - low_mel) / (params.num_bands + 1) as f32;

    let mut bins: Vec<usize> = (0..params.num_bands + 2)
        .map(|i| {
            let hz = mel_to_hz(low_mel + i as f32 * step);
            let bin = (hz * params.fft_size as f32 / params.sample_rate as f32).round() as usize;
            bin.min(num_bins - 1)
        })
        .collect();

    // Chaque filtre couvre au moins un bin
    for i in 1..bins.len() {
        if bins[i] <= bins[i - 1] {
            bins[i] = bins[i - 1] + 1;
        }
    }

    let mut bank = vec![0.0f32; params.num_bands * num_bins];
    for m in 0..params.num_bands {
        let (left, center, right) = (bins[m], bins[m + 1], bins[m + 2]);
        let filter = &mut bank[m * num_bins..(m + 1) * num_bins];
        for k in left..center.min(num_bins) {
            filter[k] = (k - left) as f32 / (center - left) as f32;
        }
        for k in center..=right.min(num_bins - 1) {
            filter[k] = (right - k) as f32 / (right - center) as f32;
        }
    }
    bank
}

/// Matrice DCT-II orthonormée, `[num_coefficients][num_bands]` aplatie.
fn dct_matrix(num_coefficients: usize, num_bands: usize) -> Vec<f32> {
    let n = num_bands as f32;
    let mut dct = vec![0.0f32; num_coefficients * num_bands];
    for k in 0..num_coefficients {
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        for b in 0..num_bands {
            dct[k * num_bands + b] =
                scale * (std::f32::consts::PI / n * (b as f32 + 0.5) * k as f32).cos();
        }
    }
    dct
}

/// Reflect padding index: `-1 → 1`, `n → n - 2`.
#[inline(always)]
fn reflect(i: isize, n: usize) -> usize {
    let last = n as isize - 1;
    let mut j = i;
    if j < 0 {
        j = -j;
    }
    if j > last {
        j = 2 * last - j;
    }
    j.clamp(0, last) as usize
}

/// Extracteur MFCC, tous buffers alloués à la construction.
///
/// # Example
/// ```
/// use pc_audio::mfcc::{MfccExtractor, MfccParams};
/// use pc_core::config::PassConfig;
/// use pc_core::traits::FeatureExtractor;
///
/// let extractor = MfccExtractor::new(MfccParams::from_config(&PassConfig::default()));
/// assert_eq!(extractor.output_shape(), (40, 16));
/// ```
pub struct MfccExtractor {
    params: MfccParams,
    fft: FftPipeline,
    mel_bank: Vec<f32>,
    dct: Vec<f32>,
    frame_buf: Vec<f32>,
    power_buf: Vec<f32>,
    /// Mel dB, `[frames][bands]`.
    mel_db: Vec<f32>,
}

impl MfccExtractor {
    /// Build the filterbank, DCT matrix and working buffers.
    ///
    /// # Panics
    /// Panics if `params.fft_size` is 0 (rejected earlier by config validation).
    #[must_use]
    pub fn new(params: MfccParams) -> Self {
        let fft = FftPipeline::new(params.fft_size);
        let num_bins = fft.num_bins();
        let mel_bank = mel_filter_bank(&params, num_bins);
        let dct = dct_matrix(params.num_coefficients, params.num_bands);
        let frames = params.num_frames();
        Self {
            frame_buf: vec![0.0; params.fft_size],
            power_buf: vec![0.0; num_bins],
            mel_db: vec![0.0; frames * params.num_bands],
            params,
            fft,
            mel_bank,
            dct,
        }
    }
}

impl FeatureExtractor for MfccExtractor {
    fn output_shape(&self) -> (usize, usize) {
        (self.params.num_coefficients, self.params.num_frames())
    }

    fn extract(
        &mut self,
        window: &AudioWindow,
        out: &mut FeatureMatrix,
    ) -> Result<(), PipelineError> {
        let samples = window.samples();
        let n = samples.len();
        if n != self.params.window_samples {
            return Err(PipelineError::FeatureExtraction(format!(
                "fenêtre de {n} échantillons, {} attendus",
                self.params.window_samples
            )));
        }
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(PipelineError::FeatureExtraction(
                "échantillon non fini dans la fenêtre".into(),
            ));
        }
        let (rows, cols) = self.output_shape();
        if out.rows() != rows || out.cols() != cols {
            return Err(PipelineError::FeatureExtraction(format!(
                "matrice {}×{}, {rows}×{cols} attendue",
                out.rows(),
                out.cols()
            )));
        }

        let bands = self.params.num_bands;
        let num_bins = self.power_buf.len();
        let pad = (self.params.fft_size / 2) as isize;
        let mut max_db = f32::NEG_INFINITY;

        for frame in 0..cols {
            let start = (frame * self.params.hop_size) as isize - pad;
            for (i, slot) in self.frame_buf.iter_mut().enumerate() {
                *slot = samples[reflect(start + i as isize, n)];
            }
            self.fft
                .power_spectrum(&self.frame_buf, &mut self.power_buf)
                .map_err(PipelineError::FeatureExtraction)?;

            for m in 0..bands {
                let filter = &self.mel_bank[m * num_bins..(m + 1) * num_bins];
                let energy: f32 = filter
                    .iter()
                    .zip(&self.power_buf)
                    .map(|(w, p)| w * p)
                    .sum();
                let db = 10.0 * energy.max(AMIN).log10();
                max_db = max_db.max(db);
                self.mel_db[frame * bands + m] = db;
            }
        }

        let floor = max_db - TOP_DB;
        for v in &mut self.mel_db {
            *v = v.max(floor);
        }

        for frame in 0..cols {
            let mel = &self.mel_db[frame * bands..(frame + 1) * bands];
            for k in 0..rows {
                let basis = &self.dct[k * bands..(k + 1) * bands];
                let c: f32 = basis.iter().zip(mel).map(|(b, m)| b * m).sum();
                out.set(k, frame, c);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> MfccParams {
        MfccParams {
            sample_rate: 4000,
            window_samples: 1024,
            num_coefficients: 13,
            num_bands: 20,
            fft_size: 256,
            hop_size: 128,
            f_min: 20.0,
            f_max: 2000.0,
        }
    }

    #[test]
    fn reflect_mirrors_edges() {
        assert_eq!(reflect(-1, 5), 1);
        assert_eq!(reflect(-3, 5), 3);
        assert_eq!(reflect(5, 5), 3);
        assert_eq!(reflect(2, 5), 2);
    }

    #[test]
    fn default_shape_matches_model_input() {
        let params = MfccParams::from_config(&PassConfig::default());
        assert_eq!(params.num_frames(), 16);
    }

    #[test]
    fn filters_are_non_negative_and_non_empty() {
        let params = small_params();
        let bank = mel_filter_bank(&params, 129);
        for m in 0..params.num_bands {
            let filter = &bank[m * 129..(m + 1) * 129];
            assert!(filter.iter().all(|&w| w >= 0.0));
            assert!(filter.iter().any(|&w| w > 0.0), "filtre {m} vide");
        }
    }

    #[test]
    fn dct_rows_are_orthonormal() {
        let dct = dct_matrix(4, 8);
        for a in 0..4 {
            for b in 0..4 {
                let dot: f32 = (0..8).map(|i| dct[a * 8 + i] * dct[b * 8 + i]).sum();
                let want = if a == b { 1.0 } else { 0.0 };
                assert!((dot - want).abs() < 1e-5, "({a},{b}) = {dot}");
            }
        }
    }

    #[test]
    fn extract_is_deterministic() {
        let params = small_params();
        let samples: Vec<f32> = (0..1024).map(|i| (i as f32 * 0.3).sin() * 0.5).collect();
        let window = AudioWindow::from(samples);
        let mut ex = MfccExtractor::new(params);
        let (rows, cols) = ex.output_shape();
        let mut a = FeatureMatrix::new(rows, cols);
        let mut b = FeatureMatrix::new(rows, cols);
        ex.extract(&window, &mut a).unwrap();
        ex.extract(&window, &mut b).unwrap();
        assert_eq!(a.data(), b.data());
        assert!(a.data().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn wrong_window_length_fails() {
        let mut ex = MfccExtractor::new(small_params());
        let (rows, cols) = ex.output_shape();
        let mut out = FeatureMatrix::new(rows, cols);
        let err = ex.extract(&AudioWindow::new(100), &mut out).unwrap_err();
        assert!(matches!(err, PipelineError::FeatureExtraction(_)));
    }

    #[test]
    fn non_finite_sample_fails() {
        let mut samples = vec![0.1f32; 1024];
        samples[17] = f32::NAN;
        let mut ex = MfccExtractor::new(small_params());
        let (rows, cols) = ex.output_shape();
        let mut out = FeatureMatrix::new(rows, cols);
        assert!(ex.extract(&AudioWindow::from(samples), &mut out).is_err());
    }
}
