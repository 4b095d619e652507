use std::io::{ErrorKind, Read};
use std::path::Path;

use anyhow::Result;
use pc_core::config::PassConfig;
use pc_core::error::PipelineError;
use pc_core::traits::FrameSource;
use pc_core::window::AudioWindow;

use crate::decode;

/// Source sur un flux d'octets : échantillons f32 little-endian, mono.
///
/// Lit stdin, un port série exposé comme fichier, ou un fichier brut.
/// Le buffer d'octets est alloué une fois, à la taille d'une fenêtre.
/// Un délai dépassé (`TimedOut`, `WouldBlock`) remonte comme erreur non
/// terminale ; les octets déjà reçus sont conservés et l'appel suivant
/// complète la même fenêtre.
///
/// # Example
/// ```
/// use pc_audio::source::StreamSource;
/// use pc_core::traits::FrameSource;
/// use pc_core::window::AudioWindow;
///
/// let bytes: Vec<u8> = [0.5f32, -0.5].iter().flat_map(|s| s.to_le_bytes()).collect();
/// let mut source = StreamSource::new(bytes.as_slice(), 2);
/// let mut w = AudioWindow::new(2);
/// source.next_window(&mut w).unwrap();
/// assert_eq!(w.samples(), &[0.5, -0.5]);
/// assert!(source.next_window(&mut w).is_err());
/// ```
pub struct StreamSource<R: Read> {
    reader: R,
    bytes: Vec<u8>,
    filled: usize,
    windows_read: u64,
}

impl<R: Read> StreamSource<R> {
    /// Wrap `reader` for windows of `window_samples` samples.
    pub fn new(reader: R, window_samples: usize) -> Self {
        Self {
            reader,
            bytes: vec![0u8; window_samples * 4],
            filled: 0,
            windows_read: 0,
        }
    }

    /// Full windows delivered so far.
    #[must_use]
    pub fn windows_read(&self) -> u64 {
        self.windows_read
    }

    /// Lit jusqu'à remplir le buffer ou atteindre la fin du flux.
    ///
    /// `self.filled` survit à une erreur : rien n'est perdu sur un délai.
    fn fill(&mut self) -> Result<(), std::io::Error> {
        while self.filled < self.bytes.len() {
            match self.reader.read(&mut self.bytes[self.filled..]) {
                Ok(0) => break,
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<R: Read> FrameSource for StreamSource<R> {
    fn next_window(&mut self, window: &mut AudioWindow) -> Result<(), PipelineError> {
        debug_assert_eq!(window.len() * 4, self.bytes.len());
        let expected = window.len();
        self.fill()?;
        let filled = std::mem::take(&mut self.filled);
        if filled < self.bytes.len() {
            return Err(PipelineError::StreamExhausted {
                read: filled / 4,
                expected,
            });
        }
        for (slot, chunk) in window.samples_mut().iter_mut().zip(self.bytes.chunks_exact(4)) {
            *slot = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        self.windows_read += 1;
        Ok(())
    }
}

/// Source sur un enregistrement décodé en mémoire.
///
/// Avance de `stride` échantillons par fenêtre (recouvrement si
/// `stride < window`). La queue incomplète termine le flux.
///
/// # Example
/// ```
/// use pc_audio::source::SampleSource;
/// use pc_core::traits::FrameSource;
/// use pc_core::window::AudioWindow;
///
/// let mut source = SampleSource::new((0..10).map(|i| i as f32).collect(), 2);
/// let mut w = AudioWindow::new(4);
/// source.next_window(&mut w).unwrap();
/// source.next_window(&mut w).unwrap();
/// assert_eq!(w.samples(), &[2.0, 3.0, 4.0, 5.0]);
/// ```
pub struct SampleSource {
    samples: Vec<f32>,
    position: usize,
    stride: usize,
}

impl SampleSource {
    /// Serve `samples` with the given hop between windows.
    ///
    /// A zero stride is treated as 1.
    #[must_use]
    pub fn new(samples: Vec<f32>, stride: usize) -> Self {
        Self {
            samples,
            position: 0,
            stride: stride.max(1),
        }
    }

    /// Décode un fichier audio au taux cible de `config`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be decoded or resampled.
    pub fn from_file(path: &Path, config: &PassConfig) -> Result<Self> {
        let (samples, _) = decode::decode_file(path, config.sample_rate)?;
        let source = Self::new(samples, config.window_stride());
        if source.total_samples() < config.window_samples {
            log::warn!(
                "{} : {} échantillons, moins d'une fenêtre ({})",
                path.display(),
                source.total_samples(),
                config.window_samples
            );
        }
        Ok(source)
    }

    /// Total decoded samples.
    #[must_use]
    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }
}

impl FrameSource for SampleSource {
    fn next_window(&mut self, window: &mut AudioWindow) -> Result<(), PipelineError> {
        let expected = window.len();
        let end = self.position + expected;
        if end > self.samples.len() {
            let read = self.samples.len().saturating_sub(self.position);
            self.position = self.samples.len();
            return Err(PipelineError::StreamExhausted { read, expected });
        }
        window
            .samples_mut()
            .copy_from_slice(&self.samples[self.position..end]);
        self.position += self.stride;
        Ok(())
    }
}
