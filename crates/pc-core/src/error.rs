use thiserror::Error;

/// Errors originating from the core module.
///
/// Toutes ces erreurs sont fatales au démarrage : une configuration
/// incohérente n'est jamais corrigée à chaud.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Referenced file does not exist.
    #[error("Fichier introuvable : {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// Feature matrix and model input disagree.
    #[error("Forme incompatible : attendu {expected_frames}×{expected_coeffs}, obtenu {frames}×{coeffs}")]
    ShapeMismatch {
        /// Frames expected by the model.
        expected_frames: usize,
        /// Coefficients expected by the model.
        expected_coeffs: usize,
        /// Frames produced by the extractor.
        frames: usize,
        /// Coefficients produced by the extractor.
        coeffs: usize,
    },
}

/// Errors surfaced by one pipeline cycle.
///
/// Extraction and inference failures skip the cycle and leave the voting
/// state untouched. Source errors end the loop only when
/// [`PipelineError::is_terminal`] says so.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The stream ended before a full window was read. The partial window is discarded.
    #[error("Flux épuisé : {read}/{expected} échantillons lus")]
    StreamExhausted {
        /// Samples read before the end of stream.
        read: usize,
        /// Samples required for one window.
        expected: usize,
    },

    /// The feature extractor rejected the window.
    #[error("Échec de l'extraction de features : {0}")]
    FeatureExtraction(String),

    /// The classifier failed to produce a score vector.
    #[error("Échec de l'inférence : {0}")]
    Inference(String),

    /// Underlying transport error.
    #[error("Erreur d'entrée/sortie : {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// `true` when the loop cannot continue because the stream is over.
    ///
    /// Un délai de transport (`TimedOut`, `WouldBlock`, `Interrupted`) n'est
    /// pas terminal : la source reprend la fenêtre en cours au cycle suivant.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::StreamExhausted { .. } => true,
            Self::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
            ),
            Self::FeatureExtraction(_) | Self::Inference(_) => false,
        }
    }
}

/// A normalization stage met a signal too small to scale safely.
///
/// Recovered locally: the stage is skipped, the window is left as is.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("Signal dégénéré ({stage}) : niveau {level:e}")]
pub struct DegenerateSignal {
    /// Stage that skipped.
    pub stage: &'static str,
    /// Measured level (peak or RMS) that fell under the guard.
    pub level: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_exhausted_is_terminal() {
        let err = PipelineError::StreamExhausted {
            read: 12,
            expected: 8000,
        };
        assert!(err.is_terminal());
        assert!(err.to_string().contains("12/8000"));
    }

    #[test]
    fn inference_failure_is_not_terminal() {
        let err = PipelineError::Inference("tensor arena".into());
        assert!(!err.is_terminal());
        assert!(!PipelineError::FeatureExtraction("nan".into()).is_terminal());
    }

    #[test]
    fn transport_timeouts_are_recoverable() {
        use std::io::{Error, ErrorKind};
        for kind in [ErrorKind::TimedOut, ErrorKind::WouldBlock] {
            assert!(!PipelineError::Io(Error::new(kind, "uart")).is_terminal());
        }
        assert!(PipelineError::Io(Error::new(ErrorKind::BrokenPipe, "uart")).is_terminal());
    }
}
