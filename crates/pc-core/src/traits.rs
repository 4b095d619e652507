use crate::error::PipelineError;
use crate::event::ClassificationEvent;
use crate::window::{AudioWindow, FeatureMatrix, FeatureTensor, ScoreVector};

/// Fournit des fenêtres audio de longueur fixe au pipeline.
///
/// Implémenté par : `StreamSource`, `SampleSource`.
///
/// # Example
/// ```
/// use pc_core::traits::FrameSource;
/// use pc_core::window::AudioWindow;
/// use pc_core::error::PipelineError;
///
/// struct Silence;
/// impl FrameSource for Silence {
///     fn next_window(&mut self, window: &mut AudioWindow) -> Result<(), PipelineError> {
///         window.samples_mut().fill(0.0);
///         Ok(())
///     }
/// }
/// ```
pub trait FrameSource {
    /// Remplit `window` avec exactement `window.len()` nouveaux échantillons.
    ///
    /// Bloque jusqu'à ce que la fenêtre soit complète. Une fin de flux avant
    /// la fin de la fenêtre retourne `StreamExhausted` ; la fenêtre partielle
    /// est abandonnée et l'appel ne doit pas être réessayé.
    ///
    /// # Errors
    /// `StreamExhausted` at end of stream, `Io` on transport failure.
    fn next_window(&mut self, window: &mut AudioWindow) -> Result<(), PipelineError>;
}

/// Transforme une fenêtre pré-traitée en matrice de coefficients.
///
/// # Example
/// ```
/// use pc_core::traits::FeatureExtractor;
/// use pc_core::window::{AudioWindow, FeatureMatrix};
/// use pc_core::error::PipelineError;
///
/// struct Energy;
/// impl FeatureExtractor for Energy {
///     fn output_shape(&self) -> (usize, usize) { (1, 1) }
///     fn extract(&mut self, w: &AudioWindow, out: &mut FeatureMatrix) -> Result<(), PipelineError> {
///         let e: f32 = w.samples().iter().map(|s| s * s).sum();
///         out.set(0, 0, e);
///         Ok(())
///     }
/// }
/// ```
pub trait FeatureExtractor {
    /// `(coefficients, frames)` written by [`extract`](Self::extract).
    fn output_shape(&self) -> (usize, usize);

    /// Calcule les coefficients de `window` dans `out` (coefficients × frames).
    ///
    /// CONTRAT : déterministe, ne doit PAS allouer.
    ///
    /// # Errors
    /// `FeatureExtraction` when the window cannot be analysed.
    fn extract(
        &mut self,
        window: &AudioWindow,
        out: &mut FeatureMatrix,
    ) -> Result<(), PipelineError>;
}

/// Produit un vecteur de scores par classe à partir du tenseur de features.
///
/// # Example
/// ```
/// use pc_core::traits::Classifier;
/// use pc_core::window::{FeatureTensor, ScoreVector};
/// use pc_core::error::PipelineError;
///
/// struct AlwaysBackground;
/// impl Classifier for AlwaysBackground {
///     fn input_shape(&self) -> (usize, usize) { (16, 40) }
///     fn num_classes(&self) -> usize { 4 }
///     fn infer(&mut self, _t: &FeatureTensor, out: &mut ScoreVector) -> Result<(), PipelineError> {
///         out.scores_mut().fill(0.0);
///         out.scores_mut()[0] = 1.0;
///         Ok(())
///     }
/// }
/// ```
pub trait Classifier {
    /// `(frames, coefficients)` expected by the model.
    fn input_shape(&self) -> (usize, usize);

    /// Number of scores written per inference.
    fn num_classes(&self) -> usize;

    /// Écrit un score par classe dans `out`.
    ///
    /// En cas d'erreur, `out` peut être partiellement écrit : l'appelant ne
    /// doit pas le transmettre au moteur de vote.
    ///
    /// # Errors
    /// `Inference` when the model cannot run.
    fn infer(&mut self, tensor: &FeatureTensor, out: &mut ScoreVector)
    -> Result<(), PipelineError>;
}

/// Consomme les événements confirmés. Ne doit jamais échouer.
pub trait EventSink {
    /// Called once per confirmed transition.
    fn on_event(&mut self, event: &ClassificationEvent);
}
