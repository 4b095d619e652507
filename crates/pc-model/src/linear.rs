use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use pc_core::error::PipelineError;
use pc_core::traits::Classifier;
use pc_core::window::{FeatureTensor, ScoreVector};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::quant::QuantParams;

/// Fichier de modèle JSON tel qu'écrit par l'outillage d'entraînement.
///
/// `weights[c]` couvre le tenseur aplati `frames × coefficients`, frame-major.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelFile {
    /// Frames per input tensor.
    pub frames: usize,
    /// Coefficients per frame.
    pub coefficients: usize,
    /// Class names, informative only.
    #[serde(default)]
    pub labels: Vec<String>,
    /// One row of `frames × coefficients` weights per class.
    pub weights: Vec<Vec<f32>>,
    /// One bias per class.
    pub bias: Vec<f32>,
    /// Optional int8 input quantization.
    #[serde(default)]
    pub input_quant: Option<QuantParams>,
}

#[derive(Debug)]
struct Weights {
    frames: usize,
    coefficients: usize,
    classes: usize,
    /// `[classes][frames × coefficients]` aplati.
    matrix: Vec<f32>,
    bias: Vec<f32>,
    quant: Option<QuantParams>,
    labels: Vec<String>,
}

/// Softmax stable en place (soustraction du maximum).
///
/// # Example
/// ```
/// use pc_model::linear::softmax_in_place;
/// let mut v = [1.0f32, 1.0];
/// softmax_in_place(&mut v);
/// assert_eq!(v, [0.5, 0.5]);
/// ```
pub fn softmax_in_place(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return;
    }
    let mut sum = 0.0f32;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        for v in values.iter_mut() {
            *v /= sum;
        }
    }
}

/// Classifieur de référence : couche dense puis softmax.
///
/// Les poids sont partagés (`Arc`) entre clones ; chaque clone garde son
/// propre buffer d'entrée, ce qui permet un clone par worker en mode batch.
///
/// # Example
/// ```
/// use pc_core::traits::Classifier;
/// use pc_core::window::{FeatureTensor, ScoreVector};
/// use pc_model::{LinearClassifier, ModelFile};
///
/// let model = ModelFile {
///     frames: 1,
///     coefficients: 2,
///     labels: vec![],
///     weights: vec![vec![0.0, 0.0], vec![1.0, 1.0]],
///     bias: vec![0.0, 0.0],
///     input_quant: None,
/// };
/// let mut clf = LinearClassifier::from_model(model).unwrap();
/// let mut scores = ScoreVector::zeros(2);
/// clf.infer(&FeatureTensor::new(1, 2), &mut scores).unwrap();
/// assert_eq!(scores.scores(), &[0.5, 0.5]);
/// ```
#[derive(Clone, Debug)]
pub struct LinearClassifier {
    weights: Arc<Weights>,
    input: Vec<f32>,
}

impl LinearClassifier {
    /// Validate a parsed model file and build the classifier.
    ///
    /// # Errors
    /// [`ModelError`] if shapes are inconsistent, a parameter is not finite,
    /// or quantization parameters are invalid.
    pub fn from_model(model: ModelFile) -> Result<Self, ModelError> {
        let classes = model.weights.len();
        let inputs = model.frames * model.coefficients;
        if inputs == 0 || classes == 0 {
            return Err(ModelError::InvalidShape {
                frames: model.frames,
                coefficients: model.coefficients,
                classes,
            });
        }
        if model.bias.len() != classes {
            return Err(ModelError::Bias {
                len: model.bias.len(),
                classes,
            });
        }
        if let Some(q) = model.input_quant
            && !q.is_valid()
        {
            return Err(ModelError::Quantization {
                scale: q.scale,
                zero_point: q.zero_point,
            });
        }

        let mut matrix = Vec::with_capacity(classes * inputs);
        for (class, row) in model.weights.iter().enumerate() {
            if row.len() != inputs {
                return Err(ModelError::WeightRow {
                    class,
                    len: row.len(),
                    expected: inputs,
                });
            }
            matrix.extend_from_slice(row);
        }
        if matrix.iter().chain(&model.bias).any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite);
        }

        Ok(Self {
            weights: Arc::new(Weights {
                frames: model.frames,
                coefficients: model.coefficients,
                classes,
                matrix,
                bias: model.bias,
                quant: model.input_quant,
                labels: model.labels,
            }),
            input: vec![0.0; inputs],
        })
    }

    /// Parse a JSON model.
    ///
    /// # Errors
    /// Returns an error on malformed JSON or an invalid model.
    pub fn from_json(content: &str) -> Result<Self> {
        let model: ModelFile = serde_json::from_str(content).context("Modèle JSON illisible")?;
        Ok(Self::from_model(model)?)
    }

    /// Load a JSON model from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the model is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire le modèle : {}", path.display()))?;
        let clf = Self::from_json(&content)
            .with_context(|| format!("Modèle invalide : {}", path.display()))?;
        let (frames, coeffs) = clf.input_shape();
        log::info!(
            "Modèle chargé : {}×{} → {} classes{}",
            frames,
            coeffs,
            clf.num_classes(),
            match clf.quantization() {
                Some(q) => format!(" (entrée int8, échelle {}, zéro {})", q.scale, q.zero_point),
                None => String::new(),
            }
        );
        Ok(clf)
    }

    /// Class names declared in the model file, possibly empty.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.weights.labels
    }

    /// Input quantization, if any.
    #[must_use]
    pub fn quantization(&self) -> Option<QuantParams> {
        self.weights.quant
    }
}

impl Classifier for LinearClassifier {
    fn input_shape(&self) -> (usize, usize) {
        (self.weights.frames, self.weights.coefficients)
    }

    fn num_classes(&self) -> usize {
        self.weights.classes
    }

    fn infer(&mut self, tensor: &FeatureTensor, out: &mut ScoreVector) -> Result<(), PipelineError> {
        let w = &*self.weights;
        if tensor.frames() != w.frames || tensor.coefficients() != w.coefficients {
            return Err(PipelineError::Inference(format!(
                "tenseur {}×{}, {}×{} attendu",
                tensor.frames(),
                tensor.coefficients(),
                w.frames,
                w.coefficients
            )));
        }
        if out.len() != w.classes {
            return Err(PipelineError::Inference(format!(
                "{} scores demandés, le modèle a {} classes",
                out.len(),
                w.classes
            )));
        }

        let input: &[f32] = match w.quant {
            Some(q) => {
                self.input.copy_from_slice(tensor.data());
                q.snap_in_place(&mut self.input);
                &self.input
            }
            None => tensor.data(),
        };
        if input.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::Inference(
                "entrée non finie dans le tenseur".into(),
            ));
        }

        let n = input.len();
        for (class, slot) in out.scores_mut().iter_mut().enumerate() {
            let row = &w.matrix[class * n..(class + 1) * n];
            let dot: f32 = row.iter().zip(input).map(|(a, b)| a * b).sum();
            *slot = w.bias[class] + dot;
        }
        softmax_in_place(out.scores_mut());
        Ok(())
    }
}
