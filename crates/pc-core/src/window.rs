/// Fenêtre audio réutilisable. Pré-allouée, jamais redimensionnée en hot path.
///
/// Mono, f32. La longueur est fixée à la construction et reste constante
/// pendant toute la vie du process : la source la remplit en place à chaque cycle.
///
/// # Example
/// ```
/// use pc_core::window::AudioWindow;
/// let w = AudioWindow::new(8000);
/// assert_eq!(w.len(), 8000);
/// assert!(w.samples().iter().all(|&s| s == 0.0));
/// ```
#[derive(Clone, Debug)]
pub struct AudioWindow {
    samples: Box<[f32]>,
}

impl AudioWindow {
    /// Crée une fenêtre zéro-initialisée de `len` échantillons.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![0.0; len].into_boxed_slice(),
        }
    }

    /// Number of samples, constant for the lifetime of the window.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` for a zero-length window (rejected by config validation).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Lecture seule des échantillons.
    #[inline]
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Accès mutable pour la source et la chaîne de pré-traitement.
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }
}

impl From<Vec<f32>> for AudioWindow {
    fn from(samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into_boxed_slice(),
        }
    }
}

/// Scores par classe produits par le classifieur pour une fenêtre.
///
/// Un index est réservé à la classe "background". Le buffer est réutilisé
/// d'un cycle à l'autre ; le moteur de vote ne le reçoit qu'en lecture.
///
/// # Example
/// ```
/// use pc_core::window::ScoreVector;
/// let s = ScoreVector::from(vec![0.1, 0.7, 0.2]);
/// assert_eq!(s.argmax(), 1);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreVector {
    scores: Box<[f32]>,
}

impl ScoreVector {
    /// Vecteur zéro de `num_classes` entrées.
    #[must_use]
    pub fn zeros(num_classes: usize) -> Self {
        Self {
            scores: vec![0.0; num_classes].into_boxed_slice(),
        }
    }

    /// Number of classes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// `true` when the vector holds no class.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Per-class confidences.
    #[inline]
    #[must_use]
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    /// Mutable access, for classifiers writing into the reused buffer.
    #[inline]
    pub fn scores_mut(&mut self) -> &mut [f32] {
        &mut self.scores
    }

    /// Index of the highest score. Ties resolve to the lowest index.
    #[inline]
    #[must_use]
    pub fn argmax(&self) -> usize {
        argmax(&self.scores)
    }
}

impl From<Vec<f32>> for ScoreVector {
    fn from(scores: Vec<f32>) -> Self {
        Self {
            scores: scores.into_boxed_slice(),
        }
    }
}

/// Index of the largest value, lowest index on ties, 0 for an empty slice.
///
/// # Example
/// ```
/// use pc_core::window::argmax;
/// assert_eq!(argmax(&[0.2, 0.5, 0.5]), 1);
/// assert_eq!(argmax(&[]), 0);
/// ```
#[inline]
#[must_use]
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_value {
            best_value = v;
            best = i;
        }
    }
    best
}

/// Matrice de coefficients produite par l'extracteur : `rows` coefficients × `cols` frames.
///
/// Row-major, pré-allouée.
///
/// # Example
/// ```
/// use pc_core::window::FeatureMatrix;
/// let mut m = FeatureMatrix::new(40, 16);
/// m.set(3, 2, 1.5);
/// assert_eq!(m.get(3, 2), 1.5);
/// assert_eq!(m.data().len(), 640);
/// ```
#[derive(Clone, Debug)]
pub struct FeatureMatrix {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
}

impl FeatureMatrix {
    /// Crée une matrice zéro `rows × cols`.
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Number of coefficients.
    #[inline]
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of frames.
    #[inline]
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Valeur en (coefficient, frame).
    #[inline(always)]
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        debug_assert!(row < self.rows && col < self.cols, "feature out of bounds");
        self.data[row * self.cols + col]
    }

    /// Écrit la valeur en (coefficient, frame).
    #[inline(always)]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        debug_assert!(row < self.rows && col < self.cols, "feature out of bounds");
        self.data[row * self.cols + col] = value;
    }

    /// Raw row-major storage.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Tenseur d'entrée du modèle : `frames × coefficients`, row-major.
///
/// C'est la transposée de [`FeatureMatrix`], l'ordre d'axes attendu par le modèle.
///
/// # Example
/// ```
/// use pc_core::window::{FeatureMatrix, FeatureTensor};
/// let mut m = FeatureMatrix::new(2, 3);
/// m.set(1, 0, 7.0);
/// let mut t = FeatureTensor::new(3, 2);
/// t.fill_transposed(&m);
/// assert_eq!(t.data()[1], 7.0); // frame 0, coefficient 1
/// ```
#[derive(Clone, Debug)]
pub struct FeatureTensor {
    data: Vec<f32>,
    frames: usize,
    coefficients: usize,
}

impl FeatureTensor {
    /// Crée un tenseur zéro `frames × coefficients`.
    #[must_use]
    pub fn new(frames: usize, coefficients: usize) -> Self {
        Self {
            data: vec![0.0; frames * coefficients],
            frames,
            coefficients,
        }
    }

    /// Frames (first axis).
    #[inline]
    #[must_use]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Coefficients (second axis).
    #[inline]
    #[must_use]
    pub fn coefficients(&self) -> usize {
        self.coefficients
    }

    /// Flattened tensor, frame-major.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Copie `matrix` transposée (coefficients × frames → frames × coefficients).
    ///
    /// The caller checks shapes at startup; a mismatched matrix only fills
    /// the overlapping region.
    pub fn fill_transposed(&mut self, matrix: &FeatureMatrix) {
        debug_assert_eq!(matrix.rows(), self.coefficients);
        debug_assert_eq!(matrix.cols(), self.frames);
        let frames = self.frames.min(matrix.cols());
        let coeffs = self.coefficients.min(matrix.rows());
        for f in 0..frames {
            for c in 0..coeffs {
                self.data[f * self.coefficients + c] = matrix.get(c, f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.0, 0.0, 0.0]), 0);
        assert_eq!(argmax(&[0.1, 0.9, 0.9]), 1);
    }

    #[test]
    fn argmax_ignores_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.2, 0.1]), 1);
    }

    #[test]
    fn transpose_full_matrix() {
        let mut m = FeatureMatrix::new(3, 2);
        for r in 0..3 {
            for c in 0..2 {
                m.set(r, c, (r * 10 + c) as f32);
            }
        }
        let mut t = FeatureTensor::new(2, 3);
        t.fill_transposed(&m);
        assert_eq!(t.data(), &[0.0, 10.0, 20.0, 1.0, 11.0, 21.0]);
    }
}
