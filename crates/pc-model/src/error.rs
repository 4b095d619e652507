use thiserror::Error;

/// Errors originating from the model module.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Declared shape has a zero axis or no class.
    #[error("Forme de modèle invalide : {frames}×{coefficients}, {classes} classes")]
    InvalidShape {
        /// Frames declared by the model.
        frames: usize,
        /// Coefficients declared by the model.
        coefficients: usize,
        /// Number of weight rows.
        classes: usize,
    },

    /// A weight row does not cover the flattened input.
    #[error("Ligne de poids {class} : {len} valeurs, {expected} attendues")]
    WeightRow {
        /// Class of the faulty row.
        class: usize,
        /// Values found.
        len: usize,
        /// Values expected (`frames × coefficients`).
        expected: usize,
    },

    /// Bias length differs from the class count.
    #[error("Biais : {len} valeurs pour {classes} classes")]
    Bias {
        /// Values found.
        len: usize,
        /// Number of classes.
        classes: usize,
    },

    /// Non-finite weight or bias.
    #[error("Paramètre non fini dans le modèle")]
    NonFinite,

    /// Invalid quantization parameters.
    #[error("Quantification invalide : scale {scale}, zero_point {zero_point}")]
    Quantization {
        /// Declared scale.
        scale: f32,
        /// Declared zero point.
        zero_point: i32,
    },
}
