/// Classifieur de référence et quantification des tenseurs d'entrée.
///
/// Le moteur d'inférence réel est un collaborateur externe : ce crate fournit
/// une couche dense + softmax chargée depuis JSON, suffisante pour faire
/// tourner le pipeline de bout en bout.

pub mod error;
pub mod linear;
pub mod quant;

pub use error::ModelError;
pub use linear::{LinearClassifier, ModelFile};
pub use quant::QuantParams;
