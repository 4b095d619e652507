/// Configuration, types, and shared structures for passcount.
///
/// This crate contains all shared types, traits, and configuration logic
/// used across the passcount workspace.

pub mod config;
pub mod error;
pub mod event;
pub mod traits;
pub mod window;

pub use config::PassConfig;
pub use error::{CoreError, DegenerateSignal, PipelineError};
pub use event::{ClassificationEvent, ConfirmedPolarity, Polarity};
pub use window::{AudioWindow, FeatureMatrix, FeatureTensor, ScoreVector};
