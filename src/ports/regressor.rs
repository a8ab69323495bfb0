//! Regressor port: Trait for trained multi-output models.
//!
//! This trait abstracts the concrete model format from the prediction service.

use crate::domain::RawTargets;

/// Error type for model evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Model expects {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("Model produced a non-finite value for '{0}'")]
    NonFinite(&'static str),

    #[error("Invalid model: {0}")]
    Invalid(String),
}

/// Trait for a trained regressor mapping one scaled feature vector to the
/// six water-quality targets.
///
/// Implementations are immutable after loading and shared across threads.
pub trait Regressor: Send + Sync {
    /// Human-readable model name (for logs and health output).
    fn name(&self) -> &str;

    /// Number of input features the model was trained on.
    fn n_features(&self) -> usize;

    /// Predict raw target values, in `TARGET_NAMES` order.
    ///
    /// # Errors
    /// Returns `ModelError::FeatureCount` if `scaled` has the wrong length.
    fn predict(&self, scaled: &[f64]) -> Result<RawTargets, ModelError>;
}
