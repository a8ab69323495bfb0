//! Tree-ensemble adapters: Implementations of `Regressor`.
//!
//! Two interchangeable exports of the offline training pipeline are
//! supported. Exactly one is active per process, chosen once at startup.

mod boosted;
mod forest;
pub mod tree;

pub use boosted::{BoostedTree, GradientBoostedRegressor, GRADIENT_BOOSTED_KIND};
pub use forest::{RandomForestRegressor, RANDOM_FOREST_KIND};

use crate::domain::RawTargets;
use crate::ports::{ModelError, Regressor};

/// Which model export is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    /// Variant A, tried first
    RandomForest,
    /// Variant B, fallback
    GradientBoosted,
}

impl std::fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RandomForest => write!(f, "RandomForest"),
            Self::GradientBoosted => write!(f, "XGBoost"),
        }
    }
}

/// The model selected at startup.
#[derive(Debug, Clone)]
pub enum ActiveModel {
    RandomForest(RandomForestRegressor),
    GradientBoosted(GradientBoostedRegressor),
}

impl ActiveModel {
    #[must_use]
    pub fn variant(&self) -> ModelVariant {
        match self {
            Self::RandomForest(_) => ModelVariant::RandomForest,
            Self::GradientBoosted(_) => ModelVariant::GradientBoosted,
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            Self::RandomForest(m) => m,
            Self::GradientBoosted(m) => m,
        }
    }
}

impl Regressor for ActiveModel {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn predict(&self, scaled: &[f64]) -> Result<RawTargets, ModelError> {
        self.inner().predict(scaled)
    }
}
