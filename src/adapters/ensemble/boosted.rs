//! Gradient-boosted regressor (model variant B).
//!
//! One tree sequence per target with scalar leaves. The prediction for a
//! target is its base score plus the sum of its trees.

use serde::{Deserialize, Serialize};

use super::tree::{SplitRule, Tree};
use crate::domain::{RawTargets, N_TARGETS, TARGET_NAMES};
use crate::ports::{ModelError, Regressor};

/// Value of the `kind` field in a boosted export.
pub const GRADIENT_BOOSTED_KIND: &str = "gradient_boosted";

/// A boosted tree bound to one output target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedTree {
    pub target: usize,
    #[serde(flatten)]
    pub tree: Tree,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedFile {
    kind: String,
    n_features: usize,
    base_score: Vec<f64>,
    trees: Vec<BoostedTree>,
}

/// Multi-output gradient-boosted tree ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoostedFile", into = "BoostedFile")]
pub struct GradientBoostedRegressor {
    n_features: usize,
    base_score: RawTargets,
    trees: Vec<BoostedTree>,
}

impl TryFrom<BoostedFile> for GradientBoostedRegressor {
    type Error = ModelError;

    fn try_from(file: BoostedFile) -> Result<Self, Self::Error> {
        if file.kind != GRADIENT_BOOSTED_KIND {
            return Err(ModelError::Invalid(format!(
                "expected kind '{GRADIENT_BOOSTED_KIND}', found '{}'",
                file.kind
            )));
        }
        let base_score: RawTargets = file.base_score.as_slice().try_into().map_err(|_| {
            ModelError::Invalid(format!(
                "base_score has {} values, expected {N_TARGETS}",
                file.base_score.len()
            ))
        })?;
        Self::new(file.n_features, base_score, file.trees)
    }
}

impl From<GradientBoostedRegressor> for BoostedFile {
    fn from(model: GradientBoostedRegressor) -> Self {
        Self {
            kind: GRADIENT_BOOSTED_KIND.to_string(),
            n_features: model.n_features,
            base_score: model.base_score.to_vec(),
            trees: model.trees,
        }
    }
}

impl GradientBoostedRegressor {
    /// Build a boosted ensemble, validating every tree.
    ///
    /// # Errors
    /// Returns `ModelError::Invalid` on an unknown target index, a malformed
    /// tree, or a non-finite base score.
    pub fn new(
        n_features: usize,
        base_score: RawTargets,
        trees: Vec<BoostedTree>,
    ) -> Result<Self, ModelError> {
        if base_score.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Invalid("base_score has non-finite value".into()));
        }
        for (i, boosted) in trees.iter().enumerate() {
            if boosted.target >= N_TARGETS {
                return Err(ModelError::Invalid(format!(
                    "tree {i} targets output {}, model has {N_TARGETS}",
                    boosted.target
                )));
            }
            boosted
                .tree
                .validate(n_features, 1)
                .map_err(|e| ModelError::Invalid(format!("tree {i}: {e}")))?;
        }
        Ok(Self {
            n_features,
            base_score,
            trees,
        })
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for GradientBoostedRegressor {
    fn name(&self) -> &str {
        "XGBoost"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, scaled: &[f64]) -> Result<RawTargets, ModelError> {
        if scaled.len() != self.n_features {
            return Err(ModelError::FeatureCount {
                expected: self.n_features,
                actual: scaled.len(),
            });
        }

        let mut out = self.base_score;
        for boosted in &self.trees {
            out[boosted.target] += boosted.tree.leaf(scaled, SplitRule::Less)[0];
        }

        if let Some(i) = out.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite(TARGET_NAMES[i]));
        }
        Ok(out)
    }
}
