//! Random forest regressor (model variant A).
//!
//! Every tree predicts all six targets; the forest averages them.

use serde::{Deserialize, Serialize};

use super::tree::{SplitRule, Tree};
use crate::domain::{RawTargets, N_TARGETS, TARGET_NAMES};
use crate::ports::{ModelError, Regressor};

/// Value of the `kind` field in a forest export.
pub const RANDOM_FOREST_KIND: &str = "random_forest";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestFile {
    kind: String,
    n_features: usize,
    trees: Vec<Tree>,
}

/// Multi-output random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ForestFile", into = "ForestFile")]
pub struct RandomForestRegressor {
    n_features: usize,
    trees: Vec<Tree>,
}

impl TryFrom<ForestFile> for RandomForestRegressor {
    type Error = ModelError;

    fn try_from(file: ForestFile) -> Result<Self, Self::Error> {
        if file.kind != RANDOM_FOREST_KIND {
            return Err(ModelError::Invalid(format!(
                "expected kind '{RANDOM_FOREST_KIND}', found '{}'",
                file.kind
            )));
        }
        Self::new(file.n_features, file.trees)
    }
}

impl From<RandomForestRegressor> for ForestFile {
    fn from(model: RandomForestRegressor) -> Self {
        Self {
            kind: RANDOM_FOREST_KIND.to_string(),
            n_features: model.n_features,
            trees: model.trees,
        }
    }
}

impl RandomForestRegressor {
    /// Build a forest, validating every tree.
    ///
    /// # Errors
    /// Returns `ModelError::Invalid` if there are no trees or a tree is malformed.
    pub fn new(n_features: usize, trees: Vec<Tree>) -> Result<Self, ModelError> {
        if trees.is_empty() {
            return Err(ModelError::Invalid("forest has no trees".into()));
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(n_features, N_TARGETS)
                .map_err(|e| ModelError::Invalid(format!("tree {i}: {e}")))?;
        }
        Ok(Self { n_features, trees })
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForestRegressor {
    fn name(&self) -> &str {
        "RandomForest"
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

        let mut sum = [0.0; N_TARGETS];
        for tree in &self.trees {
            for (acc, v) in sum.iter_mut().zip(tree.leaf(scaled, SplitRule::LessOrEqual)) {
                *acc += v;
            }
        }

        let n = self.trees.len() as f64;
        let out = sum.map(|s| s / n);
        if let Some(i) = out.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite(TARGET_NAMES[i]));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ensemble::tree::Node;

    fn stump(threshold: f64, low: f64, high: f64) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature: 1,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf(vec![low; N_TARGETS]),
                Node::Leaf(vec![high; N_TARGETS]),
            ],
        }
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest =
            RandomForestRegressor::new(2, vec![stump(0.0, 1.0, 3.0), stump(1.0, 5.0, 7.0)])
                .expect("valid forest");

        assert_eq!(forest.predict(&[0.0, -1.0]).expect("predict"), [3.0; N_TARGETS]);
        assert_eq!(forest.predict(&[0.0, 0.5]).expect("predict"), [4.0; N_TARGETS]);
        assert_eq!(forest.predict(&[0.0, 2.0]).expect("predict"), [5.0; N_TARGETS]);
    }

    #[test]
    fn test_wrong_feature_count() {
        let forest = RandomForestRegressor::new(2, vec![stump(0.0, 1.0, 3.0)]).expect("valid");
        assert_eq!(
            forest.predict(&[0.0]),
            Err(ModelError::FeatureCount {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_json_kind_checked() {
        let forest = RandomForestRegressor::new(2, vec![stump(0.0, 1.0, 3.0)]).expect("valid");
        let json = serde_json::to_string(&forest).expect("serialize");
        assert!(json.contains(RANDOM_FOREST_KIND));

        let back: RandomForestRegressor = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, forest);

        let wrong = json.replace(RANDOM_FOREST_KIND, "gradient_boosted");
        assert!(serde_json::from_str::<RandomForestRegressor>(&wrong).is_err());
    }

    #[test]
    fn test_empty_forest_rejected() {
        assert!(RandomForestRegressor::new(6, vec![]).is_err());
    }
}
