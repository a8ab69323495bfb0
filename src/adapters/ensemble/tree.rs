//! Binary decision trees shared by both ensemble formats.

use serde::{Deserialize, Serialize};

use crate::ports::ModelError;

/// One node of a serialized tree.
///
/// JSON: `{"split": {"feature": 0, "threshold": 0.5, "left": 1, "right": 2}}`
/// or `{"leaf": [7.1, 2.0]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(Vec<f64>),
}

/// Which side of a split a value equal to the threshold falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitRule {
    /// Go left when `x <= threshold` (random forest export)
    LessOrEqual,
    /// Go left when `x < threshold` (gradient boosting export)
    Less,
}

impl SplitRule {
    #[inline]
    fn goes_left(self, x: f64, threshold: f64) -> bool {
        match self {
            Self::LessOrEqual => x <= threshold,
            Self::Less => x < threshold,
        }
    }
}

/// A tree stored as a flat node array; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Check structural soundness.
    ///
    /// Children must point forward (index greater than the parent), which
    /// rules out cycles and guarantees traversal ends at a leaf.
    ///
    /// # Errors
    /// Returns `ModelError::Invalid` describing the first problem found.
    pub fn validate(&self, n_features: usize, leaf_len: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Invalid("tree has no nodes".into()));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(ModelError::Invalid(format!(
                            "node {i} splits on feature {feature}, model has {n_features}"
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(ModelError::Invalid(format!("node {i} has NaN threshold")));
                    }
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            return Err(ModelError::Invalid(format!(
                                "node {i} has out-of-order child {child}"
                            )));
                        }
                    }
                }
                Node::Leaf(values) => {
                    if values.len() != leaf_len {
                        return Err(ModelError::Invalid(format!(
                            "leaf {i} has {} values, expected {leaf_len}",
                            values.len()
                        )));
                    }
                    if values.iter().any(|v| !v.is_finite()) {
                        return Err(ModelError::Invalid(format!("leaf {i} has non-finite value")));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk from the root to the leaf selected by `x`.
    ///
    /// The tree must have been validated against `x.len()` features.
    #[must_use]
    pub fn leaf(&self, x: &[f64], rule: SplitRule) -> &[f64] {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if rule.goes_left(x[*feature], *threshold) {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Leaf(values) => return values,
            }
        }
    }
}
