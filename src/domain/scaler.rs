//! Standard scaling fitted offline and applied online.
//!
//! The scaler stores per-column mean and standard deviation together with the
//! column order they were fitted on. The column order is captured at fit time
//! and is the only source of truth for feature alignment when serving.
//!
//! ```text
//! z = (x - mean) / std
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::features::FeatureRow;

/// Error type for scaling operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScalingError {
    #[error("Feature row shares no columns with the scaler (row {row:?}, scaler {expected:?})")]
    ColumnMismatch {
        row: Vec<String>,
        expected: Vec<String>,
    },

    #[error("Degenerate column '{column}': standard deviation is zero")]
    DegenerateColumn { column: String },

    #[error("Scaled value for column '{0}' is not finite")]
    NonFinite(String),

    #[error("Invalid scaler state: {0}")]
    InvalidState(String),

    #[error("Cannot fit scaler on empty data")]
    EmptyData,
}

/// A dense matrix of named feature columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Create an empty matrix with the given columns.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row.
    ///
    /// # Errors
    /// Returns `ScalingError::InvalidState` if the row width is wrong.
    pub fn push_row(&mut self, row: Vec<f64>) -> Result<(), ScalingError> {
        if row.len() != self.columns.len() {
            return Err(ScalingError::InvalidState(format!(
                "Row has {} values, matrix has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append a row already known to match the column count.
    pub(crate) fn push_unchecked(&mut self, row: Vec<f64>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Iterate over the values of column `index`.
    pub fn column(&self, index: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |r| r[index])
    }

    /// Row `index` as a named feature row.
    #[must_use]
    pub fn named_row(&self, index: usize) -> Option<FeatureRow> {
        self.rows
            .get(index)
            .map(|r| FeatureRow::from_pairs(self.columns.iter().cloned().zip(r.iter().copied())))
    }
}

/// A feature vector after scaling, in scaler column order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledVector(Vec<f64>);

impl ScaledVector {
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// On-disk shape of the scaler bundle (`scaler.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerBundle {
    mean: Vec<f64>,
    std: Vec<f64>,
    #[serde(alias = "column_order")]
    columns: Vec<String>,
}

/// Fitted scaler state: statistics plus the column order they belong to.
///
/// Immutable once built. Construction validates shape, so every instance has
/// one mean and one std per unique column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScalerBundle", into = "ScalerBundle")]
pub struct ScalerState {
    mean: Vec<f64>,
    std: Vec<f64>,
    column_order: Vec<String>,
}

impl TryFrom<ScalerBundle> for ScalerState {
    type Error = ScalingError;

    fn try_from(bundle: ScalerBundle) -> Result<Self, Self::Error> {
        Self::new(bundle.mean, bundle.std, bundle.columns)
    }
}

impl From<ScalerState> for ScalerBundle {
    fn from(state: ScalerState) -> Self {
        Self {
            mean: state.mean,
            std: state.std,
            columns: state.column_order,
        }
    }
}

impl ScalerState {
    /// Build a scaler state from explicit statistics.
    ///
    /// A zero std is accepted here and reported when the column is applied.
    ///
    /// # Errors
    /// Returns `ScalingError::InvalidState` on length mismatch, empty or
    /// duplicate columns, or non-finite statistics.
    pub fn new(
        mean: Vec<f64>,
        std: Vec<f64>,
        column_order: Vec<String>,
    ) -> Result<Self, ScalingError> {
        let n = column_order.len();
        if n == 0 {
            return Err(ScalingError::InvalidState("no columns".into()));
        }
        if mean.len() != n || std.len() != n {
            return Err(ScalingError::InvalidState(format!(
                "{} columns but {} means and {} stds",
                n,
                mean.len(),
                std.len()
            )));
        }
        for (i, column) in column_order.iter().enumerate() {
            if column_order[..i].contains(column) {
                return Err(ScalingError::InvalidState(format!(
                    "duplicate column '{column}'"
                )));
            }
        }
        if let Some(i) = mean
            .iter()
            .zip(&std)
            .position(|(m, s)| !m.is_finite() || !s.is_finite() || *s < 0.0)
        {
            return Err(ScalingError::InvalidState(format!(
                "invalid statistics for column '{}'",
                column_order[i]
            )));
        }

        Ok(Self {
            mean,
            std,
            column_order,
        })
    }

    /// Fit per-column mean and population standard deviation.
    ///
    /// Constant columns are stored with std 1.0 so the fitted state never
    /// divides by zero.
    ///
    /// # Errors
    /// Returns `ScalingError::EmptyData` if the matrix has no rows.
    pub fn fit(matrix: &FeatureMatrix) -> Result<Self, ScalingError> {
        let rows = matrix.n_rows();
        if rows == 0 {
            return Err(ScalingError::EmptyData);
        }
        let n = rows as f64;

        let mut mean = Vec::with_capacity(matrix.columns().len());
        let mut std = Vec::with_capacity(matrix.columns().len());

        for (index, name) in matrix.columns().iter().enumerate() {
            let m = matrix.column(index).sum::<f64>() / n;
            let variance = matrix.column(index).map(|x| (x - m).powi(2)).sum::<f64>() / n;
            let mut s = variance.sqrt();
            if s == 0.0 {
                tracing::warn!("Column '{}' is constant in training data; using std 1.0", name);
                s = 1.0;
            }
            mean.push(m);
            std.push(s);
        }

        tracing::info!(
            "Fitted scaler on {} rows x {} columns",
            rows,
            matrix.columns().len()
        );

        Self::new(mean, std, matrix.columns().to_vec())
    }

    /// Scale one row.
    ///
    /// The row is re-projected by name onto the fitted column order first, so
    /// input column order never matters.
    ///
    /// # Errors
    /// - `ScalingError::ColumnMismatch` if the row shares no column with the state
    /// - `ScalingError::DegenerateColumn` if a column's std is zero
    /// - `ScalingError::NonFinite` if a scaled value is not finite
    pub fn apply(&self, row: &FeatureRow) -> Result<ScaledVector, ScalingError> {
        let projection = row.reproject(&self.column_order);
        if projection.matched == 0 {
            return Err(ScalingError::ColumnMismatch {
                row: row.columns().to_vec(),
                expected: self.column_order.clone(),
            });
        }

        self.column_order
            .iter()
            .zip(projection.row.values())
            .zip(self.mean.iter().zip(&self.std))
            .map(|((column, x), (mean, std))| {
                if *std == 0.0 {
                    return Err(ScalingError::DegenerateColumn {
                        column: column.clone(),
                    });
                }
                let z = (x - mean) / std;
                if z.is_finite() {
                    Ok(z)
                } else {
                    Err(ScalingError::NonFinite(column.clone()))
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ScaledVector)
    }

    /// Scale every row of a matrix through the same path as [`Self::apply`].
    ///
    /// # Errors
    /// Propagates the first row failure.
    pub fn apply_matrix(&self, matrix: &FeatureMatrix) -> Result<Vec<ScaledVector>, ScalingError> {
        (0..matrix.n_rows())
            .filter_map(|i| matrix.named_row(i))
            .map(|row| self.apply(&row))
            .collect()
    }

    #[must_use]
    pub fn column_order(&self) -> &[String] {
        &self.column_order
    }

    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    #[must_use]
    pub fn std(&self) -> &[f64] {
        &self.std
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|s| (*s).to_string()).collect()
    }

    fn state() -> ScalerState {
        ScalerState::new(vec![1.0, 10.0, 100.0], vec![1.0, 2.0, 4.0], names(&["a", "b", "c"]))
            .expect("valid state")
    }

    #[test]
    fn test_apply_standardizes() {
        let row = FeatureRow::from_pairs([("a", 2.0), ("b", 14.0), ("c", 92.0)]);
        let scaled = state().apply(&row).expect("should scale");
        assert_eq!(scaled.as_slice(), &[1.0, 2.0, -2.0]);
    }

    #[test]
    fn test_column_order_of_row_is_irrelevant() {
        let ordered = FeatureRow::from_pairs([("a", 3.0), ("b", 7.0), ("c", 101.0)]);
        let shuffled = FeatureRow::from_pairs([("c", 101.0), ("a", 3.0), ("b", 7.0)]);

        let s = state();
        assert_eq!(
            s.apply(&ordered).expect("ordered"),
            s.apply(&shuffled).expect("shuffled")
        );
    }

    #[test]
    fn test_missing_column_is_zero_filled() {
        let s = ScalerState::new(
            vec![0.0, 0.0, 5.0],
            vec![1.0, 1.0, 2.0],
            names(&["a", "b", "synthetic"]),
        )
        .expect("valid state");
        let row = FeatureRow::from_pairs([("a", 1.0), ("b", 2.0)]);

        let scaled = s.apply(&row).expect("should scale");
        // synthetic: (0 - 5) / 2
        assert_eq!(scaled.as_slice(), &[1.0, 2.0, -2.5]);
    }

    #[test]
    fn test_total_mismatch_is_error() {
        let row = FeatureRow::from_pairs([("x", 1.0), ("y", 2.0)]);
        let err = state().apply(&row).expect_err("must fail");
        assert!(matches!(err, ScalingError::ColumnMismatch { .. }));
    }

    #[test]
    fn test_zero_std_is_error_not_infinity() {
        let s = ScalerState::new(vec![0.0, 0.0], vec![1.0, 0.0], names(&["a", "b"]))
            .expect("zero std is accepted at construction");
        let row = FeatureRow::from_pairs([("a", 1.0), ("b", 1.0)]);

        let err = s.apply(&row).expect_err("must fail");
        assert_eq!(
            err,
            ScalingError::DegenerateColumn {
                column: "b".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_states_rejected() {
        assert!(ScalerState::new(vec![], vec![], vec![]).is_err());
        assert!(ScalerState::new(vec![0.0], vec![1.0, 1.0], names(&["a"])).is_err());
        assert!(ScalerState::new(vec![0.0, 0.0], vec![1.0, 1.0], names(&["a", "a"])).is_err());
        assert!(ScalerState::new(vec![f64::NAN], vec![1.0], names(&["a"])).is_err());
        assert!(ScalerState::new(vec![0.0], vec![-1.0], names(&["a"])).is_err());
    }

    #[test]
    fn test_fit_population_std_and_constant_column() {
        let mut m = FeatureMatrix::new(names(&["x", "k"]));
        m.push_row(vec![1.0, 5.0]).expect("row");
        m.push_row(vec![3.0, 5.0]).expect("row");

        let s = ScalerState::fit(&m).expect("should fit");
        assert_eq!(s.mean(), &[2.0, 5.0]);
        assert_eq!(s.std(), &[1.0, 1.0]);
        assert_eq!(s.column_order(), &names(&["x", "k"])[..]);
    }

    #[test]
    fn test_fit_empty_is_error() {
        let m = FeatureMatrix::new(names(&["x"]));
        assert_eq!(ScalerState::fit(&m), Err(ScalingError::EmptyData));
    }

    #[test]
    fn test_push_row_width_checked() {
        let mut m = FeatureMatrix::new(names(&["x", "y"]));
        assert!(m.push_row(vec![1.0]).is_err());
    }

    #[test]
    fn test_bundle_json_shape() {
        let json = r#"{"mean":[1.0,2.0],"std":[0.5,0.25],"columns":["a","b"]}"#;
        let s: ScalerState = serde_json::from_str(json).expect("should parse");
        assert_eq!(s.column_order(), &names(&["a", "b"])[..]);

        let back = serde_json::to_value(&s).expect("should serialize");
        assert_eq!(back["columns"], serde_json::json!(["a", "b"]));

        let bad = r#"{"mean":[1.0],"std":[0.5,0.25],"columns":["a","b"]}"#;
        assert!(serde_json::from_str::<ScalerState>(bad).is_err());
    }

    #[test]
    fn test_apply_matrix_matches_apply() {
        let mut m = FeatureMatrix::new(names(&["a", "b", "c"]));
        m.push_row(vec![2.0, 14.0, 92.0]).expect("row");
        let s = state();

        let all = s.apply_matrix(&m).expect("should scale");
        let one = s.apply(&m.named_row(0).expect("row")).expect("should scale");
        assert_eq!(all, vec![one]);
    }
}
