//! Regression quality metrics for offline evaluation.

use serde::Serialize;

/// Error metrics for one target (or their uniform average).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RegressionMetrics {
    /// Mean squared error
    pub mse: f64,
    /// Coefficient of determination
    pub r2: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Mean absolute percentage error (fraction, not percent)
    pub mape: f64,
    /// Median absolute error
    pub medae: f64,
}

impl RegressionMetrics {
    /// Compute metrics for paired observations.
    ///
    /// Returns `None` if the slices are empty or of different length.
    #[must_use]
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Option<Self> {
        if y_true.is_empty() || y_true.len() != y_pred.len() {
            return None;
        }
        let n = y_true.len() as f64;

        let errors: Vec<f64> = y_true.iter().zip(y_pred).map(|(t, p)| t - p).collect();
        let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
        let mape = y_true
            .iter()
            .zip(&errors)
            .map(|(t, e)| e.abs() / t.abs().max(f64::EPSILON))
            .sum::<f64>()
            / n;

        let mut abs: Vec<f64> = errors.iter().map(|e| e.abs()).collect();
        abs.sort_by(f64::total_cmp);
        let mid = abs.len() / 2;
        let medae = if abs.len() % 2 == 0 {
            (abs[mid - 1] + abs[mid]) / 2.0
        } else {
            abs[mid]
        };

        let mean = y_true.iter().sum::<f64>() / n;
        let ss_tot = y_true.iter().map(|t| (t - mean).powi(2)).sum::<f64>();
        let ss_res = mse * n;
        let r2 = if ss_tot == 0.0 {
            if ss_res == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - ss_res / ss_tot
        };

        Some(Self {
            mse,
            r2,
            mae,
            mape,
            medae,
        })
    }

    /// Uniform average across targets.
    #[must_use]
    pub fn average(all: &[Self]) -> Self {
        if all.is_empty() {
            return Self::default();
        }
        let n = all.len() as f64;
        let sum = |f: fn(&Self) -> f64| all.iter().map(f).sum::<f64>() / n;
        Self {
            mse: sum(|m| m.mse),
            r2: sum(|m| m.r2),
            mae: sum(|m| m.mae),
            mape: sum(|m| m.mape),
            medae: sum(|m| m.medae),
        }
    }
}

impl std::fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MSE: {:.2}  R²: {:.2}  MAE: {:.2}  MAPE: {:.2}%  MedAE: {:.2}",
            self.mse,
            self.r2,
            self.mae,
            self.mape * 100.0,
            self.medae
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_prediction() {
        let y = [1.0, 2.0, 3.0];
        let m = RegressionMetrics::compute(&y, &y).expect("metrics");
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.r2, 1.0);
        assert_eq!(m.medae, 0.0);
    }

    #[test]
    fn test_known_values() {
        let t = [2.0, 4.0, 6.0, 8.0];
        let p = [3.0, 4.0, 5.0, 10.0];
        let m = RegressionMetrics::compute(&t, &p).expect("metrics");

        // errors: -1, 0, 1, -2
        assert!((m.mse - 1.5).abs() < 1e-12);
        assert!((m.mae - 1.0).abs() < 1e-12);
        assert!((m.medae - 1.0).abs() < 1e-12);
        // ss_tot = 20, ss_res = 6
        assert!((m.r2 - 0.7).abs() < 1e-12);
        // (0.5 + 0 + 1/6 + 0.25) / 4
        assert!((m.mape - (0.5 + 1.0 / 6.0 + 0.25) / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_lengths() {
        assert!(RegressionMetrics::compute(&[1.0], &[1.0, 2.0]).is_none());
        assert!(RegressionMetrics::compute(&[], &[]).is_none());
    }

    #[test]
    fn test_average() {
        let a = RegressionMetrics { mse: 1.0, r2: 0.5, mae: 1.0, mape: 0.1, medae: 1.0 };
        let b = RegressionMetrics { mse: 3.0, r2: 0.7, mae: 2.0, mape: 0.3, medae: 2.0 };
        let avg = RegressionMetrics::average(&[a, b]);
        assert!((avg.mse - 2.0).abs() < 1e-12);
        assert!((avg.r2 - 0.6).abs() < 1e-12);
    }
}
