//! Training pipeline: Offline preparation and evaluation.
//!
//! This service coordinates:
//! - Loading historical records through `SampleSource`
//! - Cleaning (pH bound, IQR filters, hardness imputation)
//! - Feature derivation and scaler fitting
//! - Hold-out evaluation of a trained regressor
//!
//! Model fitting itself happens outside this crate; the pipeline consumes
//! the exported ensembles through the `Regressor` port.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::adapters::StorageError;
use crate::domain::features::training_matrix;
use crate::domain::{
    clean_samples, CleaningReport, FeatureMatrix, RawTargets, RegressionMetrics, ScalerState,
    N_TARGETS, TARGET_NAMES,
};
use crate::ports::{Regressor, SampleSource};
use crate::AquaError;

/// Share of records held out for evaluation.
pub const TEST_FRACTION: f64 = 0.25;

/// Seed of the evaluation split.
pub const SPLIT_SEED: u64 = 42;

/// Cleaned records with their features and fitted scaler.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub features: FeatureMatrix,
    pub targets: Vec<RawTargets>,
    pub scaler: ScalerState,
    pub report: CleaningReport,
}

impl PreparedDataset {
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Hold-out metrics of one model.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub model: String,
    pub n_train: usize,
    pub n_test: usize,
    pub per_target: Vec<(&'static str, RegressionMetrics)>,
    /// Uniform average across targets
    pub average: RegressionMetrics,
}

impl std::fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} (train={}, test={})",
            self.model, self.n_train, self.n_test
        )?;
        for (name, metrics) in &self.per_target {
            writeln!(f, "  {name:<14} {metrics}")?;
        }
        write!(f, "  {:<14} {}", "average", self.average)
    }
}

/// Deterministic shuffled split of `0..n` into (train, test) indices.
///
/// The test set holds `ceil(n * test_fraction)` indices.
#[must_use]
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let train = indices.split_off(n_test.min(n));
    (train, indices)
}

/// Offline pipeline over a historical record source.
pub struct TrainingPipeline<S>
where
    S: SampleSource,
{
    source: Arc<S>,
}

impl<S> TrainingPipeline<S>
where
    S: SampleSource,
    S::Error: Into<StorageError>,
{
    /// Create a new training pipeline.
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Load, clean and featurize the records, then fit the scaler.
    ///
    /// # Errors
    /// Returns error if the source cannot be read or no record survives
    /// cleaning.
    pub fn prepare(&self) -> Result<PreparedDataset, AquaError> {
        let samples = self
            .source
            .load_samples()
            .map_err(|e| AquaError::Storage(e.into()))?;

        let (cleaned, report) = clean_samples(samples);
        tracing::info!(
            "Cleaning kept {} of {} records (pH {}, turbidez {}, conductividad {}, color {}, incomplete {}; dureza filled {})",
            report.output_rows,
            report.input_rows,
            report.dropped_ph,
            report.dropped_turbidez,
            report.dropped_conductividad,
            report.dropped_color,
            report.dropped_incomplete,
            report.filled_dureza
        );

        let dates: Vec<_> = cleaned.iter().map(|s| s.fecha).collect();
        let features = training_matrix(&dates);
        let scaler = ScalerState::fit(&features)?;
        let targets = cleaned.iter().map(|s| s.targets).collect();

        Ok(PreparedDataset {
            features,
            targets,
            scaler,
            report,
        })
    }
}

/// Evaluate `model` on the held-out split of `dataset`.
///
/// Features are scaled with the dataset's scaler through the same path used
/// when serving. Predictions are clipped at zero before scoring.
///
/// # Errors
/// Returns error if the dataset is too small to split, scaling fails or the
/// model rejects a row.
pub fn evaluate<R: Regressor + ?Sized>(
    model: &R,
    dataset: &PreparedDataset,
) -> Result<EvaluationReport, AquaError> {
    let (train, test) = train_test_split(dataset.len(), TEST_FRACTION, SPLIT_SEED);
    if test.is_empty() {
        return Err(AquaError::Validation(
            "Not enough records for a hold-out split".to_string(),
        ));
    }

    let scaled = dataset.scaler.apply_matrix(&dataset.features)?;

    let mut y_true: Vec<Vec<f64>> = vec![Vec::with_capacity(test.len()); N_TARGETS];
    let mut y_pred: Vec<Vec<f64>> = vec![Vec::with_capacity(test.len()); N_TARGETS];
    for &i in &test {
        let pred = model.predict(scaled[i].as_slice())?;
        for k in 0..N_TARGETS {
            y_true[k].push(dataset.targets[i][k]);
            y_pred[k].push(pred[k].max(0.0));
        }
    }

    let per_target = TARGET_NAMES
        .iter()
        .zip(y_true.iter().zip(&y_pred))
        .map(|(name, (t, p))| {
            RegressionMetrics::compute(t, p)
                .map(|m| (*name, m))
                .ok_or_else(|| AquaError::Validation(format!("No predictions for '{name}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let all: Vec<RegressionMetrics> = per_target.iter().map(|(_, m)| *m).collect();
    let report = EvaluationReport {
        model: model.name().to_string(),
        n_train: train.len(),
        n_test: test.len(),
        average: RegressionMetrics::average(&all),
        per_target,
    };

    tracing::info!("Evaluated {}: {}", report.model, report.average);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ensemble::GradientBoostedRegressor;
    use crate::adapters::SqliteSampleStore;
    use crate::domain::{ScalingError, WaterSample, FEATURE_NAMES};
    use chrono::{Duration, NaiveDate};

    const TARGETS: RawTargets = [7.0, 1.0, 300.0, 150.0, 80.0, 5.0];

    fn store_with(n: i64) -> Arc<SqliteSampleStore> {
        let store = SqliteSampleStore::in_memory().expect("Should create db");
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid date");
        for i in 0..n {
            store
                .insert_sample(&WaterSample::complete(start + Duration::days(i * 3), TARGETS))
                .expect("insert");
        }
        Arc::new(store)
    }

    fn constant_model(base_score: RawTargets) -> GradientBoostedRegressor {
        GradientBoostedRegressor::new(FEATURE_NAMES.len(), base_score, Vec::new())
            .expect("valid model")
    }

    #[test]
    fn test_split_deterministic_and_disjoint() {
        let (train_a, test_a) = train_test_split(10, TEST_FRACTION, SPLIT_SEED);
        let (train_b, test_b) = train_test_split(10, TEST_FRACTION, SPLIT_SEED);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.len(), 3);
        assert_eq!(train_a.len(), 7);

        let mut all: Vec<usize> = train_a.iter().chain(&test_a).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_empty() {
        let (train, test) = train_test_split(0, TEST_FRACTION, SPLIT_SEED);
        assert!(train.is_empty());
        assert!(test.is_empty());
    }

    #[test]
    fn test_prepare_fits_scaler_on_training_features() {
        let store = store_with(8);
        let mut bad = WaterSample::complete(
            NaiveDate::from_ymd_opt(2023, 2, 1).expect("valid date"),
            TARGETS,
        );
        bad.ph = Some(15.0);
        store.insert_sample(&bad).expect("insert");

        let dataset = TrainingPipeline::new(store).prepare().expect("prepare");

        assert_eq!(dataset.len(), 8);
        assert_eq!(dataset.report.dropped_ph, 1);
        assert_eq!(
            dataset.scaler.column_order(),
            FEATURE_NAMES.map(String::from).as_slice()
        );

        // days_elapsed runs 0, 3, ..., 21: mean 10.5
        assert!((dataset.scaler.mean()[0] - 10.5).abs() < 1e-12);
        // normalized_date spans [0, 1]: mean 0.5
        assert!((dataset.scaler.mean()[4] - 0.5).abs() < 1e-12);
        // every record is in 2023: constant column stored with std 1.0
        assert_eq!(dataset.scaler.std()[5], 1.0);
    }

    #[test]
    fn test_prepare_empty_source() {
        let store = Arc::new(SqliteSampleStore::in_memory().expect("Should create db"));
        let err = TrainingPipeline::new(store).prepare().expect_err("must fail");
        assert!(matches!(err, AquaError::Scaling(ScalingError::EmptyData)));
    }

    #[test]
    fn test_evaluate_exact_model() {
        let dataset = TrainingPipeline::new(store_with(12)).prepare().expect("prepare");
        let report = evaluate(&constant_model(TARGETS), &dataset).expect("evaluate");

        assert_eq!(report.model, "XGBoost");
        assert_eq!(report.n_test, 3);
        assert_eq!(report.n_train, 9);
        assert_eq!(report.per_target.len(), N_TARGETS);
        assert_eq!(report.average.mse, 0.0);
        assert_eq!(report.average.r2, 1.0);
    }

    #[test]
    fn test_evaluate_clips_negative_predictions() {
        let dataset = TrainingPipeline::new(store_with(12)).prepare().expect("prepare");
        let report = evaluate(&constant_model([-1.0; N_TARGETS]), &dataset).expect("evaluate");

        for ((name, metrics), expected) in report.per_target.iter().zip(TARGETS) {
            assert_eq!(metrics.mae, expected, "{name}");
        }
    }

    #[test]
    fn test_evaluate_needs_records() {
        let dataset = PreparedDataset {
            features: FeatureMatrix::new(FEATURE_NAMES.map(String::from).to_vec()),
            targets: Vec::new(),
            scaler: ScalerState::new(vec![0.0; 6], vec![1.0; 6], FEATURE_NAMES.map(String::from).to_vec())
                .expect("valid scaler"),
            report: CleaningReport::default(),
        };
        assert!(matches!(
            evaluate(&constant_model(TARGETS), &dataset),
            Err(AquaError::Validation(_))
        ));
    }
}
