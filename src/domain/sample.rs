//! Historical water-quality records and training-set cleaning.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::quality::RawTargets;

/// Upper bound of a physically valid pH reading.
pub const MAX_PH: f64 = 14.0;

/// Tukey fence multiplier for the interquartile-range filter.
const IQR_FENCE: f64 = 1.5;

/// One historical laboratory record (`calidad_agua` row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterSample {
    pub fecha: NaiveDate,
    pub ph: Option<f64>,
    pub turbidez: Option<f64>,
    pub conductividad: Option<f64>,
    pub tds: Option<f64>,
    pub dureza: Option<f64>,
    pub color: Option<f64>,
    /// Water quality index (stored, not a model target)
    pub ica: Option<f64>,
}

impl WaterSample {
    /// Create a record with every measurement present.
    #[must_use]
    pub fn complete(fecha: NaiveDate, targets: RawTargets) -> Self {
        let [ph, turbidez, conductividad, tds, dureza, color] = targets;
        Self {
            fecha,
            ph: Some(ph),
            turbidez: Some(turbidez),
            conductividad: Some(conductividad),
            tds: Some(tds),
            dureza: Some(dureza),
            color: Some(color),
            ica: None,
        }
    }

    fn targets(&self) -> Option<RawTargets> {
        Some([
            self.ph?,
            self.turbidez?,
            self.conductividad?,
            self.tds?,
            self.dureza?,
            self.color?,
        ])
    }
}

/// A cleaned record: date plus all six targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingSample {
    pub fecha: NaiveDate,
    pub targets: RawTargets,
}

/// What the cleaning pass removed or filled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub dropped_ph: usize,
    pub dropped_turbidez: usize,
    pub dropped_conductividad: usize,
    pub dropped_color: usize,
    pub filled_dureza: usize,
    pub dropped_incomplete: usize,
    pub output_rows: usize,
}

/// Quantile with linear interpolation between order statistics.
///
/// `sorted` must be ascending and non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

fn sorted_present(values: impl Iterator<Item = Option<f64>>) -> Vec<f64> {
    let mut v: Vec<f64> = values.flatten().filter(|x| !x.is_nan()).collect();
    v.sort_by(f64::total_cmp);
    v
}

/// Median of the present values, if any.
#[must_use]
pub fn median(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let sorted = sorted_present(values);
    (!sorted.is_empty()).then(|| quantile(&sorted, 0.5))
}

/// Keep rows whose `field` lies inside the Tukey fences of the current rows.
///
/// Rows with the field missing are dropped. Returns the number removed.
fn retain_within_iqr(samples: &mut Vec<WaterSample>, field: fn(&WaterSample) -> Option<f64>) -> usize {
    let before = samples.len();
    let sorted = sorted_present(samples.iter().map(field));
    if sorted.is_empty() {
        samples.clear();
        return before;
    }

    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let (low, high) = (q1 - IQR_FENCE * iqr, q3 + IQR_FENCE * iqr);

    samples.retain(|s| field(s).is_some_and(|v| v >= low && v <= high));
    before - samples.len()
}

/// Clean raw records into training samples.
///
/// Steps, in order: drop pH above 14 (or missing); IQR-filter turbidity,
/// conductivity and color; fill missing hardness with its median; drop any
/// record still missing a target.
#[must_use]
pub fn clean_samples(samples: Vec<WaterSample>) -> (Vec<TrainingSample>, CleaningReport) {
    let mut report = CleaningReport {
        input_rows: samples.len(),
        ..CleaningReport::default()
    };

    let mut rows = samples;
    let before = rows.len();
    rows.retain(|s| s.ph.is_some_and(|ph| ph <= MAX_PH));
    report.dropped_ph = before - rows.len();

    report.dropped_turbidez = retain_within_iqr(&mut rows, |s| s.turbidez);
    report.dropped_conductividad = retain_within_iqr(&mut rows, |s| s.conductividad);
    report.dropped_color = retain_within_iqr(&mut rows, |s| s.color);

    if let Some(fill) = median(rows.iter().map(|s| s.dureza)) {
        for s in rows.iter_mut().filter(|s| s.dureza.is_none()) {
            s.dureza = Some(fill);
            report.filled_dureza += 1;
        }
    }

    let cleaned: Vec<TrainingSample> = rows
        .iter()
        .filter_map(|s| {
            s.targets().map(|targets| TrainingSample {
                fecha: s.fecha,
                targets,
            })
        })
        .collect();
    report.dropped_incomplete = rows.len() - cleaned.len();
    report.output_rows = cleaned.len();

    if report.dropped_incomplete > 0 {
        tracing::warn!(
            "Dropped {} records with missing target values",
            report.dropped_incomplete
        );
    }
    tracing::info!(
        "Cleaned {} records down to {}",
        report.input_rows,
        report.output_rows
    );

    (cleaned, report)
}
