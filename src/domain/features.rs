//! Date-to-feature derivation.
//!
//! A calendar date is encoded as six named numeric features. The names are the
//! contract with the fitted scaler: a row is always re-projected onto the
//! scaler's column order by name, never assumed to match by position.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::domain::scaler::FeatureMatrix;
use crate::ports::Clock;

/// Accepted request date format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const DAYS_ELAPSED: &str = "days_elapsed";
pub const MONTH: &str = "month";
pub const DAY: &str = "day";
pub const WEEKDAY: &str = "weekday";
pub const NORMALIZED_DATE: &str = "normalized_date";
pub const YEAR: &str = "year";

/// Names of the features the deriver produces.
///
/// This is the order the offline fitter captures into the scaler bundle. At
/// serving time the persisted column order wins; this list is never consulted
/// for alignment.
pub const FEATURE_NAMES: [&str; 6] = [DAYS_ELAPSED, MONTH, DAY, WEEKDAY, NORMALIZED_DATE, YEAR];

/// Error type for feature derivation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("Invalid date format '{0}' (expected YYYY-MM-DD)")]
    InvalidDateFormat(String),

    #[error("Normalization window is empty: service start {service_start} is less than one day after reference {reference}")]
    EmptyWindow {
        reference: NaiveDate,
        service_start: NaiveDateTime,
    },
}

/// The six features of a single date, by name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateFeatures {
    /// Whole days between the date and "now" (absolute value)
    pub days_elapsed: i64,

    /// Month, 1-12
    pub month: u32,

    /// Day of month, 1-31
    pub day: u32,

    /// Day of week, Monday = 0
    pub weekday: u32,

    /// Position of the date inside the normalization window (not clamped)
    pub normalized_date: f64,

    /// Calendar year
    pub year: i32,
}

impl DateFeatures {
    /// Feature values paired with their names.
    #[must_use]
    pub fn named(&self) -> [(&'static str, f64); 6] {
        [
            (DAYS_ELAPSED, self.days_elapsed as f64),
            (MONTH, f64::from(self.month)),
            (DAY, f64::from(self.day)),
            (WEEKDAY, f64::from(self.weekday)),
            (NORMALIZED_DATE, self.normalized_date),
            (YEAR, f64::from(self.year)),
        ]
    }
}

/// An ordered, named feature row.
///
/// Values are addressed by column name. Use [`FeatureRow::reproject`] to
/// align a row with a scaler's column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureRow {
    columns: Vec<String>,
    values: Vec<f64>,
}

/// Result of re-projecting a row onto a column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Reprojection {
    /// The aligned row (same columns, same order as requested)
    pub row: FeatureRow,
    /// Number of requested columns found in the source row
    pub matched: usize,
    /// Requested columns absent from the source row (filled with 0)
    pub zero_filled: Vec<String>,
    /// Source columns absent from the requested order (discarded)
    pub dropped: Vec<String>,
}

impl FeatureRow {
    /// Build a row from `(name, value)` pairs, keeping their order.
    ///
    /// When a name repeats, the first occurrence wins.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let mut row = Self::default();
        for (name, value) in pairs {
            let name = name.into();
            if row.columns.contains(&name) {
                continue;
            }
            row.columns.push(name);
            row.values.push(value);
        }
        row
    }

    /// Column names in row order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in row order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Look up a value by column name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }

    /// Re-project this row onto `column_order`.
    ///
    /// Columns missing from this row are zero-filled, columns not named in
    /// `column_order` are dropped. Order always follows `column_order`.
    #[must_use]
    pub fn reproject(&self, column_order: &[String]) -> Reprojection {
        let mut matched = 0;
        let mut zero_filled = Vec::new();
        let values = column_order
            .iter()
            .map(|column| match self.get(column) {
                Some(value) => {
                    matched += 1;
                    value
                }
                None => {
                    zero_filled.push(column.clone());
                    0.0
                }
            })
            .collect();

        let dropped = self
            .columns
            .iter()
            .filter(|c| !column_order.contains(c))
            .cloned()
            .collect();

        Reprojection {
            row: Self {
                columns: column_order.to_vec(),
                values,
            },
            matched,
            zero_filled,
            dropped,
        }
    }
}

/// Floor of `delta` in whole days (negative deltas round toward -inf).
fn whole_days(delta: TimeDelta) -> i64 {
    let days = delta.num_days();
    if delta < TimeDelta::days(days) {
        days - 1
    } else {
        days
    }
}

/// Turns request dates into feature rows.
///
/// `days_elapsed` is measured against the clock at call time. The
/// normalization window runs from the reference date to the service start,
/// both fixed when the deriver is built.
#[derive(Debug, Clone)]
pub struct FeatureDeriver {
    reference: NaiveDate,
    service_start: NaiveDateTime,
    window_days: i64,
    clock: Arc<dyn Clock>,
}

impl FeatureDeriver {
    /// Create a deriver whose normalization window ends now.
    ///
    /// # Errors
    /// Returns `FeatureError::EmptyWindow` if the clock is not at least one
    /// whole day past `reference`.
    pub fn new(reference: NaiveDate, clock: Arc<dyn Clock>) -> Result<Self, FeatureError> {
        let service_start = clock.now();
        Self::with_service_start(reference, service_start, clock)
    }

    /// Create a deriver with an explicit service-start instant.
    ///
    /// # Errors
    /// Returns `FeatureError::EmptyWindow` if the window is shorter than a day.
    pub fn with_service_start(
        reference: NaiveDate,
        service_start: NaiveDateTime,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, FeatureError> {
        let window_days = whole_days(service_start - reference.and_time(chrono::NaiveTime::MIN));
        if window_days <= 0 {
            return Err(FeatureError::EmptyWindow {
                reference,
                service_start,
            });
        }

        Ok(Self {
            reference,
            service_start,
            window_days,
            clock,
        })
    }

    #[must_use]
    pub fn reference(&self) -> NaiveDate {
        self.reference
    }

    #[must_use]
    pub fn service_start(&self) -> NaiveDateTime {
        self.service_start
    }

    /// Parse a `YYYY-MM-DD` date.
    ///
    /// # Errors
    /// Returns `FeatureError::InvalidDateFormat` for anything that is not a
    /// valid calendar date in that format.
    pub fn parse_date(input: &str) -> Result<NaiveDate, FeatureError> {
        NaiveDate::parse_from_str(input, DATE_FORMAT)
            .map_err(|_| FeatureError::InvalidDateFormat(input.to_string()))
    }

    /// Compute the named features of `date` against the current clock.
    #[must_use]
    pub fn features(&self, date: NaiveDate) -> DateFeatures {
        let midnight = date.and_time(chrono::NaiveTime::MIN);
        let days_elapsed = whole_days(midnight - self.clock.now()).abs();
        let since_reference = whole_days(midnight - self.reference.and_time(chrono::NaiveTime::MIN));

        DateFeatures {
            days_elapsed,
            month: date.month(),
            day: date.day(),
            weekday: date.weekday().num_days_from_monday(),
            normalized_date: since_reference as f64 / self.window_days as f64,
            year: date.year(),
        }
    }

    /// Parse `input` and derive its feature row aligned to `column_order`.
    ///
    /// # Errors
    /// Returns `FeatureError::InvalidDateFormat` if `input` is not a date.
    pub fn derive(&self, input: &str, column_order: &[String]) -> Result<FeatureRow, FeatureError> {
        let date = Self::parse_date(input)?;
        let features = self.features(date);
        let projection = FeatureRow::from_pairs(features.named()).reproject(column_order);

        if !projection.zero_filled.is_empty() || !projection.dropped.is_empty() {
            tracing::debug!(
                "Feature row for {} re-projected: zero-filled {:?}, dropped {:?}",
                date,
                projection.zero_filled,
                projection.dropped
            );
        }

        Ok(projection.row)
    }
}

/// Build the offline training feature matrix for a set of record dates.
///
/// Unlike serving, elapsed days are counted from the earliest record and the
/// normalized date spans the record range. Columns follow [`FEATURE_NAMES`].
#[must_use]
pub fn training_matrix(dates: &[NaiveDate]) -> FeatureMatrix {
    let columns: Vec<String> = FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect();
    let mut matrix = FeatureMatrix::new(columns);

    let Some(first) = dates.iter().min().copied() else {
        return matrix;
    };
    let elapsed: Vec<i64> = dates.iter().map(|d| (*d - first).num_days()).collect();
    let min = elapsed.iter().copied().min().unwrap_or(0);
    let max = elapsed.iter().copied().max().unwrap_or(0);
    let span = (max - min) as f64;

    for (date, days) in dates.iter().zip(&elapsed) {
        let normalized = if span > 0.0 {
            (days - min) as f64 / span
        } else {
            0.0
        };
        let features = DateFeatures {
            days_elapsed: *days,
            month: date.month(),
            day: date.day(),
            weekday: date.weekday().num_days_from_monday(),
            normalized_date: normalized,
            year: date.year(),
        };
        let row = FeatureRow::from_pairs(features.named()).reproject(matrix.columns());
        matrix.push_unchecked(row.row.values().to_vec());
    }

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S")
            .expect("valid datetime")
    }

    fn deriver(now: NaiveDateTime) -> FeatureDeriver {
        let reference = NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid date");
        FeatureDeriver::with_service_start(reference, at("2024-01-01", "00:00:00"), Arc::new(FixedClock(now)))
            .expect("window is valid")
    }

    fn default_order() -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_derive_calendar_fields() {
        let d = deriver(at("2023-06-20", "00:00:00"));
        let row = d.derive("2023-06-15", &default_order()).expect("should derive");

        assert_eq!(row.get(MONTH), Some(6.0));
        assert_eq!(row.get(DAY), Some(15.0));
        // 2023-06-15 was a Thursday
        assert_eq!(row.get(WEEKDAY), Some(3.0));
        assert_eq!(row.get(YEAR), Some(2023.0));
        assert_eq!(row.get(DAYS_ELAPSED), Some(5.0));
    }

    #[test]
    fn test_days_elapsed_is_absolute_and_floors_partial_days() {
        // Future date: 10 days ahead at midnight.
        let d = deriver(at("2024-03-01", "00:00:00"));
        let features = d.features(NaiveDate::from_ymd_opt(2024, 3, 11).expect("date"));
        assert_eq!(features.days_elapsed, 10);

        // Same calendar day, later in the day: midnight minus 15h floors to -1.
        let d = deriver(at("2024-03-01", "15:00:00"));
        let features = d.features(NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"));
        assert_eq!(features.days_elapsed, 1);
    }

    #[test]
    fn test_normalized_date_is_not_clamped() {
        let d = deriver(at("2024-06-01", "00:00:00"));

        let start = d.features(NaiveDate::from_ymd_opt(2023, 1, 1).expect("date"));
        assert!((start.normalized_date - 0.0).abs() < f64::EPSILON);

        let end = d.features(NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"));
        assert!((end.normalized_date - 1.0).abs() < f64::EPSILON);

        let before = d.features(NaiveDate::from_ymd_opt(2022, 1, 1).expect("date"));
        assert!(before.normalized_date < 0.0);

        let after = d.features(NaiveDate::from_ymd_opt(2025, 1, 1).expect("date"));
        assert!(after.normalized_date > 1.0);
    }

    #[test]
    fn test_invalid_dates_rejected() {
        let d = deriver(at("2024-01-10", "00:00:00"));
        for input in ["2024-13-40", "2023-02-30", "15/06/2023", "", "2023-06-15T00:00"] {
            let err = d.derive(input, &default_order()).expect_err("must fail");
            assert_eq!(err, FeatureError::InvalidDateFormat(input.to_string()));
        }
    }

    #[test]
    fn test_empty_window_rejected() {
        let reference = NaiveDate::from_ymd_opt(2023, 1, 1).expect("date");
        let start = at("2023-01-01", "12:00:00");
        let err = FeatureDeriver::with_service_start(reference, start, Arc::new(FixedClock(start)))
            .expect_err("must fail");
        assert!(matches!(err, FeatureError::EmptyWindow { .. }));
    }

    #[test]
    fn test_derive_follows_given_column_order() {
        let d = deriver(at("2023-06-20", "00:00:00"));
        let order: Vec<String> = [YEAR, MONTH, "synthetic", DAY]
            .iter()
            .map(|s| (*s).to_string())
            .collect();

        let row = d.derive("2023-06-15", &order).expect("should derive");
        assert_eq!(row.columns(), order.as_slice());
        assert_eq!(row.values(), &[2023.0, 6.0, 0.0, 15.0]);
    }

    #[test]
    fn test_reproject_reports_fill_and_drop() {
        let row = FeatureRow::from_pairs([("b", 2.0), ("a", 1.0), ("extra", 9.0)]);
        let order = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let p = row.reproject(&order);
        assert_eq!(p.row.values(), &[1.0, 2.0, 0.0]);
        assert_eq!(p.matched, 2);
        assert_eq!(p.zero_filled, vec!["c".to_string()]);
        assert_eq!(p.dropped, vec!["extra".to_string()]);
    }

    #[test]
    fn test_training_matrix_spans_record_range() {
        let dates: Vec<NaiveDate> = ["2023-01-11", "2023-01-01", "2023-01-21"]
            .iter()
            .map(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).expect("date"))
            .collect();

        let matrix = training_matrix(&dates);
        assert_eq!(matrix.n_rows(), 3);

        let elapsed: Vec<f64> = matrix.column(0).collect();
        assert_eq!(elapsed, vec![10.0, 0.0, 20.0]);

        let normalized: Vec<f64> = matrix.column(4).collect();
        assert_eq!(normalized, vec![0.5, 0.0, 1.0]);
    }

    #[test]
    fn test_training_matrix_single_day() {
        let date = NaiveDate::from_ymd_opt(2023, 5, 5).expect("date");
        let matrix = training_matrix(&[date, date]);
        let normalized: Vec<f64> = matrix.column(4).collect();
        assert_eq!(normalized, vec![0.0, 0.0]);
    }
}
