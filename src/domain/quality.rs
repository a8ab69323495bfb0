//! Predicted water-quality indicators.

use serde::{Deserialize, Serialize};

/// Target names in model output order.
pub const TARGET_NAMES: [&str; 6] = ["ph", "turbidez", "conductividad", "tds", "dureza", "color"];

/// Number of predicted targets.
pub const N_TARGETS: usize = TARGET_NAMES.len();

/// Raw regressor output, in [`TARGET_NAMES`] order.
pub type RawTargets = [f64; N_TARGETS];

/// Round to two decimal digits.
///
/// Rounds from the exact binary value with ties to even, so `2.675` (stored
/// just below the tie) gives `2.67` and `0.125` gives `0.12`.
#[must_use]
pub fn round2(x: f64) -> f64 {
    format!("{x:.2}").parse().unwrap_or(x)
}

/// The six indicators returned for one date.
///
/// Values are rounded to two decimals and never clamped to physical bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterQuality {
    /// pH
    pub ph: f64,

    /// Turbidity (NTU)
    pub turbidez: f64,

    /// Conductivity (µS/cm)
    pub conductividad: f64,

    /// Total dissolved solids (mg/L)
    pub tds: f64,

    /// Hardness (mg/L CaCO3)
    pub dureza: f64,

    /// Color (Pt-Co units)
    pub color: f64,
}

impl WaterQuality {
    /// Build the response values from raw model output.
    #[must_use]
    pub fn from_raw(raw: RawTargets) -> Self {
        let [ph, turbidez, conductividad, tds, dureza, color] = raw.map(round2);
        Self {
            ph,
            turbidez,
            conductividad,
            tds,
            dureza,
            color,
        }
    }

    /// Values in [`TARGET_NAMES`] order.
    #[must_use]
    pub fn to_array(&self) -> RawTargets {
        [
            self.ph,
            self.turbidez,
            self.conductividad,
            self.tds,
            self.dureza,
            self.color,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding_contract() {
        let q = WaterQuality::from_raw([7.12345, 3.0, 301.239, 150.006, 79.994, -0.456]);
        assert_eq!(q.to_array(), [7.12, 3.0, 301.24, 150.01, 79.99, -0.46]);
    }

    #[test]
    fn test_rounding_uses_exact_value_and_ties_to_even() {
        assert_eq!([round2(2.675), round2(7.125), round2(0.125)], [2.67, 7.12, 0.12]);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(-7.125), -7.12);
        assert!(round2(f64::NAN).is_nan());
    }

    #[test]
    fn test_no_clamping() {
        let q = WaterQuality::from_raw([15.2, -1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(q.ph, 15.2);
        assert_eq!(q.turbidez, -1.0);
    }

    #[test]
    fn test_json_keys() {
        let q = WaterQuality::from_raw([7.1, 2.0, 300.0, 150.0, 80.0, 5.0]);
        let v = serde_json::to_value(q).expect("should serialize");
        let keys: Vec<&str> = v
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        for name in TARGET_NAMES {
            assert!(keys.contains(&name));
        }
        assert_eq!(keys.len(), N_TARGETS);
    }
}
