//! Domain layer: Core types and pure transformations.
//!
//! Feature derivation, scaling, cleaning and metrics live here. Nothing in
//! this module performs I/O; the only outside input is the `Clock` port.

pub mod features;
pub mod metrics;
pub mod quality;
pub mod sample;
pub mod scaler;

pub use features::{DateFeatures, FeatureDeriver, FeatureError, FeatureRow, FEATURE_NAMES};
pub use metrics::RegressionMetrics;
pub use quality::{RawTargets, WaterQuality, N_TARGETS, TARGET_NAMES};
pub use sample::{clean_samples, CleaningReport, TrainingSample, WaterSample};
pub use scaler::{FeatureMatrix, ScaledVector, ScalerState, ScalingError};
