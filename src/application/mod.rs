//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application:
//! - `prediction`: online date-to-indicators requests
//! - `training`: offline cleaning, scaler fitting and evaluation

mod prediction;
mod training;

pub use prediction::{PredictionFailure, PredictionService, PredictionStage};
pub use training::{
    evaluate, train_test_split, EvaluationReport, PreparedDataset, TrainingPipeline, SPLIT_SEED,
    TEST_FRACTION,
};
