//! # Aquacast
//!
//! Date-driven water-quality prediction service.
//!
//! This crate provides:
//! - Date feature derivation shared by offline training and online serving
//! - A standard scaler whose column order travels with its statistics
//! - Tree-ensemble regressors loaded from JSON exports
//! - An HTTP endpoint returning six water-quality indicators for a date
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types and pure transformations (features, scaler, cleaning)
//! - `ports`: Trait definitions for external collaborators (model, clock, records)
//! - `adapters`: Concrete implementations (JSON ensembles, SQLite, axum)
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Environment-driven service configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{PredictionFailure, PredictionService};
pub use domain::{FeatureDeriver, ScalerState, WaterQuality};

/// Result type for Aquacast operations
pub type Result<T> = std::result::Result<T, AquaError>;

/// Main error type for Aquacast
#[derive(Debug, thiserror::Error)]
pub enum AquaError {
    #[error("Feature derivation failed: {0}")]
    Feature(#[from] domain::FeatureError),

    #[error("Scaling failed: {0}")]
    Scaling(#[from] domain::ScalingError),

    #[error("Model evaluation failed: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] adapters::ArtifactError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("No model available (random forest: {random_forest}; gradient-boosted: {gradient_boosted})")]
    NoModelAvailable {
        random_forest: adapters::ArtifactError,
        gradient_boosted: adapters::ArtifactError,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
