//! Adapters layer: Concrete implementations of ports.
//!
//! - `ensemble`: JSON tree-ensemble regressors
//! - `artifacts`: startup loading of model and scaler files
//! - `sqlite`: historical record store
//! - `http`: axum request/response surface

pub mod artifacts;
pub mod ensemble;
pub mod http;
pub mod sqlite;

pub use artifacts::ArtifactError;
pub use sqlite::{SqliteSampleStore, StorageError};
