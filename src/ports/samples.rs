//! Sample source port: Trait for reading historical records.
//!
//! The offline training pipeline reads through this trait so the record
//! store (SQLite here) stays swappable.

use crate::domain::WaterSample;

/// Trait for historical water-quality record stores.
pub trait SampleSource: Send + Sync {
    /// Error type for source operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load every stored record, oldest first.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    fn load_samples(&self) -> Result<Vec<WaterSample>, Self::Error>;

    /// Count stored records.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    fn count_samples(&self) -> Result<usize, Self::Error>;
}
