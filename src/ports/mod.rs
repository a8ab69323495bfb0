//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and the outside world (trained models, the wall
//! clock, historical record stores).

mod clock;
mod regressor;
mod samples;

pub use clock::{Clock, FixedClock, SystemClock};
pub use regressor::{ModelError, Regressor};
pub use samples::SampleSource;
