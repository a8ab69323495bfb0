//! Prediction service: Orchestrates one date-to-indicators request.
//!
//! Each request moves through a fixed sequence of stages:
//!
//! ```text
//! Received -> Derived -> Scaled -> Predicted
//! ```
//!
//! Any stage may end the request with a `PredictionFailure`. The scaler and
//! model are loaded once at startup and never mutated, so the service is
//! shared across requests without locks.

use std::sync::Arc;

use crate::domain::{FeatureDeriver, FeatureError, ScalerState, ScalingError, WaterQuality, TARGET_NAMES};
use crate::ports::{ModelError, Regressor};

/// Stage a request has reached in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionStage {
    Received,
    Derived,
    Scaled,
    Predicted,
}

impl std::fmt::Display for PredictionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Derived => write!(f, "derived"),
            Self::Scaled => write!(f, "scaled"),
            Self::Predicted => write!(f, "predicted"),
        }
    }
}

/// Terminal failure of a prediction request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionFailure {
    #[error("Missing required field 'fecha'")]
    MissingDateField,

    #[error("Invalid date format '{0}', expected YYYY-MM-DD")]
    InvalidDateFormat(String),

    #[error("Scaling error: {0}")]
    Scaling(#[from] ScalingError),

    #[error("Prediction error: {0}")]
    Prediction(#[from] ModelError),
}

impl From<FeatureError> for PredictionFailure {
    fn from(err: FeatureError) -> Self {
        match err {
            FeatureError::InvalidDateFormat(input) => Self::InvalidDateFormat(input),
            // The window is validated when the deriver is built.
            other @ FeatureError::EmptyWindow { .. } => {
                Self::Scaling(ScalingError::InvalidState(other.to_string()))
            }
        }
    }
}

impl PredictionFailure {
    /// The last stage the request reached before failing.
    #[must_use]
    pub fn stage(&self) -> PredictionStage {
        match self {
            Self::MissingDateField | Self::InvalidDateFormat(_) => PredictionStage::Received,
            Self::Scaling(_) => PredictionStage::Derived,
            Self::Prediction(_) => PredictionStage::Scaled,
        }
    }

    /// Whether the failure was caused by the request input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingDateField | Self::InvalidDateFormat(_))
    }
}

/// Service turning a request date into six water-quality indicators.
pub struct PredictionService<R>
where
    R: Regressor,
{
    deriver: FeatureDeriver,
    scaler: Arc<ScalerState>,
    model: Arc<R>,
}

impl<R> PredictionService<R>
where
    R: Regressor,
{
    /// Create a new prediction service.
    pub fn new(deriver: FeatureDeriver, scaler: ScalerState, model: R) -> Self {
        Self {
            deriver,
            scaler: Arc::new(scaler),
            model: Arc::new(model),
        }
    }

    /// Name of the serving model.
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    #[must_use]
    pub fn scaler(&self) -> &ScalerState {
        &self.scaler
    }

    #[must_use]
    pub fn deriver(&self) -> &FeatureDeriver {
        &self.deriver
    }

    /// Run one request.
    ///
    /// `fecha` is the raw date field of the request, `None` when absent.
    ///
    /// # Errors
    /// - `MissingDateField` if `fecha` is `None`
    /// - `InvalidDateFormat` if `fecha` is not a `YYYY-MM-DD` date
    /// - `Scaling` if the feature row cannot be scaled
    /// - `Prediction` if the model rejects the vector or returns a non-finite value
    pub fn predict(&self, fecha: Option<&str>) -> Result<WaterQuality, PredictionFailure> {
        let result = self.run(fecha);
        if let Err(failure) = &result {
            let input = fecha.unwrap_or("<missing>");
            if failure.is_client_error() {
                tracing::warn!(
                    "Prediction rejected at stage {} for fecha={}: {}",
                    failure.stage(),
                    input,
                    failure
                );
            } else {
                tracing::error!(
                    "Prediction failed at stage {} for fecha={} (model={}): {}",
                    failure.stage(),
                    input,
                    self.model.name(),
                    failure
                );
            }
        }
        result
    }

    fn run(&self, fecha: Option<&str>) -> Result<WaterQuality, PredictionFailure> {
        let fecha = fecha.ok_or(PredictionFailure::MissingDateField)?;

        let row = self.deriver.derive(fecha, self.scaler.column_order())?;
        tracing::debug!("Derived features for {}: {:?}", fecha, row.values());

        let scaled = self.scaler.apply(&row)?;
        tracing::debug!("Scaled features for {}: {:?}", fecha, scaled.as_slice());

        let raw = self.model.predict(scaled.as_slice())?;
        if let Some(i) = raw.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite(TARGET_NAMES[i]).into());
        }

        let quality = WaterQuality::from_raw(raw);
        tracing::info!(
            "Request for fecha={} reached stage {} with {}: {:?}",
            fecha,
            PredictionStage::Predicted,
            self.model.name(),
            quality
        );
        Ok(quality)
    }
}
