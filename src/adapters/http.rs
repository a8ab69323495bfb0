//! HTTP adapter: axum routes for the prediction service.
//!
//! - `POST /predict` with `{"fecha": "YYYY-MM-DD"}` returns the six indicators
//! - `GET /health` reports the active model
//!
//! Failures are returned as `{"error": <message>}` with 400 for input
//! problems and 500 for scaling or model problems.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::application::{PredictionFailure, PredictionService};
use crate::ports::Regressor;

/// Request field holding the date.
pub const DATE_FIELD: &str = "fecha";

impl PredictionFailure {
    /// HTTP status for this failure.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingDateField | Self::InvalidDateFormat(_) => StatusCode::BAD_REQUEST,
            Self::Scaling(_) | Self::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PredictionFailure {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

/// Build the service router.
pub fn build_router<R: Regressor + 'static>(service: Arc<PredictionService<R>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/predict", post(predict::<R>))
        .route("/health", get(health::<R>))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service)
}

/// Pull the raw date out of a request body.
///
/// A body that is not a JSON object (or not JSON at all) has no date field.
/// A non-string `fecha` is passed through in its JSON form so it fails date
/// parsing.
fn extract_fecha(body: Result<Json<Value>, JsonRejection>) -> Option<String> {
    let Json(value) = match body {
        Ok(json) => json,
        Err(rejection) => {
            tracing::warn!("Rejected request body: {}", rejection.body_text());
            return None;
        }
    };

    match value.get(DATE_FIELD)? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

async fn predict<R: Regressor + 'static>(
    State(service): State<Arc<PredictionService<R>>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let fecha = extract_fecha(body);
    match service.predict(fecha.as_deref()) {
        Ok(quality) => (StatusCode::OK, Json(quality)).into_response(),
        Err(failure) => failure.into_response(),
    }
}

async fn health<R: Regressor + 'static>(
    State(service): State<Arc<PredictionService<R>>>,
) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "model": service.model_name(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
