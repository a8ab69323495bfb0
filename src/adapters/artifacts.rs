//! Artifact adapter: Reads and writes the persisted training outputs.
//!
//! Layout of a model directory:
//! - `best_rf_model.json`  random forest export (variant A)
//! - `best_xgb_model.json` gradient-boosted export (variant B)
//! - `scaler.json`         scaler bundle (mean, std, columns)
//!
//! Serving only reads these files, once, at startup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use super::ensemble::{ActiveModel, GradientBoostedRegressor, RandomForestRegressor};
use crate::domain::ScalerState;
use crate::ports::Regressor;
use crate::AquaError;

/// File name of the random forest export.
pub const RANDOM_FOREST_FILE: &str = "best_rf_model.json";

/// File name of the gradient-boosted export.
pub const GRADIENT_BOOSTED_FILE: &str = "best_xgb_model.json";

/// File name of the scaler bundle.
pub const SCALER_FILE: &str = "scaler.json";

/// Error type for artifact operations.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed artifact {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::NotFound(path.to_path_buf())
        } else {
            ArtifactError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    serde_json::from_str(&content).map_err(|e| ArtifactError::Malformed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load a scaler bundle.
///
/// # Errors
/// Returns error if the file is missing, unreadable or fails validation.
pub fn load_scaler(path: &Path) -> Result<ScalerState, ArtifactError> {
    let scaler: ScalerState = read_json(path)?;
    tracing::info!(
        "Loaded scaler from {:?} (columns={:?})",
        path,
        scaler.column_order()
    );
    Ok(scaler)
}

/// Write a scaler bundle as one unit.
///
/// The bundle is written to a sibling temporary file and renamed into
/// place, so readers never observe statistics without their column order.
///
/// # Errors
/// Returns error if the file cannot be written.
pub fn save_scaler(path: &Path, scaler: &ScalerState) -> Result<(), ArtifactError> {
    let io_err = |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let bytes = serde_json::to_vec_pretty(scaler).map_err(|e| ArtifactError::Malformed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;

    tracing::info!("Wrote scaler bundle to {:?}", path);
    Ok(())
}

/// Load the random forest export.
///
/// # Errors
/// Returns error if the file is missing or malformed.
pub fn load_random_forest(path: &Path) -> Result<RandomForestRegressor, ArtifactError> {
    let model: RandomForestRegressor = read_json(path)?;
    tracing::info!(
        "Loaded random forest from {:?} (n_trees={}, n_features={})",
        path,
        model.n_trees(),
        model.n_features()
    );
    Ok(model)
}

/// Load the gradient-boosted export.
///
/// # Errors
/// Returns error if the file is missing or malformed.
pub fn load_gradient_boosted(path: &Path) -> Result<GradientBoostedRegressor, ArtifactError> {
    let model: GradientBoostedRegressor = read_json(path)?;
    tracing::info!(
        "Loaded gradient-boosted model from {:?} (n_trees={}, n_features={})",
        path,
        model.n_trees(),
        model.n_features()
    );
    Ok(model)
}

/// Select the serving model from `model_dir`.
///
/// The random forest is tried first; any failure falls back to the
/// gradient-boosted export.
///
/// # Errors
/// Returns `AquaError::NoModelAvailable` if neither export loads.
pub fn select_model(model_dir: &Path) -> Result<ActiveModel, AquaError> {
    let random_forest = match load_random_forest(&model_dir.join(RANDOM_FOREST_FILE)) {
        Ok(model) => {
            tracing::info!("Model loaded: RandomForest");
            return Ok(ActiveModel::RandomForest(model));
        }
        Err(e) => {
            tracing::warn!("Random forest unavailable ({}), trying gradient-boosted model", e);
            e
        }
    };

    match load_gradient_boosted(&model_dir.join(GRADIENT_BOOSTED_FILE)) {
        Ok(model) => {
            tracing::info!("Model loaded: XGBoost");
            Ok(ActiveModel::GradientBoosted(model))
        }
        Err(gradient_boosted) => {
            tracing::error!("No trained model found in {:?}", model_dir);
            Err(AquaError::NoModelAvailable {
                random_forest,
                gradient_boosted,
            })
        }
    }
}

/// Check that a model and scaler agree on the feature count.
///
/// # Errors
/// Returns `AquaError::Validation` on mismatch.
pub fn check_compatible<R: Regressor + ?Sized>(
    model: &R,
    scaler: &ScalerState,
) -> Result<(), AquaError> {
    let columns = scaler.column_order().len();
    if model.n_features() != columns {
        return Err(AquaError::Validation(format!(
            "{} expects {} features but scaler has {} columns",
            model.name(),
            model.n_features(),
            columns
        )));
    }
    Ok(())
}

/// Load everything the prediction service needs, in startup order.
///
/// The model is selected first, so a directory without any model export
/// reports `NoModelAvailable` whatever the state of the scaler file. The
/// scaler is loaded next and checked against the model's feature count.
///
/// # Errors
/// - `AquaError::NoModelAvailable` if neither model export loads
/// - `AquaError::Artifact` if the scaler bundle cannot be loaded
/// - `AquaError::Validation` if model and scaler disagree on feature count
pub fn load_serving_artifacts(
    model_dir: &Path,
    scaler_path: &Path,
) -> Result<(ActiveModel, ScalerState), AquaError> {
    let model = select_model(model_dir)?;
    let scaler = load_scaler(scaler_path)?;
    check_compatible(&model, &scaler)?;
    Ok((model, scaler))
}
