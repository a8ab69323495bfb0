//! Service configuration from the environment.
//!
//! | variable | default |
//! |---|---|
//! | `AQUACAST_HOST` | `0.0.0.0` |
//! | `AQUACAST_PORT` | `5000` |
//! | `AQUACAST_MODEL_DIR` | `./models` |
//! | `AQUACAST_SCALER_PATH` | `<model_dir>/scaler.json` |
//! | `AQUACAST_REFERENCE_DATE` | `2023-01-01` |
//! | `AQUACAST_LOG_MODE` | `stdout` (or `file`) |
//! | `AQUACAST_LOG_FILE` | `./logs/aquacast.log` |

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::adapters::artifacts::SCALER_FILE;
use crate::domain::features::DATE_FORMAT;

pub const HOST_VAR: &str = "AQUACAST_HOST";
pub const PORT_VAR: &str = "AQUACAST_PORT";
pub const MODEL_DIR_VAR: &str = "AQUACAST_MODEL_DIR";
pub const SCALER_PATH_VAR: &str = "AQUACAST_SCALER_PATH";
pub const REFERENCE_DATE_VAR: &str = "AQUACAST_REFERENCE_DATE";
pub const LOG_MODE_VAR: &str = "AQUACAST_LOG_MODE";
pub const LOG_FILE_VAR: &str = "AQUACAST_LOG_FILE";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MODEL_DIR: &str = "./models";
const DEFAULT_LOG_FILE: &str = "./logs/aquacast.log";

/// Load `.env` into the process environment, if present.
///
/// Variables already set in the environment are not overridden. Call this
/// before reading [`LogConfig`] or [`ServiceConfig`].
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Stdout,
    File,
}

/// Logging destination settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub mode: LogMode,
    /// Used when `mode` is `File`
    pub file: PathBuf,
}

impl LogConfig {
    /// Build the log settings from a variable lookup.
    ///
    /// Any mode other than `file` logs to stdout.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match lookup(LOG_MODE_VAR).as_deref().map(str::trim) {
            Some("file") => LogMode::File,
            _ => LogMode::Stdout,
        };
        let file = lookup(LOG_FILE_VAR)
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from);
        Self { mode, file }
    }
}

/// Error type for configuration loading.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings of the prediction service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub model_dir: PathBuf,
    pub scaler_path: PathBuf,
    /// Lower bound of the `normalized_date` window
    pub reference_date: NaiveDate,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let model_dir = PathBuf::from(DEFAULT_MODEL_DIR);
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            scaler_path: model_dir.join(SCALER_FILE),
            model_dir,
            reference_date: default_reference_date(),
        }
    }
}

fn default_reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN)
}

impl ServiceConfig {
    /// Read the configuration from the process environment.
    ///
    /// `.env` is not read here; see [`load_dotenv`].
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for an unparsable port or date.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for an unparsable port or date.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var(HOST_VAR).unwrap_or(defaults.host);

        let port = match var(PORT_VAR) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                ConfigError::InvalidValue {
                    name: PORT_VAR,
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => defaults.port,
        };

        let model_dir = var(MODEL_DIR_VAR).map_or(defaults.model_dir, PathBuf::from);
        let scaler_path =
            var(SCALER_PATH_VAR).map_or_else(|| model_dir.join(SCALER_FILE), PathBuf::from);

        let reference_date = match var(REFERENCE_DATE_VAR) {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| {
                ConfigError::InvalidValue {
                    name: REFERENCE_DATE_VAR,
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => defaults.reference_date,
        };

        Ok(Self {
            host,
            port,
            model_dir,
            scaler_path,
            reference_date,
        })
    }

    /// `host:port` string for binding.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[])).expect("defaults are valid");
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert_eq!(config.model_dir, PathBuf::from("./models"));
        assert_eq!(config.scaler_path, PathBuf::from("./models").join("scaler.json"));
        assert_eq!(
            config.reference_date,
            NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid date")
        );
    }

    #[test]
    fn test_scaler_follows_model_dir() {
        let config = ServiceConfig::from_lookup(lookup(&[(MODEL_DIR_VAR, "/srv/model")]))
            .expect("valid");
        assert_eq!(config.scaler_path, PathBuf::from("/srv/model/scaler.json"));

        let config = ServiceConfig::from_lookup(lookup(&[
            (MODEL_DIR_VAR, "/srv/model"),
            (SCALER_PATH_VAR, "/etc/aquacast/scaler.json"),
            (PORT_VAR, "8080"),
        ]))
        .expect("valid");
        assert_eq!(config.scaler_path, PathBuf::from("/etc/aquacast/scaler.json"));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ServiceConfig::from_lookup(lookup(&[(PORT_VAR, "http")])).expect_err("bad port");
        assert!(matches!(err, ConfigError::InvalidValue { name: PORT_VAR, .. }));

        let err = ServiceConfig::from_lookup(lookup(&[(REFERENCE_DATE_VAR, "01/01/2023")]))
            .expect_err("bad date");
        assert!(matches!(err, ConfigError::InvalidValue { name: REFERENCE_DATE_VAR, .. }));
    }

    #[test]
    fn test_log_config() {
        let logging = LogConfig::from_lookup(lookup(&[]));
        assert_eq!(logging.mode, LogMode::Stdout);
        assert_eq!(logging.file, PathBuf::from("./logs/aquacast.log"));

        let logging = LogConfig::from_lookup(lookup(&[
            (LOG_MODE_VAR, "file"),
            (LOG_FILE_VAR, "/var/log/aquacast.log"),
        ]));
        assert_eq!(logging.mode, LogMode::File);
        assert_eq!(logging.file, PathBuf::from("/var/log/aquacast.log"));
    }

    #[test]
    fn test_log_settings_read_from_env_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".env");
        std::fs::write(
            &path,
            "AQUACAST_LOG_MODE=file\nAQUACAST_LOG_FILE=/tmp/aquacast-test.log\n",
        )
        .expect("write");

        let vars: HashMap<String, String> = dotenvy::from_path_iter(&path)
            .expect("readable env file")
            .collect::<Result<_, _>>()
            .expect("valid env file");
        let logging = LogConfig::from_lookup(|name| vars.get(name).cloned());

        assert_eq!(logging.mode, LogMode::File);
        assert_eq!(logging.file, PathBuf::from("/tmp/aquacast-test.log"));
    }
}
