//! Runtime configuration.
//!
//! Resolution order: an explicit config path, else
//! `$BRENTSCOPE_HOME/config.json` when it exists, else built-in defaults.
//! `BRENTSCOPE_DATA_DIR`, `HOST` and `PORT` then override the file values.
//! Every field has a default, so a partial JSON file is valid.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::world_bank::{DEFAULT_BASE_URL, DEFAULT_PER_PAGE};
use crate::data_source::DateWindow;
use crate::retry::RetryConfig;
use crate::{CoreError, Indicator, ValidationError};

pub const DEFAULT_DECOMPOSITION_PERIOD: usize = 30;
pub const DEFAULT_ACF_LAGS: usize = 30;
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;
pub const DEFAULT_CHANGE_POINT_PENALTY: f64 = 15.0;
pub const DEFAULT_CHANGE_POINT_MIN_SIZE: usize = 2;
pub const DEFAULT_CHANGE_POINT_JUMP: usize = 5;
pub const DEFAULT_ADF_SIGNIFICANCE: f64 = 0.05;
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrentscopeConfig {
    pub data: DataConfig,
    pub extraction: ExtractionConfig,
    pub eda: EdaConfig,
    pub model: ModelConfig,
    pub server: ServerConfig,
}

/// Locations of the CSV files shared by the pipeline and the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    pub prices_file: String,
    pub world_data_file: String,
    pub merged_file: String,
    /// Served by `/api/data/forecast`.
    pub forecast_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            prices_file: "BrentOilprices.csv".to_owned(),
            world_data_file: "world_data.csv".to_owned(),
            merged_file: "merged_data.csv".to_owned(),
            forecast_file: "world_data.csv".to_owned(),
        }
    }
}

impl DataConfig {
    pub fn prices_path(&self) -> PathBuf {
        self.data_dir.join(&self.prices_file)
    }

    pub fn world_data_path(&self) -> PathBuf {
        self.data_dir.join(&self.world_data_file)
    }

    pub fn merged_path(&self) -> PathBuf {
        self.data_dir.join(&self.merged_file)
    }

    pub fn forecast_path(&self) -> PathBuf {
        self.data_dir.join(&self.forecast_file)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub base_url: String,
    pub country: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub indicators: Vec<Indicator>,
    pub timeout_ms: u64,
    pub max_retries: u32,
    /// Rows per World Bank page.
    pub per_page: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            country: "WLD".to_owned(),
            start_date: NaiveDate::from_ymd_opt(1986, 5, 20).unwrap_or(NaiveDate::MIN),
            end_date: NaiveDate::from_ymd_opt(2024, 9, 30).unwrap_or(NaiveDate::MAX),
            indicators: Indicator::defaults(),
            timeout_ms: 15_000,
            max_retries: 3,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl ExtractionConfig {
    pub fn window(&self) -> Result<DateWindow, ValidationError> {
        DateWindow::new(self.start_date, self.end_date)
    }

    pub fn retry(&self) -> RetryConfig {
        if self.max_retries == 0 {
            RetryConfig::no_retry()
        } else {
            RetryConfig::exponential(self.max_retries)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdaConfig {
    pub decomposition_period: usize,
    pub acf_lags: usize,
    pub histogram_bins: usize,
    pub change_point_penalty: f64,
    pub change_point_min_size: usize,
    pub change_point_jump: usize,
    pub adf_significance: f64,
}

impl Default for EdaConfig {
    fn default() -> Self {
        Self {
            decomposition_period: DEFAULT_DECOMPOSITION_PERIOD,
            acf_lags: DEFAULT_ACF_LAGS,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            change_point_penalty: DEFAULT_CHANGE_POINT_PENALTY,
            change_point_min_size: DEFAULT_CHANGE_POINT_MIN_SIZE,
            change_point_jump: DEFAULT_CHANGE_POINT_JUMP,
            adf_significance: DEFAULT_ADF_SIGNIFICANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub train_fraction: f64,
    /// `(p, d, q)`.
    pub arima_order: (usize, usize, usize),
    pub include_constant: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            train_fraction: DEFAULT_TRAIN_FRACTION,
            arima_order: (1, 1, 1),
            include_constant: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    /// Periodic dataset reload interval; `None` loads once at startup.
    pub refresh_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5000,
            cors_origin: "http://localhost:3000".to_owned(),
            refresh_secs: None,
        }
    }
}

impl BrentscopeConfig {
    /// Parse a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("failed to read '{}': {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| CoreError::Config(format!("invalid config '{}': {e}", path.display())))
    }

    /// Resolve configuration from an optional explicit path plus environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CoreError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let candidate = resolve_brentscope_home().join("config.json");
                if candidate.is_file() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        debug!(data_dir = %config.data.data_dir.display(), "configuration resolved");
        Ok(config)
    }

    /// Apply `BRENTSCOPE_DATA_DIR`, `HOST` and `PORT` through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("BRENTSCOPE_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            self.data.data_dir = PathBuf::from(dir);
        }
        if let Some(host) = lookup("HOST").filter(|v| !v.trim().is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT").filter(|v| !v.trim().is_empty()) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| CoreError::Config(format!("PORT must be a port number, got '{port}'")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        self.extraction.window()?;
        if self.extraction.indicators.is_empty() {
            return Err(ValidationError::NoIndicators.into());
        }
        if !(self.model.train_fraction > 0.0 && self.model.train_fraction <= 1.0) {
            return Err(CoreError::Config(format!(
                "model.train_fraction must be in (0, 1], got {}",
                self.model.train_fraction
            )));
        }
        if !(self.eda.adf_significance > 0.0 && self.eda.adf_significance < 1.0) {
            return Err(CoreError::Config(format!(
                "eda.adf_significance must be in (0, 1), got {}",
                self.eda.adf_significance
            )));
        }
        if self.eda.decomposition_period < 2 {
            return Err(CoreError::Config("eda.decomposition_period must be at least 2".into()));
        }
        if self.eda.change_point_min_size == 0 || self.eda.change_point_jump == 0 {
            return Err(CoreError::Config(
                "eda.change_point_min_size and eda.change_point_jump must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// `$BRENTSCOPE_HOME`, else `~/.brentscope`, else `.brentscope`.
pub fn resolve_brentscope_home() -> PathBuf {
    if let Some(path) = env::var_os("BRENTSCOPE_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".brentscope");
    }

    PathBuf::from(".brentscope")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = BrentscopeConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.eda.decomposition_period, 30);
        assert_eq!(config.eda.change_point_penalty, 15.0);
        assert_eq!(config.data.prices_path(), PathBuf::from("data/BrentOilprices.csv"));
        assert_eq!(config.extraction.indicators.len(), 4);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp");
        write!(file, r#"{{"eda": {{"change_point_penalty": 40.0}}, "server": {{"port": 8080}}}}"#)
            .expect("write");

        let config = BrentscopeConfig::from_file(file.path()).expect("parses");
        assert_eq!(config.eda.change_point_penalty, 40.0);
        assert_eq!(config.eda.acf_lags, 30);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.cors_origin, "http://localhost:3000");
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [("BRENTSCOPE_DATA_DIR", "/srv/data"), ("PORT", "9000")]
            .into_iter()
            .collect();
        let mut config = BrentscopeConfig::default();
        config
            .apply_env(|key| vars.get(key).map(|v| (*v).to_owned()))
            .expect("valid env");
        assert_eq!(config.data.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn bad_port_is_config_error() {
        let mut config = BrentscopeConfig::default();
        let err = config
            .apply_env(|key| (key == "PORT").then(|| "eighty".to_owned()))
            .expect_err("bad port");
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn rejects_out_of_range_train_fraction() {
        let mut config = BrentscopeConfig::default();
        config.model.train_fraction = 1.5;
        assert!(config.validate().is_err());
        config.model.train_fraction = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_retries_disables_retry() {
        let mut extraction = ExtractionConfig::default();
        extraction.max_retries = 0;
        assert!(!extraction.retry().enabled);
    }
}
