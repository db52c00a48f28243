//! Configuration management for `PowerFetch`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::PowerFetchError;
use crate::models::query::{
    DEFAULT_COMMUNITY, DEFAULT_FORMAT, DEFAULT_PARAMETERS, DEFAULT_THEME, DEFAULT_TIME_STANDARD,
    DEFAULT_USER, default_end_date, default_start_date,
};
use crate::models::{QueryForm, QueryParameters};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerFetchConfig {
    /// NASA POWER API configuration
    #[serde(default)]
    pub power: PowerConfig,
    /// Preprocessing / evaluation service configuration
    #[serde(default)]
    pub ml_service: MlServiceConfig,
    /// Download delivery settings
    #[serde(default)]
    pub downloads: DownloadsConfig,
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Default form values
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// NASA POWER API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerConfig {
    /// Hourly point endpoint
    #[serde(default = "default_power_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_power_timeout")]
    pub timeout_seconds: u32,
    /// Directory where raw datasets are stored for the preprocessing service
    #[serde(default = "default_dataset_dir")]
    pub dataset_dir: PathBuf,
}

/// Preprocessing and evaluation service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlServiceConfig {
    #[serde(default = "default_ml_base_url")]
    pub base_url: String,
    /// Request timeout in seconds; model training makes these calls slow
    #[serde(default = "default_ml_timeout")]
    pub timeout_seconds: u32,
}

/// Download delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadsConfig {
    /// Directory the CLI writes cleaned files to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Delay before a transient download handle is released
    #[serde(default = "default_release_grace")]
    pub release_grace_seconds: u64,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// PEM certificate, TLS is enabled when both cert and key are set
    pub tls_cert: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// OTLP/HTTP collector endpoint; traces are exported when set
    pub otlp_endpoint: Option<String>,
}

/// Default form values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default = "default_end_date")]
    pub end_date: NaiveDate,
    #[serde(default = "default_community")]
    pub community: String,
    #[serde(default = "default_parameters")]
    pub parameters: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_time_standard")]
    pub time_standard: String,
}

// Default value functions
fn default_power_base_url() -> String {
    "https://power.larc.nasa.gov/api/temporal/hourly/point".to_string()
}

fn default_power_timeout() -> u32 {
    60
}

fn default_dataset_dir() -> PathBuf {
    PathBuf::from("datasets")
}

fn default_ml_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_ml_timeout() -> u32 {
    300
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_release_grace() -> u64 {
    60
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_community() -> String {
    DEFAULT_COMMUNITY.to_string()
}

fn default_parameters() -> String {
    DEFAULT_PARAMETERS.to_string()
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

fn default_user() -> String {
    DEFAULT_USER.to_string()
}

fn default_time_standard() -> String {
    DEFAULT_TIME_STANDARD.to_string()
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            base_url: default_power_base_url(),
            timeout_seconds: default_power_timeout(),
            dataset_dir: default_dataset_dir(),
        }
    }
}

impl Default for MlServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_ml_base_url(),
            timeout_seconds: default_ml_timeout(),
        }
    }
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            release_grace_seconds: default_release_grace(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
            tls_cert: None,
            tls_key: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            end_date: default_end_date(),
            community: default_community(),
            parameters: default_parameters(),
            format: default_format(),
            theme: default_theme(),
            user: default_user(),
            time_standard: default_time_standard(),
        }
    }
}

impl Default for PowerFetchConfig {
    fn default() -> Self {
        Self {
            power: PowerConfig::default(),
            ml_service: MlServiceConfig::default(),
            downloads: DownloadsConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}

impl DownloadsConfig {
    #[must_use]
    pub fn release_grace(&self) -> Duration {
        Duration::from_secs(self.release_grace_seconds)
    }
}

impl DefaultsConfig {
    /// Form pre-filled with the configured defaults
    #[must_use]
    pub fn form(&self) -> QueryForm {
        QueryForm {
            start_date: Some(self.start_date),
            end_date: Some(self.end_date),
            community: self.community.clone(),
            parameters: self.parameters.clone(),
            format: self.format.clone(),
            theme: self.theme.clone(),
            user: self.user.clone(),
            time_standard: self.time_standard.clone(),
        }
    }

    /// Parameters built from the configured defaults
    #[must_use]
    pub fn parameters(&self) -> QueryParameters {
        QueryParameters {
            start_date: self.start_date,
            end_date: self.end_date,
            community: self.community.clone(),
            parameters: self.parameters.clone(),
            format: self.format.clone(),
            theme: self.theme.clone(),
            user: self.user.clone(),
            time_standard: self.time_standard.clone(),
        }
    }
}

impl PowerFetchConfig {
    /// Load configuration from `config_path`, or the default location, plus
    /// environment overrides
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. POWERFETCH__ML_SERVICE__BASE_URL
        builder = builder.add_source(
            Environment::with_prefix("POWERFETCH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: PowerFetchConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("powerfetch").join("config.toml"))
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.power.base_url.is_empty() {
            self.power.base_url = default_power_base_url();
        }
        if self.power.timeout_seconds == 0 {
            self.power.timeout_seconds = default_power_timeout();
        }
        if self.ml_service.base_url.is_empty() {
            self.ml_service.base_url = default_ml_base_url();
        }
        if self.ml_service.timeout_seconds == 0 {
            self.ml_service.timeout_seconds = default_ml_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        self.ml_service.base_url = self.ml_service.base_url.trim_end_matches('/').to_string();
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.power.timeout_seconds > 600 {
            return Err(PowerFetchError::config("POWER API timeout cannot exceed 600 seconds").into());
        }

        if self.ml_service.timeout_seconds > 3600 {
            return Err(
                PowerFetchError::config("ML service timeout cannot exceed 3600 seconds").into(),
            );
        }

        if self.downloads.release_grace_seconds > 3600 {
            return Err(PowerFetchError::config(
                "Download release grace cannot exceed 3600 seconds",
            )
            .into());
        }

        if self.defaults.start_date > self.defaults.end_date {
            return Err(PowerFetchError::config(
                "Default start date must not be after the default end date",
            )
            .into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(PowerFetchError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(PowerFetchError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("POWER API", &self.power.base_url),
            ("ML service", &self.ml_service.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(PowerFetchError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        if self.server.tls_cert.is_some() != self.server.tls_key.is_some() {
            return Err(PowerFetchError::config(
                "TLS requires both server.tls_cert and server.tls_key",
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PowerFetchConfig::default();
        assert_eq!(
            config.power.base_url,
            "https://power.larc.nasa.gov/api/temporal/hourly/point"
        );
        assert_eq!(config.ml_service.base_url, "http://localhost:8000");
        assert_eq!(config.downloads.release_grace(), Duration::from_secs(60));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.defaults.community, "RE");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = PowerFetchConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = PowerFetchConfig::default();
        config.power.timeout_seconds = 900;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_half_tls() {
        let mut config = PowerFetchConfig::default();
        config.server.tls_cert = Some(PathBuf::from("cert.pem"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults_trims_trailing_slash() {
        let mut config = PowerFetchConfig::default();
        config.ml_service.base_url = "http://ml:8000/".to_string();
        config.power.timeout_seconds = 0;
        config.apply_defaults();
        assert_eq!(config.ml_service.base_url, "http://ml:8000");
        assert_eq!(config.power.timeout_seconds, 60);
    }

    #[test]
    fn test_load_from_missing_path_uses_defaults() {
        let config =
            PowerFetchConfig::load_from_path(Some(PathBuf::from("does/not/exist.toml"))).unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_defaults_form_round_trips_to_parameters() {
        let defaults = DefaultsConfig::default();
        let params = QueryParameters::try_from(defaults.form()).unwrap();
        assert_eq!(params, defaults.parameters());
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = PowerFetchConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("powerfetch"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
