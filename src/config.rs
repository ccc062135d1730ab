//! Configuration management for the weather ETL pipeline
//!
//! Handles loading configuration from files and environment variables,
//! and provides validation for all configuration settings. The resulting
//! [`EtlConfig`] is passed explicitly into the pipeline; nothing reads
//! credentials or bucket names from ambient state after start-up.

use crate::EtlError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EtlConfig {
    /// Weather source configuration
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Geocoding service configuration
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Object storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Local output configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NASA POWER API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the POWER API
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// POWER user community (RE, AG or SB)
    #[serde(default = "default_weather_community")]
    pub community: String,
    /// Request timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u32,
    /// Largest date span, in days, accepted in a single request
    #[serde(default = "default_max_span_days")]
    pub max_span_days: u32,
}

/// Geocoding service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Base URL of the Nominatim instance
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// User agent sent with every lookup; Nominatim rejects anonymous clients
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds
    #[serde(default = "default_geocoding_timeout")]
    pub timeout_seconds: u32,
}

/// Object storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Upload the written file at the end of the run
    #[serde(default = "default_storage_enabled")]
    pub enabled: bool,
    /// Target bucket
    #[serde(default)]
    pub bucket: Option<String>,
    /// Key prefix placed before the execution-date segment
    #[serde(default)]
    pub prefix: String,
    /// Bucket region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Access key id; falls back to the standard AWS environment when unset
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret access key; falls back to the standard AWS environment when unset
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

/// Local output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the per-day CSV folders
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
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
    /// Directory receiving the persisted run logs
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

// Default value functions
fn default_weather_base_url() -> String {
    "https://power.larc.nasa.gov".to_string()
}

fn default_weather_community() -> String {
    "RE".to_string()
}

fn default_weather_timeout() -> u32 {
    30
}

fn default_max_span_days() -> u32 {
    366
}

fn default_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    format!("weather-etl/{}", crate::VERSION)
}

fn default_geocoding_timeout() -> u32 {
    10
}

fn default_storage_enabled() -> bool {
    true
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            community: default_weather_community(),
            timeout_seconds: default_weather_timeout(),
            max_span_days: default_max_span_days(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            user_agent: default_user_agent(),
            timeout_seconds: default_geocoding_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: default_storage_enabled(),
            bucket: None,
            prefix: String::new(),
            region: default_region(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: default_log_dir(),
        }
    }
}

impl EtlConfig {
    /// Load configuration from the default file location and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    ///
    /// Environment variables use the `WEATHER_ETL_` prefix with `__` between
    /// section and key, e.g. `WEATHER_ETL_STORAGE__BUCKET`.
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("weather-etl.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("WEATHER_ETL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: EtlConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_legacy_env(|key| std::env::var(key).ok());
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("weather-etl").join("config.toml"))
    }

    /// Fill storage settings from the plain variables older deployments export
    /// (`S3_BUCKET_NAME`, `AWS_REGION`). Explicit configuration wins.
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.storage.bucket.is_none() {
            self.storage.bucket = lookup("S3_BUCKET_NAME").filter(|b| !b.trim().is_empty());
        }
        if let Some(region) = lookup("AWS_REGION").filter(|r| !r.trim().is_empty()) {
            if self.storage.region == default_region() {
                self.storage.region = region;
            }
        }
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.community.is_empty() {
            self.weather.community = default_weather_community();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.weather.max_span_days == 0 {
            self.weather.max_span_days = default_max_span_days();
        }
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.geocoding.user_agent.is_empty() {
            self.geocoding.user_agent = default_user_agent();
        }
        if self.geocoding.timeout_seconds == 0 {
            self.geocoding.timeout_seconds = default_geocoding_timeout();
        }
        if self.storage.region.is_empty() {
            self.storage.region = default_region();
        }
        if self.output.data_dir.as_os_str().is_empty() {
            self.output.data_dir = default_data_dir();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.logging.log_dir.as_os_str().is_empty() {
            self.logging.log_dir = default_log_dir();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_storage()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 300 {
            return Err(EtlError::config("Weather API timeout cannot exceed 300 seconds").into());
        }

        if self.geocoding.timeout_seconds > 300 {
            return Err(EtlError::config("Geocoding timeout cannot exceed 300 seconds").into());
        }

        if self.weather.max_span_days > 3660 {
            return Err(EtlError::config(
                "Maximum date span cannot exceed 3660 days (10 years)",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(EtlError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(EtlError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let valid_communities = ["RE", "AG", "SB"];
        if !valid_communities.contains(&self.weather.community.as_str()) {
            return Err(EtlError::config(format!(
                "Invalid POWER community '{}'. Must be one of: {}",
                self.weather.community,
                valid_communities.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Weather API", &self.weather.base_url),
            ("Geocoding", &self.geocoding.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(
                    EtlError::config(format!("{name} base URL must be a valid HTTP or HTTPS URL"))
                        .into(),
                );
            }
        }

        Ok(())
    }

    /// Validate object storage settings
    fn validate_storage(&self) -> Result<()> {
        if let Some(bucket) = &self.storage.bucket {
            if bucket.trim().is_empty() {
                return Err(EtlError::config(
                    "Bucket name cannot be empty if provided. Either remove it or set a bucket.",
                )
                .into());
            }
        }

        match (
            &self.storage.access_key_id,
            &self.storage.secret_access_key,
        ) {
            (Some(_), None) | (None, Some(_)) => Err(EtlError::config(
                "Access key id and secret access key must be configured together",
            )
            .into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EtlConfig::default();
        assert_eq!(config.weather.base_url, "https://power.larc.nasa.gov");
        assert_eq!(config.weather.community, "RE");
        assert_eq!(config.weather.max_span_days, 366);
        assert_eq!(config.geocoding.timeout_seconds, 10);
        assert!(config.geocoding.user_agent.starts_with("weather-etl/"));
        assert!(config.storage.enabled);
        assert!(config.storage.bucket.is_none());
        assert_eq!(config.output.data_dir, PathBuf::from("data"));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = EtlConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = EtlConfig::default();
        config.weather.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_half_configured_credentials() {
        let mut config = EtlConfig::default();
        config.storage.access_key_id = Some("AKIAEXAMPLE".to_string());
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("configured together"));

        config.storage.secret_access_key = Some("secret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_blank_bucket() {
        let mut config = EtlConfig::default();
        config.storage.bucket = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults_fills_blanks() {
        let mut config = EtlConfig::default();
        config.weather.base_url.clear();
        config.weather.max_span_days = 0;
        config.logging.format.clear();
        config.apply_defaults();
        assert_eq!(config.weather.base_url, "https://power.larc.nasa.gov");
        assert_eq!(config.weather.max_span_days, 366);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_legacy_environment_fallbacks() {
        let env = HashMap::from([
            ("S3_BUCKET_NAME", "weather-archive"),
            ("AWS_REGION", "eu-west-1"),
        ]);

        let mut config = EtlConfig::default();
        config.apply_legacy_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.storage.bucket.as_deref(), Some("weather-archive"));
        assert_eq!(config.storage.region, "eu-west-1");
    }

    #[test]
    fn test_explicit_bucket_wins_over_legacy_environment() {
        let mut config = EtlConfig::default();
        config.storage.bucket = Some("configured".to_string());
        config.apply_legacy_env(|key| (key == "S3_BUCKET_NAME").then(|| "legacy".to_string()));
        assert_eq!(config.storage.bucket.as_deref(), Some("configured"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[storage]
bucket = "from-file"
prefix = "raw/weather"

[output]
data_dir = "/tmp/weather"
"#,
        )
        .unwrap();

        let config = EtlConfig::load_from_path(Some(path)).unwrap();
        assert_eq!(config.storage.bucket.as_deref(), Some("from-file"));
        assert_eq!(config.storage.prefix, "raw/weather");
        assert_eq!(config.output.data_dir, PathBuf::from("/tmp/weather"));
        assert_eq!(config.weather.community, "RE");
    }

    #[test]
    fn test_config_path_generation() {
        let path = EtlConfig::get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("weather-etl"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }
}
