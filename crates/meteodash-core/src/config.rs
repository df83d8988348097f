use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

const APP_DIR_NAME: &str = "meteodash";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Longest selectable date span unless configured otherwise.
pub const DEFAULT_MAX_RANGE_DAYS: i64 = 90;

/// Trailing window used for the initial date range unless configured otherwise.
pub const DEFAULT_RANGE_DAYS: i64 = 19;

/// Upper bound for `filters.max_range_days` (about ten years).
pub const MAX_RANGE_LIMIT_DAYS: i64 = 3660;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote archive endpoint settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Request cache and retry settings
    #[serde(default)]
    pub query: QueryConfig,

    /// Filter limits and state persistence
    #[serde(default)]
    pub filters: FiltersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the historical weather archive
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Timezone mode passed to the archive (`auto` resolves from coordinates)
    pub timezone: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://archive-api.open-meteo.com/v1".to_string(),
            timeout_secs: 10,
            timezone: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Age after which a cached response is refetched
    #[serde(default = "default_stale_secs")]
    pub stale_secs: u64,

    /// Age after which an unused cached response is dropped
    #[serde(default = "default_gc_secs")]
    pub gc_secs: u64,

    /// Retries after the first failed attempt
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Keep the last successful hourly result visible while a new key loads
    #[serde(default = "default_true")]
    pub keep_previous_data: bool,
}

fn default_stale_secs() -> u64 {
    5 * 60
}

fn default_gc_secs() -> u64 {
    10 * 60
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_initial_delay_ms() -> u64 {
    1000
}

fn default_retry_max_delay_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_secs: default_stale_secs(),
            gc_secs: default_gc_secs(),
            retry_attempts: default_retry_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            keep_previous_data: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersConfig {
    /// Longest selectable date span, in days
    #[serde(default = "default_max_range_days")]
    pub max_range_days: i64,

    /// Length of the trailing window used for the initial date range
    #[serde(default = "default_range_days")]
    pub default_range_days: i64,

    /// Directory holding persisted filter state (defaults to the config dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Reject out-of-policy date ranges at the store's validated entry point
    #[serde(default = "default_true")]
    pub enforce_range: bool,
}

fn default_max_range_days() -> i64 {
    DEFAULT_MAX_RANGE_DAYS
}

fn default_range_days() -> i64 {
    DEFAULT_RANGE_DAYS
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            max_range_days: default_max_range_days(),
            default_range_days: default_range_days(),
            storage_dir: None,
            enforce_range: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from the user config directory, creating a default file if missing.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, creating a default file if missing.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            tracing::info!("Wrote default config to {}", config_path.display());
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_url(&self.api.base_url, "api.base_url", &mut result);

        if self.api.timeout_secs == 0 {
            result.add_error("api.timeout_secs", "Timeout must be greater than 0");
        }
        if self.api.timezone.trim().is_empty() {
            result.add_error("api.timezone", "Timezone must not be empty");
        }

        if self.filters.max_range_days <= 0 {
            result.add_error(
                "filters.max_range_days",
                "Maximum range must be at least one day",
            );
        } else if self.filters.max_range_days > MAX_RANGE_LIMIT_DAYS {
            result.add_error(
                "filters.max_range_days",
                format!(
                    "Maximum range ({}) exceeds the archive limit of {} days",
                    self.filters.max_range_days, MAX_RANGE_LIMIT_DAYS
                ),
            );
        }
        if self.filters.default_range_days <= 0 {
            result.add_error(
                "filters.default_range_days",
                "Default range must be at least one day",
            );
        } else if self.filters.default_range_days > self.filters.max_range_days {
            result.add_error(
                "filters.default_range_days",
                format!(
                    "Default range ({}) exceeds the maximum range ({})",
                    self.filters.default_range_days, self.filters.max_range_days
                ),
            );
        }

        if self.query.gc_secs < self.query.stale_secs {
            result.add_warning(
                "query.gc_secs",
                "Cache entries are dropped before they go stale",
            );
        }
        if self.query.retry_attempts > 10 {
            result.add_warning("query.retry_attempts", "Retry count is unusually large (>10)");
        }

        result
    }

    fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Directory used for persisted dashboard state
    pub fn state_dir(&self) -> Result<PathBuf> {
        match &self.filters.storage_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::app_dir(),
        }
    }

    fn app_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR_NAME))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.api.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "api.base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.api.base_url = "ftp://archive.example.com".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_default_range_longer_than_max() {
        let mut config = Config::default();
        config.filters.default_range_days = 120;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "filters.default_range_days"));
    }

    #[test]
    fn test_huge_range_rejected() {
        let mut config = Config::default();
        config.filters.max_range_days = 200_000_000;
        config.filters.default_range_days = 200_000_000;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "filters.max_range_days"));

        config.filters.max_range_days = MAX_RANGE_LIMIT_DAYS;
        config.filters.default_range_days = MAX_RANGE_LIMIT_DAYS;
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_short_gc_is_warning() {
        let mut config = Config::default();
        config.query.gc_secs = 10;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "query.gc_secs"));
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.filters.max_range_days, 90);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.api.base_url, config.api.base_url);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[filters]\nmax_range_days = 30\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.filters.max_range_days, 30);
        assert_eq!(config.filters.default_range_days, 19);
        assert_eq!(config.query.stale_secs, 300);
        assert_eq!(config.api.timezone, "auto");
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[filters\nmax_range_days = 30\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_storage_dir_override() {
        let mut config = Config::default();
        config.filters.storage_dir = Some(PathBuf::from("/tmp/meteodash-state"));
        assert_eq!(
            config.state_dir().unwrap(),
            PathBuf::from("/tmp/meteodash-state")
        );
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
