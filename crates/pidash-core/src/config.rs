use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "PIDASH_CONFIG";

/// Prefix for per-setting environment overrides, e.g. `PIDASH__WEATHER__USER_AGENT`.
const ENV_PREFIX: &str = "PIDASH";
const ENV_SEPARATOR: &str = "__";

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

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a summary of all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A fixed point the dashboard reports on. The first configured location is
/// the primary one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream and location settings
    pub weather: WeatherConfig,

    /// Disk cache settings
    pub cache: CacheConfig,

    /// HTTP server settings
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Locations to report on, primary first
    pub locations: Vec<Location>,

    /// Base URL of the NWS API
    pub base_url: String,

    /// Client identification sent with every upstream request.
    /// NWS asks for an application name plus a contact.
    pub user_agent: String,

    /// Per-request upstream timeout
    pub request_timeout_secs: u64,

    /// TTL for the point -> grid mapping (changes rarely)
    pub points_ttl_secs: u64,

    /// TTL for hourly data, which drives "current" conditions
    pub hourly_ttl_secs: u64,

    /// TTL for the day/night forecast
    pub forecast_ttl_secs: u64,

    /// Serve an expired cache entry when the upstream is down
    pub serve_stale: bool,

    /// Retries for transient upstream failures
    pub max_retries: u32,
}

fn default_locations() -> Vec<Location> {
    vec![
        Location::new("San Diego, CA", 32.7764, -117.0719),
        Location::new("Erie, CO", 40.0503, -105.0500),
        Location::new("Boston, MA", 42.3601, -71.0589),
    ]
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            locations: default_locations(),
            base_url: "https://api.weather.gov".to_string(),
            user_agent: "pidash/0.1 (contact: local-kiosk)".to_string(),
            request_timeout_secs: 15,
            points_ttl_secs: 7 * 24 * 3600,
            hourly_ttl_secs: 10 * 60,
            forecast_ttl_secs: 30 * 60,
            serve_stale: true,
            max_retries: 1,
        }
    }
}

impl WeatherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn points_ttl(&self) -> Duration {
        Duration::from_secs(self.points_ttl_secs)
    }

    pub fn hourly_ttl(&self) -> Duration {
        Duration::from_secs(self.hourly_ttl_secs)
    }

    pub fn forecast_ttl(&self) -> Duration {
        Duration::from_secs(self.forecast_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding one JSON file per cache key
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pidash");
        Self { dir }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, e.g. "127.0.0.1:8000"
    pub address: String,

    /// Directory with index.html and the dashboard assets
    pub frontend_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8000".to_string(),
            frontend_dir: PathBuf::from("frontend"),
        }
    }
}

impl ServerConfig {
    /// Parsed listen address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.address.parse().map_err(|e| {
            ConfigError::Invalid(format!("server.address '{}': {}", self.address, e))
        })
    }
}

impl Config {
    /// Load configuration, writing a default file first if none exists.
    ///
    /// An explicit path in `PIDASH_CONFIG` must exist.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(explicit);
            if !path.exists() {
                return Err(ConfigError::NotFound(path.display().to_string()));
            }
            return Self::load_from(&path);
        }

        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            tracing::info!("Writing default config to {}", config_path.display());
            Self::default().save_to(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a TOML file layered with `PIDASH__*` environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path.to_path_buf())
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult), ConfigError> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();
        let weather = &self.weather;

        self.validate_url(&weather.base_url, "weather.base_url", &mut result);

        if weather.user_agent.trim().is_empty() {
            result.add_error(
                "weather.user_agent",
                "User agent must identify the client to the upstream",
            );
        }

        if weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Timeout must be greater than 0",
            );
        }

        for (field, ttl) in [
            ("weather.points_ttl_secs", weather.points_ttl_secs),
            ("weather.hourly_ttl_secs", weather.hourly_ttl_secs),
            ("weather.forecast_ttl_secs", weather.forecast_ttl_secs),
        ] {
            if ttl == 0 {
                result.add_warning(field, "Caching disabled (0 seconds)");
            }
        }

        if weather.locations.is_empty() {
            result.add_warning("weather.locations", "No locations configured");
        }

        for (i, location) in weather.locations.iter().enumerate() {
            let field = format!("weather.locations[{}]", i);
            if location.name.trim().is_empty() {
                result.add_warning(&field, "Location has no name");
            }
            if !(-90.0..=90.0).contains(&location.latitude) {
                result.add_error(
                    &field,
                    format!("Latitude out of range: {}", location.latitude),
                );
            }
            if !(-180.0..=180.0).contains(&location.longitude) {
                result.add_error(
                    &field,
                    format!("Longitude out of range: {}", location.longitude),
                );
            }
        }

        if let Err(e) = self.server.socket_addr() {
            result.add_error("server.address", e.to_string());
        }

        if !self.server.frontend_dir.is_dir() {
            result.add_warning(
                "server.frontend_dir",
                format!(
                    "Directory does not exist: {}",
                    self.server.frontend_dir.display()
                ),
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
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

    /// Save configuration to a file
    pub fn save_to(&self, config_path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Invalid(format!("Failed to create config directory: {}", e))
            })?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, contents).map_err(|e| {
            ConfigError::Invalid(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Get the default path of the configuration file
    fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("platform config directory".to_string()))?
            .join("pidash");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        let result = config.validate();
        // Only warnings (e.g. missing frontend dir), no errors
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_default_locations_primary_first() {
        let config = Config::default();
        assert_eq!(config.weather.locations.len(), 3);
        assert_eq!(config.weather.locations[0].name, "San Diego, CA");
    }

    #[test]
    fn test_default_ttls() {
        let weather = WeatherConfig::default();
        assert_eq!(weather.points_ttl(), Duration::from_secs(604_800));
        assert_eq!(weather.hourly_ttl(), Duration::from_secs(600));
        assert_eq!(weather.forecast_ttl(), Duration::from_secs(1800));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.weather.base_url = "ftp://api.weather.gov".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.weather.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "weather.base_url"));
    }

    #[test]
    fn test_empty_user_agent_is_error() {
        let mut config = Config::default();
        config.weather.user_agent = "  ".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "weather.user_agent"));
    }

    #[test]
    fn test_out_of_range_latitude() {
        let mut config = Config::default();
        config.weather.locations = vec![Location::new("Nowhere", 91.0, 0.0)];
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.locations[0]"));
    }

    #[test]
    fn test_empty_locations_is_warning() {
        let mut config = Config::default();
        config.weather.locations.clear();
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "weather.locations"));
    }

    #[test]
    fn test_zero_ttl_is_warning() {
        let mut config = Config::default();
        config.weather.hourly_ttl_secs = 0;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "weather.hourly_ttl_secs"));
    }

    #[test]
    fn test_bad_server_address() {
        let mut config = Config::default();
        config.server.address = "localhost".to_string();
        assert!(config.server.socket_addr().is_err());
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.weather.locations = vec![Location::new("Erie, CO", 40.0503, -105.05)];
        config.weather.hourly_ttl_secs = 120;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.weather.locations, config.weather.locations);
        assert_eq!(loaded.weather.hourly_ttl_secs, 120);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\naddress = \"0.0.0.0:9000\"\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.server.address, "0.0.0.0:9000");
        assert_eq!(loaded.weather.forecast_ttl_secs, 1800);
        assert_eq!(loaded.weather.locations.len(), 3);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather\nbase_url = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
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
