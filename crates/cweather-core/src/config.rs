use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable that overrides `weather.api_key`.
pub const API_KEY_ENV: &str = "CW_API_KEY";

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

    /// Get a single-line message summarizing all errors
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

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Message transport settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Upstream weather API settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Responder serve loop settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Client settings
    #[serde(default)]
    pub requestor: RequestorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// NATS server URL. A `tls://` scheme requires an encrypted connection.
    #[serde(default = "default_transport_url")]
    pub url: String,

    /// Optional credentials file, passed to the transport untouched
    #[serde(default)]
    pub creds: Option<PathBuf>,

    /// Subject that weather requests are published on
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Queue group shared by all responder instances
    #[serde(default = "default_queue_group")]
    pub queue_group: String,

    /// Connection name reported to the server
    #[serde(default = "default_connection_name")]
    pub name: String,
}

fn default_transport_url() -> String {
    "127.0.0.1".to_string()
}

fn default_subject() -> String {
    "weather.current".to_string()
}

fn default_queue_group() -> String {
    "cw".to_string()
}

fn default_connection_name() -> String {
    "cw-responder".to_string()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: default_transport_url(),
            creds: None,
            subject: default_subject(),
            queue_group: default_queue_group(),
            name: default_connection_name(),
        }
    }
}

impl TransportConfig {
    /// Whether the configured URL asks for an encrypted connection.
    pub fn requires_tls(&self) -> bool {
        self.url.trim().to_ascii_lowercase().starts_with("tls://")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the current-weather endpoint
    #[serde(default = "default_weather_api_url")]
    pub api_url: String,

    /// API key sent as the `APPID` query parameter
    #[serde(default)]
    pub api_key: Option<String>,

    /// Upper bound on a single upstream request, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_weather_api_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_request_timeout_secs() -> u64 {
    4
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_url: default_weather_api_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl WeatherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live of a cached response, in seconds (default: 300)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached locations
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_max_entries() -> usize {
    1024
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Requests handled concurrently per instance (1 = strictly serial)
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_max_in_flight() -> usize {
    1
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestorConfig {
    /// NATS server URL used by the client
    #[serde(default = "default_requestor_url")]
    pub url: String,

    /// How long to wait for a reply, in seconds
    #[serde(default = "default_requestor_timeout_secs")]
    pub timeout_secs: u64,

    /// IP geolocation endpoint used when no location is given
    #[serde(default = "default_geolocate_url")]
    pub geolocate_url: String,
}

fn default_requestor_url() -> String {
    "localhost".to_string()
}

fn default_requestor_timeout_secs() -> u64 {
    5
}

fn default_geolocate_url() -> String {
    "https://ipinfo.io/json".to_string()
}

impl Default for RequestorConfig {
    fn default() -> Self {
        Self {
            url: default_requestor_url(),
            timeout_secs: default_requestor_timeout_secs(),
            geolocate_url: default_geolocate_url(),
        }
    }
}

impl RequestorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and defaults are used when nothing is there. The API key
    /// environment variable is applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.display().to_string()));
                }
                Self::from_file(path)?
            }
            None => match Self::config_path() {
                Some(default_path) if default_path.exists() => Self::from_file(&default_path)?,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Validate the configuration, logging warnings.
    ///
    /// Returns an error summarising every failed check.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(self)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.weather.api_key = Some(key);
        }
    }

    /// The API key, or an error when none has been configured.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.weather
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ConfigError::MissingSetting(format!(
                    "weather.api_key (pass it as an argument or set {})",
                    API_KEY_ENV
                ))
            })
    }

    /// Transport settings for the client: the responder's settings with the
    /// client URL.
    pub fn requestor_transport(&self) -> TransportConfig {
        TransportConfig {
            url: self.requestor.url.clone(),
            name: "cw-requestor".to_string(),
            ..self.transport.clone()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.transport.url.trim().is_empty() {
            result.add_error("transport.url", "Transport URL must not be empty");
        }
        if self.requestor.url.trim().is_empty() {
            result.add_error("requestor.url", "Transport URL must not be empty");
        }

        if let Some(creds) = &self.transport.creds {
            if !creds.is_file() {
                result.add_error(
                    "transport.creds",
                    format!("Credentials file does not exist: {}", creds.display()),
                );
            }
        }

        self.validate_subject(&self.transport.subject, "transport.subject", &mut result);
        self.validate_subject(
            &self.transport.queue_group,
            "transport.queue_group",
            &mut result,
        );

        self.validate_url(&self.weather.api_url, "weather.api_url", &mut result);
        if let Ok(url) = Url::parse(&self.weather.api_url) {
            if url.scheme() == "http" {
                result.add_warning(
                    "weather.api_url",
                    "API key will be sent unencrypted over plain http",
                );
            }
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Upstream request timeout must be greater than 0",
            );
        } else if self.weather.request_timeout_secs > self.requestor.timeout_secs {
            result.add_warning(
                "weather.request_timeout_secs",
                "Upstream timeout is longer than the client reply timeout",
            );
        }

        if self.cache.ttl_secs == 0 {
            result.add_warning("cache.ttl_secs", "Caching disabled (0 seconds)");
        }
        if self.cache.max_entries == 0 {
            result.add_error("cache.max_entries", "Cache capacity must be greater than 0");
        }

        if self.server.max_in_flight == 0 {
            result.add_error(
                "server.max_in_flight",
                "At least one request must be allowed in flight",
            );
        }

        if self.requestor.timeout_secs == 0 {
            result.add_error(
                "requestor.timeout_secs",
                "Reply timeout must be greater than 0",
            );
        }
        self.validate_url(
            &self.requestor.geolocate_url,
            "requestor.geolocate_url",
            &mut result,
        );

        result
    }

    /// Validate a subject or queue group name
    fn validate_subject(&self, subject: &str, field_name: &str, result: &mut ValidationResult) {
        if subject.is_empty() {
            result.add_error(field_name, "Must not be empty");
        } else if subject.chars().any(char::is_whitespace) {
            result.add_error(field_name, "Must not contain whitespace");
        }
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

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Get the default path of the configuration file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cweather").join("config.toml"))
    }
}
