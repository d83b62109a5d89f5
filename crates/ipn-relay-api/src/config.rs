//! Configuration types for the HTTP service

use ::config::{Config, Environment, File, FileFormat};
use ipn_relay_core::adapters::{BrevoClientConfig, DEFAULT_BASE_URL};
use ipn_relay_core::{IpnSettings, SignatureOptions, ValidationError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Paths served by the router itself.
const RESERVED_PATHS: [&str; 2] = ["/health", "/metrics"];

/// Environment variable naming an operator-supplied configuration file.
pub const CONFIG_FILE_ENV: &str = "IPN_RELAY_CONFIG_FILE";

/// Prefix of configuration environment variables, e.g. `IPN__SERVER__PORT`.
pub const ENV_PREFIX: &str = "IPN";

const SYSTEM_CONFIG_FILE: &str = "/etc/ipn-relay/service";
const LOCAL_CONFIG_FILE: &str = "config/service";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Notification endpoint settings
    pub webhook: WebhookConfig,

    /// Secrets, list routing and attribute names
    pub settings: IpnSettings,

    /// Contact provider API settings
    pub provider: ProviderConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load and validate the configuration.
    ///
    /// Sources are applied in order, later ones overriding earlier ones:
    ///  1. `/etc/ipn-relay/service.yaml`
    ///  2. `./config/service.yaml`
    ///  3. `explicit_path`, which must exist when given
    ///  4. `IPN__`-prefixed environment variables, `__` separating path
    ///     segments (`IPN__SETTINGS__SIGNING_SECRET`)
    ///
    /// Every field has a default, so no source is mandatory.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Load`] when a source cannot be read or deserialized,
    /// and the errors of [`ServiceConfig::validate`].
    pub fn load(explicit_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(
                File::with_name(SYSTEM_CONFIG_FILE)
                    .required(false)
                    .format(FileFormat::Yaml),
            )
            .add_source(
                File::with_name(LOCAL_CONFIG_FILE)
                    .required(false)
                    .format(FileFormat::Yaml),
            );

        if let Some(path) = explicit_path.filter(|p| !p.is_empty()) {
            builder = builder.add_source(
                File::with_name(path)
                    .required(true)
                    .format(FileFormat::Yaml),
            );
        }

        let loaded = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| ConfigError::Load {
                message: e.to_string(),
            })?;

        let service_config: Self = loaded.try_deserialize().map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })?;

        service_config.validate()?;
        Ok(service_config)
    }

    /// Check the configuration for values the service cannot run with.
    ///
    /// Missing secrets are not rejected here; see
    /// [`IpnSettings::missing_secrets`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.webhook.validate()?;
        self.provider.validate()?;
        self.settings.validate()?;
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_size: 51_200,
            enable_cors: false,
        }
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must not be 0".to_string(),
            });
        }
        if self.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Notification endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Path notifications are posted to
    pub endpoint_path: String,

    /// Canonical-form variant used to verify signatures
    pub signature: SignatureOptions,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/ipn".to_string(),
            signature: SignatureOptions::default(),
        }
    }
}

impl WebhookConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint_path.is_empty() {
            return Err(ConfigError::Missing {
                key: "webhook.endpoint_path".to_string(),
            });
        }
        if !self.endpoint_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhook.endpoint_path '{}' must start with '/'",
                    self.endpoint_path
                ),
            });
        }
        // Route syntax: `{param}`, `{*rest}` and the legacy `:param`, `*rest` forms.
        let has_capture = self.endpoint_path.contains(['{', '}'])
            || self
                .endpoint_path
                .split('/')
                .any(|segment| segment.starts_with([':', '*']));
        if has_capture {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhook.endpoint_path '{}' must be a literal path without parameters or wildcards",
                    self.endpoint_path
                ),
            });
        }
        if RESERVED_PATHS.contains(&self.endpoint_path.as_str()) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhook.endpoint_path '{}' is reserved",
                    self.endpoint_path
                ),
            });
        }
        Ok(())
    }
}

/// Contact provider API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API base URL
    pub base_url: String,

    /// Total request timeout in seconds
    pub timeout_seconds: u64,

    /// Connect timeout in seconds
    pub connect_timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
            connect_timeout_seconds: 10,
        }
    }
}

impl ProviderConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.base_url).map_err(|e| ConfigError::Invalid {
            message: format!("provider.base_url '{}' is not a URL: {}", self.base_url, e),
        })?;
        if url.scheme() != "https" {
            return Err(ConfigError::Invalid {
                message: format!("provider.base_url '{}' must use https", self.base_url),
            });
        }
        if self.timeout_seconds == 0 || self.connect_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "provider timeouts must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Client configuration for these settings.
    pub fn client_config(&self) -> BrevoClientConfig {
        BrevoClientConfig::default()
            .with_base_url(self.base_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_seconds))
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_seconds))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,

    /// Activity log file; activity goes to tracing when unset
    pub activity_log_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            activity_log_path: None,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Invalid settings: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration loading failed: {message}")]
    Load { message: String },
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
