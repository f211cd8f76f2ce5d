// crates/annotation-broker-config/src/config.rs
// ============================================================================
// Module: Annotation Broker Configuration
// Description: Configuration loading and validation for the annotation broker.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: annotation-broker-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from an explicit argument, then the
//! `ANNOTATION_BROKER_CONFIG` environment variable, then
//! `annotation-broker.toml` in the working directory. Missing or invalid
//! configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use annotation_broker_core::ProtocolVersion;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "annotation-broker.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "ANNOTATION_BROKER_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum request timeout in milliseconds.
pub(crate) const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum request timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 120_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Annotation broker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Annotation server endpoint.
    pub endpoint: EndpointConfig,
    /// Protocol settings.
    #[serde(default)]
    pub protocol: ProtocolConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BrokerConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint.validate()?;
        self.protocol.validate()?;
        Ok(())
    }

    /// Returns the protocol version stamped on outgoing requests.
    #[must_use]
    pub fn protocol_version(&self) -> ProtocolVersion {
        ProtocolVersion::from_raw(self.protocol.version).unwrap_or_default()
    }
}

/// Annotation server endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Absolute `http` or `https` URL requests are posted to.
    pub url: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl EndpointConfig {
    /// Validates the endpoint URL and timeout.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid("endpoint.url must be set".to_string()));
        }
        let parsed = Url::parse(url)
            .map_err(|err| ConfigError::Invalid(format!("endpoint.url is invalid: {err}")))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ConfigError::Invalid(format!(
                    "endpoint.url scheme must be http or https, got {scheme}"
                )));
            }
        }
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "endpoint.timeout_ms must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Protocol configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    /// Protocol version filled into payloads that do not carry one.
    #[serde(default = "default_protocol_version")]
    pub version: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            version: default_protocol_version(),
        }
    }
}

impl ProtocolConfig {
    /// Validates the protocol version.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 {
            return Err(ConfigError::Invalid(
                "protocol.version must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Everything, including per-request tracing.
    Trace,
    /// Request submission and resolution details.
    Debug,
    /// Reload decisions and lifecycle events.
    #[default]
    Info,
    /// Transport failures.
    Warn,
    /// Protocol errors and critical escalations only.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output formats.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct LoggingConfig {
    /// Minimum level emitted.
    #[serde(default)]
    pub level: LogLevel,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit path, the environment, or the default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Default request timeout in milliseconds.
pub(crate) const fn default_timeout_ms() -> u64 {
    30_000
}

/// Default protocol version.
pub(crate) const fn default_protocol_version() -> u32 {
    1
}
