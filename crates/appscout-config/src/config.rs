// crates/appscout-config/src/config.rs
// ============================================================================
// Module: Appscout Configuration
// Description: Configuration loading and validation for the bridge.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits,
//! then environment overrides are applied and the result is validated. A
//! missing file at the default location yields the built-in defaults; an
//! explicitly named file that cannot be read is an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "appscout.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "APPSCOUT_CONFIG";
/// Environment variable overriding the upstream base URL.
pub(crate) const UPSTREAM_URL_ENV_VAR: &str = "APPSCOUT_UPSTREAM_URL";
/// Environment variable overriding the server bind port.
pub(crate) const PORT_ENV_VAR: &str = "APPSCOUT_PORT";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default bind address for HTTP and SSE transports.
const DEFAULT_BIND: &str = "127.0.0.1:3000";
/// Default upstream base URL.
const DEFAULT_UPSTREAM_URL: &str = "https://trainai-tools.onrender.com";
/// Default upstream request timeout in milliseconds.
const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 30_000;
/// Minimum allowed upstream request timeout in milliseconds.
pub(crate) const MIN_UPSTREAM_TIMEOUT_MS: u64 = 100;
/// Maximum allowed upstream request timeout in milliseconds.
pub(crate) const MAX_UPSTREAM_TIMEOUT_MS: u64 = 120_000;
/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Maximum allowed request body size in bytes.
pub(crate) const MAX_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
/// Default user agent for outbound upstream requests.
const DEFAULT_USER_AGENT: &str = "appscout/0.1";
/// Maximum length of the outbound user agent string.
pub(crate) const MAX_USER_AGENT_LENGTH: usize = 256;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Appscout bridge configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AppscoutConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream API configuration.
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl AppscoutConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then `APPSCOUT_CONFIG`, then
    /// `appscout.toml` in the working directory. A missing file is an error
    /// only when the path was explicit; otherwise defaults apply. Environment
    /// overrides are applied before validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path.is_some();
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let mut config = if resolved.exists() {
            Self::from_file(&resolved)?
        } else if explicit {
            return Err(ConfigError::Io(format!(
                "config file not found: {}",
                resolved.display()
            )));
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a file already resolved and path-checked.
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies `APPSCOUT_UPSTREAM_URL` and `APPSCOUT_PORT` overrides.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| env::var(name).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// The lookup seam keeps the merge logic testable without touching
    /// process-global environment state.
    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(base_url) = lookup(UPSTREAM_URL_ENV_VAR) {
            self.upstream.base_url = base_url;
        }
        if let Some(port) = lookup(PORT_ENV_VAR) {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("APPSCOUT_PORT must be a port number".to_string()))?;
            let addr: SocketAddr = self
                .server
                .bind
                .parse()
                .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))?;
            self.server.bind = SocketAddr::new(addr.ip(), port).to_string();
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.upstream.validate()?;
        Ok(())
    }
}

/// Server configuration for bridge transports.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Transport type for the bridge.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for HTTP or SSE transports.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_MAX_BODY_BYTES {
            return Err(ConfigError::Invalid("max_body_bytes exceeds limit".to_string()));
        }
        match self.transport {
            ServerTransport::Http | ServerTransport::Sse => {
                let bind = self.bind.trim();
                if bind.is_empty() {
                    return Err(ConfigError::Invalid(
                        "http/sse transport requires bind address".to_string(),
                    ));
                }
                let _: SocketAddr = bind
                    .parse()
                    .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))?;
            }
            ServerTransport::Stdio => {}
        }
        Ok(())
    }
}

/// Supported bridge transport types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Use stdin/stdout transport.
    #[default]
    Stdio,
    /// Use HTTP JSON-RPC transport.
    Http,
    /// Use SSE transport for responses.
    Sse,
}

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL all tool request templates join against.
    #[serde(default = "default_upstream_url")]
    pub base_url: String,
    /// Upstream request timeout in milliseconds.
    #[serde(default = "default_upstream_timeout_ms")]
    pub timeout_ms: u64,
    /// User agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            timeout_ms: default_upstream_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl UpstreamConfig {
    /// Validates upstream configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let parsed = Url::parse(self.base_url.trim())
            .map_err(|_| ConfigError::Invalid("upstream.base_url must be a valid URL".to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::Invalid(
                "upstream.base_url must use http or https".to_string(),
            ));
        }
        if parsed.host_str().is_none() {
            return Err(ConfigError::Invalid("upstream.base_url must include a host".to_string()));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(ConfigError::Invalid(
                "upstream.base_url must not carry a query or fragment".to_string(),
            ));
        }
        if self.timeout_ms < MIN_UPSTREAM_TIMEOUT_MS || self.timeout_ms > MAX_UPSTREAM_TIMEOUT_MS {
            return Err(ConfigError::Invalid("upstream.timeout_ms out of range".to_string()));
        }
        let user_agent = self.user_agent.trim();
        if user_agent.is_empty() {
            return Err(ConfigError::Invalid("upstream.user_agent must be non-empty".to_string()));
        }
        if user_agent.len() > MAX_USER_AGENT_LENGTH {
            return Err(ConfigError::Invalid("upstream.user_agent exceeds max length".to_string()));
        }
        Ok(())
    }

    /// Returns the parsed base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the base URL does not parse; validated
    /// configurations never hit this path.
    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(self.base_url.trim())
            .map_err(|_| ConfigError::Invalid("upstream.base_url must be a valid URL".to_string()))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
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

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    resolve_path_with(path, |name| env::var(name).ok())
}

/// Resolves the config path using an arbitrary variable lookup.
fn resolve_path_with(
    path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Some(env_path) = lookup(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
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

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default upstream base URL.
fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}

/// Default upstream timeout.
const fn default_upstream_timeout_ms() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_MS
}

/// Default outbound user agent.
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
