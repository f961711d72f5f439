//! Server configuration.
//!
//! A [`ServerConfig`] can be built in code with [`ServerConfig::builder()`],
//! or loaded from TOML and then layered with environment overrides:
//!
//! ```toml
//! http_addr = "127.0.0.1:3000"
//! shutdown_timeout_secs = 10
//! request_timeout_secs = 30
//!
//! [log]
//! level = "debug"
//! json_format = false
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use webframe_server::ServerConfig;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:3000")
//!     .shutdown_timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.http_addr(), "127.0.0.1:3000");
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ServerError, ServerResult};
use crate::logging::LogConfig;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default prefix for environment overrides.
pub const DEFAULT_ENV_PREFIX: &str = "WEBFRAME";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address, e.g. "0.0.0.0:8080".
    http_addr: String,

    /// How long to wait for in-flight connections on shutdown.
    #[serde(rename = "shutdown_timeout_secs", with = "duration_secs")]
    shutdown_timeout: Duration,

    /// Upper bound for reading the body and running the chain of one request.
    #[serde(rename = "request_timeout_secs", with = "duration_secs")]
    request_timeout: Duration,

    log: LogConfig,
}

impl ServerConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the document is not valid TOML or
    /// contains unknown keys.
    pub fn from_toml_str(content: &str) -> ServerResult<Self> {
        toml::from_str(content).map_err(|e| ServerError::Config(format!("invalid TOML: {e}")))
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the file is missing, unreadable or
    /// invalid.
    pub fn from_file(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ServerError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Applies overrides from the process environment.
    ///
    /// Recognized variables, for prefix `WEBFRAME`:
    ///
    /// - `WEBFRAME_HTTP_ADDR`
    /// - `WEBFRAME_LOG_LEVEL`
    /// - `WEBFRAME_SHUTDOWN_TIMEOUT_SECS`
    /// - `WEBFRAME_REQUEST_TIMEOUT_SECS`
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if a timeout variable is not an integer.
    pub fn with_env_prefix(self, prefix: &str) -> ServerResult<Self> {
        self.with_overrides(prefix, |key| std::env::var(key).ok())
    }

    /// Applies overrides looked up through `lookup` instead of the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if a timeout value is not an integer.
    pub fn with_overrides(
        mut self,
        prefix: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ServerResult<Self> {
        let key = |name: &str| format!("{prefix}_{name}");

        if let Some(addr) = lookup(&key("HTTP_ADDR")) {
            self.http_addr = addr;
        }
        if let Some(level) = lookup(&key("LOG_LEVEL")) {
            self.log.level = level;
        }
        if let Some(secs) = lookup(&key("SHUTDOWN_TIMEOUT_SECS")) {
            self.shutdown_timeout = parse_secs(&key("SHUTDOWN_TIMEOUT_SECS"), &secs)?;
        }
        if let Some(secs) = lookup(&key("REQUEST_TIMEOUT_SECS")) {
            self.request_timeout = parse_secs(&key("REQUEST_TIMEOUT_SECS"), &secs)?;
        }
        Ok(self)
    }

    /// Returns the bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the logging configuration.
    #[must_use]
    pub fn log(&self) -> &LogConfig {
        &self.log
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn parse_secs(key: &str, value: &str) -> ServerResult<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ServerError::Config(format!("{key}: expected seconds, got '{value}': {e}")))
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    log: LogConfig,
}

impl ServerConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            log: LogConfig::default(),
        }
    }

    /// Sets the bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            shutdown_timeout: self.shutdown_timeout,
            request_timeout: self.request_timeout,
            log: self.log,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr(), DEFAULT_HTTP_ADDR);
        assert_eq!(
            config.shutdown_timeout(),
            Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS)
        );
        assert_eq!(
            config.request_timeout(),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
        assert_eq!(config.log(), &LogConfig::default());
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::builder()
            .http_addr("127.0.0.1:3000")
            .shutdown_timeout(Duration::from_secs(60))
            .request_timeout(Duration::from_millis(500))
            .log(LogConfig::development())
            .build();

        assert_eq!(config.http_addr(), "127.0.0.1:3000");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(60));
        assert_eq!(config.request_timeout(), Duration::from_millis(500));
        assert_eq!(config.log().level, "debug");
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig::builder().http_addr("127.0.0.1:8080").build();
        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);

        let config = ServerConfig::builder().http_addr("not-an-address").build();
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_from_toml_str() {
        let config = ServerConfig::from_toml_str(
            r#"
            http_addr = "127.0.0.1:9000"
            shutdown_timeout_secs = 5

            [log]
            level = "trace"
            json_format = false
            "#,
        )
        .unwrap();

        assert_eq!(config.http_addr(), "127.0.0.1:9000");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.request_timeout(),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
        assert_eq!(config.log().level, "trace");
        assert!(!config.log().json_format);
    }

    #[test]
    fn test_from_toml_str_rejects_unknown_keys() {
        let err = ServerConfig::from_toml_str("http_port = 80").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http_addr = \"127.0.0.1:7000\"").unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.http_addr(), "127.0.0.1:7000");
    }

    #[test]
    fn test_from_missing_file() {
        let err = ServerConfig::from_file("/nonexistent/webframe.toml").unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("APP_HTTP_ADDR", "127.0.0.1:1234"),
            ("APP_LOG_LEVEL", "warn"),
            ("APP_SHUTDOWN_TIMEOUT_SECS", "3"),
        ]
        .into_iter()
        .collect();

        let config = ServerConfig::default()
            .with_overrides("APP", |key| env.get(key).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.http_addr(), "127.0.0.1:1234");
        assert_eq!(config.log().level, "warn");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_overrides_reject_bad_timeout() {
        let err = ServerConfig::default()
            .with_overrides("APP", |key| {
                (key == "APP_REQUEST_TIMEOUT_SECS").then(|| "soon".to_string())
            })
            .unwrap_err();
        assert!(err.to_string().contains("APP_REQUEST_TIMEOUT_SECS"));
    }
}
