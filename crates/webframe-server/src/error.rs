//! Server error types.

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised while configuring or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address is invalid or cannot be bound.
    #[error("bind error on {addr}: {message}")]
    Bind {
        /// Address from the configuration.
        addr: String,
        /// What went wrong.
        message: String,
    },

    /// I/O error during server operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The tracing subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

impl ServerError {
    /// Creates a bind error.
    pub fn bind(addr: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Bind {
            addr: addr.into(),
            message: message.to_string(),
        }
    }
}
