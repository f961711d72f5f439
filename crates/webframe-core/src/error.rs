//! Error types for request handling.
//!
//! [`WebError`] covers failures of the request/response conveniences on
//! [`Context`](crate::Context): reading parameters, decoding bodies and
//! encoding responses. Route registration failures live in
//! [`webframe_router::RouteError`] instead.

use thiserror::Error;

/// Result type alias using [`WebError`].
pub type WebResult<T> = Result<T, WebError>;

/// Where a looked-up request value was expected to come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// A path parameter bound by the router.
    Path,
    /// The URI query string.
    Query,
    /// An `application/x-www-form-urlencoded` body.
    Form,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path => f.write_str("path value"),
            Self::Query => f.write_str("query value"),
            Self::Form => f.write_str("form value"),
        }
    }
}

/// Errors raised by the request context conveniences.
#[derive(Debug, Error)]
pub enum WebError {
    /// The requested key was not present.
    #[error("web: key not found({source_kind}) [{key}]")]
    KeyNotFound {
        /// Where the key was looked up.
        source_kind: ValueSource,
        /// The missing key.
        key: String,
    },

    /// A value was present but could not be parsed into the requested type.
    #[error("web: invalid value for [{key}]: {message}")]
    InvalidValue {
        /// The key whose value failed to parse.
        key: String,
        /// Parser diagnostics.
        message: String,
    },

    /// The request body was empty where content was required.
    #[error("web: body is nil")]
    EmptyBody,

    /// A query string or form body was not valid urlencoded data.
    #[error("web: malformed urlencoded data: {0}")]
    Urlencoded(#[from] serde_urlencoded::de::Error),

    /// The request body was not valid JSON for the target type.
    #[error("web: failed to decode JSON body: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// A response value could not be encoded as JSON.
    #[error("web: failed to encode JSON response: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl WebError {
    /// Creates a [`WebError::KeyNotFound`].
    pub fn key_not_found(source_kind: ValueSource, key: impl Into<String>) -> Self {
        Self::KeyNotFound {
            source_kind,
            key: key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_not_found_display() {
        let err = WebError::key_not_found(ValueSource::Path, "id");
        assert_eq!(err.to_string(), "web: key not found(path value) [id]");

        let err = WebError::key_not_found(ValueSource::Query, "page");
        assert_eq!(err.to_string(), "web: key not found(query value) [page]");
    }

    #[test]
    fn test_empty_body_display() {
        assert_eq!(WebError::EmptyBody.to_string(), "web: body is nil");
    }
}
