//! Route registration errors.
//!
//! Every variant describes a malformed route table. These errors are raised
//! while routes are being registered and are meant to abort startup; a
//! request that simply does not match any route is never an error.

use thiserror::Error;

/// Result type alias for route registration.
pub type RouteResult<T> = Result<T, RouteError>;

/// Errors raised while registering a route.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The path was empty.
    #[error("web: path is empty")]
    EmptyPath,

    /// The path did not begin with `/`.
    #[error("web: path must start with '/' [{0}]")]
    MissingLeadingSlash(String),

    /// The path ended with `/` (only `/` itself may).
    #[error("web: path cannot end with '/' [{0}]")]
    TrailingSlash(String),

    /// The path contained consecutive slashes.
    #[error("web: multiple duplicate '/' [{0}]")]
    EmptySegment(String),

    /// A handler is already registered for this method and path.
    #[error("web: duplicate path [{0}]")]
    DuplicateRoute(String),

    /// A wildcard and a parameter (or regex) segment were registered at the
    /// same position, in either order.
    #[error("web: illegal route : '*' and parameter routes cannot share a position [{segment}]")]
    WildcardConflict {
        /// The segment that could not be registered.
        segment: String,
    },

    /// A parameter child with a different name already occupies this position.
    #[error("web: illegal route : already has param route here [{existing}], cannot add [{segment}]")]
    ParamConflict {
        /// The segment already registered.
        existing: String,
        /// The segment that could not be registered.
        segment: String,
    },

    /// A regex child with a different name or pattern already occupies this position.
    #[error("web: illegal route : already has regexp route here [{existing}], cannot add [{segment}]")]
    RegexConflict {
        /// The segment already registered.
        existing: String,
        /// The segment that could not be registered.
        segment: String,
    },

    /// The pattern of a `:name(pattern)` segment did not compile.
    #[error("web: illegal route : invalid regexp {pattern}")]
    InvalidRegex {
        /// The offending pattern.
        pattern: String,
        /// The compilation failure.
        #[source]
        source: regex::Error,
    },
}
