//! ORM configuration.
//!
//! ```toml
//! dialect = "sqlite"
//! valuer = "reflect"
//! log_queries = true
//! ```
//!
//! The configuration is applied with [`DbBuilder::config`](crate::DbBuilder::config).
//! `valuer = "unsafe"` is only a request: the raw-offset accessor is still
//! off unless the builder is also given the unsafe opt-in.

use serde::Deserialize;

use crate::dialect::DialectKind;
use crate::error::{OrmError, OrmResult};
use crate::valuer::ValuerKind;

/// Settings for a [`Db`](crate::Db).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrmConfig {
    /// SQL dialect.
    pub dialect: DialectKind,
    /// Field accessor strategy.
    pub valuer: ValuerKind,
    /// Adds a [`QueryLog`](crate::QueryLog) middleware.
    pub log_queries: bool,
}

impl OrmConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Config`] if the document is not valid TOML or
    /// has unknown keys.
    pub fn from_toml_str(content: &str) -> OrmResult<Self> {
        toml::from_str(content).map_err(|e| OrmError::Config(format!("invalid TOML: {e}")))
    }
}
