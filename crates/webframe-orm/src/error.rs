//! ORM error types.
//!
//! Every failure surfaced by the registry, the statement builders, the value
//! accessors and the session layer is an [`OrmError`]. Driver errors pass
//! through unchanged inside [`OrmError::Driver`].

use thiserror::Error;

use crate::value::ConversionError;

/// Result type alias using [`OrmError`].
pub type OrmResult<T> = Result<T, OrmError>;

/// Errors raised by the ORM.
#[derive(Debug, Error)]
pub enum OrmError {
    /// The entity type is not a plain struct (for example `Box<T>`).
    #[error("orm: Only supports one-level pointer as input, such as *User")]
    PointerOnly,

    /// A field name that the model does not declare.
    #[error("orm: unknown field {0}")]
    UnknownField(String),

    /// A result column that maps to no field.
    #[error("orm: unknown column: {0}")]
    UnknownColumn(String),

    /// A field tag that is not a `key=value` list.
    #[error("orm: invalid tag content {0}")]
    InvalidTagContent(String),

    /// Two fields map to the same column.
    #[error("orm: duplicate column {0}")]
    DuplicateColumn(String),

    /// An expression that cannot appear where it was used.
    #[error("orm: unsupported expression: {0} ")]
    UnsupportedExpressionType(String),

    /// An assignment value that cannot appear in an upsert clause.
    #[error("orm: unsupported assignable expression: {0}")]
    UnsupportedAssignableType(String),

    /// A single-row query returned nothing.
    #[error("orm: no data found")]
    NoRows,

    /// The result set has more columns than the model has fields.
    #[error("orm: too many columns")]
    TooManyReturnedColumns,

    /// An insert was built without any rows.
    #[error("orm: insert zero row")]
    InsertZeroRow,

    /// A driver value could not be converted into a field's type.
    #[error("orm: cannot convert column {column}: expected {expected}, found {found}")]
    ValueConversion {
        /// Column or field being written.
        column: String,
        /// The field's declared type.
        expected: String,
        /// The driver value's type.
        found: String,
    },

    /// The raw-offset accessor was given a model that does not describe
    /// the entity it was pointed at.
    #[error("orm: layout mismatch: {0}")]
    LayoutMismatch(String),

    /// Rolling back a failed transaction failed too.
    #[error(
        "orm: failed to rollback transaction, business error: {}, rollback error: {rollback}, panicked: {panicked}",
        display_business(.business)
    )]
    RollbackFailed {
        /// The error that triggered the rollback, if the body returned one.
        business: Option<Box<OrmError>>,
        /// The rollback failure.
        #[source]
        rollback: Box<OrmError>,
        /// Whether the transaction body panicked.
        panicked: bool,
    },

    /// An error returned by the database driver.
    #[error(transparent)]
    Driver(Box<dyn std::error::Error + Send + Sync>),

    /// A middleware answered a statement with the wrong kind of output,
    /// such as rows for an `INSERT`.
    #[error("orm: unexpected {found} output for a {kind} statement")]
    UnexpectedOutput {
        /// The statement kind.
        kind: &'static str,
        /// The output that was produced.
        found: &'static str,
    },

    /// An ORM configuration document could not be parsed.
    #[error("orm: invalid configuration: {0}")]
    Config(String),

    /// The transaction was already committed or rolled back.
    #[error("orm: transaction has already been committed or rolled back")]
    TransactionDone,
}

impl OrmError {
    /// Creates an [`OrmError::UnknownField`].
    pub fn unknown_field(name: impl Into<String>) -> Self {
        Self::UnknownField(name.into())
    }

    /// Creates an [`OrmError::UnknownColumn`].
    pub fn unknown_column(name: impl Into<String>) -> Self {
        Self::UnknownColumn(name.into())
    }

    /// Wraps a driver error.
    pub fn driver(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Driver(err.into())
    }

    /// Attaches the column name to a value conversion failure.
    pub fn conversion(column: impl Into<String>, err: ConversionError) -> Self {
        Self::ValueConversion {
            column: column.into(),
            expected: err.expected().to_string(),
            found: err.found().to_string(),
        }
    }

    /// Returns `true` for [`OrmError::NoRows`].
    #[must_use]
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::NoRows)
    }
}

fn display_business(business: &Option<Box<OrmError>>) -> String {
    business
        .as_ref()
        .map_or_else(|| "none".to_string(), ToString::to_string)
}
