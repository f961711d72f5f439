//! Session and driver contracts.
//!
//! A [`Driver`] is the bridge to an actual database; the ORM only hands it
//! compiled SQL with arguments and takes back [`Rows`] or an
//! [`ExecResult`]. A [`Session`] is what statement builders run against:
//! both [`Db`](crate::Db) and [`Tx`](crate::Tx) implement it.

use futures_util::future::BoxFuture;

use crate::db::Core;
use crate::error::OrmResult;
use crate::value::Value;

/// A buffered result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Rows {
    /// Creates an empty result set with the given column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row. Missing trailing cells read as `NULL`.
    #[must_use]
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Appends a row in place.
    pub fn push(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    /// Column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first row, if any.
    #[must_use]
    pub fn first(&self) -> Option<Row<'_>> {
        self.iter().next()
    }

    /// Iterates over rows.
    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row {
            columns: &self.columns,
            values,
        })
    }
}

/// One row of a [`Rows`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'r> {
    columns: &'r [String],
    values: &'r [Value],
}

impl<'r> Row<'r> {
    /// Column names.
    #[must_use]
    pub fn columns(&self) -> &'r [String] {
        self.columns
    }

    /// `(column, value)` pairs; cells missing from a short row are `NULL`.
    pub fn cells(&self) -> impl Iterator<Item = (&'r str, Value)> + 'r {
        let (columns, values) = (self.columns, self.values);
        columns.iter().enumerate().map(move |(i, column)| {
            (
                column.as_str(),
                values.get(i).cloned().unwrap_or(Value::Null),
            )
        })
    }

    /// The value of `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'r Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows changed by the statement.
    pub rows_affected: u64,
    /// Auto-increment key produced by an insert, if the driver reports one.
    pub last_insert_id: Option<i64>,
}

/// A database connection handle.
///
/// Implementations pass errors through as
/// [`OrmError::Driver`](crate::OrmError::Driver). Dropping a returned
/// future cancels the call.
pub trait Driver: Send + Sync {
    /// Runs a query.
    fn query<'a>(&'a self, sql: &'a str, args: &'a [Value]) -> BoxFuture<'a, OrmResult<Rows>>;

    /// Runs a statement.
    fn exec<'a>(&'a self, sql: &'a str, args: &'a [Value])
        -> BoxFuture<'a, OrmResult<ExecResult>>;

    /// Opens a transaction.
    fn begin(&self) -> BoxFuture<'_, OrmResult<Box<dyn DriverTx>>>;
}

/// An open driver transaction.
pub trait DriverTx: Send + Sync {
    /// Runs a query inside the transaction.
    fn query<'a>(&'a self, sql: &'a str, args: &'a [Value]) -> BoxFuture<'a, OrmResult<Rows>>;

    /// Runs a statement inside the transaction.
    fn exec<'a>(&'a self, sql: &'a str, args: &'a [Value])
        -> BoxFuture<'a, OrmResult<ExecResult>>;

    /// Commits.
    fn commit(&self) -> BoxFuture<'_, OrmResult<()>>;

    /// Rolls back.
    fn rollback(&self) -> BoxFuture<'_, OrmResult<()>>;
}

/// Something statements can run against.
pub trait Session: Send + Sync {
    /// Shared configuration: registry, dialect, accessor strategy and
    /// middleware.
    fn core(&self) -> &Core;

    /// Runs a query.
    fn query<'a>(&'a self, sql: &'a str, args: &'a [Value]) -> BoxFuture<'a, OrmResult<Rows>>;

    /// Runs a statement.
    fn exec<'a>(&'a self, sql: &'a str, args: &'a [Value])
        -> BoxFuture<'a, OrmResult<ExecResult>>;
}
