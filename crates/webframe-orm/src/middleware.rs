//! Statement interceptors.
//!
//! Every statement a builder runs passes through the middleware registered
//! on its [`Db`](crate::Db) before reaching the session. A middleware sees
//! the [`QueryContext`] (statement kind, the uncompiled builder, and the
//! model once resolved) and may act before and after calling
//! [`Next::run`], or answer on its own without calling it.
//!
//! The first middleware registered is the outermost one.
//!
//! # Example
//!
//! ```
//! use futures_util::future::BoxFuture;
//! use webframe_orm::{Middleware, Next, QueryContext, QueryResult};
//!
//! struct Tables;
//!
//! impl Middleware for Tables {
//!     fn name(&self) -> &'static str {
//!         "tables"
//!     }
//!
//!     fn handle<'a>(
//!         &'a self,
//!         qc: &'a mut QueryContext<'_>,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, QueryResult> {
//!         Box::pin(async move {
//!             let table = qc.model()?.table_name().to_string();
//!             println!("{} on {table}", qc.kind());
//!             next.run(qc).await
//!         })
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use metrics::{counter, histogram};
use tracing::info;

use crate::builder::{Query, QueryBuilder};
use crate::error::{OrmError, OrmResult};
use crate::model::Model;
use crate::session::{ExecResult, Rows, Session};

/// The kind of statement being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// `SELECT`
    Select,
    /// `INSERT`
    Insert,
    /// `DELETE`
    Delete,
}

impl StatementKind {
    /// The SQL keyword.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Result set of a query.
    Rows(Rows),
    /// Outcome of a statement.
    Exec(ExecResult),
}

impl QueryOutput {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Rows(_) => "rows",
            Self::Exec(_) => "exec",
        }
    }

    pub(crate) fn into_rows(self, kind: StatementKind) -> OrmResult<Rows> {
        match self {
            Self::Rows(rows) => Ok(rows),
            other => Err(OrmError::UnexpectedOutput {
                kind: kind.as_str(),
                found: other.kind_name(),
            }),
        }
    }

    pub(crate) fn into_exec(self, kind: StatementKind) -> OrmResult<ExecResult> {
        match self {
            Self::Exec(res) => Ok(res),
            other => Err(OrmError::UnexpectedOutput {
                kind: kind.as_str(),
                found: other.kind_name(),
            }),
        }
    }
}

/// Result of running a statement through the chain.
pub type QueryResult = OrmResult<QueryOutput>;

/// A statement on its way through the middleware chain.
pub struct QueryContext<'q> {
    kind: StatementKind,
    builder: &'q mut (dyn QueryBuilder + 'q),
    model: Option<Arc<Model>>,
    query: Option<Query>,
}

impl<'q> QueryContext<'q> {
    pub(crate) fn new(kind: StatementKind, builder: &'q mut (dyn QueryBuilder + 'q)) -> Self {
        Self {
            kind,
            builder,
            model: None,
            query: None,
        }
    }

    /// The statement kind.
    #[must_use]
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// The builder being run.
    pub fn builder(&mut self) -> &mut (dyn QueryBuilder + 'q) {
        &mut *self.builder
    }

    /// The model the statement targets, resolved on first call.
    ///
    /// # Errors
    ///
    /// Returns the registry error if the entity's model cannot be built.
    pub fn model(&mut self) -> OrmResult<Arc<Model>> {
        if let Some(model) = &self.model {
            return Ok(Arc::clone(model));
        }
        let model = self.builder.model()?;
        self.model = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Compiles the statement, once.
    ///
    /// # Errors
    ///
    /// Returns the builder's compile error.
    pub fn query(&mut self) -> OrmResult<&Query> {
        let query = match self.query.take() {
            Some(query) => query,
            None => self.builder.build()?,
        };
        Ok(self.query.insert(query))
    }

    /// The compiled statement, if it has been compiled.
    #[must_use]
    pub fn compiled(&self) -> Option<&Query> {
        self.query.as_ref()
    }
}

impl fmt::Debug for QueryContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("kind", &self.kind)
            .field("model", &self.model.as_ref().map(|m| m.type_name()))
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

/// A statement interceptor.
///
/// Middleware MUST call `next.run()` at most once. Not calling it means the
/// statement is never sent to the session; the middleware's own result is
/// returned instead.
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Handles the statement, continuing the chain through `next`.
    fn handle<'a>(&'a self, qc: &'a mut QueryContext<'_>, next: Next<'a>)
        -> BoxFuture<'a, QueryResult>;
}

/// The end of the chain: compiles the statement and sends it.
pub(crate) trait Terminal: Send + Sync {
    fn call<'a>(&'a self, qc: &'a mut QueryContext<'_>) -> BoxFuture<'a, QueryResult>;
}

/// Sends a query and returns its rows.
pub(crate) struct QueryTerminal<'s> {
    pub(crate) session: &'s dyn Session,
}

impl Terminal for QueryTerminal<'_> {
    fn call<'a>(&'a self, qc: &'a mut QueryContext<'_>) -> BoxFuture<'a, QueryResult> {
        Box::pin(async move {
            let query = qc.query()?;
            let rows = self.session.query(&query.sql, &query.args).await?;
            Ok(QueryOutput::Rows(rows))
        })
    }
}

/// Sends a statement and returns its outcome.
pub(crate) struct ExecTerminal<'s> {
    pub(crate) session: &'s dyn Session,
}

impl Terminal for ExecTerminal<'_> {
    fn call<'a>(&'a self, qc: &'a mut QueryContext<'_>) -> BoxFuture<'a, QueryResult> {
        Box::pin(async move {
            let query = qc.query()?;
            let res = self.session.exec(&query.sql, &query.args).await?;
            Ok(QueryOutput::Exec(res))
        })
    }
}

/// The remainder of a middleware chain.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Terminal,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Middleware>], terminal: &'a dyn Terminal) -> Self {
        Self { chain, terminal }
    }

    /// Number of middleware still to run.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }

    /// Runs the next middleware, or sends the statement once the chain is
    /// exhausted.
    pub fn run(self, qc: &'a mut QueryContext<'_>) -> BoxFuture<'a, QueryResult> {
        match self.chain.split_first() {
            Some((middleware, rest)) => middleware.handle(qc, Next::new(rest, self.terminal)),
            None => self.terminal.call(qc),
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field(
                "chain",
                &self.chain.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// One statement log record.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLogEntry {
    /// Statement kind.
    pub kind: StatementKind,
    /// Target table, if the model could be resolved.
    pub table: Option<String>,
    /// Compiled SQL, if compilation got that far.
    pub sql: Option<String>,
    /// Number of bound arguments.
    pub args: usize,
    /// Whether the rest of the chain returned an error.
    pub failed: bool,
    /// Time spent in the rest of the chain.
    pub elapsed: Duration,
}

type LogFn = Arc<dyn Fn(&QueryLogEntry) + Send + Sync>;

/// Middleware that logs every statement it wraps.
///
/// Each statement also updates two metrics:
///
/// - `webframe_orm_queries_total` (counter; `kind`, `table`, `failed`)
/// - `webframe_orm_query_duration_seconds` (histogram; `kind`, `table`)
#[derive(Clone)]
pub struct QueryLog {
    log_fn: LogFn,
}

impl QueryLog {
    /// Creates a query log that emits `tracing` events.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log_fn: Arc::new(|entry| {
                info!(
                    kind = %entry.kind,
                    table = entry.table.as_deref(),
                    sql = entry.sql.as_deref(),
                    args = entry.args,
                    failed = entry.failed,
                    elapsed_ms = entry.elapsed.as_secs_f64() * 1000.0,
                    "query"
                );
            }),
        }
    }

    /// Replaces the sink entries are sent to.
    #[must_use]
    pub fn log_fn(mut self, f: impl Fn(&QueryLogEntry) + Send + Sync + 'static) -> Self {
        self.log_fn = Arc::new(f);
        self
    }
}

impl Default for QueryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryLog").finish_non_exhaustive()
    }
}

impl Middleware for QueryLog {
    fn name(&self) -> &'static str {
        "query_log"
    }

    fn handle<'a>(
        &'a self,
        qc: &'a mut QueryContext<'_>,
        next: Next<'a>,
    ) -> BoxFuture<'a, QueryResult> {
        Box::pin(async move {
            let table = qc.model().ok().map(|m| m.table_name().to_string());
            let start = Instant::now();
            let result = next.run(qc).await;
            let elapsed = start.elapsed();

            let entry = QueryLogEntry {
                kind: qc.kind(),
                table,
                sql: qc.compiled().map(|q| q.sql.clone()),
                args: qc.compiled().map_or(0, |q| q.args.len()),
                failed: result.is_err(),
                elapsed,
            };

            let table_label = entry.table.clone().unwrap_or_default();
            counter!(
                "webframe_orm_queries_total",
                "kind" => entry.kind.as_str(),
                "table" => table_label.clone(),
                "failed" => entry.failed.to_string()
            )
            .increment(1);
            histogram!(
                "webframe_orm_query_duration_seconds",
                "kind" => entry.kind.as_str(),
                "table" => table_label
            )
            .record(elapsed.as_secs_f64());

            (self.log_fn)(&entry);
            result
        })
    }
}
