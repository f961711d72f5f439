//! Scripted driver for tests.
//!
//! [`MockDriver`] answers statements from a queue of canned responses and
//! records everything it was asked to run, including `BEGIN`, `COMMIT` and
//! `ROLLBACK` markers for transactions. Clones share the same script and
//! log.
//!
//! # Example
//!
//! ```
//! use webframe_orm::testing::MockDriver;
//! use webframe_orm::{Rows, Value};
//!
//! let driver = MockDriver::new();
//! driver.push_rows(Rows::new(["id"]).with_row(vec![Value::I64(1)]));
//! driver.push_error("connection reset");
//! assert_eq!(driver.pending(), 2);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use thiserror::Error;

use crate::error::{OrmError, OrmResult};
use crate::session::{Driver, DriverTx, ExecResult, Rows};
use crate::value::Value;

/// Error produced by scripted failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mock: {0}")]
pub struct MockError(pub String);

/// One canned response.
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    /// Rows for a query.
    Rows(Rows),
    /// Outcome for a statement.
    Exec(ExecResult),
    /// A driver failure.
    Error(String),
}

/// A statement the driver was asked to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    /// SQL text, or a transaction marker.
    pub sql: String,
    /// Bound arguments.
    pub args: Vec<Value>,
}

#[derive(Debug, Default)]
struct State {
    responses: VecDeque<MockResponse>,
    executed: Vec<Executed>,
    fail_rollback: bool,
}

/// Scripted [`Driver`].
///
/// With an empty script, queries return no rows and statements report no
/// affected rows.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<State>>,
}

impl MockDriver {
    /// Creates a driver with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues rows for the next query.
    pub fn push_rows(&self, rows: Rows) {
        self.state.lock().responses.push_back(MockResponse::Rows(rows));
    }

    /// Queues an outcome for the next statement.
    pub fn push_exec(&self, rows_affected: u64, last_insert_id: Option<i64>) {
        self.state
            .lock()
            .responses
            .push_back(MockResponse::Exec(ExecResult {
                rows_affected,
                last_insert_id,
            }));
    }

    /// Queues a failure for the next query or statement.
    pub fn push_error(&self, message: impl Into<String>) {
        self.state
            .lock()
            .responses
            .push_back(MockResponse::Error(message.into()));
    }

    /// Makes every later rollback fail.
    pub fn fail_rollback(&self) {
        self.state.lock().fail_rollback = true;
    }

    /// Number of responses not consumed yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().responses.len()
    }

    /// Everything run so far, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<Executed> {
        self.state.lock().executed.clone()
    }

    /// SQL of everything run so far, in order.
    #[must_use]
    pub fn executed_sql(&self) -> Vec<String> {
        self.state
            .lock()
            .executed
            .iter()
            .map(|e| e.sql.clone())
            .collect()
    }

    fn record(&self, sql: &str, args: &[Value]) -> Option<MockResponse> {
        let mut state = self.state.lock();
        state.executed.push(Executed {
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        state.responses.pop_front()
    }

    fn run_query(&self, sql: &str, args: &[Value]) -> OrmResult<Rows> {
        match self.record(sql, args) {
            None => Ok(Rows::default()),
            Some(MockResponse::Rows(rows)) => Ok(rows),
            Some(MockResponse::Exec(_)) => Err(mock_error("expected rows, found exec result")),
            Some(MockResponse::Error(msg)) => Err(mock_error(msg)),
        }
    }

    fn run_exec(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        match self.record(sql, args) {
            None => Ok(ExecResult::default()),
            Some(MockResponse::Exec(res)) => Ok(res),
            Some(MockResponse::Rows(_)) => Err(mock_error("expected exec result, found rows")),
            Some(MockResponse::Error(msg)) => Err(mock_error(msg)),
        }
    }

    fn marker(&self, marker: &str) {
        self.state.lock().executed.push(Executed {
            sql: marker.to_string(),
            args: Vec::new(),
        });
    }
}

fn mock_error(message: impl Into<String>) -> OrmError {
    OrmError::driver(MockError(message.into()))
}

impl Driver for MockDriver {
    fn query<'a>(&'a self, sql: &'a str, args: &'a [Value]) -> BoxFuture<'a, OrmResult<Rows>> {
        future::ready(self.run_query(sql, args)).boxed()
    }

    fn exec<'a>(
        &'a self,
        sql: &'a str,
        args: &'a [Value],
    ) -> BoxFuture<'a, OrmResult<ExecResult>> {
        future::ready(self.run_exec(sql, args)).boxed()
    }

    fn begin(&self) -> BoxFuture<'_, OrmResult<Box<dyn DriverTx>>> {
        self.marker("BEGIN");
        let tx: Box<dyn DriverTx> = Box::new(MockTx {
            driver: self.clone(),
        });
        future::ready(Ok(tx)).boxed()
    }
}

/// Transaction handed out by [`MockDriver`]; shares its script and log.
#[derive(Debug)]
struct MockTx {
    driver: MockDriver,
}

impl DriverTx for MockTx {
    fn query<'a>(&'a self, sql: &'a str, args: &'a [Value]) -> BoxFuture<'a, OrmResult<Rows>> {
        self.driver.query(sql, args)
    }

    fn exec<'a>(
        &'a self,
        sql: &'a str,
        args: &'a [Value],
    ) -> BoxFuture<'a, OrmResult<ExecResult>> {
        self.driver.exec(sql, args)
    }

    fn commit(&self) -> BoxFuture<'_, OrmResult<()>> {
        self.driver.marker("COMMIT");
        future::ready(Ok(())).boxed()
    }

    fn rollback(&self) -> BoxFuture<'_, OrmResult<()>> {
        self.driver.marker("ROLLBACK");
        let result = if self.driver.state.lock().fail_rollback {
            Err(mock_error("rollback failed"))
        } else {
            Ok(())
        };
        future::ready(result).boxed()
    }
}
