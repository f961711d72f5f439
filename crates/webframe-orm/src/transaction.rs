//! Transactions.
//!
//! [`Db::begin_tx`] opens a [`Tx`], which runs statements like a [`Db`] does
//! until it is committed or rolled back. [`Db::begin_tx_in`] reuses the
//! transaction already open in a [`TxContext`], and [`Db::do_tx`] scopes a
//! transaction to a closure: commit on success, rollback on error or panic.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;
use tracing::{debug, warn};

use crate::db::{Core, Db};
use crate::error::{OrmError, OrmResult};
use crate::session::{DriverTx, ExecResult, Rows, Session};
use crate::value::Value;

/// An open transaction.
pub struct Tx {
    inner: Box<dyn DriverTx>,
    core: Core,
    done: AtomicBool,
}

impl Tx {
    /// Commits.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::TransactionDone`] if the transaction already
    /// ended, or the driver's error.
    pub async fn commit(&self) -> OrmResult<()> {
        self.finish()?;
        debug!("committing transaction");
        self.inner.commit().await
    }

    /// Rolls back.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::TransactionDone`] if the transaction already
    /// ended, or the driver's error.
    pub async fn rollback(&self) -> OrmResult<()> {
        self.finish()?;
        debug!("rolling back transaction");
        self.inner.rollback().await
    }

    /// Returns `true` once the transaction was committed or rolled back.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    fn finish(&self) -> OrmResult<()> {
        if self.done.swap(true, Ordering::AcqRel) {
            return Err(OrmError::TransactionDone);
        }
        Ok(())
    }
}

impl fmt::Debug for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tx")
            .field("done", &self.is_done())
            .finish_non_exhaustive()
    }
}

impl Session for Tx {
    fn core(&self) -> &Core {
        &self.core
    }

    fn query<'a>(&'a self, sql: &'a str, args: &'a [Value]) -> BoxFuture<'a, OrmResult<Rows>> {
        if self.is_done() {
            return future::ready(Err(OrmError::TransactionDone)).boxed();
        }
        self.inner.query(sql, args)
    }

    fn exec<'a>(
        &'a self,
        sql: &'a str,
        args: &'a [Value],
    ) -> BoxFuture<'a, OrmResult<ExecResult>> {
        if self.is_done() {
            return future::ready(Err(OrmError::TransactionDone)).boxed();
        }
        self.inner.exec(sql, args)
    }
}

/// The logical context a transaction is propagated through.
///
/// An empty context has no transaction; [`Db::begin_tx_in`] returns a
/// context carrying the one it opened.
#[derive(Debug, Clone, Default)]
pub struct TxContext {
    tx: Option<Arc<Tx>>,
}

impl TxContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The transaction carried by this context, if any.
    #[must_use]
    pub fn tx(&self) -> Option<&Arc<Tx>> {
        self.tx.as_ref()
    }
}

impl Db {
    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns the driver's error.
    pub async fn begin_tx(&self) -> OrmResult<Tx> {
        let inner = self.driver().begin().await?;
        debug!("transaction started");
        Ok(Tx {
            inner,
            core: self.core().clone(),
            done: AtomicBool::new(false),
        })
    }

    /// Returns the transaction open in `ctx`, or opens one and returns it
    /// with a context that carries it.
    ///
    /// A transaction that was already committed or rolled back is not
    /// reused.
    ///
    /// # Errors
    ///
    /// Returns the driver's error.
    pub async fn begin_tx_in(&self, ctx: &TxContext) -> OrmResult<(TxContext, Arc<Tx>)> {
        if let Some(tx) = ctx.tx.as_ref().filter(|tx| !tx.is_done()) {
            debug!("reusing open transaction");
            return Ok((ctx.clone(), Arc::clone(tx)));
        }
        let tx = Arc::new(self.begin_tx().await?);
        let ctx = TxContext {
            tx: Some(Arc::clone(&tx)),
        };
        Ok((ctx, tx))
    }

    /// Runs `f` in a new transaction.
    ///
    /// The transaction is committed if `f` succeeds and rolled back if it
    /// fails or panics. A panic is resumed after a successful rollback.
    /// If `f` ends the transaction itself, its outcome is returned as is.
    ///
    /// # Errors
    ///
    /// - The error returned by `f`, once the transaction is rolled back.
    /// - [`OrmError::RollbackFailed`] if the rollback fails too, carrying
    ///   `f`'s error (none after a panic) and whether `f` panicked.
    /// - The commit error.
    ///
    /// # Example
    ///
    /// ```
    /// use futures_util::FutureExt;
    /// use webframe_orm::testing::MockDriver;
    /// use webframe_orm::{Db, Session};
    ///
    /// # tokio_test::block_on(async {
    /// let driver = MockDriver::new();
    /// let db = Db::open(driver.clone());
    /// let affected = db
    ///     .do_tx(|tx| {
    ///         async move {
    ///             let res = tx.exec("DELETE FROM `t`;", &[]).await?;
    ///             Ok(res.rows_affected)
    ///         }
    ///         .boxed()
    ///     })
    ///     .await
    ///     .unwrap();
    /// assert_eq!(affected, 0);
    /// assert_eq!(driver.executed_sql(), ["BEGIN", "DELETE FROM `t`;", "COMMIT"]);
    /// # });
    /// ```
    pub async fn do_tx<F, R>(&self, f: F) -> OrmResult<R>
    where
        F: for<'t> FnOnce(&'t Tx) -> BoxFuture<'t, OrmResult<R>>,
    {
        let tx = self.begin_tx().await?;
        let outcome = AssertUnwindSafe(async { f(&tx).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(result) if tx.is_done() => result,
            Ok(Ok(value)) => {
                tx.commit().await?;
                Ok(value)
            }
            Ok(Err(err)) => match tx.rollback().await {
                Ok(()) => Err(err),
                Err(rollback) => {
                    warn!(error = %err, rollback_error = %rollback, "transaction rollback failed");
                    Err(OrmError::RollbackFailed {
                        business: Some(Box::new(err)),
                        rollback: Box::new(rollback),
                        panicked: false,
                    })
                }
            },
            Err(payload) if tx.is_done() => panic::resume_unwind(payload),
            Err(payload) => match tx.rollback().await {
                Ok(()) => panic::resume_unwind(payload),
                Err(rollback) => {
                    warn!(rollback_error = %rollback, "transaction rollback failed after panic");
                    Err(OrmError::RollbackFailed {
                        business: None,
                        rollback: Box::new(rollback),
                        panicked: true,
                    })
                }
            },
        }
    }
}
