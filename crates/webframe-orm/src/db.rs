//! Database handle.
//!
//! A [`Db`] pairs a [`Driver`] with the [`Core`] every statement needs: the
//! model registry, the SQL dialect, the field accessor strategy and the
//! middleware chain. It is cheap to clone; clones share the driver and the
//! registry.
//!
//! # Example
//!
//! ```
//! use webframe_orm::testing::MockDriver;
//! use webframe_orm::{Db, QueryLog, Session, Sqlite};
//!
//! let db = Db::builder(MockDriver::new())
//!     .dialect(Sqlite)
//!     .middleware(QueryLog::new())
//!     .build();
//! assert_eq!(db.core().dialect().name(), "sqlite");
//! ```

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use crate::builder::QueryBuilder;
use crate::config::OrmConfig;
use crate::dialect::{Dialect, MySql};
use crate::entity::Entity;
use crate::error::OrmResult;
use crate::middleware::{ExecTerminal, Middleware, Next, QueryContext, QueryLog, QueryTerminal, StatementKind};
use crate::model::Model;
use crate::registry::Registry;
use crate::session::{Driver, ExecResult, Rows, Session};
use crate::valuer::{ReflectValue, UnsafeValue, ValueAccessor, ValuerKind};
use crate::value::Value;

/// Configuration shared by a [`Db`] and the transactions it opens.
#[derive(Clone)]
pub struct Core {
    registry: Arc<Registry>,
    dialect: Arc<dyn Dialect>,
    valuer: ValuerKind,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Core {
    /// The model registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The SQL dialect.
    #[must_use]
    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    /// The field accessor strategy.
    #[must_use]
    pub fn valuer(&self) -> ValuerKind {
        self.valuer
    }

    /// Registered middleware, outermost first.
    #[must_use]
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }

    /// Creates the configured accessor over `entity`.
    ///
    /// `model` must be the registry's model for `T`.
    pub(crate) fn accessor<'a, T: Entity>(
        &self,
        entity: &'a mut T,
        model: &'a Model,
    ) -> OrmResult<Box<dyn ValueAccessor + 'a>> {
        match self.valuer {
            ValuerKind::Reflect => Ok(Box::new(ReflectValue::new(entity, model))),
            ValuerKind::Unsafe => {
                // SAFETY: the unsafe strategy is only selected through
                // `DbBuilder::unsafe_valuer`, whose caller vouches for the
                // descriptors of every entity; registry models keep the
                // offsets reported by `T::fields`.
                #[allow(unsafe_code)]
                let accessor = unsafe { UnsafeValue::new(entity, model)? };
                Ok(Box::new(accessor))
            }
        }
    }

    /// Runs a query through the middleware chain.
    pub(crate) async fn run_query(
        &self,
        session: &dyn Session,
        builder: &mut (dyn QueryBuilder + '_),
        kind: StatementKind,
    ) -> OrmResult<Rows> {
        let terminal = QueryTerminal { session };
        let mut qc = QueryContext::new(kind, builder);
        Next::new(&self.middlewares, &terminal)
            .run(&mut qc)
            .await?
            .into_rows(kind)
    }

    /// Runs a statement through the middleware chain.
    pub(crate) async fn run_exec(
        &self,
        session: &dyn Session,
        builder: &mut (dyn QueryBuilder + '_),
        kind: StatementKind,
    ) -> OrmResult<ExecResult> {
        let terminal = ExecTerminal { session };
        let mut qc = QueryContext::new(kind, builder);
        Next::new(&self.middlewares, &terminal)
            .run(&mut qc)
            .await?
            .into_exec(kind)
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("registry", &self.registry.len())
            .field("dialect", &self.dialect.name())
            .field("valuer", &self.valuer)
            .field(
                "middlewares",
                &self.middlewares.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A database handle.
#[derive(Clone)]
pub struct Db {
    driver: Arc<dyn Driver>,
    core: Core,
}

impl Db {
    /// Opens a handle with the defaults: MySQL dialect, a fresh registry,
    /// the reflective accessor and no middleware.
    pub fn open(driver: impl Driver + 'static) -> Self {
        Self::builder(driver).build()
    }

    /// Starts configuring a handle.
    pub fn builder(driver: impl Driver + 'static) -> DbBuilder {
        DbBuilder::new(Arc::new(driver))
    }

    /// The driver.
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl Session for Db {
    fn core(&self) -> &Core {
        &self.core
    }

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
}

/// Builder for [`Db`].
pub struct DbBuilder {
    driver: Arc<dyn Driver>,
    dialect: Arc<dyn Dialect>,
    registry: Option<Arc<Registry>>,
    valuer: ValuerKind,
    unsafe_requested: bool,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl DbBuilder {
    fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            dialect: Arc::new(MySql),
            registry: None,
            valuer: ValuerKind::Reflect,
            unsafe_requested: false,
            middlewares: Vec::new(),
        }
    }

    /// Sets the SQL dialect.
    #[must_use]
    pub fn dialect(mut self, dialect: impl Dialect + 'static) -> Self {
        self.dialect = Arc::new(dialect);
        self
    }

    /// Shares an existing registry instead of creating one.
    #[must_use]
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Appends a middleware. Middleware added first runs outermost.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Applies a configuration: dialect, accessor request and query log.
    ///
    /// Asking for the unsafe accessor in configuration has no effect on its
    /// own; it must also be enabled with [`DbBuilder::unsafe_valuer`].
    #[must_use]
    pub fn config(mut self, config: &OrmConfig) -> Self {
        self.dialect = config.dialect.dialect();
        self.unsafe_requested = config.valuer == ValuerKind::Unsafe;
        if config.log_queries {
            self = self.middleware(QueryLog::new());
        }
        self
    }

    /// Switches to the raw-offset accessor.
    ///
    /// # Safety
    ///
    /// - Every entity used with the resulting handle must report, through
    ///   [`Entity::fields`], the exact byte offset and Rust type of each
    ///   field. Entities declared with [`entity!`](crate::entity!) do.
    /// - Models registered with options must only rename tables and
    ///   columns.
    #[allow(unsafe_code)]
    #[must_use]
    pub unsafe fn unsafe_valuer(mut self) -> Self {
        self.valuer = ValuerKind::Unsafe;
        self
    }

    /// Creates the handle.
    #[must_use]
    pub fn build(self) -> Db {
        if self.unsafe_requested && self.valuer != ValuerKind::Unsafe {
            warn!("unsafe valuer requested by configuration without opt-in, using reflect");
        }
        let core = Core {
            registry: self.registry.unwrap_or_default(),
            dialect: self.dialect,
            valuer: self.valuer,
            middlewares: self.middlewares,
        };
        debug!(
            dialect = core.dialect.name(),
            valuer = ?core.valuer,
            middlewares = core.middlewares.len(),
            "database handle created"
        );
        Db {
            driver: self.driver,
            core,
        }
    }
}

impl fmt::Debug for DbBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbBuilder")
            .field("dialect", &self.dialect.name())
            .field("valuer", &self.valuer)
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}
