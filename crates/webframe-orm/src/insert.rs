//! `INSERT` statements.
//!
//! # Example
//!
//! ```
//! use webframe_orm::testing::MockDriver;
//! use webframe_orm::{col, entity, Db, Inserter, QueryBuilder};
//!
//! entity! {
//!     pub struct TestModel {
//!         pub id: i64,
//!         pub first_name: String,
//!     }
//! }
//!
//! let db = Db::open(MockDriver::new());
//! let query = Inserter::new(&db)
//!     .value(TestModel { id: 1, first_name: "Tom".into() })
//!     .on_duplicate_key()
//!     .update([col("first_name")])
//!     .build()
//!     .unwrap();
//! assert_eq!(
//!     query.sql,
//!     "INSERT INTO `test_model`(`id`, `first_name`) VALUES(?,?) \
//!      ON DUPLICATE KEY UPDATE `first_name`=VALUES(`first_name`);"
//! );
//! ```

use std::sync::Arc;

use crate::builder::{Query, QueryBuilder, SqlBuilder};
use crate::dialect::Upsert;
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::expr::Assignable;
use crate::middleware::StatementKind;
use crate::model::{Field, Model};
use crate::session::{ExecResult, Session};

/// Builds and runs an `INSERT` of one or more `T` rows.
pub struct Inserter<'s, T> {
    session: &'s dyn Session,
    values: Vec<T>,
    columns: Vec<String>,
    upsert: Option<Upsert>,
}

impl<'s, T: Entity> Inserter<'s, T> {
    /// Starts an inserter running against `session`.
    pub fn new(session: &'s dyn Session) -> Self {
        Self {
            session,
            values: Vec::new(),
            columns: Vec::new(),
            upsert: None,
        }
    }

    /// Sets the rows to insert.
    #[must_use]
    pub fn values(mut self, values: impl IntoIterator<Item = T>) -> Self {
        self.values = values.into_iter().collect();
        self
    }

    /// Appends one row.
    #[must_use]
    pub fn value(mut self, value: T) -> Self {
        self.values.push(value);
        self
    }

    /// Restricts the insert to the given fields, in this order. By default
    /// every field is inserted in declaration order.
    #[must_use]
    pub fn columns<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Starts the upsert clause.
    #[must_use]
    pub fn on_duplicate_key(self) -> UpsertBuilder<'s, T> {
        UpsertBuilder {
            inserter: self,
            conflict_columns: Vec::new(),
        }
    }

    /// Runs the insert.
    ///
    /// # Errors
    ///
    /// Any compile or driver error.
    pub async fn exec(mut self) -> OrmResult<ExecResult> {
        let session = self.session;
        session
            .core()
            .run_exec(session, &mut self, StatementKind::Insert)
            .await
    }

    fn fields<'m>(&self, model: &'m Model) -> OrmResult<Vec<&'m Field>> {
        if self.columns.is_empty() {
            return Ok(model.fields().iter().collect());
        }
        self.columns
            .iter()
            .map(|c| model.require_field(c))
            .collect()
    }
}

impl<T: Entity> QueryBuilder for Inserter<'_, T> {
    fn build(&mut self) -> OrmResult<Query> {
        if self.values.is_empty() {
            return Err(OrmError::InsertZeroRow);
        }
        let model = self.model()?;
        let fields = self.fields(&model)?;
        let core = self.session.core();
        let dialect = Arc::clone(core.dialect());
        let mut b = SqlBuilder::new(&model, dialect.as_ref());

        b.push_str("INSERT INTO ");
        b.quote(model.table_name());
        b.push_char('(');
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                b.push_str(", ");
            }
            b.quote(field.column());
        }
        b.push_str(") VALUES");

        for (i, value) in self.values.iter_mut().enumerate() {
            if i > 0 {
                b.push_char(',');
            }
            b.push_char('(');
            let accessor = core.accessor(value, &model)?;
            for (j, field) in fields.iter().enumerate() {
                if j > 0 {
                    b.push_char(',');
                }
                b.push_arg(accessor.field(field.name())?);
            }
            b.push_char(')');
        }

        if let Some(upsert) = &self.upsert {
            dialect.build_upsert(&mut b, upsert)?;
        }
        Ok(b.finish())
    }

    fn model(&self) -> OrmResult<Arc<Model>> {
        self.session.core().registry().get::<T>()
    }
}

/// Collects the upsert clause of an [`Inserter`].
pub struct UpsertBuilder<'s, T> {
    inserter: Inserter<'s, T>,
    conflict_columns: Vec<String>,
}

impl<'s, T: Entity> UpsertBuilder<'s, T> {
    /// Sets the fields whose conflict triggers the update. Only dialects
    /// with a conflict target, such as SQLite, use them.
    #[must_use]
    pub fn conflict_columns<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.conflict_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the assignments applied on conflict and returns the inserter.
    #[must_use]
    pub fn update<I>(self, assigns: I) -> Inserter<'s, T>
    where
        I: IntoIterator,
        I::Item: Into<Assignable>,
    {
        let mut inserter = self.inserter;
        inserter.upsert = Some(Upsert::new(
            self.conflict_columns,
            assigns.into_iter().map(Into::into).collect(),
        ));
        inserter
    }
}
