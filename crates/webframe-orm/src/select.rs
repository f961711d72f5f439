//! `SELECT` statements.
//!
//! # Example
//!
//! ```
//! use webframe_orm::testing::MockDriver;
//! use webframe_orm::{col, entity, Db, QueryBuilder, Selector, Value};
//!
//! entity! {
//!     pub struct TestModel {
//!         pub id: i64,
//!         pub age: i8,
//!     }
//! }
//!
//! let db = Db::open(MockDriver::new());
//! let query = Selector::<TestModel>::new(&db)
//!     .where_([col("age").gt(18)])
//!     .limit(10)
//!     .build()
//!     .unwrap();
//! assert_eq!(query.sql, "SELECT * FROM `test_model` WHERE `age` > ? LIMIT ?;");
//! assert_eq!(query.args, vec![Value::I32(18), Value::U64(10)]);
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use crate::builder::{Clause, Query, QueryBuilder, SqlBuilder};
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::expr::{Column, Predicate, Selectable};
use crate::middleware::StatementKind;
use crate::model::Model;
use crate::session::{Row, Session};
use crate::value::Value;

/// Builds and runs a `SELECT` for entity `T`.
pub struct Selector<'s, T> {
    session: &'s dyn Session,
    table: String,
    columns: Vec<Selectable>,
    where_: Vec<Predicate>,
    group_by: Vec<Column>,
    having: Vec<Predicate>,
    limit: u64,
    offset: u64,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, T: Entity> Selector<'s, T> {
    /// Starts a selector running against `session`.
    pub fn new(session: &'s dyn Session) -> Self {
        Self {
            session,
            table: String::new(),
            columns: Vec::new(),
            where_: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            limit: 0,
            offset: 0,
            _entity: PhantomData,
        }
    }

    /// Sets the select list. An empty list selects `*`.
    #[must_use]
    pub fn select<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Selectable>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the table. The text is used verbatim, unquoted; an empty
    /// string restores the model's table.
    #[must_use]
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Sets the `WHERE` conditions, joined with `AND`.
    #[must_use]
    pub fn where_(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.where_ = predicates.into_iter().collect();
        self
    }

    /// Sets the `GROUP BY` columns.
    #[must_use]
    pub fn group_by(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.group_by = columns.into_iter().collect();
        self
    }

    /// Sets the `HAVING` conditions, joined with `AND`.
    #[must_use]
    pub fn having(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.having = predicates.into_iter().collect();
        self
    }

    /// Sets `LIMIT`. Zero means no limit.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Sets `OFFSET`. Zero means no offset.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Runs the query and returns the first row.
    ///
    /// # Errors
    ///
    /// - [`OrmError::NoRows`] if the query returned nothing.
    /// - Any compile, driver or scan error.
    pub async fn get(mut self) -> OrmResult<T> {
        let session = self.session;
        let core = session.core();
        let rows = core
            .run_query(session, &mut self, StatementKind::Select)
            .await?;
        let row = rows.first().ok_or(OrmError::NoRows)?;
        let model = core.registry().get::<T>()?;
        scan(session, &model, row)
    }

    /// Runs the query and returns every row.
    ///
    /// # Errors
    ///
    /// Any compile or driver error, or the first row that fails to scan.
    pub async fn get_multi(mut self) -> OrmResult<Vec<T>> {
        let session = self.session;
        let core = session.core();
        let rows = core
            .run_query(session, &mut self, StatementKind::Select)
            .await?;
        let model = core.registry().get::<T>()?;
        rows.iter().map(|row| scan(session, &model, row)).collect()
    }
}

fn scan<T: Entity>(session: &dyn Session, model: &Model, row: Row<'_>) -> OrmResult<T> {
    let mut entity = T::default();
    session
        .core()
        .accessor(&mut entity, model)?
        .set_columns(row)?;
    Ok(entity)
}

impl<T: Entity> QueryBuilder for Selector<'_, T> {
    fn build(&mut self) -> OrmResult<Query> {
        let model = self.model()?;
        let dialect = Arc::clone(self.session.core().dialect());
        let mut b = SqlBuilder::new(&model, dialect.as_ref());

        b.push_str("SELECT ");
        if self.columns.is_empty() {
            b.push_char('*');
        }
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                b.push_char(',');
            }
            b.selectable(column)?;
        }

        b.push_str(" FROM ");
        if self.table.is_empty() {
            b.quote(model.table_name());
        } else {
            b.push_str(&self.table);
        }

        if !self.where_.is_empty() {
            b.push_str(" WHERE ");
            b.predicates(&self.where_, Clause::Where)?;
        }
        if !self.group_by.is_empty() {
            b.push_str(" GROUP BY ");
            b.columns(&self.group_by)?;
        }
        if !self.having.is_empty() {
            b.push_str(" HAVING ");
            b.predicates(&self.having, Clause::Having)?;
        }
        if self.limit > 0 {
            b.push_str(" LIMIT ");
            b.push_arg(Value::U64(self.limit));
        }
        if self.offset > 0 {
            b.push_str(" OFFSET ");
            b.push_arg(Value::U64(self.offset));
        }
        Ok(b.finish())
    }

    fn model(&self) -> OrmResult<Arc<Model>> {
        self.session.core().registry().get::<T>()
    }
}
