//! `DELETE` statements.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::builder::{Clause, Query, QueryBuilder, SqlBuilder};
use crate::entity::Entity;
use crate::error::OrmResult;
use crate::expr::Predicate;
use crate::middleware::StatementKind;
use crate::model::Model;
use crate::session::{ExecResult, Session};

/// Builds and runs a `DELETE` for entity `T`.
///
/// Without [`from`](Deleter::from) the statement targets the entity's type
/// name, quoted: `DELETE FROM `TestModel``.
pub struct Deleter<'s, T> {
    session: &'s dyn Session,
    table: String,
    where_: Vec<Predicate>,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, T: Entity> Deleter<'s, T> {
    /// Starts a deleter running against `session`.
    pub fn new(session: &'s dyn Session) -> Self {
        Self {
            session,
            table: String::new(),
            where_: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Overrides the table. The text is used verbatim, unquoted.
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

    /// Runs the delete.
    ///
    /// # Errors
    ///
    /// Any compile or driver error.
    pub async fn exec(mut self) -> OrmResult<ExecResult> {
        let session = self.session;
        session
            .core()
            .run_exec(session, &mut self, StatementKind::Delete)
            .await
    }
}

impl<T: Entity> QueryBuilder for Deleter<'_, T> {
    fn build(&mut self) -> OrmResult<Query> {
        let model = self.model()?;
        let dialect = Arc::clone(self.session.core().dialect());
        let mut b = SqlBuilder::new(&model, dialect.as_ref());

        b.push_str("DELETE FROM ");
        if self.table.is_empty() {
            b.quote(model.type_name());
        } else {
            b.push_str(&self.table);
        }
        if !self.where_.is_empty() {
            b.push_str(" WHERE ");
            b.predicates(&self.where_, Clause::Where)?;
        }
        Ok(b.finish())
    }

    fn model(&self) -> OrmResult<Arc<Model>> {
        self.session.core().registry().get::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;
    use crate::error::OrmError;
    use crate::expr::{avg, col};
    use crate::testing::MockDriver;
    use crate::value::Value;

    crate::entity! {
        pub struct TestModel {
            pub id: i64,
            pub first_name: String,
            pub age: i8,
            pub last_name: Option<String>,
        }
    }

    #[test]
    fn test_delete_all() {
        let db = Db::open(MockDriver::new());
        let q = Deleter::<TestModel>::new(&db).build().unwrap();
        assert_eq!(q.sql, "DELETE FROM `TestModel`;");
        assert!(q.args.is_empty());
    }

    #[test]
    fn test_where() {
        let db = Db::open(MockDriver::new());
        let q = Deleter::<TestModel>::new(&db)
            .where_([col("id").eq(16)])
            .build()
            .unwrap();
        assert_eq!(q.sql, "DELETE FROM `TestModel` WHERE `id` = ?;");
        assert_eq!(q.args, vec![Value::I32(16)]);

        let q = Deleter::<TestModel>::new(&db)
            .from("`test_model`")
            .where_([col("age").gt(18), col("first_name").eq("Tom")])
            .build()
            .unwrap();
        assert_eq!(
            q.sql,
            "DELETE FROM `test_model` WHERE (`age` > ?) AND (`first_name` = ?);"
        );
    }

    #[test]
    fn test_where_errors() {
        let db = Db::open(MockDriver::new());
        let err = Deleter::<TestModel>::new(&db)
            .where_([avg("age").gt(1)])
            .build()
            .unwrap_err();
        assert!(matches!(err, OrmError::UnsupportedExpressionType(_)));

        let err = Deleter::<TestModel>::new(&db)
            .where_([col("Invalid").eq(1)])
            .build()
            .unwrap_err();
        assert!(matches!(err, OrmError::UnknownField(_)));
    }

    #[tokio::test]
    async fn test_exec() {
        let driver = MockDriver::new();
        driver.push_exec(3, None);
        let db = Db::open(driver.clone());
        let res = Deleter::<TestModel>::new(&db)
            .where_([col("age").lt(10)])
            .exec()
            .await
            .unwrap();
        assert_eq!(res.rows_affected, 3);
        assert_eq!(
            driver.executed_sql(),
            ["DELETE FROM `TestModel` WHERE `age` < ?;"]
        );
    }
}
