//! SQL statement builder and entity mapping for webframe.
//!
//! Structs declared with [`entity!`] describe their fields to a [`Registry`],
//! which turns them into [`Model`]s: table name, column names and field
//! layout. Statement builders compile expression trees against a model into
//! parameterized SQL and run it through a [`Session`], either a [`Db`] or an
//! open [`Tx`].
//!
//! # Features
//!
//! - **Select**: columns, aliases, aggregates, `WHERE`, `GROUP BY`,
//!   `HAVING`, `LIMIT`, `OFFSET`
//! - **Insert**: one or many rows, column subsets, dialect-specific upserts
//! - **Delete**: with `WHERE`
//! - **Dialects**: MySQL and SQLite
//! - **Middleware**: interceptors around every statement, such as
//!   [`QueryLog`]
//! - **Transactions**: explicit, propagated through a [`TxContext`], or
//!   scoped with [`Db::do_tx`]
//!
//! # Example
//!
//! ```rust
//! use webframe_orm::testing::MockDriver;
//! use webframe_orm::{col, entity, Db, Rows, Selector, Value};
//!
//! entity! {
//!     #[derive(Debug, PartialEq)]
//!     pub struct User {
//!         pub id: i64,
//!         pub first_name: String,
//!         pub age: i8,
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let driver = MockDriver::new();
//! driver.push_rows(
//!     Rows::new(["id", "first_name", "age"])
//!         .with_row(vec![Value::I64(1), Value::Text("Tom".into()), Value::I64(18)]),
//! );
//!
//! let db = Db::open(driver.clone());
//! let user = Selector::<User>::new(&db)
//!     .where_([col("id").eq(1)])
//!     .get()
//!     .await
//!     .unwrap();
//! assert_eq!(user.first_name, "Tom");
//! assert_eq!(driver.executed_sql(), ["SELECT * FROM `user` WHERE `id` = ?;"]);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/webframe-orm/0.1.0")]

mod builder;
mod config;
mod db;
mod delete;
mod dialect;
mod entity;
mod error;
mod expr;
mod insert;
mod middleware;
mod model;
mod registry;
mod select;
mod session;
mod transaction;
mod value;

pub mod testing;
pub mod valuer;

pub use builder::{Clause, Query, QueryBuilder, SqlBuilder};
pub use config::OrmConfig;
pub use db::{Core, Db, DbBuilder};
pub use delete::Deleter;
pub use dialect::{Dialect, DialectKind, MySql, Sqlite, Upsert};
pub use entity::{Entity, EntityKind, FieldDescriptor};
pub use error::{OrmError, OrmResult};
pub use expr::{
    assign, avg, col, count, max, min, not, raw, sum, Aggregate, AggregateFn, Assignable,
    Assignment, Column, Expr, IntoExpr, Op, Predicate, RawExpr, Selectable,
};
pub use insert::{Inserter, UpsertBuilder};
pub use middleware::{
    Middleware, Next, QueryContext, QueryLog, QueryLogEntry, QueryOutput, QueryResult,
    StatementKind,
};
pub use model::{underscore_name, with_column_name, with_table_name, Field, Model, ModelOption};
pub use registry::Registry;
pub use select::Selector;
pub use session::{Driver, DriverTx, ExecResult, Row, Rows, Session};
pub use transaction::{Tx, TxContext};
pub use value::{ColumnType, ColumnValue, ConversionError, ScalarKind, ScalarValue, Value};
pub use valuer::{ValueAccessor, ValuerKind};
