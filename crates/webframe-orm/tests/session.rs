//! Running statements: result scanning, the middleware chain and
//! transactions, against the scripted driver.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::Mutex;
use webframe_orm::testing::MockDriver;
use webframe_orm::{
    col, entity, Db, Deleter, ExecResult, Inserter, Middleware, Next, OrmError, QueryContext,
    QueryLog, QueryOutput, QueryResult, Rows, Selector, Session, StatementKind, TxContext, Value,
};

entity! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct TestModel {
        pub id: i64,
        pub first_name: String,
        pub age: i8,
        pub last_name: Option<String>,
    }
}

fn rows() -> Rows {
    Rows::new(["id", "first_name", "age", "last_name"])
        .with_row(vec![
            Value::I64(1),
            Value::Text("Tom".into()),
            Value::I64(18),
            Value::Null,
        ])
        .with_row(vec![
            Value::I64(2),
            Value::Bytes(b"Jerry".to_vec()),
            Value::Text("20".into()),
            Value::Text("Mouse".into()),
        ])
}

#[tokio::test]
async fn test_get_scans_first_row() {
    let driver = MockDriver::new();
    driver.push_rows(rows());
    let db = Db::open(driver.clone());

    let got = Selector::<TestModel>::new(&db)
        .where_([col("id").eq(1)])
        .get()
        .await
        .unwrap();
    assert_eq!(
        got,
        TestModel {
            id: 1,
            first_name: "Tom".into(),
            age: 18,
            last_name: None,
        }
    );

    let executed = driver.executed();
    assert_eq!(executed[0].sql, "SELECT * FROM `test_model` WHERE `id` = ?;");
    assert_eq!(executed[0].args, vec![Value::I32(1)]);
}

#[tokio::test]
async fn test_get_errors() {
    let driver = MockDriver::new();
    let db = Db::open(driver.clone());

    driver.push_rows(Rows::new(["id"]));
    let err = Selector::<TestModel>::new(&db).get().await.unwrap_err();
    assert!(err.is_no_rows());

    driver.push_rows(
        Rows::new(["id", "first_name", "age", "last_name", "extra"]).with_row(vec![Value::I64(1)]),
    );
    let err = Selector::<TestModel>::new(&db).get().await.unwrap_err();
    assert!(matches!(err, OrmError::TooManyReturnedColumns));

    driver.push_rows(Rows::new(["id", "nick_name"]).with_row(vec![Value::I64(1)]));
    let err = Selector::<TestModel>::new(&db).get().await.unwrap_err();
    assert_eq!(err.to_string(), "orm: unknown column: nick_name");

    driver.push_error("connection reset");
    let err = Selector::<TestModel>::new(&db).get().await.unwrap_err();
    assert!(matches!(err, OrmError::Driver(_)));
    assert_eq!(err.to_string(), "mock: connection reset");
}

#[tokio::test]
async fn test_compile_error_never_reaches_driver() {
    let driver = MockDriver::new();
    let db = Db::open(driver.clone());
    let err = Selector::<TestModel>::new(&db)
        .where_([col("Invalid").eq(1)])
        .get()
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::UnknownField(_)));
    assert!(driver.executed().is_empty());
}

#[tokio::test]
async fn test_get_multi() {
    let driver = MockDriver::new();
    driver.push_rows(rows());
    let db = Db::open(driver.clone());

    let all = Selector::<TestModel>::new(&db).get_multi().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].first_name, "Jerry");
    assert_eq!(all[1].age, 20);
    assert_eq!(all[1].last_name.as_deref(), Some("Mouse"));

    driver.push_rows(Rows::new(["id"]));
    let none = Selector::<TestModel>::new(&db).get_multi().await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_get_multi_stops_at_first_bad_row() {
    let driver = MockDriver::new();
    driver.push_rows(
        Rows::new(["id", "age"])
            .with_row(vec![Value::I64(1), Value::I64(18)])
            .with_row(vec![Value::I64(2), Value::I64(300)])
            .with_row(vec![Value::I64(3), Value::I64(19)]),
    );
    let db = Db::open(driver);
    let err = Selector::<TestModel>::new(&db).get_multi().await.unwrap_err();
    assert!(matches!(err, OrmError::ValueConversion { ref column, .. } if column == "age"));
}

struct Record {
    mark: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Middleware for Record {
    fn name(&self) -> &'static str {
        self.mark
    }

    fn handle<'a>(
        &'a self,
        qc: &'a mut QueryContext<'_>,
        next: Next<'a>,
    ) -> BoxFuture<'a, QueryResult> {
        Box::pin(async move {
            let table = qc.model()?.table_name().to_string();
            self.log
                .lock()
                .push(format!("{} before {} {table}", self.mark, qc.kind()));
            let res = next.run(qc).await;
            self.log.lock().push(format!("{} after", self.mark));
            res
        })
    }
}

struct Refuse;

impl Middleware for Refuse {
    fn name(&self) -> &'static str {
        "refuse"
    }

    fn handle<'a>(
        &'a self,
        qc: &'a mut QueryContext<'_>,
        _next: Next<'a>,
    ) -> BoxFuture<'a, QueryResult> {
        Box::pin(async move {
            match qc.kind() {
                StatementKind::Delete => Ok(QueryOutput::Exec(ExecResult::default())),
                _ => Err(OrmError::UnsupportedExpressionType(qc.query()?.sql.clone())),
            }
        })
    }
}

#[tokio::test]
async fn test_middleware_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let driver = MockDriver::new();
    let db = Db::builder(driver.clone())
        .middleware(Record {
            mark: "first",
            log: Arc::clone(&log),
        })
        .middleware(Record {
            mark: "second",
            log: Arc::clone(&log),
        })
        .build();

    Deleter::<TestModel>::new(&db).exec().await.unwrap();
    assert_eq!(
        *log.lock(),
        [
            "first before DELETE test_model",
            "second before DELETE test_model",
            "second after",
            "first after",
        ]
    );
    assert_eq!(driver.executed_sql(), ["DELETE FROM `TestModel`;"]);
}

#[tokio::test]
async fn test_middleware_short_circuit() {
    let driver = MockDriver::new();
    let db = Db::builder(driver.clone()).middleware(Refuse).build();

    let res = Deleter::<TestModel>::new(&db).exec().await.unwrap();
    assert_eq!(res.rows_affected, 0);

    let err = Inserter::new(&db)
        .value(TestModel::default())
        .columns(["id"])
        .exec()
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "orm: unsupported expression: INSERT INTO `test_model`(`id`) VALUES(?); "
    );
    assert!(driver.executed().is_empty());
}

#[tokio::test]
async fn test_query_log_passes_results_through() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&entries);
    let driver = MockDriver::new();
    let db = Db::builder(driver.clone())
        .middleware(QueryLog::new().log_fn(move |e| sink.lock().push(e.clone())))
        .build();

    driver.push_rows(Rows::new(["id"]));
    let err = Selector::<TestModel>::new(&db).get().await.unwrap_err();
    assert!(err.is_no_rows());

    let entries = entries.lock();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, StatementKind::Select);
    assert_eq!(entries[0].table.as_deref(), Some("test_model"));
    assert_eq!(entries[0].sql.as_deref(), Some("SELECT * FROM `test_model`;"));
    assert!(!entries[0].failed);
}

#[tokio::test]
async fn test_do_tx_commits() {
    let driver = MockDriver::new();
    driver.push_exec(1, Some(3));
    driver.push_rows(rows());
    let db = Db::open(driver.clone());

    let got = db
        .do_tx(|tx| {
            async move {
                Inserter::new(tx).value(TestModel::default()).exec().await?;
                Selector::<TestModel>::new(tx).get().await
            }
            .boxed()
        })
        .await
        .unwrap();
    assert_eq!(got.id, 1);

    let sql = driver.executed_sql();
    assert_eq!(sql.first().map(String::as_str), Some("BEGIN"));
    assert_eq!(sql.last().map(String::as_str), Some("COMMIT"));
    assert_eq!(sql.len(), 4);
}

#[tokio::test]
async fn test_do_tx_rolls_back_on_error() {
    let driver = MockDriver::new();
    let db = Db::open(driver.clone());

    let err = db
        .do_tx(|tx| {
            async move {
                Deleter::<TestModel>::new(tx).exec().await?;
                Err::<(), _>(OrmError::NoRows)
            }
            .boxed()
        })
        .await
        .unwrap_err();
    assert!(err.is_no_rows());
    assert_eq!(
        driver.executed_sql(),
        ["BEGIN", "DELETE FROM `TestModel`;", "ROLLBACK"]
    );
}

#[tokio::test]
async fn test_do_tx_reports_failed_rollback() {
    let driver = MockDriver::new();
    driver.fail_rollback();
    let db = Db::open(driver.clone());

    let err = db
        .do_tx(|_tx| async { Err::<(), _>(OrmError::InsertZeroRow) }.boxed())
        .await
        .unwrap_err();
    match err {
        OrmError::RollbackFailed {
            business,
            rollback,
            panicked,
        } => {
            assert!(matches!(business.as_deref(), Some(OrmError::InsertZeroRow)));
            assert_eq!(rollback.to_string(), "mock: rollback failed");
            assert!(!panicked);
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn explode() -> webframe_orm::OrmResult<()> {
    panic!("boom")
}

#[tokio::test]
async fn test_do_tx_panic() {
    let driver = MockDriver::new();
    let db = Db::open(driver.clone());
    let caught = std::panic::AssertUnwindSafe(db.do_tx(|_tx| async { explode() }.boxed()))
    .catch_unwind()
    .await;
    assert!(caught.is_err());
    assert_eq!(driver.executed_sql(), ["BEGIN", "ROLLBACK"]);

    driver.fail_rollback();
    let err = db
        .do_tx(|_tx| async { explode() }.boxed())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrmError::RollbackFailed {
            business: None,
            panicked: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_propagated_transaction() {
    let driver = MockDriver::new();
    let db = Db::open(driver.clone());

    let (ctx, tx) = db.begin_tx_in(&TxContext::new()).await.unwrap();
    let (_, same) = db.begin_tx_in(&ctx).await.unwrap();
    Deleter::<TestModel>::new(&*same).exec().await.unwrap();
    tx.commit().await.unwrap();

    let err = Deleter::<TestModel>::new(&*tx).exec().await.unwrap_err();
    assert!(matches!(err, OrmError::TransactionDone));
    assert_eq!(
        driver.executed_sql(),
        ["BEGIN", "DELETE FROM `TestModel`;", "COMMIT"]
    );
    assert_eq!(tx.core().dialect().name(), "mysql");
}
