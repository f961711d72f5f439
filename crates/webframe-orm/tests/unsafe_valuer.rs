//! The raw-offset accessor behind the explicit opt-in.

#![allow(unsafe_code)]

use webframe_orm::testing::MockDriver;
use webframe_orm::{entity, Db, Inserter, QueryBuilder, Rows, Selector, Value, ValuerKind};

entity! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Account {
        pub id: u64,
        pub email: String,
        pub balance: f64,
        pub active: bool,
        pub nickname: Option<String>,
        #[orm = "column=avatar_png"]
        pub avatar: Vec<u8>,
    }
}

fn unsafe_db(driver: MockDriver) -> Db {
    // SAFETY: `Account` is declared with `entity!`.
    unsafe { Db::builder(driver).unsafe_valuer() }.build()
}

#[test]
fn test_insert_reads_fields_in_place() {
    let db = unsafe_db(MockDriver::new());
    assert_eq!(db_valuer(&db), ValuerKind::Unsafe);

    let account = Account {
        id: 7,
        email: "a@b.c".into(),
        balance: 12.5,
        active: true,
        nickname: None,
        avatar: vec![0x89, 0x50],
    };
    let q = Inserter::new(&db).value(account).build().unwrap();
    assert_eq!(
        q.sql,
        "INSERT INTO `account`(`id`, `email`, `balance`, `active`, `nickname`, `avatar_png`) \
         VALUES(?,?,?,?,?,?);"
    );
    assert_eq!(
        q.args,
        vec![
            Value::U64(7),
            Value::Text("a@b.c".into()),
            Value::F64(12.5),
            Value::Bool(true),
            Value::Null,
            Value::Bytes(vec![0x89, 0x50]),
        ]
    );
}

#[tokio::test]
async fn test_select_writes_fields_in_place() {
    let driver = MockDriver::new();
    driver.push_rows(
        Rows::new(["email", "nickname", "avatar_png", "balance"]).with_row(vec![
            Value::Text("x@y.z".into()),
            Value::Text("xy".into()),
            Value::Bytes(vec![1]),
            Value::Text("3.25".into()),
        ]),
    );
    let db = unsafe_db(driver);

    let got = Selector::<Account>::new(&db).get().await.unwrap();
    assert_eq!(
        got,
        Account {
            id: 0,
            email: "x@y.z".into(),
            balance: 3.25,
            active: false,
            nickname: Some("xy".into()),
            avatar: vec![1],
        }
    );
}

fn db_valuer(db: &Db) -> ValuerKind {
    use webframe_orm::Session;
    db.core().valuer()
}
