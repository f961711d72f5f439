//! Compiled SQL for the three statement builders, checked end to end
//! through the public API.

use proptest::prelude::*;
use webframe_orm::testing::MockDriver;
use webframe_orm::{
    assign, avg, col, entity, not, raw, underscore_name, with_column_name, with_table_name,
    Assignable, Db, Deleter, Inserter, OrmError, QueryBuilder, Registry, Selectable, Selector,
    Sqlite, Value,
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

entity! {
    pub struct Order as "orders" {
        pub id: i64,
        #[orm = "column=buyer"]
        pub user_id: i64,
    }
}

fn tom() -> TestModel {
    TestModel {
        id: 12,
        first_name: "Tom".into(),
        age: 18,
        last_name: None,
    }
}

#[test]
fn test_select_defaults_to_model_table() {
    let db = Db::open(MockDriver::new());
    let q = Selector::<TestModel>::new(&db).build().unwrap();
    assert_eq!(q.sql, "SELECT * FROM `test_model`;");
    assert!(q.args.is_empty());

    let q = Selector::<Order>::new(&db).build().unwrap();
    assert_eq!(q.sql, "SELECT * FROM `orders`;");
}

#[test]
fn test_select_full_clause_order() {
    let db = Db::open(MockDriver::new());
    let q = Selector::<TestModel>::new(&db)
        .select([
            Selectable::from(col("age")),
            avg("id").as_("avg_id").into(),
        ])
        .where_([col("age").gt(18), col("age").lt(35)])
        .group_by([col("age")])
        .having([avg("id").gt(3)])
        .limit(10)
        .offset(20)
        .build()
        .unwrap();
    assert_eq!(
        q.sql,
        "SELECT `age`,AVG(`id`) AS `avg_id` FROM `test_model` \
         WHERE (`age` > ?) AND (`age` < ?) GROUP BY `age` HAVING AVG(`id`) > ? \
         LIMIT ? OFFSET ?;"
    );
    assert_eq!(
        q.args,
        vec![
            Value::I32(18),
            Value::I32(35),
            Value::I32(3),
            Value::U64(10),
            Value::U64(20),
        ]
    );
}

#[test]
fn test_select_predicate_shapes() {
    let db = Db::open(MockDriver::new());

    let q = Selector::<TestModel>::new(&db)
        .where_([not(col("age").eq(18).or(col("age").eq(20)))])
        .build()
        .unwrap();
    assert_eq!(
        q.sql,
        "SELECT * FROM `test_model` WHERE  NOT ((`age` = ?) OR (`age` = ?));"
    );

    let q = Selector::<TestModel>::new(&db)
        .where_([raw("`age` < ?", vec![Value::I64(18)]).as_predicate()])
        .build()
        .unwrap();
    assert_eq!(q.sql, "SELECT * FROM `test_model` WHERE `age` < ?;");
    assert_eq!(q.args, vec![Value::I64(18)]);

    let q = Selector::<TestModel>::new(&db)
        .where_([col("last_name").eq(None::<String>)])
        .build()
        .unwrap();
    assert_eq!(q.args, vec![Value::Null]);
}

#[test]
fn test_select_uses_tag_and_options() {
    let registry = std::sync::Arc::new(Registry::new());
    registry
        .register::<TestModel>(vec![
            with_table_name("people"),
            with_column_name("first_name", "given_name"),
        ])
        .unwrap();
    let db = Db::builder(MockDriver::new()).registry(registry).build();

    let q = Selector::<TestModel>::new(&db)
        .select([col("first_name")])
        .build()
        .unwrap();
    assert_eq!(q.sql, "SELECT `given_name` FROM `people`;");

    let q = Selector::<Order>::new(&db)
        .where_([col("user_id").eq(7)])
        .build()
        .unwrap();
    assert_eq!(q.sql, "SELECT * FROM `orders` WHERE `buyer` = ?;");
}

#[test]
fn test_delete_targets_type_name() {
    let db = Db::open(MockDriver::new());
    let q = Deleter::<TestModel>::new(&db)
        .where_([col("id").eq(16_i64)])
        .build()
        .unwrap();
    assert_eq!(q.sql, "DELETE FROM `TestModel` WHERE `id` = ?;");
    assert_eq!(q.args, vec![Value::I64(16)]);
}

#[test]
fn test_insert_errors() {
    let db = Db::open(MockDriver::new());
    let err = Inserter::<TestModel>::new(&db).values([]).build().unwrap_err();
    assert!(matches!(err, OrmError::InsertZeroRow));

    let err = Inserter::new(&db)
        .value(tom())
        .columns(["nick_name"])
        .build()
        .unwrap_err();
    assert_eq!(err.to_string(), "orm: unknown field nick_name");
}

#[test]
fn test_upsert_per_dialect() {
    let mysql = Db::open(MockDriver::new());
    let q = Inserter::new(&mysql)
        .value(tom())
        .columns(["id", "first_name"])
        .on_duplicate_key()
        .update([col("first_name")])
        .build()
        .unwrap();
    assert_eq!(
        q.sql,
        "INSERT INTO `test_model`(`id`, `first_name`) VALUES(?,?) \
         ON DUPLICATE KEY UPDATE `first_name`=VALUES(`first_name`);"
    );

    let sqlite = Db::builder(MockDriver::new()).dialect(Sqlite).build();
    let q = Inserter::new(&sqlite)
        .value(tom())
        .columns(["id", "first_name"])
        .on_duplicate_key()
        .conflict_columns(["id"])
        .update([
            Assignable::from(col("first_name")),
            assign("age", 19).into(),
        ])
        .build()
        .unwrap();
    assert_eq!(
        q.sql,
        "INSERT INTO `test_model`(`id`, `first_name`) VALUES(?,?) \
         ON CONFLICT(`id`) DO UPDATE SET `first_name`=excluded.`first_name`,`age`=?;"
    );
    assert_eq!(
        q.args,
        vec![Value::I64(12), Value::Text("Tom".into()), Value::I32(19)]
    );
}

#[test]
fn test_underscore_examples() {
    assert_eq!(underscore_name("ID"), "i_d");
    assert_eq!(underscore_name("Table1Name"), "table1_name");
    assert_eq!(underscore_name("id"), "id");
}

proptest! {
    #[test]
    fn prop_underscore_is_identity_on_snake_case(name in "[a-z][a-z0-9_]{0,24}") {
        prop_assert_eq!(underscore_name(&name), name);
    }

    #[test]
    fn prop_underscore_adds_one_separator_per_inner_capital(name in "[A-Za-z][A-Za-z0-9]{0,24}") {
        let out = underscore_name(&name);
        let inner_capitals = name
            .chars()
            .skip(1)
            .filter(char::is_ascii_uppercase)
            .count();
        prop_assert_eq!(out.len(), name.len() + inner_capitals);
        prop_assert!(!out.chars().any(|c| c.is_ascii_uppercase()));
        prop_assert_eq!(underscore_name(&out), out.clone());
    }
}
