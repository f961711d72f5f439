//! SQL dialects.
//!
//! A [`Dialect`] supplies the identifier quote character and renders the
//! upsert clause of an `INSERT`. Two are provided: [`MySql`] and [`Sqlite`].

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::builder::SqlBuilder;
use crate::error::{OrmError, OrmResult};
use crate::expr::{Assignable, Assignment, Expr};

/// The update part of an upsert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Upsert {
    conflict_columns: Vec<String>,
    assigns: Vec<Assignable>,
}

impl Upsert {
    /// Creates an upsert spec.
    #[must_use]
    pub fn new(conflict_columns: Vec<String>, assigns: Vec<Assignable>) -> Self {
        Self {
            conflict_columns,
            assigns,
        }
    }

    /// Fields whose uniqueness conflict triggers the update.
    #[must_use]
    pub fn conflict_columns(&self) -> &[String] {
        &self.conflict_columns
    }

    /// Assignments applied on conflict.
    #[must_use]
    pub fn assigns(&self) -> &[Assignable] {
        &self.assigns
    }
}

/// Backend-specific SQL syntax.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Dialect name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Identifier quote character.
    fn quote_char(&self) -> char;

    /// Appends the upsert clause, including its leading space.
    fn build_upsert(&self, b: &mut SqlBuilder<'_>, upsert: &Upsert) -> OrmResult<()>;
}

/// MySQL: `ON DUPLICATE KEY UPDATE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn build_upsert(&self, b: &mut SqlBuilder<'_>, upsert: &Upsert) -> OrmResult<()> {
        b.push_str(" ON DUPLICATE KEY UPDATE ");
        for (i, assign) in upsert.assigns().iter().enumerate() {
            if i > 0 {
                b.push_char(',');
            }
            match assign {
                Assignable::Column(c) => {
                    let column = b.model().require_field(c.name())?.column();
                    b.quote(column);
                    b.push_str("=VALUES(");
                    b.quote(column);
                    b.push_char(')');
                }
                Assignable::Assignment(a) => assignment(b, a)?,
            }
        }
        Ok(())
    }
}

/// SQLite: `ON CONFLICT(..) DO UPDATE SET`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn build_upsert(&self, b: &mut SqlBuilder<'_>, upsert: &Upsert) -> OrmResult<()> {
        b.push_str(" ON CONFLICT");
        if !upsert.conflict_columns().is_empty() {
            b.push_char('(');
            for (i, field) in upsert.conflict_columns().iter().enumerate() {
                if i > 0 {
                    b.push_char(',');
                }
                b.column(field)?;
            }
            b.push_char(')');
        }
        b.push_str(" DO UPDATE SET ");
        for (i, assign) in upsert.assigns().iter().enumerate() {
            if i > 0 {
                b.push_char(',');
            }
            match assign {
                Assignable::Column(c) => {
                    let column = b.model().require_field(c.name())?.column();
                    b.quote(column);
                    b.push_str("=excluded.");
                    b.quote(column);
                }
                Assignable::Assignment(a) => assignment(b, a)?,
            }
        }
        Ok(())
    }
}

/// `col=?`, `col=other_col` or `col=<raw>`.
fn assignment(b: &mut SqlBuilder<'_>, a: &Assignment) -> OrmResult<()> {
    b.column(a.field())?;
    b.push_char('=');
    match a.value() {
        Expr::Value(v) => b.push_arg(v.clone()),
        Expr::Column(c) => b.column(c.name())?,
        Expr::Raw(r) => b.raw(r),
        other @ (Expr::Predicate(_) | Expr::Aggregate(_)) => {
            return Err(OrmError::UnsupportedAssignableType(format!(
                "{} assigned to {}",
                other.kind_name(),
                a.field()
            )));
        }
    }
    Ok(())
}

/// Built-in dialects, selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// [`MySql`]
    #[default]
    Mysql,
    /// [`Sqlite`]
    Sqlite,
}

impl DialectKind {
    /// The dialect implementation.
    #[must_use]
    pub fn dialect(self) -> Arc<dyn Dialect> {
        match self {
            Self::Mysql => Arc::new(MySql),
            Self::Sqlite => Arc::new(Sqlite),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{assign, avg, col, raw};
    use crate::model::Model;
    use crate::value::Value;

    crate::entity! {
        pub struct TestModel {
            pub id: i64,
            pub first_name: String,
            pub age: i8,
        }
    }

    fn upsert_sql(dialect: &dyn Dialect, upsert: &Upsert) -> OrmResult<(String, Vec<Value>)> {
        let model = Model::parse::<TestModel>()?;
        let mut b = SqlBuilder::new(&model, dialect);
        dialect.build_upsert(&mut b, upsert)?;
        let q = b.finish();
        Ok((q.sql, q.args))
    }

    #[test]
    fn test_mysql_columns() {
        let upsert = Upsert::new(vec![], vec![col("first_name").into(), col("age").into()]);
        let (sql, args) = upsert_sql(&MySql, &upsert).unwrap();
        assert_eq!(
            sql,
            " ON DUPLICATE KEY UPDATE `first_name`=VALUES(`first_name`),`age`=VALUES(`age`);"
        );
        assert!(args.is_empty());
    }

    #[test]
    fn test_mysql_assignments() {
        let upsert = Upsert::new(
            vec![],
            vec![assign("first_name", "Deng").into(), assign("age", 19).into()],
        );
        let (sql, args) = upsert_sql(&MySql, &upsert).unwrap();
        assert_eq!(sql, " ON DUPLICATE KEY UPDATE `first_name`=?,`age`=?;");
        assert_eq!(args, vec![Value::Text("Deng".into()), Value::I32(19)]);
    }

    #[test]
    fn test_sqlite() {
        let upsert = Upsert::new(
            vec!["id".to_string()],
            vec![col("first_name").into(), assign("age", 19).into()],
        );
        let (sql, args) = upsert_sql(&Sqlite, &upsert).unwrap();
        assert_eq!(
            sql,
            " ON CONFLICT(`id`) DO UPDATE SET `first_name`=excluded.`first_name`,`age`=?;"
        );
        assert_eq!(args, vec![Value::I32(19)]);
    }

    #[test]
    fn test_assignment_values() {
        let upsert = Upsert::new(
            vec![],
            vec![
                assign("age", col("id")).into(),
                assign("first_name", raw("CONCAT(?, `first_name`)", vec!["x".into()])).into(),
            ],
        );
        let (sql, args) = upsert_sql(&MySql, &upsert).unwrap();
        assert_eq!(
            sql,
            " ON DUPLICATE KEY UPDATE `age`=`id`,`first_name`=CONCAT(?, `first_name`);"
        );
        assert_eq!(args, vec![Value::Text("x".into())]);
    }

    #[test]
    fn test_unsupported_assignment() {
        let upsert = Upsert::new(vec![], vec![assign("age", avg("age")).into()]);
        let err = upsert_sql(&MySql, &upsert).unwrap_err();
        assert!(matches!(err, OrmError::UnsupportedAssignableType(_)));

        let upsert = Upsert::new(vec![], vec![assign("age", col("age").gt(1)).into()]);
        let err = upsert_sql(&Sqlite, &upsert).unwrap_err();
        assert!(matches!(err, OrmError::UnsupportedAssignableType(_)));
    }

    #[test]
    fn test_unknown_fields() {
        let upsert = Upsert::new(vec!["nope".to_string()], vec![col("age").into()]);
        assert!(matches!(
            upsert_sql(&Sqlite, &upsert).unwrap_err(),
            OrmError::UnknownField(_)
        ));

        let upsert = Upsert::new(vec![], vec![col("nope").into()]);
        assert!(matches!(
            upsert_sql(&MySql, &upsert).unwrap_err(),
            OrmError::UnknownField(_)
        ));
    }

    #[test]
    fn test_dialect_kind() {
        assert_eq!(DialectKind::default(), DialectKind::Mysql);
        assert_eq!(DialectKind::Sqlite.dialect().name(), "sqlite");

        #[derive(Deserialize)]
        struct Wrapper {
            dialect: DialectKind,
        }
        let w: Wrapper = toml::from_str("dialect = \"sqlite\"").unwrap();
        assert_eq!(w.dialect, DialectKind::Sqlite);
        assert!(toml::from_str::<Wrapper>("dialect = \"oracle\"").is_err());
    }
}
