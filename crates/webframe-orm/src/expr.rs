//! Expression tree.
//!
//! Statements are composed from a closed set of nodes: columns, literal
//! values, predicates, aggregates and raw SQL fragments. Field references
//! use Rust field names and are resolved to columns when the statement is
//! built.
//!
//! # Example
//!
//! ```
//! use webframe_orm::{col, not, Expr};
//!
//! let adult = col("age").gt(18);
//! let young = col("age").lt(35);
//! let filter = not(adult.and(young));
//! assert!(matches!(Expr::from(filter), Expr::Predicate(_)));
//! ```

use std::fmt;

use crate::value::Value;

/// Comparison and logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `=`
    Eq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `AND`
    And,
    /// `OR`
    Or,
    /// `NOT`
    Not,
}

impl Op {
    /// The SQL token.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A field reference.
    Column(Column),
    /// A literal bound as a `?` argument.
    Value(Value),
    /// A predicate.
    Predicate(Box<Predicate>),
    /// An aggregate function call.
    Aggregate(Aggregate),
    /// A raw SQL fragment.
    Raw(RawExpr),
}

impl Expr {
    /// Short name of the node kind, used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Column(_) => "column",
            Self::Value(_) => "value",
            Self::Predicate(_) => "predicate",
            Self::Aggregate(_) => "aggregate",
            Self::Raw(_) => "raw expression",
        }
    }
}

impl From<Column> for Expr {
    fn from(c: Column) -> Self {
        Self::Column(c)
    }
}

impl From<Predicate> for Expr {
    fn from(p: Predicate) -> Self {
        Self::Predicate(Box::new(p))
    }
}

impl From<Aggregate> for Expr {
    fn from(a: Aggregate) -> Self {
        Self::Aggregate(a)
    }
}

impl From<RawExpr> for Expr {
    fn from(r: RawExpr) -> Self {
        Self::Raw(r)
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

/// Conversion into an operand: expression nodes stay as they are, plain
/// Rust values become [`Expr::Value`].
pub trait IntoExpr {
    /// Converts `self` into an expression.
    fn into_expr(self) -> Expr;
}

macro_rules! into_expr_node {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntoExpr for $t {
                fn into_expr(self) -> Expr {
                    Expr::from(self)
                }
            }
        )*
    };
}

into_expr_node!(Expr, Column, Predicate, Aggregate, RawExpr, Value);

macro_rules! into_expr_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntoExpr for $t {
                fn into_expr(self) -> Expr {
                    Expr::Value(Value::from(self))
                }
            }
        )*
    };
}

into_expr_value!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, &str, Vec<u8>);

impl<T: Into<Value>> IntoExpr for Option<T> {
    fn into_expr(self) -> Expr {
        Expr::Value(Value::from(self))
    }
}

fn compare(left: Expr, op: Op, right: impl IntoExpr) -> Predicate {
    Predicate::Binary {
        left,
        op,
        right: right.into_expr(),
    }
}

/// A reference to an entity field, optionally aliased in a select list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    alias: Option<String>,
}

/// References the field `name` (the Rust field name, not the column).
pub fn col(name: impl Into<String>) -> Column {
    Column {
        name: name.into(),
        alias: None,
    }
}

impl Column {
    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alias, if set.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Sets the alias used in a select list.
    #[must_use]
    pub fn as_(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// `self = value`
    #[allow(clippy::should_implement_trait)]
    pub fn eq(self, value: impl IntoExpr) -> Predicate {
        compare(self.into(), Op::Eq, value)
    }

    /// `self < value`
    pub fn lt(self, value: impl IntoExpr) -> Predicate {
        compare(self.into(), Op::Lt, value)
    }

    /// `self > value`
    pub fn gt(self, value: impl IntoExpr) -> Predicate {
        compare(self.into(), Op::Gt, value)
    }
}

/// A boolean condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `left op right`
    Binary {
        /// Left operand.
        left: Expr,
        /// Operator.
        op: Op,
        /// Right operand.
        right: Expr,
    },
    /// `NOT (inner)`
    Not(Box<Predicate>),
    /// A raw fragment used as a condition.
    Raw(RawExpr),
}

impl Predicate {
    /// `(self) AND (other)`
    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        compare(self.into(), Op::And, other)
    }

    /// `(self) OR (other)`
    #[must_use]
    pub fn or(self, other: Predicate) -> Self {
        compare(self.into(), Op::Or, other)
    }
}

/// `NOT (p)`
pub fn not(p: Predicate) -> Predicate {
    Predicate::Not(Box::new(p))
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    /// `AVG`
    Avg,
    /// `SUM`
    Sum,
    /// `COUNT`
    Count,
    /// `MAX`
    Max,
    /// `MIN`
    Min,
}

impl AggregateFn {
    /// The SQL function name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Avg => "AVG",
            Self::Sum => "SUM",
            Self::Count => "COUNT",
            Self::Max => "MAX",
            Self::Min => "MIN",
        }
    }
}

/// An aggregate over one field, such as `AVG(age)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    func: AggregateFn,
    field: String,
    alias: Option<String>,
}

impl Aggregate {
    fn new(func: AggregateFn, field: impl Into<String>) -> Self {
        Self {
            func,
            field: field.into(),
            alias: None,
        }
    }

    /// The function.
    #[must_use]
    pub fn func(&self) -> AggregateFn {
        self.func
    }

    /// The aggregated field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Alias, if set.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Sets the alias used in a select list.
    #[must_use]
    pub fn as_(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// `self = value`
    #[allow(clippy::should_implement_trait)]
    pub fn eq(self, value: impl IntoExpr) -> Predicate {
        compare(self.into(), Op::Eq, value)
    }

    /// `self < value`
    pub fn lt(self, value: impl IntoExpr) -> Predicate {
        compare(self.into(), Op::Lt, value)
    }

    /// `self > value`
    pub fn gt(self, value: impl IntoExpr) -> Predicate {
        compare(self.into(), Op::Gt, value)
    }
}

/// `AVG(field)`
pub fn avg(field: impl Into<String>) -> Aggregate {
    Aggregate::new(AggregateFn::Avg, field)
}

/// `SUM(field)`
pub fn sum(field: impl Into<String>) -> Aggregate {
    Aggregate::new(AggregateFn::Sum, field)
}

/// `COUNT(field)`
pub fn count(field: impl Into<String>) -> Aggregate {
    Aggregate::new(AggregateFn::Count, field)
}

/// `MAX(field)`
pub fn max(field: impl Into<String>) -> Aggregate {
    Aggregate::new(AggregateFn::Max, field)
}

/// `MIN(field)`
pub fn min(field: impl Into<String>) -> Aggregate {
    Aggregate::new(AggregateFn::Min, field)
}

/// A SQL fragment inserted verbatim, with its own positional arguments.
///
/// The caller keeps the `?` count in `sql` and `args` in step.
#[derive(Debug, Clone, PartialEq)]
pub struct RawExpr {
    sql: String,
    args: Vec<Value>,
}

/// Creates a raw fragment.
pub fn raw(sql: impl Into<String>, args: Vec<Value>) -> RawExpr {
    RawExpr {
        sql: sql.into(),
        args,
    }
}

impl RawExpr {
    /// The SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The arguments.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Uses the fragment as a condition.
    #[must_use]
    pub fn as_predicate(self) -> Predicate {
        Predicate::Raw(self)
    }
}

/// An entry of a select list.
#[derive(Debug, Clone, PartialEq)]
pub enum Selectable {
    /// A column, possibly aliased.
    Column(Column),
    /// An aggregate, possibly aliased.
    Aggregate(Aggregate),
    /// A raw fragment.
    Raw(RawExpr),
}

impl From<Column> for Selectable {
    fn from(c: Column) -> Self {
        Self::Column(c)
    }
}

impl From<Aggregate> for Selectable {
    fn from(a: Aggregate) -> Self {
        Self::Aggregate(a)
    }
}

impl From<RawExpr> for Selectable {
    fn from(r: RawExpr) -> Self {
        Self::Raw(r)
    }
}

/// `column = value` in an upsert clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    field: String,
    value: Expr,
}

/// Assigns `value` to `field` on conflict.
pub fn assign(field: impl Into<String>, value: impl IntoExpr) -> Assignment {
    Assignment {
        field: field.into(),
        value: value.into_expr(),
    }
}

impl Assignment {
    /// The assigned field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The assigned value.
    #[must_use]
    pub fn value(&self) -> &Expr {
        &self.value
    }
}

/// An entry of an upsert's update list.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignable {
    /// Take the value from the row that failed to insert.
    Column(Column),
    /// An explicit assignment.
    Assignment(Assignment),
}

impl From<Column> for Assignable {
    fn from(c: Column) -> Self {
        Self::Column(c)
    }
}

impl From<Assignment> for Assignable {
    fn from(a: Assignment) -> Self {
        Self::Assignment(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_comparisons() {
        let p = col("age").gt(18);
        assert_eq!(
            p,
            Predicate::Binary {
                left: Expr::Column(col("age")),
                op: Op::Gt,
                right: Expr::Value(Value::I32(18)),
            }
        );
    }

    #[test]
    fn test_logical_composition() {
        let p = col("age").gt(18).and(col("age").lt(35));
        match p {
            Predicate::Binary { left, op, right } => {
                assert_eq!(op, Op::And);
                assert!(matches!(left, Expr::Predicate(_)));
                assert!(matches!(right, Expr::Predicate(_)));
            }
            other => panic!("unexpected {other:?}"),
        }

        let n = not(col("id").eq(1_i64));
        assert!(matches!(n, Predicate::Not(_)));
    }

    #[test]
    fn test_aliases() {
        let c = col("first_name").as_("name");
        assert_eq!(c.alias(), Some("name"));
        let a = avg("age").as_("avg_age");
        assert_eq!(a.func(), AggregateFn::Avg);
        assert_eq!(a.alias(), Some("avg_age"));
        assert_eq!(count("id").func().as_str(), "COUNT");
    }

    #[test]
    fn test_operands() {
        assert_eq!("x".into_expr(), Expr::Value(Value::Text("x".into())));
        assert_eq!(None::<i64>.into_expr(), Expr::Value(Value::Null));
        assert!(matches!(col("a").into_expr(), Expr::Column(_)));
        assert_eq!(raw("1 = 1", vec![]).as_predicate(), Predicate::Raw(raw("1 = 1", vec![])));
    }

    #[test]
    fn test_assignments() {
        let a = assign("first_name", "Tom");
        assert_eq!(a.field(), "first_name");
        assert_eq!(a.value(), &Expr::Value(Value::Text("Tom".into())));
        assert!(matches!(Assignable::from(col("age")), Assignable::Column(_)));
        assert_eq!(Op::Not.to_string(), "NOT");
        assert_eq!(Expr::from(avg("age")).kind_name(), "aggregate");
    }
}
