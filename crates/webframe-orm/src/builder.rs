//! Statement compilation.
//!
//! Every builder compiles through one [`SqlBuilder`]: a text buffer plus the
//! argument list, bound to the model that resolves field names and the
//! dialect that supplies the quote character. Compiling an expression only
//! ever appends to those two buffers.

use std::sync::Arc;

use tracing::trace;

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expr::{Aggregate, Column, Expr, Predicate, RawExpr, Selectable};
use crate::model::Model;
use crate::value::Value;

/// A compiled statement: SQL text ending in `;` and one argument per `?`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// SQL text.
    pub sql: String,
    /// Positional arguments.
    pub args: Vec<Value>,
}

/// A statement that can be compiled.
pub trait QueryBuilder: Send {
    /// Compiles the statement.
    fn build(&mut self) -> OrmResult<Query>;

    /// The model the statement targets.
    fn model(&self) -> OrmResult<Arc<Model>>;
}

/// Where an expression is being compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    /// A `WHERE` condition: aggregates are rejected.
    Where,
    /// A `HAVING` condition: aggregates are allowed, without alias.
    Having,
}

/// SQL text accumulator shared by the statement builders and dialects.
pub struct SqlBuilder<'m> {
    sql: String,
    args: Vec<Value>,
    quote: char,
    model: &'m Model,
}

impl<'m> SqlBuilder<'m> {
    /// Starts an empty statement for `model`.
    pub fn new(model: &'m Model, dialect: &dyn Dialect) -> Self {
        Self {
            sql: String::with_capacity(64),
            args: Vec::new(),
            quote: dialect.quote_char(),
            model,
        }
    }

    /// The model field names resolve against.
    #[must_use]
    pub fn model(&self) -> &'m Model {
        self.model
    }

    /// Appends raw text.
    pub fn push_str(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    /// Appends one character.
    pub fn push_char(&mut self, c: char) {
        self.sql.push(c);
    }

    /// Appends a `?` placeholder bound to `value`.
    pub fn push_arg(&mut self, value: Value) {
        self.sql.push('?');
        self.args.push(value);
    }

    /// Appends `name` wrapped in the dialect's quote character.
    pub fn quote(&mut self, name: &str) {
        self.sql.push(self.quote);
        self.sql.push_str(name);
        self.sql.push(self.quote);
    }

    /// Appends the quoted column of the field `name`.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::UnknownField`] if the model has no such field.
    pub fn column(&mut self, name: &str) -> OrmResult<()> {
        let model = self.model;
        let field = model.require_field(name)?;
        self.quote(field.column());
        Ok(())
    }

    fn alias(&mut self, alias: Option<&str>) {
        if let Some(alias) = alias {
            self.sql.push_str(" AS ");
            self.quote(alias);
        }
    }

    /// Appends a raw fragment and its arguments.
    pub fn raw(&mut self, raw: &RawExpr) {
        self.sql.push_str(raw.sql());
        self.args.extend_from_slice(raw.args());
    }

    fn aggregate(&mut self, agg: &Aggregate) -> OrmResult<()> {
        self.sql.push_str(agg.func().as_str());
        self.sql.push('(');
        self.column(agg.field())?;
        self.sql.push(')');
        Ok(())
    }

    /// Appends one select-list entry, with its alias.
    pub fn selectable(&mut self, item: &Selectable) -> OrmResult<()> {
        match item {
            Selectable::Column(c) => {
                self.column(c.name())?;
                self.alias(c.alias());
            }
            Selectable::Aggregate(a) => {
                self.aggregate(a)?;
                self.alias(a.alias());
            }
            Selectable::Raw(r) => self.raw(r),
        }
        Ok(())
    }

    /// Appends a comma separated list of columns, without aliases.
    pub fn columns(&mut self, columns: &[Column]) -> OrmResult<()> {
        for (i, c) in columns.iter().enumerate() {
            if i > 0 {
                self.sql.push(',');
            }
            self.column(c.name())?;
        }
        Ok(())
    }

    /// Appends an operand.
    pub fn expr(&mut self, expr: &Expr, clause: Clause) -> OrmResult<()> {
        match expr {
            Expr::Column(c) => self.column(c.name()),
            Expr::Value(v) => {
                self.push_arg(v.clone());
                Ok(())
            }
            Expr::Predicate(p) => self.predicate(p, clause),
            Expr::Aggregate(a) => match clause {
                Clause::Having => self.aggregate(a),
                Clause::Where => Err(OrmError::UnsupportedExpressionType(format!(
                    "{}({}) in WHERE",
                    a.func().as_str(),
                    a.field()
                ))),
            },
            Expr::Raw(r) => {
                self.raw(r);
                Ok(())
            }
        }
    }

    fn operand(&mut self, expr: &Expr, clause: Clause) -> OrmResult<()> {
        if let Expr::Predicate(p) = expr {
            self.sql.push('(');
            self.predicate(p, clause)?;
            self.sql.push(')');
            Ok(())
        } else {
            self.expr(expr, clause)
        }
    }

    /// Appends a condition. Predicate operands are parenthesized; `NOT`
    /// keeps an empty left side, so it renders as ` NOT (..)`.
    pub fn predicate(&mut self, p: &Predicate, clause: Clause) -> OrmResult<()> {
        match p {
            Predicate::Binary { left, op, right } => {
                self.operand(left, clause)?;
                self.sql.push(' ');
                self.sql.push_str(op.as_str());
                self.sql.push(' ');
                self.operand(right, clause)
            }
            Predicate::Not(inner) => {
                self.sql.push_str(" NOT (");
                self.predicate(inner, clause)?;
                self.sql.push(')');
                Ok(())
            }
            Predicate::Raw(r) => {
                self.raw(r);
                Ok(())
            }
        }
    }

    /// Appends `ps` chained with `AND` from the left:
    /// `((p0) AND (p1)) AND (p2)`.
    pub fn predicates(&mut self, ps: &[Predicate], clause: Clause) -> OrmResult<()> {
        match ps.split_last() {
            None => Ok(()),
            Some((only, [])) => self.predicate(only, clause),
            Some((last, init)) => {
                self.sql.push('(');
                self.predicates(init, clause)?;
                self.sql.push_str(") AND (");
                self.predicate(last, clause)?;
                self.sql.push(')');
                Ok(())
            }
        }
    }

    /// Terminates the statement with `;`.
    #[must_use]
    pub fn finish(mut self) -> Query {
        self.sql.push(';');
        trace!(sql = %self.sql, args = self.args.len(), "compiled statement");
        Query {
            sql: self.sql,
            args: self.args,
        }
    }
}
