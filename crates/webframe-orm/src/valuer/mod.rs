//! Field access strategies.
//!
//! Statement builders read entity fields to bind insert arguments, and
//! result rows are written back into fresh entities. Both go through
//! [`ValueAccessor`], which has two implementations:
//!
//! - [`ReflectValue`] uses the `field`/`set_field` methods generated by
//!   [`entity!`](crate::entity!). It is the default.
//! - [`UnsafeValue`] reads and writes fields in place through the byte
//!   offsets recorded in the [`Model`](crate::Model). It skips the name
//!   dispatch and is only enabled through an explicit unsafe opt-in.

mod raw;
mod reflect;

use serde::Deserialize;

use crate::error::{OrmError, OrmResult};
use crate::model::{Field, Model};
use crate::session::Row;
use crate::value::Value;

pub use raw::UnsafeValue;
pub use reflect::ReflectValue;

/// Reads and writes the fields of one entity instance.
pub trait ValueAccessor {
    /// Reads the field with Rust name `name`.
    fn field(&self, name: &str) -> OrmResult<Value>;

    /// Writes every cell of `row` into the field mapped to its column.
    ///
    /// # Errors
    ///
    /// - [`OrmError::TooManyReturnedColumns`] if the row is wider than the
    ///   model.
    /// - [`OrmError::UnknownColumn`] for a column no field maps to.
    /// - [`OrmError::ValueConversion`] if a cell does not fit its field.
    fn set_columns(&mut self, row: Row<'_>) -> OrmResult<()>;
}

/// Which accessor a [`Db`](crate::Db) uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValuerKind {
    /// [`ReflectValue`]
    #[default]
    Reflect,
    /// [`UnsafeValue`]
    Unsafe,
}

/// Resolves the fields of `row` against `model`, checking width and
/// column names before anything is written.
fn resolve_row<'m>(model: &'m Model, row: Row<'_>) -> OrmResult<Vec<(&'m Field, Value)>> {
    if row.columns().len() > model.fields().len() {
        return Err(OrmError::TooManyReturnedColumns);
    }
    row.cells()
        .map(|(column, value)| {
            model
                .field_by_column(column)
                .map(|field| (field, value))
                .ok_or_else(|| OrmError::unknown_column(column))
        })
        .collect()
}
