use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::model::Model;
use crate::session::Row;
use crate::value::Value;

use super::{resolve_row, ValueAccessor};

/// Accessor built on the entity's generated `field`/`set_field` methods.
pub struct ReflectValue<'a, T> {
    entity: &'a mut T,
    model: &'a Model,
}

impl<'a, T: Entity> ReflectValue<'a, T> {
    /// Wraps `entity`, described by `model`.
    pub fn new(entity: &'a mut T, model: &'a Model) -> Self {
        Self { entity, model }
    }
}

impl<T: Entity> ValueAccessor for ReflectValue<'_, T> {
    fn field(&self, name: &str) -> OrmResult<Value> {
        self.entity
            .field(name)
            .ok_or_else(|| OrmError::unknown_field(name))
    }

    fn set_columns(&mut self, row: Row<'_>) -> OrmResult<()> {
        // Convert every cell before touching the entity, so a bad cell
        // leaves it unchanged.
        let mut staged = T::default();
        let cells = resolve_row(self.model, row)?;
        for (field, value) in &cells {
            staged.set_field(field.name(), value.clone())?;
        }
        for (field, _) in &cells {
            let value = staged
                .field(field.name())
                .ok_or_else(|| OrmError::unknown_field(field.name()))?;
            self.entity.set_field(field.name(), value)?;
        }
        Ok(())
    }
}
