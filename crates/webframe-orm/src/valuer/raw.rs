#![allow(unsafe_code)]

use std::any::TypeId;
use std::marker::PhantomData;
use std::mem::size_of;
use std::ptr::NonNull;

use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::model::{Field, Model};
use crate::session::Row;
use crate::value::{ColumnType, ColumnValue, ConversionError, ScalarKind, Value};

use super::{resolve_row, ValueAccessor};

/// Runs `$body` with `$t` bound to the Rust type of `$column_type`.
macro_rules! with_rust_type {
    ($column_type:expr, $t:ident => $body:expr) => {{
        let column_type: ColumnType = $column_type;
        match (column_type.kind(), column_type.is_nullable()) {
            (ScalarKind::Bool, false) => { type $t = bool; $body }
            (ScalarKind::Bool, true) => { type $t = Option<bool>; $body }
            (ScalarKind::I8, false) => { type $t = i8; $body }
            (ScalarKind::I8, true) => { type $t = Option<i8>; $body }
            (ScalarKind::I16, false) => { type $t = i16; $body }
            (ScalarKind::I16, true) => { type $t = Option<i16>; $body }
            (ScalarKind::I32, false) => { type $t = i32; $body }
            (ScalarKind::I32, true) => { type $t = Option<i32>; $body }
            (ScalarKind::I64, false) => { type $t = i64; $body }
            (ScalarKind::I64, true) => { type $t = Option<i64>; $body }
            (ScalarKind::U8, false) => { type $t = u8; $body }
            (ScalarKind::U8, true) => { type $t = Option<u8>; $body }
            (ScalarKind::U16, false) => { type $t = u16; $body }
            (ScalarKind::U16, true) => { type $t = Option<u16>; $body }
            (ScalarKind::U32, false) => { type $t = u32; $body }
            (ScalarKind::U32, true) => { type $t = Option<u32>; $body }
            (ScalarKind::U64, false) => { type $t = u64; $body }
            (ScalarKind::U64, true) => { type $t = Option<u64>; $body }
            (ScalarKind::F32, false) => { type $t = f32; $body }
            (ScalarKind::F32, true) => { type $t = Option<f32>; $body }
            (ScalarKind::F64, false) => { type $t = f64; $body }
            (ScalarKind::F64, true) => { type $t = Option<f64>; $body }
            (ScalarKind::Text, false) => { type $t = String; $body }
            (ScalarKind::Text, true) => { type $t = Option<String>; $body }
            (ScalarKind::Bytes, false) => { type $t = Vec<u8>; $body }
            (ScalarKind::Bytes, true) => { type $t = Option<Vec<u8>>; $body }
        }
    }};
}

fn slot_size(column_type: ColumnType) -> usize {
    with_rust_type!(column_type, T => size_of::<T>())
}

/// Accessor that reads and writes fields in place at their recorded byte
/// offsets.
pub struct UnsafeValue<'a, T> {
    base: NonNull<T>,
    model: &'a Model,
    _entity: PhantomData<&'a mut T>,
}

impl<'a, T: Entity> UnsafeValue<'a, T> {
    /// Wraps `entity`, described by `model`.
    ///
    /// Fails with [`OrmError::LayoutMismatch`] if `model` was built for a
    /// different type or records a field that does not fit inside `T`.
    ///
    /// # Safety
    ///
    /// - Every field of `model` must describe a field of `T` located at the
    ///   recorded offset and having exactly the Rust type named by its
    ///   column type.
    /// - Models built from descriptors generated by `entity!` satisfy this.
    ///   Hand-written [`Entity`] implementations must report offsets with
    ///   `offset_of!`.
    pub unsafe fn new(entity: &'a mut T, model: &'a Model) -> OrmResult<Self> {
        if model.type_id() != TypeId::of::<T>() {
            return Err(OrmError::LayoutMismatch(format!(
                "model of {} used for {}",
                model.type_name(),
                T::type_name()
            )));
        }
        for field in model.fields() {
            let end = field.offset() + slot_size(field.column_type());
            if end > size_of::<T>() {
                return Err(OrmError::LayoutMismatch(format!(
                    "field {} ends at byte {end}, past the {} byte struct",
                    field.name(),
                    size_of::<T>()
                )));
            }
        }
        Ok(Self {
            base: NonNull::from(entity),
            model,
            _entity: PhantomData,
        })
    }

    fn slot(&self, field: &Field) -> *mut u8 {
        self.base.as_ptr().cast::<u8>().wrapping_add(field.offset())
    }
}

/// # Safety
///
/// `slot` must point to an initialized value of the type named by
/// `column_type`.
unsafe fn read_slot(slot: *const u8, column_type: ColumnType) -> Value {
    with_rust_type!(column_type, T => (*slot.cast::<T>()).to_value())
}

/// A cell converted to its field's Rust type, waiting to be written.
struct Staged(Box<dyn FnOnce(*mut u8)>);

impl Staged {
    fn convert(column_type: ColumnType, value: Value) -> Result<Self, ConversionError> {
        with_rust_type!(column_type, T => {
            let converted = T::from_value(value)?;
            // SAFETY: upheld by the caller of `write`.
            Ok(Self(Box::new(move |slot: *mut u8| unsafe { *slot.cast::<T>() = converted })))
        })
    }

    /// # Safety
    ///
    /// `slot` must point to an initialized value of the column type this
    /// was converted for, with no other live reference to it.
    unsafe fn write(self, slot: *mut u8) {
        (self.0)(slot);
    }
}

impl<T: Entity> ValueAccessor for UnsafeValue<'_, T> {
    fn field(&self, name: &str) -> OrmResult<Value> {
        let field = self.model.require_field(name)?;
        // SAFETY: `new` checked the model belongs to `T` and the slot lies
        // inside the struct; its caller vouched for the field types.
        Ok(unsafe { read_slot(self.slot(field), field.column_type()) })
    }

    fn set_columns(&mut self, row: Row<'_>) -> OrmResult<()> {
        // Every cell is converted before the first write.
        let staged = resolve_row(self.model, row)?
            .into_iter()
            .map(|(field, value)| {
                Staged::convert(field.column_type(), value)
                    .map(|staged| (field, staged))
                    .map_err(|e| OrmError::conversion(field.column(), e))
            })
            .collect::<OrmResult<Vec<_>>>()?;
        for (field, value) in staged {
            // SAFETY: as in `field`; `self` holds the only borrow of the
            // entity for `'a`.
            unsafe { value.write(self.slot(field)) };
        }
        Ok(())
    }
}
