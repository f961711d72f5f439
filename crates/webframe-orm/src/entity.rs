//! Entity descriptors.
//!
//! An [`Entity`] describes its own fields instead of being reflected over at
//! runtime. The [`entity!`](crate::entity!) macro declares the struct and
//! generates the descriptor table in one go:
//!
//! ```
//! use webframe_orm::{entity, Entity, Value};
//!
//! entity! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct User as "users" {
//!         pub id: i64,
//!         #[orm = "column=nick"]
//!         pub nick_name: String,
//!         pub age: Option<i8>,
//!     }
//! }
//!
//! assert_eq!(User::table_name(), Some("users"));
//! assert_eq!(User::fields()[1].tag, Some("column=nick"));
//!
//! let mut user = User::default();
//! user.set_field("age", Value::I64(30)).unwrap();
//! assert_eq!(user.field("age"), Some(Value::I8(30)));
//! ```
//!
//! The macro derives `Default` for the struct. Field attributes other than
//! `#[orm = ".."]` are passed through unchanged.

use crate::error::OrmResult;
use crate::value::{ColumnType, Value};

/// Whether an entity type is a plain struct or an indirection to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A struct whose fields live inline.
    Struct,
    /// A pointer-like wrapper such as `Box<T>`. Models cannot be built for
    /// these.
    Indirect,
}

/// Static description of one entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Rust field name.
    pub name: &'static str,
    /// Raw content of the `#[orm = ".."]` attribute.
    pub tag: Option<&'static str>,
    /// Declared type.
    pub column_type: ColumnType,
    /// Byte offset of the field within the struct.
    pub offset: usize,
}

/// A struct that maps to a table.
///
/// Normally implemented through [`entity!`](crate::entity!).
pub trait Entity: Default + Send + Sync + 'static {
    /// The type's name, used for table name derivation.
    fn type_name() -> &'static str;

    /// A declared table name, if any.
    fn table_name() -> Option<&'static str> {
        None
    }

    /// Whether the type is a plain struct.
    fn kind() -> EntityKind {
        EntityKind::Struct
    }

    /// Field descriptors in declaration order.
    fn fields() -> Vec<FieldDescriptor>;

    /// Reads a field by Rust name.
    fn field(&self, name: &str) -> Option<Value>;

    /// Writes a field by Rust name, converting `value` to the field's type.
    fn set_field(&mut self, name: &str, value: Value) -> OrmResult<()>;
}

impl<T: Entity> Entity for Box<T> {
    fn type_name() -> &'static str {
        T::type_name()
    }

    fn kind() -> EntityKind {
        EntityKind::Indirect
    }

    fn fields() -> Vec<FieldDescriptor> {
        T::fields()
    }

    fn field(&self, name: &str) -> Option<Value> {
        (**self).field(name)
    }

    fn set_field(&mut self, name: &str, value: Value) -> OrmResult<()> {
        (**self).set_field(name, value)
    }
}

/// Declares a struct together with its [`Entity`] implementation.
///
/// `struct Name as "table"` declares the table name; `#[orm = "column=x"]`
/// on a field overrides its column name. See the [module docs](crate::entity)
/// for an example.
#[macro_export]
macro_rules! entity {
    (@opt) => {
        ::core::option::Option::None
    };
    (@opt $value:literal) => {
        ::core::option::Option::Some($value)
    };

    // All fields consumed: emit the struct and the impl.
    (@fields
        meta: [$($meta:tt)*]
        vis: [$($vis:tt)*]
        name: $name:ident
        table: [$($table:literal)?]
        done: [$({
            attrs: [$($fattr:tt)*]
            tag: [$($ftag:literal)?]
            vis: [$($fvis:tt)*]
            field: $field:ident
            ty: $fty:ty
        })*]
        attrs: []
        tag: []
        rest: []
    ) => {
        $($meta)*
        #[derive(Default)]
        $($vis)* struct $name {
            $($($fattr)* $($fvis)* $field: $fty,)*
        }

        impl $crate::Entity for $name {
            fn type_name() -> &'static str {
                ::core::stringify!($name)
            }

            fn table_name() -> ::core::option::Option<&'static str> {
                $crate::entity!(@opt $($table)?)
            }

            fn fields() -> ::std::vec::Vec<$crate::FieldDescriptor> {
                ::std::vec![$(
                    $crate::FieldDescriptor {
                        name: ::core::stringify!($field),
                        tag: $crate::entity!(@opt $($ftag)?),
                        column_type: <$fty as $crate::ColumnValue>::COLUMN_TYPE,
                        offset: ::core::mem::offset_of!($name, $field),
                    },
                )*]
            }

            fn field(&self, name: &str) -> ::core::option::Option<$crate::Value> {
                match name {
                    $(::core::stringify!($field) => ::core::option::Option::Some(
                        $crate::ColumnValue::to_value(&self.$field),
                    ),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn set_field(&mut self, name: &str, value: $crate::Value) -> $crate::OrmResult<()> {
                match name {
                    $(::core::stringify!($field) => {
                        self.$field = <$fty as $crate::ColumnValue>::from_value(value)
                            .map_err(|e| $crate::OrmError::conversion(name, e))?;
                        ::core::result::Result::Ok(())
                    })*
                    _ => {
                        let _ = value;
                        ::core::result::Result::Err($crate::OrmError::unknown_field(name))
                    }
                }
            }
        }
    };

    // Field tag.
    (@fields
        meta: $meta:tt vis: $vis:tt name: $name:ident table: $table:tt done: $done:tt
        attrs: $attrs:tt
        tag: []
        rest: [#[orm = $tag:literal] $($rest:tt)*]
    ) => {
        $crate::entity!(@fields
            meta: $meta vis: $vis name: $name table: $table done: $done
            attrs: $attrs
            tag: [$tag]
            rest: [$($rest)*]
        );
    };

    // Any other field attribute, kept on the field.
    (@fields
        meta: $meta:tt vis: $vis:tt name: $name:ident table: $table:tt done: $done:tt
        attrs: [$($attrs:tt)*]
        tag: $tag:tt
        rest: [#[$($attr:tt)*] $($rest:tt)*]
    ) => {
        $crate::entity!(@fields
            meta: $meta vis: $vis name: $name table: $table done: $done
            attrs: [$($attrs)* #[$($attr)*]]
            tag: $tag
            rest: [$($rest)*]
        );
    };

    // A field followed by more fields.
    (@fields
        meta: $meta:tt vis: $vis:tt name: $name:ident table: $table:tt done: [$($done:tt)*]
        attrs: $attrs:tt
        tag: $tag:tt
        rest: [$fvis:vis $field:ident : $fty:ty , $($rest:tt)*]
    ) => {
        $crate::entity!(@fields
            meta: $meta vis: $vis name: $name table: $table
            done: [$($done)* {
                attrs: $attrs
                tag: $tag
                vis: [$fvis]
                field: $field
                ty: $fty
            }]
            attrs: []
            tag: []
            rest: [$($rest)*]
        );
    };

    // The last field, without a trailing comma.
    (@fields
        meta: $meta:tt vis: $vis:tt name: $name:ident table: $table:tt done: [$($done:tt)*]
        attrs: $attrs:tt
        tag: $tag:tt
        rest: [$fvis:vis $field:ident : $fty:ty]
    ) => {
        $crate::entity!(@fields
            meta: $meta vis: $vis name: $name table: $table
            done: [$($done)* {
                attrs: $attrs
                tag: $tag
                vis: [$fvis]
                field: $field
                ty: $fty
            }]
            attrs: []
            tag: []
            rest: []
        );
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(as $table:literal)? {
            $($body:tt)*
        }
    ) => {
        $crate::entity!(@fields
            meta: [$(#[$meta])*]
            vis: [$vis]
            name: $name
            table: [$($table)?]
            done: []
            attrs: []
            tag: []
            rest: [$($body)*]
        );
    };
}
