//! SQL values and column types.
//!
//! [`Value`] is what travels between the ORM and a driver: statement
//! arguments on the way out, row cells on the way back. [`ColumnValue`] is
//! implemented for every field type an entity may declare and converts
//! between that type and [`Value`], coercing the loosely typed cells drivers
//! tend to return (numbers as text, text as bytes, and so on).
//!
//! # Example
//!
//! ```
//! use webframe_orm::{ColumnValue, Value};
//!
//! let age = i8::from_value(Value::Text("18".to_string())).unwrap();
//! assert_eq!(age, 18);
//!
//! let nick: Option<String> = ColumnValue::from_value(Value::Null).unwrap();
//! assert_eq!(nick, None);
//! ```

use std::fmt;

/// A single SQL argument or result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// Boolean.
    Bool(bool),
    /// 8-bit signed integer.
    I8(i8),
    /// 16-bit signed integer.
    I16(i16),
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit signed integer.
    I64(i64),
    /// 8-bit unsigned integer.
    U8(u8),
    /// 16-bit unsigned integer.
    U16(u16),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 64-bit unsigned integer.
    U64(u64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl Value {
    /// Short name of the variant, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Text,
    Vec<u8> => Bytes,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// The scalar part of a [`ColumnType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `bool`
    Bool,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `String`
    Text,
    /// `Vec<u8>`
    Bytes,
}

impl ScalarKind {
    fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Text => "text",
            Self::Bytes => "bytes",
        }
    }
}

/// The declared type of an entity field: a scalar, optionally nullable
/// (`Option<_>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnType {
    kind: ScalarKind,
    nullable: bool,
}

impl ColumnType {
    /// A non-nullable column of `kind`.
    #[must_use]
    pub const fn new(kind: ScalarKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    /// The nullable variant of this column type.
    #[must_use]
    pub const fn nullable(self) -> Self {
        Self {
            kind: self.kind,
            nullable: true,
        }
    }

    /// The scalar kind.
    #[must_use]
    pub const fn kind(self) -> ScalarKind {
        self.kind
    }

    /// Whether the field is an `Option`.
    #[must_use]
    pub const fn is_nullable(self) -> bool {
        self.nullable
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "nullable {}", self.kind.name())
        } else {
            f.write_str(self.kind.name())
        }
    }
}

/// A [`Value`] that does not fit a field's [`ColumnType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionError {
    expected: ColumnType,
    found: &'static str,
}

impl ConversionError {
    /// Creates a conversion error.
    #[must_use]
    pub fn new(expected: ColumnType, found: &'static str) -> Self {
        Self { expected, found }
    }

    /// The field's declared type.
    #[must_use]
    pub fn expected(&self) -> ColumnType {
        self.expected
    }

    /// The offending value's type name.
    #[must_use]
    pub fn found(&self) -> &'static str {
        self.found
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.found)
    }
}

impl std::error::Error for ConversionError {}

mod sealed {
    pub trait Sealed {}
}

/// A Rust type an entity field may have.
///
/// Sealed: the raw-offset accessor relies on [`ColumnValue::COLUMN_TYPE`]
/// naming the exact Rust type of the field.
pub trait ColumnValue: sealed::Sealed + Sized + Send + Sync + 'static {
    /// The column type this Rust type maps to.
    const COLUMN_TYPE: ColumnType;

    /// Converts the field into an argument value.
    fn to_value(&self) -> Value;

    /// Converts a driver value into the field type.
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

/// Non-nullable column types; `Option<T>` is implemented for these only.
pub trait ScalarValue: ColumnValue {}

fn text_of(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes).ok()
}

macro_rules! int_column {
    ($($t:ty => $kind:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}
            impl ScalarValue for $t {}

            impl ColumnValue for $t {
                const COLUMN_TYPE: ColumnType = ColumnType::new(ScalarKind::$kind);

                fn to_value(&self) -> Value {
                    Value::$kind(*self)
                }

                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    let fail = || ConversionError::new(Self::COLUMN_TYPE, value.type_name());
                    match &value {
                        Value::Bool(v) => Ok(<$t>::from(*v)),
                        Value::I8(v) => <$t>::try_from(*v).map_err(|_| fail()),
                        Value::I16(v) => <$t>::try_from(*v).map_err(|_| fail()),
                        Value::I32(v) => <$t>::try_from(*v).map_err(|_| fail()),
                        Value::I64(v) => <$t>::try_from(*v).map_err(|_| fail()),
                        Value::U8(v) => <$t>::try_from(*v).map_err(|_| fail()),
                        Value::U16(v) => <$t>::try_from(*v).map_err(|_| fail()),
                        Value::U32(v) => <$t>::try_from(*v).map_err(|_| fail()),
                        Value::U64(v) => <$t>::try_from(*v).map_err(|_| fail()),
                        Value::Text(s) => s.trim().parse().map_err(|_| fail()),
                        Value::Bytes(b) => text_of(b)
                            .and_then(|s| s.trim().parse().ok())
                            .ok_or_else(fail),
                        _ => Err(fail()),
                    }
                }
            }
        )*
    };
}

int_column! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
}

macro_rules! float_column {
    ($($t:ty => $kind:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}
            impl ScalarValue for $t {}

            impl ColumnValue for $t {
                const COLUMN_TYPE: ColumnType = ColumnType::new(ScalarKind::$kind);

                fn to_value(&self) -> Value {
                    Value::$kind(*self)
                }

                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    let fail = || ConversionError::new(Self::COLUMN_TYPE, value.type_name());
                    match &value {
                        Value::F32(v) => Ok(*v as $t),
                        Value::F64(v) => Ok(*v as $t),
                        Value::I8(v) => Ok(*v as $t),
                        Value::I16(v) => Ok(*v as $t),
                        Value::I32(v) => Ok(*v as $t),
                        Value::I64(v) => Ok(*v as $t),
                        Value::U8(v) => Ok(*v as $t),
                        Value::U16(v) => Ok(*v as $t),
                        Value::U32(v) => Ok(*v as $t),
                        Value::U64(v) => Ok(*v as $t),
                        Value::Text(s) => s.trim().parse().map_err(|_| fail()),
                        Value::Bytes(b) => text_of(b)
                            .and_then(|s| s.trim().parse().ok())
                            .ok_or_else(fail),
                        _ => Err(fail()),
                    }
                }
            }
        )*
    };
}

float_column! {
    f32 => F32,
    f64 => F64,
}

impl sealed::Sealed for bool {}
impl ScalarValue for bool {}

impl ColumnValue for bool {
    const COLUMN_TYPE: ColumnType = ColumnType::new(ScalarKind::Bool);

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        let fail = || ConversionError::new(Self::COLUMN_TYPE, value.type_name());
        match &value {
            Value::Bool(v) => Ok(*v),
            Value::I8(v) => Ok(*v != 0),
            Value::I16(v) => Ok(*v != 0),
            Value::I32(v) => Ok(*v != 0),
            Value::I64(v) => Ok(*v != 0),
            Value::U8(v) => Ok(*v != 0),
            Value::U16(v) => Ok(*v != 0),
            Value::U32(v) => Ok(*v != 0),
            Value::U64(v) => Ok(*v != 0),
            Value::Text(s) => parse_bool(s).ok_or_else(fail),
            Value::Bytes(b) => text_of(b).and_then(parse_bool).ok_or_else(fail),
            _ => Err(fail()),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "1" | "true" | "TRUE" | "t" => Some(true),
        "0" | "false" | "FALSE" | "f" => Some(false),
        _ => None,
    }
}

impl sealed::Sealed for String {}
impl ScalarValue for String {}

impl ColumnValue for String {
    const COLUMN_TYPE: ColumnType = ColumnType::new(ScalarKind::Text);

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Bytes(b) => String::from_utf8(b)
                .map_err(|_| ConversionError::new(Self::COLUMN_TYPE, "bytes")),
            Value::Null => Err(ConversionError::new(Self::COLUMN_TYPE, "null")),
            other => Ok(other.to_string()),
        }
    }
}

impl sealed::Sealed for Vec<u8> {}
impl ScalarValue for Vec<u8> {}

impl ColumnValue for Vec<u8> {
    const COLUMN_TYPE: ColumnType = ColumnType::new(ScalarKind::Bytes);

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(ConversionError::new(Self::COLUMN_TYPE, other.type_name())),
        }
    }
}

impl<T: ScalarValue> sealed::Sealed for Option<T> {}

impl<T: ScalarValue> ColumnValue for Option<T> {
    const COLUMN_TYPE: ColumnType = T::COLUMN_TYPE.nullable();

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ColumnValue::to_value)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_value(value)
            .map(Some)
            .map_err(|e| ConversionError::new(Self::COLUMN_TYPE, e.found()))
    }
}
