//! Table models.
//!
//! A [`Model`] is the schema view of one [`Entity`] type: its table name and
//! an ordered list of fields, each mapped to a column. Models are built by
//! the [`Registry`](crate::Registry) and never change once cached.

use std::any::TypeId;
use std::fmt;

use indexmap::IndexMap;

use crate::entity::{Entity, EntityKind};
use crate::error::{OrmError, OrmResult};
use crate::value::ColumnType;

/// Tag key that overrides a field's column name.
const TAG_COLUMN: &str = "column";

/// One mapped field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: &'static str,
    column: String,
    column_type: ColumnType,
    offset: usize,
}

impl Field {
    /// Rust field name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Column name.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Declared type.
    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Byte offset within the entity struct.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Schema description of an entity type.
#[derive(Clone)]
pub struct Model {
    type_id: TypeId,
    type_name: &'static str,
    size: usize,
    table_name: String,
    fields: Vec<Field>,
    by_field: IndexMap<&'static str, usize>,
    by_column: IndexMap<String, usize>,
}

impl Model {
    /// Builds the model for `T` from its descriptors.
    ///
    /// # Errors
    ///
    /// - [`OrmError::PointerOnly`] if `T` is not a plain struct.
    /// - [`OrmError::InvalidTagContent`] for a malformed field tag.
    /// - [`OrmError::DuplicateColumn`] if two fields map to one column.
    pub fn parse<T: Entity>() -> OrmResult<Self> {
        if T::kind() != EntityKind::Struct {
            return Err(OrmError::PointerOnly);
        }

        let descriptors = T::fields();
        let mut fields = Vec::with_capacity(descriptors.len());
        let mut by_field = IndexMap::with_capacity(descriptors.len());
        for (idx, desc) in descriptors.into_iter().enumerate() {
            let column = match desc.tag {
                Some(tag) => parse_tag(tag)?
                    .remove(TAG_COLUMN)
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| underscore_name(desc.name)),
                None => underscore_name(desc.name),
            };
            by_field.insert(desc.name, idx);
            fields.push(Field {
                name: desc.name,
                column,
                column_type: desc.column_type,
                offset: desc.offset,
            });
        }

        let table_name = T::table_name()
            .filter(|t| !t.is_empty())
            .map_or_else(|| underscore_name(T::type_name()), ToString::to_string);

        let mut model = Self {
            type_id: TypeId::of::<T>(),
            type_name: T::type_name(),
            size: std::mem::size_of::<T>(),
            table_name,
            fields,
            by_field,
            by_column: IndexMap::new(),
        };
        model.index_columns()?;
        Ok(model)
    }

    fn index_columns(&mut self) -> OrmResult<()> {
        let mut by_column = IndexMap::with_capacity(self.fields.len());
        for (idx, field) in self.fields.iter().enumerate() {
            if by_column.insert(field.column.clone(), idx).is_some() {
                return Err(OrmError::DuplicateColumn(field.column.clone()));
            }
        }
        self.by_column = by_column;
        Ok(())
    }

    /// The table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The entity's type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The entity's type identity.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Size in bytes of the entity struct.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Looks up a field by Rust name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.by_field.get(name).map(|&idx| &self.fields[idx])
    }

    /// Looks up a field by column name.
    #[must_use]
    pub fn field_by_column(&self, column: &str) -> Option<&Field> {
        self.by_column.get(column).map(|&idx| &self.fields[idx])
    }

    /// Looks up a field, failing with [`OrmError::UnknownField`].
    pub fn require_field(&self, name: &str) -> OrmResult<&Field> {
        self.field(name).ok_or_else(|| OrmError::unknown_field(name))
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("type_name", &self.type_name)
            .field("table_name", &self.table_name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// A registration option, applied to a freshly parsed [`Model`].
pub struct ModelOption(Box<dyn FnOnce(&mut Model) -> OrmResult<()> + Send>);

impl ModelOption {
    /// Wraps an arbitrary adjustment.
    pub fn new(f: impl FnOnce(&mut Model) -> OrmResult<()> + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub(crate) fn apply(self, model: &mut Model) -> OrmResult<()> {
        (self.0)(model)
    }
}

impl fmt::Debug for ModelOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelOption").finish_non_exhaustive()
    }
}

/// Overrides the table name.
pub fn with_table_name(name: impl Into<String>) -> ModelOption {
    let name = name.into();
    ModelOption::new(move |model| {
        model.table_name = name;
        Ok(())
    })
}

/// Overrides the column name of one field.
///
/// Fails with [`OrmError::UnknownField`] when applied to a model without
/// that field.
pub fn with_column_name(field: impl Into<String>, column: impl Into<String>) -> ModelOption {
    let (field, column) = (field.into(), column.into());
    ModelOption::new(move |model| {
        let idx = *model
            .by_field
            .get(field.as_str())
            .ok_or_else(|| OrmError::UnknownField(field.clone()))?;
        model.fields[idx].column = column;
        model.index_columns()
    })
}

/// Converts a camel-case name to snake case.
///
/// Every uppercase ASCII letter after the first character gets its own
/// leading underscore, so runs of capitals are split letter by letter.
///
/// ```
/// use webframe_orm::underscore_name;
///
/// assert_eq!(underscore_name("FirstName"), "first_name");
/// assert_eq!(underscore_name("ID"), "i_d");
/// assert_eq!(underscore_name("Table1Name"), "table1_name");
/// ```
#[must_use]
pub fn underscore_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Splits `key=value[,key=value...]` into a map.
fn parse_tag(tag: &str) -> OrmResult<IndexMap<String, String>> {
    let mut pairs = IndexMap::new();
    for pair in tag.split(',') {
        let parts: Vec<&str> = pair.split('=').collect();
        if parts.len() != 2 {
            return Err(OrmError::InvalidTagContent(pair.to_string()));
        }
        pairs.insert(parts[0].trim().to_string(), parts[1].trim().to_string());
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ColumnValue, Value};

    crate::entity! {
        pub struct TestModel {
            pub id: i64,
            pub first_name: String,
            pub age: i8,
            pub last_name: Option<String>,
        }
    }

    crate::entity! {
        pub struct CustomTable as "custom_table_name_t" {
            #[orm = "column=nick"]
            pub name: String,
        }
    }

    crate::entity! {
        pub struct BadTag {
            #[orm = "abc==abc"]
            pub id: i64,
        }
    }

    crate::entity! {
        pub struct Clash {
            pub user_id: i64,
            #[orm = "column=user_id"]
            pub owner: i64,
        }
    }

    #[test]
    fn test_underscore_name() {
        assert_eq!(underscore_name("ID"), "i_d");
        assert_eq!(underscore_name("Table1Name"), "table1_name");
        assert_eq!(underscore_name("id"), "id");
        assert_eq!(underscore_name("TestModel"), "test_model");
        assert_eq!(underscore_name(""), "");
    }

    #[test]
    fn test_parse() {
        let model = Model::parse::<TestModel>().unwrap();
        assert_eq!(model.table_name(), "test_model");
        assert_eq!(model.type_name(), "TestModel");
        let columns: Vec<_> = model.fields().iter().map(Field::column).collect();
        assert_eq!(columns, ["id", "first_name", "age", "last_name"]);
        assert_eq!(model.field("age").unwrap().column_type(), i8::COLUMN_TYPE);
        assert_eq!(model.field_by_column("last_name").unwrap().name(), "last_name");
        assert!(model.field("Age").is_none());
        assert_eq!(model.size(), std::mem::size_of::<TestModel>());
    }

    #[test]
    fn test_parse_tag_and_table_name() {
        let model = Model::parse::<CustomTable>().unwrap();
        assert_eq!(model.table_name(), "custom_table_name_t");
        assert_eq!(model.field("name").unwrap().column(), "nick");
        assert!(model.field_by_column("name").is_none());
    }

    #[test]
    fn test_invalid_tag() {
        let err = Model::parse::<BadTag>().unwrap_err();
        assert!(matches!(err, OrmError::InvalidTagContent(ref t) if t == "abc==abc"));
        assert_eq!(err.to_string(), "orm: invalid tag content abc==abc");
    }

    #[test]
    fn test_duplicate_column() {
        let err = Model::parse::<Clash>().unwrap_err();
        assert!(matches!(err, OrmError::DuplicateColumn(ref c) if c == "user_id"));
    }

    #[test]
    fn test_pointer_is_rejected() {
        let err = Model::parse::<Box<TestModel>>().unwrap_err();
        assert!(matches!(err, OrmError::PointerOnly));
    }

    #[test]
    fn test_options() {
        let mut model = Model::parse::<TestModel>().unwrap();
        with_table_name("users").apply(&mut model).unwrap();
        with_column_name("first_name", "given_name")
            .apply(&mut model)
            .unwrap();

        assert_eq!(model.table_name(), "users");
        assert_eq!(model.field("first_name").unwrap().column(), "given_name");
        assert_eq!(
            model.field_by_column("given_name").unwrap().name(),
            "first_name"
        );
        assert!(model.field_by_column("first_name").is_none());

        let err = with_column_name("FirstName", "x")
            .apply(&mut model)
            .unwrap_err();
        assert!(matches!(err, OrmError::UnknownField(ref f) if f == "FirstName"));
    }

    #[test]
    fn test_generated_accessors_match_model() {
        let model = Model::parse::<TestModel>().unwrap();
        let entity = TestModel {
            id: 1,
            ..TestModel::default()
        };
        for field in model.fields() {
            assert!(entity.field(field.name()).is_some());
        }
        assert_eq!(entity.field("id"), Some(Value::I64(1)));
    }
}
