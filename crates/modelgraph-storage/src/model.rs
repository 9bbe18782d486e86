//! Model metadata owned by the storage layer.
//!
//! A [`ModelDefinition`] is the storage backend's own description of a
//! relational model: its fields in declaration order, their storage kinds and
//! the relations between models. The GraphQL layer reflects over these
//! definitions; it never mutates them.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of a data model (e.g. `"User"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(String);

impl ModelId {
    /// Creates a model identity from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the model name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ModelId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ModelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Primitive storage type of a model field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageKind {
    Boolean,
    /// Tri-state boolean; always accepts NULL.
    NullBoolean,
    Integer,
    SmallInteger,
    BigInteger,
    PositiveInteger,
    PositiveSmallInteger,
    PositiveBigInteger,
    Char,
    Text,
    Date,
    Datetime,
    Time,
    Decimal,
    Float,
    Uuid,
    Email,
    Url,
    Slug,
    IpAddress,
    FilePath,
    AutoId,
    SmallAutoId,
    BigAutoId,
    /// A reference to another model; the column (if any) holds the related key.
    Relation,
    /// A backend-specific kind with no built-in mapping.
    Other(String),
}

impl StorageKind {
    /// Returns `true` for auto-incrementing primary key kinds.
    #[must_use]
    pub fn is_auto_id(&self) -> bool {
        matches!(self, Self::AutoId | Self::SmallAutoId | Self::BigAutoId)
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::NullBoolean => "null-boolean",
            Self::Integer => "integer",
            Self::SmallInteger => "small-integer",
            Self::BigInteger => "big-integer",
            Self::PositiveInteger => "positive-integer",
            Self::PositiveSmallInteger => "positive-small-integer",
            Self::PositiveBigInteger => "positive-big-integer",
            Self::Char => "char",
            Self::Text => "text",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Time => "time",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Uuid => "uuid",
            Self::Email => "email",
            Self::Url => "url",
            Self::Slug => "slug",
            Self::IpAddress => "ip-address",
            Self::FilePath => "file-path",
            Self::AutoId => "auto-id",
            Self::SmallAutoId => "small-auto-id",
            Self::BigAutoId => "big-auto-id",
            Self::Relation => "relation",
            Self::Other(other) => other,
        };
        f.write_str(name)
    }
}

/// Cardinality of a relation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    #[default]
    None,
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

impl RelationKind {
    /// Returns `true` for relations resolving to a collection.
    #[must_use]
    pub fn is_to_many(self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    /// Returns `true` for relations resolving to at most one object.
    #[must_use]
    pub fn is_to_one(self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }
}

/// A single field as declared by the storage backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name as used in model code.
    pub name: String,
    /// Column name (`group_id` for a `group` foreign key).
    pub column: String,
    /// Primitive storage kind.
    pub kind: StorageKind,
    /// Relation cardinality, `None` for plain columns.
    pub relation: RelationKind,
    /// Target model for relation fields.
    pub related_model: Option<ModelId>,
    /// Field on the related model this reverse relation mirrors.
    pub remote_field: Option<String>,
    /// Whether the column accepts NULL.
    pub null: bool,
    /// Whether an empty value is allowed on create.
    pub blank: bool,
    /// Whether the field may be written through the API.
    pub editable: bool,
    /// Default value applied when the field is absent on create.
    pub default: Option<Value>,
    /// Whether this field is the model's primary key.
    pub primary_key: bool,
}

impl FieldDefinition {
    /// Creates a plain, required, editable column field.
    ///
    /// `NullBoolean` fields start out nullable.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: StorageKind) -> Self {
        let name = name.into();
        let null = kind == StorageKind::NullBoolean;
        Self {
            column: name.clone(),
            name,
            kind,
            relation: RelationKind::None,
            related_model: None,
            remote_field: None,
            null,
            blank: false,
            editable: true,
            default: None,
            primary_key: false,
        }
    }

    /// Creates an auto-incrementing primary key.
    #[must_use]
    pub fn auto_id(name: impl Into<String>) -> Self {
        let mut field = Self::new(name, StorageKind::AutoId);
        field.primary_key = true;
        field.blank = true;
        field
    }

    /// Creates a forward many-to-one relation stored in `<name>_id`.
    #[must_use]
    pub fn foreign_key(name: impl Into<String>, related: impl Into<ModelId>) -> Self {
        Self::forward(name, related, RelationKind::ManyToOne)
    }

    /// Creates a forward one-to-one relation stored in `<name>_id`.
    #[must_use]
    pub fn one_to_one(name: impl Into<String>, related: impl Into<ModelId>) -> Self {
        Self::forward(name, related, RelationKind::OneToOne)
    }

    /// Creates a forward many-to-many relation backed by a link table.
    #[must_use]
    pub fn many_to_many(name: impl Into<String>, related: impl Into<ModelId>) -> Self {
        let mut field = Self::new(name, StorageKind::Relation);
        field.relation = RelationKind::ManyToMany;
        field.related_model = Some(related.into());
        field
    }

    /// Creates the reverse side of a foreign key (`Group.users` for `User.group`).
    #[must_use]
    pub fn reverse_many(
        name: impl Into<String>,
        related: impl Into<ModelId>,
        remote_field: impl Into<String>,
    ) -> Self {
        Self::reverse(name, related, remote_field, RelationKind::OneToMany)
    }

    /// Creates the reverse side of a one-to-one relation.
    #[must_use]
    pub fn reverse_one(
        name: impl Into<String>,
        related: impl Into<ModelId>,
        remote_field: impl Into<String>,
    ) -> Self {
        Self::reverse(name, related, remote_field, RelationKind::OneToOne)
    }

    /// Creates the reverse side of a many-to-many relation.
    #[must_use]
    pub fn reverse_many_to_many(
        name: impl Into<String>,
        related: impl Into<ModelId>,
        remote_field: impl Into<String>,
    ) -> Self {
        Self::reverse(name, related, remote_field, RelationKind::ManyToMany)
    }

    fn forward(name: impl Into<String>, related: impl Into<ModelId>, relation: RelationKind) -> Self {
        let mut field = Self::new(name, StorageKind::Relation);
        field.column = format!("{}_id", field.name);
        field.relation = relation;
        field.related_model = Some(related.into());
        field
    }

    fn reverse(
        name: impl Into<String>,
        related: impl Into<ModelId>,
        remote_field: impl Into<String>,
        relation: RelationKind,
    ) -> Self {
        let mut field = Self::new(name, StorageKind::Relation);
        field.relation = relation;
        field.related_model = Some(related.into());
        field.remote_field = Some(remote_field.into());
        field.editable = false;
        field.null = true;
        field.blank = true;
        field
    }

    /// Marks the field as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    /// Marks the field as allowed to be empty on create.
    #[must_use]
    pub fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    /// Sets a default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Marks the field as read-only through the API.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Overrides the column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Returns `true` for relation fields.
    #[must_use]
    pub fn is_relation(&self) -> bool {
        self.relation != RelationKind::None
    }

    /// Returns `true` for the reverse side of a relation.
    #[must_use]
    pub fn is_reverse(&self) -> bool {
        self.remote_field.is_some()
    }

    /// Returns `true` if the field's value lives in a column of this model's table.
    #[must_use]
    pub fn has_column(&self) -> bool {
        !self.is_reverse() && self.relation != RelationKind::ManyToMany
    }

    /// Whether NULL is a valid value, either declared or implied by the kind.
    #[must_use]
    pub fn accepts_null(&self) -> bool {
        self.null || self.kind == StorageKind::NullBoolean
    }
}

/// A model: identity plus fields in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Model identity.
    pub id: ModelId,
    /// Fields in declaration order.
    pub fields: Vec<FieldDefinition>,
}

impl ModelDefinition {
    /// Creates an empty model definition.
    #[must_use]
    pub fn new(id: impl Into<ModelId>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a field by name or column name.
    #[must_use]
    pub fn get_field_or_column(&self, name: &str) -> Option<&FieldDefinition> {
        self.get_field(name)
            .or_else(|| self.fields.iter().find(|f| f.has_column() && f.column == name))
    }

    /// Returns the primary key field.
    #[must_use]
    pub fn primary_key(&self) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Returns the primary key column, `id` when none is declared.
    #[must_use]
    pub fn pk_column(&self) -> &str {
        self.primary_key().map_or("id", |f| f.column.as_str())
    }

    /// Fields whose values live in this model's own table.
    pub fn column_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.has_column())
    }
}

/// The set of models known to a storage backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelCatalog {
    models: IndexMap<ModelId, ModelDefinition>,
}

impl ModelCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a model definition.
    pub fn register(&mut self, model: ModelDefinition) {
        self.models.insert(model.id.clone(), model);
    }

    /// Builder-style variant of [`register`](Self::register).
    #[must_use]
    pub fn with_model(mut self, model: ModelDefinition) -> Self {
        self.register(model);
        self
    }

    /// Looks up a model.
    #[must_use]
    pub fn get(&self, id: &ModelId) -> Option<&ModelDefinition> {
        self.models.get(id)
    }

    /// Iterates over the registered models in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelDefinition> {
        self.models.values()
    }

    /// Number of registered models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns true if no models are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_key_column() {
        let field = FieldDefinition::foreign_key("group", "Group");
        assert_eq!(field.column, "group_id");
        assert_eq!(field.relation, RelationKind::ManyToOne);
        assert!(field.has_column());
        assert!(!field.is_reverse());
    }

    #[test]
    fn test_reverse_relation_defaults() {
        let field = FieldDefinition::reverse_many("users", "User", "group");
        assert!(!field.editable);
        assert!(field.null);
        assert!(field.is_reverse());
        assert!(!field.has_column());
    }

    #[test]
    fn test_many_to_many_has_no_column() {
        let field = FieldDefinition::many_to_many("tags", "Tag");
        assert!(field.editable);
        assert!(!field.has_column());
        assert!(field.relation.is_to_many());
    }

    #[test]
    fn test_model_lookup_by_column() {
        let model = ModelDefinition::new("User")
            .field(FieldDefinition::auto_id("id"))
            .field(FieldDefinition::foreign_key("group", "Group"));

        assert_eq!(model.get_field_or_column("group_id").map(|f| f.name.as_str()), Some("group"));
        assert_eq!(model.pk_column(), "id");
        assert_eq!(model.column_fields().count(), 2);
    }

    #[test]
    fn test_null_boolean_is_nullable() {
        assert!(FieldDefinition::new("verified", StorageKind::NullBoolean).null);
        assert!(!FieldDefinition::new("active", StorageKind::Boolean).null);

        let mut forced = FieldDefinition::new("verified", StorageKind::NullBoolean);
        forced.null = false;
        assert!(forced.accepts_null());
    }

    #[test]
    fn test_storage_kind_display() {
        assert_eq!(StorageKind::IpAddress.to_string(), "ip-address");
        assert_eq!(StorageKind::Other("json".into()).to_string(), "json");
    }
}
