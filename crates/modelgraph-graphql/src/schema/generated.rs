//! Generated type descriptors.
//!
//! These are the build-time artifacts of schema assembly. They are created by
//! the [`TypeBuilder`](super::TypeBuilder), stored in the
//! [`TypeRegistry`](super::TypeRegistry) and turned into dynamic
//! `async-graphql` types by the [`ModelSchemaBuilder`](super::ModelSchemaBuilder).

use std::fmt;
use std::sync::{Arc, OnceLock};

use async_graphql::dynamic::TypeRef;
use modelgraph_storage::{ModelId, Record, RelationEditKind};
use serde_json::Value;

use crate::error::SchemaError;
use crate::introspect::FieldDescriptor;

/// Direction and write semantics of a generated type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Response object type.
    Output,
    /// Create payload.
    Input,
    /// Partial-update payload: every field optional.
    PartialInput,
}

impl TypeKind {
    /// Returns `true` for the two input kinds.
    #[must_use]
    pub fn is_input(self) -> bool {
        !matches!(self, Self::Output)
    }
}

/// How an output field obtains its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverKind {
    /// Reads a column of the parent record.
    Attribute,
    /// Follows a to-one relation.
    RelationSingle,
    /// Follows a to-many relation with `filters` and `orderBy` arguments.
    RelationCollection,
    /// Calls a caller-supplied function on the parent record.
    Computed,
}

/// Value function of a computed field.
pub type ComputedFn = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

/// Post-processing applied to a relation collection, given the owner and the
/// filtered, ordered rows.
pub type RelationHook = Arc<dyn Fn(&Record, Vec<Record>) -> Vec<Record> + Send + Sync>;

/// A resolved GraphQL type: a scalar by name or a generated object type.
#[derive(Clone)]
pub enum TypeDescriptor {
    /// Built-in or custom scalar.
    Scalar(String),
    /// A type produced by the type builder.
    Generated(Arc<GeneratedType>),
}

impl TypeDescriptor {
    /// Creates a scalar descriptor.
    #[must_use]
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::Scalar(name.into())
    }

    /// GraphQL type name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(name) => name,
            Self::Generated(ty) => &ty.name,
        }
    }

    /// Returns `true` for scalars.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    /// Returns the generated type, if this is one.
    #[must_use]
    pub fn as_generated(&self) -> Option<&Arc<GeneratedType>> {
        match self {
            Self::Generated(ty) => Some(ty),
            Self::Scalar(_) => None,
        }
    }
}

// Generated types reference each other in cycles; print names only.
impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(name) => f.debug_tuple("Scalar").field(name).finish(),
            Self::Generated(ty) => f.debug_tuple("Generated").field(&ty.name).finish(),
        }
    }
}

impl From<Arc<GeneratedType>> for TypeDescriptor {
    fn from(ty: Arc<GeneratedType>) -> Self {
        Self::Generated(ty)
    }
}

/// Placeholder for a relation whose target type is not declared yet.
///
/// Resolves exactly once; a failed attempt leaves it unresolved.
#[derive(Debug)]
pub struct DeferredType {
    field: FieldDescriptor,
    is_input: bool,
    resolved: OnceLock<TypeDescriptor>,
}

impl DeferredType {
    pub(crate) fn new(field: FieldDescriptor, is_input: bool) -> Self {
        Self {
            field,
            is_input,
            resolved: OnceLock::new(),
        }
    }

    /// The relation field this placeholder stands for.
    #[must_use]
    pub fn field(&self) -> &FieldDescriptor {
        &self.field
    }

    /// Whether the placeholder is for an input type.
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.is_input
    }

    /// The resolved type, once resolution succeeded.
    #[must_use]
    pub fn get(&self) -> Option<&TypeDescriptor> {
        self.resolved.get()
    }

    pub(crate) fn resolve_with(
        &self,
        resolve: impl FnOnce(&FieldDescriptor) -> Result<TypeDescriptor, SchemaError>,
    ) -> Result<TypeDescriptor, SchemaError> {
        if let Some(resolved) = self.resolved.get() {
            return Ok(resolved.clone());
        }
        let descriptor = resolve(&self.field)?;
        Ok(self.resolved.get_or_init(|| descriptor).clone())
    }
}

/// Type of a generated field: resolved now, or deferred until finalization.
#[derive(Debug, Clone)]
pub enum GeneratedTypeRef {
    /// Known at build time.
    Resolved(TypeDescriptor),
    /// Forward reference.
    Deferred(Arc<DeferredType>),
}

impl GeneratedTypeRef {
    /// The type, if known. Deferred refs report their resolved value.
    #[must_use]
    pub fn resolved(&self) -> Option<TypeDescriptor> {
        match self {
            Self::Resolved(descriptor) => Some(descriptor.clone()),
            Self::Deferred(deferred) => deferred.get().cloned(),
        }
    }

    /// Returns `true` for forward references.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

/// Where a generated field's data lives.
#[derive(Clone)]
pub enum FieldSource {
    /// A column of the model's row.
    Column(String),
    /// A relation traversed through storage.
    Relation {
        /// Relation field name on the model.
        field: String,
        /// Optional post-processing of collection results.
        hook: Option<RelationHook>,
    },
    /// A `<field>_add` / `_set` / `_remove` input companion.
    RelationEdit {
        /// Relation field name on the model.
        field: String,
        /// Which edit the companion carries.
        kind: RelationEditKind,
    },
    /// A caller-supplied value function.
    Computed(ComputedFn),
}

impl fmt::Debug for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(column) => f.debug_tuple("Column").field(column).finish(),
            Self::Relation { field, hook } => f
                .debug_struct("Relation")
                .field("field", field)
                .field("hook", &hook.is_some())
                .finish(),
            Self::RelationEdit { field, kind } => f
                .debug_struct("RelationEdit")
                .field("field", field)
                .field("kind", kind)
                .finish(),
            Self::Computed(_) => f.write_str("Computed"),
        }
    }
}

/// One field of a generated type.
#[derive(Debug, Clone)]
pub struct GeneratedField {
    /// Storage-side name (`group_id`, `tags_add`).
    pub name: String,
    /// Name in the schema (`groupId`, `tagsAdd`).
    pub graphql_name: String,
    /// Element type.
    pub type_ref: GeneratedTypeRef,
    /// Whether the field may be null or absent.
    pub optional: bool,
    /// Whether the field is a list of `type_ref`.
    pub list: bool,
    /// Resolver wiring for output types.
    pub resolver_kind: ResolverKind,
    /// Backing data.
    pub source: FieldSource,
}

impl GeneratedField {
    /// Builds the `async-graphql` type reference once `base` is known.
    ///
    /// List elements are never null: `[T!]` or `[T!]!`.
    #[must_use]
    pub fn graphql_type(&self, base: &str) -> TypeRef {
        match (self.list, self.optional) {
            (true, true) => TypeRef::named_nn_list(base),
            (true, false) => TypeRef::named_nn_list_nn(base),
            (false, true) => TypeRef::named(base),
            (false, false) => TypeRef::named_nn(base),
        }
    }
}

/// A generated object or input type.
#[derive(Debug, Clone)]
pub struct GeneratedType {
    /// GraphQL type name.
    pub name: String,
    /// Model the type was derived from.
    pub model: ModelId,
    /// Output, create input or partial-update input.
    pub kind: TypeKind,
    /// Optional description placed in the schema.
    pub description: Option<String>,
    /// Fields in declaration order.
    pub fields: Vec<GeneratedField>,
}

impl GeneratedType {
    /// Returns `true` for input kinds.
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.kind.is_input()
    }

    /// Finds a field by its storage-side name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&GeneratedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Derives the partial-update counterpart of a create input type:
    /// same fields, all optional, named `<Name>Partial`.
    #[must_use]
    pub fn to_partial(&self) -> GeneratedType {
        GeneratedType {
            name: format!("{}Partial", self.name),
            model: self.model.clone(),
            kind: TypeKind::PartialInput,
            description: self.description.clone(),
            fields: self
                .fields
                .iter()
                .cloned()
                .map(|field| GeneratedField {
                    optional: true,
                    ..field
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_type() -> GeneratedType {
        GeneratedType {
            name: "UserInput".into(),
            model: ModelId::new("User"),
            kind: TypeKind::Input,
            description: None,
            fields: vec![GeneratedField {
                name: "name".into(),
                graphql_name: "name".into(),
                type_ref: GeneratedTypeRef::Resolved(TypeDescriptor::scalar("String")),
                optional: false,
                list: false,
                resolver_kind: ResolverKind::Attribute,
                source: FieldSource::Column("name".into()),
            }],
        }
    }

    #[test]
    fn test_to_partial_makes_every_field_optional() {
        let partial = input_type().to_partial();
        assert_eq!(partial.name, "UserInputPartial");
        assert_eq!(partial.kind, TypeKind::PartialInput);
        assert!(partial.fields.iter().all(|f| f.optional));
    }

    #[test]
    fn test_graphql_type_shapes() {
        let mut field = input_type().fields.remove(0);
        assert_eq!(field.graphql_type("String").to_string(), "String!");
        field.optional = true;
        field.list = true;
        assert_eq!(field.graphql_type("ID").to_string(), "[ID!]");
    }

    #[test]
    fn test_deferred_resolves_once() {
        let descriptor = crate::introspect::introspect(
            &modelgraph_storage::ModelDefinition::new("User")
                .field(modelgraph_storage::FieldDefinition::foreign_key("group", "Group")),
        )
        .unwrap()
        .remove(0);
        let deferred = DeferredType::new(descriptor, false);
        assert!(deferred.get().is_none());

        let err = deferred.resolve_with(|f| {
            Err(SchemaError::UnresolvedRelationType {
                field: f.qualified_name(),
                related_model: "Group".into(),
            })
        });
        assert!(err.is_err());
        assert!(deferred.get().is_none());

        let first = deferred
            .resolve_with(|_| Ok(TypeDescriptor::scalar("Group")))
            .unwrap();
        let second = deferred
            .resolve_with(|_| Ok(TypeDescriptor::scalar("Other")))
            .unwrap();
        assert_eq!(first.name(), "Group");
        assert_eq!(second.name(), "Group");
    }
}
