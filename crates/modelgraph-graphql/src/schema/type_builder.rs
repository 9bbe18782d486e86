//! Schema type builder.
//!
//! Assembles the ordered field list of a generated type from a model's
//! introspected fields, the type registry and the scalar mapper.
//!
//! # Example
//!
//! ```ignore
//! use modelgraph_graphql::{TypeDeclaration, TypeRegistry, declare_type};
//!
//! let mut registry = TypeRegistry::new();
//! let user = declare_type(&mut registry, TypeDeclaration::output(&user_model))?;
//! let user_input = declare_type(
//!     &mut registry,
//!     TypeDeclaration::input(&user_model).fields(["name", "group"]),
//! )?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use modelgraph_storage::{ModelDefinition, Record, RelationEditKind};
use serde_json::Value;
use tracing::{debug, trace};

use super::generated::{
    ComputedFn, FieldSource, GeneratedField, GeneratedType, GeneratedTypeRef, RelationHook,
    ResolverKind, TypeDescriptor, TypeKind,
};
use super::registry::{RegistryKey, TypeRegistry};
use crate::error::SchemaError;
use crate::introspect::{FieldDescriptor, introspect};
use crate::naming::graphql_field_name;
use crate::types::map_scalar;

struct ComputedField {
    name: String,
    scalar: String,
    compute: ComputedFn,
}

/// Declaration of one generated type.
pub struct TypeDeclaration {
    model: ModelDefinition,
    kind: TypeKind,
    selection: Option<Vec<String>>,
    name: Option<String>,
    description: Option<String>,
    computed: Vec<ComputedField>,
    hooks: HashMap<String, RelationHook>,
}

impl TypeDeclaration {
    fn new(model: &ModelDefinition, kind: TypeKind) -> Self {
        Self {
            model: model.clone(),
            kind,
            selection: None,
            name: None,
            description: None,
            computed: Vec::new(),
            hooks: HashMap::new(),
        }
    }

    /// Output type named after the model.
    #[must_use]
    pub fn output(model: &ModelDefinition) -> Self {
        Self::new(model, TypeKind::Output)
    }

    /// Create input type named `<Model>Input`.
    #[must_use]
    pub fn input(model: &ModelDefinition) -> Self {
        Self::new(model, TypeKind::Input)
    }

    /// Partial-update input type named `<Model>InputPartial`.
    #[must_use]
    pub fn partial_input(model: &ModelDefinition) -> Self {
        Self::new(model, TypeKind::PartialInput)
    }

    /// Restricts the type to the named model fields, in that order.
    #[must_use]
    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Requests a type without generated fields.
    #[must_use]
    pub fn no_fields(mut self) -> Self {
        self.selection = Some(Vec::new());
        self
    }

    /// Overrides the type name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the schema description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a nullable computed field of type `scalar` on an output type.
    #[must_use]
    pub fn computed<F>(mut self, name: impl Into<String>, scalar: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.computed.push(ComputedField {
            name: name.into(),
            scalar: scalar.into(),
            compute: Arc::new(compute),
        });
        self
    }

    /// Post-processes the rows of the to-many relation `field`.
    #[must_use]
    pub fn relation_hook<F>(mut self, field: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&Record, Vec<Record>) -> Vec<Record> + Send + Sync + 'static,
    {
        self.hooks.insert(field.into(), Arc::new(hook));
        self
    }

    /// The declared type name.
    #[must_use]
    pub fn type_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match self.kind {
            TypeKind::Output => self.model.id.to_string(),
            TypeKind::Input => format!("{}Input", self.model.id),
            TypeKind::PartialInput => format!("{}InputPartial", self.model.id),
        }
    }
}

/// Builds [`GeneratedType`]s from declarations.
pub struct TypeBuilder;

impl TypeBuilder {
    /// Builds the type described by `declaration`.
    ///
    /// Relations whose target has no registered type yet get a deferred
    /// reference in `registry`.
    ///
    /// # Errors
    ///
    /// - `ModelIntrospection` if the model metadata is inconsistent
    /// - `UnknownField` for a selected or hooked name the model lacks
    /// - `UnmappedFieldType` for a non-relation field nothing maps
    /// - `InvalidConfig` for computed fields or hooks that do not apply
    pub fn build(
        registry: &mut TypeRegistry,
        declaration: &TypeDeclaration,
    ) -> Result<GeneratedType, SchemaError> {
        let model = &declaration.model;
        let descriptors = introspect(model)?;
        let kind = declaration.kind;

        let selected = select_fields(declaration, &descriptors)?;
        validate_hooks(declaration, &descriptors)?;
        if kind.is_input() && !declaration.computed.is_empty() {
            return Err(SchemaError::InvalidConfig(format!(
                "computed fields are only allowed on output types ({})",
                declaration.type_name()
            )));
        }

        let mut fields = Vec::with_capacity(selected.len());
        for descriptor in selected {
            if kind.is_input() {
                if descriptor.editable {
                    push_input_field(&mut fields, registry, descriptor, kind)?;
                } else {
                    trace!(field = %descriptor.qualified_name(), "Skipping non-editable field");
                }
                continue;
            }

            let type_ref = field_type(registry, descriptor, false)?;
            let (resolver_kind, source) = if descriptor.is_relation {
                let resolver_kind = if descriptor.is_to_many() {
                    ResolverKind::RelationCollection
                } else {
                    ResolverKind::RelationSingle
                };
                let source = FieldSource::Relation {
                    field: descriptor.name.clone(),
                    hook: declaration.hooks.get(&descriptor.name).cloned(),
                };
                (resolver_kind, source)
            } else {
                (
                    ResolverKind::Attribute,
                    FieldSource::Column(descriptor.database_name.clone()),
                )
            };

            fields.push(GeneratedField {
                name: descriptor.name.clone(),
                graphql_name: graphql_field_name(&descriptor.name),
                type_ref,
                optional: is_optional(descriptor, kind),
                list: descriptor.is_to_many(),
                resolver_kind,
                source,
            });
        }

        for computed in &declaration.computed {
            fields.push(GeneratedField {
                name: computed.name.clone(),
                graphql_name: graphql_field_name(&computed.name),
                type_ref: GeneratedTypeRef::Resolved(TypeDescriptor::Scalar(computed.scalar.clone())),
                optional: true,
                list: false,
                resolver_kind: ResolverKind::Computed,
                source: FieldSource::Computed(Arc::clone(&computed.compute)),
            });
        }

        let name = declaration.type_name();
        debug!(ty = %name, model = %model.id, fields = fields.len(), kind = ?kind, "Built type");
        Ok(GeneratedType {
            name,
            model: model.id.clone(),
            kind,
            description: declaration.description.clone(),
            fields,
        })
    }
}

/// Builds a type and registers it under its model.
///
/// Output and create input types are registered under `(Model, is_input)`;
/// partial-update types are returned without being registered.
///
/// # Errors
///
/// Same as [`TypeBuilder::build`].
pub fn declare_type(
    registry: &mut TypeRegistry,
    declaration: TypeDeclaration,
) -> Result<Arc<GeneratedType>, SchemaError> {
    let generated = Arc::new(TypeBuilder::build(registry, &declaration)?);
    if generated.kind != TypeKind::PartialInput {
        registry.register(
            RegistryKey::Model(generated.model.clone()),
            generated.is_input(),
            TypeDescriptor::Generated(Arc::clone(&generated)),
        );
    }
    Ok(generated)
}

/// Optionality rule per type kind.
fn is_optional(field: &FieldDescriptor, kind: TypeKind) -> bool {
    match kind {
        TypeKind::Output => field.nullable,
        TypeKind::Input => field.nullable || field.blank || field.has_default,
        TypeKind::PartialInput => true,
    }
}

fn select_fields<'a>(
    declaration: &TypeDeclaration,
    descriptors: &'a [FieldDescriptor],
) -> Result<Vec<&'a FieldDescriptor>, SchemaError> {
    let Some(selection) = &declaration.selection else {
        return Ok(descriptors.iter().collect());
    };

    let mut selected: Vec<&FieldDescriptor> = Vec::with_capacity(selection.len());
    for name in selection {
        let descriptor = descriptors
            .iter()
            .find(|d| &d.name == name)
            .ok_or_else(|| SchemaError::UnknownField {
                model: declaration.model.id.to_string(),
                field: name.clone(),
            })?;
        if !selected.iter().any(|d| d.name == descriptor.name) {
            selected.push(descriptor);
        }
    }
    Ok(selected)
}

fn validate_hooks(
    declaration: &TypeDeclaration,
    descriptors: &[FieldDescriptor],
) -> Result<(), SchemaError> {
    for field in declaration.hooks.keys() {
        let descriptor = descriptors
            .iter()
            .find(|d| &d.name == field)
            .ok_or_else(|| SchemaError::UnknownField {
                model: declaration.model.id.to_string(),
                field: field.clone(),
            })?;
        if !descriptor.is_to_many() || declaration.kind.is_input() {
            return Err(SchemaError::InvalidConfig(format!(
                "relation hook on {} requires a to-many relation of an output type",
                descriptor.qualified_name()
            )));
        }
    }
    Ok(())
}

/// Registry lookup, then the scalar mapper, then deferral for relations.
fn field_type(
    registry: &mut TypeRegistry,
    descriptor: &FieldDescriptor,
    is_input: bool,
) -> Result<GeneratedTypeRef, SchemaError> {
    if let Some(found) = registry.lookup_field(descriptor, is_input) {
        return Ok(GeneratedTypeRef::Resolved(found));
    }
    if descriptor.is_relation {
        return Ok(registry.defer(descriptor.clone(), is_input));
    }
    map_scalar(&descriptor.storage_kind)
        .map(GeneratedTypeRef::Resolved)
        .map_err(|_| SchemaError::UnmappedFieldType {
            model: descriptor.model.to_string(),
            field: descriptor.name.clone(),
            kind: descriptor.storage_kind.to_string(),
        })
}

fn id_type() -> GeneratedTypeRef {
    GeneratedTypeRef::Resolved(TypeDescriptor::scalar(async_graphql::dynamic::TypeRef::ID))
}

/// Input fields: relations become id fields, everything else maps as usual.
fn push_input_field(
    fields: &mut Vec<GeneratedField>,
    registry: &mut TypeRegistry,
    descriptor: &FieldDescriptor,
    kind: TypeKind,
) -> Result<(), SchemaError> {
    if descriptor.is_to_many() {
        for edit in RelationEditKind::ORDER {
            let name = format!("{}_{}", descriptor.name, edit.suffix());
            fields.push(GeneratedField {
                graphql_name: graphql_field_name(&name),
                name,
                type_ref: id_type(),
                optional: true,
                list: true,
                resolver_kind: ResolverKind::Attribute,
                source: FieldSource::RelationEdit {
                    field: descriptor.name.clone(),
                    kind: edit,
                },
            });
        }
        return Ok(());
    }

    let (name, type_ref) = if descriptor.is_relation {
        (descriptor.database_name.clone(), id_type())
    } else {
        (descriptor.name.clone(), field_type(registry, descriptor, true)?)
    };
    fields.push(GeneratedField {
        graphql_name: graphql_field_name(&name),
        name,
        type_ref,
        optional: is_optional(descriptor, kind),
        list: false,
        resolver_kind: ResolverKind::Attribute,
        source: FieldSource::Column(descriptor.database_name.clone()),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgraph_storage::{FieldDefinition, StorageKind};

    fn group() -> ModelDefinition {
        ModelDefinition::new("Group")
            .field(FieldDefinition::auto_id("id"))
            .field(FieldDefinition::new("name", StorageKind::Char))
            .field(FieldDefinition::many_to_many("tags", "Tag"))
            .field(FieldDefinition::reverse_many("users", "User", "group"))
    }

    fn user() -> ModelDefinition {
        ModelDefinition::new("User")
            .field(FieldDefinition::auto_id("id"))
            .field(FieldDefinition::new("name", StorageKind::Char))
            .field(FieldDefinition::new("nickname", StorageKind::Char).nullable())
            .field(FieldDefinition::new("bio", StorageKind::Text).blank())
            .field(FieldDefinition::new("score", StorageKind::Integer).with_default(0))
            .field(FieldDefinition::new("created", StorageKind::Datetime).read_only())
            .field(FieldDefinition::foreign_key("group", "Group"))
    }

    fn optional_by_name(ty: &GeneratedType) -> Vec<(&str, bool)> {
        ty.fields.iter().map(|f| (f.name.as_str(), f.optional)).collect()
    }

    #[test]
    fn test_output_type_keeps_all_fields() {
        let mut registry = TypeRegistry::new();
        let ty = TypeBuilder::build(&mut registry, &TypeDeclaration::output(&user())).unwrap();
        assert_eq!(ty.name, "User");
        let names: Vec<_> = ty.fields.iter().map(|f| f.graphql_name.as_str()).collect();
        assert_eq!(
            names,
            ["id", "name", "nickname", "bio", "score", "created", "group"]
        );
        let group = ty.field("group").unwrap();
        assert_eq!(group.resolver_kind, ResolverKind::RelationSingle);
        assert!(group.type_ref.is_deferred());
        assert_eq!(registry.pending(), 1);
    }

    #[test]
    fn test_optionality_law() {
        let mut registry = TypeRegistry::new();
        let output = TypeBuilder::build(&mut registry, &TypeDeclaration::output(&user())).unwrap();
        let input = TypeBuilder::build(&mut registry, &TypeDeclaration::input(&user())).unwrap();
        let partial =
            TypeBuilder::build(&mut registry, &TypeDeclaration::partial_input(&user())).unwrap();

        assert_eq!(
            optional_by_name(&output),
            [
                ("id", false),
                ("name", false),
                ("nickname", true),
                ("bio", false),
                ("score", false),
                ("created", false),
                ("group", false),
            ]
        );
        assert_eq!(
            optional_by_name(&input),
            [
                ("id", true),
                ("name", false),
                ("nickname", true),
                ("bio", true),
                ("score", true),
                ("group_id", false),
            ]
        );
        assert_eq!(partial.name, "UserInputPartial");
        assert!(partial.fields.iter().all(|f| f.optional));
        assert_eq!(partial.fields.len(), input.fields.len());
    }

    #[test]
    fn test_null_boolean_renders_nullable() {
        let mut verified = FieldDefinition::new("verified", StorageKind::NullBoolean);
        verified.null = false;
        let model = ModelDefinition::new("Account")
            .field(FieldDefinition::auto_id("id"))
            .field(verified);

        let mut registry = TypeRegistry::new();
        let output = TypeBuilder::build(&mut registry, &TypeDeclaration::output(&model)).unwrap();
        let input = TypeBuilder::build(&mut registry, &TypeDeclaration::input(&model)).unwrap();
        for ty in [&output, &input] {
            let field = ty.field("verified").unwrap();
            assert!(field.optional);
            assert_eq!(field.graphql_type("Boolean").to_string(), "Boolean");
        }
    }

    #[test]
    fn test_input_relation_companions() {
        let mut registry = TypeRegistry::new();
        let input = TypeBuilder::build(&mut registry, &TypeDeclaration::input(&group())).unwrap();
        let names: Vec<_> = input.fields.iter().map(|f| f.graphql_name.as_str()).collect();
        assert_eq!(names, ["id", "name", "tagsAdd", "tagsSet", "tagsRemove"]);

        let remove = input.field("tags_remove").unwrap();
        assert!(remove.list && remove.optional);
        assert_eq!(remove.graphql_type("ID").to_string(), "[ID!]");
        assert!(matches!(
            remove.source,
            FieldSource::RelationEdit { ref field, kind: RelationEditKind::Remove } if field == "tags"
        ));
        assert_eq!(registry.pending(), 0);
    }

    #[test]
    fn test_selection_order_and_unknown_field() {
        let mut registry = TypeRegistry::new();
        let ty = TypeBuilder::build(
            &mut registry,
            &TypeDeclaration::output(&user()).fields(["name", "id"]),
        )
        .unwrap();
        let names: Vec<_> = ty.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["name", "id"]);

        let err = TypeBuilder::build(
            &mut registry,
            &TypeDeclaration::output(&user()).fields(["name", "email"]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnknownField { ref model, ref field } if model == "User" && field == "email"
        ));
    }

    #[test]
    fn test_empty_selection_yields_empty_type() {
        let mut registry = TypeRegistry::new();
        let ty = TypeBuilder::build(&mut registry, &TypeDeclaration::output(&user()).no_fields())
            .unwrap();
        assert!(ty.fields.is_empty());
    }

    #[test]
    fn test_overrides_and_unmapped_kinds() {
        let model = ModelDefinition::new("Doc")
            .field(FieldDefinition::new("body", StorageKind::Other("json".into())));

        let mut registry = TypeRegistry::new();
        let err = TypeBuilder::build(&mut registry, &TypeDeclaration::output(&model)).unwrap_err();
        assert!(matches!(err, SchemaError::UnmappedFieldType { ref kind, .. } if kind == "json"));

        registry.register_override(
            RegistryKey::kind(StorageKind::Other("json".into())),
            TypeDescriptor::scalar("String"),
        );
        let ty = TypeBuilder::build(&mut registry, &TypeDeclaration::output(&model)).unwrap();
        assert_eq!(ty.fields[0].type_ref.resolved().unwrap().name(), "String");
    }

    #[test]
    fn test_declare_type_registers_by_model() {
        let mut registry = TypeRegistry::new();
        let output = declare_type(&mut registry, TypeDeclaration::output(&group())).unwrap();
        declare_type(&mut registry, TypeDeclaration::input(&group())).unwrap();
        declare_type(&mut registry, TypeDeclaration::partial_input(&group())).unwrap();

        let found = registry.lookup(&RegistryKey::model("Group"), false).unwrap();
        assert!(Arc::ptr_eq(found.as_generated().unwrap(), &output));
        assert_eq!(
            registry.lookup(&RegistryKey::model("Group"), true).unwrap().name(),
            "GroupInput"
        );
        assert_eq!(registry.model_types().count(), 2);
    }

    #[test]
    fn test_computed_fields_and_hooks() {
        let mut registry = TypeRegistry::new();
        let ty = TypeBuilder::build(
            &mut registry,
            &TypeDeclaration::output(&group())
                .fields(["name"])
                .computed("name_length", "Int", |record| {
                    let len = record.get("name").and_then(Value::as_str).map_or(0, str::len);
                    Value::from(len)
                }),
        )
        .unwrap();
        let computed = ty.field("name_length").unwrap();
        assert_eq!(computed.graphql_name, "nameLength");
        assert_eq!(computed.resolver_kind, ResolverKind::Computed);

        let err = TypeBuilder::build(
            &mut registry,
            &TypeDeclaration::output(&group()).relation_hook("name", |_, rows| rows),
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidConfig(_)));

        let err = TypeBuilder::build(
            &mut registry,
            &TypeDeclaration::input(&group()).computed("x", "Int", |_| Value::Null),
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidConfig(_)));
    }
}
