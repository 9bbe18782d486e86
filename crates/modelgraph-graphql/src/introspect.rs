//! Model introspection.
//!
//! Turns a [`ModelDefinition`] into an ordered list of [`FieldDescriptor`]s,
//! the only view of a model the type builder works with.

use std::collections::HashSet;

use modelgraph_storage::{ModelCatalog, ModelDefinition, ModelId, RelationKind, StorageKind};

use crate::error::SchemaError;

/// Reflected metadata of one model field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Model the field belongs to.
    pub model: ModelId,
    /// Field name.
    pub name: String,
    /// Column name (`group_id` for the `group` foreign key).
    pub database_name: String,
    /// Primitive storage kind.
    pub storage_kind: StorageKind,
    /// Whether the field is a relation.
    pub is_relation: bool,
    /// Relation cardinality.
    pub relation_kind: RelationKind,
    /// Related model, present iff `is_relation`.
    pub related_model: Option<ModelId>,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether the field can be written.
    pub editable: bool,
    /// Whether a default value is declared.
    pub has_default: bool,
    /// Whether the field may be left empty on create.
    pub blank: bool,
    /// Whether this is the primary key.
    pub primary_key: bool,
}

impl FieldDescriptor {
    /// Returns `true` for relations resolving to a collection.
    #[must_use]
    pub fn is_to_many(&self) -> bool {
        self.is_relation && self.relation_kind.is_to_many()
    }

    /// `Model.field`, used in error messages.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.model, self.name)
    }
}

/// Reflects every field of `model` in declaration order.
///
/// # Errors
///
/// Returns `SchemaError::ModelIntrospection` when the metadata is
/// inconsistent: an empty model name, a duplicate field, or relation
/// information that does not match the field's relation kind.
pub fn introspect(model: &ModelDefinition) -> Result<Vec<FieldDescriptor>, SchemaError> {
    let fail = |reason: String| SchemaError::ModelIntrospection {
        model: model.id.to_string(),
        reason,
    };

    if model.id.as_str().trim().is_empty() {
        return Err(fail("model name is empty".into()));
    }

    let mut seen = HashSet::new();
    let mut descriptors = Vec::with_capacity(model.fields.len());
    for field in &model.fields {
        if field.name.is_empty() {
            return Err(fail("field with an empty name".into()));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(fail(format!("duplicate field {}", field.name)));
        }

        let is_relation = field.is_relation();
        match (is_relation, &field.related_model) {
            (true, None) => {
                return Err(fail(format!("relation {} has no related model", field.name)));
            }
            (false, Some(related)) => {
                return Err(fail(format!(
                    "field {} names related model {related} but is not a relation",
                    field.name
                )));
            }
            _ => {}
        }

        descriptors.push(FieldDescriptor {
            model: model.id.clone(),
            name: field.name.clone(),
            database_name: field.column.clone(),
            storage_kind: field.kind.clone(),
            is_relation,
            relation_kind: field.relation,
            related_model: field.related_model.clone(),
            nullable: field.accepts_null(),
            editable: field.editable,
            has_default: field.default.is_some(),
            blank: field.blank,
            primary_key: field.primary_key,
        });
    }

    tracing::trace!(model = %model.id, fields = descriptors.len(), "Introspected model");
    Ok(descriptors)
}

/// Introspects a catalog model, also checking that related models exist.
///
/// # Errors
///
/// Returns `SchemaError::ModelIntrospection` if the model is not in the
/// catalog or a relation targets a model the catalog does not know.
pub fn introspect_in(
    catalog: &ModelCatalog,
    model: &ModelId,
) -> Result<Vec<FieldDescriptor>, SchemaError> {
    let definition = catalog.get(model).ok_or_else(|| SchemaError::ModelIntrospection {
        model: model.to_string(),
        reason: "model is not in the catalog".into(),
    })?;

    let descriptors = introspect(definition)?;
    for descriptor in &descriptors {
        if let Some(related) = &descriptor.related_model
            && catalog.get(related).is_none()
        {
            return Err(SchemaError::ModelIntrospection {
                model: model.to_string(),
                reason: format!(
                    "relation {} targets unknown model {related}",
                    descriptor.name
                ),
            });
        }
    }
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgraph_storage::FieldDefinition;

    fn user() -> ModelDefinition {
        ModelDefinition::new("User")
            .field(FieldDefinition::auto_id("id"))
            .field(FieldDefinition::new("name", StorageKind::Char))
            .field(FieldDefinition::new("bio", StorageKind::Text).blank())
            .field(FieldDefinition::new("active", StorageKind::Boolean).with_default(true))
            .field(FieldDefinition::foreign_key("group", "Group").nullable())
    }

    #[test]
    fn test_introspect_keeps_declaration_order() {
        let fields = introspect(&user()).unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "bio", "active", "group"]);

        let group = &fields[4];
        assert!(group.is_relation);
        assert_eq!(group.database_name, "group_id");
        assert_eq!(group.related_model, Some(ModelId::new("Group")));
        assert!(group.nullable);
        assert!(fields[3].has_default);
        assert!(fields[2].blank);
    }

    #[test]
    fn test_null_boolean_is_always_nullable() {
        let mut verified = FieldDefinition::new("verified", StorageKind::NullBoolean);
        verified.null = false;
        let model = user().field(verified);
        let fields = introspect(&model).unwrap();
        assert!(fields[5].nullable);
        assert!(!fields[1].nullable);
    }

    #[test]
    fn test_introspect_is_deterministic() {
        assert_eq!(introspect(&user()).unwrap(), introspect(&user()).unwrap());
    }

    #[test]
    fn test_duplicate_field_fails() {
        let model = user().field(FieldDefinition::new("name", StorageKind::Text));
        let err = introspect(&model).unwrap_err();
        assert!(matches!(err, SchemaError::ModelIntrospection { .. }));
        assert!(err.to_string().contains("duplicate field name"));
    }

    #[test]
    fn test_relation_without_target_fails() {
        let mut field = FieldDefinition::foreign_key("owner", "User");
        field.related_model = None;
        let model = ModelDefinition::new("Pet").field(field);
        assert!(introspect(&model).is_err());
    }

    #[test]
    fn test_introspect_in_checks_related_models() {
        let catalog = ModelCatalog::new().with_model(user());
        let err = introspect_in(&catalog, &ModelId::new("User")).unwrap_err();
        assert!(err.to_string().contains("unknown model Group"));

        let err = introspect_in(&catalog, &ModelId::new("Ghost")).unwrap_err();
        assert!(err.to_string().contains("not in the catalog"));
    }
}
