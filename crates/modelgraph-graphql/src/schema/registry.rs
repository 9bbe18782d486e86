//! Type registry.
//!
//! Maps model identities, field names and storage kinds to GraphQL types,
//! separately for input and output. The registry is an explicit value passed
//! to every declaration; once the schema is built it is frozen behind an
//! `Arc` and only read.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use modelgraph_storage::{ModelId, StorageKind};
use tracing::{debug, trace};

use super::generated::{DeferredType, GeneratedType, GeneratedTypeRef, TypeDescriptor};
use crate::error::SchemaError;
use crate::introspect::FieldDescriptor;

/// What a registry entry is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegistryKey {
    /// Every relation targeting this model.
    Model(ModelId),
    /// A field name, either bare (`avatar`) or qualified (`User.avatar`).
    Field(String),
    /// Every field of this storage kind.
    Kind(StorageKind),
}

impl RegistryKey {
    /// Key for a model identity.
    pub fn model(model: impl Into<ModelId>) -> Self {
        Self::Model(model.into())
    }

    /// Key for a field name.
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// Key for a storage kind.
    #[must_use]
    pub fn kind(kind: StorageKind) -> Self {
        Self::Kind(kind)
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(model) => write!(f, "model {model}"),
            Self::Field(field) => write!(f, "field {field}"),
            Self::Kind(kind) => write!(f, "kind {kind}"),
        }
    }
}

/// Registry of generated and override types.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: IndexMap<(RegistryKey, bool), TypeDescriptor>,
    deferred: Vec<Arc<DeferredType>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor` under `(key, is_input)`, returning the entry it
    /// replaced. The last registration wins.
    pub fn register(
        &mut self,
        key: RegistryKey,
        is_input: bool,
        descriptor: TypeDescriptor,
    ) -> Option<TypeDescriptor> {
        let name = descriptor.name().to_string();
        let previous = self.entries.insert((key.clone(), is_input), descriptor);
        match &previous {
            Some(old) => debug!(
                key = %key,
                is_input,
                old = %old.name(),
                new = %name,
                "Replaced registry entry"
            ),
            None => trace!(key = %key, is_input, ty = %name, "Registered type"),
        }
        previous
    }

    /// Registers `descriptor` for both input and output.
    pub fn register_override(&mut self, key: RegistryKey, descriptor: TypeDescriptor) {
        self.register(key.clone(), true, descriptor.clone());
        self.register(key, false, descriptor);
    }

    /// Returns the entry for `(key, is_input)`.
    #[must_use]
    pub fn lookup(&self, key: &RegistryKey, is_input: bool) -> Option<TypeDescriptor> {
        self.entries.get(&(key.clone(), is_input)).cloned()
    }

    /// Looks up the type of a model field.
    ///
    /// Order: qualified field name, bare field name, storage kind, and for
    /// relations the related model.
    #[must_use]
    pub fn lookup_field(&self, field: &FieldDescriptor, is_input: bool) -> Option<TypeDescriptor> {
        let mut keys = vec![
            RegistryKey::Field(field.qualified_name()),
            RegistryKey::Field(field.name.clone()),
            RegistryKey::Kind(field.storage_kind.clone()),
        ];
        if let Some(related) = field.related_model.as_ref().filter(|_| field.is_relation) {
            keys.push(RegistryKey::Model(related.clone()));
        }
        keys.iter().find_map(|key| self.lookup(key, is_input))
    }

    /// Creates a placeholder for `field`, resolved by [`resolve`](Self::resolve)
    /// or at [`finalize`](Self::finalize).
    pub fn defer(&mut self, field: FieldDescriptor, is_input: bool) -> GeneratedTypeRef {
        trace!(field = %field.qualified_name(), is_input, "Deferring relation type");
        let deferred = Arc::new(DeferredType::new(field, is_input));
        self.deferred.push(Arc::clone(&deferred));
        GeneratedTypeRef::Deferred(deferred)
    }

    /// Resolves a type reference. Deferred references resolve at most once;
    /// a failure leaves them pending.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnresolvedRelationType` when nothing is
    /// registered for the relation yet.
    pub fn resolve(&self, type_ref: &GeneratedTypeRef) -> Result<TypeDescriptor, SchemaError> {
        match type_ref {
            GeneratedTypeRef::Resolved(descriptor) => Ok(descriptor.clone()),
            GeneratedTypeRef::Deferred(deferred) => deferred.resolve_with(|field| {
                self.lookup_field(field, deferred.is_input()).ok_or_else(|| {
                    SchemaError::UnresolvedRelationType {
                        field: field.qualified_name(),
                        related_model: field
                            .related_model
                            .as_ref()
                            .map(ToString::to_string)
                            .unwrap_or_default(),
                    }
                })
            }),
        }
    }

    /// Resolves every outstanding placeholder. The first failure aborts.
    ///
    /// # Errors
    ///
    /// Returns the first `SchemaError::UnresolvedRelationType`.
    pub fn finalize(&self) -> Result<(), SchemaError> {
        for deferred in &self.deferred {
            self.resolve(&GeneratedTypeRef::Deferred(Arc::clone(deferred)))?;
        }
        debug!(deferred = self.deferred.len(), "Type registry finalized");
        Ok(())
    }

    /// Number of placeholders that have not resolved yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.deferred.iter().filter(|d| d.get().is_none()).count()
    }

    /// Generated types registered under model keys, in registration order.
    pub fn model_types(&self) -> impl Iterator<Item = &Arc<GeneratedType>> {
        self.entries
            .iter()
            .filter(|((key, _), _)| matches!(key, RegistryKey::Model(_)))
            .filter_map(|(_, descriptor)| descriptor.as_generated())
    }

    /// Every generated type referenced by any entry.
    pub fn generated_types(&self) -> impl Iterator<Item = &Arc<GeneratedType>> {
        self.entries.values().filter_map(TypeDescriptor::as_generated)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::introspect;
    use modelgraph_storage::{FieldDefinition, ModelDefinition};

    fn user_fields() -> Vec<FieldDescriptor> {
        introspect(
            &ModelDefinition::new("User")
                .field(FieldDefinition::new("avatar", StorageKind::FilePath))
                .field(FieldDefinition::foreign_key("group", "Group")),
        )
        .unwrap()
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = TypeRegistry::new();
        let key = RegistryKey::kind(StorageKind::FilePath);
        assert!(registry.register(key.clone(), false, TypeDescriptor::scalar("String")).is_none());
        let old = registry.register(key.clone(), false, TypeDescriptor::scalar("Upload"));
        assert_eq!(old.unwrap().name(), "String");
        assert_eq!(registry.lookup(&key, false).unwrap().name(), "Upload");
        assert!(registry.lookup(&key, true).is_none());
    }

    #[test]
    fn test_lookup_order() {
        let fields = user_fields();
        let avatar = &fields[0];
        let mut registry = TypeRegistry::new();

        registry.register_override(RegistryKey::kind(StorageKind::FilePath), TypeDescriptor::scalar("Path"));
        assert_eq!(registry.lookup_field(avatar, false).unwrap().name(), "Path");

        registry.register_override(RegistryKey::field("avatar"), TypeDescriptor::scalar("Bare"));
        assert_eq!(registry.lookup_field(avatar, true).unwrap().name(), "Bare");

        registry.register_override(RegistryKey::field("User.avatar"), TypeDescriptor::scalar("Qualified"));
        assert_eq!(registry.lookup_field(avatar, false).unwrap().name(), "Qualified");
    }

    #[test]
    fn test_deferred_resolution() {
        let group = user_fields().remove(1);
        let mut registry = TypeRegistry::new();
        let type_ref = registry.defer(group, false);
        assert_eq!(registry.pending(), 1);

        let err = registry.finalize().unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnresolvedRelationType { ref field, ref related_model }
                if field == "User.group" && related_model == "Group"
        ));

        registry.register(RegistryKey::model("Group"), false, TypeDescriptor::scalar("GroupStub"));
        registry.finalize().unwrap();
        assert_eq!(registry.pending(), 0);
        assert_eq!(registry.resolve(&type_ref).unwrap().name(), "GroupStub");
    }
}
