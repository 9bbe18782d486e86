//! Shared fixtures: a Tag/Group/User catalog over the in-memory backend.

#![allow(dead_code)]

use std::sync::Arc;

use modelgraph_db_memory::InMemoryStorage;
use modelgraph_graphql::{
    GraphQLContext, ModelSchema, ModelSchemaBuilder, SchemaBuilderConfig, TypeDeclaration,
    TypeRegistry, declare_type,
};
use modelgraph_storage::{
    DynStorage, FieldDefinition, ModelCatalog, ModelDefinition, ModelId, ModelStorage,
    RelationEditAction, RelationEditKind, StorageKind, ValueMap,
};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

/// Routes logs to the test harness; `RUST_LOG=modelgraph_graphql=trace`
/// shows type generation decisions.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn catalog() -> ModelCatalog {
    ModelCatalog::new()
        .with_model(
            ModelDefinition::new("Tag")
                .field(FieldDefinition::auto_id("id"))
                .field(FieldDefinition::new("name", StorageKind::Char))
                .field(FieldDefinition::reverse_many_to_many("groups", "Group", "tags")),
        )
        .with_model(
            ModelDefinition::new("Group")
                .field(FieldDefinition::auto_id("id"))
                .field(FieldDefinition::new("name", StorageKind::Char))
                .field(FieldDefinition::many_to_many("tags", "Tag"))
                .field(FieldDefinition::reverse_many("users", "User", "group")),
        )
        .with_model(
            ModelDefinition::new("User")
                .field(FieldDefinition::auto_id("id"))
                .field(FieldDefinition::new("name", StorageKind::Char))
                .field(FieldDefinition::new("age", StorageKind::Integer).nullable())
                .field(FieldDefinition::foreign_key("group", "Group").nullable()),
        )
}

pub fn model(catalog: &ModelCatalog, name: &str) -> ModelDefinition {
    catalog
        .get(&ModelId::new(name))
        .cloned()
        .unwrap_or_else(|| panic!("model {name} missing from fixture"))
}

/// Declares output and input types for every model, `User` first so its
/// `group` relation starts out deferred.
pub fn build_schema(catalog: &ModelCatalog, config: SchemaBuilderConfig) -> ModelSchema {
    schema_builder(catalog, config).build().unwrap()
}

/// The builder behind [`build_schema`], for tests that add hooks first.
pub fn schema_builder(catalog: &ModelCatalog, config: SchemaBuilderConfig) -> ModelSchemaBuilder {
    init_tracing();
    let mut registry = TypeRegistry::new();
    let mut builder_types = Vec::new();
    for name in ["User", "Group", "Tag"] {
        let definition = model(catalog, name);
        let output = declare_type(&mut registry, TypeDeclaration::output(&definition)).unwrap();
        let input = declare_type(&mut registry, TypeDeclaration::input(&definition)).unwrap();
        builder_types.push((input, output));
    }

    let mut builder = ModelSchemaBuilder::new(registry, config);
    for (input, output) in builder_types {
        builder = builder
            .query_type(Arc::clone(&output))
            .mutation_types(input, output);
    }
    builder
}

fn values(pairs: Value) -> ValueMap {
    pairs.as_object().cloned().unwrap_or_default()
}

/// Tags `rust`, `go`, `zig`; group `admins` tagged rust and go, group
/// `guests` untagged; users alice (admins, 30) and bob (no group, 25).
pub async fn seeded_storage(catalog: ModelCatalog) -> DynStorage {
    let storage = InMemoryStorage::new(catalog);
    let tag = ModelId::new("Tag");
    let group = ModelId::new("Group");
    let user = ModelId::new("User");

    for name in ["rust", "go", "zig"] {
        storage.create(&tag, values(json!({ "name": name }))).await.unwrap();
    }
    storage.create(&group, values(json!({ "name": "admins" }))).await.unwrap();
    storage.create(&group, values(json!({ "name": "guests" }))).await.unwrap();
    storage
        .edit_relation(
            &group,
            "1",
            "tags",
            &RelationEditAction::new(RelationEditKind::Add, vec!["1".into(), "2".into()]),
        )
        .await
        .unwrap();
    storage
        .create(&user, values(json!({ "name": "alice", "age": 30, "group_id": 1 })))
        .await
        .unwrap();
    storage
        .create(&user, values(json!({ "name": "bob", "age": 25 })))
        .await
        .unwrap();

    Arc::new(storage)
}

/// Runs `query` and returns its data, failing on any GraphQL error.
pub async fn run(schema: &ModelSchema, storage: &DynStorage, query: &str) -> Value {
    let response = schema
        .execute(query, GraphQLContext::new(Arc::clone(storage)))
        .await;
    assert!(
        response.errors.is_empty(),
        "unexpected errors for {query}: {:?}",
        response.errors
    );
    response.data.into_json().unwrap()
}

/// Runs `query` and returns the `code` extension of its first error.
pub async fn error_code(schema: &ModelSchema, storage: &DynStorage, query: &str) -> String {
    let response = schema
        .execute(query, GraphQLContext::new(Arc::clone(storage)))
        .await;
    let error = response
        .errors
        .first()
        .unwrap_or_else(|| panic!("expected an error for {query}"));
    match error.extensions.as_ref().and_then(|e| e.get("code")) {
        Some(async_graphql::Value::String(code)) => code.clone(),
        other => panic!("error {} has no code: {other:?}", error.message),
    }
}
