//! Integration tests for generated mutations.

mod common;

use modelgraph_graphql::SchemaBuilderConfig;
use serde_json::json;

use common::{build_schema, catalog, error_code, run, seeded_storage};

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_with_foreign_key() {
    let schema = build_schema(&catalog(), SchemaBuilderConfig::default());
    let storage = seeded_storage(catalog()).await;

    let data = run(
        &schema,
        &storage,
        r#"mutation { createUser(data: { name: "carol", groupId: "2" }) { id name age group { name } } }"#,
    )
    .await;

    assert_eq!(
        data,
        json!({
            "createUser": { "id": "3", "name": "carol", "age": null, "group": { "name": "guests" } }
        })
    );
}

#[tokio::test]
async fn test_required_input_field_is_enforced() {
    let schema = build_schema(&catalog(), SchemaBuilderConfig::default());
    let storage = seeded_storage(catalog()).await;

    let response = schema
        .execute(
            r#"mutation { createUser(data: { age: 3 }) { id } }"#,
            modelgraph_graphql::GraphQLContext::new(storage.clone()),
        )
        .await;
    assert!(!response.errors.is_empty());

    let data = run(&schema, &storage, "{ users { name } }").await;
    assert_eq!(data["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_relation_edits_apply_add_set_remove() {
    let schema = build_schema(&catalog(), SchemaBuilderConfig::default());
    let storage = seeded_storage(catalog()).await;

    let data = run(
        &schema,
        &storage,
        r#"mutation {
            createGroup(data: {
                name: "ops"
                tagsRemove: ["2"]
                tagsSet: ["3"]
                tagsAdd: ["1", "2"]
            }) { name tags { id } }
        }"#,
    )
    .await;

    assert_eq!(
        data,
        json!({ "createGroup": { "name": "ops", "tags": [{ "id": "3" }] } })
    );
}

#[tokio::test]
async fn test_batch_create() {
    let schema = build_schema(&catalog(), SchemaBuilderConfig::default());
    let storage = seeded_storage(catalog()).await;

    let data = run(
        &schema,
        &storage,
        r#"mutation { createTags(data: [{ name: "c" }, { name: "java" }]) { id name } }"#,
    )
    .await;
    assert_eq!(
        data,
        json!({ "createTags": [{ "id": "4", "name": "c" }, { "id": "5", "name": "java" }] })
    );
}

#[tokio::test]
async fn test_batch_limit() {
    let config = SchemaBuilderConfig {
        max_batch_size: 1,
        ..Default::default()
    };
    let schema = build_schema(&catalog(), config);
    let storage = seeded_storage(catalog()).await;

    let code = error_code(
        &schema,
        &storage,
        r#"mutation { createTags(data: [{ name: "c" }, { name: "java" }]) { id } }"#,
    )
    .await;
    assert_eq!(code, "INVALID_INPUT");

    let data = run(&schema, &storage, "{ tags { name } }").await;
    assert_eq!(data["tags"].as_array().unwrap().len(), 3);
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn test_update_without_filters_touches_every_row() {
    let schema = build_schema(&catalog(), SchemaBuilderConfig::default());
    let storage = seeded_storage(catalog()).await;

    let data = run(
        &schema,
        &storage,
        r#"mutation { updateUsers(data: { age: 40 }) { name age } }"#,
    )
    .await;
    assert_eq!(
        data,
        json!({ "updateUsers": [{ "name": "alice", "age": 40 }, { "name": "bob", "age": 40 }] })
    );
}

#[tokio::test]
async fn test_update_filtered_rows_and_null() {
    let schema = build_schema(&catalog(), SchemaBuilderConfig::default());
    let storage = seeded_storage(catalog()).await;

    let data = run(
        &schema,
        &storage,
        r#"mutation {
            updateUsers(data: { age: null, groupId: "2" }, filters: ["name='alice'"]) {
                name age group { name }
            }
        }"#,
    )
    .await;
    assert_eq!(
        data,
        json!({ "updateUsers": [{ "name": "alice", "age": null, "group": { "name": "guests" } }] })
    );

    let data = run(&schema, &storage, r#"{ user(id: "2") { age } }"#).await;
    assert_eq!(data, json!({ "user": { "age": 25 } }));
}

#[tokio::test]
async fn test_update_relation_edits_only() {
    let schema = build_schema(&catalog(), SchemaBuilderConfig::default());
    let storage = seeded_storage(catalog()).await;

    run(
        &schema,
        &storage,
        r#"mutation { updateGroups(data: { tagsRemove: ["1"] }, filters: ["id=1"]) { name } }"#,
    )
    .await;

    let data = run(&schema, &storage, r#"{ group(id: "1") { tags { name } } }"#).await;
    assert_eq!(data, json!({ "group": { "tags": [{ "name": "go" }] } }));
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_returns_ids() {
    let schema = build_schema(&catalog(), SchemaBuilderConfig::default());
    let storage = seeded_storage(catalog()).await;

    let data = run(
        &schema,
        &storage,
        r#"mutation { deleteUsers(filters: ["name='bob'"]) }"#,
    )
    .await;
    assert_eq!(data, json!({ "deleteUsers": ["2"] }));

    let data = run(&schema, &storage, "{ users { name } }").await;
    assert_eq!(data, json!({ "users": [{ "name": "alice" }] }));
}

#[tokio::test]
async fn test_delete_without_filters_removes_everything() {
    let schema = build_schema(&catalog(), SchemaBuilderConfig::default());
    let storage = seeded_storage(catalog()).await;

    let data = run(&schema, &storage, "mutation { deleteTags }").await;
    assert_eq!(data, json!({ "deleteTags": ["1", "2", "3"] }));

    let data = run(&schema, &storage, r#"{ group(id: "1") { tags { name } } }"#).await;
    assert_eq!(data, json!({ "group": { "tags": [] } }));
}
