//! Field and operation naming across the storage/GraphQL boundary.
//!
//! Storage names are snake_case, GraphQL names camelCase. Every name placed
//! in the generated schema goes through [`graphql_field_name`].

use convert_case::{Case, Casing};
use modelgraph_storage::ModelId;

/// GraphQL name of a storage field (`group_id` -> `groupId`).
#[must_use]
pub fn graphql_field_name(name: &str) -> String {
    name.to_case(Case::Camel)
}

/// Storage name of a camelCase GraphQL name (`groupId` -> `group_id`).
///
/// Names without upper-case letters are returned unchanged.
#[must_use]
pub fn storage_field_name(name: &str) -> String {
    if name.chars().any(char::is_uppercase) {
        name.to_case(Case::Snake)
    } else {
        name.to_string()
    }
}

/// snake_case form of a model name (`UserProfile` -> `user_profile`).
#[must_use]
pub fn model_snake_name(model: &ModelId) -> String {
    model.as_str().to_case(Case::Snake)
}

/// Singular getter name (`UserProfile` -> `userProfile`).
#[must_use]
pub fn query_field_name(model: &ModelId) -> String {
    graphql_field_name(&model_snake_name(model))
}

/// Plural getter name (`User` -> `users`).
#[must_use]
pub fn list_field_name(model: &ModelId) -> String {
    graphql_field_name(&format!("{}s", model_snake_name(model)))
}

/// Mutation name for `verb` (`create`, `update`, `delete`) applied to `model`.
#[must_use]
pub fn mutation_field_name(verb: &str, model: &ModelId, plural: bool) -> String {
    let suffix = if plural { "s" } else { "" };
    graphql_field_name(&format!("{verb}_{}{suffix}", model_snake_name(model)))
}
