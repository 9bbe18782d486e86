//! Resolvers for the generated schema.
//!
//! - `read` / `list`: the `<model>` and `<model>s` query fields
//! - `field` / `relation`: fields of generated object types
//! - `create` / `update` / `delete`: the generated mutations
//!
//! Records travel between resolvers as `FieldValue::owned_any(Record)`; only
//! leaf values are converted to GraphQL values.

mod create;
mod delete;
mod field;
mod input;
mod list;
mod read;
mod relation;
mod update;

pub use create::{CreateBatchResolver, CreateResolver};
pub use delete::DeleteResolver;
pub use field::FieldResolver;
pub use list::ListResolver;
pub use read::ReadResolver;
pub use relation::RelationResolver;
pub use update::UpdateResolver;

use async_graphql::dynamic::{ResolverContext, ValueAccessor};
use async_graphql::{Error, Value};
use modelgraph_storage::{QuerySpec, Record, StorageError};
use tracing::warn;

use crate::context::GraphQLContext;
use crate::error::GraphQLError;
use crate::filters::{parse_filters, parse_order_by};

/// Argument carrying filter clauses.
pub const FILTERS_ARG: &str = "filters";
/// Argument carrying ordering keys.
pub const ORDER_BY_ARG: &str = "orderBy";
/// Argument carrying mutation payloads.
pub const DATA_ARG: &str = "data";

/// Write limits shared by the mutation resolvers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WriteOptions {
    /// Largest accepted `create<Model>s` payload; 0 means unlimited.
    pub max_batch_size: usize,
    /// Warn when update/delete run without filters.
    pub warn_on_unfiltered_writes: bool,
}

/// Helper to extract GraphQL context from resolver context.
pub(crate) fn get_graphql_context<'a>(
    ctx: &'a ResolverContext<'_>,
) -> Result<&'a GraphQLContext, Error> {
    ctx.data::<GraphQLContext>()
        .map_err(|_| GraphQLError::MissingContext.into_graphql_error())
}

/// The record a field resolver runs on.
pub(crate) fn parent_record<'a>(ctx: &'a ResolverContext<'_>) -> Result<&'a Record, Error> {
    ctx.parent_value.try_downcast_ref::<Record>()
}

/// Logs a storage failure and converts it for the response.
pub(crate) fn storage_error(error: StorageError) -> Error {
    warn!(error = %error, category = %error.category(), "Storage operation failed");
    GraphQLError::from(error).into_graphql_error()
}

/// Reads an optional `[String!]` argument; absent and null give an empty list.
pub(crate) fn string_list_arg(ctx: &ResolverContext<'_>, name: &str) -> Result<Vec<String>, Error> {
    let Some(value) = ctx.args.get(name) else {
        return Ok(Vec::new());
    };
    if value.is_null() {
        return Ok(Vec::new());
    }
    value
        .list()?
        .iter()
        .map(|item| item.string().map(str::to_string))
        .collect()
}

/// Builds the storage query from the `filters` and `orderBy` arguments.
pub(crate) fn read_query(ctx: &ResolverContext<'_>) -> Result<QuerySpec, Error> {
    let filters = string_list_arg(ctx, FILTERS_ARG)?;
    let order_by = string_list_arg(ctx, ORDER_BY_ARG)?;
    let set = parse_filters(&filters).map_err(GraphQLError::into_graphql_error)?;
    Ok(set.into_query(parse_order_by(&order_by)))
}

/// Reads an `ID` value, which clients may send as a string or an integer.
pub(crate) fn id_string(value: &ValueAccessor<'_>) -> Result<String, Error> {
    match value.as_value() {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(GraphQLError::InvalidInput(format!("expected an ID, got {other}"))
            .into_graphql_error()),
    }
}

/// Renders a stored key as an `ID` string.
pub(crate) fn json_id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Convert a serde_json::Value to async_graphql::Value.
pub(crate) fn json_to_graphql_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(async_graphql::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => {
            Value::List(arr.into_iter().map(json_to_graphql_value).collect())
        }
        serde_json::Value::Object(obj) => {
            let map: async_graphql::indexmap::IndexMap<async_graphql::Name, Value> = obj
                .into_iter()
                .map(|(k, v)| (async_graphql::Name::new(k), json_to_graphql_value(v)))
                .collect();
            Value::Object(map)
        }
    }
}

/// Converts a GraphQL Value to serde_json::Value.
pub(crate) fn graphql_value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                serde_json::Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
        }
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Enum(e) => serde_json::Value::String(e.to_string()),
        Value::List(items) => {
            serde_json::Value::Array(items.iter().map(graphql_value_to_json).collect())
        }
        Value::Object(obj) => serde_json::Value::Object(
            obj.iter()
                .map(|(k, v)| (k.to_string(), graphql_value_to_json(v)))
                .collect(),
        ),
        Value::Binary(bytes) => {
            serde_json::Value::Array(bytes.iter().map(|b| serde_json::Value::from(*b)).collect())
        }
    }
}
