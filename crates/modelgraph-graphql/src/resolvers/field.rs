//! Attribute and computed field resolvers.

use async_graphql::dynamic::{FieldFuture, FieldValue, ResolverContext};

use super::{json_id_string, json_to_graphql_value, parent_record};
use crate::schema::ComputedFn;

/// Resolvers reading values off the parent record.
pub struct FieldResolver;

impl FieldResolver {
    /// Reads `column` from the parent record. `ID` fields are rendered as
    /// strings.
    pub fn attribute(
        column: String,
        is_id: bool,
    ) -> impl Fn(ResolverContext<'_>) -> FieldFuture<'_> + Send + Sync + Clone {
        move |ctx| {
            let column = column.clone();
            FieldFuture::new(async move {
                let record = parent_record(&ctx)?;
                let Some(value) = record.get(&column) else {
                    return Ok(None);
                };
                let value = if is_id {
                    json_id_string(value).map(serde_json::Value::String)
                } else {
                    Some(value.clone())
                };
                Ok(value.map(|v| FieldValue::value(json_to_graphql_value(v))))
            })
        }
    }

    /// Calls `compute` on the parent record.
    pub fn computed(compute: ComputedFn) -> impl Fn(ResolverContext<'_>) -> FieldFuture<'_> + Send + Sync + Clone {
        move |ctx| {
            let compute = compute.clone();
            FieldFuture::new(async move {
                let record = parent_record(&ctx)?;
                match compute(record) {
                    serde_json::Value::Null => Ok(None),
                    value => Ok(Some(FieldValue::value(json_to_graphql_value(value)))),
                }
            })
        }
    }
}
