//! Relation field resolvers.
//!
//! Relation fields traverse storage through `ModelStorage::get_related`.
//! When a relation is overridden to a scalar type the resolver returns the
//! related keys instead of objects.

use async_graphql::Value;
use async_graphql::dynamic::{FieldFuture, FieldValue, ResolverContext};
use modelgraph_storage::{QuerySpec, Record};
use tracing::trace;

use super::{get_graphql_context, parent_record, read_query, storage_error};
use crate::schema::RelationHook;

/// Resolvers for relation fields of generated object types.
pub struct RelationResolver;

fn to_field_value(record: Record, keys_only: bool) -> FieldValue<'static> {
    if keys_only {
        FieldValue::value(Value::String(record.id))
    } else {
        FieldValue::owned_any(record)
    }
}

impl RelationResolver {
    /// Follows a to-one relation. An empty link resolves to null.
    pub fn single(
        field: String,
        keys_only: bool,
    ) -> impl Fn(ResolverContext<'_>) -> FieldFuture<'_> + Send + Sync + Clone {
        move |ctx| {
            let field = field.clone();
            FieldFuture::new(async move {
                let parent = parent_record(&ctx)?;
                let gql_ctx = get_graphql_context(&ctx)?;
                trace!(model = %parent.model, id = %parent.id, field = %field, "Resolving relation");

                let related = gql_ctx
                    .storage
                    .get_related(&parent.model, parent, &field, &QuerySpec::all())
                    .await
                    .map_err(storage_error)?;

                Ok(related
                    .into_records()
                    .into_iter()
                    .next()
                    .map(|record| to_field_value(record, keys_only)))
            })
        }
    }

    /// Follows a to-many relation, applying the `filters` and `orderBy`
    /// arguments and then `hook`.
    pub fn collection(
        field: String,
        hook: Option<RelationHook>,
        keys_only: bool,
    ) -> impl Fn(ResolverContext<'_>) -> FieldFuture<'_> + Send + Sync + Clone {
        move |ctx| {
            let field = field.clone();
            let hook = hook.clone();
            FieldFuture::new(async move {
                let query = read_query(&ctx)?;
                let parent = parent_record(&ctx)?;
                let gql_ctx = get_graphql_context(&ctx)?;
                trace!(
                    model = %parent.model,
                    id = %parent.id,
                    field = %field,
                    "Resolving relation collection"
                );

                let mut records = gql_ctx
                    .storage
                    .get_related(&parent.model, parent, &field, &query)
                    .await
                    .map_err(storage_error)?
                    .into_records();
                if let Some(hook) = &hook {
                    records = hook(parent, records);
                }

                Ok(Some(FieldValue::list(
                    records
                        .into_iter()
                        .map(|record| to_field_value(record, keys_only)),
                )))
            })
        }
    }
}
