//! Single record read resolver.
//!
//! Implements `<model>(id: ID!)` query fields.

use async_graphql::dynamic::{FieldFuture, FieldValue, ResolverContext};
use modelgraph_storage::ModelId;
use tracing::debug;

use super::{get_graphql_context, id_string, storage_error};
use crate::error::GraphQLError;

/// Resolver for single record reads.
pub struct ReadResolver;

impl ReadResolver {
    /// Creates a resolver reading one `model` row by its `id` argument.
    ///
    /// A missing row is an error, not null.
    pub fn resolve(model: ModelId) -> impl Fn(ResolverContext<'_>) -> FieldFuture<'_> + Send + Sync + Clone {
        move |ctx| {
            let model = model.clone();
            FieldFuture::new(async move {
                let id = id_string(&ctx.args.try_get("id")?)?;
                debug!(model = %model, id = %id, "Resolving single record read");

                let gql_ctx = get_graphql_context(&ctx)?;
                let record = gql_ctx
                    .storage
                    .get(&model, &id)
                    .await
                    .map_err(storage_error)?
                    .ok_or_else(|| {
                        GraphQLError::NotFound {
                            model: model.to_string(),
                            id: id.clone(),
                        }
                        .into_graphql_error()
                    })?;

                Ok(Some(FieldValue::owned_any(record)))
            })
        }
    }
}
