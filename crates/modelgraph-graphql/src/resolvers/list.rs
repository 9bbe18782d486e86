//! List query resolver.
//!
//! Implements `<model>s(filters: [String!], orderBy: [String!])` query fields.

use async_graphql::dynamic::{FieldFuture, FieldValue, ResolverContext};
use modelgraph_storage::ModelId;
use tracing::debug;

use super::{get_graphql_context, read_query, storage_error};
use crate::hooks::ListHook;

/// Resolver for filtered, ordered list queries.
pub struct ListResolver;

impl ListResolver {
    /// Creates a resolver returning every matching `model` row.
    ///
    /// Rows are fully materialized before they are handed to field resolvers.
    /// `hook`, when set, sees the filtered, ordered rows and its result is
    /// returned instead.
    pub fn resolve(
        model: ModelId,
        hook: Option<ListHook>,
    ) -> impl Fn(ResolverContext<'_>) -> FieldFuture<'_> + Send + Sync + Clone {
        move |ctx| {
            let model = model.clone();
            let hook = hook.clone();
            FieldFuture::new(async move {
                let query = read_query(&ctx)?;
                let gql_ctx = get_graphql_context(&ctx)?;
                debug!(
                    model = %model,
                    request_id = %gql_ctx.request_id,
                    include = query.include.len(),
                    exclude = query.exclude.len(),
                    "Resolving list query"
                );

                let records = gql_ctx
                    .storage
                    .filter(&model, &query)
                    .await
                    .map_err(storage_error)?;
                let records = match &hook {
                    Some(hook) => hook(gql_ctx, records),
                    None => records,
                };

                Ok(Some(FieldValue::list(
                    records.into_iter().map(FieldValue::owned_any),
                )))
            })
        }
    }
}
