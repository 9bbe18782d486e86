//! Delete mutation resolver.
//!
//! Handles `delete<Model>s(filters: [String!]): [ID!]!`. Without filters
//! every row of the model is deleted.

use async_graphql::Value;
use async_graphql::dynamic::{FieldFuture, FieldValue, ResolverContext};
use modelgraph_storage::{ModelId, RecordId};
use tracing::{debug, warn};

use super::{WriteOptions, get_graphql_context, read_query, storage_error};

/// Resolver for `delete<Model>s`.
pub struct DeleteResolver;

impl DeleteResolver {
    /// Creates a resolver deleting the selected `model` rows.
    ///
    /// Returns the ids captured before deletion.
    pub(crate) fn resolve(
        model: ModelId,
        options: WriteOptions,
    ) -> impl Fn(ResolverContext<'_>) -> FieldFuture<'_> + Send + Sync + Clone {
        move |ctx| {
            let model = model.clone();
            FieldFuture::new(async move {
                let gql_ctx = get_graphql_context(&ctx)?;
                let query = read_query(&ctx)?;
                if query.is_unfiltered() && options.warn_on_unfiltered_writes {
                    warn!(
                        model = %model,
                        request_id = %gql_ctx.request_id,
                        "Delete without filters applies to every row"
                    );
                }

                let ids: Vec<RecordId> = gql_ctx
                    .storage
                    .filter(&model, &query)
                    .await
                    .map_err(storage_error)?
                    .into_iter()
                    .map(|record| record.id)
                    .collect();

                if !ids.is_empty() {
                    let deleted = gql_ctx
                        .storage
                        .delete(&model, &ids)
                        .await
                        .map_err(storage_error)?;
                    debug!(model = %model, deleted, "Records deleted");
                }

                Ok(Some(FieldValue::list(
                    ids.into_iter().map(|id| FieldValue::value(Value::String(id))),
                )))
            })
        }
    }
}
