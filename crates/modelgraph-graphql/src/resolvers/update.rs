//! Update mutation resolver.
//!
//! Handles `update<Model>s(data: P!, filters: [String!])`. Without filters
//! every row of the model is updated.

use std::sync::Arc;

use async_graphql::dynamic::{FieldFuture, FieldValue, ResolverContext};
use modelgraph_storage::RecordId;
use tracing::{debug, warn};

use super::input::{InputData, apply_relation_edits};
use super::{DATA_ARG, WriteOptions, get_graphql_context, read_query, storage_error};
use crate::schema::GeneratedType;

/// Resolver for `update<Model>s`.
pub struct UpdateResolver;

impl UpdateResolver {
    /// Creates a resolver applying a `partial_type` payload to every
    /// selected row, then its relation edits row by row.
    ///
    /// Returns the updated rows in selection order.
    pub(crate) fn resolve(
        partial_type: Arc<GeneratedType>,
        options: WriteOptions,
    ) -> impl Fn(ResolverContext<'_>) -> FieldFuture<'_> + Send + Sync + Clone {
        move |ctx| {
            let partial_type = Arc::clone(&partial_type);
            FieldFuture::new(async move {
                let model = &partial_type.model;
                let gql_ctx = get_graphql_context(&ctx)?;
                let data = ctx.args.try_get(DATA_ARG)?;
                let data = InputData::collect(&partial_type, &data.object()?)?;
                let query = read_query(&ctx)?;

                if query.is_unfiltered() && options.warn_on_unfiltered_writes {
                    warn!(
                        model = %model,
                        request_id = %gql_ctx.request_id,
                        "Update without filters applies to every row"
                    );
                }

                let storage = gql_ctx.storage.as_ref();
                let selected = storage.filter(model, &query).await.map_err(storage_error)?;
                let ids: Vec<RecordId> = selected.iter().map(|r| r.id.clone()).collect();
                debug!(model = %model, rows = ids.len(), "Processing update mutation");

                let records = if data.values.is_empty() || ids.is_empty() {
                    selected
                } else {
                    storage
                        .update(model, &ids, &data.values)
                        .await
                        .map_err(storage_error)?
                };

                if data.has_edits() {
                    for id in &ids {
                        apply_relation_edits(storage, model, id, &data.edits).await?;
                    }
                }

                Ok(Some(FieldValue::list(
                    records.into_iter().map(FieldValue::owned_any),
                )))
            })
        }
    }
}
