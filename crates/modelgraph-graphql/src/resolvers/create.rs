//! Create mutation resolvers.
//!
//! Handles `create<Model>(data: I!)` and `create<Model>s(data: [I!]!)`.
//! Each element is persisted on its own; a failing element leaves the ones
//! before it in place.

use std::sync::Arc;

use async_graphql::dynamic::{FieldFuture, FieldValue, ObjectAccessor, ResolverContext};
use async_graphql::Error;
use modelgraph_storage::{ModelStorage, Record};
use tracing::debug;

use super::input::{InputData, apply_relation_edits};
use super::{DATA_ARG, WriteOptions, get_graphql_context, storage_error};
use crate::context::GraphQLContext;
use crate::error::GraphQLError;
use crate::hooks::SaveHooks;
use crate::schema::GeneratedType;

/// Persists one payload and applies its relation edits, running the save
/// hooks around both.
async fn create_one(
    gql_ctx: &GraphQLContext,
    input_type: &GeneratedType,
    object: &ObjectAccessor<'_>,
    hooks: &SaveHooks,
) -> Result<Record, Error> {
    let storage: &dyn ModelStorage = gql_ctx.storage.as_ref();
    let mut data = InputData::collect(input_type, object)?;
    hooks
        .before_save(gql_ctx, &input_type.model, &mut data.values)
        .map_err(GraphQLError::into_graphql_error)?;

    let record = storage
        .create(&input_type.model, data.values)
        .await
        .map_err(storage_error)?;
    apply_relation_edits(storage, &input_type.model, &record.id, &data.edits).await?;
    debug!(model = %input_type.model, id = %record.id, "Record created");

    hooks.after_save(gql_ctx, &record);
    Ok(record)
}

/// Resolver for `create<Model>`.
pub struct CreateResolver;

impl CreateResolver {
    /// Creates a resolver persisting one `input_type` payload.
    pub fn resolve(
        input_type: Arc<GeneratedType>,
        hooks: SaveHooks,
    ) -> impl Fn(ResolverContext<'_>) -> FieldFuture<'_> + Send + Sync + Clone {
        move |ctx| {
            let input_type = Arc::clone(&input_type);
            let hooks = hooks.clone();
            FieldFuture::new(async move {
                debug!(model = %input_type.model, "Processing create mutation");
                let gql_ctx = get_graphql_context(&ctx)?;
                let data = ctx.args.try_get(DATA_ARG)?;
                let object = data.object()?;

                let record = create_one(gql_ctx, &input_type, &object, &hooks).await?;
                Ok(Some(FieldValue::owned_any(record)))
            })
        }
    }
}

/// Resolver for `create<Model>s`.
pub struct CreateBatchResolver;

impl CreateBatchResolver {
    /// Creates a resolver persisting a list of payloads in order.
    pub(crate) fn resolve(
        input_type: Arc<GeneratedType>,
        options: WriteOptions,
        hooks: SaveHooks,
    ) -> impl Fn(ResolverContext<'_>) -> FieldFuture<'_> + Send + Sync + Clone {
        move |ctx| {
            let input_type = Arc::clone(&input_type);
            let hooks = hooks.clone();
            FieldFuture::new(async move {
                let gql_ctx = get_graphql_context(&ctx)?;
                let data = ctx.args.try_get(DATA_ARG)?;
                let items = data.list()?;
                debug!(model = %input_type.model, count = items.len(), "Processing batch create");

                if options.max_batch_size > 0 && items.len() > options.max_batch_size {
                    return Err(GraphQLError::InvalidInput(format!(
                        "batch of {} exceeds the limit of {} items",
                        items.len(),
                        options.max_batch_size
                    ))
                    .into_graphql_error());
                }

                let mut records = Vec::with_capacity(items.len());
                for item in items.iter() {
                    let object = item.object()?;
                    records.push(create_one(gql_ctx, &input_type, &object, &hooks).await?);
                }

                Ok(Some(FieldValue::list(
                    records.into_iter().map(FieldValue::owned_any),
                )))
            })
        }
    }
}
