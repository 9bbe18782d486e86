//! Caller-supplied hooks around generated resolvers.
//!
//! Hooks are registered per model on
//! [`ModelSchemaBuilder`](crate::ModelSchemaBuilder) and run synchronously
//! inside the resolver, with the request's [`GraphQLContext`].
//!
//! - pre-save: sees the column values of a create payload before it is
//!   persisted; may rewrite them or reject the write
//! - post-save: sees the persisted record after its relation edits
//! - list: post-processes the filtered, ordered rows of `<model>s`

use std::fmt;
use std::sync::Arc;

use modelgraph_storage::{ModelId, Record, ValueMap};

use crate::context::GraphQLContext;
use crate::error::GraphQLError;

/// Runs before a create payload is persisted. An `Err` aborts that write.
pub type PreSaveHook =
    Arc<dyn Fn(&GraphQLContext, &mut ValueMap) -> Result<(), String> + Send + Sync>;

/// Runs after a record and its relation edits are persisted.
pub type PostSaveHook = Arc<dyn Fn(&GraphQLContext, &Record) + Send + Sync>;

/// Replaces the rows returned by a list query.
pub type ListHook = Arc<dyn Fn(&GraphQLContext, Vec<Record>) -> Vec<Record> + Send + Sync>;

/// The save hooks of one model.
#[derive(Clone, Default)]
pub struct SaveHooks {
    /// Runs before `create`.
    pub pre_save: Option<PreSaveHook>,
    /// Runs after `create` and relation edits.
    pub post_save: Option<PostSaveHook>,
}

impl SaveHooks {
    /// Whether no hook is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pre_save.is_none() && self.post_save.is_none()
    }

    pub(crate) fn before_save(
        &self,
        ctx: &GraphQLContext,
        model: &ModelId,
        values: &mut ValueMap,
    ) -> Result<(), GraphQLError> {
        let Some(hook) = &self.pre_save else {
            return Ok(());
        };
        hook(ctx, values).map_err(|reason| GraphQLError::SaveRejected {
            model: model.to_string(),
            reason,
        })
    }

    pub(crate) fn after_save(&self, ctx: &GraphQLContext, record: &Record) {
        if let Some(hook) = &self.post_save {
            hook(ctx, record);
        }
    }
}

impl fmt::Debug for SaveHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveHooks")
            .field("pre_save", &self.pre_save.is_some())
            .field("post_save", &self.post_save.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgraph_db_memory::InMemoryStorage;
    use modelgraph_storage::ModelCatalog;
    use serde_json::json;

    fn context() -> GraphQLContext {
        GraphQLContext::new(Arc::new(InMemoryStorage::new(ModelCatalog::new())))
    }

    #[test]
    fn test_empty_hooks_pass_through() {
        let hooks = SaveHooks::default();
        assert!(hooks.is_empty());

        let mut values = ValueMap::new();
        values.insert("name".into(), json!("alice"));
        hooks
            .before_save(&context(), &ModelId::new("User"), &mut values)
            .unwrap();
        assert_eq!(values.get("name"), Some(&json!("alice")));
    }

    #[test]
    fn test_rejection_names_model() {
        let reject: PreSaveHook = Arc::new(|_, _| Err("read only".to_string()));
        let hooks = SaveHooks {
            pre_save: Some(reject),
            post_save: None,
        };
        let err = hooks
            .before_save(&context(), &ModelId::new("User"), &mut ValueMap::new())
            .unwrap_err();
        assert_eq!(err.error_code(), "SAVE_REJECTED");
        assert_eq!(err.to_string(), "Save of User rejected: read only");
        assert_eq!(format!("{hooks:?}"), "SaveHooks { pre_save: true, post_save: false }");
    }
}
