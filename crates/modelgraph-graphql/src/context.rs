//! GraphQL execution context.
//!
//! The context holds what resolvers need beyond the frozen schema: the
//! storage backend and a request id for log correlation. It is built per
//! request and injected into the request data.
//!
//! # Example
//!
//! ```ignore
//! use modelgraph_graphql::GraphQLContextBuilder;
//!
//! let context = GraphQLContextBuilder::new()
//!     .with_storage(storage.clone())
//!     .with_request_id("req-123")
//!     .build()?;
//! ```

use modelgraph_storage::DynStorage;

/// GraphQL execution context.
///
/// Cheap to clone; the storage is shared behind an `Arc`.
#[derive(Clone)]
pub struct GraphQLContext {
    /// Storage backend all resolvers talk to.
    pub storage: DynStorage,

    /// Request ID for tracing and correlation.
    pub request_id: String,
}

impl GraphQLContext {
    /// Creates a context with a fresh random request id.
    #[must_use]
    pub fn new(storage: DynStorage) -> Self {
        Self {
            storage,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Creates a new builder for GraphQLContext.
    #[must_use]
    pub fn builder() -> GraphQLContextBuilder {
        GraphQLContextBuilder::default()
    }
}

/// Builder for constructing GraphQLContext.
#[derive(Default)]
pub struct GraphQLContextBuilder {
    storage: Option<DynStorage>,
    request_id: Option<String>,
}

impl GraphQLContextBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the storage backend.
    #[must_use]
    pub fn with_storage(mut self, storage: DynStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the request ID.
    #[must_use]
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Builds the GraphQLContext.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<GraphQLContext, ContextBuilderError> {
        let storage = self
            .storage
            .ok_or(ContextBuilderError::MissingField("storage"))?;

        let request_id = self
            .request_id
            .ok_or(ContextBuilderError::MissingField("request_id"))?;

        Ok(GraphQLContext {
            storage,
            request_id,
        })
    }
}

/// Errors that can occur when building a GraphQLContext.
#[derive(Debug, thiserror::Error)]
pub enum ContextBuilderError {
    /// A required field was not provided.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use modelgraph_db_memory::InMemoryStorage;
    use modelgraph_storage::ModelCatalog;

    fn storage() -> DynStorage {
        Arc::new(InMemoryStorage::new(ModelCatalog::new()))
    }

    #[test]
    fn test_builder_missing_storage() {
        let result = GraphQLContextBuilder::new()
            .with_request_id("req-123")
            .build();

        assert!(matches!(
            result,
            Err(ContextBuilderError::MissingField("storage"))
        ));
    }

    #[test]
    fn test_builder_missing_request_id() {
        let result = GraphQLContext::builder().with_storage(storage()).build();
        assert!(matches!(
            result,
            Err(ContextBuilderError::MissingField("request_id"))
        ));
    }

    #[test]
    fn test_new_generates_request_id() {
        let a = GraphQLContext::new(storage());
        let b = GraphQLContext::new(storage());
        assert_eq!(a.request_id.len(), 36);
        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.storage.backend_name(), "memory");
    }
}
