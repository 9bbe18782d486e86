//! Error types for schema generation and GraphQL operations.
//!
//! [`SchemaError`] covers everything that can go wrong while assembling the
//! schema; those errors are fatal to startup. [`GraphQLError`] is raised per
//! request and converted to an `async_graphql::Error` carrying a stable code
//! in its extensions.

use async_graphql::ErrorExtensions;
use modelgraph_storage::StorageError;

/// Errors raised while building types, the registry or the final schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The model metadata could not be reflected.
    #[error("Cannot introspect model {model}: {reason}")]
    ModelIntrospection {
        /// The model being introspected.
        model: String,
        /// What is wrong with its metadata.
        reason: String,
    },

    /// A selected field does not exist on the model.
    #[error("Unknown field {field} on model {model}")]
    UnknownField {
        /// The model the selection was made on.
        model: String,
        /// The unknown field name.
        field: String,
    },

    /// No GraphQL type could be found for a non-relation field.
    #[error("No GraphQL type for field {model}.{field} (storage kind {kind})")]
    UnmappedFieldType {
        /// The owning model.
        model: String,
        /// The field name.
        field: String,
        /// The storage kind that has no mapping.
        kind: String,
    },

    /// A relation field points at a model with no declared type.
    #[error("Unresolved relation type for field {field}: no type declared for model {related_model}")]
    UnresolvedRelationType {
        /// `Model.field` of the relation.
        field: String,
        /// The related model lacking a type.
        related_model: String,
    },

    /// Configuration values are invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The execution engine rejected the assembled schema.
    #[error("Failed to build GraphQL schema: {0}")]
    SchemaBuildFailed(String),
}

/// Errors that can occur while executing a generated operation.
#[derive(Debug, thiserror::Error)]
pub enum GraphQLError {
    /// The singular getter found no row.
    #[error("{model} matching query does not exist: id {id}")]
    NotFound {
        /// Model queried.
        model: String,
        /// Requested primary key.
        id: String,
    },

    /// A filter clause has no `=`.
    #[error("Malformed filter clause {clause:?}: expected <field>[!]=<value>")]
    MalformedFilter {
        /// The offending clause.
        clause: String,
    },

    /// A filter literal could not be parsed.
    #[error("Invalid value in filter clause {clause:?}: {reason}")]
    InvalidFilterValue {
        /// The offending clause.
        clause: String,
        /// Why the literal was rejected.
        reason: String,
    },

    /// Mutation input could not be interpreted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A pre-save hook refused the payload.
    #[error("Save of {model} rejected: {reason}")]
    SaveRejected {
        /// Model being written.
        model: String,
        /// Reason given by the hook.
        reason: String,
    },

    /// The request was executed without a [`GraphQLContext`](crate::GraphQLContext).
    #[error("GraphQL context not available")]
    MissingContext,

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl GraphQLError {
    /// Returns the error code for GraphQL error extensions.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::MalformedFilter { .. } => "MALFORMED_FILTER",
            Self::InvalidFilterValue { .. } => "INVALID_FILTER_VALUE",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::SaveRejected { .. } => "SAVE_REJECTED",
            Self::MissingContext => "INTERNAL_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Converts into an `async_graphql::Error` with `code` and identity fields
    /// set in the extensions.
    #[must_use]
    pub fn into_graphql_error(self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| {
            e.set("code", self.error_code());
            match &self {
                Self::NotFound { model, id } => {
                    e.set("model", model.as_str());
                    e.set("id", id.as_str());
                }
                Self::MalformedFilter { clause } | Self::InvalidFilterValue { clause, .. } => {
                    e.set("clause", clause.as_str());
                }
                Self::SaveRejected { model, .. } => e.set("model", model.as_str()),
                Self::Storage(err) => e.set("category", err.category().to_string()),
                Self::InvalidInput(_) | Self::MissingContext => {}
            }
        })
    }
}

impl From<StorageError> for GraphQLError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::RecordNotFound { model, id } => Self::NotFound { model, id },
            other => Self::Storage(other),
        }
    }
}
