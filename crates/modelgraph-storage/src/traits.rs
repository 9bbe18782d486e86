//! Storage traits for the model storage abstraction layer.
//!
//! This module defines the capability interface every storage backend exposes
//! to the GraphQL layer.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::model::ModelId;
use crate::types::{QuerySpec, Record, RecordId, Related, RelationEditAction, ValueMap};

/// The main storage trait that all model storage backends must implement.
///
/// Resolvers only ever talk to storage through this trait, so traversal of
/// relations goes through [`get_related`](Self::get_related) rather than
/// through any attribute access on records. Implementations must be
/// thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use modelgraph_storage::{ModelStorage, ModelId, StorageError, Record};
///
/// async fn get_user(storage: &dyn ModelStorage, id: &str) -> Result<Record, StorageError> {
///     let model = ModelId::new("User");
///     storage
///         .get(&model, id)
///         .await?
///         .ok_or_else(|| StorageError::record_not_found("User", id))
/// }
/// ```
#[async_trait]
pub trait ModelStorage: Send + Sync {
    // ==================== Reads ====================

    /// Reads a single record by primary key.
    ///
    /// Returns `None` if the record does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ModelNotFound` for an unknown model.
    async fn get(&self, model: &ModelId, id: &str) -> Result<Option<Record>, StorageError>;

    /// Returns every record selected by `query`, fully materialized.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::FieldNotFound` when a predicate or ordering path
    /// names a field the model does not have.
    async fn filter(&self, model: &ModelId, query: &QuerySpec) -> Result<Vec<Record>, StorageError>;

    /// Follows relation `field` from `record`.
    ///
    /// For to-many relations `query` filters and orders the related rows; it
    /// is ignored for to-one relations.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::FieldNotFound` if `field` is not a relation.
    async fn get_related(
        &self,
        model: &ModelId,
        record: &Record,
        field: &str,
        query: &QuerySpec,
    ) -> Result<Related, StorageError>;

    // ==================== Writes ====================

    /// Persists a new record built from column values.
    ///
    /// Absent columns take their declared default, or null.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidValue` for unknown columns or missing
    /// required values.
    async fn create(&self, model: &ModelId, values: ValueMap) -> Result<Record, StorageError>;

    /// Applies `values` to every record in `ids` and returns the updated rows
    /// in the order of `ids`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::RecordNotFound` if an id does not exist.
    async fn update(
        &self,
        model: &ModelId,
        ids: &[RecordId],
        values: &ValueMap,
    ) -> Result<Vec<Record>, StorageError>;

    /// Deletes every record in `ids`, returning how many were removed.
    ///
    /// Links in many-to-many tables that reference a deleted row are dropped.
    async fn delete(&self, model: &ModelId, ids: &[RecordId]) -> Result<usize, StorageError>;

    /// Applies one add/set/remove edit to a to-many relation of record `id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::RecordNotFound` if the owner or a target does not
    /// exist.
    async fn edit_relation(
        &self,
        model: &ModelId,
        id: &str,
        field: &str,
        action: &RelationEditAction,
    ) -> Result<(), StorageError>;

    // ==================== Metadata ====================

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// Blocking counterpart of [`ModelStorage`] for backends doing synchronous I/O.
///
/// Wrap an implementation in [`BlockingStorage`](crate::BlockingStorage) to
/// use it from async resolvers.
pub trait SyncModelStorage: Send + Sync {
    fn get(&self, model: &ModelId, id: &str) -> Result<Option<Record>, StorageError>;

    fn filter(&self, model: &ModelId, query: &QuerySpec) -> Result<Vec<Record>, StorageError>;

    fn get_related(
        &self,
        model: &ModelId,
        record: &Record,
        field: &str,
        query: &QuerySpec,
    ) -> Result<Related, StorageError>;

    fn create(&self, model: &ModelId, values: ValueMap) -> Result<Record, StorageError>;

    fn update(
        &self,
        model: &ModelId,
        ids: &[RecordId],
        values: &ValueMap,
    ) -> Result<Vec<Record>, StorageError>;

    fn delete(&self, model: &ModelId, ids: &[RecordId]) -> Result<usize, StorageError>;

    fn edit_relation(
        &self,
        model: &ModelId,
        id: &str,
        field: &str,
        action: &RelationEditAction,
    ) -> Result<(), StorageError>;

    fn backend_name(&self) -> &'static str;
}
