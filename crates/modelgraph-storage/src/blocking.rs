//! Async adapter for synchronous storage backends.
//!
//! Every call is moved onto tokio's blocking pool so a backend doing blocking
//! I/O never stalls the executor running GraphQL resolvers.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinError;

use crate::error::StorageError;
use crate::model::ModelId;
use crate::traits::{ModelStorage, SyncModelStorage};
use crate::types::{QuerySpec, Record, RecordId, Related, RelationEditAction, ValueMap};

/// Wraps a [`SyncModelStorage`] as a [`ModelStorage`].
pub struct BlockingStorage<S> {
    inner: Arc<S>,
}

impl<S> BlockingStorage<S>
where
    S: SyncModelStorage + 'static,
{
    /// Wraps a synchronous backend.
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns the wrapped backend.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> Result<T, StorageError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(join_error)?
    }
}

fn join_error(err: JoinError) -> StorageError {
    tracing::warn!(error = %err, "Blocking storage task failed");
    StorageError::TaskJoin {
        message: err.to_string(),
    }
}

#[async_trait]
impl<S> ModelStorage for BlockingStorage<S>
where
    S: SyncModelStorage + 'static,
{
    async fn get(&self, model: &ModelId, id: &str) -> Result<Option<Record>, StorageError> {
        let (model, id) = (model.clone(), id.to_string());
        self.run(move |s| s.get(&model, &id)).await
    }

    async fn filter(&self, model: &ModelId, query: &QuerySpec) -> Result<Vec<Record>, StorageError> {
        let (model, query) = (model.clone(), query.clone());
        self.run(move |s| s.filter(&model, &query)).await
    }

    async fn get_related(
        &self,
        model: &ModelId,
        record: &Record,
        field: &str,
        query: &QuerySpec,
    ) -> Result<Related, StorageError> {
        let (model, record, field, query) =
            (model.clone(), record.clone(), field.to_string(), query.clone());
        self.run(move |s| s.get_related(&model, &record, &field, &query))
            .await
    }

    async fn create(&self, model: &ModelId, values: ValueMap) -> Result<Record, StorageError> {
        let model = model.clone();
        self.run(move |s| s.create(&model, values)).await
    }

    async fn update(
        &self,
        model: &ModelId,
        ids: &[RecordId],
        values: &ValueMap,
    ) -> Result<Vec<Record>, StorageError> {
        let (model, ids, values) = (model.clone(), ids.to_vec(), values.clone());
        self.run(move |s| s.update(&model, &ids, &values)).await
    }

    async fn delete(&self, model: &ModelId, ids: &[RecordId]) -> Result<usize, StorageError> {
        let (model, ids) = (model.clone(), ids.to_vec());
        self.run(move |s| s.delete(&model, &ids)).await
    }

    async fn edit_relation(
        &self,
        model: &ModelId,
        id: &str,
        field: &str,
        action: &RelationEditAction,
    ) -> Result<(), StorageError> {
        let (model, id, field, action) =
            (model.clone(), id.to_string(), field.to_string(), action.clone());
        self.run(move |s| s.edit_relation(&model, &id, &field, &action))
            .await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Append-only single-table backend.
    #[derive(Default)]
    struct CountingStorage {
        created: Mutex<Vec<ValueMap>>,
    }

    impl SyncModelStorage for CountingStorage {
        fn get(&self, model: &ModelId, id: &str) -> Result<Option<Record>, StorageError> {
            let created = self.created.lock().map_err(|e| StorageError::backend(e.to_string()))?;
            let index: usize = id.parse().map_err(|_| StorageError::invalid_value("id", id))?;
            Ok(created
                .get(index)
                .map(|values| Record::new(model.clone(), id, values.clone())))
        }

        fn filter(&self, _model: &ModelId, _query: &QuerySpec) -> Result<Vec<Record>, StorageError> {
            Ok(Vec::new())
        }

        fn get_related(
            &self,
            model: &ModelId,
            _record: &Record,
            field: &str,
            _query: &QuerySpec,
        ) -> Result<Related, StorageError> {
            Err(StorageError::field_not_found(model.as_str(), field))
        }

        fn create(&self, model: &ModelId, values: ValueMap) -> Result<Record, StorageError> {
            let mut created = self.created.lock().map_err(|e| StorageError::backend(e.to_string()))?;
            created.push(values.clone());
            Ok(Record::new(model.clone(), (created.len() - 1).to_string(), values))
        }

        fn update(
            &self,
            _model: &ModelId,
            _ids: &[RecordId],
            _values: &ValueMap,
        ) -> Result<Vec<Record>, StorageError> {
            Ok(Vec::new())
        }

        fn delete(&self, _model: &ModelId, ids: &[RecordId]) -> Result<usize, StorageError> {
            Ok(ids.len())
        }

        fn edit_relation(
            &self,
            _model: &ModelId,
            _id: &str,
            _field: &str,
            _action: &RelationEditAction,
        ) -> Result<(), StorageError> {
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_blocking_roundtrip() {
        let storage = BlockingStorage::new(CountingStorage::default());
        let model = ModelId::new("Tag");

        let mut values = ValueMap::new();
        values.insert("name".into(), "rust".into());
        let created = storage.create(&model, values).await.unwrap();
        assert_eq!(created.id, "0");

        let fetched = storage.get(&model, "0").await.unwrap().unwrap();
        assert_eq!(fetched.get("name"), Some(&serde_json::json!("rust")));
        assert!(storage.get(&model, "5").await.unwrap().is_none());
        assert_eq!(storage.backend_name(), "counting");
    }

    #[tokio::test]
    async fn test_blocking_errors_propagate() {
        let storage = BlockingStorage::new(CountingStorage::default());
        let model = ModelId::new("Tag");

        let err = storage.get(&model, "abc").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidValue { .. }));

        let record = Record::new(model.clone(), "0", ValueMap::new());
        let err = storage
            .get_related(&model, &record, "owner", &QuerySpec::all())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Field not found: Tag.owner");
    }
}
