//! Implementation of the ModelStorage trait for InMemoryStorage.

use async_trait::async_trait;

use modelgraph_storage::{
    ModelId, ModelStorage, QuerySpec, Record, RecordId, Related, RelationEditAction,
    StorageError, ValueMap,
};

use crate::query::QueryContext;
use crate::storage::{InMemoryStorage, to_record};

#[async_trait]
impl ModelStorage for InMemoryStorage {
    async fn get(&self, model: &ModelId, id: &str) -> Result<Option<Record>, StorageError> {
        self.model(model)?;
        let tables = self.tables.read().await;
        Ok(tables
            .rows
            .get(model)
            .and_then(|rows| rows.get(id))
            .map(|values| to_record(model, id, values)))
    }

    async fn filter(&self, model: &ModelId, query: &QuerySpec) -> Result<Vec<Record>, StorageError> {
        let definition = self.model(model)?;
        let tables = self.tables.read().await;
        let ctx = QueryContext::new(&self.catalog, &tables);

        let candidates: Vec<RecordId> = tables
            .rows
            .get(model)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default();
        let selected = ctx.select(definition, candidates, query)?;

        Ok(selected
            .iter()
            .filter_map(|id| ctx.row(model, id).map(|values| to_record(model, id, values)))
            .collect())
    }

    async fn get_related(
        &self,
        model: &ModelId,
        record: &Record,
        field: &str,
        query: &QuerySpec,
    ) -> Result<Related, StorageError> {
        let definition = self.model(model)?;
        let field_def = definition
            .get_field(field)
            .filter(|f| f.is_relation())
            .ok_or_else(|| StorageError::field_not_found(model.as_str(), field))?;

        let tables = self.tables.read().await;
        let ctx = QueryContext::new(&self.catalog, &tables);
        let related = ctx.related_model(definition, field_def)?;
        let ids = ctx.related_ids(definition, field_def, &record.id, &record.values)?;

        if field_def.relation.is_to_one() {
            let first = ids
                .first()
                .and_then(|id| ctx.row(&related.id, id).map(|values| to_record(&related.id, id, values)));
            return Ok(Related::One(first));
        }

        let selected = ctx.select(related, ids, query)?;
        Ok(Related::Many(
            selected
                .iter()
                .filter_map(|id| {
                    ctx.row(&related.id, id)
                        .map(|values| to_record(&related.id, id, values))
                })
                .collect(),
        ))
    }

    async fn create(&self, model: &ModelId, values: ValueMap) -> Result<Record, StorageError> {
        let definition = self.model(model)?;
        let mut tables = self.tables.write().await;
        tables.create(&self.catalog, definition, &values)
    }

    async fn update(
        &self,
        model: &ModelId,
        ids: &[RecordId],
        values: &ValueMap,
    ) -> Result<Vec<Record>, StorageError> {
        let definition = self.model(model)?;
        let mut tables = self.tables.write().await;
        tables.update(&self.catalog, definition, ids, values)
    }

    async fn delete(&self, model: &ModelId, ids: &[RecordId]) -> Result<usize, StorageError> {
        let definition = self.model(model)?;
        let mut tables = self.tables.write().await;
        let removed = tables.delete(&self.catalog, definition, ids);
        tracing::debug!(model = %model, removed, "Rows deleted");
        Ok(removed)
    }

    async fn edit_relation(
        &self,
        model: &ModelId,
        id: &str,
        field: &str,
        action: &RelationEditAction,
    ) -> Result<(), StorageError> {
        let definition = self.model(model)?;
        let field_def = definition
            .get_field(field)
            .filter(|f| f.relation.is_to_many())
            .ok_or_else(|| StorageError::field_not_found(model.as_str(), field))?;
        let mut tables = self.tables.write().await;
        tables.edit_relation(&self.catalog, definition, id, field_def, action)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
