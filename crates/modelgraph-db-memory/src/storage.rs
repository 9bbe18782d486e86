use std::collections::HashMap;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tokio::sync::RwLock;

use modelgraph_storage::{
    FieldDefinition, ModelCatalog, ModelDefinition, ModelId, Record, RecordId,
    RelationEditAction, RelationEditKind, RelationKind, StorageError, StorageKind, ValueMap,
};

use crate::query::id_string;

/// Owner model and forward many-to-many field name.
pub(crate) type LinkKey = (ModelId, String);

/// Rows, many-to-many link tables and id sequences.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    /// Rows per model, in insertion order.
    pub(crate) rows: HashMap<ModelId, IndexMap<RecordId, ValueMap>>,
    /// Link tables: owner id to linked target ids.
    pub(crate) links: HashMap<LinkKey, IndexMap<RecordId, IndexSet<RecordId>>>,
    /// Last assigned auto-increment key per model.
    pub(crate) sequences: HashMap<ModelId, u64>,
}

/// In-memory model storage backend.
///
/// This storage implementation provides:
/// - One table per catalog model plus link tables for many-to-many fields
/// - Auto-increment primary keys
/// - Lookups across forward and reverse relations
/// - Relation edits on many-to-many and reverse foreign key collections
///
/// All tables sit behind one `RwLock` so a write touching several tables is
/// observed atomically by readers.
#[derive(Debug)]
pub struct InMemoryStorage {
    pub(crate) catalog: Arc<ModelCatalog>,
    pub(crate) tables: RwLock<Tables>,
}

impl InMemoryStorage {
    /// Creates an empty storage for the models in `catalog`.
    pub fn new(catalog: impl Into<Arc<ModelCatalog>>) -> Self {
        let catalog = catalog.into();
        let mut tables = Tables::default();
        for model in catalog.iter() {
            tables.rows.insert(model.id.clone(), IndexMap::new());
        }
        Self {
            catalog,
            tables: RwLock::new(tables),
        }
    }

    /// Returns the catalog this storage was created with.
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Number of rows currently stored for `model`.
    pub async fn count(&self, model: &ModelId) -> usize {
        let tables = self.tables.read().await;
        tables.rows.get(model).map_or(0, IndexMap::len)
    }

    pub(crate) fn model(&self, id: &ModelId) -> Result<&ModelDefinition, StorageError> {
        self.catalog
            .get(id)
            .ok_or_else(|| StorageError::model_not_found(id.as_str()))
    }
}

pub(crate) fn to_record(model: &ModelId, id: &str, values: &ValueMap) -> Record {
    Record::new(model.clone(), id, values.clone())
}

impl Tables {
    fn next_id(&mut self, model: &ModelId) -> u64 {
        let sequence = self.sequences.entry(model.clone()).or_insert(0);
        *sequence += 1;
        *sequence
    }

    /// Validates and normalizes column values against `model`.
    ///
    /// Keys may be field names or column names; the result is keyed by column.
    fn normalize(
        &self,
        catalog: &ModelCatalog,
        model: &ModelDefinition,
        values: &ValueMap,
    ) -> Result<ValueMap, StorageError> {
        let mut normalized = ValueMap::new();
        for (key, value) in values {
            let field = model
                .get_field_or_column(key)
                .filter(|f| f.has_column())
                .ok_or_else(|| {
                    StorageError::invalid_value(
                        key.as_str(),
                        format!("{} has no column {key}", model.id),
                    )
                })?;

            if value.is_null() && !field.accepts_null() {
                return Err(StorageError::invalid_value(
                    field.name.as_str(),
                    "null is not allowed",
                ));
            }

            let value = if field.is_relation() {
                self.normalize_reference(catalog, model, field, value)?
            } else {
                normalize_key(&field.kind, value)
            };
            normalized.insert(field.column.clone(), value);
        }
        Ok(normalized)
    }

    fn normalize_reference(
        &self,
        catalog: &ModelCatalog,
        model: &ModelDefinition,
        field: &FieldDefinition,
        value: &Value,
    ) -> Result<Value, StorageError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let related = field
            .related_model
            .as_ref()
            .and_then(|id| catalog.get(id))
            .ok_or_else(|| StorageError::field_not_found(model.id.as_str(), &field.name))?;
        let target = id_string(value).ok_or_else(|| {
            StorageError::invalid_value(field.name.as_str(), format!("invalid key {value}"))
        })?;
        let exists = self
            .rows
            .get(&related.id)
            .is_some_and(|rows| rows.contains_key(&target));
        if !exists {
            return Err(StorageError::invalid_value(
                field.name.as_str(),
                format!("no {} with id {target}", related.id),
            ));
        }
        let kind = related
            .primary_key()
            .map_or(StorageKind::AutoId, |pk| pk.kind.clone());
        Ok(normalize_key(&kind, value))
    }

    pub(crate) fn create(
        &mut self,
        catalog: &ModelCatalog,
        model: &ModelDefinition,
        values: &ValueMap,
    ) -> Result<Record, StorageError> {
        let mut row = self.normalize(catalog, model, values)?;
        let pk_column = model.pk_column().to_string();

        let id = match row.get(&pk_column).and_then(id_string) {
            Some(id) => {
                if self.rows.get(&model.id).is_some_and(|rows| rows.contains_key(&id)) {
                    return Err(StorageError::invalid_value(
                        pk_column.as_str(),
                        format!("{}/{id} already exists", model.id),
                    ));
                }
                if let Ok(numeric) = id.parse::<u64>() {
                    let sequence = self.sequences.entry(model.id.clone()).or_insert(0);
                    *sequence = (*sequence).max(numeric);
                }
                id
            }
            None => {
                let next = self.next_id(&model.id);
                row.insert(pk_column.clone(), Value::from(next));
                next.to_string()
            }
        };

        for field in model.column_fields().filter(|f| !f.primary_key) {
            if row.contains_key(&field.column) {
                continue;
            }
            let value = match &field.default {
                Some(default) => default.clone(),
                None if field.accepts_null() => Value::Null,
                None if field.blank && is_text(&field.kind) => Value::String(String::new()),
                None => {
                    return Err(StorageError::invalid_value(
                        field.name.as_str(),
                        "a value is required",
                    ));
                }
            };
            row.insert(field.column.clone(), value);
        }

        self.rows
            .entry(model.id.clone())
            .or_default()
            .insert(id.clone(), row.clone());
        tracing::trace!(model = %model.id, id = %id, "Row inserted");
        Ok(Record::new(model.id.clone(), id, row))
    }

    pub(crate) fn update(
        &mut self,
        catalog: &ModelCatalog,
        model: &ModelDefinition,
        ids: &[RecordId],
        values: &ValueMap,
    ) -> Result<Vec<Record>, StorageError> {
        let changes = self.normalize(catalog, model, values)?;
        if changes.contains_key(model.pk_column()) {
            return Err(StorageError::invalid_value(
                model.pk_column(),
                "primary keys cannot be changed",
            ));
        }

        let rows = self.rows.entry(model.id.clone()).or_default();
        if let Some(missing) = ids.iter().find(|id| !rows.contains_key(id.as_str())) {
            return Err(StorageError::record_not_found(model.id.as_str(), missing.as_str()));
        }

        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(row) = rows.get_mut(id.as_str()) {
                for (column, value) in &changes {
                    row.insert(column.clone(), value.clone());
                }
                updated.push(to_record(&model.id, id, row));
            }
        }
        Ok(updated)
    }

    pub(crate) fn delete(
        &mut self,
        catalog: &ModelCatalog,
        model: &ModelDefinition,
        ids: &[RecordId],
    ) -> usize {
        let mut removed = 0;
        if let Some(rows) = self.rows.get_mut(&model.id) {
            for id in ids {
                if rows.shift_remove(id.as_str()).is_some() {
                    removed += 1;
                }
            }
        }

        for ((owner, field), links) in &mut self.links {
            if *owner == model.id {
                for id in ids {
                    links.shift_remove(id.as_str());
                }
            }
            let targets_model = catalog
                .get(owner)
                .and_then(|m| m.get_field(field))
                .and_then(|f| f.related_model.as_ref());
            if targets_model == Some(&model.id) {
                for targets in links.values_mut() {
                    for id in ids {
                        targets.shift_remove(id.as_str());
                    }
                }
            }
        }
        removed
    }

    pub(crate) fn edit_relation(
        &mut self,
        catalog: &ModelCatalog,
        model: &ModelDefinition,
        id: &str,
        field: &FieldDefinition,
        action: &RelationEditAction,
    ) -> Result<(), StorageError> {
        let related = field
            .related_model
            .as_ref()
            .and_then(|related| catalog.get(related))
            .ok_or_else(|| StorageError::field_not_found(model.id.as_str(), &field.name))?;

        if self.row(&model.id, id).is_none() {
            return Err(StorageError::record_not_found(model.id.as_str(), id));
        }
        if let Some(missing) = action
            .target_ids
            .iter()
            .find(|target| self.row(&related.id, target).is_none())
        {
            return Err(StorageError::record_not_found(related.id.as_str(), missing.as_str()));
        }

        match (&field.remote_field, field.relation) {
            (None, RelationKind::ManyToMany) => {
                let links = self
                    .links
                    .entry((model.id.clone(), field.name.clone()))
                    .or_default()
                    .entry(id.to_string())
                    .or_default();
                apply_to_set(links, action);
                Ok(())
            }
            (Some(remote), RelationKind::ManyToMany) => {
                let links = self.links.entry((related.id.clone(), remote.clone())).or_default();
                if action.kind == RelationEditKind::Set {
                    for targets in links.values_mut() {
                        targets.shift_remove(id);
                    }
                }
                for target in &action.target_ids {
                    let targets = links.entry(target.clone()).or_default();
                    match action.kind {
                        RelationEditKind::Add | RelationEditKind::Set => {
                            targets.insert(id.to_string());
                        }
                        RelationEditKind::Remove => {
                            targets.shift_remove(id);
                        }
                    }
                }
                Ok(())
            }
            (Some(remote), RelationKind::OneToMany) => {
                let remote_field = related
                    .get_field(remote)
                    .ok_or_else(|| StorageError::field_not_found(related.id.as_str(), remote))?;
                let owner_key = self
                    .row(&model.id, id)
                    .and_then(|row| row.get(model.pk_column()))
                    .cloned()
                    .unwrap_or_else(|| Value::String(id.to_string()));
                self.edit_reverse_foreign_key(related, remote_field, id, owner_key, action)
            }
            _ => Err(StorageError::invalid_value(
                field.name.as_str(),
                format!("{}.{} is not an editable collection", model.id, field.name),
            )),
        }
    }

    fn edit_reverse_foreign_key(
        &mut self,
        related: &ModelDefinition,
        remote_field: &FieldDefinition,
        owner_id: &str,
        owner_key: Value,
        action: &RelationEditAction,
    ) -> Result<(), StorageError> {
        let rows = self.rows.entry(related.id.clone()).or_default();
        let column = &remote_field.column;
        let detaching = match action.kind {
            RelationEditKind::Add => Vec::new(),
            RelationEditKind::Set => rows
                .iter()
                .filter(|(row_id, row)| {
                    row.get(column).and_then(id_string).as_deref() == Some(owner_id)
                        && !action.target_ids.contains(row_id)
                })
                .map(|(row_id, _)| row_id.clone())
                .collect(),
            RelationEditKind::Remove => action
                .target_ids
                .iter()
                .filter(|target| {
                    rows.get(target.as_str())
                        .and_then(|row| row.get(column))
                        .and_then(id_string)
                        .as_deref()
                        == Some(owner_id)
                })
                .cloned()
                .collect(),
        };

        if !detaching.is_empty() && !remote_field.null {
            return Err(StorageError::invalid_value(
                remote_field.name.as_str(),
                format!("{}.{} cannot be null", related.id, remote_field.name),
            ));
        }
        for row_id in &detaching {
            if let Some(row) = rows.get_mut(row_id.as_str()) {
                row.insert(column.clone(), Value::Null);
            }
        }
        if action.kind != RelationEditKind::Remove {
            for target in &action.target_ids {
                if let Some(row) = rows.get_mut(target.as_str()) {
                    row.insert(column.clone(), owner_key.clone());
                }
            }
        }
        Ok(())
    }

    fn row(&self, model: &ModelId, id: &str) -> Option<&ValueMap> {
        self.rows.get(model).and_then(|rows| rows.get(id))
    }
}

fn apply_to_set(links: &mut IndexSet<RecordId>, action: &RelationEditAction) {
    match action.kind {
        RelationEditKind::Add => links.extend(action.target_ids.iter().cloned()),
        RelationEditKind::Set => {
            links.clear();
            links.extend(action.target_ids.iter().cloned());
        }
        RelationEditKind::Remove => {
            for target in &action.target_ids {
                links.shift_remove(target);
            }
        }
    }
}

fn is_text(kind: &StorageKind) -> bool {
    matches!(
        kind,
        StorageKind::Char
            | StorageKind::Text
            | StorageKind::Email
            | StorageKind::Url
            | StorageKind::Slug
            | StorageKind::FilePath
    )
}

/// Stores numeric-looking keys of integer-keyed columns as numbers.
fn normalize_key(kind: &StorageKind, value: &Value) -> Value {
    let integer_key = kind.is_auto_id()
        || matches!(
            kind,
            StorageKind::Integer
                | StorageKind::SmallInteger
                | StorageKind::BigInteger
                | StorageKind::PositiveInteger
                | StorageKind::PositiveSmallInteger
                | StorageKind::PositiveBigInteger
        );
    match value {
        Value::String(s) if integer_key => s
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| value.clone()),
        _ => value.clone(),
    }
}
