//! Mutation payload handling and relation-edit diffing.

use async_graphql::dynamic::{ObjectAccessor, ValueAccessor};
use async_graphql::Error;
use indexmap::IndexMap;
use modelgraph_storage::{
    ModelId, ModelStorage, RecordId, RelationEditAction, RelationEditKind, ValueMap,
};
use tracing::trace;

use super::{graphql_value_to_json, id_string, storage_error};
use crate::error::GraphQLError;
use crate::schema::{FieldSource, GeneratedType};

/// A mutation payload split into column values and relation edits.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct InputData {
    /// Values keyed by column name.
    pub values: ValueMap,
    /// Edits per relation field, in payload order.
    pub edits: IndexMap<String, Vec<RelationEditAction>>,
}

impl InputData {
    /// Reads a payload object of `input_type`. Absent fields are skipped;
    /// an explicit null on a column sets it to null.
    pub fn collect(input_type: &GeneratedType, object: &ObjectAccessor<'_>) -> Result<Self, Error> {
        let mut data = Self::default();
        for field in &input_type.fields {
            let Some(value) = object.get(&field.graphql_name) else {
                continue;
            };
            match &field.source {
                FieldSource::Column(column) => {
                    data.values
                        .insert(column.clone(), graphql_value_to_json(value.as_value()));
                }
                FieldSource::RelationEdit { field: relation, kind } => {
                    if value.is_null() {
                        continue;
                    }
                    let ids = id_list(&value)?;
                    data.edits
                        .entry(relation.clone())
                        .or_default()
                        .push(RelationEditAction::new(*kind, ids));
                }
                FieldSource::Relation { .. } | FieldSource::Computed(_) => {
                    return Err(GraphQLError::InvalidInput(format!(
                        "field {} of {} cannot be written",
                        field.graphql_name, input_type.name
                    ))
                    .into_graphql_error());
                }
            }
        }
        Ok(data)
    }

    /// Returns `true` when the payload has relation edits.
    pub fn has_edits(&self) -> bool {
        self.edits.values().any(|edits| !edits.is_empty())
    }
}

fn id_list(value: &ValueAccessor<'_>) -> Result<Vec<RecordId>, Error> {
    value.list()?.iter().map(|item| id_string(&item)).collect()
}

/// Applies relation edits to one record: per relation field, `add`, then
/// `set`, then `remove`, so `set` replaces what `add` linked and `remove`
/// still subtracts from the result.
pub(crate) async fn apply_relation_edits(
    storage: &dyn ModelStorage,
    model: &ModelId,
    id: &str,
    edits: &IndexMap<String, Vec<RelationEditAction>>,
) -> Result<(), Error> {
    for (field, actions) in edits {
        for kind in RelationEditKind::ORDER {
            for action in actions.iter().filter(|a| a.kind == kind) {
                trace!(
                    model = %model,
                    id = %id,
                    field = %field,
                    edit = %action.kind,
                    targets = action.target_ids.len(),
                    "Applying relation edit"
                );
                storage
                    .edit_relation(model, id, field, action)
                    .await
                    .map_err(storage_error)?;
            }
        }
    }
    Ok(())
}
