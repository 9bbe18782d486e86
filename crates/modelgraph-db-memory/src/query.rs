//! Predicate evaluation and ordering over the in-memory tables.
//!
//! Field paths may cross relations in either direction. A path that fans out
//! over a to-many relation matches when any of the reached values matches.

use std::cmp::Ordering;

use serde_json::Value;

use modelgraph_storage::{
    FieldDefinition, Lookup, ModelCatalog, ModelDefinition, ModelId, OrderBy, Predicate,
    QuerySpec, RecordId, RelationKind, StorageError, ValueMap,
};

use crate::storage::Tables;

/// Read-only view used while evaluating a query.
pub(crate) struct QueryContext<'a> {
    pub(crate) catalog: &'a ModelCatalog,
    pub(crate) tables: &'a Tables,
}

impl<'a> QueryContext<'a> {
    pub(crate) fn new(catalog: &'a ModelCatalog, tables: &'a Tables) -> Self {
        Self { catalog, tables }
    }

    pub(crate) fn model(&self, id: &ModelId) -> Result<&'a ModelDefinition, StorageError> {
        self.catalog
            .get(id)
            .ok_or_else(|| StorageError::model_not_found(id.as_str()))
    }

    pub(crate) fn row(&self, model: &ModelId, id: &str) -> Option<&'a ValueMap> {
        self.tables.rows.get(model).and_then(|rows| rows.get(id))
    }

    /// Resolves a path segment to a field; `pk` names the primary key.
    pub(crate) fn field<'m>(
        &self,
        model: &'m ModelDefinition,
        name: &str,
    ) -> Result<&'m FieldDefinition, StorageError> {
        let field = if name == "pk" {
            model.primary_key()
        } else {
            model.get_field_or_column(name)
        };
        field.ok_or_else(|| StorageError::field_not_found(model.id.as_str(), name))
    }

    pub(crate) fn related_model(
        &self,
        model: &ModelDefinition,
        field: &FieldDefinition,
    ) -> Result<&'a ModelDefinition, StorageError> {
        let related = field
            .related_model
            .as_ref()
            .ok_or_else(|| StorageError::field_not_found(model.id.as_str(), &field.name))?;
        self.model(related)
    }

    /// Ids of the rows reached by following `field` from row `id`.
    pub(crate) fn related_ids(
        &self,
        model: &ModelDefinition,
        field: &FieldDefinition,
        id: &str,
        values: &ValueMap,
    ) -> Result<Vec<RecordId>, StorageError> {
        let related = self.related_model(model, field)?;

        if field.has_column() {
            let target = values.get(&field.column).and_then(id_string);
            return Ok(target
                .filter(|target| self.row(&related.id, target).is_some())
                .into_iter()
                .collect());
        }

        match (&field.remote_field, field.relation) {
            (None, RelationKind::ManyToMany) => {
                let key = (model.id.clone(), field.name.clone());
                Ok(self
                    .tables
                    .links
                    .get(&key)
                    .and_then(|links| links.get(id))
                    .map(|targets| targets.iter().cloned().collect())
                    .unwrap_or_default())
            }
            (Some(remote), RelationKind::ManyToMany) => {
                let key = (related.id.clone(), remote.clone());
                Ok(self
                    .tables
                    .links
                    .get(&key)
                    .map(|links| {
                        links
                            .iter()
                            .filter(|(_, targets)| targets.contains(id))
                            .map(|(owner, _)| owner.clone())
                            .collect()
                    })
                    .unwrap_or_default())
            }
            (Some(remote), _) => {
                let remote_field = self.field(related, remote)?;
                Ok(self
                    .tables
                    .rows
                    .get(&related.id)
                    .map(|rows| {
                        rows.iter()
                            .filter(|(_, row)| {
                                row.get(&remote_field.column).and_then(id_string).as_deref()
                                    == Some(id)
                            })
                            .map(|(row_id, _)| row_id.clone())
                            .collect()
                    })
                    .unwrap_or_default())
            }
            (None, _) => Err(StorageError::field_not_found(model.id.as_str(), &field.name)),
        }
    }

    /// Every value reached by walking `path` from a row.
    pub(crate) fn path_values(
        &self,
        model: &ModelDefinition,
        id: &str,
        values: &ValueMap,
        path: &[String],
    ) -> Result<Vec<Value>, StorageError> {
        let Some((head, rest)) = path.split_first() else {
            return Ok(Vec::new());
        };
        let field = self.field(model, head)?;

        if !field.is_relation() || (rest.is_empty() && field.has_column()) {
            if let Some(next) = rest.first() {
                return Err(StorageError::field_not_found(model.id.as_str(), next));
            }
            return Ok(vec![values.get(&field.column).cloned().unwrap_or(Value::Null)]);
        }

        let related = self.related_model(model, field)?;
        let mut reached = Vec::new();
        for related_id in self.related_ids(model, field, id, values)? {
            let Some(row) = self.row(&related.id, &related_id) else {
                continue;
            };
            if rest.is_empty() {
                reached.push(row.get(related.pk_column()).cloned().unwrap_or(Value::Null));
            } else {
                reached.extend(self.path_values(related, &related_id, row, rest)?);
            }
        }
        Ok(reached)
    }

    pub(crate) fn matches(
        &self,
        model: &ModelDefinition,
        id: &str,
        values: &ValueMap,
        predicate: &Predicate,
    ) -> Result<bool, StorageError> {
        let mut reached = self.path_values(model, id, values, &predicate.path)?;
        if reached.is_empty() {
            reached.push(Value::Null);
        }
        Ok(reached
            .iter()
            .any(|value| lookup_matches(predicate.lookup, value, &predicate.value)))
    }

    /// Applies `query` to the candidate rows, returning selected ids in order.
    pub(crate) fn select(
        &self,
        model: &ModelDefinition,
        candidates: Vec<RecordId>,
        query: &QuerySpec,
    ) -> Result<Vec<RecordId>, StorageError> {
        let mut selected = Vec::new();
        for id in candidates {
            let Some(values) = self.row(&model.id, &id) else {
                continue;
            };
            if self.is_selected(model, &id, values, query)? {
                selected.push(id);
            }
        }

        if query.order_by.is_empty() {
            return Ok(selected);
        }

        let mut keyed = Vec::with_capacity(selected.len());
        for id in selected {
            let keys = match self.row(&model.id, &id) {
                Some(values) => self.sort_keys(model, &id, values, &query.order_by)?,
                None => continue,
            };
            keyed.push((id, keys));
        }
        keyed.sort_by(|(_, a), (_, b)| compare_keys(a, b, &query.order_by));
        Ok(keyed.into_iter().map(|(id, _)| id).collect())
    }

    fn is_selected(
        &self,
        model: &ModelDefinition,
        id: &str,
        values: &ValueMap,
        query: &QuerySpec,
    ) -> Result<bool, StorageError> {
        for predicate in &query.include {
            if !self.matches(model, id, values, predicate)? {
                return Ok(false);
            }
        }
        if query.exclude.is_empty() {
            return Ok(true);
        }
        for predicate in &query.exclude {
            if !self.matches(model, id, values, predicate)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn sort_keys(
        &self,
        model: &ModelDefinition,
        id: &str,
        values: &ValueMap,
        order_by: &[OrderBy],
    ) -> Result<Vec<Value>, StorageError> {
        order_by
            .iter()
            .map(|order| {
                self.path_values(model, id, values, &order.path)
                    .map(|reached| reached.into_iter().next().unwrap_or(Value::Null))
            })
            .collect()
    }
}

fn compare_keys(a: &[Value], b: &[Value], order_by: &[OrderBy]) -> Ordering {
    for ((left, right), order) in a.iter().zip(b).zip(order_by) {
        let ordering = compare_values(left, right);
        let ordering = if order.descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// String form of a key value; `None` for null and non-scalar values.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Equality that treats `1` and `"1"` as the same key.
pub(crate) fn values_equal(stored: &Value, expected: &Value) -> bool {
    match (stored, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            n.to_string() == *s
        }
        _ => stored == expected,
    }
}

/// Total order used for sorting; nulls first, incomparable values equal.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => partial_compare(a, b).unwrap_or(Ordering::Equal),
    }
}

fn partial_compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Number(x), Value::String(y)) => x.as_f64()?.partial_cmp(&y.parse::<f64>().ok()?),
        (Value::String(x), Value::Number(y)) => x.parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text_matches(stored: &Value, expected: &Value, fold: bool, test: fn(&str, &str) -> bool) -> bool {
    match (text(stored), text(expected)) {
        (Some(s), Some(e)) if fold => test(&s.to_lowercase(), &e.to_lowercase()),
        (Some(s), Some(e)) => test(&s, &e),
        _ => false,
    }
}

pub(crate) fn lookup_matches(lookup: Lookup, stored: &Value, expected: &Value) -> bool {
    match lookup {
        Lookup::Exact => values_equal(stored, expected),
        Lookup::IExact => text_matches(stored, expected, true, |s, e| s == e),
        Lookup::Contains => text_matches(stored, expected, false, |s, e| s.contains(e)),
        Lookup::IContains => text_matches(stored, expected, true, |s, e| s.contains(e)),
        Lookup::StartsWith => text_matches(stored, expected, false, |s, e| s.starts_with(e)),
        Lookup::IStartsWith => text_matches(stored, expected, true, |s, e| s.starts_with(e)),
        Lookup::EndsWith => text_matches(stored, expected, false, |s, e| s.ends_with(e)),
        Lookup::IEndsWith => text_matches(stored, expected, true, |s, e| s.ends_with(e)),
        Lookup::Gt => partial_compare(stored, expected) == Some(Ordering::Greater),
        Lookup::Gte => matches!(
            partial_compare(stored, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Lookup::Lt => partial_compare(stored, expected) == Some(Ordering::Less),
        Lookup::Lte => matches!(
            partial_compare(stored, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Lookup::In => match expected {
            Value::Array(options) => options.iter().any(|option| values_equal(stored, option)),
            _ => false,
        },
        Lookup::IsNull => {
            let want_null = match expected {
                Value::Bool(b) => *b,
                other => !other.is_null(),
            };
            stored.is_null() == want_null
        }
    }
}
