//! Storage types for the model storage abstraction layer.
//!
//! Records, query specifications and relation edits exchanged between the
//! GraphQL layer and a [`ModelStorage`](crate::ModelStorage) backend.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ModelId;

/// Primary key of a stored record, rendered as a string.
pub type RecordId = String;

/// Column name to value mapping for one row.
pub type ValueMap = serde_json::Map<String, Value>;

/// A single stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The model this row belongs to.
    pub model: ModelId,
    /// Primary key as a string.
    pub id: RecordId,
    /// Column values keyed by column name.
    pub values: ValueMap,
}

impl Record {
    /// Creates a record.
    #[must_use]
    pub fn new(model: ModelId, id: impl Into<RecordId>, values: ValueMap) -> Self {
        Self {
            model,
            id: id.into(),
            values,
        }
    }

    /// Returns the value stored in `column`, if any.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }
}

/// Comparison operator of a predicate (`name__icontains`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lookup {
    #[default]
    Exact,
    IExact,
    Contains,
    IContains,
    StartsWith,
    IStartsWith,
    EndsWith,
    IEndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    IsNull,
}

impl Lookup {
    /// All supported lookups.
    pub const ALL: [Lookup; 14] = [
        Lookup::Exact,
        Lookup::IExact,
        Lookup::Contains,
        Lookup::IContains,
        Lookup::StartsWith,
        Lookup::IStartsWith,
        Lookup::EndsWith,
        Lookup::IEndsWith,
        Lookup::Gt,
        Lookup::Gte,
        Lookup::Lt,
        Lookup::Lte,
        Lookup::In,
        Lookup::IsNull,
    ];

    /// Parses a lookup from its key suffix (`"icontains"`).
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lookup| lookup.suffix() == suffix)
    }

    /// Returns the key suffix for this lookup.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IExact => "iexact",
            Self::Contains => "contains",
            Self::IContains => "icontains",
            Self::StartsWith => "startswith",
            Self::IStartsWith => "istartswith",
            Self::EndsWith => "endswith",
            Self::IEndsWith => "iendswith",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::IsNull => "isnull",
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A single condition on a (possibly relation-spanning) field path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Field names from the queried model outward (`["group", "name"]`).
    pub path: Vec<String>,
    /// Comparison operator.
    pub lookup: Lookup,
    /// Right-hand side value.
    pub value: Value,
}

impl Predicate {
    /// Creates an exact-match predicate on a single field.
    #[must_use]
    pub fn exact(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: vec![field.into()],
            lookup: Lookup::Exact,
            value: value.into(),
        }
    }
}

/// Sort instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Field path to sort on.
    pub path: Vec<String>,
    /// Descending order if `true`.
    pub descending: bool,
}

impl OrderBy {
    /// Ascending sort on a field path.
    #[must_use]
    pub fn asc(path: Vec<String>) -> Self {
        Self {
            path,
            descending: false,
        }
    }

    /// Descending sort on a field path.
    #[must_use]
    pub fn desc(path: Vec<String>) -> Self {
        Self {
            path,
            descending: true,
        }
    }
}

/// Row selection handed to storage.
///
/// A row is selected when every `include` predicate matches and the
/// `exclude` predicates do not all match together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub include: Vec<Predicate>,
    pub exclude: Vec<Predicate>,
    pub order_by: Vec<OrderBy>,
}

impl QuerySpec {
    /// Selects every row in natural order.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Selects rows whose primary key is one of `ids`.
    #[must_use]
    pub fn by_ids(pk: impl Into<String>, ids: &[RecordId]) -> Self {
        Self {
            include: vec![Predicate {
                path: vec![pk.into()],
                lookup: Lookup::In,
                value: Value::Array(ids.iter().cloned().map(Value::String).collect()),
            }],
            ..Self::default()
        }
    }

    /// Returns `true` if no predicate restricts the selection.
    #[must_use]
    pub fn is_unfiltered(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Adds an include predicate.
    #[must_use]
    pub fn with_include(mut self, predicate: Predicate) -> Self {
        self.include.push(predicate);
        self
    }

    /// Adds an exclude predicate.
    #[must_use]
    pub fn with_exclude(mut self, predicate: Predicate) -> Self {
        self.exclude.push(predicate);
        self
    }

    /// Adds a sort instruction.
    #[must_use]
    pub fn with_order(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }
}

/// Result of following a relation from a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// To-one relation; `None` when the link is empty.
    One(Option<Record>),
    /// To-many relation, filtered and ordered.
    Many(Vec<Record>),
}

impl Related {
    /// Flattens into a vector of records.
    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Self::One(record) => record.into_iter().collect(),
            Self::Many(records) => records,
        }
    }
}

/// Relation edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationEditKind {
    /// Link the targets, keeping existing links.
    Add,
    /// Replace the whole collection with the targets.
    Set,
    /// Unlink the targets.
    Remove,
}

impl RelationEditKind {
    /// Application order when several edits target one relation.
    pub const ORDER: [RelationEditKind; 3] = [Self::Add, Self::Set, Self::Remove];

    /// Input field suffix (`tags_add`).
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Set => "set",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for RelationEditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// One add/set/remove instruction on a to-many relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEditAction {
    pub kind: RelationEditKind,
    pub target_ids: Vec<RecordId>,
}

impl RelationEditAction {
    #[must_use]
    pub fn new(kind: RelationEditKind, target_ids: Vec<RecordId>) -> Self {
        Self { kind, target_ids }
    }
}
