//! # modelgraph-storage
//!
//! Storage abstraction layer for modelgraph.
//!
//! This crate defines the model metadata, the record and query types and the
//! [`ModelStorage`] trait that storage backends implement. It does not contain
//! any backend - those are provided by separate crates.
//!
//! ## Overview
//!
//! - [`ModelDefinition`] / [`FieldDefinition`] describe a relational model the
//!   way the backend sees it, collected in a [`ModelCatalog`].
//! - [`ModelStorage`] is the capability interface resolvers call: reads,
//!   filtered selections, relation traversal, writes and relation edits.
//! - [`BlockingStorage`] adapts a synchronous [`SyncModelStorage`] backend.
//!
//! ## Example
//!
//! ```ignore
//! use modelgraph_storage::{ModelStorage, ModelId, Predicate, QuerySpec, Record, StorageError};
//!
//! async fn users_named(
//!     storage: &dyn ModelStorage,
//!     name: &str,
//! ) -> Result<Vec<Record>, StorageError> {
//!     let query = QuerySpec::all().with_include(Predicate::exact("name", name));
//!     storage.filter(&ModelId::new("User"), &query).await
//! }
//! ```

mod blocking;
mod error;
mod model;
mod traits;
mod types;

pub use blocking::BlockingStorage;
pub use error::{ErrorCategory, StorageError};
pub use model::{FieldDefinition, ModelCatalog, ModelDefinition, ModelId, RelationKind, StorageKind};
pub use traits::{ModelStorage, SyncModelStorage};
pub use types::{
    Lookup, OrderBy, Predicate, QuerySpec, Record, RecordId, Related, RelationEditAction,
    RelationEditKind, ValueMap,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared storage trait object.
pub type DynStorage = std::sync::Arc<dyn ModelStorage>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use modelgraph_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::blocking::BlockingStorage;
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::model::{
        FieldDefinition, ModelCatalog, ModelDefinition, ModelId, RelationKind, StorageKind,
    };
    pub use crate::traits::{ModelStorage, SyncModelStorage};
    pub use crate::types::{
        Lookup, OrderBy, Predicate, QuerySpec, Record, RecordId, Related, RelationEditAction,
        RelationEditKind, ValueMap,
    };
    pub use crate::{DynStorage, StorageResult};
}
