//! In-memory storage backend for modelgraph.
//!
//! This crate provides an in-memory implementation of the `ModelStorage` trait
//! from `modelgraph-storage`. Every model in the catalog gets its own table;
//! forward many-to-many fields get link tables.
//!
//! # Example
//!
//! ```ignore
//! use modelgraph_db_memory::InMemoryStorage;
//! use modelgraph_storage::{ModelId, ModelStorage};
//!
//! let storage = InMemoryStorage::new(catalog);
//!
//! let mut values = serde_json::Map::new();
//! values.insert("name".into(), "admins".into());
//! let group = storage.create(&ModelId::new("Group"), values).await?;
//! ```

mod query;
mod storage;
mod storage_impl;

pub use modelgraph_storage::{ModelStorage, StorageError};
pub use storage::InMemoryStorage;

/// Creates a shareable in-memory storage for `catalog`.
pub fn create_storage(
    catalog: impl Into<std::sync::Arc<modelgraph_storage::ModelCatalog>>,
) -> modelgraph_storage::DynStorage {
    std::sync::Arc::new(InMemoryStorage::new(catalog))
}
