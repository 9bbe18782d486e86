//! # modelgraph-graphql
//!
//! GraphQL types, queries and mutations derived from relational model
//! metadata.
//!
//! ## Overview
//!
//! A model's fields are reflected, mapped to GraphQL scalars or to the
//! generated types of related models, and assembled into an `async-graphql`
//! dynamic schema. Every declared output type gets a singular getter and a
//! filtered list; every input/output pair gets create, batch create, update
//! and delete mutations. Reads and writes go through a
//! [`ModelStorage`](modelgraph_storage::ModelStorage) backend.
//!
//! ## Example
//!
//! ```ignore
//! use modelgraph_graphql::{
//!     GraphQLContext, ModelSchemaBuilder, SchemaBuilderConfig, TypeDeclaration, TypeRegistry,
//!     declare_type,
//! };
//!
//! let mut registry = TypeRegistry::new();
//! let user = declare_type(&mut registry, TypeDeclaration::output(&user_model))?;
//! let input = declare_type(&mut registry, TypeDeclaration::input(&user_model))?;
//!
//! let schema = ModelSchemaBuilder::new(registry, SchemaBuilderConfig::default())
//!     .query_type(user.clone())
//!     .mutation_types(input, user)
//!     .build()?;
//!
//! let response = schema
//!     .execute(r#"{ users(filters: ["name__startswith='a'"]) { id name } }"#, GraphQLContext::new(storage))
//!     .await;
//! ```
//!
//! ## Configuration
//!
//! ```toml
//! [graphql]
//! max_depth = 15
//! max_complexity = 500
//! introspection = true
//! max_batch_size = 100
//! warn_on_unfiltered_writes = true
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration options
//! - [`introspect`] - Model metadata reflection
//! - [`types`] - Scalar mapping and custom scalars
//! - [`schema`] - Type generation and schema assembly
//! - [`filters`] - The filter clause language
//! - [`hooks`] - Save and list hooks
//! - [`resolvers`] - Query and mutation resolvers
//! - [`context`] - GraphQL execution context
//! - [`error`] - Error types

pub mod config;
pub mod context;
pub mod error;
pub mod filters;
pub mod hooks;
pub mod introspect;
pub mod naming;
pub mod resolvers;
pub mod schema;
pub mod types;

// Re-export main types
pub use config::GraphQLConfig;
pub use context::{ContextBuilderError, GraphQLContext, GraphQLContextBuilder};
pub use error::{GraphQLError, SchemaError};
pub use filters::{FilterExpression, FilterSet, parse_filters, parse_order_by};
pub use hooks::{ListHook, PostSaveHook, PreSaveHook, SaveHooks};
pub use introspect::{FieldDescriptor, introspect};
pub use schema::{
    GeneratedField, GeneratedType, GeneratedTypeRef, ModelSchema, ModelSchemaBuilder,
    RegistryKey, SchemaBuilderConfig, TypeBuilder, TypeDeclaration, TypeDescriptor, TypeKind,
    TypeRegistry, declare_type,
};

/// Result type for GraphQL operations.
pub type Result<T> = std::result::Result<T, GraphQLError>;
