//! GraphQL schema generation.
//!
//! ## Components
//!
//! - [`TypeRegistry`] - Maps models, field names and storage kinds to types
//! - [`TypeBuilder`] / [`declare_type`] - Derive a generated type from a model
//! - [`ModelSchemaBuilder`] - Assembles the executable schema
//!
//! ## Architecture
//!
//! The schema building process:
//! 1. Types are declared in any order; relations to models without a type yet
//!    become deferred references
//! 2. The builder finalizes the registry, failing on any reference that still
//!    has no type
//! 3. Generated types become dynamic objects and input objects
//! 4. Query and mutation roots are generated per declared model

mod builder;
mod generated;
mod registry;
mod type_builder;

pub use builder::{ModelSchema, ModelSchemaBuilder, SchemaBuilderConfig};
pub use generated::{
    ComputedFn, DeferredType, FieldSource, GeneratedField, GeneratedType, GeneratedTypeRef,
    RelationHook, ResolverKind, TypeDescriptor, TypeKind,
};
pub use registry::{RegistryKey, TypeRegistry};
pub use type_builder::{TypeBuilder, TypeDeclaration, declare_type};
