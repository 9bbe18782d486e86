//! Schema assembly.
//!
//! This module provides `ModelSchemaBuilder`, which turns the generated types
//! of a [`TypeRegistry`] into an `async-graphql` dynamic schema with query
//! and mutation roots.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_graphql::dynamic::{
    Field, FieldFuture, InputObject, InputValue, Object, Schema, SchemaBuilder, TypeRef,
};
use async_graphql::{Request, Response, Value};
use indexmap::IndexMap;
use modelgraph_storage::{ModelId, Record, ValueMap};
use tracing::{debug, trace};

use super::generated::{FieldSource, GeneratedField, GeneratedType, ResolverKind, TypeKind};
use super::registry::TypeRegistry;
use crate::context::GraphQLContext;
use crate::error::SchemaError;
use crate::hooks::{ListHook, SaveHooks};
use crate::naming::{list_field_name, mutation_field_name, query_field_name};
use crate::resolvers::{
    CreateBatchResolver, CreateResolver, DATA_ARG, DeleteResolver, FILTERS_ARG, FieldResolver,
    ListResolver, ORDER_BY_ARG, ReadResolver, RelationResolver, UpdateResolver, WriteOptions,
};
use crate::types::custom_scalars;

const PLACEHOLDER_FIELD: &str = "_placeholder";

/// Configuration for the schema builder.
#[derive(Debug, Clone)]
pub struct SchemaBuilderConfig {
    /// Maximum query depth allowed.
    pub max_depth: usize,

    /// Maximum query complexity allowed.
    pub max_complexity: usize,

    /// Whether to enable introspection queries.
    pub introspection_enabled: bool,

    /// Largest accepted `create<Model>s` payload; 0 disables the check.
    pub max_batch_size: usize,

    /// Log a warning when update or delete runs without filters.
    pub warn_on_unfiltered_writes: bool,
}

impl Default for SchemaBuilderConfig {
    fn default() -> Self {
        Self {
            max_depth: 15,
            max_complexity: 500,
            introspection_enabled: true,
            max_batch_size: 100,
            warn_on_unfiltered_writes: true,
        }
    }
}

impl SchemaBuilderConfig {
    fn write_options(&self) -> WriteOptions {
        WriteOptions {
            max_batch_size: self.max_batch_size,
            warn_on_unfiltered_writes: self.warn_on_unfiltered_writes,
        }
    }
}

struct MutationPair {
    input: Arc<GeneratedType>,
    partial: Arc<GeneratedType>,
    output: Arc<GeneratedType>,
}

/// Builds the executable schema from declared types.
///
/// # Example
///
/// ```ignore
/// let mut registry = TypeRegistry::new();
/// let user = declare_type(&mut registry, TypeDeclaration::output(&user_model))?;
/// let user_input = declare_type(&mut registry, TypeDeclaration::input(&user_model))?;
///
/// let schema = ModelSchemaBuilder::new(registry, SchemaBuilderConfig::default())
///     .query_type(user.clone())
///     .mutation_types(user_input, user)
///     .pre_save_hook("User", |_ctx, values| {
///         values.insert("name".into(), "anonymous".into());
///         Ok(())
///     })
///     .build()?;
/// ```
pub struct ModelSchemaBuilder {
    registry: TypeRegistry,
    config: SchemaBuilderConfig,
    query_types: Vec<Arc<GeneratedType>>,
    mutation_types: Vec<(Arc<GeneratedType>, Arc<GeneratedType>)>,
    list_hooks: HashMap<ModelId, ListHook>,
    save_hooks: HashMap<ModelId, SaveHooks>,
}

impl ModelSchemaBuilder {
    /// Creates a new schema builder over a populated registry.
    #[must_use]
    pub fn new(registry: TypeRegistry, config: SchemaBuilderConfig) -> Self {
        Self {
            registry,
            config,
            query_types: Vec::new(),
            mutation_types: Vec::new(),
            list_hooks: HashMap::new(),
            save_hooks: HashMap::new(),
        }
    }

    /// Adds `<model>` and `<model>s` query fields for an output type.
    #[must_use]
    pub fn query_type(mut self, output: Arc<GeneratedType>) -> Self {
        self.query_types.push(output);
        self
    }

    /// Adds the create, batch create, update and delete mutations for an
    /// input/output pair of the same model.
    #[must_use]
    pub fn mutation_types(mut self, input: Arc<GeneratedType>, output: Arc<GeneratedType>) -> Self {
        self.mutation_types.push((input, output));
        self
    }

    /// Post-processes the rows of `model`'s list query. The hook gets the
    /// filtered, ordered rows and returns the rows to expose. A second call
    /// for the same model replaces the hook.
    #[must_use]
    pub fn list_hook<F>(mut self, model: impl Into<ModelId>, hook: F) -> Self
    where
        F: Fn(&GraphQLContext, Vec<Record>) -> Vec<Record> + Send + Sync + 'static,
    {
        self.list_hooks.insert(model.into(), Arc::new(hook));
        self
    }

    /// Runs `hook` on the column values of every `model` create payload
    /// before it is persisted. Returning `Err` rejects that payload with
    /// `SAVE_REJECTED`.
    #[must_use]
    pub fn pre_save_hook<F>(mut self, model: impl Into<ModelId>, hook: F) -> Self
    where
        F: Fn(&GraphQLContext, &mut ValueMap) -> Result<(), String> + Send + Sync + 'static,
    {
        self.save_hooks.entry(model.into()).or_default().pre_save = Some(Arc::new(hook));
        self
    }

    /// Runs `hook` on every `model` record created through the API, after its
    /// relation edits.
    #[must_use]
    pub fn post_save_hook<F>(mut self, model: impl Into<ModelId>, hook: F) -> Self
    where
        F: Fn(&GraphQLContext, &Record) + Send + Sync + 'static,
    {
        self.save_hooks.entry(model.into()).or_default().post_save = Some(Arc::new(hook));
        self
    }

    /// Builds the GraphQL schema.
    ///
    /// # Errors
    ///
    /// - `UnresolvedRelationType` if a deferred relation has no type
    /// - `InvalidConfig` for mismatched query or mutation types, or a hook on
    ///   a model with no matching root field
    /// - `SchemaBuildFailed` if two types share a name or the engine rejects
    ///   the schema
    pub fn build(self) -> Result<ModelSchema, SchemaError> {
        debug!(
            queries = self.query_types.len(),
            mutations = self.mutation_types.len(),
            "Starting GraphQL schema build"
        );

        self.registry.finalize()?;
        let mutations = self.mutation_pairs()?;
        for output in &self.query_types {
            expect_kind(output, TypeKind::Output)?;
        }
        self.check_hooks(&mutations)?;

        let mut schema_builder = Schema::build("Query", Some("Mutation"), None);

        for scalar in custom_scalars() {
            schema_builder = schema_builder.register(scalar);
        }

        let types = self.collect_types(&mutations)?;
        for ty in types.values() {
            schema_builder = self.register_type(schema_builder, ty)?;
        }

        schema_builder = schema_builder.register(self.build_query_type()?);
        schema_builder = schema_builder.register(self.build_mutation_type(&mutations)?);

        // Configure limits
        let mut schema_builder = schema_builder.limit_depth(self.config.max_depth);
        schema_builder = schema_builder.limit_complexity(self.config.max_complexity);

        if !self.config.introspection_enabled {
            schema_builder = schema_builder.disable_introspection();
        }

        let schema = schema_builder
            .finish()
            .map_err(|e| SchemaError::SchemaBuildFailed(e.to_string()))?;

        debug!(types = types.len(), "GraphQL schema build complete");
        Ok(ModelSchema {
            schema,
            registry: Arc::new(self.registry),
        })
    }

    fn mutation_pairs(&self) -> Result<Vec<MutationPair>, SchemaError> {
        let mut partials: IndexMap<String, Arc<GeneratedType>> = IndexMap::new();
        let mut pairs = Vec::with_capacity(self.mutation_types.len());
        for (input, output) in &self.mutation_types {
            expect_kind(input, TypeKind::Input)?;
            expect_kind(output, TypeKind::Output)?;
            if input.model != output.model {
                return Err(SchemaError::InvalidConfig(format!(
                    "mutation types {} and {} belong to different models",
                    input.name, output.name
                )));
            }
            let partial = partials
                .entry(input.name.clone())
                .or_insert_with(|| Arc::new(input.to_partial()))
                .clone();
            pairs.push(MutationPair {
                input: Arc::clone(input),
                partial,
                output: Arc::clone(output),
            });
        }
        Ok(pairs)
    }

    fn check_hooks(&self, mutations: &[MutationPair]) -> Result<(), SchemaError> {
        for model in self.list_hooks.keys() {
            if !self.query_types.iter().any(|ty| &ty.model == model) {
                return Err(SchemaError::InvalidConfig(format!(
                    "list hook set for {model}, which has no query type"
                )));
            }
        }
        for model in self.save_hooks.keys() {
            if !mutations.iter().any(|pair| &pair.input.model == model) {
                return Err(SchemaError::InvalidConfig(format!(
                    "save hook set for {model}, which has no mutation types"
                )));
            }
        }
        Ok(())
    }

    /// Every generated type reachable from the registry and the roots.
    fn collect_types(
        &self,
        mutations: &[MutationPair],
    ) -> Result<IndexMap<String, Arc<GeneratedType>>, SchemaError> {
        let mut pending: Vec<Arc<GeneratedType>> = self.registry.generated_types().cloned().collect();
        pending.extend(self.query_types.iter().cloned());
        for pair in mutations {
            pending.extend([
                Arc::clone(&pair.input),
                Arc::clone(&pair.partial),
                Arc::clone(&pair.output),
            ]);
        }

        let mut types: IndexMap<String, Arc<GeneratedType>> = IndexMap::new();
        while let Some(ty) = pending.pop() {
            if let Some(existing) = types.get(&ty.name) {
                if Arc::ptr_eq(existing, &ty) {
                    continue;
                }
                return Err(SchemaError::SchemaBuildFailed(format!(
                    "two different types are named {}",
                    ty.name
                )));
            }
            for field in &ty.fields {
                let descriptor = self.registry.resolve(&field.type_ref)?;
                if let Some(generated) = descriptor.as_generated() {
                    pending.push(Arc::clone(generated));
                }
            }
            types.insert(ty.name.clone(), ty);
        }
        types.sort_keys();
        Ok(types)
    }

    fn register_type(
        &self,
        builder: SchemaBuilder,
        ty: &GeneratedType,
    ) -> Result<SchemaBuilder, SchemaError> {
        trace!(ty = %ty.name, kind = ?ty.kind, "Registering generated type");
        if ty.is_input() {
            return Ok(builder.register(self.build_input_object(ty)?));
        }
        Ok(builder.register(self.build_object(ty)?))
    }

    fn build_object(&self, ty: &GeneratedType) -> Result<Object, SchemaError> {
        let mut object = Object::new(&ty.name);
        if let Some(description) = &ty.description {
            object = object.description(description);
        }
        if ty.fields.is_empty() {
            return Ok(object.field(placeholder_field()));
        }
        for field in &ty.fields {
            object = object.field(self.build_output_field(field)?);
        }
        Ok(object)
    }

    fn build_output_field(&self, field: &GeneratedField) -> Result<Field, SchemaError> {
        let base = self.registry.resolve(&field.type_ref)?;
        let type_ref = field.graphql_type(base.name());
        let keys_only = base.is_scalar();

        let built = match (&field.resolver_kind, &field.source) {
            (ResolverKind::Attribute, FieldSource::Column(column)) => Field::new(
                &field.graphql_name,
                type_ref,
                FieldResolver::attribute(column.clone(), base.name() == TypeRef::ID),
            ),
            (ResolverKind::Computed, FieldSource::Computed(compute)) => Field::new(
                &field.graphql_name,
                type_ref,
                FieldResolver::computed(Arc::clone(compute)),
            ),
            (ResolverKind::RelationSingle, FieldSource::Relation { field: relation, .. }) => {
                Field::new(
                    &field.graphql_name,
                    type_ref,
                    RelationResolver::single(relation.clone(), keys_only),
                )
            }
            (ResolverKind::RelationCollection, FieldSource::Relation { field: relation, hook }) => {
                Field::new(
                    &field.graphql_name,
                    type_ref,
                    RelationResolver::collection(relation.clone(), hook.clone(), keys_only),
                )
                .argument(string_list_argument(FILTERS_ARG))
                .argument(string_list_argument(ORDER_BY_ARG))
            }
            (kind, source) => {
                return Err(SchemaError::SchemaBuildFailed(format!(
                    "field {} pairs resolver {kind:?} with source {source:?}",
                    field.graphql_name
                )));
            }
        };
        Ok(built)
    }

    fn build_input_object(&self, ty: &GeneratedType) -> Result<InputObject, SchemaError> {
        let mut input = InputObject::new(&ty.name);
        if let Some(description) = &ty.description {
            input = input.description(description);
        }
        if ty.fields.is_empty() {
            return Ok(input.field(InputValue::new(
                PLACEHOLDER_FIELD,
                TypeRef::named(TypeRef::STRING),
            )));
        }
        for field in &ty.fields {
            let base = self.registry.resolve(&field.type_ref)?;
            input = input.field(InputValue::new(
                &field.graphql_name,
                field.graphql_type(base.name()),
            ));
        }
        Ok(input)
    }

    /// Builds the Query root.
    fn build_query_type(&self) -> Result<Object, SchemaError> {
        let mut query = Object::new("Query");
        let mut names = HashSet::new();

        for output in &self.query_types {
            let model = &output.model;
            let single = query_field_name(model);
            let list = list_field_name(model);
            claim_name(&mut names, &single)?;
            claim_name(&mut names, &list)?;

            query = query.field(
                Field::new(single, TypeRef::named_nn(&output.name), ReadResolver::resolve(model.clone()))
                    .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID)))
                    .description(format!("Fetch one {model} by id")),
            );
            query = query.field(
                Field::new(
                    list,
                    TypeRef::named_nn_list_nn(&output.name),
                    ListResolver::resolve(model.clone(), self.list_hooks.get(model).cloned()),
                )
                .argument(string_list_argument(FILTERS_ARG))
                .argument(string_list_argument(ORDER_BY_ARG))
                .description(format!("List {model} rows matching filters")),
            );
        }

        if names.is_empty() {
            query = query.field(placeholder_field());
        }
        Ok(query)
    }

    /// Builds the Mutation root.
    fn build_mutation_type(&self, mutations: &[MutationPair]) -> Result<Object, SchemaError> {
        let mut mutation = Object::new("Mutation");
        let mut names = HashSet::new();
        let options = self.config.write_options();

        for pair in mutations {
            let model = &pair.output.model;
            let output = &pair.output.name;
            let hooks = self.save_hooks.get(model).cloned().unwrap_or_default();

            let create = mutation_field_name("create", model, false);
            let create_batch = mutation_field_name("create", model, true);
            let update = mutation_field_name("update", model, true);
            let delete = mutation_field_name("delete", model, true);
            for name in [&create, &create_batch, &update, &delete] {
                claim_name(&mut names, name)?;
            }

            mutation = mutation.field(
                Field::new(
                    create,
                    TypeRef::named_nn(output),
                    CreateResolver::resolve(Arc::clone(&pair.input), hooks.clone()),
                )
                .argument(InputValue::new(DATA_ARG, TypeRef::named_nn(&pair.input.name))),
            );
            mutation = mutation.field(
                Field::new(
                    create_batch,
                    TypeRef::named_nn_list_nn(output),
                    CreateBatchResolver::resolve(Arc::clone(&pair.input), options, hooks),
                )
                .argument(InputValue::new(
                    DATA_ARG,
                    TypeRef::named_nn_list_nn(&pair.input.name),
                )),
            );
            mutation = mutation.field(
                Field::new(
                    update,
                    TypeRef::named_nn_list_nn(output),
                    UpdateResolver::resolve(Arc::clone(&pair.partial), options),
                )
                .argument(InputValue::new(DATA_ARG, TypeRef::named_nn(&pair.partial.name)))
                .argument(string_list_argument(FILTERS_ARG))
                .description("Applies data to the filtered rows; without filters, to every row"),
            );
            mutation = mutation.field(
                Field::new(
                    delete,
                    TypeRef::named_nn_list_nn(TypeRef::ID),
                    DeleteResolver::resolve(model.clone(), options),
                )
                .argument(string_list_argument(FILTERS_ARG))
                .description("Deletes the filtered rows; without filters, every row"),
            );
        }

        if names.is_empty() {
            mutation = mutation.field(placeholder_field());
        }
        Ok(mutation)
    }
}

fn expect_kind(ty: &GeneratedType, kind: TypeKind) -> Result<(), SchemaError> {
    if ty.kind == kind {
        return Ok(());
    }
    Err(SchemaError::InvalidConfig(format!(
        "type {} is {:?}, expected {kind:?}",
        ty.name, ty.kind
    )))
}

fn claim_name(names: &mut HashSet<String>, name: &str) -> Result<(), SchemaError> {
    if names.insert(name.to_string()) {
        return Ok(());
    }
    Err(SchemaError::InvalidConfig(format!(
        "root field {name} is generated twice"
    )))
}

fn string_list_argument(name: &str) -> InputValue {
    InputValue::new(name, TypeRef::named_nn_list(TypeRef::STRING))
}

fn placeholder_field() -> Field {
    Field::new(PLACEHOLDER_FIELD, TypeRef::named(TypeRef::STRING), |_| {
        FieldFuture::new(async { Ok(None::<Value>) })
    })
}

/// An executable schema together with the frozen registry it was built from.
#[derive(Clone)]
pub struct ModelSchema {
    schema: Schema,
    registry: Arc<TypeRegistry>,
}

impl ModelSchema {
    /// Executes a request with `context` injected for the resolvers.
    pub async fn execute(&self, request: impl Into<Request>, context: GraphQLContext) -> Response {
        let request = request.into().data(context);
        self.schema.execute(request).await
    }

    /// The schema in SDL form.
    #[must_use]
    pub fn sdl(&self) -> String {
        self.schema.sdl()
    }

    /// The underlying dynamic schema.
    #[must_use]
    pub fn inner(&self) -> &Schema {
        &self.schema
    }

    /// The registry the schema was built from.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{TypeDeclaration, declare_type};
    use modelgraph_storage::{FieldDefinition, ModelDefinition, StorageKind};

    fn tag() -> ModelDefinition {
        ModelDefinition::new("Tag")
            .field(FieldDefinition::auto_id("id"))
            .field(FieldDefinition::new("name", StorageKind::Char))
    }

    #[test]
    fn test_default_config() {
        let config = SchemaBuilderConfig::default();
        assert_eq!(config.max_depth, 15);
        assert_eq!(config.max_complexity, 500);
        assert!(config.introspection_enabled);
        assert_eq!(config.max_batch_size, 100);
    }

    #[test]
    fn test_empty_schema_has_placeholders() {
        let schema = ModelSchemaBuilder::new(TypeRegistry::new(), SchemaBuilderConfig::default())
            .build()
            .unwrap();
        let sdl = schema.sdl();
        assert!(sdl.contains("type Query"), "Schema should have Query type");
        assert!(sdl.contains("type Mutation"), "Schema should have Mutation type");
        assert!(sdl.contains("_placeholder"));
    }

    #[test]
    fn test_schema_with_model_types() {
        let mut registry = TypeRegistry::new();
        let output = declare_type(&mut registry, TypeDeclaration::output(&tag())).unwrap();
        let input = declare_type(&mut registry, TypeDeclaration::input(&tag())).unwrap();

        let schema = ModelSchemaBuilder::new(registry, SchemaBuilderConfig::default())
            .query_type(Arc::clone(&output))
            .mutation_types(input, output)
            .build()
            .unwrap();
        let sdl = schema.sdl();

        assert!(sdl.contains("type Tag"));
        assert!(sdl.contains("input TagInput"));
        assert!(sdl.contains("input TagInputPartial"));
        assert!(sdl.contains("tag(id: ID!): Tag!"));
        assert!(sdl.contains("tags(filters: [String!], orderBy: [String!]): [Tag!]!"));
        assert!(sdl.contains("createTag(data: TagInput!): Tag!"));
        assert!(sdl.contains("createTags(data: [TagInput!]!): [Tag!]!"));
        assert!(sdl.contains("deleteTags(filters: [String!]): [ID!]!"));
        assert!(!sdl.contains("_placeholder"));
    }

    #[test]
    fn test_mismatched_mutation_types() {
        let mut registry = TypeRegistry::new();
        let output = declare_type(&mut registry, TypeDeclaration::output(&tag())).unwrap();
        let err = ModelSchemaBuilder::new(registry, SchemaBuilderConfig::default())
            .mutation_types(Arc::clone(&output), output)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SchemaError::InvalidConfig(_)));
    }

    #[test]
    fn test_hooks_need_matching_root_fields() {
        let mut registry = TypeRegistry::new();
        let output = declare_type(&mut registry, TypeDeclaration::output(&tag())).unwrap();
        let err = ModelSchemaBuilder::new(registry, SchemaBuilderConfig::default())
            .query_type(Arc::clone(&output))
            .pre_save_hook("Tag", |_, _| Ok(()))
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("save hook set for Tag"));

        let mut registry = TypeRegistry::new();
        let output = declare_type(&mut registry, TypeDeclaration::output(&tag())).unwrap();
        let err = ModelSchemaBuilder::new(registry, SchemaBuilderConfig::default())
            .query_type(output)
            .list_hook("User", |_, rows| rows)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SchemaError::InvalidConfig(ref msg) if msg.contains("User")));
    }

    #[test]
    fn test_duplicate_type_names_fail() {
        let mut registry = TypeRegistry::new();
        let output = declare_type(&mut registry, TypeDeclaration::output(&tag())).unwrap();
        let clash = declare_type(
            &mut registry,
            TypeDeclaration::output(&tag()).fields(["name"]).name("Tag"),
        )
        .unwrap();
        let err = ModelSchemaBuilder::new(registry, SchemaBuilderConfig::default())
            .query_type(output)
            .query_type(clash)
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("Tag"));
    }

    #[test]
    fn test_schema_with_disabled_introspection() {
        let config = SchemaBuilderConfig {
            introspection_enabled: false,
            ..Default::default()
        };
        let result = ModelSchemaBuilder::new(TypeRegistry::new(), config).build();
        assert!(
            result.is_ok(),
            "Schema should build with introspection disabled"
        );
    }
}
