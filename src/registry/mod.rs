//! Entity registry: the static descriptor table built at process start.
//!
//! The registry replaces the dynamic entity-to-model dispatch of earlier
//! Orchestrall generations with typed descriptors constructed once at
//! startup, while keeping the "one code path for all entities" property:
//! the [`CrudEngine`] never special-cases an entity, it only consults the
//! descriptor handed to it.

pub mod descriptor;
pub mod engine;
pub mod query;

pub use descriptor::{EntityDescriptor, FieldSpec, FieldType};
pub use engine::{BulkItemResult, BulkStatus, CrudEngine};
pub use query::{
    FieldFilter, FilterOp, QuerySpec, ResolvedQuery, SortDirection, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};

use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};

/// Name → descriptor map, immutable once handed to the engine.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    descriptors: BTreeMap<String, EntityDescriptor>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Registering the same name twice replaces the
    /// earlier descriptor; startup code owns the final word.
    pub fn register(mut self, descriptor: EntityDescriptor) -> Self {
        self.descriptors
            .insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn descriptor(&self, entity: &str) -> CoreResult<&EntityDescriptor> {
        self.descriptors
            .get(entity)
            .ok_or_else(|| CoreError::UnknownEntity(entity.to_string()))
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.descriptors.values()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// The stock Orchestrall entities.
    pub fn with_defaults() -> Self {
        use FieldType::*;

        Self::new()
            .register(EntityDescriptor::new(
                "organizations",
                vec![
                    FieldSpec::new("name", Text).required().searchable().sortable(),
                    FieldSpec::new("legal_name", Text).searchable(),
                    FieldSpec::new("plan", Text).filterable(),
                    FieldSpec::new("contact_email", Text).searchable(),
                    FieldSpec::new("active", Boolean).filterable(),
                ],
            ))
            .register(EntityDescriptor::new(
                "users",
                vec![
                    FieldSpec::new("email", Text).required().searchable().filterable().sortable(),
                    FieldSpec::new("full_name", Text).required().searchable().sortable(),
                    FieldSpec::new("role", Text).filterable(),
                    FieldSpec::new("active", Boolean).filterable(),
                ],
            ))
            .register(EntityDescriptor::new(
                "products",
                vec![
                    FieldSpec::new("name", Text).required().searchable().sortable(),
                    FieldSpec::new("sku", Text).required().filterable(),
                    FieldSpec::new("description", Text).searchable(),
                    FieldSpec::new("category", Text).filterable(),
                    FieldSpec::new("price", Float).range_filterable().sortable(),
                    FieldSpec::new("stock", Integer).range_filterable(),
                    FieldSpec::new("active", Boolean).filterable(),
                ],
            ))
            .register(EntityDescriptor::new(
                "orders",
                vec![
                    FieldSpec::new("order_number", Text).required().filterable().sortable(),
                    FieldSpec::new("customer_name", Text).searchable(),
                    FieldSpec::new("status", Text).filterable(),
                    FieldSpec::new("total", Float).range_filterable().sortable(),
                    FieldSpec::new("placed_at", Timestamp).range_filterable().sortable(),
                ],
            ))
            .register(EntityDescriptor::new(
                "patients",
                vec![
                    FieldSpec::new("full_name", Text).required().searchable().sortable(),
                    FieldSpec::new("phone", Text).required().filterable(),
                    FieldSpec::new("email", Text).searchable(),
                    FieldSpec::new("date_of_birth", Timestamp).range_filterable(),
                    FieldSpec::new("preferred_language", Text).filterable(),
                ],
            ))
            .register(EntityDescriptor::new(
                "doctors",
                vec![
                    FieldSpec::new("full_name", Text).required().searchable().sortable(),
                    FieldSpec::new("specialty", Text).filterable().searchable(),
                    FieldSpec::new("registration_number", Text).required().filterable(),
                    FieldSpec::new("active", Boolean).filterable(),
                ],
            ))
    }
}
