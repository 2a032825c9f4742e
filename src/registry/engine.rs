//! One CRUD code path for every registered entity.
//!
//! The engine validates against the entity's descriptor, applies tenant
//! scoping unconditionally, and delegates persistence to an
//! [`EntityStore`]. It holds no state between calls, so concurrent use
//! across entities and tenants is safe by construction.

use std::sync::Arc;

use log::debug;
use serde::Serialize;

use super::{EntityDescriptor, EntityRegistry, QuerySpec};
use crate::api::{Paged, RecordId, TenantId};
use crate::db::store::EntityStore;
use crate::error::{CoreError, CoreResult};
use crate::models::{EntityRecord, FieldMap};

/// Keys stamped by the engine; payloads cannot set or overwrite them.
const RESERVED_KEYS: &[&str] = &["id", "tenant", "created_at", "updated_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkStatus {
    Success,
    Error,
}

/// Outcome of one item of a bulk operation, reported in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BulkItemResult {
    pub index: usize,
    pub status: BulkStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkItemResult {
    fn success(index: usize, id: RecordId) -> Self {
        Self {
            index,
            status: BulkStatus::Success,
            id: Some(id),
            error: None,
        }
    }

    fn failure(index: usize, id: Option<RecordId>, error: &CoreError) -> Self {
        Self {
            index,
            status: BulkStatus::Error,
            id,
            error: Some(error.to_string()),
        }
    }
}

/// Generic CRUD service over any registered entity.
pub struct CrudEngine {
    registry: EntityRegistry,
    store: Arc<dyn EntityStore>,
}

impl CrudEngine {
    pub fn new(registry: EntityRegistry, store: Arc<dyn EntityStore>) -> Self {
        Self { registry, store }
    }

    /// All registered descriptors, ordered by entity name.
    pub fn entities(&self) -> Vec<&EntityDescriptor> {
        self.registry.descriptors().collect()
    }

    /// Field list and validation rules for one entity.
    pub fn schema(&self, entity: &str) -> CoreResult<&EntityDescriptor> {
        self.registry.descriptor(entity)
    }

    /// List records matching `query`, scoped to `tenant`.
    pub async fn list(
        &self,
        entity: &str,
        query: QuerySpec,
        tenant: &TenantId,
    ) -> CoreResult<Paged<EntityRecord>> {
        let descriptor = self.registry.descriptor(entity)?;
        let resolved = query.resolve(descriptor)?;

        let total = self.store.count(entity, tenant, &resolved).await?;
        let items = self.store.fetch_page(entity, tenant, &resolved).await?;
        Ok(Paged::new(items, resolved.page, resolved.page_size, total))
    }

    /// Fetch one record. Absent and foreign-tenant records are the same
    /// `NotFound`.
    pub async fn get(
        &self,
        entity: &str,
        id: &RecordId,
        tenant: &TenantId,
    ) -> CoreResult<EntityRecord> {
        self.registry.descriptor(entity)?;
        self.store
            .fetch(entity, tenant, id)
            .await?
            .ok_or_else(|| CoreError::not_found(entity, id))
    }

    /// Validate and persist a new record, stamping id/tenant/timestamps.
    pub async fn create(
        &self,
        entity: &str,
        payload: FieldMap,
        tenant: &TenantId,
    ) -> CoreResult<EntityRecord> {
        let descriptor = self.registry.descriptor(entity)?;
        let fields = strip_reserved(payload);

        let errors = descriptor.validate(&fields);
        if !errors.is_empty() {
            return Err(CoreError::validation(errors));
        }

        let record = EntityRecord::new(tenant.clone(), fields);
        let stored = self.store.insert(entity, record).await?;
        debug!("created {} record {} for tenant {}", entity, stored.id, tenant);
        Ok(stored)
    }

    /// Tenant-scoped fetch → merge → validate → persist. Reserved keys in
    /// the patch are ignored; a null value clears an optional field.
    pub async fn update(
        &self,
        entity: &str,
        id: &RecordId,
        patch: FieldMap,
        tenant: &TenantId,
    ) -> CoreResult<EntityRecord> {
        let descriptor = self.registry.descriptor(entity)?;
        let patch = strip_reserved(patch);

        let current = self
            .store
            .fetch(entity, tenant, id)
            .await?
            .ok_or_else(|| CoreError::not_found(entity, id))?;

        let mut merged = current.fields;
        for (name, value) in patch {
            if value.is_null() {
                merged.remove(&name);
            } else {
                merged.insert(name, value);
            }
        }

        let errors = descriptor.validate(&merged);
        if !errors.is_empty() {
            return Err(CoreError::validation(errors));
        }

        self.store
            .update(entity, tenant, id, merged)
            .await?
            .ok_or_else(|| CoreError::not_found(entity, id))
    }

    /// Tenant-scoped delete. Deleting an absent record is `NotFound`, so a
    /// mistaken double-delete surfaces instead of silently succeeding.
    pub async fn remove(&self, entity: &str, id: &RecordId, tenant: &TenantId) -> CoreResult<()> {
        self.registry.descriptor(entity)?;
        if self.store.delete(entity, tenant, id).await? {
            debug!("deleted {} record {} for tenant {}", entity, id, tenant);
            Ok(())
        } else {
            Err(CoreError::not_found(entity, id))
        }
    }

    /// Create many records, one result per item in input order. Valid
    /// items are persisted even when siblings fail.
    pub async fn bulk_create(
        &self,
        entity: &str,
        items: Vec<FieldMap>,
        tenant: &TenantId,
    ) -> CoreResult<Vec<BulkItemResult>> {
        self.registry.descriptor(entity)?;

        let mut results = Vec::with_capacity(items.len());
        for (index, payload) in items.into_iter().enumerate() {
            match self.create(entity, payload, tenant).await {
                Ok(record) => results.push(BulkItemResult::success(index, record.id)),
                Err(err) => results.push(BulkItemResult::failure(index, None, &err)),
            }
        }
        Ok(results)
    }

    /// Patch many records, one result per item in input order.
    pub async fn bulk_update(
        &self,
        entity: &str,
        items: Vec<(RecordId, FieldMap)>,
        tenant: &TenantId,
    ) -> CoreResult<Vec<BulkItemResult>> {
        self.registry.descriptor(entity)?;

        let mut results = Vec::with_capacity(items.len());
        for (index, (id, patch)) in items.into_iter().enumerate() {
            match self.update(entity, &id, patch, tenant).await {
                Ok(record) => results.push(BulkItemResult::success(index, record.id)),
                Err(err) => results.push(BulkItemResult::failure(index, Some(id), &err)),
            }
        }
        Ok(results)
    }

    /// Delete many records, one result per item in input order.
    pub async fn bulk_delete(
        &self,
        entity: &str,
        ids: Vec<RecordId>,
        tenant: &TenantId,
    ) -> CoreResult<Vec<BulkItemResult>> {
        self.registry.descriptor(entity)?;

        let mut results = Vec::with_capacity(ids.len());
        for (index, id) in ids.into_iter().enumerate() {
            match self.remove(entity, &id, tenant).await {
                Ok(()) => results.push(BulkItemResult::success(index, id)),
                Err(err) => results.push(BulkItemResult::failure(index, Some(id), &err)),
            }
        }
        Ok(results)
    }
}

fn strip_reserved(mut fields: FieldMap) -> FieldMap {
    for key in RESERVED_KEYS {
        fields.remove(*key);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalStore;
    use serde_json::json;

    fn engine() -> CrudEngine {
        CrudEngine::new(EntityRegistry::with_defaults(), Arc::new(LocalStore::new()))
    }

    fn tenant(name: &str) -> TenantId {
        TenantId::new(name)
    }

    fn product(name: &str, sku: &str) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("name".to_string(), json!(name));
        fields.insert("sku".to_string(), json!(sku));
        fields
    }

    #[tokio::test]
    async fn test_unknown_entity_everywhere() {
        let engine = engine();
        let acme = tenant("acme");
        let id = RecordId::generate();

        assert!(matches!(
            engine.schema("nope"),
            Err(CoreError::UnknownEntity(_))
        ));
        assert!(matches!(
            engine.list("nope", QuerySpec::default(), &acme).await,
            Err(CoreError::UnknownEntity(_))
        ));
        assert!(matches!(
            engine.get("nope", &id, &acme).await,
            Err(CoreError::UnknownEntity(_))
        ));
        assert!(matches!(
            engine.remove("nope", &id, &acme).await,
            Err(CoreError::UnknownEntity(_))
        ));
    }

    #[tokio::test]
    async fn test_create_strips_reserved_keys() {
        let engine = engine();
        let acme = tenant("acme");

        let mut payload = product("Widget", "W-1");
        payload.insert("id".to_string(), json!("11111111-1111-1111-1111-111111111111"));
        payload.insert("tenant".to_string(), json!("evil"));

        let record = engine.create("products", payload, &acme).await.unwrap();
        assert_eq!(record.tenant, acme);
        assert!(record.field("id").is_none());
        assert!(record.field("tenant").is_none());
    }

    #[tokio::test]
    async fn test_update_ignores_identity_overwrites() {
        let engine = engine();
        let acme = tenant("acme");
        let record = engine
            .create("products", product("Widget", "W-1"), &acme)
            .await
            .unwrap();

        let mut patch = FieldMap::new();
        patch.insert("id".to_string(), json!("22222222-2222-2222-2222-222222222222"));
        patch.insert("name".to_string(), json!("Widget v2"));

        let updated = engine.update("products", &record.id, patch, &acme).await.unwrap();
        assert_eq!(updated.id, record.id);
        assert_eq!(updated.field("name"), Some(&json!("Widget v2")));
    }

    #[tokio::test]
    async fn test_update_patch_cannot_drop_required_field() {
        let engine = engine();
        let acme = tenant("acme");
        let record = engine
            .create("products", product("Widget", "W-1"), &acme)
            .await
            .unwrap();

        let mut patch = FieldMap::new();
        patch.insert("name".to_string(), serde_json::Value::Null);

        match engine.update("products", &record.id, patch, &acme).await {
            Err(CoreError::ValidationError { fields }) => {
                assert_eq!(fields[0].field, "name");
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }
}
