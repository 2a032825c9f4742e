//! Generic entity records handled by the CRUD engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::{RecordId, TenantId};

/// Field name → value map of a record's domain fields.
pub type FieldMap = Map<String, Value>;

/// A stored record of a registered entity.
///
/// The engine treats the domain fields as an opaque name → value map;
/// typing rules live in the entity's descriptor. Identity and tenant are
/// first-class and can never be overwritten through a payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: RecordId,
    pub tenant: TenantId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fields: FieldMap,
}

impl EntityRecord {
    /// Build a fresh record for `tenant` from already-validated fields.
    pub fn new(tenant: TenantId, fields: FieldMap) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            tenant,
            created_at: now,
            updated_at: now,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}
