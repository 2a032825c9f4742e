//! In-memory store for unit testing and local development.
//!
//! Mirrors the observable behavior of the Postgres store: the same tenant
//! scoping, stable ordering, and atomic booking semantics. All mutating
//! appointment operations run under one write lock, which is what makes
//! `book_if_free`/`move_if_free` atomic here.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Utc, Weekday};
use parking_lot::RwLock;
use serde_json::Value;

use super::super::error::{StoreError, StoreResult};
use super::super::store::{AppointmentStore, BookingOutcome, EntityStore};
use crate::api::{RecordId, TenantId};
use crate::models::{
    Appointment, AppointmentId, AppointmentStatus, DoctorId, DoctorSchedule, EntityRecord,
    FieldMap, TimeInterval,
};
use crate::registry::{FieldFilter, FilterOp, ResolvedQuery, SortDirection};

#[derive(Default)]
struct LocalState {
    /// entity name → record id → record
    records: HashMap<String, HashMap<RecordId, EntityRecord>>,
    schedules: Vec<DoctorSchedule>,
    appointments: HashMap<AppointmentId, Appointment>,
}

/// In-memory implementation of both store traits.
#[derive(Default)]
pub struct LocalStore {
    state: RwLock<LocalState>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(state: &LocalState, entity: &str, tenant: &TenantId, query: &ResolvedQuery) -> Vec<EntityRecord> {
        let Some(records) = state.records.get(entity) else {
            return Vec::new();
        };

        records
            .values()
            .filter(|record| &record.tenant == tenant)
            .filter(|record| query.filters.iter().all(|f| filter_matches(record, f)))
            .filter(|record| search_matches(record, query))
            .cloned()
            .collect()
    }

    fn sorted(mut records: Vec<EntityRecord>, query: &ResolvedQuery) -> Vec<EntityRecord> {
        records.sort_by(|a, b| {
            let primary = match &query.sort {
                Some((field, direction)) => {
                    let ordering = value_cmp(
                        a.fields.get(field).unwrap_or(&Value::Null),
                        b.fields.get(field).unwrap_or(&Value::Null),
                    );
                    match direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                }
                None => a.created_at.cmp(&b.created_at),
            };
            // Ties always break by id ascending so repeated queries return
            // a deterministic order.
            primary.then_with(|| a.id.cmp(&b.id))
        });
        records
    }
}

fn filter_matches(record: &EntityRecord, filter: &FieldFilter) -> bool {
    let Some(value) = record.fields.get(&filter.field) else {
        return false;
    };

    match filter.op {
        FilterOp::Eq => value_cmp(value, &filter.value) == Ordering::Equal,
        FilterOp::Gte => value_cmp(value, &filter.value) != Ordering::Less,
        FilterOp::Lte => value_cmp(value, &filter.value) != Ordering::Greater,
    }
}

fn search_matches(record: &EntityRecord, query: &ResolvedQuery) -> bool {
    let Some(needle) = &query.search else {
        return true;
    };
    let needle = needle.to_lowercase();

    query.search_fields.iter().any(|field| {
        record
            .fields
            .get(field)
            .and_then(Value::as_str)
            .map(|text| text.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

/// Total order over JSON scalars: null < bool < number < string < rest.
/// Numbers compare as f64, strings lexically.
fn value_cmp(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            _ => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn overlaps_active(
    appointments: &HashMap<AppointmentId, Appointment>,
    doctor: &DoctorId,
    interval: TimeInterval,
    exclude: Option<&AppointmentId>,
) -> bool {
    appointments.values().any(|appointment| {
        Some(&appointment.id) != exclude
            && appointment.doctor_id == *doctor
            && AppointmentStatus::ACTIVE.contains(&appointment.status)
            && appointment.interval.overlaps(&interval)
    })
}

#[async_trait]
impl EntityStore for LocalStore {
    async fn fetch_page(
        &self,
        entity: &str,
        tenant: &TenantId,
        query: &ResolvedQuery,
    ) -> StoreResult<Vec<EntityRecord>> {
        let state = self.state.read();
        let records = Self::sorted(Self::matching(&state, entity, tenant, query), query);
        Ok(records
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .collect())
    }

    async fn count(
        &self,
        entity: &str,
        tenant: &TenantId,
        query: &ResolvedQuery,
    ) -> StoreResult<u64> {
        let state = self.state.read();
        Ok(Self::matching(&state, entity, tenant, query).len() as u64)
    }

    async fn fetch(
        &self,
        entity: &str,
        tenant: &TenantId,
        id: &RecordId,
    ) -> StoreResult<Option<EntityRecord>> {
        let state = self.state.read();
        Ok(state
            .records
            .get(entity)
            .and_then(|records| records.get(id))
            .filter(|record| &record.tenant == tenant)
            .cloned())
    }

    async fn insert(&self, entity: &str, record: EntityRecord) -> StoreResult<EntityRecord> {
        let mut state = self.state.write();
        state
            .records
            .entry(entity.to_string())
            .or_default()
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        entity: &str,
        tenant: &TenantId,
        id: &RecordId,
        fields: FieldMap,
    ) -> StoreResult<Option<EntityRecord>> {
        let mut state = self.state.write();
        let Some(record) = state
            .records
            .get_mut(entity)
            .and_then(|records| records.get_mut(id))
            .filter(|record| &record.tenant == tenant)
        else {
            return Ok(None);
        };

        record.fields = fields;
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn delete(&self, entity: &str, tenant: &TenantId, id: &RecordId) -> StoreResult<bool> {
        let mut state = self.state.write();
        let Some(records) = state.records.get_mut(entity) else {
            return Ok(false);
        };
        if records.get(id).map(|r| &r.tenant == tenant) != Some(true) {
            return Ok(false);
        }
        Ok(records.remove(id).is_some())
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }
}

#[async_trait]
impl AppointmentStore for LocalStore {
    async fn weekly_schedule(
        &self,
        doctor: &DoctorId,
        weekday: Weekday,
    ) -> StoreResult<Vec<DoctorSchedule>> {
        let state = self.state.read();
        let mut rows: Vec<DoctorSchedule> = state
            .schedules
            .iter()
            .filter(|row| row.doctor_id == *doctor && row.weekday == weekday)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.start);
        Ok(rows)
    }

    async fn put_schedule(&self, schedule: DoctorSchedule) -> StoreResult<()> {
        let mut state = self.state.write();
        state.schedules.retain(|row| {
            !(row.doctor_id == schedule.doctor_id
                && row.weekday == schedule.weekday
                && row.start == schedule.start)
        });
        state.schedules.push(schedule);
        Ok(())
    }

    async fn appointments_overlapping(
        &self,
        doctor: &DoctorId,
        window: TimeInterval,
        statuses: &[AppointmentStatus],
    ) -> StoreResult<Vec<Appointment>> {
        let state = self.state.read();
        let mut rows: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|appointment| {
                appointment.doctor_id == *doctor
                    && statuses.contains(&appointment.status)
                    && appointment.interval.overlaps(&window)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|appointment| appointment.interval.start);
        Ok(rows)
    }

    async fn fetch_appointment(&self, id: &AppointmentId) -> StoreResult<Option<Appointment>> {
        let state = self.state.read();
        Ok(state.appointments.get(id).cloned())
    }

    async fn book_if_free(&self, appointment: Appointment) -> StoreResult<BookingOutcome> {
        let mut state = self.state.write();
        if overlaps_active(
            &state.appointments,
            &appointment.doctor_id,
            appointment.interval,
            None,
        ) {
            return Ok(BookingOutcome::Conflict);
        }

        state.appointments.insert(appointment.id, appointment.clone());
        Ok(BookingOutcome::Booked(appointment))
    }

    async fn update_status(
        &self,
        id: &AppointmentId,
        status: AppointmentStatus,
    ) -> StoreResult<Appointment> {
        let mut state = self.state.write();
        let appointment = state
            .appointments
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(format!("appointment {}", id)))?;

        appointment.status = status;
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    async fn move_if_free(
        &self,
        id: &AppointmentId,
        interval: TimeInterval,
    ) -> StoreResult<BookingOutcome> {
        let mut state = self.state.write();
        let doctor_id = state
            .appointments
            .get(id)
            .map(|appointment| appointment.doctor_id)
            .ok_or_else(|| StoreError::not_found(format!("appointment {}", id)))?;

        if overlaps_active(&state.appointments, &doctor_id, interval, Some(id)) {
            return Ok(BookingOutcome::Conflict);
        }

        match state.appointments.get_mut(id) {
            Some(appointment) => {
                appointment.interval = interval;
                appointment.updated_at = Utc::now();
                Ok(BookingOutcome::Booked(appointment.clone()))
            }
            None => Err(StoreError::internal(format!(
                "appointment {} vanished during move",
                id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::QuerySpec;
    use crate::registry::{EntityDescriptor, FieldSpec, FieldType};
    use serde_json::json;

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(
            "products",
            vec![
                FieldSpec::new("name", FieldType::Text).searchable().sortable(),
                FieldSpec::new("price", FieldType::Float).range_filterable().sortable(),
            ],
        )
    }

    fn record(tenant: &str, name: &str, price: f64) -> EntityRecord {
        let mut fields = FieldMap::new();
        fields.insert("name".to_string(), json!(name));
        fields.insert("price".to_string(), json!(price));
        EntityRecord::new(TenantId::new(tenant), fields)
    }

    fn resolved(spec: QuerySpec) -> ResolvedQuery {
        spec.resolve(&descriptor()).unwrap()
    }

    #[tokio::test]
    async fn test_tenant_scoping_on_reads() {
        let store = LocalStore::new();
        let mine = record("acme", "Widget", 10.0);
        let theirs = record("globex", "Widget", 10.0);
        let mine_id = mine.id;
        let theirs_id = theirs.id;
        store.insert("products", mine).await.unwrap();
        store.insert("products", theirs).await.unwrap();

        let acme = TenantId::new("acme");
        let page = store
            .fetch_page("products", &acme, &resolved(QuerySpec::default()))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, mine_id);

        assert!(store
            .fetch("products", &acme, &theirs_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_sort_with_id_tiebreak_is_deterministic() {
        let store = LocalStore::new();
        for _ in 0..5 {
            store
                .insert("products", record("acme", "Same", 5.0))
                .await
                .unwrap();
        }

        let acme = TenantId::new("acme");
        let query = resolved(QuerySpec::default().with_sort("name", SortDirection::Asc));
        let first = store.fetch_page("products", &acme, &query).await.unwrap();
        let second = store.fetch_page("products", &acme, &query).await.unwrap();
        let ids: Vec<RecordId> = first.iter().map(|r| r.id).collect();
        assert_eq!(ids, second.iter().map(|r| r.id).collect::<Vec<_>>());

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn test_range_filter_and_count() {
        let store = LocalStore::new();
        for (name, price) in [("A", 5.0), ("B", 10.0), ("C", 20.0)] {
            store.insert("products", record("acme", name, price)).await.unwrap();
        }

        let acme = TenantId::new("acme");
        let query = resolved(QuerySpec::default().with_filter("price", FilterOp::Gte, json!(10.0)));
        assert_eq!(store.count("products", &acme, &query).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let store = LocalStore::new();
        store
            .insert("products", record("acme", "Deluxe Widget", 10.0))
            .await
            .unwrap();
        store
            .insert("products", record("acme", "Gadget", 10.0))
            .await
            .unwrap();

        let acme = TenantId::new("acme");
        let query = resolved(QuerySpec::default().with_search("wIdGeT"));
        assert_eq!(store.count("products", &acme, &query).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_book_if_free_rejects_overlap() {
        let store = LocalStore::new();
        let doctor = DoctorId::generate();
        let first = Appointment::book(
            crate::models::PatientId::generate(),
            doctor,
            TimeInterval::new(
                chrono::DateTime::from_timestamp(1_000_000, 0).unwrap(),
                chrono::DateTime::from_timestamp(1_001_800, 0).unwrap(),
            )
            .unwrap(),
            crate::models::BookingChannel::Web,
            None,
        );
        let second = Appointment::book(
            crate::models::PatientId::generate(),
            doctor,
            TimeInterval::new(
                chrono::DateTime::from_timestamp(1_000_900, 0).unwrap(),
                chrono::DateTime::from_timestamp(1_002_700, 0).unwrap(),
            )
            .unwrap(),
            crate::models::BookingChannel::Web,
            None,
        );

        assert!(matches!(
            store.book_if_free(first).await.unwrap(),
            BookingOutcome::Booked(_)
        ));
        assert!(matches!(
            store.book_if_free(second).await.unwrap(),
            BookingOutcome::Conflict
        ));
    }
}
