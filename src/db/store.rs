//! Store trait definitions: the data-access seam both engines call through.
//!
//! Implementations are expected to be stateless between calls and safely
//! callable from concurrent tasks. The two conflict-checked writes
//! (`book_if_free`, `move_if_free`) must execute the overlap check and the
//! write as one atomic unit inside the store; application-level locking
//! alone is not enough to close the double-booking race.

use async_trait::async_trait;
use chrono::Weekday;

use super::error::StoreResult;
use crate::api::{RecordId, TenantId};
use crate::models::{
    Appointment, AppointmentId, AppointmentStatus, DoctorId, DoctorSchedule, EntityRecord,
    FieldMap, TimeInterval,
};
use crate::registry::ResolvedQuery;

/// Outcome of an atomic conflict-checked write.
#[derive(Debug, Clone)]
pub enum BookingOutcome {
    /// The write committed; the stored appointment is returned.
    Booked(Appointment),
    /// An overlapping booked/confirmed appointment already holds the
    /// interval; nothing was written.
    Conflict,
}

/// Tenant-scoped persistence for registry entities.
///
/// Every read and write is filtered by the caller's tenant; a record owned
/// by another tenant behaves exactly like an absent record.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch one page of records matching `query`, in the query's stable
    /// order (sort key, then record id ascending).
    async fn fetch_page(
        &self,
        entity: &str,
        tenant: &TenantId,
        query: &ResolvedQuery,
    ) -> StoreResult<Vec<EntityRecord>>;

    /// Count all records matching `query`, ignoring pagination.
    async fn count(
        &self,
        entity: &str,
        tenant: &TenantId,
        query: &ResolvedQuery,
    ) -> StoreResult<u64>;

    async fn fetch(
        &self,
        entity: &str,
        tenant: &TenantId,
        id: &RecordId,
    ) -> StoreResult<Option<EntityRecord>>;

    async fn insert(&self, entity: &str, record: EntityRecord) -> StoreResult<EntityRecord>;

    /// Replace the domain fields of a record, bumping `updated_at`.
    /// Returns `None` when the record is absent for the tenant.
    async fn update(
        &self,
        entity: &str,
        tenant: &TenantId,
        id: &RecordId,
        fields: FieldMap,
    ) -> StoreResult<Option<EntityRecord>>;

    /// Delete a record. Returns whether a row was actually removed.
    async fn delete(&self, entity: &str, tenant: &TenantId, id: &RecordId) -> StoreResult<bool>;

    /// Cheap connectivity probe.
    async fn health_check(&self) -> StoreResult<bool>;
}

/// Persistence for doctor schedules and appointments.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Schedule rows for `doctor` on `weekday`, ordered by start time.
    async fn weekly_schedule(
        &self,
        doctor: &DoctorId,
        weekday: Weekday,
    ) -> StoreResult<Vec<DoctorSchedule>>;

    /// Insert or replace the schedule row keyed by (doctor, weekday, start).
    async fn put_schedule(&self, schedule: DoctorSchedule) -> StoreResult<()>;

    /// Appointments for `doctor` in any of `statuses` overlapping `window`,
    /// ordered by start time.
    async fn appointments_overlapping(
        &self,
        doctor: &DoctorId,
        window: TimeInterval,
        statuses: &[AppointmentStatus],
    ) -> StoreResult<Vec<Appointment>>;

    async fn fetch_appointment(&self, id: &AppointmentId) -> StoreResult<Option<Appointment>>;

    /// Overlap check + insert as one atomic unit.
    async fn book_if_free(&self, appointment: Appointment) -> StoreResult<BookingOutcome>;

    /// Set the status of an existing appointment, bumping `updated_at`.
    async fn update_status(
        &self,
        id: &AppointmentId,
        status: AppointmentStatus,
    ) -> StoreResult<Appointment>;

    /// Overlap check (excluding the moved appointment) + in-place interval
    /// replace as one atomic unit. The appointment keeps its id and status.
    async fn move_if_free(
        &self,
        id: &AppointmentId,
        interval: TimeInterval,
    ) -> StoreResult<BookingOutcome>;
}

/// Both store capabilities behind one handle.
pub trait FullStore: EntityStore + AppointmentStore {}

impl<T: EntityStore + AppointmentStore> FullStore for T {}
