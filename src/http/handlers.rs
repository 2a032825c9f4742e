//! HTTP handlers for the REST API.
//!
//! Each handler extracts the tenant, delegates to the CRUD engine or the
//! scheduler, and lets [`AppError`] translate core errors into responses.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use uuid::Uuid;

use super::dto::{
    query_spec_from_params, BookAppointmentRequest, BulkCreateRequest, BulkDeleteRequest,
    BulkUpdateRequest, EntityListResponse, HealthResponse, PutScheduleRequest, RescheduleRequest,
    ScheduleDto, SlotsQuery,
};
use super::error::AppError;
use super::state::AppState;
use crate::api::{Paged, RecordId, TenantId};
use crate::db::store::{AppointmentStore as _, EntityStore as _};
use crate::models::{
    Appointment, AppointmentId, DoctorId, EntityRecord, FieldMap, PatientId, Slot,
};
use crate::registry::{BulkItemResult, EntityDescriptor};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Header carrying the calling tenant.
const TENANT_HEADER: &str = "x-organization-id";

fn tenant_from_headers(headers: &HeaderMap) -> Result<TenantId, AppError> {
    headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(TenantId::new)
        .ok_or_else(|| AppError::BadRequest(format!("missing {} header", TENANT_HEADER)))
}

// =============================================================================
// Health
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let database = match state.store.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database,
    }))
}

// =============================================================================
// Entity catalog
// =============================================================================

/// GET /v1/entities
pub async fn list_entities(State(state): State<AppState>) -> HandlerResult<EntityListResponse> {
    let entities: Vec<EntityDescriptor> =
        state.engine.entities().into_iter().cloned().collect();
    let total = entities.len();
    Ok(Json(EntityListResponse { entities, total }))
}

/// GET /v1/entities/{entity}/schema
pub async fn get_schema(
    State(state): State<AppState>,
    Path(entity): Path<String>,
) -> HandlerResult<EntityDescriptor> {
    let descriptor = state.engine.schema(&entity)?;
    Ok(Json(descriptor.clone()))
}

// =============================================================================
// Generic entity CRUD
// =============================================================================

/// GET /v1/data/{entity}
pub async fn list_records(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult<Paged<EntityRecord>> {
    let tenant = tenant_from_headers(&headers)?;
    let spec = query_spec_from_params(params).map_err(AppError::BadRequest)?;
    let page = state.engine.list(&entity, spec, &tenant).await?;
    Ok(Json(page))
}

/// POST /v1/data/{entity}
pub async fn create_record(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<FieldMap>,
) -> HandlerResult<EntityRecord> {
    let tenant = tenant_from_headers(&headers)?;
    let record = state.engine.create(&entity, payload, &tenant).await?;
    Ok(Json(record))
}

/// GET /v1/data/{entity}/{id}
pub async fn get_record(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> HandlerResult<EntityRecord> {
    let tenant = tenant_from_headers(&headers)?;
    let record = state.engine.get(&entity, &RecordId::new(id), &tenant).await?;
    Ok(Json(record))
}

/// PATCH /v1/data/{entity}/{id}
pub async fn update_record(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, Uuid)>,
    headers: HeaderMap,
    Json(patch): Json<FieldMap>,
) -> HandlerResult<EntityRecord> {
    let tenant = tenant_from_headers(&headers)?;
    let record = state
        .engine
        .update(&entity, &RecordId::new(id), patch, &tenant)
        .await?;
    Ok(Json(record))
}

/// DELETE /v1/data/{entity}/{id}
pub async fn delete_record(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, Uuid)>,
    headers: HeaderMap,
) -> HandlerResult<serde_json::Value> {
    let tenant = tenant_from_headers(&headers)?;
    state
        .engine
        .remove(&entity, &RecordId::new(id), &tenant)
        .await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// =============================================================================
// Bulk operations
// =============================================================================

/// POST /v1/data/{entity}/bulk
pub async fn bulk_create(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    headers: HeaderMap,
    Json(request): Json<BulkCreateRequest>,
) -> HandlerResult<Vec<BulkItemResult>> {
    let tenant = tenant_from_headers(&headers)?;
    let results = state
        .engine
        .bulk_create(&entity, request.items, &tenant)
        .await?;
    Ok(Json(results))
}

/// PATCH /v1/data/{entity}/bulk
pub async fn bulk_update(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    headers: HeaderMap,
    Json(request): Json<BulkUpdateRequest>,
) -> HandlerResult<Vec<BulkItemResult>> {
    let tenant = tenant_from_headers(&headers)?;
    let items = request
        .items
        .into_iter()
        .map(|item| (RecordId::new(item.id), item.fields))
        .collect();
    let results = state.engine.bulk_update(&entity, items, &tenant).await?;
    Ok(Json(results))
}

/// DELETE /v1/data/{entity}/bulk
pub async fn bulk_delete(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    headers: HeaderMap,
    Json(request): Json<BulkDeleteRequest>,
) -> HandlerResult<Vec<BulkItemResult>> {
    let tenant = tenant_from_headers(&headers)?;
    let ids = request.ids.into_iter().map(RecordId::new).collect();
    let results = state.engine.bulk_delete(&entity, ids, &tenant).await?;
    Ok(Json(results))
}

// =============================================================================
// Scheduling
// =============================================================================

/// GET /v1/doctors/{doctor_id}/slots?date=YYYY-MM-DD
pub async fn get_available_slots(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> HandlerResult<Vec<Slot>> {
    let slots = state
        .scheduler
        .available_slots(&DoctorId::new(doctor_id), query.date)
        .await?;
    Ok(Json(slots))
}

/// PUT /v1/doctors/{doctor_id}/schedule
pub async fn put_schedule(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<PutScheduleRequest>,
) -> HandlerResult<ScheduleDto> {
    let schedule = request
        .into_domain(DoctorId::new(doctor_id))
        .map_err(AppError::BadRequest)?;
    state
        .store
        .put_schedule(schedule.clone())
        .await
        .map_err(crate::error::CoreError::from)?;
    Ok(Json(schedule.into()))
}

/// POST /v1/appointments
pub async fn book_appointment(
    State(state): State<AppState>,
    Json(request): Json<BookAppointmentRequest>,
) -> HandlerResult<Appointment> {
    let appointment = state
        .scheduler
        .book(
            &DoctorId::new(request.doctor_id),
            &PatientId::new(request.patient_id),
            request.start,
            request.end,
            request.channel,
            request.reason,
        )
        .await?;
    Ok(Json(appointment))
}

/// GET /v1/appointments/{id}
pub async fn get_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> HandlerResult<Appointment> {
    let appointment = state.scheduler.appointment(&AppointmentId::new(id)).await?;
    Ok(Json(appointment))
}

/// POST /v1/appointments/{id}/confirm
pub async fn confirm_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> HandlerResult<Appointment> {
    Ok(Json(state.scheduler.confirm(&AppointmentId::new(id)).await?))
}

/// POST /v1/appointments/{id}/cancel
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> HandlerResult<Appointment> {
    Ok(Json(state.scheduler.cancel(&AppointmentId::new(id)).await?))
}

/// POST /v1/appointments/{id}/complete
pub async fn complete_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> HandlerResult<Appointment> {
    Ok(Json(state.scheduler.complete(&AppointmentId::new(id)).await?))
}

/// POST /v1/appointments/{id}/no-show
pub async fn mark_no_show(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> HandlerResult<Appointment> {
    Ok(Json(
        state.scheduler.mark_no_show(&AppointmentId::new(id)).await?,
    ))
}

/// POST /v1/appointments/{id}/reschedule
pub async fn reschedule_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RescheduleRequest>,
) -> HandlerResult<Appointment> {
    let appointment = state
        .scheduler
        .reschedule(&AppointmentId::new(id), request.start, request.end)
        .await?;
    Ok(Json(appointment))
}
