//! Request/response shapes for the REST API.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{BookingChannel, DoctorSchedule, FieldMap};
use crate::registry::{EntityDescriptor, FilterOp, QuerySpec, SortDirection};

/// Parse the raw list query string into a [`QuerySpec`].
///
/// Reserved keys map onto paging/sort/search; every other key is a field
/// filter. Range filters use a `gte:`/`lte:` value prefix, e.g.
/// `?price=gte:10`.
pub fn query_spec_from_params(params: HashMap<String, String>) -> Result<QuerySpec, String> {
    let mut spec = QuerySpec::default();

    for (key, value) in params {
        match key.as_str() {
            "page" => {
                spec.page = Some(value.parse().map_err(|_| format!("invalid page: {}", value))?);
            }
            "page_size" => {
                spec.page_size = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid page_size: {}", value))?,
                );
            }
            "sort" => spec.sort = Some(value),
            "order" => {
                spec.direction = Some(match value.as_str() {
                    "asc" => SortDirection::Asc,
                    "desc" => SortDirection::Desc,
                    other => return Err(format!("invalid order: {}", other)),
                });
            }
            "q" => spec.search = Some(value),
            _ => {
                let (op, raw) = match value.split_once(':') {
                    Some(("gte", rest)) => (FilterOp::Gte, rest),
                    Some(("lte", rest)) => (FilterOp::Lte, rest),
                    _ => (FilterOp::Eq, value.as_str()),
                };
                spec.filters.push(crate::registry::FieldFilter::new(
                    key,
                    op,
                    scalar_value(raw),
                ));
            }
        }
    }

    Ok(spec)
}

/// Interpret a query-string value as the narrowest JSON scalar.
fn scalar_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(n) = raw.parse::<f64>() {
        return Value::from(n);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Response for the entity catalog endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EntityListResponse {
    pub entities: Vec<EntityDescriptor>,
    pub total: usize,
}

/// Request body for bulk create.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkCreateRequest {
    pub items: Vec<FieldMap>,
}

/// Request body for bulk update.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkUpdateRequest {
    pub items: Vec<BulkUpdateItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkUpdateItem {
    pub id: Uuid,
    pub fields: FieldMap,
}

/// Request body for bulk delete.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

/// Query parameters for the availability endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotsQuery {
    /// Date to compute slots for (YYYY-MM-DD)
    pub date: NaiveDate,
}

/// Request body for booking an appointment.
#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default = "default_channel")]
    pub channel: BookingChannel,
    #[serde(default)]
    pub reason: Option<String>,
}

fn default_channel() -> BookingChannel {
    BookingChannel::Web
}

/// Request body for rescheduling an appointment.
#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Request body for replacing one weekly schedule row.
#[derive(Debug, Clone, Deserialize)]
pub struct PutScheduleRequest {
    /// Weekday name ("mon", "monday", …)
    pub weekday: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub slot_minutes: u32,
}

impl PutScheduleRequest {
    pub fn into_domain(self, doctor_id: crate::models::DoctorId) -> Result<DoctorSchedule, String> {
        let weekday = Weekday::from_str(&self.weekday)
            .map_err(|_| format!("invalid weekday: {}", self.weekday))?;
        if self.start >= self.end {
            return Err("schedule start must precede end".to_string());
        }
        if self.slot_minutes == 0 {
            return Err("slot_minutes must be positive".to_string());
        }
        Ok(DoctorSchedule {
            doctor_id,
            weekday,
            start: self.start,
            end: self.end,
            slot_minutes: self.slot_minutes,
        })
    }
}

/// Serializable view of one schedule row.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleDto {
    pub doctor_id: Uuid,
    pub weekday: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub slot_minutes: u32,
}

impl From<DoctorSchedule> for ScheduleDto {
    fn from(schedule: DoctorSchedule) -> Self {
        Self {
            doctor_id: schedule.doctor_id.value(),
            weekday: schedule.weekday.to_string(),
            start: schedule.start,
            end: schedule.end,
            slot_minutes: schedule.slot_minutes,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}
