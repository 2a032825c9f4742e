//! Row types and conversions between table rows and domain models.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use super::schema::{appointments, doctor_schedules, entity_records};
use crate::api::{RecordId, TenantId};
use crate::db::error::{StoreError, StoreResult};
use crate::models::{
    Appointment, AppointmentId, AppointmentStatus, BookingChannel, DoctorId, DoctorSchedule,
    EntityRecord, PatientId, TimeInterval,
};

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = entity_records)]
pub struct EntityRecordRow {
    pub id: Uuid,
    pub entity: String,
    pub tenant: String,
    pub fields: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntityRecordRow {
    pub fn from_domain(entity: &str, record: &EntityRecord) -> Self {
        Self {
            id: record.id.value(),
            entity: entity.to_string(),
            tenant: record.tenant.as_str().to_string(),
            fields: Value::Object(record.fields.clone()),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn into_domain(self) -> StoreResult<EntityRecord> {
        let Value::Object(fields) = self.fields else {
            return Err(StoreError::internal(format!(
                "entity record {} carries a non-object fields payload",
                self.id
            )));
        };
        Ok(EntityRecord {
            id: RecordId::new(self.id),
            tenant: TenantId::new(self.tenant),
            created_at: self.created_at,
            updated_at: self.updated_at,
            fields,
        })
    }
}

#[derive(Debug, Queryable)]
pub struct ScheduleRow {
    pub id: i64,
    pub doctor_id: Uuid,
    pub weekday: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: i32,
}

impl ScheduleRow {
    pub fn into_domain(self) -> StoreResult<DoctorSchedule> {
        Ok(DoctorSchedule {
            doctor_id: DoctorId::new(self.doctor_id),
            weekday: weekday_from_i16(self.weekday)?,
            start: self.start_time,
            end: self.end_time,
            slot_minutes: self.slot_minutes.max(0) as u32,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = doctor_schedules)]
pub struct NewScheduleRow {
    pub doctor_id: Uuid,
    pub weekday: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: i32,
}

impl NewScheduleRow {
    pub fn from_domain(schedule: &DoctorSchedule) -> Self {
        Self {
            doctor_id: schedule.doctor_id.value(),
            weekday: weekday_to_i16(schedule.weekday),
            start_time: schedule.start,
            end_time: schedule.end,
            slot_minutes: schedule.slot_minutes as i32,
        }
    }
}

/// ISO weekday number, Monday = 1.
pub fn weekday_to_i16(weekday: Weekday) -> i16 {
    weekday.number_from_monday() as i16
}

pub fn weekday_from_i16(value: i16) -> StoreResult<Weekday> {
    match value {
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        7 => Ok(Weekday::Sun),
        other => Err(StoreError::internal(format!(
            "weekday column out of range: {}",
            other
        ))),
    }
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = appointments)]
pub struct AppointmentRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: String,
    pub channel: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentRow {
    pub fn from_domain(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id.value(),
            patient_id: appointment.patient_id.value(),
            doctor_id: appointment.doctor_id.value(),
            start_at: appointment.interval.start,
            end_at: appointment.interval.end,
            status: appointment.status.to_string(),
            channel: appointment.channel.to_string(),
            reason: appointment.reason.clone(),
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        }
    }

    pub fn into_domain(self) -> StoreResult<Appointment> {
        let status: AppointmentStatus = self
            .status
            .parse()
            .map_err(StoreError::internal)?;
        let channel: BookingChannel = self
            .channel
            .parse()
            .map_err(StoreError::internal)?;
        let interval =
            TimeInterval::new(self.start_at, self.end_at).map_err(StoreError::internal)?;

        Ok(Appointment {
            id: AppointmentId::new(self.id),
            patient_id: PatientId::new(self.patient_id),
            doctor_id: DoctorId::new(self.doctor_id),
            interval,
            status,
            channel,
            reason: self.reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
