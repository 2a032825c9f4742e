//! Appointment domain model and the status state machine.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::interval::TimeInterval;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn value(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a doctor.
    DoctorId
);
uuid_id!(
    /// Identifier of a patient.
    PatientId
);
uuid_id!(
    /// Identifier of an appointment.
    AppointmentId
);

/// Channel an appointment was booked through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingChannel {
    Web,
    Whatsapp,
    Phone,
    WalkIn,
}

impl fmt::Display for BookingChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingChannel::Web => "web",
            BookingChannel::Whatsapp => "whatsapp",
            BookingChannel::Phone => "phone",
            BookingChannel::WalkIn => "walk_in",
        };
        f.write_str(name)
    }
}

impl FromStr for BookingChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(Self::Web),
            "whatsapp" => Ok(Self::Whatsapp),
            "phone" => Ok(Self::Phone),
            "walk_in" => Ok(Self::WalkIn),
            other => Err(format!("unknown booking channel: {}", other)),
        }
    }
}

/// Appointment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl AppointmentStatus {
    /// Statuses that hold a doctor's time and block other bookings.
    pub const ACTIVE: [AppointmentStatus; 2] =
        [AppointmentStatus::Booked, AppointmentStatus::Confirmed];

    /// Whether no further transition is permitted from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Cancelled | AppointmentStatus::Completed | AppointmentStatus::NoShow
        )
    }

    /// The transition table: booked → {confirmed, cancelled},
    /// confirmed → {completed, cancelled, no-show}.
    pub fn can_transition_to(&self, target: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, target),
            (Booked, Confirmed)
                | (Booked, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::NoShow => "no_show",
        };
        f.write_str(name)
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(Self::Booked),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            "no_show" => Ok(Self::NoShow),
            other => Err(format!("unknown appointment status: {}", other)),
        }
    }
}

/// One row of a doctor's weekly recurring schedule.
///
/// A doctor has one row per working window; start/end are wall-clock UTC
/// times and `slot_minutes` is the booking granularity within the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorSchedule {
    pub doctor_id: DoctorId,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub slot_minutes: u32,
}

/// A computed candidate appointment interval. Never persisted; lives only
/// within a single availability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Slot {
    pub fn interval(&self) -> TimeInterval {
        TimeInterval {
            start: self.start,
            end: self.end,
        }
    }
}

/// A booked appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub interval: TimeInterval,
    pub status: AppointmentStatus,
    pub channel: BookingChannel,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Build a fresh appointment in `Booked` state.
    pub fn book(
        patient_id: PatientId,
        doctor_id: DoctorId,
        interval: TimeInterval,
        channel: BookingChannel,
        reason: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AppointmentId::generate(),
            patient_id,
            doctor_id,
            interval,
            status: AppointmentStatus::Booked,
            channel,
            reason,
            created_at: now,
            updated_at: now,
        }
    }
}
