//! Outbound notifications for scheduling state changes.
//!
//! The scheduler fires one event after every successful booking,
//! cancellation, and reschedule. Dispatch is fire-and-forget: the
//! appointment change has already committed by the time the dispatcher
//! runs, and a failed dispatch is logged, never propagated.

use async_trait::async_trait;
use log::info;

use crate::models::{Appointment, TimeInterval};

/// Event emitted after a successful scheduling state change.
#[derive(Debug, Clone)]
pub enum SchedulingEvent {
    Booked {
        appointment: Appointment,
    },
    Cancelled {
        appointment: Appointment,
    },
    Rescheduled {
        appointment: Appointment,
        previous: TimeInterval,
    },
}

impl SchedulingEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulingEvent::Booked { .. } => "booked",
            SchedulingEvent::Cancelled { .. } => "cancelled",
            SchedulingEvent::Rescheduled { .. } => "rescheduled",
        }
    }

    pub fn appointment(&self) -> &Appointment {
        match self {
            SchedulingEvent::Booked { appointment }
            | SchedulingEvent::Cancelled { appointment }
            | SchedulingEvent::Rescheduled { appointment, .. } => appointment,
        }
    }
}

/// Notification sink invoked by the scheduler.
///
/// Implementations own their delivery channel (SMS, chat, e-mail, …).
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event: &SchedulingEvent) -> anyhow::Result<()>;
}

/// Default dispatcher: writes one interaction log line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, event: &SchedulingEvent) -> anyhow::Result<()> {
        let appointment = event.appointment();
        info!(
            "appointment {} {}: doctor={} patient={} interval={} channel={}",
            appointment.id,
            event.kind(),
            appointment.doctor_id,
            appointment.patient_id,
            appointment.interval,
            appointment.channel,
        );
        Ok(())
    }
}
