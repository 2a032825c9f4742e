//! Appointment scheduling engine.
//!
//! Availability computation, conflict-checked booking, status transitions
//! and reschedules over an [`AppointmentStore`]. The service is stateless
//! between calls: slot lists are never cached, and every booking decision
//! is delegated to the store's atomic `book_if_free`/`move_if_free`
//! operations, so two racing bookings can never both commit.

mod slots;

pub use slots::expand_schedule;

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use log::{debug, warn};

use crate::db::store::{AppointmentStore, BookingOutcome};
use crate::error::{CoreError, CoreResult, FieldError};
use crate::models::{
    Appointment, AppointmentId, AppointmentStatus, BookingChannel, DoctorId, PatientId, Slot,
    TimeInterval,
};
use crate::notify::{NotificationDispatcher, SchedulingEvent};

/// Appointment scheduling service.
pub struct SchedulingService {
    store: Arc<dyn AppointmentStore>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl SchedulingService {
    pub fn new(store: Arc<dyn AppointmentStore>, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        Self { store, notifier }
    }

    /// Free slots for `doctor` on `date`, ordered by start time.
    ///
    /// An empty list is a valid answer: the doctor simply has no schedule
    /// that day, or every slot is taken.
    pub async fn available_slots(&self, doctor: &DoctorId, date: NaiveDate) -> CoreResult<Vec<Slot>> {
        let rows = self.store.weekly_schedule(doctor, date.weekday()).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<Slot> = rows
            .iter()
            .flat_map(|row| expand_schedule(row, date))
            .collect();
        candidates.sort_by_key(|slot| slot.start);

        let day = day_window(date);
        let booked = self
            .store
            .appointments_overlapping(doctor, day, &AppointmentStatus::ACTIVE)
            .await?;

        candidates.retain(|slot| {
            !booked
                .iter()
                .any(|appointment| appointment.interval.overlaps(&slot.interval()))
        });
        Ok(candidates)
    }

    /// Book a new appointment in `[start, end)`.
    ///
    /// The overlap check runs against live state inside the store, never
    /// against a previously returned slot list.
    pub async fn book(
        &self,
        doctor: &DoctorId,
        patient: &PatientId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        channel: BookingChannel,
        reason: Option<String>,
    ) -> CoreResult<Appointment> {
        let interval = parse_interval(start, end)?;
        self.ensure_within_working_hours(doctor, interval).await?;

        let appointment = Appointment::book(*patient, *doctor, interval, channel, reason);
        match self.store.book_if_free(appointment).await? {
            BookingOutcome::Booked(stored) => {
                debug!("booked appointment {} for doctor {}", stored.id, doctor);
                self.notify(SchedulingEvent::Booked {
                    appointment: stored.clone(),
                })
                .await;
                Ok(stored)
            }
            BookingOutcome::Conflict => Err(CoreError::SlotConflict),
        }
    }

    pub async fn appointment(&self, id: &AppointmentId) -> CoreResult<Appointment> {
        self.store
            .fetch_appointment(id)
            .await?
            .ok_or_else(|| CoreError::not_found("appointment", id))
    }

    pub async fn confirm(&self, id: &AppointmentId) -> CoreResult<Appointment> {
        let (appointment, _) = self.transition(id, AppointmentStatus::Confirmed).await?;
        Ok(appointment)
    }

    /// Cancel an appointment. Cancelling an already-cancelled appointment
    /// is an idempotent no-op; cancelling out of any other terminal state
    /// fails.
    pub async fn cancel(&self, id: &AppointmentId) -> CoreResult<Appointment> {
        let (appointment, changed) = self.transition(id, AppointmentStatus::Cancelled).await?;
        if changed {
            self.notify(SchedulingEvent::Cancelled {
                appointment: appointment.clone(),
            })
            .await;
        }
        Ok(appointment)
    }

    pub async fn complete(&self, id: &AppointmentId) -> CoreResult<Appointment> {
        let (appointment, _) = self.transition(id, AppointmentStatus::Completed).await?;
        Ok(appointment)
    }

    pub async fn mark_no_show(&self, id: &AppointmentId) -> CoreResult<Appointment> {
        let (appointment, _) = self.transition(id, AppointmentStatus::NoShow).await?;
        Ok(appointment)
    }

    /// Move an appointment to a new interval, preserving its id.
    ///
    /// The conflict check (excluding the appointment itself) and the
    /// update run atomically in the store; on conflict the original
    /// appointment is left untouched.
    pub async fn reschedule(
        &self,
        id: &AppointmentId,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> CoreResult<Appointment> {
        let interval = parse_interval(new_start, new_end)?;

        let current = self.appointment(id).await?;
        if current.status.is_terminal() {
            return Err(CoreError::InvalidTransition {
                from: current.status,
                to: current.status,
            });
        }
        let previous = current.interval;

        match self.store.move_if_free(id, interval).await? {
            BookingOutcome::Booked(updated) => {
                debug!("rescheduled appointment {} to {}", updated.id, interval);
                self.notify(SchedulingEvent::Rescheduled {
                    appointment: updated.clone(),
                    previous,
                })
                .await;
                Ok(updated)
            }
            BookingOutcome::Conflict => Err(CoreError::SlotConflict),
        }
    }

    /// Apply the transition table. Returns the appointment and whether a
    /// state change actually happened (false for idempotent re-entry into
    /// the same terminal state).
    async fn transition(
        &self,
        id: &AppointmentId,
        target: AppointmentStatus,
    ) -> CoreResult<(Appointment, bool)> {
        let current = self.appointment(id).await?;

        if current.status == target && target.is_terminal() {
            return Ok((current, false));
        }
        if !current.status.can_transition_to(target) {
            return Err(CoreError::InvalidTransition {
                from: current.status,
                to: target,
            });
        }

        let updated = self.store.update_status(id, target).await?;
        Ok((updated, true))
    }

    async fn ensure_within_working_hours(
        &self,
        doctor: &DoctorId,
        interval: TimeInterval,
    ) -> CoreResult<()> {
        let date = interval.start.date_naive();
        let rows = self.store.weekly_schedule(doctor, date.weekday()).await?;

        let fits = rows.iter().any(|row| {
            let window_start = date.and_time(row.start).and_utc();
            let window_end = date.and_time(row.end).and_utc();
            window_start <= interval.start && interval.end <= window_end
        });

        if fits {
            Ok(())
        } else {
            Err(CoreError::OutsideWorkingHours)
        }
    }

    /// Fire-and-forget: a failed dispatch never rolls back the already
    /// committed appointment change.
    async fn notify(&self, event: SchedulingEvent) {
        if let Err(err) = self.notifier.dispatch(&event).await {
            warn!(
                "notification dispatch failed for appointment {} ({}): {}",
                event.appointment().id,
                event.kind(),
                err
            );
        }
    }
}

fn parse_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<TimeInterval> {
    TimeInterval::new(start, end)
        .map_err(|message| CoreError::validation(vec![FieldError::new("end", message)]))
}

/// The whole calendar day of `date` as one interval.
fn day_window(date: NaiveDate) -> TimeInterval {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    TimeInterval {
        start,
        end: start + chrono::Duration::days(1),
    }
}
