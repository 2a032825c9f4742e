//! Candidate slot generation from recurring weekly schedules.

use chrono::{Duration, NaiveDate};

use crate::models::{DoctorSchedule, Slot};

/// Expand one schedule row into candidate slots for `date`.
///
/// Walks start → end in `slot_minutes` increments. A candidate that would
/// cross the end of the working window is discarded rather than clipped.
pub fn expand_schedule(schedule: &DoctorSchedule, date: NaiveDate) -> Vec<Slot> {
    let mut slots = Vec::new();
    if schedule.slot_minutes == 0 {
        return slots;
    }

    let step = Duration::minutes(schedule.slot_minutes as i64);
    let mut cursor = date.and_time(schedule.start).and_utc();
    let window_end = date.and_time(schedule.end).and_utc();

    loop {
        let slot_end = cursor + step;
        if slot_end > window_end {
            break;
        }
        slots.push(Slot {
            start: cursor,
            end: slot_end,
        });
        cursor = slot_end;
    }

    slots
}
