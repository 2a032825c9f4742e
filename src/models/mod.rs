//! Domain models shared by the CRUD engine and the scheduler.

pub mod appointment;
pub mod interval;
pub mod record;

pub use appointment::{
    Appointment, AppointmentId, AppointmentStatus, BookingChannel, DoctorId, DoctorSchedule,
    PatientId, Slot,
};
pub use interval::TimeInterval;
pub use record::{EntityRecord, FieldMap};
