//! End-to-end scheduling flows over the in-memory store, including the
//! concurrent double-booking race.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

use orchestrall_rust::db::repositories::LocalStore;
use orchestrall_rust::db::store::AppointmentStore;
use orchestrall_rust::error::CoreError;
use orchestrall_rust::models::{
    AppointmentStatus, BookingChannel, DoctorId, DoctorSchedule, PatientId,
};
use orchestrall_rust::notify::LogDispatcher;
use orchestrall_rust::scheduler::SchedulingService;

struct Clinic {
    service: Arc<SchedulingService>,
    doctor: DoctorId,
    patient: PatientId,
}

/// 2026-03-02 is a Monday.
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

fn monday_at(hour: u32, minute: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
}

async fn clinic() -> Clinic {
    let store = Arc::new(LocalStore::new());
    let doctor = DoctorId::generate();

    // Mon 09:00-12:00 and Mon 14:00-16:00, 30-minute slots.
    for (start, end) in [((9, 0), (12, 0)), ((14, 0), (16, 0))] {
        store
            .put_schedule(DoctorSchedule {
                doctor_id: doctor,
                weekday: Weekday::Mon,
                start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
                end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
                slot_minutes: 30,
            })
            .await
            .unwrap();
    }

    Clinic {
        service: Arc::new(SchedulingService::new(store, Arc::new(LogDispatcher))),
        doctor,
        patient: PatientId::generate(),
    }
}

#[tokio::test]
async fn test_multiple_windows_yield_combined_ordered_slots() {
    let clinic = clinic().await;
    let slots = clinic
        .service
        .available_slots(&clinic.doctor, monday())
        .await
        .unwrap();

    // 6 morning slots + 4 afternoon slots
    assert_eq!(slots.len(), 10);
    for pair in slots.windows(2) {
        assert!(pair[0].start < pair[1].start, "slots must be ordered");
    }
}

#[tokio::test]
async fn test_availability_never_overlaps_live_bookings() {
    let clinic = clinic().await;

    clinic
        .service
        .book(
            &clinic.doctor,
            &clinic.patient,
            monday_at(9, 0),
            monday_at(9, 30),
            BookingChannel::Web,
            None,
        )
        .await
        .unwrap();
    let confirmed = clinic
        .service
        .book(
            &clinic.doctor,
            &clinic.patient,
            monday_at(14, 0),
            monday_at(14, 30),
            BookingChannel::Phone,
            None,
        )
        .await
        .unwrap();
    clinic.service.confirm(&confirmed.id).await.unwrap();

    let slots = clinic
        .service
        .available_slots(&clinic.doctor, monday())
        .await
        .unwrap();
    assert_eq!(slots.len(), 8);

    for appointment in [monday_at(9, 0), monday_at(14, 0)] {
        assert!(slots.iter().all(|slot| slot.start != appointment));
    }
}

#[tokio::test]
async fn test_full_lifecycle_web_booking() {
    let clinic = clinic().await;

    let appointment = clinic
        .service
        .book(
            &clinic.doctor,
            &clinic.patient,
            monday_at(10, 0),
            monday_at(10, 30),
            BookingChannel::Whatsapp,
            Some("persistent cough".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Booked);
    assert_eq!(appointment.reason.as_deref(), Some("persistent cough"));

    let confirmed = clinic.service.confirm(&appointment.id).await.unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let done = clinic.service.complete(&appointment.id).await.unwrap();
    assert_eq!(done.status, AppointmentStatus::Completed);

    // completed is terminal: second complete is idempotent, cancel fails
    clinic.service.complete(&appointment.id).await.unwrap();
    assert!(matches!(
        clinic.service.cancel(&appointment.id).await,
        Err(CoreError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_no_show_requires_confirmation_first() {
    let clinic = clinic().await;
    let appointment = clinic
        .service
        .book(
            &clinic.doctor,
            &clinic.patient,
            monday_at(10, 0),
            monday_at(10, 30),
            BookingChannel::WalkIn,
            None,
        )
        .await
        .unwrap();

    assert!(matches!(
        clinic.service.mark_no_show(&appointment.id).await,
        Err(CoreError::InvalidTransition { .. })
    ));

    clinic.service.confirm(&appointment.id).await.unwrap();
    let missed = clinic.service.mark_no_show(&appointment.id).await.unwrap();
    assert_eq!(missed.status, AppointmentStatus::NoShow);
}

#[tokio::test]
async fn test_reschedule_between_windows() {
    let clinic = clinic().await;
    let appointment = clinic
        .service
        .book(
            &clinic.doctor,
            &clinic.patient,
            monday_at(9, 0),
            monday_at(9, 30),
            BookingChannel::Web,
            None,
        )
        .await
        .unwrap();

    let moved = clinic
        .service
        .reschedule(&appointment.id, monday_at(14, 0), monday_at(14, 30))
        .await
        .unwrap();
    assert_eq!(moved.id, appointment.id);

    // the old slot is free again, the new one is taken
    let slots = clinic
        .service
        .available_slots(&clinic.doctor, monday())
        .await
        .unwrap();
    assert!(slots.iter().any(|slot| slot.start == monday_at(9, 0)));
    assert!(slots.iter().all(|slot| slot.start != monday_at(14, 0)));
}

#[tokio::test]
async fn test_many_concurrent_bookings_for_one_slot() {
    let clinic = clinic().await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = clinic.service.clone();
        let doctor = clinic.doctor;
        handles.push(tokio::spawn(async move {
            let patient = PatientId::generate();
            service
                .book(
                    &doctor,
                    &patient,
                    monday_at(11, 0),
                    monday_at(11, 30),
                    BookingChannel::Web,
                    None,
                )
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(CoreError::SlotConflict) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(successes, 1, "exactly one concurrent booking may win");
}

#[tokio::test]
async fn test_two_doctors_do_not_conflict() {
    let store = Arc::new(LocalStore::new());
    let service = SchedulingService::new(store.clone(), Arc::new(LogDispatcher));

    let (doctor_a, doctor_b) = (DoctorId::generate(), DoctorId::generate());
    for doctor in [doctor_a, doctor_b] {
        store
            .put_schedule(DoctorSchedule {
                doctor_id: doctor,
                weekday: Weekday::Mon,
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                slot_minutes: 30,
            })
            .await
            .unwrap();
    }

    let patient = PatientId::generate();
    service
        .book(&doctor_a, &patient, monday_at(9, 0), monday_at(9, 30), BookingChannel::Web, None)
        .await
        .unwrap();
    // same interval, different doctor: no conflict
    service
        .book(&doctor_b, &patient, monday_at(9, 0), monday_at(9, 30), BookingChannel::Web, None)
        .await
        .unwrap();
}
