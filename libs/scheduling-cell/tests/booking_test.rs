// libs/scheduling-cell/tests/booking_test.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use assert_matches::assert_matches;

use directory_cell::{
    InMemoryPatientDirectory, InMemoryProfessionalDirectory, PatientRecord,
    ProfessionalRecord, ProfessionalRole,
};
use scheduling_cell::models::{
    AvailabilityRule, BookEventRequest, BookableEvent, CommitOutcome, EventKind,
    EventStatus, RejectionReason, RescheduleEventRequest, SchedulingError,
};
use scheduling_cell::repository::memory::{
    InMemoryAvailabilityRuleStore, InMemoryEventRepository,
};
use scheduling_cell::repository::EventRepository;
use scheduling_cell::services::booking::BookingTransaction;
use scheduling_cell::services::conflict::ConflictDetector;
use scheduling_cell::services::notify::NotificationClient;
use scheduling_cell::services::slot_finder::SlotFinder;

// ==============================================================================
// TEST FIXTURES AND UTILITIES
// ==============================================================================

// 2027-03-01 is a Monday.
const MONDAY: &str = "2027-03-01";
const TUESDAY: &str = "2027-03-02";

fn at(date: &str, time: &str) -> DateTime<Utc> {
    let date: NaiveDate = date.parse().unwrap();
    let time: NaiveTime = time.parse().unwrap();
    date.and_time(time).and_utc()
}

fn weekday_rule(professional_id: Uuid, day_of_week: i32, start: &str, end: &str) -> AvailabilityRule {
    AvailabilityRule {
        id: Uuid::new_v4(),
        professional_id,
        day_of_week,
        start_time: start.parse().unwrap(),
        end_time: end.parse().unwrap(),
        valid_from: None,
        valid_until: None,
        blackout_dates: vec![],
    }
}

struct TestClinic {
    booking: BookingTransaction,
    events: Arc<InMemoryEventRepository>,
    availability: Arc<InMemoryAvailabilityRuleStore>,
    professionals: Arc<InMemoryProfessionalDirectory>,
    patient_id: Uuid,
    physician_id: Uuid,
    surgeon_id: Uuid,
}

impl TestClinic {
    /// A physician and a surgeon, both working Mondays 09:00-12:00, plus one
    /// registered patient.
    async fn new() -> Self {
        let events = Arc::new(InMemoryEventRepository::new());
        let availability = Arc::new(InMemoryAvailabilityRuleStore::new());
        let patients = Arc::new(InMemoryPatientDirectory::new());
        let professionals = Arc::new(InMemoryProfessionalDirectory::new());

        let physician_id = Uuid::new_v4();
        let surgeon_id = Uuid::new_v4();
        let patient_id = Uuid::new_v4();

        professionals
            .add(ProfessionalRecord {
                id: physician_id,
                first_name: "Jane".to_string(),
                last_name: "Smith".to_string(),
                role: ProfessionalRole::Physician,
                active: true,
            })
            .await;
        professionals
            .add(ProfessionalRecord {
                id: surgeon_id,
                first_name: "Sarah".to_string(),
                last_name: "Chen".to_string(),
                role: ProfessionalRole::Surgeon,
                active: true,
            })
            .await;
        patients
            .add(PatientRecord {
                id: patient_id,
                first_name: "John".to_string(),
                last_name: "Doe".to_string(),
            })
            .await;

        availability
            .add_rule(weekday_rule(physician_id, 1, "09:00:00", "12:00:00"))
            .await;
        availability
            .add_rule(weekday_rule(surgeon_id, 1, "09:00:00", "12:00:00"))
            .await;

        let conflicts = Arc::new(ConflictDetector::new(events.clone()));
        let booking = BookingTransaction::new(
            events.clone(),
            availability.clone(),
            conflicts,
            patients.clone(),
            professionals.clone(),
            Arc::new(NotificationClient::disabled()),
        );

        Self {
            booking,
            events,
            availability,
            professionals,
            patient_id,
            physician_id,
            surgeon_id,
        }
    }

    fn appointment(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> BookEventRequest {
        BookEventRequest {
            professional_id: self.physician_id,
            patient_id: self.patient_id,
            start,
            end,
            kind: EventKind::Appointment,
        }
    }

    fn surgery(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> BookEventRequest {
        BookEventRequest {
            professional_id: self.surgeon_id,
            patient_id: self.patient_id,
            start,
            end,
            kind: EventKind::Surgery,
        }
    }
}

fn committed(outcome: CommitOutcome) -> BookableEvent {
    match outcome {
        CommitOutcome::Committed(event) => event,
        CommitOutcome::Rejected(reason) => panic!("expected a commit, got rejection: {}", reason),
    }
}

fn rejection(outcome: CommitOutcome) -> RejectionReason {
    match outcome {
        CommitOutcome::Rejected(reason) => reason,
        CommitOutcome::Committed(event) => panic!("expected a rejection, got event {}", event.id),
    }
}

// ==============================================================================
// COMMIT OUTCOMES
// ==============================================================================

#[tokio::test]
async fn test_commit_inside_working_hours_succeeds() {
    let clinic = TestClinic::new().await;

    let outcome = clinic
        .booking
        .commit(clinic.appointment(at(MONDAY, "10:15:00"), at(MONDAY, "10:45:00")))
        .await
        .unwrap();

    let event = committed(outcome);
    assert_eq!(event.status, EventStatus::Scheduled);
    assert_eq!(event.kind, EventKind::Appointment);
    assert_eq!(event.duration_minutes(), 30);

    let stored = clinic.events.find_event(event.id).await.unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn test_commit_over_an_existing_event_is_rejected() {
    let clinic = TestClinic::new().await;

    committed(
        clinic
            .booking
            .commit(clinic.appointment(at(MONDAY, "10:00:00"), at(MONDAY, "10:30:00")))
            .await
            .unwrap(),
    );

    let outcome = clinic
        .booking
        .commit(clinic.appointment(at(MONDAY, "10:15:00"), at(MONDAY, "10:45:00")))
        .await
        .unwrap();

    assert_eq!(rejection(outcome), RejectionReason::Conflict);
}

#[tokio::test]
async fn test_back_to_back_commits_both_succeed() {
    let clinic = TestClinic::new().await;

    committed(
        clinic
            .booking
            .commit(clinic.appointment(at(MONDAY, "10:00:00"), at(MONDAY, "10:30:00")))
            .await
            .unwrap(),
    );

    // Starts exactly where the first one ends.
    let outcome = clinic
        .booking
        .commit(clinic.appointment(at(MONDAY, "10:30:00"), at(MONDAY, "11:00:00")))
        .await
        .unwrap();

    committed(outcome);
}

#[tokio::test]
async fn test_commit_outside_working_hours_is_rejected() {
    let clinic = TestClinic::new().await;

    // Tuesday has no windows at all.
    let outcome = clinic
        .booking
        .commit(clinic.appointment(at(TUESDAY, "10:00:00"), at(TUESDAY, "10:30:00")))
        .await
        .unwrap();

    assert_eq!(rejection(outcome), RejectionReason::OutsideAvailability);
}

#[tokio::test]
async fn test_commit_spilling_past_the_window_close_is_rejected() {
    let clinic = TestClinic::new().await;

    let outcome = clinic
        .booking
        .commit(clinic.appointment(at(MONDAY, "11:45:00"), at(MONDAY, "12:15:00")))
        .await
        .unwrap();

    assert_eq!(rejection(outcome), RejectionReason::OutsideAvailability);
}

#[tokio::test]
async fn test_commit_filling_the_whole_window_succeeds() {
    let clinic = TestClinic::new().await;

    let outcome = clinic
        .booking
        .commit(clinic.appointment(at(MONDAY, "09:00:00"), at(MONDAY, "12:00:00")))
        .await
        .unwrap();

    committed(outcome);
}

#[tokio::test]
async fn test_surgeries_and_appointments_share_one_conflict_stream() {
    let clinic = TestClinic::new().await;

    committed(
        clinic
            .booking
            .commit(clinic.surgery(at(MONDAY, "10:00:00"), at(MONDAY, "11:00:00")))
            .await
            .unwrap(),
    );

    // An appointment with the surgeon inside the surgery interval must lose.
    let mut request = clinic.appointment(at(MONDAY, "10:15:00"), at(MONDAY, "10:45:00"));
    request.professional_id = clinic.surgeon_id;

    let outcome = clinic.booking.commit(request).await.unwrap();
    assert_eq!(rejection(outcome), RejectionReason::Conflict);
}

#[tokio::test]
async fn test_a_slot_found_from_now_commits_immediately() {
    let clinic = TestClinic::new().await;

    // A physician reachable around the clock, so the live instant always
    // falls inside a window.
    let on_call_id = Uuid::new_v4();
    clinic
        .professionals
        .add(ProfessionalRecord {
            id: on_call_id,
            first_name: "Leah".to_string(),
            last_name: "Ortiz".to_string(),
            role: ProfessionalRole::Physician,
            active: true,
        })
        .await;
    for day in 0..7 {
        clinic
            .availability
            .add_rule(weekday_rule(on_call_id, day, "00:00:00", "23:59:59"))
            .await;
    }

    let conflicts = Arc::new(ConflictDetector::new(clinic.events.clone()));
    let finder = SlotFinder::new(clinic.availability.clone(), conflicts);

    let searched_at = Utc::now();
    let slot = finder
        .find_next_slot(on_call_id, 30, searched_at, 7)
        .await
        .unwrap()
        .expect("an on-call professional always has a next slot");
    assert!(slot.start > searched_at);

    let mut request = clinic.appointment(slot.start, slot.end);
    request.professional_id = on_call_id;

    let event = committed(clinic.booking.commit(request).await.unwrap());
    assert_eq!(event.start_time, slot.start);
    assert_eq!(event.end_time, slot.end);
}

// ==============================================================================
// INPUT VALIDATION AND DIRECTORY CHECKS
// ==============================================================================

#[tokio::test]
async fn test_inverted_interval_is_a_validation_error() {
    let clinic = TestClinic::new().await;

    let result = clinic
        .booking
        .commit(clinic.appointment(at(MONDAY, "10:30:00"), at(MONDAY, "10:00:00")))
        .await;

    assert_matches!(result, Err(SchedulingError::Validation(_)));
}

#[tokio::test]
async fn test_past_interval_is_a_validation_error() {
    let clinic = TestClinic::new().await;

    let result = clinic
        .booking
        .commit(clinic.appointment(
            at("2020-01-06", "10:00:00"),
            at("2020-01-06", "10:30:00"),
        ))
        .await;

    assert_matches!(result, Err(SchedulingError::Validation(_)));
}

#[tokio::test]
async fn test_unknown_professional_is_reported() {
    let clinic = TestClinic::new().await;

    let mut request = clinic.appointment(at(MONDAY, "10:00:00"), at(MONDAY, "10:30:00"));
    request.professional_id = Uuid::new_v4();

    let result = clinic.booking.commit(request).await;
    assert_matches!(result, Err(SchedulingError::UnknownProfessional(_)));
}

#[tokio::test]
async fn test_inactive_professional_takes_no_bookings() {
    let clinic = TestClinic::new().await;

    let retired_id = Uuid::new_v4();
    clinic
        .professionals
        .add(ProfessionalRecord {
            id: retired_id,
            first_name: "Alan".to_string(),
            last_name: "Reyes".to_string(),
            role: ProfessionalRole::Physician,
            active: false,
        })
        .await;

    let mut request = clinic.appointment(at(MONDAY, "10:00:00"), at(MONDAY, "10:30:00"));
    request.professional_id = retired_id;

    let result = clinic.booking.commit(request).await;
    assert_matches!(result, Err(SchedulingError::UnknownProfessional(_)));
}

#[tokio::test]
async fn test_unknown_patient_is_reported() {
    let clinic = TestClinic::new().await;

    let mut request = clinic.appointment(at(MONDAY, "10:00:00"), at(MONDAY, "10:30:00"));
    request.patient_id = Uuid::new_v4();

    let result = clinic.booking.commit(request).await;
    assert_matches!(result, Err(SchedulingError::UnknownPatient(_)));
}

#[tokio::test]
async fn test_physicians_cannot_host_surgeries() {
    let clinic = TestClinic::new().await;

    let mut request = clinic.surgery(at(MONDAY, "10:00:00"), at(MONDAY, "11:00:00"));
    request.professional_id = clinic.physician_id;

    let result = clinic.booking.commit(request).await;
    assert_matches!(result, Err(SchedulingError::Validation(_)));
}

#[tokio::test]
async fn test_surgeons_host_both_event_kinds() {
    let clinic = TestClinic::new().await;

    committed(
        clinic
            .booking
            .commit(clinic.surgery(at(MONDAY, "09:00:00"), at(MONDAY, "10:00:00")))
            .await
            .unwrap(),
    );

    let mut consult = clinic.appointment(at(MONDAY, "10:00:00"), at(MONDAY, "10:30:00"));
    consult.professional_id = clinic.surgeon_id;

    committed(clinic.booking.commit(consult).await.unwrap());
}

// ==============================================================================
// RACE RESOLUTION
// ==============================================================================

#[tokio::test]
async fn test_two_racing_commits_book_exactly_once() {
    let clinic = TestClinic::new().await;
    let start = at(MONDAY, "10:00:00");
    let end = at(MONDAY, "10:30:00");

    let (first, second) = tokio::join!(
        clinic.booking.commit(clinic.appointment(start, end)),
        clinic.booking.commit(clinic.appointment(start, end)),
    );

    let outcomes = [first.unwrap(), second.unwrap()];
    let commits = outcomes
        .iter()
        .filter(|o| matches!(o, CommitOutcome::Committed(_)))
        .count();
    let conflicts = outcomes
        .iter()
        .filter(|o| matches!(o, CommitOutcome::Rejected(RejectionReason::Conflict)))
        .count();

    assert_eq!(commits, 1);
    assert_eq!(conflicts, 1);
}

#[tokio::test]
async fn test_a_burst_of_overlapping_commits_books_exactly_once() {
    let clinic = TestClinic::new().await;
    let start = at(MONDAY, "10:00:00");
    let end = at(MONDAY, "11:00:00");

    let attempts: Vec<_> = (0..8)
        .map(|_| clinic.booking.commit(clinic.appointment(start, end)))
        .collect();
    let outcomes = futures::future::join_all(attempts).await;

    let commits = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(CommitOutcome::Committed(_))))
        .count();
    assert_eq!(commits, 1);

    let stored = clinic
        .events
        .events_overlapping(clinic.physician_id, start, end, None)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_racing_commits_for_different_professionals_both_land() {
    let clinic = TestClinic::new().await;
    let start = at(MONDAY, "10:00:00");
    let end = at(MONDAY, "10:30:00");

    let mut for_surgeon = clinic.appointment(start, end);
    for_surgeon.professional_id = clinic.surgeon_id;

    let (first, second) = tokio::join!(
        clinic.booking.commit(clinic.appointment(start, end)),
        clinic.booking.commit(for_surgeon),
    );

    committed(first.unwrap());
    committed(second.unwrap());
}

// ==============================================================================
// CANCELLATION AND RESCHEDULING
// ==============================================================================

#[tokio::test]
async fn test_cancellation_frees_the_interval() {
    let clinic = TestClinic::new().await;
    let start = at(MONDAY, "10:00:00");
    let end = at(MONDAY, "10:30:00");

    let event = committed(clinic.booking.commit(clinic.appointment(start, end)).await.unwrap());
    let canceled = clinic.booking.cancel(event.id).await.unwrap();
    assert_eq!(canceled.status, EventStatus::Canceled);

    // The interval is bookable again; the canceled row stays behind.
    let replacement =
        committed(clinic.booking.commit(clinic.appointment(start, end)).await.unwrap());
    assert_ne!(replacement.id, event.id);

    let kept = clinic.events.find_event(event.id).await.unwrap().unwrap();
    assert_eq!(kept.status, EventStatus::Canceled);
}

#[tokio::test]
async fn test_reschedule_moves_the_event() {
    let clinic = TestClinic::new().await;

    let event = committed(
        clinic
            .booking
            .commit(clinic.appointment(at(MONDAY, "09:00:00"), at(MONDAY, "09:30:00")))
            .await
            .unwrap(),
    );

    let outcome = clinic
        .booking
        .reschedule(
            event.id,
            RescheduleEventRequest {
                start: at(MONDAY, "11:00:00"),
                end: at(MONDAY, "11:30:00"),
            },
        )
        .await
        .unwrap();

    let moved = committed(outcome);
    assert_eq!(moved.id, event.id);
    assert_eq!(moved.start_time, at(MONDAY, "11:00:00"));
    assert_eq!(moved.end_time, at(MONDAY, "11:30:00"));
}

#[tokio::test]
async fn test_reschedule_may_overlap_its_own_old_interval() {
    let clinic = TestClinic::new().await;

    let event = committed(
        clinic
            .booking
            .commit(clinic.appointment(at(MONDAY, "09:00:00"), at(MONDAY, "09:30:00")))
            .await
            .unwrap(),
    );

    // Shifts by 15 minutes, overlapping itself; only other events count.
    let outcome = clinic
        .booking
        .reschedule(
            event.id,
            RescheduleEventRequest {
                start: at(MONDAY, "09:15:00"),
                end: at(MONDAY, "09:45:00"),
            },
        )
        .await
        .unwrap();

    committed(outcome);
}

#[tokio::test]
async fn test_reschedule_into_another_event_is_rejected() {
    let clinic = TestClinic::new().await;

    let event = committed(
        clinic
            .booking
            .commit(clinic.appointment(at(MONDAY, "09:00:00"), at(MONDAY, "09:30:00")))
            .await
            .unwrap(),
    );
    committed(
        clinic
            .booking
            .commit(clinic.appointment(at(MONDAY, "10:00:00"), at(MONDAY, "10:30:00")))
            .await
            .unwrap(),
    );

    let outcome = clinic
        .booking
        .reschedule(
            event.id,
            RescheduleEventRequest {
                start: at(MONDAY, "10:15:00"),
                end: at(MONDAY, "10:45:00"),
            },
        )
        .await
        .unwrap();

    assert_eq!(rejection(outcome), RejectionReason::Conflict);
}

#[tokio::test]
async fn test_reschedule_outside_working_hours_is_rejected() {
    let clinic = TestClinic::new().await;

    let event = committed(
        clinic
            .booking
            .commit(clinic.appointment(at(MONDAY, "09:00:00"), at(MONDAY, "09:30:00")))
            .await
            .unwrap(),
    );

    let outcome = clinic
        .booking
        .reschedule(
            event.id,
            RescheduleEventRequest {
                start: at(TUESDAY, "09:00:00"),
                end: at(TUESDAY, "09:30:00"),
            },
        )
        .await
        .unwrap();

    assert_eq!(rejection(outcome), RejectionReason::OutsideAvailability);
}

#[tokio::test]
async fn test_canceled_events_cannot_be_rescheduled() {
    let clinic = TestClinic::new().await;

    let event = committed(
        clinic
            .booking
            .commit(clinic.appointment(at(MONDAY, "09:00:00"), at(MONDAY, "09:30:00")))
            .await
            .unwrap(),
    );
    clinic.booking.cancel(event.id).await.unwrap();

    let result = clinic
        .booking
        .reschedule(
            event.id,
            RescheduleEventRequest {
                start: at(MONDAY, "10:00:00"),
                end: at(MONDAY, "10:30:00"),
            },
        )
        .await;

    assert_matches!(result, Err(SchedulingError::Validation(_)));
}

#[tokio::test]
async fn test_reschedule_of_a_missing_event_is_not_found() {
    let clinic = TestClinic::new().await;

    let result = clinic
        .booking
        .reschedule(
            Uuid::new_v4(),
            RescheduleEventRequest {
                start: at(MONDAY, "10:00:00"),
                end: at(MONDAY, "10:30:00"),
            },
        )
        .await;

    assert_matches!(result, Err(SchedulingError::EventNotFound(_)));
}

// ==============================================================================
// STATUS TRANSITIONS
// ==============================================================================

#[tokio::test]
async fn test_the_happy_path_runs_scheduled_confirmed_completed() {
    let clinic = TestClinic::new().await;

    let event = committed(
        clinic
            .booking
            .commit(clinic.appointment(at(MONDAY, "09:00:00"), at(MONDAY, "09:30:00")))
            .await
            .unwrap(),
    );

    let confirmed = clinic
        .booking
        .transition(event.id, EventStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(confirmed.status, EventStatus::Confirmed);

    let completed = clinic
        .booking
        .transition(event.id, EventStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed.status, EventStatus::Completed);
}

#[tokio::test]
async fn test_scheduled_events_cannot_jump_to_completed() {
    let clinic = TestClinic::new().await;

    let event = committed(
        clinic
            .booking
            .commit(clinic.appointment(at(MONDAY, "09:00:00"), at(MONDAY, "09:30:00")))
            .await
            .unwrap(),
    );

    let result = clinic
        .booking
        .transition(event.id, EventStatus::Completed)
        .await;

    assert_matches!(
        result,
        Err(SchedulingError::InvalidTransition {
            from: EventStatus::Scheduled,
            to: EventStatus::Completed,
        })
    );
}

#[tokio::test]
async fn test_terminal_events_reject_every_transition() {
    let clinic = TestClinic::new().await;

    let event = committed(
        clinic
            .booking
            .commit(clinic.appointment(at(MONDAY, "09:00:00"), at(MONDAY, "09:30:00")))
            .await
            .unwrap(),
    );
    clinic.booking.cancel(event.id).await.unwrap();

    let result = clinic
        .booking
        .transition(event.id, EventStatus::Confirmed)
        .await;
    assert_matches!(result, Err(SchedulingError::InvalidTransition { .. }));

    // Cancelling twice is also a transition violation.
    let result = clinic.booking.cancel(event.id).await;
    assert_matches!(result, Err(SchedulingError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_transition_of_a_missing_event_is_not_found() {
    let clinic = TestClinic::new().await;

    let result = clinic
        .booking
        .transition(Uuid::new_v4(), EventStatus::Confirmed)
        .await;

    assert_matches!(result, Err(SchedulingError::EventNotFound(_)));
}
