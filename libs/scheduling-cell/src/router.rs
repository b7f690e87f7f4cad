// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use directory_cell::{
    PatientDirectory, PostgrestPatientDirectory, PostgrestProfessionalDirectory,
    ProfessionalDirectory,
};
use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::handlers;
use crate::repository::postgrest::{PostgrestAvailabilityRuleStore, PostgrestEventRepository};
use crate::repository::{AvailabilityRuleStore, EventRepository};
use crate::services::booking::BookingTransaction;
use crate::services::calendar::CalendarAggregator;
use crate::services::conflict::ConflictDetector;
use crate::services::notify::NotificationClient;
use crate::services::slot_finder::SlotFinder;

/// Shared service state for the scheduling routes. One instance per process;
/// the booking lock map only serializes commits that go through it.
pub struct SchedulingState {
    pub slot_finder: SlotFinder,
    pub booking: BookingTransaction,
    pub calendar: CalendarAggregator,
    pub availability: Arc<dyn AvailabilityRuleStore>,
}

impl SchedulingState {
    pub fn new(
        events: Arc<dyn EventRepository>,
        availability: Arc<dyn AvailabilityRuleStore>,
        patients: Arc<dyn PatientDirectory>,
        professionals: Arc<dyn ProfessionalDirectory>,
        notifier: Arc<NotificationClient>,
    ) -> Self {
        let conflicts = Arc::new(ConflictDetector::new(events.clone()));

        Self {
            slot_finder: SlotFinder::new(availability.clone(), conflicts.clone()),
            booking: BookingTransaction::new(
                events.clone(),
                availability.clone(),
                conflicts,
                patients,
                professionals,
                notifier,
            ),
            calendar: CalendarAggregator::new(events),
            availability,
        }
    }

    /// Production wiring: every port backed by the PostgREST API.
    pub fn from_config(config: &AppConfig) -> Self {
        let db = Arc::new(PostgrestClient::new(config));

        let events: Arc<dyn EventRepository> =
            Arc::new(PostgrestEventRepository::new(db.clone()));
        let availability: Arc<dyn AvailabilityRuleStore> =
            Arc::new(PostgrestAvailabilityRuleStore::new(db.clone()));
        let patients: Arc<dyn PatientDirectory> =
            Arc::new(PostgrestPatientDirectory::new(db.clone()));
        let professionals: Arc<dyn ProfessionalDirectory> =
            Arc::new(PostgrestProfessionalDirectory::new(db));
        let notifier = Arc::new(NotificationClient::new(config));

        Self::new(events, availability, patients, professionals, notifier)
    }
}

pub fn scheduling_routes(state: Arc<SchedulingState>) -> Router {
    Router::new()
        // Slot search and working windows
        .route("/availability/next-slot", get(handlers::find_next_slot))
        .route("/availability/windows", get(handlers::get_availability_windows))
        // Booking lifecycle
        .route("/bookings", post(handlers::book_event))
        .route("/bookings/{event_id}", get(handlers::get_event))
        .route("/bookings/{event_id}/reschedule", patch(handlers::reschedule_event))
        .route("/bookings/{event_id}/cancel", post(handlers::cancel_event))
        .route("/bookings/{event_id}/status", post(handlers::update_event_status))
        // Calendar projection
        .route("/calendar", get(handlers::get_calendar))
        .with_state(state)
}
