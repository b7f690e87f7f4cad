// libs/scheduling-cell/src/services/booking.rs
//
// The only mutation path into the event repository. Re-validates every
// commit inside a per-professional critical section so the "check then
// write" race can never double-book.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use directory_cell::{
    PatientDirectory, ProfessionalDirectory, ProfessionalRecord, ProfessionalRole,
};

use crate::models::{
    BookEventRequest, BookableEvent, CommitOutcome, EventKind, EventStatus,
    RejectionReason, RescheduleEventRequest, SchedulingError,
};
use crate::repository::{AvailabilityRuleStore, EventRepository};
use crate::services::conflict::ConflictDetector;
use crate::services::notify::NotificationClient;

pub struct BookingTransaction {
    events: Arc<dyn EventRepository>,
    availability: Arc<dyn AvailabilityRuleStore>,
    conflicts: Arc<ConflictDetector>,
    patients: Arc<dyn PatientDirectory>,
    professionals: Arc<dyn ProfessionalDirectory>,
    notifier: Arc<NotificationClient>,
    professional_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl BookingTransaction {
    pub fn new(
        events: Arc<dyn EventRepository>,
        availability: Arc<dyn AvailabilityRuleStore>,
        conflicts: Arc<ConflictDetector>,
        patients: Arc<dyn PatientDirectory>,
        professionals: Arc<dyn ProfessionalDirectory>,
        notifier: Arc<NotificationClient>,
    ) -> Self {
        Self {
            events,
            availability,
            conflicts,
            patients,
            professionals,
            notifier,
            professional_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Atomically validate and persist a new booking.
    /// `Rejected` outcomes are normal control flow; the caller re-searches.
    #[instrument(skip(self))]
    pub async fn commit(
        &self,
        request: BookEventRequest,
    ) -> Result<CommitOutcome, SchedulingError> {
        debug!(
            "Commit requested for professional {} from {} to {}",
            request.professional_id, request.start, request.end
        );

        // Step 1: Validate the interval shape
        validate_interval(request.start, request.end)?;

        // Step 2: Validate the referenced professional and patient
        let professional = self.require_professional(request.professional_id).await?;
        if !role_can_host(professional.role, request.kind) {
            return Err(SchedulingError::Validation(format!(
                "A {} cannot host a {}",
                professional.role, request.kind
            )));
        }
        self.require_patient(request.patient_id).await?;

        // Step 3: Serialize with every other commit for this professional
        let lock = self.professional_lock(request.professional_id).await;
        let _guard = lock.lock().await;

        // Step 4: Authoritative conflict check under the lock
        if self
            .conflicts
            .has_conflict(request.professional_id, request.start, request.end, None)
            .await?
        {
            warn!(
                "Commit rejected for professional {}: conflicting booking",
                request.professional_id
            );
            return Ok(CommitOutcome::Rejected(RejectionReason::Conflict));
        }

        // Step 5: The interval must lie inside one working window on its date
        if !self
            .inside_availability(request.professional_id, request.start, request.end)
            .await?
        {
            warn!(
                "Commit rejected for professional {}: outside availability",
                request.professional_id
            );
            return Ok(CommitOutcome::Rejected(RejectionReason::OutsideAvailability));
        }

        // Step 6: Persist
        let now = Utc::now();
        let event = BookableEvent {
            id: Uuid::new_v4(),
            professional_id: request.professional_id,
            patient_id: request.patient_id,
            start_time: request.start,
            end_time: request.end,
            kind: request.kind,
            status: EventStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };
        let created = self.events.insert_event(&event).await?;

        info!(
            "Committed {} {} for professional {}",
            created.kind, created.id, created.professional_id
        );

        // Step 7: Post-commit notification, never blocking the outcome
        self.notifier.dispatch("booked", &created);

        Ok(CommitOutcome::Committed(created))
    }

    /// Move an existing event to a new interval. Runs the full commit checks
    /// with the event itself excluded from conflict detection.
    #[instrument(skip(self))]
    pub async fn reschedule(
        &self,
        event_id: Uuid,
        request: RescheduleEventRequest,
    ) -> Result<CommitOutcome, SchedulingError> {
        validate_interval(request.start, request.end)?;

        let existing = self.get_event(event_id).await?;

        let lock = self.professional_lock(existing.professional_id).await;
        let _guard = lock.lock().await;

        // Status may have moved since the unlocked read
        let current = self.get_event(event_id).await?;
        if !current.status.allows_reschedule() {
            return Err(SchedulingError::Validation(format!(
                "A {} event cannot be rescheduled",
                current.status
            )));
        }

        if self
            .conflicts
            .has_conflict(
                current.professional_id,
                request.start,
                request.end,
                Some(event_id),
            )
            .await?
        {
            warn!("Reschedule of {} rejected: conflicting booking", event_id);
            return Ok(CommitOutcome::Rejected(RejectionReason::Conflict));
        }

        if !self
            .inside_availability(current.professional_id, request.start, request.end)
            .await?
        {
            warn!("Reschedule of {} rejected: outside availability", event_id);
            return Ok(CommitOutcome::Rejected(RejectionReason::OutsideAvailability));
        }

        let updated = self
            .events
            .update_event_times(event_id, request.start, request.end)
            .await?;

        info!(
            "Rescheduled event {} to {} - {}",
            event_id, request.start, request.end
        );
        self.notifier.dispatch("rescheduled", &updated);

        Ok(CommitOutcome::Committed(updated))
    }

    /// Table-driven status transition. Rides the professional's lock so it
    /// serializes with commits.
    pub async fn transition(
        &self,
        event_id: Uuid,
        new_status: EventStatus,
    ) -> Result<BookableEvent, SchedulingError> {
        let existing = self.get_event(event_id).await?;

        let lock = self.professional_lock(existing.professional_id).await;
        let _guard = lock.lock().await;

        // Status may have moved since the unlocked read
        let current = self.get_event(event_id).await?;
        if !current.status.valid_transitions().contains(&new_status) {
            warn!(
                "Invalid status transition attempted on {}: {} -> {}",
                event_id, current.status, new_status
            );
            return Err(SchedulingError::InvalidTransition {
                from: current.status,
                to: new_status,
            });
        }

        let updated = self.events.update_event_status(event_id, new_status).await?;

        info!(
            "Event {} transitioned {} -> {}",
            event_id, current.status, new_status
        );

        let action = match new_status {
            EventStatus::Confirmed => "confirmed",
            EventStatus::Completed => "completed",
            EventStatus::Canceled => "canceled",
            EventStatus::Scheduled => "status_changed",
        };
        self.notifier.dispatch(action, &updated);

        Ok(updated)
    }

    /// Cancellation frees the interval for future searches but keeps the row
    /// for history.
    pub async fn cancel(&self, event_id: Uuid) -> Result<BookableEvent, SchedulingError> {
        self.transition(event_id, EventStatus::Canceled).await
    }

    pub async fn get_event(&self, event_id: Uuid) -> Result<BookableEvent, SchedulingError> {
        self.events
            .find_event(event_id)
            .await?
            .ok_or(SchedulingError::EventNotFound(event_id))
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn professional_lock(&self, professional_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.professional_locks.lock().await;
        locks
            .entry(professional_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn require_professional(
        &self,
        professional_id: Uuid,
    ) -> Result<ProfessionalRecord, SchedulingError> {
        let record = self
            .professionals
            .find(professional_id)
            .await
            .map_err(|e| SchedulingError::Directory(e.to_string()))?;

        // Inactive professionals take no new work; treat them as unknown.
        match record {
            Some(professional) if professional.active => Ok(professional),
            _ => Err(SchedulingError::UnknownProfessional(professional_id)),
        }
    }

    async fn require_patient(&self, patient_id: Uuid) -> Result<(), SchedulingError> {
        let record = self
            .patients
            .find(patient_id)
            .await
            .map_err(|e| SchedulingError::Directory(e.to_string()))?;

        if record.is_none() {
            return Err(SchedulingError::UnknownPatient(patient_id));
        }
        Ok(())
    }

    async fn inside_availability(
        &self,
        professional_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, SchedulingError> {
        let windows = self
            .availability
            .rules_for(professional_id, start.date_naive())
            .await?;
        Ok(windows.iter().any(|window| window.contains(start, end)))
    }
}

fn role_can_host(role: ProfessionalRole, kind: EventKind) -> bool {
    match kind {
        EventKind::Appointment => true,
        EventKind::Surgery => role == ProfessionalRole::Surgeon,
    }
}

fn validate_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), SchedulingError> {
    if start >= end {
        return Err(SchedulingError::Validation(
            "Start time must be before end time".to_string(),
        ));
    }
    if start <= Utc::now() {
        return Err(SchedulingError::Validation(
            "Events must be scheduled for a future time".to_string(),
        ));
    }
    Ok(())
}
