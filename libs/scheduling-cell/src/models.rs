// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::repository::RepositoryError;

// ==============================================================================
// CORE EVENT MODELS
// ==============================================================================

/// One committed booking. Consultations and surgeries share this shape and
/// differ only in `kind`; both streams are checked against each other for
/// conflicts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookableEvent {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub patient_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub kind: EventKind,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookableEvent {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Appointment,
    Surgery,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Appointment => write!(f, "appointment"),
            EventKind::Surgery => write!(f, "surgery"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    Confirmed,
    Completed,
    Canceled,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStatus::Scheduled => write!(f, "scheduled"),
            EventStatus::Confirmed => write!(f, "confirmed"),
            EventStatus::Completed => write!(f, "completed"),
            EventStatus::Canceled => write!(f, "canceled"),
        }
    }
}

impl EventStatus {
    /// Canceled events free their interval but stay on record.
    pub fn counts_for_conflicts(&self) -> bool {
        !matches!(self, EventStatus::Canceled)
    }

    /// Get all valid next statuses for a given current status
    pub fn valid_transitions(&self) -> Vec<EventStatus> {
        match self {
            EventStatus::Scheduled => vec![EventStatus::Confirmed, EventStatus::Canceled],
            EventStatus::Confirmed => vec![EventStatus::Completed, EventStatus::Canceled],
            // Terminal states - no transitions allowed
            EventStatus::Completed => vec![],
            EventStatus::Canceled => vec![],
        }
    }

    pub fn allows_reschedule(&self) -> bool {
        matches!(self, EventStatus::Scheduled | EventStatus::Confirmed)
    }
}

/// Half-open interval overlap: `[s1,e1)` and `[s2,e2)` conflict iff
/// `s1 < e2 && s2 < e1`. An event ending exactly when another starts is not
/// a conflict. Every overlap decision in the cell routes through here.
pub fn intervals_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

/// One recurring working-hours row for a professional. Multiple rows per
/// weekday model split shifts; rows for the same professional and weekday
/// must not overlap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub id: Uuid,
    pub professional_id: Uuid,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub blackout_dates: Vec<NaiveDate>,
}

impl AvailabilityRule {
    /// Whether this rule produces a window on the given calendar date.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        if day_of_week_index(date) != self.day_of_week {
            return false;
        }
        if let Some(from) = self.valid_from {
            if date < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if date > until {
                return false;
            }
        }
        !self.blackout_dates.contains(&date)
    }
}

pub fn day_of_week_index(date: NaiveDate) -> i32 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

/// A concrete bookable window on one calendar date, in clinic (UTC) time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start <= start && end <= self.end
    }
}

/// Candidate produced by the slot finder. Never persisted; it either becomes
/// a commit request or is discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotCandidate {
    pub professional_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookEventRequest {
    pub professional_id: Uuid,
    pub patient_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleEventRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: EventStatus,
}

/// Result of a commit attempt. Rejections are expected outcomes, not errors:
/// the caller re-searches and tries again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CommitOutcome {
    Committed(BookableEvent),
    Rejected(RejectionReason),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    Conflict,
    OutsideAvailability,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::Conflict => write!(f, "conflict"),
            RejectionReason::OutsideAvailability => write!(f, "outside_availability"),
        }
    }
}

// ==============================================================================
// CALENDAR PROJECTION MODELS
// ==============================================================================

/// One event as the calendar view renders it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub event_id: Uuid,
    pub professional_id: Uuid,
    pub patient_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub kind: EventKind,
    pub status: EventStatus,
    pub display_color: String,
}

impl CalendarEntry {
    pub fn from_event(event: &BookableEvent) -> Self {
        Self {
            event_id: event.id,
            professional_id: event.professional_id,
            patient_id: event.patient_id,
            start_time: event.start_time,
            end_time: event.end_time,
            kind: event.kind,
            status: event.status,
            display_color: Self::display_color(event.kind, event.status).to_string(),
        }
    }

    /// Display color keyed on (kind, status). Canceled and completed shades
    /// win over the kind shade.
    pub fn display_color(kind: EventKind, status: EventStatus) -> &'static str {
        match (kind, status) {
            (_, EventStatus::Canceled) => "#9e9e9e",
            (_, EventStatus::Completed) => "#66bb6a",
            (EventKind::Appointment, EventStatus::Scheduled) => "#64b5f6",
            (EventKind::Appointment, EventStatus::Confirmed) => "#1e88e5",
            (EventKind::Surgery, EventStatus::Scheduled) => "#ef9a9a",
            (EventKind::Surgery, EventStatus::Confirmed) => "#e53935",
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SchedulingError {
    #[error("Professional not found: {0}")]
    UnknownProfessional(Uuid),

    #[error("Patient not found: {0}")]
    UnknownPatient(Uuid),

    #[error("Event not found: {0}")]
    EventNotFound(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Status transition not allowed: {from} -> {to}")]
    InvalidTransition { from: EventStatus, to: EventStatus },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Directory error: {0}")]
    Directory(String),
}
