// libs/scheduling-cell/src/repository/mod.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AvailabilityRule, BookableEvent, EventStatus, TimeWindow};

pub mod memory;
pub mod postgrest;

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum RepositoryError {
    /// Transport or backend fault. The only hard-failure class; callers may
    /// retry with backoff.
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    /// A row failed to decode or violated a stored invariant.
    #[error("Malformed repository data: {0}")]
    Malformed(String),
}

// ==============================================================================
// STORAGE TRAITS
// ==============================================================================

/// Source of truth for committed bookings. Rows are never deleted;
/// cancellation is a status update.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Events for one professional whose interval overlaps `[from, to)`,
    /// canceled rows included, ordered by start time.
    async fn events_overlapping(
        &self,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude_event_id: Option<Uuid>,
    ) -> Result<Vec<BookableEvent>, RepositoryError>;

    /// Events across professionals whose interval overlaps `[from, to)`,
    /// optionally restricted to one professional.
    async fn events_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        professional_id: Option<Uuid>,
    ) -> Result<Vec<BookableEvent>, RepositoryError>;

    async fn find_event(&self, event_id: Uuid)
        -> Result<Option<BookableEvent>, RepositoryError>;

    async fn insert_event(&self, event: &BookableEvent)
        -> Result<BookableEvent, RepositoryError>;

    async fn update_event_times(
        &self,
        event_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<BookableEvent, RepositoryError>;

    async fn update_event_status(
        &self,
        event_id: Uuid,
        status: EventStatus,
    ) -> Result<BookableEvent, RepositoryError>;
}

/// Working-hours lookup. Rule rows are administered elsewhere; this subsystem
/// only resolves them to concrete windows.
#[async_trait]
pub trait AvailabilityRuleStore: Send + Sync {
    /// Bookable windows for one professional on one calendar date, blackouts
    /// applied, ordered by start. Unknown professionals resolve to no windows.
    async fn rules_for(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeWindow>, RepositoryError>;
}

// ==============================================================================
// WINDOW RESOLUTION
// ==============================================================================

/// Resolve rule rows to the windows of one calendar date. Shared by every
/// store backend so they agree on weekday matching, validity ranges,
/// blackouts and ordering.
pub fn resolve_windows(
    rules: &[AvailabilityRule],
    date: NaiveDate,
) -> Result<Vec<TimeWindow>, RepositoryError> {
    let mut windows: Vec<TimeWindow> = Vec::new();

    for rule in rules {
        if !rule.applies_on(date) {
            continue;
        }
        if rule.start_time >= rule.end_time {
            return Err(RepositoryError::Malformed(format!(
                "availability rule {} has an empty window",
                rule.id
            )));
        }
        windows.push(TimeWindow {
            start: date.and_time(rule.start_time).and_utc(),
            end: date.and_time(rule.end_time).and_utc(),
        });
    }

    windows.sort_by(|a, b| a.start.cmp(&b.start));

    // Overlapping rules for one professional/weekday are data corruption, not
    // a merge opportunity.
    for pair in windows.windows(2) {
        if pair[1].start < pair[0].end {
            return Err(RepositoryError::Malformed(format!(
                "overlapping availability rules on {}",
                date
            )));
        }
    }

    Ok(windows)
}
