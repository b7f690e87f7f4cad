// libs/scheduling-cell/src/services/conflict.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{intervals_overlap, BookableEvent, SchedulingError};
use crate::repository::EventRepository;

/// Decides whether a candidate interval collides with committed events.
/// The slot finder uses it optimistically; the booking transaction re-runs
/// it inside the atomic unit, so both always agree.
pub struct ConflictDetector {
    events: Arc<dyn EventRepository>,
}

impl ConflictDetector {
    pub fn new(events: Arc<dyn EventRepository>) -> Self {
        Self { events }
    }

    /// All committed, non-canceled events for the professional that overlap
    /// `[start, end)`, ordered by start time.
    pub async fn find_conflicts(
        &self,
        professional_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_event_id: Option<Uuid>,
    ) -> Result<Vec<BookableEvent>, SchedulingError> {
        debug!(
            "Checking conflicts for professional {} from {} to {}",
            professional_id, start_time, end_time
        );

        let candidates = self
            .events
            .events_overlapping(professional_id, start_time, end_time, exclude_event_id)
            .await?;

        // The repository pre-filters on the backend; the overlap predicate is
        // re-applied here so every backend answers identically.
        let conflicts: Vec<BookableEvent> = candidates
            .into_iter()
            .filter(|event| event.status.counts_for_conflicts())
            .filter(|event| {
                intervals_overlap(start_time, end_time, event.start_time, event.end_time)
            })
            .collect();

        if !conflicts.is_empty() {
            warn!(
                "Conflict detected for professional {} - {} overlapping events",
                professional_id,
                conflicts.len()
            );
        }

        Ok(conflicts)
    }

    pub async fn has_conflict(
        &self,
        professional_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_event_id: Option<Uuid>,
    ) -> Result<bool, SchedulingError> {
        let conflicts = self
            .find_conflicts(professional_id, start_time, end_time, exclude_event_id)
            .await?;
        Ok(!conflicts.is_empty())
    }
}
