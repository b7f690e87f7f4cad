// libs/scheduling-cell/src/services/calendar.rs

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::models::{CalendarEntry, SchedulingError};
use crate::repository::EventRepository;

/// Read-only projection of events into display entries. Canceled events stay
/// visible here even though they no longer block anything.
pub struct CalendarAggregator {
    events: Arc<dyn EventRepository>,
}

impl CalendarAggregator {
    pub fn new(events: Arc<dyn EventRepository>) -> Self {
        Self { events }
    }

    /// Every event touching `[from, to)`, optionally narrowed to one
    /// professional, ordered by start time.
    pub async fn project_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        professional_id: Option<Uuid>,
    ) -> Result<Vec<CalendarEntry>, SchedulingError> {
        if from >= to {
            return Err(SchedulingError::Validation(
                "Calendar range start must be before its end".to_string(),
            ));
        }

        debug!(
            "Projecting calendar from {} to {} (professional: {:?})",
            from, to, professional_id
        );

        let events = self.events.events_in_range(from, to, professional_id).await?;

        let mut entries: Vec<CalendarEntry> =
            events.iter().map(CalendarEntry::from_event).collect();

        // Repositories already order by start time; the id tie-break keeps
        // equal starts stable across backends.
        entries.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then(a.event_id.cmp(&b.event_id))
        });

        Ok(entries)
    }
}
