// libs/scheduling-cell/src/services/slot_finder.rs
use chrono::{DateTime, Days, Duration, DurationRound, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{SchedulingError, SlotCandidate};
use crate::repository::AvailabilityRuleStore;
use crate::services::conflict::ConflictDetector;

pub const DEFAULT_SEARCH_WINDOW_DAYS: i64 = 30;
pub const MAX_SEARCH_WINDOW_DAYS: i64 = 365;
pub const MAX_SLOT_DURATION_MINUTES: i64 = 24 * 60;

/// Lead between the clock and the earliest offered start, so a candidate is
/// still in the future by the time the caller commits it.
const BOOKING_LEAD_MINUTES: i64 = 1;

/// Walks forward from a requested start to the first interval of the
/// requested duration that fits an availability window and collides with
/// nothing. Read-only; the booking transaction is the authority on whether
/// a candidate still holds.
pub struct SlotFinder {
    availability: Arc<dyn AvailabilityRuleStore>,
    conflicts: Arc<ConflictDetector>,
}

impl SlotFinder {
    pub fn new(availability: Arc<dyn AvailabilityRuleStore>, conflicts: Arc<ConflictDetector>) -> Self {
        Self {
            availability,
            conflicts,
        }
    }

    /// First open slot at or after `search_from`, or None once the search
    /// window is exhausted. None is an expected outcome, not an error.
    pub async fn find_next_slot(
        &self,
        professional_id: Uuid,
        duration_minutes: i64,
        search_from: DateTime<Utc>,
        search_window_days: i64,
    ) -> Result<Option<SlotCandidate>, SchedulingError> {
        if duration_minutes <= 0 {
            return Err(SchedulingError::Validation(
                "Duration must be positive".to_string(),
            ));
        }
        if duration_minutes > MAX_SLOT_DURATION_MINUTES {
            return Err(SchedulingError::Validation(format!(
                "Duration must not exceed {} minutes",
                MAX_SLOT_DURATION_MINUTES
            )));
        }
        if search_window_days <= 0 {
            return Err(SchedulingError::Validation(
                "Search window must be positive".to_string(),
            ));
        }
        if search_window_days > MAX_SEARCH_WINDOW_DAYS {
            return Err(SchedulingError::Validation(format!(
                "Search window must not exceed {} days",
                MAX_SEARCH_WINDOW_DAYS
            )));
        }

        let duration = Duration::minutes(duration_minutes);
        // Slots are never offered in the past, and always far enough ahead
        // that an immediate commit still lands in the future.
        let floor = search_from.max(earliest_bookable(Utc::now()));

        debug!(
            "Searching next {}-minute slot for professional {} from {}",
            duration_minutes, professional_id, floor
        );

        let first_date = floor.date_naive();

        for day_offset in 0..search_window_days as u64 {
            let date = match first_date.checked_add_days(Days::new(day_offset)) {
                Some(date) => date,
                None => break,
            };

            let windows = self.availability.rules_for(professional_id, date).await?;

            for window in windows {
                // Latest start that still fits; comparing starts keeps the
                // cursor arithmetic inside chrono's representable range.
                let last_start = window.end - duration;
                let mut cursor = window.start.max(floor);

                while cursor <= last_start {
                    let blockers = self
                        .conflicts
                        .find_conflicts(professional_id, cursor, cursor + duration, None)
                        .await?;

                    if blockers.is_empty() {
                        info!(
                            "Found slot for professional {}: {} to {}",
                            professional_id,
                            cursor,
                            cursor + duration
                        );
                        return Ok(Some(SlotCandidate {
                            professional_id,
                            start: cursor,
                            end: cursor + duration,
                        }));
                    }

                    // Jump past every blocker; an event only conflicts if it
                    // ends after the cursor, so this always advances.
                    match blockers.iter().map(|event| event.end_time).max() {
                        Some(busy_until) => cursor = busy_until,
                        None => break,
                    }
                }
            }
        }

        debug!(
            "No slot for professional {} within {} days of {}",
            professional_id, search_window_days, floor
        );
        Ok(None)
    }
}

/// Earliest instant a candidate may start: one lead interval past `now`,
/// rounded up to the whole minute.
fn earliest_bookable(now: DateTime<Utc>) -> DateTime<Utc> {
    let lead = now + Duration::minutes(BOOKING_LEAD_MINUTES);
    match lead.duration_trunc(Duration::minutes(1)) {
        Ok(whole) if whole == lead => whole,
        Ok(whole) => whole + Duration::minutes(1),
        Err(_) => lead,
    }
}
