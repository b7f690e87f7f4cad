// libs/scheduling-cell/src/repository/memory.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{intervals_overlap, AvailabilityRule, BookableEvent, EventStatus, TimeWindow};
use crate::repository::{
    resolve_windows, AvailabilityRuleStore, EventRepository, RepositoryError,
};

// ==============================================================================
// IN-PROCESS EVENT REPOSITORY
// ==============================================================================

/// Event storage for single-node deployments and tests. Same contract as the
/// relational backend, without the transport.
#[derive(Default)]
pub struct InMemoryEventRepository {
    events: RwLock<Vec<BookableEvent>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn events_overlapping(
        &self,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude_event_id: Option<Uuid>,
    ) -> Result<Vec<BookableEvent>, RepositoryError> {
        let events = self.events.read().await;
        let mut matches: Vec<BookableEvent> = events
            .iter()
            .filter(|e| e.professional_id == professional_id)
            .filter(|e| Some(e.id) != exclude_event_id)
            .filter(|e| intervals_overlap(e.start_time, e.end_time, from, to))
            .cloned()
            .collect();

        matches.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(matches)
    }

    async fn events_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        professional_id: Option<Uuid>,
    ) -> Result<Vec<BookableEvent>, RepositoryError> {
        let events = self.events.read().await;
        let mut matches: Vec<BookableEvent> = events
            .iter()
            .filter(|e| professional_id.map_or(true, |id| e.professional_id == id))
            .filter(|e| intervals_overlap(e.start_time, e.end_time, from, to))
            .cloned()
            .collect();

        matches.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(matches)
    }

    async fn find_event(
        &self,
        event_id: Uuid,
    ) -> Result<Option<BookableEvent>, RepositoryError> {
        let events = self.events.read().await;
        Ok(events.iter().find(|e| e.id == event_id).cloned())
    }

    async fn insert_event(
        &self,
        event: &BookableEvent,
    ) -> Result<BookableEvent, RepositoryError> {
        let mut events = self.events.write().await;
        events.push(event.clone());
        Ok(event.clone())
    }

    async fn update_event_times(
        &self,
        event_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<BookableEvent, RepositoryError> {
        let mut events = self.events.write().await;
        let event = events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| RepositoryError::Malformed(format!("No event {}", event_id)))?;

        event.start_time = start_time;
        event.end_time = end_time;
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn update_event_status(
        &self,
        event_id: Uuid,
        status: EventStatus,
    ) -> Result<BookableEvent, RepositoryError> {
        let mut events = self.events.write().await;
        let event = events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| RepositoryError::Malformed(format!("No event {}", event_id)))?;

        event.status = status;
        event.updated_at = Utc::now();
        Ok(event.clone())
    }
}

// ==============================================================================
// IN-PROCESS AVAILABILITY RULE STORE
// ==============================================================================

#[derive(Default)]
pub struct InMemoryAvailabilityRuleStore {
    rules: RwLock<Vec<AvailabilityRule>>,
}

impl InMemoryAvailabilityRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_rule(&self, rule: AvailabilityRule) {
        self.rules.write().await.push(rule);
    }
}

#[async_trait]
impl AvailabilityRuleStore for InMemoryAvailabilityRuleStore {
    async fn rules_for(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeWindow>, RepositoryError> {
        let rules = self.rules.read().await;
        let for_professional: Vec<AvailabilityRule> = rules
            .iter()
            .filter(|r| r.professional_id == professional_id)
            .cloned()
            .collect();

        resolve_windows(&for_professional, date)
    }
}
