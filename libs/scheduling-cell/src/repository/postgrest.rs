// libs/scheduling-cell/src/repository/postgrest.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_database::postgrest::PostgrestClient;

use crate::models::{day_of_week_index, AvailabilityRule, BookableEvent, EventStatus, TimeWindow};
use crate::repository::{
    resolve_windows, AvailabilityRuleStore, EventRepository, RepositoryError,
};

// ==============================================================================
// EVENT REPOSITORY
// ==============================================================================

pub struct PostgrestEventRepository {
    db: Arc<PostgrestClient>,
}

impl PostgrestEventRepository {
    pub fn new(db: Arc<PostgrestClient>) -> Self {
        Self { db }
    }

    async fn fetch_events(&self, path: &str) -> Result<Vec<BookableEvent>, RepositoryError> {
        let result: Vec<Value> = self
            .db
            .request(Method::GET, path, None)
            .await
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<BookableEvent>, _>>()
            .map_err(|e| RepositoryError::Malformed(format!("Failed to parse events: {}", e)))
    }

    async fn write_event(
        &self,
        method: Method,
        path: &str,
        body: Value,
    ) -> Result<BookableEvent, RepositoryError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .db
            .request_with_headers(method, path, Some(body), Some(headers))
            .await
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;

        let row = result.into_iter().next().ok_or_else(|| {
            RepositoryError::Unavailable("Write returned no representation".to_string())
        })?;

        serde_json::from_value(row)
            .map_err(|e| RepositoryError::Malformed(format!("Failed to parse event: {}", e)))
    }
}

#[async_trait]
impl EventRepository for PostgrestEventRepository {
    async fn events_overlapping(
        &self,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude_event_id: Option<Uuid>,
    ) -> Result<Vec<BookableEvent>, RepositoryError> {
        // Use URL-encoded RFC3339 format for the backend
        let from_str = from.to_rfc3339();
        let to_str = to.to_rfc3339();
        let mut query_parts = vec![
            format!("professional_id=eq.{}", professional_id),
            format!("start_time=lt.{}", urlencoding::encode(&to_str)),
            format!("end_time=gt.{}", urlencoding::encode(&from_str)),
        ];

        if let Some(exclude_id) = exclude_event_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!(
            "/rest/v1/bookable_events?{}&order=start_time.asc",
            query_parts.join("&")
        );

        self.fetch_events(&path).await
    }

    async fn events_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        professional_id: Option<Uuid>,
    ) -> Result<Vec<BookableEvent>, RepositoryError> {
        let from_str = from.to_rfc3339();
        let to_str = to.to_rfc3339();
        let mut query_parts = vec![
            format!("start_time=lt.{}", urlencoding::encode(&to_str)),
            format!("end_time=gt.{}", urlencoding::encode(&from_str)),
        ];

        if let Some(id) = professional_id {
            query_parts.push(format!("professional_id=eq.{}", id));
        }

        let path = format!(
            "/rest/v1/bookable_events?{}&order=start_time.asc",
            query_parts.join("&")
        );

        self.fetch_events(&path).await
    }

    async fn find_event(
        &self,
        event_id: Uuid,
    ) -> Result<Option<BookableEvent>, RepositoryError> {
        let path = format!("/rest/v1/bookable_events?id=eq.{}", event_id);
        let events = self.fetch_events(&path).await?;
        Ok(events.into_iter().next())
    }

    async fn insert_event(
        &self,
        event: &BookableEvent,
    ) -> Result<BookableEvent, RepositoryError> {
        debug!(
            "Inserting {} for professional {} from {} to {}",
            event.kind, event.professional_id, event.start_time, event.end_time
        );

        let event_data = json!({
            "id": event.id,
            "professional_id": event.professional_id,
            "patient_id": event.patient_id,
            "start_time": event.start_time.to_rfc3339(),
            "end_time": event.end_time.to_rfc3339(),
            "kind": event.kind.to_string(),
            "status": event.status.to_string(),
            "created_at": event.created_at.to_rfc3339(),
            "updated_at": event.updated_at.to_rfc3339()
        });

        self.write_event(Method::POST, "/rest/v1/bookable_events", event_data)
            .await
    }

    async fn update_event_times(
        &self,
        event_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<BookableEvent, RepositoryError> {
        let path = format!("/rest/v1/bookable_events?id=eq.{}", event_id);
        let update_data = json!({
            "start_time": start_time.to_rfc3339(),
            "end_time": end_time.to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        self.write_event(Method::PATCH, &path, update_data).await
    }

    async fn update_event_status(
        &self,
        event_id: Uuid,
        status: EventStatus,
    ) -> Result<BookableEvent, RepositoryError> {
        let path = format!("/rest/v1/bookable_events?id=eq.{}", event_id);
        let update_data = json!({
            "status": status.to_string(),
            "updated_at": Utc::now().to_rfc3339()
        });

        self.write_event(Method::PATCH, &path, update_data).await
    }
}

// ==============================================================================
// AVAILABILITY RULE STORE
// ==============================================================================

pub struct PostgrestAvailabilityRuleStore {
    db: Arc<PostgrestClient>,
}

impl PostgrestAvailabilityRuleStore {
    pub fn new(db: Arc<PostgrestClient>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AvailabilityRuleStore for PostgrestAvailabilityRuleStore {
    async fn rules_for(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeWindow>, RepositoryError> {
        debug!("Fetching availability rules for professional {} on {}", professional_id, date);

        let path = format!(
            "/rest/v1/availability_rules?professional_id=eq.{}&day_of_week=eq.{}&order=start_time.asc",
            professional_id,
            day_of_week_index(date)
        );

        let result: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;

        let rules: Vec<AvailabilityRule> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilityRule>, _>>()
            .map_err(|e| RepositoryError::Malformed(format!("Failed to parse rules: {}", e)))?;

        resolve_windows(&rules, date)
    }
}
