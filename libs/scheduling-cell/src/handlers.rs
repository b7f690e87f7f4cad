// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    BookEventRequest, CommitOutcome, RescheduleEventRequest, SchedulingError,
    UpdateStatusRequest,
};
use crate::repository::RepositoryError;
use crate::router::SchedulingState;
use crate::services::slot_finder::DEFAULT_SEARCH_WINDOW_DAYS;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct NextSlotQuery {
    pub professional_id: Uuid,
    pub duration_minutes: i64,
    pub from: Option<DateTime<Utc>>,
    pub search_window_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct WindowsQuery {
    pub professional_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub professional_id: Option<Uuid>,
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

/// Earliest conflict-free slot at or after `from`. Responds 404 when the
/// search window holds no slot; that is the expected "fully booked" answer.
#[axum::debug_handler]
pub async fn find_next_slot(
    State(state): State<Arc<SchedulingState>>,
    Query(query): Query<NextSlotQuery>,
) -> Result<Json<Value>, AppError> {
    debug!(
        "Next-slot request for professional {} ({} min)",
        query.professional_id, query.duration_minutes
    );

    let search_from = query.from.unwrap_or_else(Utc::now);
    let window_days = query.search_window_days.unwrap_or(DEFAULT_SEARCH_WINDOW_DAYS);

    let slot = state
        .slot_finder
        .find_next_slot(
            query.professional_id,
            query.duration_minutes,
            search_from,
            window_days,
        )
        .await
        .map_err(map_scheduling_error)?;

    match slot {
        Some(slot) => Ok(Json(json!({
            "success": true,
            "slot": slot
        }))),
        None => Err(AppError::NotFound(format!(
            "No open {}-minute slot for professional {} within {} days",
            query.duration_minutes, query.professional_id, window_days
        ))),
    }
}

/// Resolved working windows for one professional on one calendar date.
#[axum::debug_handler]
pub async fn get_availability_windows(
    State(state): State<Arc<SchedulingState>>,
    Query(query): Query<WindowsQuery>,
) -> Result<Json<Value>, AppError> {
    let windows = state
        .availability
        .rules_for(query.professional_id, query.date)
        .await
        .map_err(|e| map_scheduling_error(SchedulingError::Repository(e)))?;

    Ok(Json(json!({
        "success": true,
        "professional_id": query.professional_id,
        "date": query.date,
        "windows": windows
    })))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

/// Commit a booking. 201 with the stored event on success; 409 with a reason
/// when the interval lost a race or lies outside working hours.
#[axum::debug_handler]
pub async fn book_event(
    State(state): State<Arc<SchedulingState>>,
    Json(request): Json<BookEventRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!(
        "Booking request: professional {} from {} to {}",
        request.professional_id, request.start, request.end
    );

    let outcome = state
        .booking
        .commit(request)
        .await
        .map_err(map_scheduling_error)?;

    match outcome {
        CommitOutcome::Committed(event) => Ok((
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "event": event
            })),
        )),
        CommitOutcome::Rejected(reason) => Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "reason": reason
            })),
        )),
    }
}

#[axum::debug_handler]
pub async fn get_event(
    State(state): State<Arc<SchedulingState>>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let event = state
        .booking
        .get_event(event_id)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "event": event
    })))
}

/// Move an event to a new interval. Same 409 contract as booking.
#[axum::debug_handler]
pub async fn reschedule_event(
    State(state): State<Arc<SchedulingState>>,
    Path(event_id): Path<Uuid>,
    Json(request): Json<RescheduleEventRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!("Reschedule request for event {}", event_id);

    let outcome = state
        .booking
        .reschedule(event_id, request)
        .await
        .map_err(map_scheduling_error)?;

    match outcome {
        CommitOutcome::Committed(event) => Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "event": event
            })),
        )),
        CommitOutcome::Rejected(reason) => Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "reason": reason
            })),
        )),
    }
}

/// Cancel an event. The row survives with canceled status and its interval
/// becomes bookable again.
#[axum::debug_handler]
pub async fn cancel_event(
    State(state): State<Arc<SchedulingState>>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Cancel request for event {}", event_id);

    let event = state
        .booking
        .cancel(event_id)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "event": event
    })))
}

#[axum::debug_handler]
pub async fn update_event_status(
    State(state): State<Arc<SchedulingState>>,
    Path(event_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let event = state
        .booking
        .transition(event_id, request.status)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "event": event
    })))
}

// ==============================================================================
// CALENDAR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_calendar(
    State(state): State<Arc<SchedulingState>>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Value>, AppError> {
    let entries = state
        .calendar
        .project_range(query.from, query.to, query.professional_id)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "count": entries.len(),
        "entries": entries
    })))
}

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

fn map_scheduling_error(err: SchedulingError) -> AppError {
    match err {
        SchedulingError::UnknownProfessional(id) => {
            AppError::NotFound(format!("Professional {} not found", id))
        }
        SchedulingError::UnknownPatient(id) => {
            AppError::NotFound(format!("Patient {} not found", id))
        }
        SchedulingError::EventNotFound(id) => {
            AppError::NotFound(format!("Event {} not found", id))
        }
        SchedulingError::Validation(message) => AppError::ValidationError(message),
        SchedulingError::InvalidTransition { from, to } => {
            AppError::BadRequest(format!("Cannot transition a {} event to {}", from, to))
        }
        SchedulingError::Repository(RepositoryError::Unavailable(message)) => {
            AppError::ServiceUnavailable(message)
        }
        SchedulingError::Repository(RepositoryError::Malformed(message)) => {
            AppError::Database(message)
        }
        SchedulingError::Directory(message) => AppError::ExternalService(message),
    }
}
