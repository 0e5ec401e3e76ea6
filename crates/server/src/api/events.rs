//! Event administration handlers

use crate::db::queries;
use crate::models::*;
use crate::observability::{AuditEntry, AuditEventType, AuditLogger};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::DateTime;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

fn fail(status: StatusCode, error: String) -> (StatusCode, Json<EventResponse>) {
    (
        status,
        Json(EventResponse {
            success: false,
            event: None,
            error: Some(error),
        }),
    )
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateEventRequest>,
) -> Result<Json<EventResponse>, (StatusCode, Json<EventResponse>)> {
    super::require_admin(&state, &headers).map_err(|(status, _)| {
        fail(status, "admin authorization required".to_string())
    })?;

    if req.venue_id.trim().is_empty() || req.name.trim().is_empty() {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "venue_id and name are required".to_string(),
        ));
    }
    if req.ticket_price_cents < 0 {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "ticket_price_cents must be non-negative".to_string(),
        ));
    }
    if req.ends_at <= req.starts_at {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "ends_at must be after starts_at".to_string(),
        ));
    }

    let profile_id = Uuid::parse_str(&req.revenue_profile_id).map_err(|_| {
        fail(
            StatusCode::BAD_REQUEST,
            "malformed revenue_profile_id".to_string(),
        )
    })?;
    queries::get_profile(&state.db, profile_id)
        .await
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "revenue profile not found".to_string()))?;

    let starts_at = DateTime::from_timestamp(req.starts_at, 0)
        .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "starts_at out of range".to_string()))?;
    let ends_at = DateTime::from_timestamp(req.ends_at, 0)
        .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "ends_at out of range".to_string()))?;

    let event = queries::create_event(
        &state.db,
        &req.venue_id,
        &req.name,
        req.ticket_price_cents,
        profile_id,
        starts_at,
        ends_at,
    )
    .await
    .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    info!("Event created: {} at venue {}", event.id, event.venue_id);
    AuditLogger::log(
        &state,
        AuditEntry::new(AuditEventType::EventCreated)
            .entity("event", &event.id)
            .with_payload(serde_json::to_value(&event).unwrap_or_default()),
    )
    .await;

    Ok(Json(EventResponse {
        success: true,
        event: Some(event),
        error: None,
    }))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EventRecord>, StatusCode> {
    let id = Uuid::parse_str(&id).map_err(|_| StatusCode::NOT_FOUND)?;
    let event = queries::get_event(&state.db, id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(event))
}

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub limit: Option<i64>,
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Vec<EventRecord>>, StatusCode> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let events = queries::list_events(&state.db, limit)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(events))
}

#[derive(Debug, Deserialize)]
pub struct SetEventStatusRequest {
    pub status: EventStatus,
}

pub async fn set_event_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SetEventStatusRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    super::require_admin(&state, &headers)?;

    let id = Uuid::parse_str(&id).map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "success": false, "error": "event not found" })),
        )
    })?;

    let updated = queries::set_event_status(&state.db, id, req.status)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "success": false, "error": e.to_string() })),
            )
        })?;
    if !updated {
        return Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "success": false, "error": "event not found" })),
        ));
    }

    AuditLogger::log(
        &state,
        AuditEntry::new(AuditEventType::EventStatusChanged)
            .entity("event", &id.to_string())
            .with_payload(serde_json::json!({ "status": req.status })),
    )
    .await;

    Ok(Json(
        serde_json::json!({ "success": true, "status": req.status }),
    ))
}
