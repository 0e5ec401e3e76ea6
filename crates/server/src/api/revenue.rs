//! Revenue profile administration and fee reporting

use crate::db::queries;
use crate::models::*;
use crate::observability::{AuditEntry, AuditEventType, AuditLogger};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

fn fail(status: StatusCode, error: String) -> (StatusCode, Json<ProfileResponse>) {
    (
        status,
        Json(ProfileResponse {
            success: false,
            profile: None,
            error: Some(error),
        }),
    )
}

pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<UpsertProfileRequest>,
) -> Result<Json<ProfileResponse>, (StatusCode, Json<ProfileResponse>)> {
    super::require_admin(&state, &headers).map_err(|(status, _)| {
        fail(status, "admin authorization required".to_string())
    })?;

    if req.name.trim().is_empty() {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "name is required".to_string(),
        ));
    }
    let shares = req.shares();
    shares
        .validate()
        .map_err(|e| fail(StatusCode::BAD_REQUEST, e.to_string()))?;

    let profile = queries::create_profile(&state.db, &req.name, &shares, Some("admin"))
        .await
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    info!("Revenue profile created: {} ({})", profile.name, profile.id);
    AuditLogger::log(
        &state,
        AuditEntry::new(AuditEventType::ProfileCreated)
            .entity("revenue_profile", &profile.id)
            .with_payload(serde_json::to_value(&profile).unwrap_or_default()),
    )
    .await;

    Ok(Json(ProfileResponse {
        success: true,
        profile: Some(profile),
        error: None,
    }))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpsertProfileRequest>,
) -> Result<Json<ProfileResponse>, (StatusCode, Json<ProfileResponse>)> {
    super::require_admin(&state, &headers).map_err(|(status, _)| {
        fail(status, "admin authorization required".to_string())
    })?;

    let id = Uuid::parse_str(&id)
        .map_err(|_| fail(StatusCode::NOT_FOUND, "profile not found".to_string()))?;

    let shares = req.shares();
    shares
        .validate()
        .map_err(|e| fail(StatusCode::BAD_REQUEST, e.to_string()))?;

    // Audited in place: the old shares go into the trail alongside the new
    // ones, and historical transactions keep their snapshotted amounts.
    let previous = queries::get_profile(&state.db, id)
        .await
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "profile not found".to_string()))?;

    let updated = queries::update_profile(&state.db, id, &shares, Some("admin"))
        .await
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "profile not found".to_string()))?;

    AuditLogger::log(
        &state,
        AuditEntry::new(AuditEventType::ProfileUpdated)
            .entity("revenue_profile", &updated.id)
            .with_payload(serde_json::json!({
                "previous": previous,
                "updated": updated,
            })),
    )
    .await;
    state
        .broadcast_event(WsEvent::ProfileUpdated(ProfileUpdatedEvent {
            profile_id: updated.id.clone(),
            name: updated.name.clone(),
        }))
        .await;

    Ok(Json(ProfileResponse {
        success: true,
        profile: Some(updated),
        error: None,
    }))
}

pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RevenueProfile>>, StatusCode> {
    let profiles = queries::list_profiles(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(profiles))
}

#[derive(Debug, Deserialize)]
pub struct FeeBreakdownQuery {
    pub event_id: Option<String>,
}

pub async fn fee_breakdown(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeeBreakdownQuery>,
    headers: HeaderMap,
) -> Result<Json<FeeBreakdown>, (StatusCode, Json<serde_json::Value>)> {
    super::require_admin(&state, &headers)?;

    let event_id = match query.event_id.as_deref() {
        Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "success": false, "error": "malformed event_id" })),
            )
        })?),
        None => None,
    };

    let breakdown = queries::fee_breakdown(&state.db, event_id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "success": false, "error": e.to_string() })),
            )
        })?;
    Ok(Json(breakdown))
}
