//! Gateway scan handler
//!
//! Admission outcomes always come back with HTTP 200 so a gate can tell a
//! denial apart from a transport failure. The grant itself (the entry_count
//! increment) is a single guarded update; when two gateways race on a
//! non-reentry pass, exactly one scan wins and the loser re-reads the pass
//! to name the denial.

use crate::db::queries;
use crate::models::*;
use crate::observability::AuditLogger;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use ghostpass_ledger::{check_admission, AdmissionDecision, DenialReason, EventView, PassView};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

fn pass_view(pass: &GhostPass) -> PassView {
    PassView {
        status: pass.status,
        event_id: pass.event_id.clone(),
        valid_from: pass.valid_from,
        valid_until: pass.valid_until,
        entry_count: pass.entry_count,
        allows_reentry: pass.allows_reentry,
    }
}

fn event_view(event: &EventRecord) -> EventView {
    EventView {
        id: event.id.clone(),
        venue_id: event.venue_id.clone(),
        is_active: event.status == EventStatus::Active,
    }
}

pub async fn scan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, StatusCode> {
    let now = Utc::now();

    let Ok(pass_id) = Uuid::parse_str(&req.pass_id) else {
        return deny(&state, None, &req, DenialReason::PassNotFound).await;
    };

    let loaded = queries::load_pass_and_event(&state.db, pass_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let Some((pass, event)) = loaded else {
        return deny(&state, Some(pass_id), &req, DenialReason::PassNotFound).await;
    };

    let decision = check_admission(
        &pass_view(&pass),
        &event_view(&event),
        &req.venue_id,
        now.timestamp(),
    );
    if let AdmissionDecision::Denied(reason) = decision {
        return deny(&state, Some(pass_id), &req, reason).await;
    }

    match queries::grant_entry(&state.db, pass_id, &req.gateway_id, now)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    {
        Some(entry_count) => {
            queries::insert_entry_log(&state.db, Some(pass_id), &req.gateway_id, true, None)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

            info!(
                "Entry granted: pass {} at gateway {} (entry #{})",
                req.pass_id, req.gateway_id, entry_count
            );
            AuditLogger::scan(&state, &req.pass_id, &req.gateway_id, true, None).await;
            state
                .broadcast_event(WsEvent::EntryScanned(EntryScannedEvent {
                    pass_id: req.pass_id.clone(),
                    gateway_id: req.gateway_id.clone(),
                    allowed: true,
                    reason: None,
                }))
                .await;

            Ok(Json(ScanResponse {
                allowed: true,
                reason: None,
                entry_count: Some(entry_count),
            }))
        }
        None => {
            // The guard lost a race with another scan or an admin action.
            // Re-read and name the precise reason.
            let reason = match queries::get_pass(&state.db, pass_id)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            {
                Some(current) => check_admission(
                    &pass_view(&current),
                    &event_view(&event),
                    &req.venue_id,
                    now.timestamp(),
                )
                .denial()
                .unwrap_or(DenialReason::AlreadyConsumed),
                None => DenialReason::PassNotFound,
            };
            deny(&state, Some(pass_id), &req, reason).await
        }
    }
}

async fn deny(
    state: &Arc<AppState>,
    pass_id: Option<Uuid>,
    req: &ScanRequest,
    reason: DenialReason,
) -> Result<Json<ScanResponse>, StatusCode> {
    queries::insert_entry_log(&state.db, pass_id, &req.gateway_id, false, Some(reason.as_str()))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    info!(
        "Entry denied: pass {} at gateway {} ({})",
        req.pass_id, req.gateway_id, reason
    );
    AuditLogger::scan(state, &req.pass_id, &req.gateway_id, false, Some(reason.as_str())).await;
    state
        .broadcast_event(WsEvent::EntryScanned(EntryScannedEvent {
            pass_id: req.pass_id.clone(),
            gateway_id: req.gateway_id.clone(),
            allowed: false,
            reason: Some(reason.as_str().to_string()),
        }))
        .await;

    Ok(Json(ScanResponse {
        allowed: false,
        reason: Some(reason),
        entry_count: None,
    }))
}
