//! Ghost Pass purchase and lifecycle handlers

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

pub async fn purchase_pass(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PurchasePassRequest>,
) -> Result<Json<PurchasePassResponse>, (StatusCode, Json<PurchasePassResponse>)> {
    let fail = |status: StatusCode, error: String| {
        (
            status,
            Json(PurchasePassResponse {
                success: false,
                pass: None,
                new_balance_cents: None,
                transaction_id: None,
                duplicate: false,
                error: Some(error),
            }),
        )
    };

    let event_id = Uuid::parse_str(&req.event_id)
        .map_err(|_| fail(StatusCode::BAD_REQUEST, "malformed event_id".to_string()))?;

    let outcome = queries::purchase_pass(
        &state.db,
        &req.wallet_binding_id,
        event_id,
        req.allows_reentry,
        req.idempotency_key.as_deref(),
    )
    .await
    .map_err(|e| fail(super::ledger_status(&e), e.to_string()))?;

    if !outcome.duplicate {
        info!(
            "Pass {} purchased for event {} by wallet {}",
            outcome.pass.id, req.event_id, req.wallet_binding_id
        );
        AuditLogger::log(
            &state,
            AuditEntry::new(AuditEventType::PassPurchased)
                .entity("pass", &outcome.pass.id)
                .with_payload(serde_json::json!({
                    "event_id": req.event_id,
                    "wallet_binding_id": req.wallet_binding_id,
                    "transaction_id": outcome.transaction_id.to_string(),
                })),
        )
        .await;
        state
            .broadcast_event(WsEvent::PassPurchased(PassPurchasedEvent {
                pass_id: outcome.pass.id.clone(),
                event_id: req.event_id.clone(),
                wallet_binding_id: req.wallet_binding_id.clone(),
                price_cents: outcome.price_cents,
            }))
            .await;
    }

    Ok(Json(PurchasePassResponse {
        success: true,
        new_balance_cents: Some(outcome.new_balance_cents),
        transaction_id: Some(outcome.transaction_id.to_string()),
        duplicate: outcome.duplicate,
        pass: Some(outcome.pass),
        error: None,
    }))
}

pub async fn get_pass(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GhostPass>, StatusCode> {
    let id = Uuid::parse_str(&id).map_err(|_| StatusCode::NOT_FOUND)?;
    let pass = queries::get_pass(&state.db, id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(pass))
}

#[derive(Debug, Deserialize)]
pub struct ListPassesQuery {
    pub limit: Option<i64>,
}

pub async fn list_event_passes(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    Query(query): Query<ListPassesQuery>,
) -> Result<Json<Vec<GhostPass>>, StatusCode> {
    let event_id = Uuid::parse_str(&event_id).map_err(|_| StatusCode::NOT_FOUND)?;
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let passes = queries::list_event_passes(&state.db, event_id, limit)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(passes))
}

pub async fn revoke_pass(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    super::require_admin(&state, &headers)?;

    let id = Uuid::parse_str(&id).map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "success": false, "error": "pass not found" })),
        )
    })?;

    let revoked = queries::revoke_pass(&state.db, id).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "success": false, "error": e.to_string() })),
        )
    })?;

    let Some(pass) = revoked else {
        // Either absent or already terminal; the distinction matters to an
        // operator, so report which.
        let existing = queries::get_pass(&state.db, id).await.ok().flatten();
        let (status, error) = match existing {
            Some(pass) => (
                StatusCode::CONFLICT,
                format!("pass is already {}", pass.status.as_str()),
            ),
            None => (StatusCode::NOT_FOUND, "pass not found".to_string()),
        };
        return Err((
            status,
            Json(serde_json::json!({ "success": false, "error": error })),
        ));
    };

    AuditLogger::log(
        &state,
        AuditEntry::new(AuditEventType::PassRevoked).entity("pass", &pass.id),
    )
    .await;

    Ok(Json(serde_json::json!({ "success": true, "pass": pass })))
}
