//! Identity verification handlers
//!
//! The verification provider owns the session lifecycle; this server only
//! stores `{id, status, requires_manual_review}` on the wallet.

use crate::db::queries;
use crate::models::*;
use crate::observability::{AuditEntry, AuditEventType, AuditLogger};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

fn fail(status: StatusCode, error: String) -> (StatusCode, Json<VerificationResponse>) {
    (
        status,
        Json(VerificationResponse {
            success: false,
            verification_id: None,
            status: None,
            requires_manual_review: None,
            error: Some(error),
        }),
    )
}

pub async fn start_verification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerificationStartRequest>,
) -> Result<Json<VerificationResponse>, (StatusCode, Json<VerificationResponse>)> {
    let wallet = queries::get_wallet(&state.db, &req.wallet_binding_id)
        .await
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "wallet not found".to_string()))?;

    let session = state
        .identity
        .start_session(&wallet.binding_id)
        .await
        .map_err(|e| fail(StatusCode::BAD_GATEWAY, e.to_string()))?;

    queries::set_wallet_verification(&state.db, &wallet.binding_id, &session.id, &session.status)
        .await
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    info!(
        "Verification session {} started for wallet {}",
        session.id, wallet.binding_id
    );
    AuditLogger::log(
        &state,
        AuditEntry::new(AuditEventType::VerificationStarted)
            .entity("wallet", &wallet.binding_id)
            .with_payload(serde_json::json!({ "verification_id": session.id })),
    )
    .await;

    Ok(Json(VerificationResponse {
        success: true,
        verification_id: Some(session.id),
        status: Some(session.status),
        requires_manual_review: Some(session.requires_manual_review),
        error: None,
    }))
}

pub async fn complete_verification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerificationStartRequest>,
) -> Result<Json<VerificationResponse>, (StatusCode, Json<VerificationResponse>)> {
    let wallet = queries::get_wallet(&state.db, &req.wallet_binding_id)
        .await
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "wallet not found".to_string()))?;

    let Some(verification_id) = wallet.verification_id else {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "wallet has no verification session".to_string(),
        ));
    };

    let session = state
        .identity
        .fetch_session(&verification_id)
        .await
        .map_err(|e| fail(StatusCode::BAD_GATEWAY, e.to_string()))?;

    queries::set_wallet_verification(&state.db, &wallet.binding_id, &session.id, &session.status)
        .await
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    AuditLogger::log(
        &state,
        AuditEntry::new(AuditEventType::VerificationUpdated)
            .entity("wallet", &wallet.binding_id)
            .with_payload(serde_json::json!({
                "verification_id": session.id,
                "status": session.status,
            })),
    )
    .await;

    Ok(Json(VerificationResponse {
        success: true,
        verification_id: Some(session.id),
        status: Some(session.status),
        requires_manual_review: Some(session.requires_manual_review),
        error: None,
    }))
}
