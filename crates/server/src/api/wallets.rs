//! Wallet API handlers

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

pub async fn register_wallet(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterWalletRequest>,
) -> Result<Json<RegisterWalletResponse>, (StatusCode, Json<RegisterWalletResponse>)> {
    if req.device_fingerprint.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(RegisterWalletResponse {
                success: false,
                wallet: None,
                created: false,
                error: Some("device_fingerprint is required".to_string()),
            }),
        ));
    }

    let (wallet, created) = queries::register_wallet(
        &state.db,
        &req.device_fingerprint,
        req.owning_user_id.as_deref(),
    )
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RegisterWalletResponse {
                success: false,
                wallet: None,
                created: false,
                error: Some(e.to_string()),
            }),
        )
    })?;

    if created {
        info!("Wallet registered: {}", wallet.binding_id);
        AuditLogger::log(
            &state,
            AuditEntry::new(AuditEventType::WalletCreated).entity("wallet", &wallet.binding_id),
        )
        .await;
    }

    Ok(Json(RegisterWalletResponse {
        success: true,
        wallet: Some(wallet),
        created,
        error: None,
    }))
}

pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path(binding_id): Path<String>,
) -> Result<Json<Wallet>, StatusCode> {
    let wallet = queries::get_wallet(&state.db, &binding_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(wallet))
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<i64>,
}

pub async fn get_wallet_transactions(
    State(state): State<Arc<AppState>>,
    Path(binding_id): Path<String>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<LedgerTransaction>>, StatusCode> {
    // The wallet must exist so an empty history is distinguishable from a
    // bad binding id.
    queries::get_wallet(&state.db, &binding_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let transactions = queries::get_wallet_transactions(&state.db, &binding_id, limit)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(transactions))
}

pub async fn deactivate_wallet(
    State(state): State<Arc<AppState>>,
    Path(binding_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    super::require_admin(&state, &headers)?;

    let deactivated = queries::deactivate_wallet(&state.db, &binding_id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "success": false, "error": e.to_string() })),
            )
        })?;

    if !deactivated {
        return Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "success": false, "error": "wallet not found" })),
        ));
    }

    AuditLogger::log(
        &state,
        AuditEntry::new(AuditEventType::WalletDeactivated).entity("wallet", &binding_id),
    )
    .await;

    Ok(Json(
        serde_json::json!({ "success": true, "binding_id": binding_id }),
    ))
}
