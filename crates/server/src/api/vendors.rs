//! Vendor concession payment handlers

use crate::db::queries;
use crate::models::*;
use crate::observability::{AuditEventType, AuditLogger};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub async fn vendor_spend(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VendorSpendRequest>,
) -> Result<Json<VendorSpendResponse>, (StatusCode, Json<VendorSpendResponse>)> {
    let fail = |status: StatusCode, error: String| {
        (
            status,
            Json(VendorSpendResponse {
                success: false,
                new_balance_cents: None,
                transaction_id: None,
                duplicate: false,
                error: Some(error),
            }),
        )
    };

    if req.vendor_id.trim().is_empty() {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "vendor_id is required".to_string(),
        ));
    }
    if req.amount_cents <= 0 {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "amount_cents must be positive".to_string(),
        ));
    }
    let event_id = Uuid::parse_str(&req.event_id)
        .map_err(|_| fail(StatusCode::BAD_REQUEST, "malformed event_id".to_string()))?;

    let outcome = queries::vendor_spend(
        &state.db,
        &req.wallet_binding_id,
        &req.vendor_id,
        event_id,
        req.amount_cents,
        req.terminal_ref.as_deref(),
    )
    .await
    .map_err(|e| fail(super::ledger_status(&e), e.to_string()))?;

    if !outcome.duplicate {
        info!(
            "Vendor spend: {} cents from wallet {} to vendor {}",
            req.amount_cents, req.wallet_binding_id, req.vendor_id
        );
        AuditLogger::ledger(
            &state,
            AuditEventType::WalletDebited,
            &req.wallet_binding_id,
            req.amount_cents,
            &outcome.transaction_id.to_string(),
        )
        .await;
    }

    Ok(Json(VendorSpendResponse {
        success: true,
        new_balance_cents: Some(outcome.new_balance_cents),
        transaction_id: Some(outcome.transaction_id.to_string()),
        duplicate: outcome.duplicate,
        error: None,
    }))
}
