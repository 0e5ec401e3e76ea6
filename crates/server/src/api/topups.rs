//! Wallet top-up handlers (payment provider)
//!
//! The checkout endpoint only creates a provider session; the wallet is
//! credited in the webhook path after the provider confirms, exactly once
//! per session id. Nothing is credited speculatively.

use crate::db::queries::{self, WalletMutation};
use crate::models::*;
use crate::observability::{AuditEntry, AuditEventType, AuditLogger};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use ghostpass_ledger::TransactionKind;
use std::sync::Arc;
use tracing::{info, warn};

const WEBHOOK_SIGNATURE_HEADER: &str = "x-webhook-signature";

pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TopUpCheckoutRequest>,
) -> Result<Json<TopUpCheckoutResponse>, (StatusCode, Json<TopUpCheckoutResponse>)> {
    let fail = |status: StatusCode, error: String| {
        (
            status,
            Json(TopUpCheckoutResponse {
                success: false,
                session_id: None,
                checkout_url: None,
                error: Some(error),
            }),
        )
    };

    if req.amount_cents <= 0 {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "amount_cents must be positive".to_string(),
        ));
    }

    let wallet = queries::get_wallet(&state.db, &req.wallet_binding_id)
        .await
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "wallet not found".to_string()))?;
    if !wallet.is_active {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "wallet is deactivated".to_string(),
        ));
    }

    let session = state
        .payments
        .create_checkout_session(&req.wallet_binding_id, req.amount_cents)
        .await
        .map_err(|e| fail(StatusCode::BAD_GATEWAY, e.to_string()))?;

    info!(
        "Checkout session {} created for wallet {} ({} cents)",
        session.session_id, req.wallet_binding_id, req.amount_cents
    );

    Ok(Json(TopUpCheckoutResponse {
        success: true,
        session_id: Some(session.session_id),
        checkout_url: Some(session.checkout_url),
        error: None,
    }))
}

/// Payment-provider confirmation callback.
///
/// The body is taken raw so the signature covers the exact bytes the
/// provider signed. Re-delivery of a session id already in the ledger is
/// acknowledged without a second credit.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !state.payments.verify_webhook(body.as_bytes(), signature) {
        warn!("Rejected payment webhook with bad signature");
        AuditLogger::log(
            &state,
            AuditEntry::new(AuditEventType::WebhookRejected)
                .failed("signature verification failed"),
        )
        .await;
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "received": false, "error": "invalid signature" })),
        ));
    }

    let event: PaymentWebhookEvent = serde_json::from_str(&body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "received": false, "error": e.to_string() })),
        )
    })?;

    if event.event_type != "checkout.session.completed" {
        // Other lifecycle events are acknowledged and dropped.
        return Ok(Json(
            serde_json::json!({ "received": true, "ignored": event.event_type }),
        ));
    }

    if event.amount_total <= 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "received": false, "error": "amount_total must be positive" })),
        ));
    }

    let mutation = WalletMutation {
        wallet_binding_id: &event.metadata.wallet_binding_id,
        delta_cents: event.amount_total,
        kind: TransactionKind::Credit,
        external_ref: Some(&event.session_id),
        metadata: Some(serde_json::json!({
            "source": "payment_webhook",
            "session_id": event.session_id,
        })),
    };

    let outcome = queries::apply_wallet_mutation(&state.db, &mutation)
        .await
        .map_err(|e| {
            (
                super::ledger_status(&e),
                Json(serde_json::json!({ "received": false, "error": e.to_string() })),
            )
        })?;

    if outcome.duplicate {
        info!(
            "Duplicate payment confirmation for session {}, no credit applied",
            event.session_id
        );
    } else {
        AuditLogger::ledger(
            &state,
            AuditEventType::WalletCredited,
            &event.metadata.wallet_binding_id,
            event.amount_total,
            &outcome.transaction_id.to_string(),
        )
        .await;
        state
            .broadcast_event(WsEvent::WalletCredited(WalletCreditedEvent {
                wallet_binding_id: event.metadata.wallet_binding_id.clone(),
                amount_cents: event.amount_total,
                new_balance_cents: outcome.new_balance_cents,
            }))
            .await;
    }

    Ok(Json(serde_json::json!({
        "received": true,
        "duplicate": outcome.duplicate,
        "new_balance_cents": outcome.new_balance_cents,
    })))
}
