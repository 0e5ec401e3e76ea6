//! API handlers

pub mod admin;
pub mod events;
pub mod passes;
pub mod payouts;
pub mod revenue;
pub mod scan;
pub mod topups;
pub mod vendors;
pub mod verification;
pub mod wallets;

use crate::state::AppState;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use ghostpass_ledger::LedgerError;

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

pub(crate) fn require_admin(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    match bearer_token(headers) {
        Some(token) if state.is_authorized_admin(token) => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "success": false,
                "error": "admin authorization required",
            })),
        )),
    }
}

/// Maps the ledger error taxonomy onto response statuses. Validation is
/// rejected before any persistence; a conflict has already exhausted its
/// internal retries and is surfaced as transient.
pub(crate) fn ledger_status(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::Validation(_) | LedgerError::Overflow => StatusCode::BAD_REQUEST,
        LedgerError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::Conflict(_) => StatusCode::CONFLICT,
        LedgerError::Provider(_) => StatusCode::BAD_GATEWAY,
        LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
