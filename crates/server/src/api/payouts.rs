//! Vendor payout handlers
//!
//! Payout status is a one-way progression: pending → approved | rejected,
//! approved → processed. The guards live in the queries; a request that
//! arrives after the status moved gets a conflict, never a second
//! transition.

use crate::db::queries;
use crate::models::*;
use crate::observability::{AuditEventType, AuditLogger};
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

fn fail(status: StatusCode, error: String) -> (StatusCode, Json<PayoutResponse>) {
    (
        status,
        Json(PayoutResponse {
            success: false,
            payout: None,
            error: Some(error),
        }),
    )
}

pub async fn create_payout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePayoutRequest>,
) -> Result<Json<PayoutResponse>, (StatusCode, Json<PayoutResponse>)> {
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

    let payout = queries::create_payout(&state.db, &req.vendor_id, req.amount_cents)
        .await
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    info!(
        "Payout {} requested by vendor {} ({} cents)",
        payout.id, payout.vendor_id, payout.amount_cents
    );
    AuditLogger::payout(&state, AuditEventType::PayoutRequested, &payout.id, &req.vendor_id).await;
    state
        .broadcast_event(WsEvent::PayoutUpdated(PayoutUpdatedEvent {
            payout_id: payout.id.clone(),
            vendor_id: payout.vendor_id.clone(),
            status: payout.status,
        }))
        .await;

    Ok(Json(PayoutResponse {
        success: true,
        payout: Some(payout),
        error: None,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListPayoutsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_payouts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListPayoutsQuery>,
) -> Result<Json<Vec<PayoutRequest>>, StatusCode> {
    let status = query.status.as_deref().map(PayoutStatus::from);
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let payouts = queries::list_payouts(&state.db, status, limit)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(payouts))
}

pub async fn review_payout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ReviewPayoutRequest>,
) -> Result<Json<PayoutResponse>, (StatusCode, Json<PayoutResponse>)> {
    super::require_admin(&state, &headers).map_err(|(status, _)| {
        fail(status, "admin authorization required".to_string())
    })?;

    let id = Uuid::parse_str(&id)
        .map_err(|_| fail(StatusCode::NOT_FOUND, "payout not found".to_string()))?;

    let reviewed = queries::review_payout(&state.db, id, req.approve, "admin")
        .await
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let Some(payout) = reviewed else {
        let existing = queries::get_payout(&state.db, id).await.ok().flatten();
        return Err(match existing {
            Some(payout) => fail(
                StatusCode::CONFLICT,
                format!("payout is {}, not pending", payout.status.as_str()),
            ),
            None => fail(StatusCode::NOT_FOUND, "payout not found".to_string()),
        });
    };

    let event = if req.approve {
        AuditEventType::PayoutApproved
    } else {
        AuditEventType::PayoutRejected
    };
    AuditLogger::payout(&state, event, &payout.id, "admin").await;
    state
        .broadcast_event(WsEvent::PayoutUpdated(PayoutUpdatedEvent {
            payout_id: payout.id.clone(),
            vendor_id: payout.vendor_id.clone(),
            status: payout.status,
        }))
        .await;

    Ok(Json(PayoutResponse {
        success: true,
        payout: Some(payout),
        error: None,
    }))
}

pub async fn process_payout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<PayoutResponse>, (StatusCode, Json<PayoutResponse>)> {
    super::require_admin(&state, &headers).map_err(|(status, _)| {
        fail(status, "admin authorization required".to_string())
    })?;

    let id = Uuid::parse_str(&id)
        .map_err(|_| fail(StatusCode::NOT_FOUND, "payout not found".to_string()))?;

    let processed = queries::process_payout(&state.db, id, "admin")
        .await
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let Some(payout) = processed else {
        let existing = queries::get_payout(&state.db, id).await.ok().flatten();
        return Err(match existing {
            Some(payout) => fail(
                StatusCode::CONFLICT,
                format!("payout is {}, not approved", payout.status.as_str()),
            ),
            None => fail(StatusCode::NOT_FOUND, "payout not found".to_string()),
        });
    };

    AuditLogger::payout(&state, AuditEventType::PayoutProcessed, &payout.id, "admin").await;
    state
        .broadcast_event(WsEvent::PayoutUpdated(PayoutUpdatedEvent {
            payout_id: payout.id.clone(),
            vendor_id: payout.vendor_id.clone(),
            status: payout.status,
        }))
        .await;

    Ok(Json(PayoutResponse {
        success: true,
        payout: Some(payout),
        error: None,
    }))
}
