//! Admin session handlers

use crate::models::*;
use crate::observability::{AuditEntry, AuditEventType, AuditLogger};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{info, warn};

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<Json<AdminLoginResponse>, (StatusCode, Json<AdminLoginResponse>)> {
    if !state.is_admin_token(&req.token) {
        warn!("Rejected admin login");
        AuditLogger::log(
            &state,
            AuditEntry::new(AuditEventType::UnauthorizedAccess).failed("bad admin token"),
        )
        .await;
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(AdminLoginResponse {
                success: false,
                session: None,
                expires_at: None,
                error: Some("invalid admin token".to_string()),
            }),
        ));
    }

    let label = req.label.as_deref().unwrap_or("admin");
    let (session, expires_at) = state.create_admin_session(label);
    info!("Admin session created for {}", label);

    Ok(Json(AdminLoginResponse {
        success: true,
        session: Some(session),
        expires_at: Some(expires_at),
        error: None,
    }))
}
