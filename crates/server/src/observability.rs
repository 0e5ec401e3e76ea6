//! Observability - Sentry Integration and Audit Trail
//!
//! Provides:
//! - Sentry error tracking (enabled via SENTRY_DSN env var)
//! - Structured audit logging for every money movement and admin action

use crate::db::queries;
use crate::state::AppState;
use serde::{Deserialize, Serialize};
use tracing::{error, info, span, warn, Level};

/// Initialize Sentry if SENTRY_DSN is set
pub fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok()?;

    if dsn.is_empty() {
        info!("Sentry DSN is empty, error tracking disabled");
        return None;
    }

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: std::env::var("ENVIRONMENT").ok().map(|s| s.into()),
            traces_sample_rate: 0.1,
            ..Default::default()
        },
    ));

    info!("Sentry initialized for error tracking");
    Some(guard)
}

/// Audit event types for the data-access trail
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Wallets
    WalletCreated,
    WalletDeactivated,
    WalletCredited,
    WalletDebited,

    // Passes
    PassPurchased,
    PassRevoked,
    EntryGranted,
    EntryDenied,

    // Payouts
    PayoutRequested,
    PayoutApproved,
    PayoutRejected,
    PayoutProcessed,

    // Configuration
    ProfileCreated,
    ProfileUpdated,
    EventCreated,
    EventStatusChanged,

    // Identity verification
    VerificationStarted,
    VerificationUpdated,

    // Security
    WebhookRejected,
    UnauthorizedAccess,
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_string(self).unwrap_or_else(|_| "unknown".to_string());
        write!(f, "{}", s.trim_matches('"'))
    }
}

/// Structured audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub event_type: AuditEventType,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub actor: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub success: bool,
    pub error_message: Option<String>,
}

impl AuditEntry {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_type,
            entity_type: None,
            entity_id: None,
            actor: None,
            payload: None,
            success: true,
            error_message: None,
        }
    }

    pub fn entity(mut self, entity_type: &str, entity_id: &str) -> Self {
        self.entity_type = Some(entity_type.to_string());
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn failed(mut self, error: &str) -> Self {
        self.success = false;
        self.error_message = Some(error.to_string());
        self
    }
}

/// Audit logger for structured logging and persistence
pub struct AuditLogger;

impl AuditLogger {
    /// Log an audit event to both tracing and the database
    pub async fn log(state: &AppState, entry: AuditEntry) {
        let span = span!(
            Level::INFO,
            "audit",
            event_type = %entry.event_type,
            entity_type = ?entry.entity_type,
            entity_id = ?entry.entity_id,
            actor = ?entry.actor,
            success = entry.success,
        );
        let _guard = span.enter();

        if entry.success {
            info!(
                event = %entry.event_type,
                entity = ?entry.entity_id,
                actor = ?entry.actor,
                "Audit event"
            );
        } else {
            warn!(
                event = %entry.event_type,
                entity = ?entry.entity_id,
                actor = ?entry.actor,
                error = ?entry.error_message,
                "Audit event failed"
            );

            if let Some(ref msg) = entry.error_message {
                sentry::capture_message(
                    &format!("{}: {}", entry.event_type, msg),
                    sentry::Level::Warning,
                );
            }
        }

        if let Err(e) = queries::log_audit(
            &state.db,
            &entry.event_type.to_string(),
            entry.entity_type.as_deref(),
            entry.entity_id.as_deref(),
            entry.payload.as_ref(),
            entry.actor.as_deref(),
        )
        .await
        {
            error!(error = %e, "Failed to persist audit event");
        }
    }

    /// Log a ledger movement
    pub async fn ledger(
        state: &AppState,
        event: AuditEventType,
        wallet_binding_id: &str,
        amount_cents: i64,
        transaction_id: &str,
    ) {
        let entry = AuditEntry::new(event)
            .entity("wallet", wallet_binding_id)
            .with_payload(serde_json::json!({
                "amount_cents": amount_cents,
                "transaction_id": transaction_id,
            }));
        Self::log(state, entry).await;
    }

    /// Log a scan outcome
    pub async fn scan(
        state: &AppState,
        pass_id: &str,
        gateway_id: &str,
        allowed: bool,
        reason: Option<&str>,
    ) {
        let event = if allowed {
            AuditEventType::EntryGranted
        } else {
            AuditEventType::EntryDenied
        };
        let entry = AuditEntry::new(event)
            .entity("pass", pass_id)
            .actor(gateway_id)
            .with_payload(serde_json::json!({
                "gateway_id": gateway_id,
                "reason": reason,
            }));
        Self::log(state, entry).await;
    }

    /// Log a payout lifecycle change
    pub async fn payout(state: &AppState, event: AuditEventType, payout_id: &str, actor: &str) {
        let entry = AuditEntry::new(event).entity("payout", payout_id).actor(actor);
        Self::log(state, entry).await;
    }
}
