//! Application state

use crate::db::DbPool;
use crate::models::{AdminSession, WsEvent};
use crate::providers::{IdentityProvider, PaymentProvider};
use crate::websocket::events::EventBroadcaster;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Admin sessions live for one hour.
const ADMIN_SESSION_TTL_SECS: i64 = 3600;

pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub struct AppState {
    pub db: DbPool,
    pub sessions: DashMap<String, AdminSession>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub payments: Arc<dyn PaymentProvider>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Static admin credential; sessions are minted against it.
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(
        db: DbPool,
        payments: Arc<dyn PaymentProvider>,
        identity: Arc<dyn IdentityProvider>,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            db,
            sessions: DashMap::new(),
            broadcaster: Arc::new(EventBroadcaster::new(1000)),
            payments,
            identity,
            admin_token,
        }
    }

    pub async fn broadcast_event(&self, event: WsEvent) {
        self.broadcaster.broadcast(event);
    }

    pub fn is_admin_token(&self, token: &str) -> bool {
        self.admin_token
            .as_ref()
            .map(|t| t == token)
            .unwrap_or(false)
    }

    /// Mints a session token against the configured admin credential.
    pub fn create_admin_session(&self, label: &str) -> (String, i64) {
        let token = Uuid::new_v4().to_string();
        let expires_at = now() + ADMIN_SESSION_TTL_SECS;
        self.sessions.insert(
            token.clone(),
            AdminSession {
                label: label.to_string(),
                expires_at,
            },
        );
        (token, expires_at)
    }

    /// True when `token` is the static credential or an unexpired session.
    pub fn is_authorized_admin(&self, token: &str) -> bool {
        if self.is_admin_token(token) {
            return true;
        }
        match self.sessions.get(token) {
            Some(session) => session.expires_at > now(),
            None => false,
        }
    }
}
