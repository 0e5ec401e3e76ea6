//! WebSocket connection handler
//!
//! The dashboard front end subscribes here instead of polling; every ledger
//! credit, pass purchase, scan outcome, and payout change is pushed as it
//! commits.

use crate::state::AppState;
use crate::websocket::events::WsConnection;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Role label for diagnostics (dashboard, gateway, admin).
    pub role: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
) -> Response {
    let conn_id = Uuid::new_v4();
    ws.on_upgrade(move |socket| handle_socket(socket, state, conn_id, query))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, conn_id: Uuid, query: WsQuery) {
    let (mut sender, mut receiver) = socket.split();

    state.broadcaster.add_connection(WsConnection {
        id: conn_id,
        role: query.role.clone(),
    });
    info!("WebSocket connected: {} (role: {:?})", conn_id, query.role);

    let mut event_rx = state.broadcaster.subscribe();

    let send_task = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    let msg = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            error!("Failed to serialize event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("WebSocket {} lagged, skipped {} events", conn_id, n);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Inbound messages are only connection keepalive; the stream is one-way.
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => {
                debug!("WebSocket {} closed by client", conn_id);
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(other) => {
                debug!("WebSocket {} ignoring message: {:?}", conn_id, other);
            }
            Err(e) => {
                debug!("WebSocket {} receive error: {}", conn_id, e);
                break;
            }
        }
    }

    send_task.abort();
    state.broadcaster.remove_connection(&conn_id);
    info!("WebSocket disconnected: {}", conn_id);
}
