//! WebSocket event types and broadcasting

use crate::models::WsEvent;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

pub type EventSender = broadcast::Sender<WsEvent>;
pub type EventReceiver = broadcast::Receiver<WsEvent>;

#[derive(Clone)]
pub struct WsConnection {
    pub id: Uuid,
    /// Who is watching: venue dashboard, gateway, admin console.
    pub role: Option<String>,
}

pub struct EventBroadcaster {
    sender: EventSender,
    connections: Arc<RwLock<HashMap<Uuid, WsConnection>>>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn broadcast(&self, event: WsEvent) {
        let _ = self.sender.send(event);
    }

    pub fn add_connection(&self, conn: WsConnection) {
        self.connections.write().insert(conn.id, conn);
    }

    pub fn remove_connection(&self, id: &Uuid) {
        self.connections.write().remove(id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PayoutStatus, PayoutUpdatedEvent};

    #[tokio::test]
    async fn subscribers_receive_broadcasts() {
        let broadcaster = EventBroadcaster::new(16);
        let mut rx = broadcaster.subscribe();

        broadcaster.broadcast(WsEvent::PayoutUpdated(PayoutUpdatedEvent {
            payout_id: "p1".to_string(),
            vendor_id: "v1".to_string(),
            status: PayoutStatus::Approved,
        }));

        match rx.recv().await.unwrap() {
            WsEvent::PayoutUpdated(event) => {
                assert_eq!(event.payout_id, "p1");
                assert_eq!(event.status, PayoutStatus::Approved);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn connections_are_tracked() {
        let broadcaster = EventBroadcaster::new(16);
        let id = Uuid::new_v4();
        broadcaster.add_connection(WsConnection {
            id,
            role: Some("dashboard".to_string()),
        });
        assert_eq!(broadcaster.connection_count(), 1);
        broadcaster.remove_connection(&id);
        assert_eq!(broadcaster.connection_count(), 0);
    }
}
