//! Shared realtime state and domain notifications
//!
//! HTTP handlers call the `notify_*` methods after a successful write so
//! everyone watching the ticket sees the change without polling.

use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use helpdesk_shared::{ReplyWithAuthor, TicketStatus};

use super::events::ServerEvent;
use super::room::RoomManager;

/// Global WebSocket state shared across all connections
#[derive(Clone)]
pub struct WebSocketState {
    pub rooms: Arc<RoomManager>,
}

impl WebSocketState {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RoomManager::new()),
        }
    }

    /// Fan a new reply out to the ticket's room
    pub async fn notify_new_reply(&self, ticket_id: Uuid, reply: ReplyWithAuthor) {
        self.rooms
            .broadcast(&ticket_id, ServerEvent::NewReply(reply))
            .await;
    }

    /// Fan a status transition out to the ticket's room
    pub async fn notify_status_change(&self, ticket_id: Uuid, status: TicketStatus) {
        self.rooms
            .broadcast(
                &ticket_id,
                ServerEvent::StatusChanged {
                    id: ticket_id,
                    status,
                },
            )
            .await;
    }

    /// Tell a room's other occupants that someone joined
    pub async fn notify_user_joined(&self, ticket_id: Uuid, joiner_session: &Uuid, name: &str) {
        self.rooms
            .broadcast_except(
                &ticket_id,
                ServerEvent::UserJoined {
                    message: format!("{name} joined the conversation"),
                    timestamp: OffsetDateTime::now_utc(),
                },
                joiner_session,
            )
            .await;
    }
}

impl Default for WebSocketState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::Connection;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_notifications_reach_the_room() {
        let ws = WebSocketState::new();
        let ticket_id = Uuid::new_v4();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = Arc::new(Connection::new(Uuid::new_v4(), tx));
        ws.rooms.join(ticket_id, conn).await;

        ws.notify_status_change(ticket_id, TicketStatus::Closed).await;

        match rx.try_recv().unwrap() {
            ServerEvent::StatusChanged { id, status } => {
                assert_eq!(id, ticket_id);
                assert_eq!(status, TicketStatus::Closed);
            }
            other => panic!("Unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_user_joined_skips_the_joiner() {
        let ws = WebSocketState::new();
        let ticket_id = Uuid::new_v4();

        let (tx1, mut joiner_rx) = mpsc::unbounded_channel();
        let joiner = Arc::new(Connection::new(Uuid::new_v4(), tx1));
        let (tx2, mut other_rx) = mpsc::unbounded_channel();
        let other = Arc::new(Connection::new(Uuid::new_v4(), tx2));

        ws.rooms.join(ticket_id, Arc::clone(&joiner)).await;
        ws.rooms.join(ticket_id, other).await;

        ws.notify_user_joined(ticket_id, &joiner.session_id, "Casey")
            .await;

        assert!(joiner_rx.try_recv().is_err());
        match other_rx.try_recv().unwrap() {
            ServerEvent::UserJoined { message, .. } => {
                assert_eq!(message, "Casey joined the conversation");
            }
            other => panic!("Unexpected event: {other:?}"),
        }
    }
}
