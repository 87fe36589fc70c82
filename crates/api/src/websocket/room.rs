//! Ticket room management for pub/sub
//!
//! Each ticket has a room; events about a ticket fan out to every
//! connection currently in its room.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Connection;
use super::events::ServerEvent;

/// Manages ticket rooms for broadcasting events
pub struct RoomManager {
    /// Map of ticket_id -> list of connections
    rooms: Arc<RwLock<HashMap<Uuid, Vec<Arc<Connection>>>>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a connection to a ticket room. Joining twice is a no-op.
    pub async fn join(&self, ticket_id: Uuid, conn: Arc<Connection>) {
        let mut rooms = self.rooms.write().await;
        let conns = rooms.entry(ticket_id).or_default();
        if conns.iter().any(|c| c.session_id == conn.session_id) {
            return;
        }
        conns.push(Arc::clone(&conn));

        tracing::debug!(
            ticket_id = %ticket_id,
            session_id = %conn.session_id,
            room_size = conns.len(),
            "Connection joined ticket room"
        );
    }

    /// Remove a connection from a ticket room
    pub async fn leave(&self, ticket_id: &Uuid, session_id: &Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(conns) = rooms.get_mut(ticket_id) {
            conns.retain(|c| c.session_id != *session_id);

            // Clean up empty rooms
            if conns.is_empty() {
                rooms.remove(ticket_id);
            } else {
                tracing::debug!(
                    ticket_id = %ticket_id,
                    session_id = %session_id,
                    room_size = conns.len(),
                    "Connection left ticket room"
                );
            }
        }
    }

    /// Broadcast an event to all connections in a ticket room
    ///
    /// Silently ignores send errors (closed connections will be cleaned up)
    pub async fn broadcast(&self, ticket_id: &Uuid, event: ServerEvent) {
        self.broadcast_filtered(ticket_id, event, None).await;
    }

    /// Broadcast to a room, skipping one session (the originator)
    pub async fn broadcast_except(&self, ticket_id: &Uuid, event: ServerEvent, skip: &Uuid) {
        self.broadcast_filtered(ticket_id, event, Some(skip)).await;
    }

    async fn broadcast_filtered(&self, ticket_id: &Uuid, event: ServerEvent, skip: Option<&Uuid>) {
        let rooms = self.rooms.read().await;
        let Some(conns) = rooms.get(ticket_id) else {
            tracing::debug!(ticket_id = %ticket_id, "No subscribers for ticket event");
            return;
        };

        let mut recipients = 0;
        for conn in conns {
            if skip == Some(&conn.session_id) {
                continue;
            }
            if conn.send(event.clone()).is_ok() {
                recipients += 1;
            } else {
                tracing::warn!(
                    session_id = %conn.session_id,
                    "Failed to send event to connection (likely closed)"
                );
            }
        }

        tracing::debug!(
            ticket_id = %ticket_id,
            recipients = recipients,
            "Broadcast event to ticket room"
        );
    }

    /// Remove a connection from all rooms
    pub async fn remove_connection(&self, session_id: &Uuid) {
        let mut rooms = self.rooms.write().await;
        for conns in rooms.values_mut() {
            conns.retain(|c| c.session_id != *session_id);
        }
        rooms.retain(|_, conns| !conns.is_empty());
    }

    /// Number of connections in one ticket room
    pub async fn room_size(&self, ticket_id: &Uuid) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(ticket_id).map(|v| v.len()).unwrap_or(0)
    }

    /// Total number of active rooms
    pub async fn room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn connection() -> (Arc<Connection>, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Connection::new(Uuid::new_v4(), tx)), rx)
    }

    #[tokio::test]
    async fn test_room_join_and_leave() {
        let rooms = RoomManager::new();
        let ticket_id = Uuid::new_v4();
        let (conn, _rx) = connection();

        assert_eq!(rooms.room_size(&ticket_id).await, 0);

        rooms.join(ticket_id, Arc::clone(&conn)).await;
        assert_eq!(rooms.room_size(&ticket_id).await, 1);

        // Double join does not duplicate the connection
        rooms.join(ticket_id, Arc::clone(&conn)).await;
        assert_eq!(rooms.room_size(&ticket_id).await, 1);

        rooms.leave(&ticket_id, &conn.session_id).await;
        assert_eq!(rooms.room_size(&ticket_id).await, 0);
        assert_eq!(rooms.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_to_room() {
        let rooms = RoomManager::new();
        let ticket_id = Uuid::new_v4();
        let (conn1, mut rx1) = connection();
        let (conn2, mut rx2) = connection();
        let (outsider, mut rx3) = connection();

        rooms.join(ticket_id, conn1).await;
        rooms.join(ticket_id, conn2).await;
        rooms.join(Uuid::new_v4(), outsider).await;

        rooms
            .broadcast(
                &ticket_id,
                ServerEvent::Error {
                    message: "test".to_string(),
                },
            )
            .await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        // Other rooms are untouched
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_except_skips_originator() {
        let rooms = RoomManager::new();
        let ticket_id = Uuid::new_v4();
        let (origin, mut origin_rx) = connection();
        let (other, mut other_rx) = connection();

        rooms.join(ticket_id, Arc::clone(&origin)).await;
        rooms.join(ticket_id, other).await;

        rooms
            .broadcast_except(
                &ticket_id,
                ServerEvent::Error {
                    message: "joined".to_string(),
                },
                &origin.session_id,
            )
            .await;

        assert!(origin_rx.try_recv().is_err());
        assert!(other_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_remove_connection_from_all_rooms() {
        let rooms = RoomManager::new();
        let ticket1 = Uuid::new_v4();
        let ticket2 = Uuid::new_v4();
        let (conn, _rx) = connection();

        rooms.join(ticket1, Arc::clone(&conn)).await;
        rooms.join(ticket2, Arc::clone(&conn)).await;
        assert_eq!(rooms.room_count().await, 2);

        rooms.remove_connection(&conn.session_id).await;
        assert_eq!(rooms.room_count().await, 0);
    }
}
