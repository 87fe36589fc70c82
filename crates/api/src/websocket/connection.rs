//! WebSocket connection management

use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::ServerEvent;

/// An authenticated, active WebSocket connection
#[derive(Debug)]
pub struct Connection {
    /// Unique session ID for this connection
    pub session_id: Uuid,

    /// Authenticated user ID
    pub user_id: Uuid,

    /// Channel to send events to this connection
    pub sender: mpsc::UnboundedSender<ServerEvent>,
}

impl Connection {
    pub fn new(user_id: Uuid, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            sender,
        }
    }

    /// Send an event to this connection
    ///
    /// Returns Err if the connection is closed
    #[allow(clippy::result_large_err)] // Error type is from tokio mpsc, containing the failed event
    pub fn send(&self, event: ServerEvent) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Connection::new(Uuid::new_v4(), tx);

        assert!(conn
            .send(ServerEvent::Error {
                message: "first".to_string()
            })
            .is_ok());

        drop(rx);
        assert!(conn
            .send(ServerEvent::Error {
                message: "second".to_string()
            })
            .is_err());
    }
}
