//! WebSocket event types and serialization
//!
//! Wire format is `{"event": "...", "data": ...}` with camelCase event
//! names, matching what the frontend client emits and listens for.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use helpdesk_shared::{ReplyWithAuthor, TicketStatus};

/// Events sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Enter a ticket room to receive its updates
    JoinTicket(Uuid),

    /// Leave a ticket room
    LeaveTicket(Uuid),
}

/// Events sent from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Another participant entered the room
    #[serde(rename_all = "camelCase")]
    UserJoined {
        message: String,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },

    /// A reply was added to the ticket
    NewReply(ReplyWithAuthor),

    /// The ticket moved between OPEN and CLOSED
    #[serde(rename_all = "camelCase")]
    StatusChanged { id: Uuid, status: TicketStatus },

    /// Error message
    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_shared::{ReplyAuthor, Role};

    #[test]
    fn test_client_event_deserialization() {
        let json = r#"{"event":"joinTicket","data":"550e8400-e29b-41d4-a716-446655440000"}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        match event {
            ClientEvent::JoinTicket(ticket_id) => {
                assert_eq!(
                    ticket_id.to_string(),
                    "550e8400-e29b-41d4-a716-446655440000"
                );
            }
            _ => panic!("Expected JoinTicket event"),
        }
    }

    #[test]
    fn test_status_changed_serialization() {
        let event = ServerEvent::StatusChanged {
            id: Uuid::nil(),
            status: TicketStatus::Closed,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event":"statusChanged""#));
        assert!(json.contains(r#""status":"CLOSED""#));
    }

    #[test]
    fn test_new_reply_carries_author() {
        let event = ServerEvent::NewReply(ReplyWithAuthor {
            id: Uuid::new_v4(),
            content: "hello".to_string(),
            created_at: OffsetDateTime::now_utc(),
            author: ReplyAuthor {
                id: Uuid::new_v4(),
                name: Some("Casey".to_string()),
                email: "c@example.com".to_string(),
                profile_image: None,
                role: Role::Agent,
            },
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event":"newReply""#));
        assert!(json.contains(r#""role":"AGENT""#));
    }

    #[test]
    fn test_unknown_client_event_is_an_error() {
        let json = r#"{"event":"typingStart","data":"550e8400-e29b-41d4-a716-446655440000"}"#;
        assert!(serde_json::from_str::<ClientEvent>(json).is_err());
    }
}
