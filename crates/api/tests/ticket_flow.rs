//! End-to-end ticket lifecycle over the in-memory store
//!
//! Exercises the same composition the HTTP handlers use: engine writes
//! followed by realtime fan-out to the ticket's room.

use std::sync::Arc;

use helpdesk_api::error::ApiError;
use helpdesk_api::store::{MemoryStore, UserStore};
use helpdesk_api::tickets::TicketEngine;
use helpdesk_api::websocket::connection::Connection;
use helpdesk_api::websocket::events::ServerEvent;
use helpdesk_api::websocket::WebSocketState;
use helpdesk_shared::{Role, TicketStatus};
use tokio::sync::mpsc;
use uuid::Uuid;

#[tokio::test]
async fn test_full_ticket_lifecycle_with_realtime_fanout() {
    let store = Arc::new(MemoryStore::new());
    let engine = TicketEngine::new(store.clone());
    let ws = WebSocketState::new();

    let customer = store
        .create_local_user("customer@example.com", "h", Some("Casey"))
        .await
        .unwrap();
    let agent = store
        .create_local_user("agent@example.com", "h", Some("Avery"))
        .await
        .unwrap();
    store.set_role(agent.id, Role::Agent).await;

    // Customer opens a ticket and watches its room
    let ticket = engine
        .create(customer.id, "Cannot log in", "It says access denied")
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::Open);

    let (tx, mut customer_rx) = mpsc::unbounded_channel();
    let customer_conn = Arc::new(Connection::new(customer.id, tx));
    assert!(engine.can_view(customer.id, ticket.id).await.unwrap());
    ws.rooms.join(ticket.id, Arc::clone(&customer_conn)).await;

    // Agent joins; the customer sees the arrival, the agent does not echo
    let (tx, mut agent_rx) = mpsc::unbounded_channel();
    let agent_conn = Arc::new(Connection::new(agent.id, tx));
    assert!(engine.can_view(agent.id, ticket.id).await.unwrap());
    ws.rooms.join(ticket.id, Arc::clone(&agent_conn)).await;
    ws.notify_user_joined(ticket.id, &agent_conn.session_id, "Avery")
        .await;

    match customer_rx.try_recv().unwrap() {
        ServerEvent::UserJoined { message, .. } => {
            assert_eq!(message, "Avery joined the conversation");
        }
        other => panic!("Unexpected event: {other:?}"),
    }
    assert!(agent_rx.try_recv().is_err());

    // Agent replies; everyone in the room gets the reply
    let reply = engine
        .add_reply(agent.id, ticket.id, "Try resetting your session")
        .await
        .unwrap();
    ws.notify_new_reply(ticket.id, reply.clone()).await;

    for rx in [&mut customer_rx, &mut agent_rx] {
        match rx.try_recv().unwrap() {
            ServerEvent::NewReply(broadcast) => {
                assert_eq!(broadcast.id, reply.id);
                assert_eq!(broadcast.author.role, Role::Agent);
            }
            other => panic!("Unexpected event: {other:?}"),
        }
    }

    // Agent closes the ticket; the room observes the transition
    let closed = engine
        .update_status(agent.id, ticket.id, TicketStatus::Closed)
        .await
        .unwrap();
    ws.notify_status_change(ticket.id, closed.status).await;

    match customer_rx.try_recv().unwrap() {
        ServerEvent::StatusChanged { id, status } => {
            assert_eq!(id, ticket.id);
            assert_eq!(status, TicketStatus::Closed);
        }
        other => panic!("Unexpected event: {other:?}"),
    }

    // Closed means closed, for every role
    assert!(matches!(
        engine.add_reply(customer.id, ticket.id, "hello?").await,
        Err(ApiError::Forbidden)
    ));
    assert!(matches!(
        engine.add_reply(agent.id, ticket.id, "one more").await,
        Err(ApiError::Forbidden)
    ));
}

#[tokio::test]
async fn test_room_join_refused_for_outsider() {
    let store = Arc::new(MemoryStore::new());
    let engine = TicketEngine::new(store.clone());

    let customer = store
        .create_local_user("customer@example.com", "h", None)
        .await
        .unwrap();
    let outsider = store
        .create_local_user("outsider@example.com", "h", None)
        .await
        .unwrap();

    let ticket = engine
        .create(customer.id, "Private matter", "Details inside")
        .await
        .unwrap();

    assert!(!engine.can_view(outsider.id, ticket.id).await.unwrap());
    // Unknown users and unknown tickets are also refused, not errors
    assert!(!engine.can_view(Uuid::new_v4(), ticket.id).await.unwrap());
    assert!(!engine.can_view(customer.id, Uuid::new_v4()).await.unwrap());
}
