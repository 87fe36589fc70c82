//! Axum WebSocket route handler
//!
//! The upgrade is authenticated before it is accepted. Credentials are
//! taken from the `token` query parameter first (browser websocket
//! clients cannot set headers), then the access-token cookie, then the
//! Authorization header.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::auth::extract::access_token_from_headers;
use crate::auth::jwt::Claims;
use crate::state::AppState;
use crate::store::UserStore;

use super::connection::Connection;
use super::events::{ClientEvent, ServerEvent};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// `GET /ws` upgrade endpoint
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .or_else(|| access_token_from_headers(&headers));

    let claims = match token.as_deref().map(|t| state.jwt.validate_access(t)) {
        Some(Ok(claims)) => claims,
        _ => {
            tracing::debug!("WebSocket upgrade rejected: missing or invalid credentials");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, claims))
}

async fn handle_socket(socket: WebSocket, state: AppState, claims: Claims) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let conn = Arc::new(Connection::new(claims.sub, tx));

    tracing::info!(
        user_id = %claims.sub,
        session_id = %conn.session_id,
        "WebSocket connected"
    );

    // Outbound pump: room broadcasts -> socket
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let event = match serde_json::from_str::<ClientEvent>(&text) {
            Ok(event) => event,
            Err(_) => {
                let _ = conn.send(ServerEvent::Error {
                    message: "Unrecognized event".to_string(),
                });
                continue;
            }
        };

        match event {
            ClientEvent::JoinTicket(ticket_id) => {
                match state.tickets.can_view(claims.sub, ticket_id).await {
                    Ok(true) => {
                        state.ws.rooms.join(ticket_id, Arc::clone(&conn)).await;

                        let name = match state.store.find_user(claims.sub).await {
                            Ok(Some(user)) => user.name().unwrap_or_else(|| user.email.clone()),
                            _ => claims.email.clone(),
                        };
                        state
                            .ws
                            .notify_user_joined(ticket_id, &conn.session_id, &name)
                            .await;
                    }
                    Ok(false) => {
                        tracing::warn!(
                            user_id = %claims.sub,
                            ticket_id = %ticket_id,
                            "Room join refused"
                        );
                        let _ = conn.send(ServerEvent::Error {
                            message: "Not authorized to join this ticket".to_string(),
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Room membership check failed");
                        let _ = conn.send(ServerEvent::Error {
                            message: "Internal error".to_string(),
                        });
                    }
                }
            }
            ClientEvent::LeaveTicket(ticket_id) => {
                state.ws.rooms.leave(&ticket_id, &conn.session_id).await;
            }
        }
    }

    state.ws.rooms.remove_connection(&conn.session_id).await;
    writer.abort();
    tracing::info!(
        user_id = %claims.sub,
        session_id = %conn.session_id,
        "WebSocket disconnected"
    );
}
