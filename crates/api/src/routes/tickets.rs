//! Ticket endpoints
//!
//! Handlers delegate to the ticket engine, then fan successful writes
//! out to the ticket's realtime room.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use helpdesk_shared::{ReplyWithAuthor, Ticket, TicketStatus, TicketSummary};

use crate::auth::middleware::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::tickets::TicketDetail;

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AddReplyRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TicketStatus,
}

/// `POST /api/tickets`
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<CreateTicketRequest>,
) -> ApiResult<(StatusCode, Json<Ticket>)> {
    let ticket = state
        .tickets
        .create(auth.user_id, &request.subject, &request.message)
        .await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// `GET /api/tickets`
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<TicketSummary>>> {
    let tickets = state.tickets.list(auth.user_id).await?;
    Ok(Json(tickets))
}

/// `GET /api/tickets/:id`
pub async fn get_one(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(ticket_id): Path<Uuid>,
) -> ApiResult<Json<TicketDetail>> {
    let detail = state.tickets.get_one(auth.user_id, ticket_id).await?;
    Ok(Json(detail))
}

/// `POST /api/tickets/:id/replies`
pub async fn add_reply(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(ticket_id): Path<Uuid>,
    Json(request): Json<AddReplyRequest>,
) -> ApiResult<(StatusCode, Json<ReplyWithAuthor>)> {
    let reply = state
        .tickets
        .add_reply(auth.user_id, ticket_id, &request.content)
        .await?;

    state.ws.notify_new_reply(ticket_id, reply.clone()).await;
    Ok((StatusCode::CREATED, Json(reply)))
}

/// `PATCH /api/tickets/:id/status`
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(ticket_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Ticket>> {
    let ticket = state
        .tickets
        .update_status(auth.user_id, ticket_id, request.status)
        .await?;

    state.ws.notify_status_change(ticket_id, ticket.status).await;
    Ok(Json(ticket))
}
