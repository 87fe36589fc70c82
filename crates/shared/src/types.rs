//! Common domain types used across the helpdesk platform

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Roles and Status
// =============================================================================

/// User role
///
/// Customers open tickets; agents work them. Wire representation is the
/// upper-case string (`CUSTOMER` / `AGENT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Agent => "AGENT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CUSTOMER" => Some(Role::Customer),
            "AGENT" => Some(Role::Agent),
            _ => None,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

/// Ticket lifecycle status (closed set, case-sensitive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Open,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "OPEN",
            TicketStatus::Closed => "CLOSED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OPEN" => Some(TicketStatus::Open),
            "CLOSED" => Some(TicketStatus::Closed),
            _ => None,
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// A user record
///
/// `password_hash` is absent for accounts created through an external
/// identity provider or a passwordless login link. `refresh_token_hash`
/// mirrors the hash of the most recently issued refresh token; `None`
/// means the user has no active session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(skip_serializing)]
    pub refresh_token_hash: Option<String>,
    pub google_id: Option<String>,
    pub is_google_account: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub profile_image: Option<String>,
    pub locale: Option<String>,
    pub provider: Option<String>,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Display name for rendering, preferring the explicit first name
    pub fn name(&self) -> Option<String> {
        self.first_name
            .clone()
            .or_else(|| self.display_name.clone())
    }
}

/// Profile fields delivered by the external Google OAuth collaborator
/// after it has verified the identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleProfile {
    pub email: String,
    pub google_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub profile_image: Option<String>,
    pub locale: Option<String>,
    pub provider: Option<String>,
}

// =============================================================================
// Tickets and Replies
// =============================================================================

/// A support ticket
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub subject: String,
    pub customer_id: Uuid,
    pub assigned_to: Option<Uuid>,
    pub status: TicketStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A single reply on a ticket. Immutable once created; the first reply of
/// a ticket is its original message.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Author fields rendered alongside a reply
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyAuthor {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub profile_image: Option<String>,
    pub role: Role,
}

/// A reply joined with its author, as rendered in conversations and
/// broadcast to realtime rooms
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyWithAuthor {
    pub id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author: ReplyAuthor,
}

/// Owning-customer fields attached to ticket listings for agents
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

/// A ticket as it appears in list views
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSummary {
    pub id: Uuid,
    pub subject: String,
    pub status: TicketStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerSummary>,
}
