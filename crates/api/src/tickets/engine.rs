//! Ticket state machine and role-based authorization
//!
//! A ticket is visible to its owning customer, its assigned agent and any
//! agent; only agents move status. Replies are frozen once a ticket is
//! closed. All writes resolve the caller's role from the store at call
//! time rather than trusting anything carried in the token.

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use helpdesk_shared::{
    CustomerSummary, ReplyWithAuthor, Role, Ticket, TicketStatus, TicketSummary, User,
};

use crate::error::{ApiError, ApiResult};
use crate::store::{RecordStore, TicketStore, UserStore};

/// A ticket rendered with its conversation. The first reply is split out
/// as the original message; `replies` holds the rest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetail {
    pub id: Uuid,
    pub subject: String,
    pub status: TicketStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub customer: Option<CustomerSummary>,
    pub message: Option<String>,
    pub replies: Vec<ReplyWithAuthor>,
}

pub struct TicketEngine {
    store: Arc<dyn RecordStore>,
}

impl TicketEngine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    fn can_access_ticket(user: &User, ticket: &Ticket) -> bool {
        ticket.customer_id == user.id
            || ticket.assigned_to == Some(user.id)
            || user.role == Role::Agent
    }

    fn can_close_tickets(user: &User) -> bool {
        user.role == Role::Agent
    }

    async fn require_user(&self, user_id: Uuid) -> ApiResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(ApiError::AccessDenied)
    }

    /// Open a new ticket; the message becomes its first reply
    pub async fn create(&self, user_id: Uuid, subject: &str, message: &str) -> ApiResult<Ticket> {
        let subject = subject.trim();
        let message = message.trim();
        if subject.is_empty() {
            return Err(ApiError::Validation("Subject is required".to_string()));
        }
        if message.is_empty() {
            return Err(ApiError::Validation("Message is required".to_string()));
        }

        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(ApiError::NotFound)?;
        let ticket = self.store.create_ticket(subject, message, user.id).await?;
        tracing::info!(ticket_id = %ticket.id, customer_id = %user.id, "Ticket created");
        Ok(ticket)
    }

    /// Tickets visible to the caller: agents see every ticket with the
    /// owning customer attached, customers see only their own.
    pub async fn list(&self, user_id: Uuid) -> ApiResult<Vec<TicketSummary>> {
        let user = self.require_user(user_id).await?;
        let tickets = if user.role == Role::Agent {
            self.store.list_all_tickets().await?
        } else {
            self.store.list_tickets_for_customer(user.id).await?
        };
        Ok(tickets)
    }

    /// One ticket with its full conversation
    pub async fn get_one(&self, user_id: Uuid, ticket_id: Uuid) -> ApiResult<TicketDetail> {
        let user = self.require_user(user_id).await?;
        let ticket = self
            .store
            .find_ticket(ticket_id)
            .await?
            .ok_or(ApiError::NotFound)?;
        if !Self::can_access_ticket(&user, &ticket) {
            return Err(ApiError::Forbidden);
        }

        let mut replies = self.store.ticket_replies(ticket_id).await?;
        let message = if replies.is_empty() {
            None
        } else {
            Some(replies.remove(0).content)
        };

        let customer = self.store.find_user(ticket.customer_id).await?.map(|c| {
            CustomerSummary {
                id: c.id,
                email: c.email.clone(),
                name: c.name(),
            }
        });

        Ok(TicketDetail {
            id: ticket.id,
            subject: ticket.subject,
            status: ticket.status,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
            customer,
            message,
            replies,
        })
    }

    /// Append a reply. Closed tickets and outsiders are both refused.
    pub async fn add_reply(
        &self,
        user_id: Uuid,
        ticket_id: Uuid,
        content: &str,
    ) -> ApiResult<ReplyWithAuthor> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::Validation("Reply content is required".to_string()));
        }

        let user = self.require_user(user_id).await?;
        let ticket = self
            .store
            .find_ticket(ticket_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        if ticket.status == TicketStatus::Closed {
            return Err(ApiError::Forbidden);
        }
        if !Self::can_access_ticket(&user, &ticket) {
            return Err(ApiError::Forbidden);
        }

        let reply = self.store.insert_reply(ticket_id, user.id, content).await?;
        tracing::info!(ticket_id = %ticket_id, author_id = %user.id, "Reply added");
        Ok(reply)
    }

    /// Move a ticket's status. Agent-only; the role check runs before the
    /// ticket lookup so non-agents learn nothing about ticket existence.
    pub async fn update_status(
        &self,
        user_id: Uuid,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> ApiResult<Ticket> {
        let user = self.require_user(user_id).await?;
        if !Self::can_close_tickets(&user) {
            return Err(ApiError::Forbidden);
        }

        self.store
            .find_ticket(ticket_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        let ticket = self.store.set_ticket_status(ticket_id, status).await?;
        tracing::info!(ticket_id = %ticket_id, status = %status.as_str(), agent_id = %user.id, "Ticket status changed");
        Ok(ticket)
    }

    /// Visibility predicate for realtime room joins
    pub async fn can_view(&self, user_id: Uuid, ticket_id: Uuid) -> ApiResult<bool> {
        let Some(user) = self.store.find_user(user_id).await? else {
            return Ok(false);
        };
        let Some(ticket) = self.store.find_ticket(ticket_id).await? else {
            return Ok(false);
        };
        Ok(Self::can_access_ticket(&user, &ticket))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        engine: TicketEngine,
        customer: User,
        other_customer: User,
        agent: User,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let engine = TicketEngine::new(store.clone());

        let customer = store.create_local_user("customer@example.com", "h", None).await.unwrap();
        let other_customer = store.create_local_user("other@example.com", "h", None).await.unwrap();
        let agent = store.create_local_user("agent@example.com", "h", None).await.unwrap();
        store.set_role(agent.id, Role::Agent).await;

        Fixture {
            store,
            engine,
            customer,
            other_customer,
            agent,
        }
    }

    #[tokio::test]
    async fn test_create_requires_subject_and_message() {
        let f = fixture().await;
        assert!(matches!(
            f.engine.create(f.customer.id, "  ", "body").await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            f.engine.create(f.customer.id, "Subject", "").await,
            Err(ApiError::Validation(_))
        ));

        let ticket = f.engine.create(f.customer.id, "Subject", "body").await.unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);

        // Unknown creator is a missing resource, not a credential failure
        assert!(matches!(
            f.engine.create(Uuid::new_v4(), "Subject", "body").await,
            Err(ApiError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_listing_is_role_scoped() {
        let f = fixture().await;
        f.engine.create(f.customer.id, "Mine", "m").await.unwrap();
        f.engine.create(f.other_customer.id, "Theirs", "m").await.unwrap();

        let mine = f.engine.list(f.customer.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].subject, "Mine");
        assert!(mine[0].customer.is_none());

        let all = f.engine.list(f.agent.id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|t| t.customer.is_some()));
    }

    #[tokio::test]
    async fn test_get_one_splits_message_from_replies() {
        let f = fixture().await;
        let ticket = f.engine.create(f.customer.id, "Subject", "original").await.unwrap();
        f.engine.add_reply(f.customer.id, ticket.id, "follow-up").await.unwrap();

        let detail = f.engine.get_one(f.customer.id, ticket.id).await.unwrap();
        assert_eq!(detail.message.as_deref(), Some("original"));
        assert_eq!(detail.replies.len(), 1);
        assert_eq!(detail.replies[0].content, "follow-up");
    }

    #[tokio::test]
    async fn test_outsider_cannot_view_or_reply() {
        let f = fixture().await;
        let ticket = f.engine.create(f.customer.id, "Subject", "m").await.unwrap();

        assert!(matches!(
            f.engine.get_one(f.other_customer.id, ticket.id).await,
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            f.engine.add_reply(f.other_customer.id, ticket.id, "hi").await,
            Err(ApiError::Forbidden)
        ));

        // Any agent can view and reply
        assert!(f.engine.get_one(f.agent.id, ticket.id).await.is_ok());
        assert!(f.engine.add_reply(f.agent.id, ticket.id, "on it").await.is_ok());
    }

    #[tokio::test]
    async fn test_assigned_agent_retains_access() {
        let f = fixture().await;
        let ticket = f.engine.create(f.customer.id, "Subject", "m").await.unwrap();
        f.store.set_assigned_agent(ticket.id, f.agent.id).await;

        assert!(f.engine.can_view(f.agent.id, ticket.id).await.unwrap());
        assert!(!f.engine.can_view(f.other_customer.id, ticket.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_ticket_refuses_replies() {
        let f = fixture().await;
        let ticket = f.engine.create(f.customer.id, "Subject", "m").await.unwrap();
        f.engine
            .update_status(f.agent.id, ticket.id, TicketStatus::Closed)
            .await
            .unwrap();

        // Even the owner and the agent are refused once closed
        assert!(matches!(
            f.engine.add_reply(f.customer.id, ticket.id, "more").await,
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            f.engine.add_reply(f.agent.id, ticket.id, "more").await,
            Err(ApiError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_status_changes_are_agent_only() {
        let f = fixture().await;
        let ticket = f.engine.create(f.customer.id, "Subject", "m").await.unwrap();

        // The role check fires before existence is revealed
        assert!(matches!(
            f.engine
                .update_status(f.customer.id, Uuid::new_v4(), TicketStatus::Closed)
                .await,
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            f.engine
                .update_status(f.agent.id, Uuid::new_v4(), TicketStatus::Closed)
                .await,
            Err(ApiError::NotFound)
        ));

        let closed = f
            .engine
            .update_status(f.agent.id, ticket.id, TicketStatus::Closed)
            .await
            .unwrap();
        assert_eq!(closed.status, TicketStatus::Closed);

        // Re-closing is accepted, as is reopening
        assert!(f
            .engine
            .update_status(f.agent.id, ticket.id, TicketStatus::Closed)
            .await
            .is_ok());
        let reopened = f
            .engine
            .update_status(f.agent.id, ticket.id, TicketStatus::Open)
            .await
            .unwrap();
        assert_eq!(reopened.status, TicketStatus::Open);
    }

    #[tokio::test]
    async fn test_missing_ticket_is_not_found_before_membership() {
        let f = fixture().await;
        assert!(matches!(
            f.engine.add_reply(f.customer.id, Uuid::new_v4(), "hi").await,
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            f.engine.get_one(f.customer.id, Uuid::new_v4()).await,
            Err(ApiError::NotFound)
        ));
    }
}
