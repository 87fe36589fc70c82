//! In-memory record store
//!
//! Implements the same interface as [`PgStore`](super::PgStore) over
//! process-local maps. Backs the test suite; rotation uses the same
//! compare-and-set semantics as the SQL implementation, serialized by a
//! single write lock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use helpdesk_shared::{
    CustomerSummary, GoogleProfile, Reply, ReplyAuthor, ReplyWithAuthor, Role, Ticket,
    TicketStatus, TicketSummary, User,
};

use super::{StoreError, StoreResult, TicketStore, UserStore};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    tickets: HashMap<Uuid, Ticket>,
    // Replies per ticket in insertion (creation) order
    replies: HashMap<Uuid, Vec<Reply>>,
}

/// Process-local record store
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Promote a user to the agent role (test fixture helper; role changes
    /// have no API surface in this service)
    pub async fn set_role(&self, user_id: Uuid, role: Role) {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.role = role;
        }
    }

    /// Assign an agent to a ticket (test fixture helper)
    pub async fn set_assigned_agent(&self, ticket_id: Uuid, agent_id: Uuid) {
        let mut inner = self.inner.write().await;
        if let Some(ticket) = inner.tickets.get_mut(&ticket_id) {
            ticket.assigned_to = Some(agent_id);
        }
    }

    fn blank_user(email: &str) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: None,
            refresh_token_hash: None,
            google_id: None,
            is_google_account: false,
            first_name: None,
            last_name: None,
            display_name: None,
            profile_image: None,
            locale: None,
            provider: None,
            role: Role::Customer,
            created_at: now,
            updated_at: now,
        }
    }

    fn author_of(user: &User) -> ReplyAuthor {
        ReplyAuthor {
            id: user.id,
            name: user.name(),
            email: user.email.clone(),
            profile_image: user.profile_image.clone(),
            role: user.role,
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_local_user(
        &self,
        email: &str,
        password_hash: &str,
        first_name: Option<&str>,
    ) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        let mut user = Self::blank_user(email);
        user.password_hash = Some(password_hash.to_string());
        user.first_name = first_name.map(String::from);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_or_create_passwordless_user(&self, email: &str) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.values().find(|u| u.email == email) {
            return Ok(user.clone());
        }
        let user = Self::blank_user(email);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn upsert_google_user(&self, profile: &GoogleProfile) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        let existing_id = inner
            .users
            .values()
            .find(|u| u.email == profile.email)
            .map(|u| u.id);

        let id = existing_id.unwrap_or_else(Uuid::new_v4);
        let user = match inner.users.get_mut(&id) {
            Some(user) => {
                user.google_id = Some(profile.google_id.clone());
                user.is_google_account = true;
                user.first_name = profile.first_name.clone();
                user.last_name = profile.last_name.clone();
                user.display_name = profile.display_name.clone();
                user.profile_image = profile.profile_image.clone();
                user.locale = profile.locale.clone();
                user.provider = profile.provider.clone();
                user.updated_at = OffsetDateTime::now_utc();
                user.clone()
            }
            None => {
                let mut user = Self::blank_user(&profile.email);
                user.id = id;
                user.google_id = Some(profile.google_id.clone());
                user.is_google_account = true;
                user.first_name = profile.first_name.clone();
                user.last_name = profile.last_name.clone();
                user.display_name = profile.display_name.clone();
                user.profile_image = profile.profile_image.clone();
                user.locale = profile.locale.clone();
                user.provider = profile.provider.clone();
                inner.users.insert(id, user.clone());
                user
            }
        };
        Ok(user)
    }

    async fn set_refresh_hash(&self, user_id: Uuid, hash: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.refresh_token_hash = Some(hash.to_string());
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn clear_refresh_hash(&self, user_id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.refresh_token_hash = None;
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn swap_refresh_hash(
        &self,
        user_id: Uuid,
        expected: &str,
        new_hash: &str,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&user_id) {
            Some(user) if user.refresh_token_hash.as_deref() == Some(expected) => {
                user.refresh_token_hash = Some(new_hash.to_string());
                user.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn create_ticket(
        &self,
        subject: &str,
        message: &str,
        customer_id: Uuid,
    ) -> StoreResult<Ticket> {
        let mut inner = self.inner.write().await;
        let now = OffsetDateTime::now_utc();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            subject: subject.to_string(),
            customer_id,
            assigned_to: None,
            status: TicketStatus::Open,
            created_at: now,
            updated_at: now,
        };
        let first_reply = Reply {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            author_id: customer_id,
            content: message.to_string(),
            created_at: now,
        };
        inner.tickets.insert(ticket.id, ticket.clone());
        inner.replies.insert(ticket.id, vec![first_reply]);
        Ok(ticket)
    }

    async fn find_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        let inner = self.inner.read().await;
        Ok(inner.tickets.get(&id).cloned())
    }

    async fn list_tickets_for_customer(
        &self,
        customer_id: Uuid,
    ) -> StoreResult<Vec<TicketSummary>> {
        let inner = self.inner.read().await;
        let mut tickets: Vec<TicketSummary> = inner
            .tickets
            .values()
            .filter(|t| t.customer_id == customer_id)
            .map(|t| TicketSummary {
                id: t.id,
                subject: t.subject.clone(),
                status: t.status,
                created_at: t.created_at,
                updated_at: t.updated_at,
                customer: None,
            })
            .collect();
        tickets.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(tickets)
    }

    async fn list_all_tickets(&self) -> StoreResult<Vec<TicketSummary>> {
        let inner = self.inner.read().await;
        let mut tickets: Vec<TicketSummary> = inner
            .tickets
            .values()
            .map(|t| {
                let customer = inner.users.get(&t.customer_id).map(|u| CustomerSummary {
                    id: u.id,
                    email: u.email.clone(),
                    name: u.name(),
                });
                TicketSummary {
                    id: t.id,
                    subject: t.subject.clone(),
                    status: t.status,
                    created_at: t.created_at,
                    updated_at: t.updated_at,
                    customer,
                }
            })
            .collect();
        tickets.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(tickets)
    }

    async fn ticket_replies(&self, ticket_id: Uuid) -> StoreResult<Vec<ReplyWithAuthor>> {
        let inner = self.inner.read().await;
        let replies = inner.replies.get(&ticket_id).cloned().unwrap_or_default();
        Ok(replies
            .into_iter()
            .map(|r| {
                let author = inner
                    .users
                    .get(&r.author_id)
                    .map(Self::author_of)
                    .unwrap_or_else(|| ReplyAuthor {
                        id: r.author_id,
                        name: None,
                        email: String::new(),
                        profile_image: None,
                        role: Role::Customer,
                    });
                ReplyWithAuthor {
                    id: r.id,
                    content: r.content,
                    created_at: r.created_at,
                    author,
                }
            })
            .collect())
    }

    async fn insert_reply(
        &self,
        ticket_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> StoreResult<ReplyWithAuthor> {
        let mut inner = self.inner.write().await;
        let author = inner
            .users
            .get(&author_id)
            .map(Self::author_of)
            .ok_or_else(|| StoreError::Database("reply author not found".to_string()))?;

        let now = OffsetDateTime::now_utc();
        let reply = Reply {
            id: Uuid::new_v4(),
            ticket_id,
            author_id,
            content: content.to_string(),
            created_at: now,
        };
        inner.replies.entry(ticket_id).or_default().push(reply.clone());
        if let Some(ticket) = inner.tickets.get_mut(&ticket_id) {
            ticket.updated_at = now;
        }

        Ok(ReplyWithAuthor {
            id: reply.id,
            content: reply.content,
            created_at: reply.created_at,
            author,
        })
    }

    async fn set_ticket_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> StoreResult<Ticket> {
        let mut inner = self.inner.write().await;
        let ticket = inner
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| StoreError::Database("ticket not found".to_string()))?;
        ticket.status = status;
        ticket.updated_at = OffsetDateTime::now_utc();
        Ok(ticket.clone())
    }
}
