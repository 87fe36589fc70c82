//! Generic record store interface
//!
//! The relational engine is an external collaborator; everything above it
//! talks to these traits. `PgStore` is the production implementation,
//! `MemoryStore` backs the test suite.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use helpdesk_shared::{
    GoogleProfile, ReplyWithAuthor, Ticket, TicketStatus, TicketSummary, User,
};
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Record store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // PostgreSQL unique violation
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::DuplicateEmail;
            }
        }
        StoreError::Database(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations on user records
#[async_trait]
pub trait UserStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Create a user with a password credential. Fails with
    /// [`StoreError::DuplicateEmail`] if the email is taken.
    async fn create_local_user(
        &self,
        email: &str,
        password_hash: &str,
        first_name: Option<&str>,
    ) -> StoreResult<User>;

    /// Fetch the user with this email, creating a credential-less record
    /// if none exists (passwordless login).
    async fn find_or_create_passwordless_user(&self, email: &str) -> StoreResult<User>;

    /// Create or update a user from an external Google profile. Profile
    /// fields are overwritten on every call; an existing password
    /// credential is preserved.
    async fn upsert_google_user(&self, profile: &GoogleProfile) -> StoreResult<User>;

    /// Unconditionally store a new rotating refresh-token hash
    async fn set_refresh_hash(&self, user_id: Uuid, hash: &str) -> StoreResult<()>;

    /// Clear the rotating hash (logout); a user with no stored hash has no
    /// active session
    async fn clear_refresh_hash(&self, user_id: Uuid) -> StoreResult<()>;

    /// Compare-and-set rotation: store `new_hash` only if the currently
    /// stored hash still equals `expected`. Returns `false` when another
    /// writer got there first.
    async fn swap_refresh_hash(
        &self,
        user_id: Uuid,
        expected: &str,
        new_hash: &str,
    ) -> StoreResult<bool>;
}

/// Persistence operations on tickets and replies
#[async_trait]
pub trait TicketStore {
    /// Create a ticket together with its implicit first reply (the
    /// original message), both owned by the customer.
    async fn create_ticket(
        &self,
        subject: &str,
        message: &str,
        customer_id: Uuid,
    ) -> StoreResult<Ticket>;

    async fn find_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>>;

    /// Tickets owned by one customer, most recently updated first
    async fn list_tickets_for_customer(&self, customer_id: Uuid)
        -> StoreResult<Vec<TicketSummary>>;

    /// All tickets with owning-customer summaries, most recently updated
    /// first
    async fn list_all_tickets(&self) -> StoreResult<Vec<TicketSummary>>;

    /// All replies on a ticket joined with author fields, oldest first
    async fn ticket_replies(&self, ticket_id: Uuid) -> StoreResult<Vec<ReplyWithAuthor>>;

    /// Append a reply and bump the ticket's `updated_at`
    async fn insert_reply(
        &self,
        ticket_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> StoreResult<ReplyWithAuthor>;

    async fn set_ticket_status(&self, ticket_id: Uuid, status: TicketStatus)
        -> StoreResult<Ticket>;
}

/// The full record store surface consumed by the service
pub trait RecordStore: UserStore + TicketStore + Send + Sync {}

impl<T: UserStore + TicketStore + Send + Sync> RecordStore for T {}
