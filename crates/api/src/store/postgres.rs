//! Postgres-backed record store

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use helpdesk_shared::{
    CustomerSummary, GoogleProfile, Reply, ReplyAuthor, ReplyWithAuthor, Role, Ticket,
    TicketStatus, TicketSummary, User,
};

use super::{StoreError, StoreResult, TicketStore, UserStore};

/// Production record store over a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: Option<String>,
    refresh_token_hash: Option<String>,
    google_id: Option<String>,
    is_google_account: bool,
    first_name: Option<String>,
    last_name: Option<String>,
    display_name: Option<String>,
    profile_image: Option<String>,
    locale: Option<String>,
    provider: Option<String>,
    role: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| StoreError::Database(format!("unknown role: {}", row.role)))?;
        Ok(User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            refresh_token_hash: row.refresh_token_hash,
            google_id: row.google_id,
            is_google_account: row.is_google_account,
            first_name: row.first_name,
            last_name: row.last_name,
            display_name: row.display_name,
            profile_image: row.profile_image,
            locale: row.locale,
            provider: row.provider,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TicketRow {
    id: Uuid,
    subject: String,
    customer_id: Uuid,
    assigned_to: Option<Uuid>,
    status: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let status = TicketStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Database(format!("unknown status: {}", row.status)))?;
        Ok(Ticket {
            id: row.id,
            subject: row.subject,
            customer_id: row.customer_id,
            assigned_to: row.assigned_to,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TicketSummaryRow {
    id: Uuid,
    subject: String,
    status: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    customer_id: Option<Uuid>,
    customer_email: Option<String>,
    customer_name: Option<String>,
}

impl TryFrom<TicketSummaryRow> for TicketSummary {
    type Error = StoreError;

    fn try_from(row: TicketSummaryRow) -> Result<Self, Self::Error> {
        let status = TicketStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Database(format!("unknown status: {}", row.status)))?;
        let customer = match (row.customer_id, row.customer_email) {
            (Some(id), Some(email)) => Some(CustomerSummary {
                id,
                email,
                name: row.customer_name,
            }),
            _ => None,
        };
        Ok(TicketSummary {
            id: row.id,
            subject: row.subject,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            customer,
        })
    }
}

#[derive(Debug, FromRow)]
struct ReplyRow {
    id: Uuid,
    content: String,
    created_at: OffsetDateTime,
    author_id: Uuid,
    author_name: Option<String>,
    author_email: String,
    author_image: Option<String>,
    author_role: String,
}

impl TryFrom<ReplyRow> for ReplyWithAuthor {
    type Error = StoreError;

    fn try_from(row: ReplyRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.author_role)
            .ok_or_else(|| StoreError::Database(format!("unknown role: {}", row.author_role)))?;
        Ok(ReplyWithAuthor {
            id: row.id,
            content: row.content,
            created_at: row.created_at,
            author: ReplyAuthor {
                id: row.author_id,
                name: row.author_name,
                email: row.author_email,
                profile_image: row.author_image,
                role,
            },
        })
    }
}

const USER_COLUMNS: &str = r#"
    id, email, password_hash, refresh_token_hash, google_id, is_google_account,
    first_name, last_name, display_name, profile_image, locale, provider, role,
    created_at, updated_at
"#;

// =============================================================================
// UserStore
// =============================================================================

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn create_local_user(
        &self,
        email: &str,
        password_hash: &str,
        first_name: Option<&str>,
    ) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .fetch_one(&self.pool)
        .await?;

        User::try_from(row)
    }

    async fn find_or_create_passwordless_user(&self, email: &str) -> StoreResult<User> {
        // Upsert keyed on the unique email; an existing record is left
        // untouched and simply returned
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email)
            VALUES ($1)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        User::try_from(row)
    }

    async fn upsert_google_user(&self, profile: &GoogleProfile) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (
                email, google_id, is_google_account,
                first_name, last_name, display_name, profile_image, locale, provider
            )
            VALUES ($1, $2, TRUE, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO UPDATE SET
                google_id = EXCLUDED.google_id,
                is_google_account = TRUE,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                display_name = EXCLUDED.display_name,
                profile_image = EXCLUDED.profile_image,
                locale = EXCLUDED.locale,
                provider = EXCLUDED.provider,
                updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&profile.email)
        .bind(&profile.google_id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.display_name)
        .bind(&profile.profile_image)
        .bind(&profile.locale)
        .bind(&profile.provider)
        .fetch_one(&self.pool)
        .await?;

        User::try_from(row)
    }

    async fn set_refresh_hash(&self, user_id: Uuid, hash: &str) -> StoreResult<()> {
        sqlx::query("UPDATE users SET refresh_token_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_refresh_hash(&self, user_id: Uuid) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET refresh_token_hash = NULL, updated_at = NOW()
            WHERE id = $1 AND refresh_token_hash IS NOT NULL
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn swap_refresh_hash(
        &self,
        user_id: Uuid,
        expected: &str,
        new_hash: &str,
    ) -> StoreResult<bool> {
        // Compare-and-set so two concurrent rotations cannot both succeed
        // against the same prior hash
        let result = sqlx::query(
            r#"
            UPDATE users SET refresh_token_hash = $3, updated_at = NOW()
            WHERE id = $1 AND refresh_token_hash = $2
            "#,
        )
        .bind(user_id)
        .bind(expected)
        .bind(new_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// TicketStore
// =============================================================================

#[async_trait]
impl TicketStore for PgStore {
    async fn create_ticket(
        &self,
        subject: &str,
        message: &str,
        customer_id: Uuid,
    ) -> StoreResult<Ticket> {
        // Ticket and its first reply land together
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            INSERT INTO tickets (subject, customer_id)
            VALUES ($1, $2)
            RETURNING id, subject, customer_id, assigned_to, status, created_at, updated_at
            "#,
        )
        .bind(subject)
        .bind(customer_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO replies (ticket_id, author_id, content) VALUES ($1, $2, $3)")
            .bind(row.id)
            .bind(customer_id)
            .bind(message)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ticket::try_from(row)
    }

    async fn find_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT id, subject, customer_id, assigned_to, status, created_at, updated_at
            FROM tickets WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Ticket::try_from).transpose()
    }

    async fn list_tickets_for_customer(
        &self,
        customer_id: Uuid,
    ) -> StoreResult<Vec<TicketSummary>> {
        let rows = sqlx::query_as::<_, TicketSummaryRow>(
            r#"
            SELECT t.id, t.subject, t.status, t.created_at, t.updated_at,
                   NULL::uuid AS customer_id, NULL AS customer_email, NULL AS customer_name
            FROM tickets t
            WHERE t.customer_id = $1
            ORDER BY t.updated_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TicketSummary::try_from).collect()
    }

    async fn list_all_tickets(&self) -> StoreResult<Vec<TicketSummary>> {
        let rows = sqlx::query_as::<_, TicketSummaryRow>(
            r#"
            SELECT t.id, t.subject, t.status, t.created_at, t.updated_at,
                   u.id AS customer_id, u.email AS customer_email,
                   COALESCE(u.first_name, u.display_name) AS customer_name
            FROM tickets t
            JOIN users u ON u.id = t.customer_id
            ORDER BY t.updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TicketSummary::try_from).collect()
    }

    async fn ticket_replies(&self, ticket_id: Uuid) -> StoreResult<Vec<ReplyWithAuthor>> {
        let rows = sqlx::query_as::<_, ReplyRow>(
            r#"
            SELECT r.id, r.content, r.created_at,
                   u.id AS author_id,
                   COALESCE(u.first_name, u.display_name) AS author_name,
                   u.email AS author_email,
                   u.profile_image AS author_image, u.role AS author_role
            FROM replies r
            JOIN users u ON u.id = r.author_id
            WHERE r.ticket_id = $1
            ORDER BY r.created_at ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ReplyWithAuthor::try_from).collect()
    }

    async fn insert_reply(
        &self,
        ticket_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> StoreResult<ReplyWithAuthor> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, Reply>(
            r#"
            INSERT INTO replies (ticket_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, ticket_id, author_id, content, created_at
            "#,
        )
        .bind(ticket_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE tickets SET updated_at = NOW() WHERE id = $1")
            .bind(ticket_id)
            .execute(&mut *tx)
            .await?;

        let author_row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(author_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let author = User::try_from(author_row)?;
        Ok(ReplyWithAuthor {
            id: inserted.id,
            content: inserted.content,
            created_at: inserted.created_at,
            author: ReplyAuthor {
                id: author.id,
                name: author.name(),
                email: author.email,
                profile_image: author.profile_image,
                role: author.role,
            },
        })
    }

    async fn set_ticket_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> StoreResult<Ticket> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            UPDATE tickets SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, subject, customer_id, assigned_to, status, created_at, updated_at
            "#,
        )
        .bind(ticket_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ticket::try_from(row)
    }
}
