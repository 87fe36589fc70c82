//! One-time magic-link tokens
//!
//! A magic link wraps a short-lived JWT signed with its own secret. The
//! token carries the email, an intent discriminator and, for signup, the
//! raw password the user chose; nothing is persisted until the link is
//! verified, so an unclicked signup leaves no account behind.

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use helpdesk_shared::User;

use crate::auth::password;
use crate::email::Mailer;
use crate::error::{ApiError, ApiResult};
use crate::store::{RecordStore, StoreError, UserStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkIntent {
    Signup,
    Login,
}

#[derive(Debug, Serialize, Deserialize)]
struct LinkClaims {
    email: String,
    intent: LinkIntent,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    iat: i64,
    exp: i64,
}

/// Issues and verifies magic-link tokens
pub struct MagicLinkService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_minutes: i64,
    store: Arc<dyn RecordStore>,
    mailer: Arc<dyn Mailer>,
}

impl MagicLinkService {
    pub fn new(
        secret: &str,
        ttl_minutes: i64,
        store: Arc<dyn RecordStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_minutes,
            store,
            mailer,
        }
    }

    fn sign(
        &self,
        email: &str,
        intent: LinkIntent,
        password: Option<String>,
        first_name: Option<String>,
    ) -> ApiResult<String> {
        let now = OffsetDateTime::now_utc();
        let claims = LinkClaims {
            email: email.to_string(),
            intent,
            password,
            first_name,
            iat: now.unix_timestamp(),
            exp: (now + Duration::minutes(self.ttl_minutes)).unix_timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign magic link");
            ApiError::Internal
        })
    }

    fn verify_token(&self, token: &str) -> ApiResult<LinkClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60;

        decode::<LinkClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| ApiError::InvalidLink)
    }

    /// Email a signup link carrying the chosen password. Rejects emails
    /// that already have an account before anything is sent.
    pub async fn request_signup(
        &self,
        email: &str,
        password_attempt: &str,
        first_name: Option<&str>,
    ) -> ApiResult<()> {
        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(ApiError::EmailAlreadyExists);
        }

        let token = self.sign(
            email,
            LinkIntent::Signup,
            Some(password_attempt.to_string()),
            first_name.map(String::from),
        )?;
        self.mailer
            .send_magic_link(email, &token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Signup link delivery failed");
                ApiError::MagicLinkDelivery
            })?;

        tracing::info!(email = %email, "Signup link issued");
        Ok(())
    }

    /// Email a passwordless login link
    pub async fn request_login(&self, email: &str) -> ApiResult<()> {
        let token = self.sign(email, LinkIntent::Login, None, None)?;
        self.mailer
            .send_magic_link(email, &token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Login link delivery failed");
                ApiError::MagicLinkDelivery
            })?;

        tracing::info!(email = %email, "Login link issued");
        Ok(())
    }

    /// Consume a clicked link, materializing or resolving the account
    pub async fn verify(&self, token: &str) -> ApiResult<User> {
        let claims = self.verify_token(token)?;

        match claims.intent {
            LinkIntent::Signup => {
                let password_attempt = claims.password.ok_or(ApiError::InvalidLink)?;
                let hash = password::hash_password(&password_attempt).map_err(|e| {
                    tracing::error!(error = %e, "Password hashing failed");
                    ApiError::Internal
                })?;

                match self
                    .store
                    .create_local_user(&claims.email, &hash, claims.first_name.as_deref())
                    .await
                {
                    Ok(user) => {
                        tracing::info!(user_id = %user.id, "Account created via signup link");
                        Ok(user)
                    }
                    // A replayed signup link races the account it created
                    Err(StoreError::DuplicateEmail) => Err(ApiError::InvalidLink),
                    Err(e) => Err(e.into()),
                }
            }
            LinkIntent::Login => {
                let user = self
                    .store
                    .find_or_create_passwordless_user(&claims.email)
                    .await?;
                tracing::info!(user_id = %user.id, "Login link verified");
                Ok(user)
            }
        }
    }
}
