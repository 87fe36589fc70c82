//! Credential lifecycle: rotating refresh sessions
//!
//! A signed refresh token is only half a session; the other half is the
//! SHA-256 digest of that token stored on the user row. Refreshing
//! validates the signature, compares the digest in constant time, then
//! rotates the stored digest with a compare-and-set so that of two
//! concurrent refreshes carrying the same token, exactly one wins.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use helpdesk_shared::User;

use crate::auth::jwt::{JwtManager, TokenPair};
use crate::auth::password;
use crate::error::{ApiError, ApiResult};
use crate::store::{RecordStore, UserStore};

/// Issues, refreshes and revokes token-pair sessions
#[derive(Clone)]
pub struct SessionManager {
    jwt: Arc<JwtManager>,
    store: Arc<dyn RecordStore>,
}

impl SessionManager {
    pub fn new(jwt: Arc<JwtManager>, store: Arc<dyn RecordStore>) -> Self {
        Self { jwt, store }
    }

    /// SHA-256 hex digest of a refresh token. Deterministic so the stored
    /// value supports compare-and-set rotation.
    pub fn hash_refresh_token(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }

    /// Mint a pair for an already-authenticated user and persist the
    /// refresh digest, superseding any prior session.
    pub async fn issue_for(&self, user: &User) -> ApiResult<TokenPair> {
        let pair = self.jwt.issue_pair(user.id, &user.email)?;
        self.store
            .set_refresh_hash(user.id, &Self::hash_refresh_token(&pair.refresh_token))
            .await?;
        Ok(pair)
    }

    /// Email/password sign-in. Unknown email, passwordless account and
    /// wrong password are indistinguishable to the caller.
    pub async fn sign_in(&self, email: &str, password_attempt: &str) -> ApiResult<(User, TokenPair)> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or(ApiError::AccessDenied)?;

        let hash = user.password_hash.as_deref().ok_or(ApiError::AccessDenied)?;
        let valid = password::verify_password(password_attempt, hash)
            .map_err(|_| ApiError::AccessDenied)?;
        if !valid {
            return Err(ApiError::AccessDenied);
        }

        let pair = self.issue_for(&user).await?;
        tracing::info!(user_id = %user.id, "User signed in");
        Ok((user, pair))
    }

    /// Rotate a refresh token into a new pair
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<(User, TokenPair)> {
        let claims = self.jwt.validate_refresh(refresh_token)?;

        let user = self
            .store
            .find_user(claims.sub)
            .await?
            .ok_or(ApiError::AccessDenied)?;

        let presented = Self::hash_refresh_token(refresh_token);
        let stored = user
            .refresh_token_hash
            .as_deref()
            .ok_or(ApiError::AccessDenied)?;
        if stored.as_bytes().ct_eq(presented.as_bytes()).unwrap_u8() != 1 {
            tracing::warn!(user_id = %user.id, "Refresh token does not match active session");
            return Err(ApiError::AccessDenied);
        }

        let pair = self.jwt.issue_pair(user.id, &user.email)?;
        let rotated = self
            .store
            .swap_refresh_hash(
                user.id,
                &presented,
                &Self::hash_refresh_token(&pair.refresh_token),
            )
            .await?;
        if !rotated {
            // A concurrent refresh already consumed this token
            return Err(ApiError::AccessDenied);
        }

        Ok((user, pair))
    }

    /// Revoke the active session. Idempotent.
    pub async fn sign_out(&self, user_id: Uuid) -> ApiResult<()> {
        self.store.clear_refresh_hash(user_id).await?;
        tracing::info!(user_id = %user_id, "User signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, UserStore};

    fn sessions(store: Arc<dyn RecordStore>) -> SessionManager {
        let jwt = Arc::new(JwtManager::new(
            "access-secret-key-at-least-32-chars!",
            "refresh-secret-key-at-least-32-char!",
            15,
            7,
        ));
        SessionManager::new(jwt, store)
    }

    async fn seed_user(store: &MemoryStore) -> User {
        let hash = password::hash_password("CorrectHorse9!").unwrap();
        store
            .create_local_user("casey@example.com", &hash, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_and_refresh_rotates_session() {
        let store = Arc::new(MemoryStore::new());
        let sessions = sessions(store.clone());
        let user = seed_user(&store).await;

        let (signed_in, pair) = sessions
            .sign_in("casey@example.com", "CorrectHorse9!")
            .await
            .unwrap();
        assert_eq!(signed_in.id, user.id);

        let (_, rotated) = sessions.refresh(&pair.refresh_token).await.unwrap();

        // The consumed token is dead; the rotated one works
        assert!(matches!(
            sessions.refresh(&pair.refresh_token).await,
            Err(ApiError::AccessDenied)
        ));
        assert!(sessions.refresh(&rotated.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_in_failures_are_uniform() {
        let store = Arc::new(MemoryStore::new());
        let sessions = sessions(store.clone());
        seed_user(&store).await;
        store
            .find_or_create_passwordless_user("linkonly@example.com")
            .await
            .unwrap();

        for (email, password) in [
            ("nobody@example.com", "CorrectHorse9!"),
            ("casey@example.com", "wrong-password"),
            ("linkonly@example.com", "CorrectHorse9!"),
        ] {
            assert!(matches!(
                sessions.sign_in(email, password).await,
                Err(ApiError::AccessDenied)
            ));
        }
    }

    #[tokio::test]
    async fn test_sign_out_revokes_refresh() {
        let store = Arc::new(MemoryStore::new());
        let sessions = sessions(store.clone());
        let user = seed_user(&store).await;

        let (_, pair) = sessions
            .sign_in("casey@example.com", "CorrectHorse9!")
            .await
            .unwrap();
        sessions.sign_out(user.id).await.unwrap();

        // Signature is still valid, the session is not
        assert!(matches!(
            sessions.refresh(&pair.refresh_token).await,
            Err(ApiError::AccessDenied)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_have_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(sessions(store.clone()));
        seed_user(&store).await;

        let (_, pair) = sessions
            .sign_in("casey@example.com", "CorrectHorse9!")
            .await
            .unwrap();

        let a = {
            let sessions = sessions.clone();
            let token = pair.refresh_token.clone();
            tokio::spawn(async move { sessions.refresh(&token).await })
        };
        let b = {
            let sessions = sessions.clone();
            let token = pair.refresh_token.clone();
            tokio::spawn(async move { sessions.refresh(&token).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
    }
}
