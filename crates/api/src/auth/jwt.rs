//! JWT token generation and validation
//!
//! Access and refresh tokens are signed with independent secrets, so a
//! token minted for one class can never validate as the other.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Claims carried by both access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Email
    pub email: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// An access/refresh token pair, as returned by credential endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// JWT manager for token operations
#[derive(Clone)]
pub struct JwtManager {
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
    access_ttl_minutes: i64,
    refresh_ttl_days: i64,
}

impl JwtManager {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl_minutes: i64,
        refresh_ttl_days: i64,
    ) -> Self {
        Self {
            access_encoding_key: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding_key: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding_key: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl_minutes,
            refresh_ttl_days,
        }
    }

    /// Issue a fresh access/refresh pair for one identity
    pub fn issue_pair(&self, user_id: Uuid, email: &str) -> Result<TokenPair, JwtError> {
        let now = OffsetDateTime::now_utc();

        let access_claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + Duration::minutes(self.access_ttl_minutes)).unix_timestamp(),
        };
        let refresh_claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + Duration::days(self.refresh_ttl_days)).unix_timestamp(),
        };

        // Explicit algorithm prevents algorithm confusion attacks
        let header = Header::new(Algorithm::HS256);
        let access_token = encode(&header, &access_claims, &self.access_encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))?;
        let refresh_token = encode(&header, &refresh_claims, &self.refresh_encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Validate an access token
    pub fn validate_access(&self, token: &str) -> Result<Claims, JwtError> {
        Self::decode_with(token, &self.access_decoding_key)
    }

    /// Validate a refresh token
    pub fn validate_refresh(&self, token: &str) -> Result<Claims, JwtError> {
        Self::decode_with(token, &self.refresh_decoding_key)
    }

    fn decode_with(token: &str, key: &DecodingKey) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60; // 60 second clock skew tolerance

        decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => JwtError::Invalid,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::Invalid,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::Invalid,
                _ => JwtError::Validation(e.to_string()),
            })
    }

    /// Access token lifetime in seconds (cookie Max-Age)
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_minutes * 60
    }

    /// Refresh token lifetime in seconds (cookie Max-Age)
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_days * 86_400
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Token encoding failed: {0}")]
    Encoding(String),
    #[error("Token validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new(
            "access-secret-key-at-least-32-chars!",
            "refresh-secret-key-at-least-32-char!",
            15,
            7,
        )
    }

    #[test]
    fn test_pair_generation_and_validation() {
        let jwt = manager();
        let user_id = Uuid::new_v4();

        let pair = jwt
            .issue_pair(user_id, "test@example.com")
            .expect("Failed to issue pair");

        let access = jwt
            .validate_access(&pair.access_token)
            .expect("Invalid access token");
        assert_eq!(access.sub, user_id);
        assert_eq!(access.email, "test@example.com");

        let refresh = jwt
            .validate_refresh(&pair.refresh_token)
            .expect("Invalid refresh token");
        assert_eq!(refresh.sub, user_id);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_token_classes_do_not_cross_validate() {
        let jwt = manager();
        let pair = jwt
            .issue_pair(Uuid::new_v4(), "test@example.com")
            .expect("Failed to issue pair");

        // Separate signing secrets: an access token is not a refresh token
        assert!(matches!(
            jwt.validate_refresh(&pair.access_token),
            Err(JwtError::Invalid)
        ));
        assert!(matches!(
            jwt.validate_access(&pair.refresh_token),
            Err(JwtError::Invalid)
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let jwt = manager();
        let pair = jwt
            .issue_pair(Uuid::new_v4(), "test@example.com")
            .expect("Failed to issue pair");

        let mut tampered = pair.access_token.clone();
        tampered.pop();
        tampered.push('A');
        assert!(jwt.validate_access(&tampered).is_err());
    }

    #[test]
    fn test_expired_token_rejected_beyond_leeway() {
        // TTL of -2 minutes puts the expiry outside the 60s leeway window
        let jwt = JwtManager::new(
            "access-secret-key-at-least-32-chars!",
            "refresh-secret-key-at-least-32-char!",
            -2,
            7,
        );
        let pair = jwt
            .issue_pair(Uuid::new_v4(), "test@example.com")
            .expect("Failed to issue pair");

        assert!(matches!(
            jwt.validate_access(&pair.access_token),
            Err(JwtError::Expired)
        ));
    }
}
