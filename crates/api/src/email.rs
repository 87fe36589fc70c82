//! Outbound email delivery via Resend
//!
//! The transport sits behind the [`Mailer`] trait; tests substitute a
//! recording implementation. With no API key configured, delivery
//! degrades to logging the link so local development works without an
//! account.

use async_trait::async_trait;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email request failed: {0}")]
    Request(String),
    #[error("Email provider returned {status}: {body}")]
    Provider { status: u16, body: String },
}

/// Outbound mail delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a magic-link email carrying the signed one-time token
    async fn send_magic_link(&self, to: &str, token: &str) -> Result<(), EmailError>;
}

/// Resend-backed mailer
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: Option<String>,
    from: String,
    public_url: String,
}

impl ResendMailer {
    pub fn new(api_key: Option<String>, from: String, public_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
            public_url,
        }
    }

    fn verification_url(&self, token: &str) -> String {
        format!(
            "{}/api/auth/verify-magic-link?token={}",
            self.public_url.trim_end_matches('/'),
            token
        )
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send_magic_link(&self, to: &str, token: &str) -> Result<(), EmailError> {
        let url = self.verification_url(token);

        let Some(api_key) = &self.api_key else {
            tracing::warn!(to = %to, link = %url, "No email API key configured; magic link logged instead of sent");
            return Ok(());
        };

        let body = json!({
            "from": self.from,
            "to": [to],
            "subject": "Your sign-in link",
            "html": format!(
                "<p>Click the link below to continue. It expires shortly and can only be used once.</p>\
                 <p><a href=\"{url}\">Sign in</a></p>\
                 <p>If you did not request this, you can ignore this email.</p>"
            ),
        });

        let response = self
            .client
            .post("https://api.resend.com/emails")
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "Magic link delivery failed");
            return Err(EmailError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %to, "Magic link sent");
        Ok(())
    }
}
