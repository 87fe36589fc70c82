//! Application configuration

use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    pub public_url: String,
    pub frontend_url: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Authentication
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub session_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub magic_link_ttl_minutes: i64,

    // Cookies
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,

    // Email (no key = log links instead of sending)
    pub resend_api_key: Option<String>,
    pub email_from: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),

            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),

            // Authentication: distinct secrets for the short-lived and
            // long-lived token families plus the magic-link signer
            access_token_secret: require_secret("AT_SECRET")?,
            refresh_token_secret: require_secret("RT_SECRET")?,
            session_secret: require_secret("SESSION_SECRET")?,
            access_token_ttl_minutes: env::var("ACCESS_TOKEN_TTL_MINUTES")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .unwrap_or(15),
            refresh_token_ttl_days: env::var("REFRESH_TOKEN_TTL_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .unwrap_or(7),
            magic_link_ttl_minutes: env::var("MAGIC_LINK_TTL_MINUTES")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),

            // Cookies
            cookie_domain: env::var("COOKIE_DOMAIN").ok(),
            cookie_secure: env::var("COOKIE_SECURE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),

            // Email
            resend_api_key: env::var("RESEND_API_KEY").ok().filter(|k| !k.is_empty()),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Helpdesk <noreply@localhost>".to_string()),
        })
    }
}

/// Load a signing secret, rejecting values too short to be
/// cryptographically meaningful
fn require_secret(name: &'static str) -> Result<String, ConfigError> {
    let secret = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    if secret.len() < 32 {
        return Err(ConfigError::WeakSecret(name));
    }
    Ok(secret)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Weak secret: {0} must be at least 32 characters")]
    WeakSecret(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure config tests run serially (they modify shared env vars)
    static CONFIG_TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn setup_minimal_config() {
        env::set_var("DATABASE_URL", "postgres://test");
        env::set_var("AT_SECRET", "at-secret-must-be-at-least-32-characters!!");
        env::set_var("RT_SECRET", "rt-secret-must-be-at-least-32-characters!!");
        env::set_var(
            "SESSION_SECRET",
            "session-secret-must-be-at-least-32-chars!!",
        );
    }

    fn cleanup_config() {
        env::remove_var("DATABASE_URL");
        env::remove_var("AT_SECRET");
        env::remove_var("RT_SECRET");
        env::remove_var("SESSION_SECRET");
    }

    #[test]
    fn test_secret_validation() {
        let _lock = CONFIG_TEST_MUTEX.lock().unwrap();

        // === Missing secret ===
        setup_minimal_config();
        env::remove_var("AT_SECRET");
        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::Missing("AT_SECRET"))));

        // === Short secret rejected ===
        env::set_var("AT_SECRET", "too-short");
        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::WeakSecret("AT_SECRET"))));

        // === Valid configuration ===
        setup_minimal_config();
        let config = Config::from_env().expect("valid config should load");
        assert_eq!(config.access_token_ttl_minutes, 15);
        assert_eq!(config.refresh_token_ttl_days, 7);
        assert_eq!(config.magic_link_ttl_minutes, 10);
        assert!(!config.cookie_secure);

        cleanup_config();
    }
}
