//! Session cookie construction
//!
//! Both tokens of a pair travel as HttpOnly cookies. `SameSite=Lax` keeps
//! them off cross-site subrequests while still surviving the top-level
//! redirect back from a magic link or OAuth callback.

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};

use crate::auth::jwt::{JwtManager, TokenPair};
use crate::config::Config;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

fn build_cookie(config: &Config, name: &str, value: &str, max_age: i64) -> String {
    let mut cookie = format!("{name}={value}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}");
    if let Some(domain) = &config.cookie_domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn append(headers: &mut HeaderMap, cookie: String) {
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        headers.append(SET_COOKIE, value);
    }
}

/// Set-Cookie headers installing a token pair
pub fn session_cookies(config: &Config, jwt: &JwtManager, pair: &TokenPair) -> HeaderMap {
    let mut headers = HeaderMap::new();
    append(
        &mut headers,
        build_cookie(
            config,
            ACCESS_COOKIE,
            &pair.access_token,
            jwt.access_ttl_seconds(),
        ),
    );
    append(
        &mut headers,
        build_cookie(
            config,
            REFRESH_COOKIE,
            &pair.refresh_token,
            jwt.refresh_ttl_seconds(),
        ),
    );
    headers
}

/// Set-Cookie headers expiring both session cookies
pub fn clear_session_cookies(config: &Config) -> HeaderMap {
    let mut headers = HeaderMap::new();
    append(&mut headers, build_cookie(config, ACCESS_COOKIE, "", 0));
    append(&mut headers, build_cookie(config, REFRESH_COOKIE, "", 0));
    headers
}
