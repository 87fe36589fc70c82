//! Credential extraction from request headers
//!
//! HTTP and websocket entry points accept credentials from more than one
//! carrier; cookies are preferred over the Authorization header so that
//! browser sessions win over stale programmatic tokens.

use axum::http::{header, HeaderMap};

use crate::auth::cookies::{ACCESS_COOKIE, REFRESH_COOKIE};

/// Read one cookie value out of the Cookie header
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

/// Read a token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Access token: cookie first, then bearer header
pub fn access_token_from_headers(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, ACCESS_COOKIE).or_else(|| bearer_token(headers))
}

/// Refresh token: cookie first, then bearer header
pub fn refresh_token_from_headers(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, REFRESH_COOKIE).or_else(|| bearer_token(headers))
}
