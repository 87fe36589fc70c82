//! Authentication endpoints

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use helpdesk_shared::{GoogleProfile, Role, User};

use crate::auth::cookies::{clear_session_cookies, session_cookies};
use crate::auth::extract::refresh_token_from_headers;
use crate::auth::jwt::TokenPair;
use crate::auth::middleware::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::store::UserStore;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct MagicLinkRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: String,
}

/// A signed-in identity with its freshly minted token pair
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl SessionResponse {
    fn new(user: User, pair: TokenPair) -> Self {
        Self {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

fn validate_email(email: &str) -> ApiResult<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("A valid email is required".to_string()));
    }
    Ok(())
}

/// `POST /api/auth/signup` — send a signup magic link
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> ApiResult<Json<Value>> {
    validate_email(&request.email)?;
    if request.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if request.password != request.confirm_password {
        return Err(ApiError::Validation("Passwords do not match".to_string()));
    }

    state
        .magic_links
        .request_signup(
            request.email.trim(),
            &request.password,
            request.first_name.as_deref(),
        )
        .await?;

    Ok(Json(json!({
        "message": "Check your email to finish creating your account"
    })))
}

/// `POST /api/auth/signin`
pub async fn signin(
    State(state): State<AppState>,
    Json(request): Json<SigninRequest>,
) -> ApiResult<(HeaderMap, Json<SessionResponse>)> {
    let (user, pair) = state
        .sessions
        .sign_in(request.email.trim(), &request.password)
        .await?;

    let headers = session_cookies(&state.config, &state.jwt, &pair);
    Ok((headers, Json(SessionResponse::new(user, pair))))
}

/// `POST /api/auth/magic-link` — send a passwordless login link
pub async fn request_magic_link(
    State(state): State<AppState>,
    Json(request): Json<MagicLinkRequest>,
) -> ApiResult<Json<Value>> {
    validate_email(&request.email)?;
    state.magic_links.request_login(request.email.trim()).await?;

    Ok(Json(json!({
        "message": "Check your email for a sign-in link"
    })))
}

/// `GET /api/auth/verify-magic-link?token=` — consume a clicked link
///
/// Succeeds into a redirect to the frontend with session cookies set;
/// fails into a redirect to the frontend error page, never a bare error
/// body (the caller is a browser following an email link).
pub async fn verify_magic_link(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> (HeaderMap, Redirect) {
    let outcome = async {
        let user = state.magic_links.verify(&query.token).await?;
        let pair = state.sessions.issue_for(&user).await?;
        Ok::<_, ApiError>(pair)
    }
    .await;

    match outcome {
        Ok(pair) => {
            let headers = session_cookies(&state.config, &state.jwt, &pair);
            (headers, Redirect::to(&state.config.frontend_url))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Magic link verification failed");
            let target = format!(
                "{}/auth/error",
                state.config.frontend_url.trim_end_matches('/')
            );
            (HeaderMap::new(), Redirect::to(&target))
        }
    }
}

/// `POST /api/auth/refresh` — rotate the refresh token into a new pair
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<(HeaderMap, Json<SessionResponse>)> {
    let token = refresh_token_from_headers(&headers).ok_or(ApiError::AccessDenied)?;
    let (user, pair) = state.sessions.refresh(&token).await?;

    let headers = session_cookies(&state.config, &state.jwt, &pair);
    Ok((headers, Json(SessionResponse::new(user, pair))))
}

/// `POST /api/auth/logout` — revoke the session and clear cookies
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<(HeaderMap, Json<Value>)> {
    state.sessions.sign_out(auth.user_id).await?;

    let headers = clear_session_cookies(&state.config);
    Ok((headers, Json(json!({ "message": "Signed out" }))))
}

/// `POST /api/auth/google/callback` — link an externally-verified Google
/// profile and start a session
pub async fn google_callback(
    State(state): State<AppState>,
    Json(profile): Json<GoogleProfile>,
) -> ApiResult<(HeaderMap, Json<SessionResponse>)> {
    validate_email(&profile.email)?;
    let user = state.identity.link(&profile).await?;
    let pair = state.sessions.issue_for(&user).await?;

    let headers = session_cookies(&state.config, &state.jwt, &pair);
    Ok((headers, Json(SessionResponse::new(user, pair))))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: Uuid,
    pub name: Option<String>,
    pub role: Role,
    pub email: String,
}

/// `GET /api/auth/me`
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<MeResponse>> {
    let user = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or(ApiError::AccessDenied)?;

    Ok(Json(MeResponse {
        id: user.id,
        name: user.name(),
        role: user.role,
        email: user.email,
    }))
}
