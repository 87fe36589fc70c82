//! Request authentication middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::extract::access_token_from_headers;
use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, inserted as a request extension by
/// [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Reject requests without a valid access token (cookie or bearer)
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = access_token_from_headers(request.headers()).ok_or(ApiError::AccessDenied)?;
    let claims = state.jwt.validate_access(&token)?;

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        email: claims.email,
    });

    Ok(next.run(request).await)
}
