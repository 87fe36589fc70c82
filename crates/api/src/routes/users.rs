//! User endpoints

use axum::{extract::State, Extension, Json};

use helpdesk_shared::User;

use crate::auth::middleware::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::store::UserStore;

/// `GET /api/users/me` — the full user record (credentials are skipped
/// during serialization)
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<User>> {
    let user = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or(ApiError::AccessDenied)?;
    Ok(Json(user))
}
