//! API routes

pub mod auth;
pub mod health;
pub mod tickets;
pub mod users;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{auth::require_auth, state::AppState, websocket::ws_handler};

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/signin", post(auth::signin))
        .route("/auth/magic-link", post(auth::request_magic_link))
        .route("/auth/verify-magic-link", get(auth::verify_magic_link))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/google/callback", post(auth::google_callback));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/users/me", get(users::me))
        .route("/tickets", post(tickets::create).get(tickets::list))
        .route("/tickets/:id", get(tickets::get_one))
        .route("/tickets/:id/replies", post(tickets::add_reply))
        .route("/tickets/:id/status", patch(tickets::update_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health))
        .route("/ws", get(ws_handler))
        .nest("/api", public_routes.merge(protected_routes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
