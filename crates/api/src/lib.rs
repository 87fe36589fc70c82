//! Helpdesk API Library
//!
//! This crate contains the API server components for the helpdesk backend.

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod routes;
pub mod state;
pub mod store;
pub mod tickets;
pub mod websocket;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
