//! WebSocket support for realtime ticket updates
//!
//! # Architecture
//!
//! - **Connection**: an authenticated WebSocket connection
//! - **Room**: ticket-based pub/sub for broadcasting events
//! - **State**: global realtime state shared across all connections
//! - **Handler**: Axum WebSocket route handler
//! - **Events**: typed client/server event definitions

pub mod connection;
pub mod events;
pub mod handler;
pub mod room;
pub mod state;

pub use handler::ws_handler;
pub use state::WebSocketState;
