//! Ticket lifecycle and authorization

pub mod engine;

pub use engine::{TicketDetail, TicketEngine};
