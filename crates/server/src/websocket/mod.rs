//! WebSocket module: dashboard event stream

pub mod events;
pub mod handler;
