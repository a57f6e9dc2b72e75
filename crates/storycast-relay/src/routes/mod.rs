//! HTTP and WebSocket routes.

pub mod health;
pub mod sessions;
pub mod ws;
