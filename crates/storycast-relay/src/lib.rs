//! Storycast — channel relay server.
//!
//! Fans presentation channel events out to every connected client and
//! answers resync queries from its own session table.

pub mod config;
pub mod error;
pub mod hub;
pub mod routes;
pub mod state;

use axum::Router;

/// Builds the relay router over `state`, without middleware layers.
pub fn router(state: state::AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::ws::router())
        .nest("/sessions", routes::sessions::router())
        .with_state(state)
}
