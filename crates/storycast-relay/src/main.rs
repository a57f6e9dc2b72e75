//! Storycast relay server entry point.

use std::sync::Arc;

use storycast_relay::config::RelayConfig;
use storycast_relay::error::AppError;
use storycast_relay::hub::RelayHub;
use storycast_relay::state::AppState;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Storycast relay");

    let config = RelayConfig::from_env()?;
    let addr = config.socket_addr()?;

    let state = AppState::new(Arc::new(RelayHub::default()));
    // TODO: Replace CorsLayer::permissive() with the presenter app's origin.
    let app = storycast_relay::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
