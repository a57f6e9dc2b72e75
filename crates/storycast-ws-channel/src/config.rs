//! WebSocket channel configuration.

use std::time::Duration;

use storycast_core::error::PresentationError;

/// First reconnect delay after a failed or dropped connection.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
/// Ceiling for the doubling reconnect delay.
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 10;
/// Signals buffered per subscriber before it starts lagging.
pub const DEFAULT_CAPACITY: usize = 256;

/// Where the relay lives and how eagerly to reconnect to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsChannelConfig {
    /// Full WebSocket URL, e.g. `ws://relay:3001/ws`.
    pub url: String,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub capacity: usize,
}

impl WsChannelConfig {
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_secs(DEFAULT_MAX_BACKOFF_SECS),
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Overrides the reconnect delays.
    #[must_use]
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    /// Reads `RELAY_WS_URL` (required).
    ///
    /// # Errors
    ///
    /// Returns `PresentationError::Validation` if the URL is missing or is
    /// not a `ws://` or `wss://` URL.
    pub fn from_env() -> Result<Self, PresentationError> {
        Self::from_var(std::env::var("RELAY_WS_URL").ok())
    }

    fn from_var(url: Option<String>) -> Result<Self, PresentationError> {
        let url = url
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| PresentationError::Validation("RELAY_WS_URL must be set".into()))?;
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(PresentationError::Validation(format!(
                "RELAY_WS_URL must use ws:// or wss://: {url}"
            )));
        }
        Ok(Self::new(&url))
    }

    /// Delay to use after `current`: doubled, capped at `max_backoff`.
    #[must_use]
    pub fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_backoff)
    }
}
