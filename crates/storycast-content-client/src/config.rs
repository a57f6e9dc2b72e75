//! Content client configuration.

use std::time::Duration;

use storycast_core::error::PresentationError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where the content service lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentClientConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ContentClientConfig {
    /// Creates a config with the default timeout.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Reads `CONTENT_SERVICE_URL` (required) and
    /// `CONTENT_SERVICE_TIMEOUT_SECS` (default 10).
    ///
    /// # Errors
    ///
    /// Returns `PresentationError::Validation` if the URL is missing or the
    /// timeout is not a whole number of seconds.
    pub fn from_env() -> Result<Self, PresentationError> {
        Self::from_vars(
            std::env::var("CONTENT_SERVICE_URL").ok(),
            std::env::var("CONTENT_SERVICE_TIMEOUT_SECS").ok(),
        )
    }

    fn from_vars(url: Option<String>, timeout: Option<String>) -> Result<Self, PresentationError> {
        let url = url.filter(|url| !url.trim().is_empty()).ok_or_else(|| {
            PresentationError::Validation("CONTENT_SERVICE_URL must be set".into())
        })?;
        let mut config = Self::new(&url);
        if let Some(raw) = timeout {
            let secs: u64 = raw.parse().map_err(|_| {
                PresentationError::Validation(format!(
                    "CONTENT_SERVICE_TIMEOUT_SECS is not a number of seconds: {raw}"
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}
