//! Shared application state.

use std::sync::Arc;

use crate::hub::RelayHub;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Fan-out hub and session table.
    pub hub: Arc<RelayHub>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(hub: Arc<RelayHub>) -> Self {
        Self { hub }
    }
}
