//! Presentation error taxonomy.

use thiserror::Error;

use crate::ids::NodeId;

/// Top-level error type shared by the cache, the path engine and the
/// presentation layer.
///
/// The type is `Clone` so one failed in-flight fetch can be reported to
/// every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresentationError {
    /// Network or server-side failure while fetching content. Retriable.
    #[error("transient fetch error: {0}")]
    TransientFetch(String),

    /// A route points at a node the content service reports as missing.
    #[error("invalid graph reference: node {0} not found")]
    InvalidGraphReference(NodeId),

    /// The real-time channel could not be reached.
    #[error("channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// The secondary display surface is missing or closed.
    #[error("display surface unavailable: {0}")]
    DisplaySurfaceUnavailable(String),

    /// Malformed input: an unrecognized channel payload or bad editor input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization or other internal failure.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl PresentationError {
    /// Returns `true` when re-invoking the failed operation may succeed.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::TransientFetch(_) | Self::ChannelUnavailable(_))
    }
}
