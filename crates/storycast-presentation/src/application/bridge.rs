//! Display bridge.
//!
//! Fire-and-forget delivery to the secondary display surface. A delivery
//! failure is logged and reported as `false`; it never unwinds the caller.

use std::sync::Arc;

use storycast_core::display::{DisplayMessage, DisplaySurface};
use storycast_core::error::PresentationError;
use storycast_core::ids::{NodeId, SessionId};
use tracing::{debug, warn};

/// Text shown while a session has no node selected.
pub const WAITING_MESSAGE: &str = "Waiting for the presenter to choose an encounter";

/// Sends structured messages to the display surface.
#[derive(Clone)]
pub struct DisplayBridge {
    surface: Arc<dyn DisplaySurface>,
}

impl std::fmt::Debug for DisplayBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayBridge").finish_non_exhaustive()
    }
}

impl DisplayBridge {
    /// Creates a bridge to `surface`.
    #[must_use]
    pub fn new(surface: Arc<dyn DisplaySurface>) -> Self {
        Self { surface }
    }

    /// Opens the surface if needed and waits until it can receive messages.
    ///
    /// # Errors
    ///
    /// Returns `DisplaySurfaceUnavailable` if the surface cannot be opened.
    pub async fn ensure_ready(&self) -> Result<(), PresentationError> {
        self.surface.ensure_ready().await
    }

    /// Hands `message` to the surface. Returns `false` if delivery failed.
    pub fn send(&self, message: &DisplayMessage) -> bool {
        match self.surface.post(message) {
            Ok(()) => {
                debug!(?message, "display message delivered");
                true
            }
            Err(error) => {
                warn!(%error, ?message, "display message not delivered");
                false
            }
        }
    }

    /// Tells the surface to render `node_id`.
    pub fn load_node(&self, node_id: NodeId, session_id: SessionId) -> bool {
        self.send(&DisplayMessage::LoadNode {
            node_id,
            session_id,
        })
    }

    /// Tells the surface to show `text` instead of a node.
    pub fn show_message(&self, text: &str) -> bool {
        self.send(&DisplayMessage::ShowMessage {
            text: text.to_owned(),
        })
    }

    /// Tells the surface the session is over.
    pub fn session_ended(&self) -> bool {
        self.send(&DisplayMessage::SessionEnded {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storycast_test_support::RecordingDisplaySurface;

    #[test]
    fn test_load_node_reaches_surface() {
        let surface = Arc::new(RecordingDisplaySurface::new());
        let bridge = DisplayBridge::new(surface.clone());
        let (node_id, session_id) = (NodeId::new(), SessionId::new());

        assert!(bridge.load_node(node_id, session_id));

        assert_eq!(
            surface.messages(),
            vec![DisplayMessage::LoadNode {
                node_id,
                session_id
            }]
        );
    }

    #[test]
    fn test_unavailable_surface_is_reported_not_raised() {
        let surface = Arc::new(RecordingDisplaySurface::unavailable());
        let bridge = DisplayBridge::new(surface.clone());

        assert!(!bridge.show_message(WAITING_MESSAGE));
        assert!(!bridge.session_ended());
        assert!(surface.messages().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_ready_propagates_surface_error() {
        let bridge = DisplayBridge::new(Arc::new(RecordingDisplaySurface::unavailable()));

        let result = bridge.ensure_ready().await;

        assert!(matches!(
            result,
            Err(PresentationError::DisplaySurfaceUnavailable(_))
        ));
    }
}
