//! Secondary display surface messaging.
//!
//! The display surface renders whatever the presenting client tells it to.
//! Delivery is one-way and fire-and-forget; the transport is whatever the
//! embedding environment provides.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::PresentationError;
use crate::ids::{NodeId, SessionId};

/// Structured message for the display surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayMessage {
    /// Render a node.
    #[serde(rename_all = "camelCase")]
    LoadNode {
        /// The node to render.
        node_id: NodeId,
        /// The session it is rendered for.
        session_id: SessionId,
    },
    /// Show a plain message instead of a node.
    ShowMessage {
        /// The text to show.
        text: String,
    },
    /// The session has ended.
    SessionEnded {},
}

/// A rendering target that accepts [`DisplayMessage`]s.
#[async_trait]
pub trait DisplaySurface: Send + Sync {
    /// Makes the surface ready to receive messages, opening it if needed.
    async fn ensure_ready(&self) -> Result<(), PresentationError>;

    /// Hands a message to the surface without waiting for it to be rendered.
    fn post(&self, message: &DisplayMessage) -> Result<(), PresentationError>;
}

/// A display surface fed through an in-process channel; the receiving half
/// belongs to the renderer.
#[derive(Debug, Clone)]
pub struct ChannelDisplaySurface {
    sender: mpsc::UnboundedSender<DisplayMessage>,
}

impl ChannelDisplaySurface {
    /// Creates a surface and the receiver the renderer reads from.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DisplayMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl DisplaySurface for ChannelDisplaySurface {
    async fn ensure_ready(&self) -> Result<(), PresentationError> {
        if self.sender.is_closed() {
            return Err(PresentationError::DisplaySurfaceUnavailable(
                "renderer has closed".into(),
            ));
        }
        Ok(())
    }

    fn post(&self, message: &DisplayMessage) -> Result<(), PresentationError> {
        self.sender
            .send(message.clone())
            .map_err(|_| PresentationError::DisplaySurfaceUnavailable("renderer has closed".into()))
    }
}
