//! Recording display surface.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use storycast_core::display::{DisplayMessage, DisplaySurface};
use storycast_core::error::PresentationError;

/// A display surface that records every delivered message and can be made
/// unavailable.
#[derive(Debug)]
pub struct RecordingDisplaySurface {
    messages: Mutex<Vec<DisplayMessage>>,
    available: AtomicBool,
}

impl RecordingDisplaySurface {
    /// Creates an available surface with nothing recorded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Creates a surface whose readiness check and deliveries fail.
    #[must_use]
    pub fn unavailable() -> Self {
        let surface = Self::new();
        surface.set_available(false);
        surface
    }

    /// Opens or closes the surface.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns a snapshot of delivered messages.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn messages(&self) -> Vec<DisplayMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Returns the most recently delivered message.
    pub fn last(&self) -> Option<DisplayMessage> {
        self.messages().pop()
    }

    /// Number of `LOAD_NODE` messages delivered.
    pub fn load_count(&self) -> usize {
        self.messages()
            .iter()
            .filter(|message| matches!(message, DisplayMessage::LoadNode { .. }))
            .count()
    }
}

impl Default for RecordingDisplaySurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DisplaySurface for RecordingDisplaySurface {
    async fn ensure_ready(&self) -> Result<(), PresentationError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PresentationError::DisplaySurfaceUnavailable(
                "display window is closed".into(),
            ))
        }
    }

    fn post(&self, message: &DisplayMessage) -> Result<(), PresentationError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(PresentationError::DisplaySurfaceUnavailable(
                "display window is closed".into(),
            ));
        }
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}
