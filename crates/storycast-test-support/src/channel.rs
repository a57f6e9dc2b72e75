//! Recording channel: an `EventChannel` whose traffic tests script.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use storycast_core::channel::{ChannelEnvelope, ChannelSignal, ChannelSubscription, EventChannel};
use storycast_core::error::PresentationError;
use storycast_core::event::ChannelEvent;
use storycast_core::ids::ClientId;
use tokio::sync::broadcast;

/// A channel that records every emitted event and delivers only the
/// signals a test injects.
#[derive(Debug)]
pub struct RecordingChannel {
    client_id: ClientId,
    emitted: Mutex<Vec<ChannelEvent>>,
    sender: broadcast::Sender<ChannelEnvelope>,
    failing: AtomicBool,
}

impl RecordingChannel {
    /// Creates a channel with nothing recorded.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            client_id: ClientId::new(),
            emitted: Mutex::new(Vec::new()),
            sender,
            failing: AtomicBool::new(false),
        }
    }

    /// Returns a snapshot of all emitted events.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn emitted(&self) -> Vec<ChannelEvent> {
        self.emitted.lock().unwrap().clone()
    }

    /// Returns emitted events with the given wire name.
    pub fn emitted_of(&self, event_type: &str) -> Vec<ChannelEvent> {
        self.emitted()
            .into_iter()
            .filter(|event| event.event_type() == event_type)
            .collect()
    }

    /// Forgets everything emitted so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn clear(&self) {
        self.emitted.lock().unwrap().clear();
    }

    /// Makes subsequent emits fail with `ChannelUnavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delivers a signal to every subscription.
    pub fn inject(&self, signal: ChannelSignal) {
        let _ = self.sender.send(ChannelEnvelope {
            origin: None,
            target: None,
            signal,
        });
    }
}

impl Default for RecordingChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventChannel for RecordingChannel {
    async fn emit(&self, event: ChannelEvent) -> Result<(), PresentationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PresentationError::ChannelUnavailable(
                "recording channel set to fail".into(),
            ));
        }
        self.emitted.lock().unwrap().push(event);
        Ok(())
    }

    fn subscribe(&self) -> ChannelSubscription {
        ChannelSubscription::new(self.sender.subscribe(), self.client_id, false)
    }
}
