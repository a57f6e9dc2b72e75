//! Real-time event channel abstraction.
//!
//! The channel is an injected dependency: the session controller and the
//! sync layer emit through [`EventChannel::emit`] and consume a
//! [`ChannelSubscription`]. Dropping a subscription unsubscribes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::PresentationError;
use crate::event::ChannelEvent;
use crate::ids::ClientId;

/// Something observed on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSignal {
    /// The transport (re)connected.
    Connected,
    /// The transport dropped. Local state is kept.
    Disconnected,
    /// An event from another client.
    Event(ChannelEvent),
}

/// A signal together with its routing information.
#[derive(Debug, Clone)]
pub struct ChannelEnvelope {
    /// The client that emitted the signal, if it came from a client.
    pub origin: Option<ClientId>,
    /// The only client that should see the signal; `None` means everyone.
    pub target: Option<ClientId>,
    /// The signal itself.
    pub signal: ChannelSignal,
}

impl ChannelEnvelope {
    /// Wraps an event broadcast by `origin` to everyone else.
    #[must_use]
    pub fn broadcast(origin: ClientId, event: ChannelEvent) -> Self {
        Self {
            origin: Some(origin),
            target: None,
            signal: ChannelSignal::Event(event),
        }
    }

    /// Wraps a signal addressed to a single client.
    #[must_use]
    pub fn directed(target: ClientId, signal: ChannelSignal) -> Self {
        Self {
            origin: None,
            target: Some(target),
            signal,
        }
    }
}

/// Receiving half of a channel, filtered for one client.
#[derive(Debug)]
pub struct ChannelSubscription {
    receiver: broadcast::Receiver<ChannelEnvelope>,
    client_id: ClientId,
    pending_connect: bool,
}

impl ChannelSubscription {
    /// Creates a subscription for `client_id`. When `connected` is set the
    /// first signal yielded is [`ChannelSignal::Connected`].
    #[must_use]
    pub fn new(
        receiver: broadcast::Receiver<ChannelEnvelope>,
        client_id: ClientId,
        connected: bool,
    ) -> Self {
        Self {
            receiver,
            client_id,
            pending_connect: connected,
        }
    }

    /// Waits for the next signal meant for this client. Returns `None` once
    /// the channel is closed.
    pub async fn recv(&mut self) -> Option<ChannelSignal> {
        if self.pending_connect {
            self.pending_connect = false;
            return Some(ChannelSignal::Connected);
        }
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => {
                    if envelope.origin == Some(self.client_id) {
                        continue;
                    }
                    if envelope.target.is_some_and(|target| target != self.client_id) {
                        continue;
                    }
                    return Some(envelope.signal);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(client_id = %self.client_id, skipped, "channel subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Bidirectional event channel.
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Broadcasts an event to every other client.
    async fn emit(&self, event: ChannelEvent) -> Result<(), PresentationError>;

    /// Subscribes to signals for this client.
    fn subscribe(&self) -> ChannelSubscription;
}

/// In-process channel bus. Each client gets its own [`LocalChannel`] handle
/// from [`LocalBus::connect`].
#[derive(Debug, Clone)]
pub struct LocalBus {
    sender: broadcast::Sender<ChannelEnvelope>,
}

impl LocalBus {
    /// Creates a bus buffering up to `capacity` signals per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns a connected channel handle for `client_id`.
    #[must_use]
    pub fn connect(&self, client_id: ClientId) -> LocalChannel {
        LocalChannel {
            client_id,
            sender: self.sender.clone(),
            online: Arc::new(AtomicBool::new(true)),
        }
    }
}

/// One client's handle on a [`LocalBus`].
#[derive(Debug, Clone)]
pub struct LocalChannel {
    client_id: ClientId,
    sender: broadcast::Sender<ChannelEnvelope>,
    online: Arc<AtomicBool>,
}

impl LocalChannel {
    /// Simulates a transport drop for this client.
    pub fn disconnect(&self) {
        self.online.store(false, Ordering::SeqCst);
        let _ = self.sender.send(ChannelEnvelope::directed(
            self.client_id,
            ChannelSignal::Disconnected,
        ));
    }

    /// Restores the transport and signals the reconnect to this client.
    pub fn reconnect(&self) {
        self.online.store(true, Ordering::SeqCst);
        let _ = self.sender.send(ChannelEnvelope::directed(
            self.client_id,
            ChannelSignal::Connected,
        ));
    }
}

#[async_trait]
impl EventChannel for LocalChannel {
    async fn emit(&self, event: ChannelEvent) -> Result<(), PresentationError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(PresentationError::ChannelUnavailable(
                "local channel is disconnected".into(),
            ));
        }
        // A send error only means nobody is subscribed yet.
        let _ = self
            .sender
            .send(ChannelEnvelope::broadcast(self.client_id, event));
        Ok(())
    }

    fn subscribe(&self) -> ChannelSubscription {
        ChannelSubscription::new(
            self.sender.subscribe(),
            self.client_id,
            self.online.load(Ordering::SeqCst),
        )
    }
}
