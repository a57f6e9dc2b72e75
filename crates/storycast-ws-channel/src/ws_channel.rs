//! [`EventChannel`] over a WebSocket connection to the relay.
//!
//! A background task owns the socket. It reconnects with doubling backoff,
//! forwards outbound events as text frames and republishes inbound frames
//! to local subscribers. Opening and losing the socket are reported to
//! this client only, as `Connected` and `Disconnected`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use storycast_core::channel::{ChannelEnvelope, ChannelSignal, ChannelSubscription, EventChannel};
use storycast_core::error::PresentationError;
use storycast_core::event::ChannelEvent;
use storycast_core::ids::ClientId;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::config::WsChannelConfig;

/// One client's WebSocket link to the relay. Dropping it closes the link.
#[derive(Debug)]
pub struct WsChannel {
    client_id: ClientId,
    sender: broadcast::Sender<ChannelEnvelope>,
    outbound: mpsc::Sender<ChannelEvent>,
    online: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl WsChannel {
    /// Starts connecting to `config.url` in the background.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(config: WsChannelConfig, client_id: ClientId) -> Self {
        let (sender, _) = broadcast::channel(config.capacity);
        let (outbound, outbound_rx) = mpsc::channel(config.capacity);
        let online = Arc::new(AtomicBool::new(false));
        let link = Link {
            config,
            client_id,
            sender: sender.clone(),
            online: Arc::clone(&online),
        };
        let task = tokio::spawn(link.run(outbound_rx));
        Self {
            client_id,
            sender,
            outbound,
            online,
            task,
        }
    }

    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Returns `true` while a socket to the relay is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl EventChannel for WsChannel {
    async fn emit(&self, event: ChannelEvent) -> Result<(), PresentationError> {
        if !self.is_connected() {
            return Err(PresentationError::ChannelUnavailable(
                "relay connection is down".into(),
            ));
        }
        self.outbound.send(event).await.map_err(|_| {
            PresentationError::ChannelUnavailable("relay connection task has stopped".into())
        })
    }

    fn subscribe(&self) -> ChannelSubscription {
        ChannelSubscription::new(self.sender.subscribe(), self.client_id, self.is_connected())
    }
}

/// State owned by the connection task.
struct Link {
    config: WsChannelConfig,
    client_id: ClientId,
    sender: broadcast::Sender<ChannelEnvelope>,
    online: Arc<AtomicBool>,
}

impl Link {
    async fn run(self, mut outbound: mpsc::Receiver<ChannelEvent>) {
        let mut backoff = self.config.initial_backoff;
        loop {
            let socket = match connect_async(self.config.url.as_str()).await {
                Ok((socket, _)) => socket,
                Err(error) => {
                    warn!(url = %self.config.url, %error, ?backoff, "relay connect failed");
                    tokio::time::sleep(backoff).await;
                    backoff = self.config.next_backoff(backoff);
                    continue;
                }
            };
            backoff = self.config.initial_backoff;

            // Online before the signal, so a subscriber created in between
            // still starts with `Connected`.
            self.online.store(true, Ordering::SeqCst);
            info!(client_id = %self.client_id, url = %self.config.url, "relay connected");
            self.signal(ChannelSignal::Connected);

            let (mut sink, mut stream) = socket.split();
            let handle_alive = loop {
                tokio::select! {
                    frame = stream.next() => match frame {
                        Some(Ok(Message::Text(text))) => self.deliver(text.as_str()),
                        Some(Ok(Message::Close(_))) | None => break true,
                        Some(Ok(_)) => {}
                        Some(Err(error)) => {
                            warn!(client_id = %self.client_id, %error, "relay socket error");
                            break true;
                        }
                    },
                    event = outbound.recv() => {
                        let Some(event) = event else { break false };
                        if let Err(error) = sink.send(Message::Text(event.encode().into())).await {
                            warn!(client_id = %self.client_id, %error, "relay send failed");
                            break true;
                        }
                    }
                }
            };

            self.online.store(false, Ordering::SeqCst);
            let _ = sink.close().await;
            // Events queued for the dead socket would be stale after a resync.
            let mut stale = 0_usize;
            while outbound.try_recv().is_ok() {
                stale += 1;
            }
            info!(client_id = %self.client_id, stale, "relay disconnected");
            self.signal(ChannelSignal::Disconnected);

            if !handle_alive {
                debug!(client_id = %self.client_id, "channel handle dropped, stopping");
                return;
            }
            tokio::time::sleep(backoff).await;
        }
    }

    fn signal(&self, signal: ChannelSignal) {
        // No receivers just means nobody has subscribed yet.
        let _ = self
            .sender
            .send(ChannelEnvelope::directed(self.client_id, signal));
    }

    fn deliver(&self, text: &str) {
        match ChannelEvent::decode(text) {
            Ok(event) => {
                let _ = self.sender.send(ChannelEnvelope {
                    origin: None,
                    target: None,
                    signal: ChannelSignal::Event(event),
                });
            }
            Err(error) => warn!(client_id = %self.client_id, %error, "dropping unrecognized frame"),
        }
    }
}
