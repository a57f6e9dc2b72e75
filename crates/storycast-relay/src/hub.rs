//! Relay hub: session table plus fan-out.
//!
//! `ingest` is pure bookkeeping and decides who receives what; `publish`
//! additionally puts the deliveries on the broadcast bus every WebSocket
//! connection subscribes to.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use storycast_core::channel::{ChannelEnvelope, ChannelSignal, ChannelSubscription};
use storycast_core::event::ChannelEvent;
use storycast_core::ids::{ClientId, NodeId, SessionId};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Signals buffered per connection before a slow reader starts lagging.
pub const DEFAULT_CAPACITY: usize = 256;

/// What the relay knows about one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub host_id: ClientId,
    pub active: bool,
    pub current_node_id: Option<NodeId>,
}

/// Where an ingested event goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Back to the sender only.
    Reply(ChannelEvent),
    /// To every connection except the sender.
    Broadcast(ChannelEvent),
}

#[derive(Debug, Default)]
struct Table {
    sessions: HashMap<SessionId, SessionRecord>,
    latest: Option<SessionId>,
}

/// Shared relay state.
#[derive(Debug)]
pub struct RelayHub {
    table: Mutex<Table>,
    sender: broadcast::Sender<ChannelEnvelope>,
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RelayHub {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            table: Mutex::new(Table::default()),
            sender,
        }
    }

    // Held only for map updates, never across an await.
    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes a connection. The subscription filters out the
    /// connection's own broadcasts and other connections' replies.
    #[must_use]
    pub fn subscribe(&self, client_id: ClientId) -> ChannelSubscription {
        ChannelSubscription::new(self.sender.subscribe(), client_id, false)
    }

    /// The relay's record of `session_id`.
    #[must_use]
    pub fn session(&self, session_id: SessionId) -> Option<SessionRecord> {
        self.lock().sessions.get(&session_id).cloned()
    }

    /// Number of sessions the relay is tracking.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Updates the session table for `event` and returns its deliveries.
    pub fn ingest(&self, event: ChannelEvent) -> Vec<Delivery> {
        let mut table = self.lock();
        match &event {
            ChannelEvent::SessionStart {
                session_id,
                host_id,
                node_id,
            } => {
                info!(%session_id, %host_id, "session opened");
                table.sessions.insert(
                    *session_id,
                    SessionRecord {
                        session_id: *session_id,
                        host_id: *host_id,
                        active: true,
                        current_node_id: *node_id,
                    },
                );
                table.latest = Some(*session_id);
            }
            ChannelEvent::Navigate {
                session_id,
                node_id,
                ..
            } => {
                if let Some(record) = table.sessions.get_mut(session_id) {
                    record.current_node_id = Some(*node_id);
                }
            }
            ChannelEvent::SessionEnd { session_id } => {
                if table.sessions.remove(session_id).is_some() {
                    info!(%session_id, open = table.sessions.len(), "session closed");
                }
                if table.latest == Some(*session_id) {
                    table.latest = None;
                }
            }
            ChannelEvent::WhoIsHost { session_id } => {
                let record = session_id
                    .or(table.latest)
                    .and_then(|id| table.sessions.get(&id))
                    .filter(|record| record.active);
                return vec![Delivery::Reply(ChannelEvent::HostInfo {
                    session_id: record.map(|record| record.session_id),
                    active: record.is_some(),
                })];
            }
            ChannelEvent::WhatIsCurrentNode { session_id } => {
                let node_id = table
                    .sessions
                    .get(session_id)
                    .filter(|record| record.active)
                    .and_then(|record| record.current_node_id);
                return vec![Delivery::Reply(ChannelEvent::CurrentNode {
                    session_id: *session_id,
                    node_id,
                })];
            }
            ChannelEvent::HostInfo { .. }
            | ChannelEvent::CurrentNode { .. }
            | ChannelEvent::Toggle { .. } => {}
        }
        vec![Delivery::Broadcast(event)]
    }

    /// Ingests an event from `origin` and sends its deliveries. Returns the
    /// deliveries made.
    pub fn publish(&self, origin: ClientId, event: ChannelEvent) -> Vec<Delivery> {
        let event_type = event.event_type();
        let deliveries = self.ingest(event);
        for delivery in &deliveries {
            let envelope = match delivery {
                Delivery::Reply(reply) => {
                    ChannelEnvelope::directed(origin, ChannelSignal::Event(reply.clone()))
                }
                Delivery::Broadcast(event) => ChannelEnvelope::broadcast(origin, event.clone()),
            };
            // No receivers just means no client is connected.
            let _ = self.sender.send(envelope);
        }
        debug!(%origin, event_type, deliveries = deliveries.len(), "event relayed");
        deliveries
    }
}
