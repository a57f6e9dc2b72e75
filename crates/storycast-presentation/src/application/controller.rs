//! Session controller.
//!
//! Owns the inactive/active lifecycle, the held session identity and this
//! client's authority. Announces lifecycle changes on the channel and drives
//! the display bridge's start and end screens.

use std::sync::Arc;

use storycast_core::channel::EventChannel;
use storycast_core::clock::Clock;
use storycast_core::error::PresentationError;
use storycast_core::event::ChannelEvent;
use storycast_core::ids::{ClientId, NodeId, SessionId};
use tracing::{info, instrument, warn};

use super::bridge::{DisplayBridge, WAITING_MESSAGE};
use crate::domain::session::{Authority, Session, SessionState};

/// Presentation lifecycle for one client.
pub struct SessionController {
    client_id: ClientId,
    authority: Authority,
    channel: Arc<dyn EventChannel>,
    bridge: DisplayBridge,
    clock: Arc<dyn Clock>,
    state: SessionState,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("client_id", &self.client_id)
            .field("authority", &self.authority)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Creates an inactive controller. Authority is fixed for its lifetime.
    #[must_use]
    pub fn new(
        client_id: ClientId,
        authority: Authority,
        channel: Arc<dyn EventChannel>,
        bridge: DisplayBridge,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client_id,
            authority,
            channel,
            bridge,
            clock,
            state: SessionState::new(),
        }
    }

    /// This client's id; for a host, its host id.
    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// This client's authority.
    #[must_use]
    pub fn authority(&self) -> Authority {
        self.authority
    }

    /// Returns `true` for the host.
    #[must_use]
    pub fn is_host(&self) -> bool {
        self.authority == Authority::Host
    }

    /// Returns `true` in the active state.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// The held session identity.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.state.session_id()
    }

    /// The session as seen by this client.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.state.session()
    }

    /// Returns `true` if traffic scoped to `session_id` belongs to this client.
    #[must_use]
    pub fn accepts(&self, session_id: SessionId) -> bool {
        self.state.accepts(session_id)
    }

    /// Starts presenting. Mints a session id unless one is held, waits for
    /// the display surface, then goes active, announces `session.start` and
    /// pushes the first screen. Starting while active returns the running
    /// session.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a follower, or `DisplaySurfaceUnavailable`
    /// when the display cannot be readied; the controller is then unchanged.
    #[instrument(skip(self), fields(client_id = %self.client_id))]
    pub async fn start(&mut self, current_node: Option<NodeId>) -> Result<Session, PresentationError> {
        if !self.is_host() {
            return Err(PresentationError::Validation(
                "only the host can start a presentation".into(),
            ));
        }
        if let Some(session) = self.state.session().filter(|session| session.active) {
            return Ok(session);
        }

        let session_id = self.state.session_id().unwrap_or_default();
        if let Err(error) = self.bridge.ensure_ready().await {
            warn!(%error, "display surface not ready, presentation not started");
            return Err(error);
        }

        self.state
            .activate(session_id, Some(self.client_id), self.clock.now());
        info!(session_id = %session_id, "presentation started");

        self.broadcast(ChannelEvent::SessionStart {
            session_id,
            host_id: self.client_id,
            node_id: current_node,
        })
        .await;
        match current_node {
            Some(node_id) => self.bridge.load_node(node_id, session_id),
            None => self.bridge.show_message(WAITING_MESSAGE),
        };

        self.state.session().ok_or_else(|| {
            PresentationError::Infrastructure("session missing after activation".into())
        })
    }

    /// Stops presenting. Always leaves the controller inactive; announces
    /// `session.end` only when an identity was held. Returns that identity.
    #[instrument(skip(self), fields(client_id = %self.client_id))]
    pub async fn end(&mut self) -> Option<SessionId> {
        let ended = self.state.deactivate();
        if let Some(session_id) = ended {
            info!(session_id = %session_id, "presentation ended");
            self.broadcast(ChannelEvent::SessionEnd { session_id }).await;
        }
        self.bridge.session_ended();
        ended
    }

    /// Applies a `session.end` received from the channel and shows the
    /// ended screen. Returns `false` if it was for a session this client
    /// does not hold.
    pub fn end_remote(&mut self, session_id: SessionId) -> bool {
        if !self.release(session_id) {
            return false;
        }
        self.bridge.session_ended();
        true
    }

    /// Session bookkeeping of [`Self::end_remote`] without touching the
    /// display.
    pub fn release(&mut self, session_id: SessionId) -> bool {
        if self.state.session_id() != Some(session_id) {
            return false;
        }
        self.state.deactivate();
        info!(session_id = %session_id, "presentation ended remotely");
        true
    }

    /// Joins a session announced by someone else. Returns `false` if a
    /// different identity is held.
    pub fn join(&mut self, session_id: SessionId, host_id: Option<ClientId>) -> bool {
        let joined = self.state.activate(session_id, host_id, self.clock.now());
        if joined {
            info!(session_id = %session_id, "joined presentation");
        }
        joined
    }

    /// Holds `session_id` if nothing is held yet, without activating.
    pub fn adopt(&mut self, session_id: SessionId) -> bool {
        self.state.adopt(session_id)
    }

    /// Broadcasts a local navigation when this client is the active host.
    /// Returns `true` if the event was emitted.
    pub async fn announce_navigation(&self, node_id: NodeId) -> bool {
        let Some(session_id) = self.state.session_id() else {
            return false;
        };
        if !self.is_host() || !self.state.is_active() {
            return false;
        }
        self.broadcast(ChannelEvent::Navigate {
            session_id,
            node_id,
            refresh: false,
        })
        .await
    }

    /// Re-announces the running session after a reconnect so the channel's
    /// session table is restored.
    pub async fn reannounce(&self, current_node: Option<NodeId>) -> bool {
        let Some(session_id) = self.state.session_id() else {
            return false;
        };
        if !self.is_host() || !self.state.is_active() {
            return false;
        }
        self.broadcast(ChannelEvent::SessionStart {
            session_id,
            host_id: self.client_id,
            node_id: current_node,
        })
        .await
    }

    /// Answers a resync query when this client is the active host. Returns
    /// `true` if an answer was emitted.
    pub async fn answer(&self, query: &ChannelEvent, current_node: Option<NodeId>) -> bool {
        let Some(held) = self.state.session_id() else {
            return false;
        };
        if !self.is_host() || !self.state.is_active() {
            return false;
        }
        let reply = match query {
            ChannelEvent::WhoIsHost { .. } => ChannelEvent::HostInfo {
                session_id: Some(held),
                active: true,
            },
            ChannelEvent::WhatIsCurrentNode { session_id } if *session_id == held => {
                ChannelEvent::CurrentNode {
                    session_id: held,
                    node_id: current_node,
                }
            }
            _ => return false,
        };
        self.broadcast(reply).await
    }

    /// Emits on the channel; a failure is logged, not propagated, because
    /// local state stays authoritative while disconnected.
    pub async fn broadcast(&self, event: ChannelEvent) -> bool {
        let event_type = event.event_type();
        match self.channel.emit(event).await {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, event_type, "channel emit failed");
                false
            }
        }
    }
}
