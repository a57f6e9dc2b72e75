//! Session identity and lifecycle state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use storycast_core::ids::{ClientId, SessionId};

/// Whether a client's own navigation is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Authority {
    /// Drives navigation and broadcasts it.
    Host,
    /// Renders whatever inbound events dictate and never re-emits them.
    Follower,
}

/// One live presentation as seen by this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session identity; the scoping key for channel traffic.
    pub session_id: SessionId,
    /// The presenting host. `None` when the session was joined through a
    /// resync answer that does not name the host.
    pub host_id: Option<ClientId>,
    /// Whether the session is live.
    pub active: bool,
    /// When this client saw the session start.
    pub started_at: Option<DateTime<Utc>>,
}

/// Two-state lifecycle (inactive, active) plus the held session identity.
///
/// Once an identity is held it only changes by ending the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    session_id: Option<SessionId>,
    host_id: Option<ClientId>,
    started_at: Option<DateTime<Utc>>,
    active: bool,
}

impl SessionState {
    /// Creates an inactive state holding no identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The held session identity.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// Returns `true` in the active state.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns `true` if events scoped to `session_id` belong to this client:
    /// either nothing is held yet or the same identity is held.
    #[must_use]
    pub fn accepts(&self, session_id: SessionId) -> bool {
        self.session_id.is_none_or(|held| held == session_id)
    }

    /// Holds `session_id` if nothing is held. Returns `false` when a
    /// different identity is already held.
    pub fn adopt(&mut self, session_id: SessionId) -> bool {
        match self.session_id {
            None => {
                self.session_id = Some(session_id);
                true
            }
            Some(held) => held == session_id,
        }
    }

    /// Moves to the active state for `session_id`. Returns `false` and
    /// changes nothing when a different identity is held.
    pub fn activate(
        &mut self,
        session_id: SessionId,
        host_id: Option<ClientId>,
        at: DateTime<Utc>,
    ) -> bool {
        if !self.adopt(session_id) {
            return false;
        }
        if host_id.is_some() {
            self.host_id = host_id;
        }
        if !self.active {
            self.started_at = Some(at);
            self.active = true;
        }
        true
    }

    /// Moves to the inactive state and releases the identity, returning it.
    pub fn deactivate(&mut self) -> Option<SessionId> {
        self.active = false;
        self.host_id = None;
        self.started_at = None;
        self.session_id.take()
    }

    /// The session as seen by this client, if an identity is held.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.session_id.map(|session_id| Session {
            session_id,
            host_id: self.host_id,
            active: self.active,
            started_at: self.started_at,
        })
    }
}
