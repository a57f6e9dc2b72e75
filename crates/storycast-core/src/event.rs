//! Real-time channel events.
//!
//! Every message on the channel is one variant of [`ChannelEvent`]. The wire
//! form is a JSON object tagged by its `event` name with camelCase fields.
//! Anything that does not decode into a known variant is rejected rather
//! than guessed at.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PresentationError;
use crate::ids::{ClientId, NodeId, SessionId};

/// Event name for [`ChannelEvent::SessionStart`].
pub const SESSION_START_EVENT: &str = "session.start";
/// Event name for [`ChannelEvent::SessionEnd`].
pub const SESSION_END_EVENT: &str = "session.end";
/// Event name for [`ChannelEvent::Navigate`].
pub const NAVIGATE_EVENT: &str = "navigate";
/// Event name for [`ChannelEvent::WhoIsHost`].
pub const WHO_IS_HOST_EVENT: &str = "whoIsHost";
/// Event name for [`ChannelEvent::HostInfo`].
pub const HOST_INFO_EVENT: &str = "hostInfo";
/// Event name for [`ChannelEvent::WhatIsCurrentNode`].
pub const WHAT_IS_CURRENT_NODE_EVENT: &str = "whatIsCurrentNode";
/// Event name for [`ChannelEvent::CurrentNode`].
pub const CURRENT_NODE_EVENT: &str = "currentNode";
/// Event name for [`ChannelEvent::Toggle`].
pub const TOGGLE_EVENT: &str = "toggle";

/// Which auxiliary overlay a [`ChannelEvent::Toggle`] controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToggleTarget {
    /// A quiz overlay.
    Quiz,
    /// A poll overlay.
    Poll,
}

/// Messages exchanged over the real-time channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ChannelEvent {
    /// A host started presenting.
    #[serde(rename = "session.start", rename_all = "camelCase")]
    SessionStart {
        /// The new session.
        session_id: SessionId,
        /// The presenting host.
        host_id: ClientId,
        /// The node on screen, or `None` if nothing is selected yet.
        node_id: Option<NodeId>,
    },

    /// A session was ended by its host or another client with authority.
    #[serde(rename = "session.end", rename_all = "camelCase")]
    SessionEnd {
        /// The ended session.
        session_id: SessionId,
    },

    /// The authoritative client moved to a node.
    #[serde(rename = "navigate", rename_all = "camelCase")]
    Navigate {
        /// The session the navigation belongs to.
        session_id: SessionId,
        /// The node now on screen.
        node_id: NodeId,
        /// Receivers should refetch the node even if it is already current.
        #[serde(default)]
        refresh: bool,
    },

    /// Resync query: is there an active session?
    #[serde(rename = "whoIsHost", rename_all = "camelCase")]
    WhoIsHost {
        /// The session the asker already holds, if any.
        session_id: Option<SessionId>,
    },

    /// Resync response to [`ChannelEvent::WhoIsHost`].
    #[serde(rename = "hostInfo", rename_all = "camelCase")]
    HostInfo {
        /// The active session, if any.
        session_id: Option<SessionId>,
        /// Whether a session is live.
        active: bool,
    },

    /// Resync query: which node is current in a session?
    #[serde(rename = "whatIsCurrentNode", rename_all = "camelCase")]
    WhatIsCurrentNode {
        /// The session being asked about.
        session_id: SessionId,
    },

    /// Resync response to [`ChannelEvent::WhatIsCurrentNode`].
    #[serde(rename = "currentNode", rename_all = "camelCase")]
    CurrentNode {
        /// The session being answered for.
        session_id: SessionId,
        /// The current node, or `None` if nothing is selected yet.
        node_id: Option<NodeId>,
    },

    /// Quiz or poll show/hide toggle. Opaque to the presentation state machine.
    #[serde(rename = "toggle", rename_all = "camelCase")]
    Toggle {
        /// The session the toggle belongs to.
        session_id: SessionId,
        /// The overlay being toggled.
        target: ToggleTarget,
        /// The quiz or poll item, if the overlay refers to one.
        item_id: Option<Uuid>,
        /// Show (`true`) or hide (`false`).
        visible: bool,
    },
}

impl ChannelEvent {
    /// Returns the wire event name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionStart { .. } => SESSION_START_EVENT,
            Self::SessionEnd { .. } => SESSION_END_EVENT,
            Self::Navigate { .. } => NAVIGATE_EVENT,
            Self::WhoIsHost { .. } => WHO_IS_HOST_EVENT,
            Self::HostInfo { .. } => HOST_INFO_EVENT,
            Self::WhatIsCurrentNode { .. } => WHAT_IS_CURRENT_NODE_EVENT,
            Self::CurrentNode { .. } => CURRENT_NODE_EVENT,
            Self::Toggle { .. } => TOGGLE_EVENT,
        }
    }

    /// Returns the session the event is scoped to, if it is scoped.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            Self::SessionStart { session_id, .. }
            | Self::SessionEnd { session_id }
            | Self::Navigate { session_id, .. }
            | Self::WhatIsCurrentNode { session_id }
            | Self::CurrentNode { session_id, .. }
            | Self::Toggle { session_id, .. } => Some(*session_id),
            Self::WhoIsHost { session_id } | Self::HostInfo { session_id, .. } => *session_id,
        }
    }

    /// Returns `true` for the resync query events that expect a direct reply.
    #[must_use]
    pub fn is_query(&self) -> bool {
        matches!(self, Self::WhoIsHost { .. } | Self::WhatIsCurrentNode { .. })
    }

    /// Decodes a wire payload.
    ///
    /// # Errors
    ///
    /// Returns `PresentationError::Validation` for unknown event names or
    /// payloads missing required fields.
    pub fn decode(raw: &str) -> Result<Self, PresentationError> {
        serde_json::from_str(raw)
            .map_err(|e| PresentationError::Validation(format!("unrecognized channel event: {e}")))
    }

    /// Encodes the event into its wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        // Serialization of derived Serialize types is infallible.
        serde_json::to_string(self).expect("ChannelEvent serialization is infallible")
    }
}
