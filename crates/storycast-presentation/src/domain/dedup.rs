//! Duplicate suppression for inbound navigation.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use storycast_core::ids::{NodeId, SessionId};

/// Default suppression window for identical navigation events.
pub const DEFAULT_DEDUP_WINDOW_MS: i64 = 500;

/// Drops a `(node, session)` pair seen again within the window of its first
/// sighting. The window is keyed on the pair only, so a quick A→B→A can
/// lose the second A; that tolerance is accepted.
#[derive(Debug, Clone)]
pub struct DuplicateFilter {
    window: Duration,
    seen: HashMap<(NodeId, SessionId), DateTime<Utc>>,
}

impl DuplicateFilter {
    /// Creates a filter with the given window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// Returns `true` if the event should be processed, recording it;
    /// `false` if it repeats one admitted less than a window ago.
    pub fn admit(&mut self, node_id: NodeId, session_id: SessionId, now: DateTime<Utc>) -> bool {
        let window = self.window;
        self.seen.retain(|_, first_seen| now - *first_seen < window);
        if self.seen.contains_key(&(node_id, session_id)) {
            return false;
        }
        self.seen.insert((node_id, session_id), now);
        true
    }

    /// Forgets one pair, so its next sighting is admitted at once. Used
    /// when the admitted navigation failed and must stay retriable.
    pub fn forget(&mut self, node_id: NodeId, session_id: SessionId) {
        self.seen.remove(&(node_id, session_id));
    }

    /// Forgets every recorded event.
    pub fn clear(&mut self) {
        self.seen.clear();
    }

    /// Number of events still inside their window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns `true` if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for DuplicateFilter {
    fn default() -> Self {
        Self::new(Duration::milliseconds(DEFAULT_DEDUP_WINDOW_MS))
    }
}
