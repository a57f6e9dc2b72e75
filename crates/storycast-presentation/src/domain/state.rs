//! Local presentation state passed explicitly into every operation.

use storycast_core::error::PresentationError;
use storycast_core::ids::NodeId;
use storycast_graph::domain::paths::PathEntry;

use super::history::TraversalHistory;

/// Identifies one navigation request. Only the most recently issued ticket
/// may mutate state when its fetch completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationTicket {
    /// The requested node.
    pub node_id: NodeId,
    sequence: u64,
}

/// What a client currently shows and has walked.
#[derive(Debug, Clone, Default)]
pub struct PresentationState {
    root: Option<NodeId>,
    history: TraversalHistory,
    path: Vec<PathEntry>,
    issued: u64,
    last_error: Option<PresentationError>,
}

impl PresentationState {
    /// Creates a state with no scenario selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root of the active scenario.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// The node currently shown.
    #[must_use]
    pub fn current(&self) -> Option<NodeId> {
        self.history.current()
    }

    /// The walked nodes.
    #[must_use]
    pub fn history(&self) -> &TraversalHistory {
        &self.history
    }

    /// The path last computed for display.
    #[must_use]
    pub fn path(&self) -> &[PathEntry] {
        &self.path
    }

    /// The most recent navigation failure, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<&PresentationError> {
        self.last_error.as_ref()
    }

    /// Switches to a new scenario: history restarts at `root`.
    pub fn select_root(&mut self, root: NodeId) {
        self.root = Some(root);
        self.history = TraversalHistory::starting_at(root);
        self.path.clear();
        self.last_error = None;
        self.issued += 1;
    }

    /// Issues a ticket for a navigation to `node_id`, superseding any
    /// earlier one.
    pub fn begin_navigation(&mut self, node_id: NodeId) -> NavigationTicket {
        self.issued += 1;
        NavigationTicket {
            node_id,
            sequence: self.issued,
        }
    }

    /// Returns `true` if no navigation was issued after `ticket`.
    #[must_use]
    pub fn is_latest(&self, ticket: &NavigationTicket) -> bool {
        ticket.sequence == self.issued
    }

    /// Records the arrival at `ticket`'s node.
    pub fn arrive(&mut self, ticket: &NavigationTicket) {
        self.history.visit(ticket.node_id);
        self.last_error = None;
    }

    /// Breadcrumb jump: truncates history to `index`.
    pub fn jump_to(&mut self, index: usize) -> Option<NodeId> {
        let node_id = self.history.jump_to(index)?;
        self.issued += 1;
        self.last_error = None;
        Some(node_id)
    }

    /// Replaces the displayed path.
    pub fn set_path(&mut self, path: Vec<PathEntry>) {
        self.path = path;
    }

    /// Records a failed navigation; the shown node and history are kept.
    pub fn record_error(&mut self, error: PresentationError) {
        self.last_error = Some(error);
    }

    /// Forgets the walked nodes of an ended session. The scenario stays
    /// selected.
    pub fn end_session(&mut self) {
        self.history.clear();
        self.path.clear();
        self.issued += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_ticket_supersedes_earlier() {
        let mut state = PresentationState::new();
        let first = state.begin_navigation(NodeId::new());
        let second = state.begin_navigation(NodeId::new());

        assert!(!state.is_latest(&first));
        assert!(state.is_latest(&second));
    }

    #[test]
    fn test_select_root_restarts_history_and_voids_tickets() {
        let mut state = PresentationState::new();
        let pending = state.begin_navigation(NodeId::new());
        let root = NodeId::new();

        state.select_root(root);

        assert_eq!(state.history().as_slice(), &[root]);
        assert_eq!(state.current(), Some(root));
        assert!(!state.is_latest(&pending));
    }

    #[test]
    fn test_error_is_kept_until_next_arrival() {
        let mut state = PresentationState::new();
        state.select_root(NodeId::new());
        state.record_error(PresentationError::TransientFetch("timeout".into()));
        assert!(state.last_error().is_some());

        let ticket = state.begin_navigation(NodeId::new());
        state.arrive(&ticket);

        assert!(state.last_error().is_none());
        assert_eq!(state.history().len(), 2);
    }
}
