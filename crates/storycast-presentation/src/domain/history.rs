//! Traversal history.

use storycast_core::ids::NodeId;

/// Nodes walked in the current session, oldest first. Never holds the same
/// id twice: revisiting a node truncates back to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalHistory {
    entries: Vec<NodeId>,
}

impl TraversalHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a history at `root`.
    #[must_use]
    pub fn starting_at(root: NodeId) -> Self {
        Self {
            entries: vec![root],
        }
    }

    /// Records a move to `node_id`. Moving to a node already walked drops
    /// everything after its first occurrence instead of appending.
    pub fn visit(&mut self, node_id: NodeId) {
        match self.position(node_id) {
            Some(index) => self.entries.truncate(index + 1),
            None => self.entries.push(node_id),
        }
    }

    /// Jumps back to the entry at `index`, discarding the forward tail.
    /// Returns the node jumped to, or `None` if `index` is out of range.
    pub fn jump_to(&mut self, index: usize) -> Option<NodeId> {
        let node_id = *self.entries.get(index)?;
        self.entries.truncate(index + 1);
        Some(node_id)
    }

    /// Position of `node_id`, if walked.
    #[must_use]
    pub fn position(&self, node_id: NodeId) -> Option<usize> {
        self.entries.iter().position(|entry| *entry == node_id)
    }

    /// The last walked node.
    #[must_use]
    pub fn current(&self) -> Option<NodeId> {
        self.entries.last().copied()
    }

    /// Walked nodes, oldest first.
    #[must_use]
    pub fn as_slice(&self) -> &[NodeId] {
        &self.entries
    }

    /// Number of walked nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been walked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets every walked node.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_appends_new_nodes() {
        let (a, b) = (NodeId::new(), NodeId::new());
        let mut history = TraversalHistory::starting_at(a);

        history.visit(b);

        assert_eq!(history.as_slice(), &[a, b]);
        assert_eq!(history.current(), Some(b));
    }

    #[test]
    fn test_revisit_truncates_to_first_occurrence() {
        // Arrange
        let (a, b, c) = (NodeId::new(), NodeId::new(), NodeId::new());
        let mut history = TraversalHistory::starting_at(a);
        history.visit(b);
        history.visit(c);

        // Act
        history.visit(a);

        // Assert
        assert_eq!(history.as_slice(), &[a]);
    }

    #[test]
    fn test_visiting_current_node_is_a_no_op() {
        let (a, b) = (NodeId::new(), NodeId::new());
        let mut history = TraversalHistory::starting_at(a);
        history.visit(b);

        history.visit(b);

        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_jump_to_discards_forward_tail() {
        let (a, b, c) = (NodeId::new(), NodeId::new(), NodeId::new());
        let mut history = TraversalHistory::starting_at(a);
        history.visit(b);
        history.visit(c);

        assert_eq!(history.jump_to(1), Some(b));
        assert_eq!(history.as_slice(), &[a, b]);
        assert_eq!(history.jump_to(5), None);
        assert_eq!(history.len(), 2);
    }
}
