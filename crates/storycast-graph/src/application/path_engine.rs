//! Memoizing front end for the path computations.

use std::collections::HashMap;
use std::sync::Arc;

use storycast_core::ids::NodeId;
use tracing::debug;

use crate::domain::paths::{self, PathEntry};
use crate::domain::snapshot::GraphSnapshot;

/// Caches `max_depth` per root and `all_forward_paths` per start node for
/// one graph generation. A snapshot from another generation (a reset, a
/// newly fetched node, an edit) drops every memo.
#[derive(Debug, Default)]
pub struct PathEngine {
    generation: Option<u64>,
    depths: HashMap<NodeId, usize>,
    forward: HashMap<NodeId, Arc<Vec<Vec<NodeId>>>>,
}

impl PathEngine {
    /// Creates an engine with empty memos.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets all memoized results.
    pub fn reset(&mut self) {
        self.generation = None;
        self.depths.clear();
        self.forward.clear();
    }

    fn align(&mut self, graph: &GraphSnapshot) {
        if self.generation != Some(graph.generation()) {
            if self.generation.is_some() {
                debug!(generation = graph.generation(), "graph changed, dropping path memos");
            }
            self.reset();
            self.generation = Some(graph.generation());
        }
    }

    /// Memoized [`paths::max_depth`].
    pub fn max_depth(&mut self, graph: &GraphSnapshot, root: NodeId) -> usize {
        self.align(graph);
        *self
            .depths
            .entry(root)
            .or_insert_with(|| paths::max_depth(graph, root))
    }

    /// Memoized [`paths::all_forward_paths`].
    pub fn all_forward_paths(
        &mut self,
        graph: &GraphSnapshot,
        from: NodeId,
    ) -> Arc<Vec<Vec<NodeId>>> {
        self.align(graph);
        Arc::clone(
            self.forward
                .entry(from)
                .or_insert_with(|| Arc::new(paths::all_forward_paths(graph, from))),
        )
    }

    /// The displayed path for `history` in the scenario rooted at `root`.
    /// Empty when either is empty.
    pub fn longest_path(
        &mut self,
        graph: &GraphSnapshot,
        root: Option<NodeId>,
        history: &[NodeId],
    ) -> Vec<PathEntry> {
        let (Some(root), Some(&current)) = (root, history.last()) else {
            return Vec::new();
        };
        let depth = self.max_depth(graph, root);
        let forward = self.all_forward_paths(graph, current);
        paths::assemble_path(graph, history, &forward, depth)
    }
}
