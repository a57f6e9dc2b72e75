//! Immutable view of the cached graph.

use std::collections::HashMap;

use storycast_core::error::PresentationError;
use storycast_core::ids::NodeId;
use storycast_core::node::{Node, Route};

/// A route whose target the content service reported as missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingRoute {
    /// The offending route.
    pub route: Route,
    /// The target id that could not be found.
    pub missing: NodeId,
}

/// The nodes known at one point in time, plus the fetches that failed while
/// collecting them.
///
/// A route whose target is not in the snapshot is treated as unresolved.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    root: Option<NodeId>,
    generation: u64,
    nodes: HashMap<NodeId, Node>,
    failures: Vec<(NodeId, PresentationError)>,
}

impl GraphSnapshot {
    /// Builds a snapshot from a set of nodes.
    #[must_use]
    pub fn new(
        root: Option<NodeId>,
        generation: u64,
        nodes: impl IntoIterator<Item = Node>,
    ) -> Self {
        Self {
            root,
            generation,
            nodes: nodes.into_iter().map(|node| (node.id, node)).collect(),
            failures: Vec::new(),
        }
    }

    /// Attaches the fetch failures observed while building the snapshot.
    #[must_use]
    pub fn with_failures(mut self, failures: Vec<(NodeId, PresentationError)>) -> Self {
        self.failures = failures;
        self
    }

    /// The scenario root the snapshot was taken for.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Cache generation the snapshot reflects.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Looks up a node.
    #[must_use]
    pub fn get(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Returns `true` if the node is present.
    #[must_use]
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Number of nodes present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Title of a node, if present.
    #[must_use]
    pub fn title(&self, node_id: NodeId) -> Option<&str> {
        self.nodes.get(&node_id).map(|node| node.title.as_str())
    }

    /// Distinct targets of a node's resolved routes that are present in the
    /// snapshot, in route order.
    #[must_use]
    pub fn targets(&self, node_id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(&node_id) else {
            return Vec::new();
        };
        let mut targets: Vec<NodeId> = Vec::with_capacity(node.routes.len());
        for target in node.resolved_targets() {
            if self.nodes.contains_key(&target) && !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }

    /// Fetch failures recorded while the snapshot was collected.
    #[must_use]
    pub fn failures(&self) -> &[(NodeId, PresentationError)] {
        &self.failures
    }

    /// Routes pointing at nodes the content service reported as not found.
    #[must_use]
    pub fn dangling_routes(&self) -> Vec<DanglingRoute> {
        let mut dangling = Vec::new();
        for (failed, error) in &self.failures {
            if !matches!(error, PresentationError::InvalidGraphReference(_)) {
                continue;
            }
            for node in self.nodes.values() {
                for route in &node.routes {
                    if route.to_node_id == Some(*failed) {
                        dangling.push(DanglingRoute {
                            route: route.clone(),
                            missing: *failed,
                        });
                    }
                }
            }
        }
        dangling
    }
}
