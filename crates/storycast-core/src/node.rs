//! Graph data model: nodes (encounters) and routes (choices).
//!
//! Content such as titles and assets is owned by the external content
//! service; only the identity and the outgoing routes matter for traversal.

use serde::{Deserialize, Serialize};

use crate::ids::{NodeId, RouteId};

/// A directed, optionally resolved edge from one node to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Route identifier.
    pub id: RouteId,
    /// Label shown for the choice.
    pub title: String,
    /// The node this route leaves from.
    pub from_node_id: NodeId,
    /// The node this route leads to. `None` is a dangling choice, which is
    /// a valid authoring state.
    pub to_node_id: Option<NodeId>,
}

impl Route {
    /// Returns `true` if the route points at a node.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.to_node_id.is_some()
    }
}

/// A unit of narrative content with its outgoing choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Node identifier.
    pub id: NodeId,
    /// Display title.
    pub title: String,
    /// Outgoing routes, in authoring order.
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl Node {
    /// Iterates the targets of resolved outgoing routes, in route order.
    pub fn resolved_targets(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.routes.iter().filter_map(|route| route.to_node_id)
    }

    /// Returns `true` if the node has no resolved outgoing route.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.resolved_targets().next().is_none()
    }
}

/// Listing entry for the scenario browser and the unlinked-node picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    /// Node identifier.
    pub id: NodeId,
    /// Display title.
    pub title: String,
}

/// A single editable field of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum NodeField {
    /// The node's title.
    Title(String),
}
