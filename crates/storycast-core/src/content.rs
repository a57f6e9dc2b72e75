//! Content service abstraction.
//!
//! Nodes and routes are persisted by an external content service. The
//! engine reads and mutates them only through this trait.

use async_trait::async_trait;

use crate::error::PresentationError;
use crate::ids::{NodeId, RouteId};
use crate::node::{Node, NodeField, NodeSummary, Route};

/// Request/response collaborator owning node persistence.
///
/// Implementations report a missing node as
/// `PresentationError::InvalidGraphReference` and network or server
/// failures as `PresentationError::TransientFetch`.
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Lists the root nodes of every scenario, for the scenario browser.
    async fn list_root_nodes(&self) -> Result<Vec<NodeSummary>, PresentationError>;

    /// Fetches one node with its outgoing routes.
    async fn fetch_node(&self, node_id: NodeId) -> Result<Node, PresentationError>;

    /// Creates a new blank node.
    async fn create_node(&self, title: &str) -> Result<Node, PresentationError>;

    /// Deletes a root node and everything reachable only through it.
    async fn delete_root_node(&self, node_id: NodeId) -> Result<(), PresentationError>;

    /// Updates a single field of a node.
    async fn update_node(&self, node_id: NodeId, field: NodeField)
    -> Result<Node, PresentationError>;

    /// Creates an unresolved route leaving `from_node_id`.
    async fn create_route(
        &self,
        from_node_id: NodeId,
        title: &str,
    ) -> Result<Route, PresentationError>;

    /// Renames a route.
    async fn update_route_title(
        &self,
        route_id: RouteId,
        title: &str,
    ) -> Result<Route, PresentationError>;

    /// Deletes a route.
    async fn delete_route(&self, route_id: RouteId) -> Result<(), PresentationError>;

    /// Resolves a route to `target`, or clears its target with `None`.
    async fn set_route_target(
        &self,
        route_id: RouteId,
        target: Option<NodeId>,
    ) -> Result<Route, PresentationError>;

    /// Deep-copies a node and its routes, not its descendants.
    async fn duplicate_node(&self, node_id: NodeId) -> Result<Node, PresentationError>;

    /// Lists nodes with no incoming route.
    async fn list_unlinked_nodes(&self) -> Result<Vec<NodeSummary>, PresentationError>;
}
