//! Authoring operations.
//!
//! Each mutation goes to the content service first and then invalidates
//! whatever cached node it made stale, so the next read sees the edit.

use std::sync::Arc;

use storycast_core::content::ContentService;
use storycast_core::error::PresentationError;
use storycast_core::ids::{NodeId, RouteId};
use storycast_core::node::{Node, NodeField, NodeSummary, Route};
use tracing::{info, instrument};

use super::cache::GraphCache;
use crate::domain::snapshot::{DanglingRoute, GraphSnapshot};

/// Applies graph edits and keeps the cache coherent with them.
pub struct GraphEditor {
    service: Arc<dyn ContentService>,
    cache: Arc<GraphCache>,
}

impl std::fmt::Debug for GraphEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphEditor")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl GraphEditor {
    /// Creates an editor writing through `service` and invalidating `cache`.
    #[must_use]
    pub fn new(service: Arc<dyn ContentService>, cache: Arc<GraphCache>) -> Self {
        Self { service, cache }
    }

    /// Root nodes for the scenario browser.
    ///
    /// # Errors
    ///
    /// Returns the content service error.
    pub async fn list_scenarios(&self) -> Result<Vec<NodeSummary>, PresentationError> {
        self.service.list_root_nodes().await
    }

    /// Creates a blank node.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank title, or the content service error.
    #[instrument(skip(self))]
    pub async fn create_node(&self, title: &str) -> Result<Node, PresentationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PresentationError::Validation("node title is empty".into()));
        }
        let node = self.service.create_node(title).await?;
        info!(node_id = %node.id, "created node");
        Ok(node)
    }

    /// Deletes a scenario root and everything reachable only through it.
    ///
    /// Deleting the active scenario clears the cache; deleting another one
    /// drops cached nodes, since routes into removed nodes were cleared.
    ///
    /// # Errors
    ///
    /// Returns the content service error.
    #[instrument(skip(self))]
    pub async fn delete_scenario(&self, root: NodeId) -> Result<(), PresentationError> {
        self.service.delete_root_node(root).await?;
        let active = self.cache.root();
        if active == Some(root) {
            self.cache.reset(None);
        } else {
            self.cache.reset(active);
        }
        info!(root = %root, "deleted scenario");
        Ok(())
    }

    /// Renames a node.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank title, or the content service error.
    #[instrument(skip(self))]
    pub async fn update_node_title(
        &self,
        node_id: NodeId,
        title: &str,
    ) -> Result<Node, PresentationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PresentationError::Validation("node title is empty".into()));
        }
        let node = self
            .service
            .update_node(node_id, NodeField::Title(title.to_owned()))
            .await?;
        if self.cache.peek(node_id).is_some() {
            self.cache.store(node.clone());
        }
        Ok(node)
    }

    /// Adds an unresolved choice to a node.
    ///
    /// # Errors
    ///
    /// Returns the content service error.
    #[instrument(skip(self))]
    pub async fn create_route(
        &self,
        from_node_id: NodeId,
        title: &str,
    ) -> Result<Route, PresentationError> {
        let route = self.service.create_route(from_node_id, title).await?;
        self.cache.invalidate(from_node_id);
        Ok(route)
    }

    /// Renames a choice.
    ///
    /// # Errors
    ///
    /// Returns the content service error.
    #[instrument(skip(self))]
    pub async fn update_route_title(
        &self,
        route_id: RouteId,
        title: &str,
    ) -> Result<Route, PresentationError> {
        let route = self.service.update_route_title(route_id, title).await?;
        self.cache.invalidate(route.from_node_id);
        Ok(route)
    }

    /// Deletes a choice.
    ///
    /// # Errors
    ///
    /// Returns the content service error.
    #[instrument(skip(self, route), fields(route_id = %route.id))]
    pub async fn delete_route(&self, route: &Route) -> Result<(), PresentationError> {
        self.service.delete_route(route.id).await?;
        self.cache.invalidate(route.from_node_id);
        Ok(())
    }

    /// Points a choice at `target`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGraphReference` if `target` does not exist, or the
    /// content service error.
    #[instrument(skip(self))]
    pub async fn link_route(
        &self,
        route_id: RouteId,
        target: NodeId,
    ) -> Result<Route, PresentationError> {
        let route = self.service.set_route_target(route_id, Some(target)).await?;
        self.cache.invalidate(route.from_node_id);
        Ok(route)
    }

    /// Clears a choice's target, leaving it dangling.
    ///
    /// # Errors
    ///
    /// Returns the content service error.
    #[instrument(skip(self))]
    pub async fn unlink_route(&self, route_id: RouteId) -> Result<Route, PresentationError> {
        let route = self.service.set_route_target(route_id, None).await?;
        self.cache.invalidate(route.from_node_id);
        Ok(route)
    }

    /// Copies a node and its choices; descendants are shared, not copied.
    ///
    /// # Errors
    ///
    /// Returns the content service error.
    #[instrument(skip(self))]
    pub async fn duplicate_node(&self, node_id: NodeId) -> Result<Node, PresentationError> {
        self.service.duplicate_node(node_id).await
    }

    /// Nodes nothing links to, for manual re-linking.
    ///
    /// # Errors
    ///
    /// Returns the content service error.
    pub async fn unlinked_nodes(&self) -> Result<Vec<NodeSummary>, PresentationError> {
        self.service.list_unlinked_nodes().await
    }

    /// Routes in `snapshot` whose target the content service does not know.
    #[must_use]
    pub fn dangling_routes(&self, snapshot: &GraphSnapshot) -> Vec<DanglingRoute> {
        snapshot.dangling_routes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storycast_test_support::{InMemoryContentService, StoryGraph};

    fn editor_over(
        graph: StoryGraph,
    ) -> (Arc<InMemoryContentService>, Arc<GraphCache>, GraphEditor) {
        let service = Arc::new(graph.into_service());
        let cache = Arc::new(GraphCache::new(service.clone()));
        let editor = GraphEditor::new(service.clone(), Arc::clone(&cache));
        (service, cache, editor)
    }

    #[tokio::test]
    async fn test_linking_a_route_invalidates_its_source() {
        // Arrange
        let graph = StoryGraph::new().root("A").dangling("A").node("B");
        let (a, b) = (graph.id("A"), graph.id("B"));
        let route_id = graph.get("A").routes[0].id;
        let (_service, cache, editor) = editor_over(graph);
        cache.reset(Some(a));
        assert!(cache.get(a).await.unwrap().is_leaf());

        // Act
        editor.link_route(route_id, b).await.unwrap();

        // Assert
        let refreshed = cache.get(a).await.unwrap();
        assert_eq!(refreshed.resolved_targets().collect::<Vec<_>>(), vec![b]);
    }

    #[tokio::test]
    async fn test_link_to_missing_node_is_invalid_reference() {
        let graph = StoryGraph::new().dangling("A");
        let route_id = graph.get("A").routes[0].id;
        let (_service, _cache, editor) = editor_over(graph);
        let missing = NodeId::new();

        let result = editor.link_route(route_id, missing).await;

        assert_eq!(result, Err(PresentationError::InvalidGraphReference(missing)));
    }

    #[tokio::test]
    async fn test_create_node_rejects_blank_title() {
        let (_service, _cache, editor) = editor_over(StoryGraph::new());

        let result = editor.create_node("   ").await;

        assert!(matches!(result, Err(PresentationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_deleting_active_scenario_resets_cache_and_removes_exclusive_nodes() {
        // Arrange: D is shared with another scenario, B is not.
        let graph = StoryGraph::new()
            .root("A")
            .root("Other")
            .route("A", "B")
            .route("B", "D")
            .route("Other", "D");
        let (a, b, d) = (graph.id("A"), graph.id("B"), graph.id("D"));
        let (service, cache, editor) = editor_over(graph);
        cache.reset(Some(a));
        cache.prefetch_reachable(a).await;

        // Act
        editor.delete_scenario(a).await.unwrap();

        // Assert
        assert!(cache.is_empty());
        assert_eq!(cache.root(), None);
        assert!(!service.contains(a));
        assert!(!service.contains(b));
        assert!(service.contains(d));
        let scenarios = editor.list_scenarios().await.unwrap();
        assert_eq!(scenarios.len(), 1);
    }

    #[tokio::test]
    async fn test_unlink_then_unlinked_nodes_lists_orphan() {
        // Arrange
        let graph = StoryGraph::new().root("A").route("A", "B");
        let (a, b) = (graph.id("A"), graph.id("B"));
        let route_id = graph.get("A").routes[0].id;
        let (_service, cache, editor) = editor_over(graph);
        cache.reset(Some(a));
        cache.get(a).await.unwrap();

        // Act
        editor.unlink_route(route_id).await.unwrap();
        let orphans = editor.unlinked_nodes().await.unwrap();

        // Assert
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id, b);
        assert!(cache.peek(a).is_none());
    }

    #[tokio::test]
    async fn test_update_title_refreshes_cached_copy() {
        let graph = StoryGraph::new().root("A");
        let a = graph.id("A");
        let (_service, cache, editor) = editor_over(graph);
        cache.get(a).await.unwrap();

        editor.update_node_title(a, "Ambush").await.unwrap();

        assert_eq!(cache.peek(a).unwrap().title, "Ambush");
    }

    #[tokio::test]
    async fn test_duplicate_copies_routes_but_not_descendants() {
        let graph = StoryGraph::new().route("A", "B");
        let (a, b) = (graph.id("A"), graph.id("B"));
        let (_service, _cache, editor) = editor_over(graph);

        let copy = editor.duplicate_node(a).await.unwrap();

        assert_ne!(copy.id, a);
        assert_eq!(copy.resolved_targets().collect::<Vec<_>>(), vec![b]);
        assert!(copy.routes.iter().all(|route| route.from_node_id == copy.id));
    }
}
