//! In-memory content service for tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use storycast_core::content::ContentService;
use storycast_core::error::PresentationError;
use storycast_core::ids::{NodeId, RouteId};
use storycast_core::node::{Node, NodeField, NodeSummary, Route};
use tokio::sync::watch;

/// Builder for small story graphs whose nodes are addressed by title.
#[derive(Debug, Default, Clone)]
pub struct StoryGraph {
    ids: HashMap<String, NodeId>,
    nodes: HashMap<NodeId, Node>,
    roots: Vec<NodeId>,
}

impl StoryGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, title: &str) -> NodeId {
        if let Some(id) = self.ids.get(title) {
            return *id;
        }
        let id = NodeId::new();
        self.ids.insert(title.to_owned(), id);
        self.nodes.insert(
            id,
            Node {
                id,
                title: title.to_owned(),
                routes: Vec::new(),
            },
        );
        id
    }

    /// Adds a node with no routes.
    #[must_use]
    pub fn node(mut self, title: &str) -> Self {
        self.ensure(title);
        self
    }

    /// Adds a node and marks it as a scenario root.
    #[must_use]
    pub fn root(mut self, title: &str) -> Self {
        let id = self.ensure(title);
        if !self.roots.contains(&id) {
            self.roots.push(id);
        }
        self
    }

    /// Adds a resolved route `from -> to`, creating either node if needed.
    #[must_use]
    pub fn route(mut self, from: &str, to: &str) -> Self {
        let from_id = self.ensure(from);
        let to_id = self.ensure(to);
        self.push_route(from_id, Some(to_id), to);
        self
    }

    /// Adds a route from `from` pointing at an id the service does not know.
    #[must_use]
    pub fn route_to_missing(mut self, from: &str, missing: NodeId) -> Self {
        let from_id = self.ensure(from);
        self.push_route(from_id, Some(missing), "missing");
        self
    }

    /// Adds an unresolved route leaving `from`.
    #[must_use]
    pub fn dangling(mut self, from: &str) -> Self {
        let from_id = self.ensure(from);
        self.push_route(from_id, None, "unresolved");
        self
    }

    fn push_route(&mut self, from: NodeId, to: Option<NodeId>, title: &str) {
        if let Some(node) = self.nodes.get_mut(&from) {
            node.routes.push(Route {
                id: RouteId::new(),
                title: format!("to {title}"),
                from_node_id: from,
                to_node_id: to,
            });
        }
    }

    /// Returns the id of the node with `title`.
    ///
    /// # Panics
    ///
    /// Panics if no node has that title.
    #[must_use]
    pub fn id(&self, title: &str) -> NodeId {
        *self
            .ids
            .get(title)
            .unwrap_or_else(|| panic!("no node titled {title}"))
    }

    /// Returns the node with `title`.
    ///
    /// # Panics
    ///
    /// Panics if no node has that title.
    #[must_use]
    pub fn get(&self, title: &str) -> Node {
        self.nodes[&self.id(title)].clone()
    }

    /// Returns every node in the graph.
    #[must_use]
    pub fn nodes(&self) -> Vec<Node> {
        self.nodes.values().cloned().collect()
    }

    /// Turns the graph into a content service.
    #[must_use]
    pub fn into_service(self) -> InMemoryContentService {
        InMemoryContentService::new(self)
    }
}

#[derive(Debug)]
struct Store {
    nodes: HashMap<NodeId, Node>,
    roots: Vec<NodeId>,
    fetch_counts: HashMap<NodeId, usize>,
    failing: HashSet<NodeId>,
}

impl Store {
    fn reachable_from(&self, start: NodeId, excluded: Option<NodeId>) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            if Some(id) == excluded || !seen.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                queue.extend(node.resolved_targets());
            }
        }
        seen
    }

    fn route_mut(&mut self, route_id: RouteId) -> Result<&mut Route, PresentationError> {
        self.nodes
            .values_mut()
            .flat_map(|node| node.routes.iter_mut())
            .find(|route| route.id == route_id)
            .ok_or_else(|| PresentationError::Validation(format!("route {route_id} not found")))
    }
}

/// A `ContentService` backed by a [`StoryGraph`]. Records fetch counts, can
/// fail selected nodes, and can hold every fetch until resumed.
#[derive(Debug)]
pub struct InMemoryContentService {
    store: Mutex<Store>,
    gate: watch::Sender<bool>,
}

impl InMemoryContentService {
    /// Creates a service serving `graph`.
    #[must_use]
    pub fn new(graph: StoryGraph) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            store: Mutex::new(Store {
                nodes: graph.nodes,
                roots: graph.roots,
                fetch_counts: HashMap::new(),
                failing: HashSet::new(),
            }),
            gate,
        }
    }

    /// Holds every subsequent `fetch_node` call until [`Self::resume`].
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    /// Releases held fetches.
    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    /// Makes fetches of `node_id` fail with a transient error.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_node(&self, node_id: NodeId) {
        self.store.lock().unwrap().failing.insert(node_id);
    }

    /// Lets fetches of `node_id` succeed again.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn heal_node(&self, node_id: NodeId) {
        self.store.lock().unwrap().failing.remove(&node_id);
    }

    /// Number of `fetch_node` calls that reached the service for `node_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn fetch_count(&self, node_id: NodeId) -> usize {
        self.store
            .lock()
            .unwrap()
            .fetch_counts
            .get(&node_id)
            .copied()
            .unwrap_or(0)
    }

    /// Returns `true` if the service still stores `node_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.store.lock().unwrap().nodes.contains_key(&node_id)
    }

    fn summaries<'a>(nodes: impl Iterator<Item = &'a Node>) -> Vec<NodeSummary> {
        nodes
            .map(|node| NodeSummary {
                id: node.id,
                title: node.title.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl ContentService for InMemoryContentService {
    async fn list_root_nodes(&self) -> Result<Vec<NodeSummary>, PresentationError> {
        let store = self.store.lock().unwrap();
        Ok(Self::summaries(
            store.roots.iter().filter_map(|id| store.nodes.get(id)),
        ))
    }

    async fn fetch_node(&self, node_id: NodeId) -> Result<Node, PresentationError> {
        *self
            .store
            .lock()
            .unwrap()
            .fetch_counts
            .entry(node_id)
            .or_insert(0) += 1;

        let mut gate = self.gate.subscribe();
        // The sender lives as long as `self`, so waiting cannot fail.
        let _ = gate.wait_for(|open| *open).await;

        let store = self.store.lock().unwrap();
        if store.failing.contains(&node_id) {
            return Err(PresentationError::TransientFetch(format!(
                "503 fetching {node_id}"
            )));
        }
        store
            .nodes
            .get(&node_id)
            .cloned()
            .ok_or(PresentationError::InvalidGraphReference(node_id))
    }

    async fn create_node(&self, title: &str) -> Result<Node, PresentationError> {
        let node = Node {
            id: NodeId::new(),
            title: title.to_owned(),
            routes: Vec::new(),
        };
        let mut store = self.store.lock().unwrap();
        store.nodes.insert(node.id, node.clone());
        store.roots.push(node.id);
        Ok(node)
    }

    async fn delete_root_node(&self, node_id: NodeId) -> Result<(), PresentationError> {
        let mut store = self.store.lock().unwrap();
        if !store.nodes.contains_key(&node_id) {
            return Err(PresentationError::InvalidGraphReference(node_id));
        }
        let doomed = store.reachable_from(node_id, None);
        let kept: HashSet<NodeId> = store
            .roots
            .iter()
            .filter(|root| **root != node_id)
            .flat_map(|root| store.reachable_from(*root, Some(node_id)))
            .collect();
        for id in doomed.difference(&kept) {
            store.nodes.remove(id);
        }
        store.roots.retain(|root| *root != node_id);
        let remaining: HashSet<NodeId> = store.nodes.keys().copied().collect();
        for node in store.nodes.values_mut() {
            for route in &mut node.routes {
                if route.to_node_id.is_some_and(|to| !remaining.contains(&to)) {
                    route.to_node_id = None;
                }
            }
        }
        Ok(())
    }

    async fn update_node(
        &self,
        node_id: NodeId,
        field: NodeField,
    ) -> Result<Node, PresentationError> {
        let mut store = self.store.lock().unwrap();
        let node = store
            .nodes
            .get_mut(&node_id)
            .ok_or(PresentationError::InvalidGraphReference(node_id))?;
        match field {
            NodeField::Title(title) => node.title = title,
        }
        Ok(node.clone())
    }

    async fn create_route(
        &self,
        from_node_id: NodeId,
        title: &str,
    ) -> Result<Route, PresentationError> {
        let mut store = self.store.lock().unwrap();
        let node = store
            .nodes
            .get_mut(&from_node_id)
            .ok_or(PresentationError::InvalidGraphReference(from_node_id))?;
        let route = Route {
            id: RouteId::new(),
            title: title.to_owned(),
            from_node_id,
            to_node_id: None,
        };
        node.routes.push(route.clone());
        Ok(route)
    }

    async fn update_route_title(
        &self,
        route_id: RouteId,
        title: &str,
    ) -> Result<Route, PresentationError> {
        let mut store = self.store.lock().unwrap();
        let route = store.route_mut(route_id)?;
        title.clone_into(&mut route.title);
        Ok(route.clone())
    }

    async fn delete_route(&self, route_id: RouteId) -> Result<(), PresentationError> {
        let mut store = self.store.lock().unwrap();
        for node in store.nodes.values_mut() {
            node.routes.retain(|route| route.id != route_id);
        }
        Ok(())
    }

    async fn set_route_target(
        &self,
        route_id: RouteId,
        target: Option<NodeId>,
    ) -> Result<Route, PresentationError> {
        let mut store = self.store.lock().unwrap();
        if let Some(target) = target {
            if !store.nodes.contains_key(&target) {
                return Err(PresentationError::InvalidGraphReference(target));
            }
            store.roots.retain(|root| *root != target);
        }
        let route = store.route_mut(route_id)?;
        route.to_node_id = target;
        Ok(route.clone())
    }

    async fn duplicate_node(&self, node_id: NodeId) -> Result<Node, PresentationError> {
        let mut store = self.store.lock().unwrap();
        let original = store
            .nodes
            .get(&node_id)
            .cloned()
            .ok_or(PresentationError::InvalidGraphReference(node_id))?;
        let id = NodeId::new();
        let copy = Node {
            id,
            title: format!("{} (copy)", original.title),
            routes: original
                .routes
                .iter()
                .map(|route| Route {
                    id: RouteId::new(),
                    title: route.title.clone(),
                    from_node_id: id,
                    to_node_id: route.to_node_id,
                })
                .collect(),
        };
        store.nodes.insert(id, copy.clone());
        Ok(copy)
    }

    async fn list_unlinked_nodes(&self) -> Result<Vec<NodeSummary>, PresentationError> {
        let store = self.store.lock().unwrap();
        let linked: HashSet<NodeId> = store
            .nodes
            .values()
            .flat_map(Node::resolved_targets)
            .collect();
        Ok(Self::summaries(store.nodes.values().filter(|node| {
            !linked.contains(&node.id) && !store.roots.contains(&node.id)
        })))
    }
}
