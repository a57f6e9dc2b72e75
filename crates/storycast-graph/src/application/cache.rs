//! Graph cache with single-flight fetches.
//!
//! The cache holds the nodes of the active scenario. A miss starts exactly
//! one fetch per node id; every concurrent caller awaits the same shared
//! future. Failures are handed to every waiter and leave the entry absent so
//! the next `get` retries. Changing the active scenario resets everything.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use storycast_core::content::ContentService;
use storycast_core::error::PresentationError;
use storycast_core::ids::NodeId;
use storycast_core::node::Node;
use tracing::{debug, info, warn};

use crate::domain::snapshot::GraphSnapshot;

type FetchFuture = Shared<BoxFuture<'static, Result<Node, PresentationError>>>;

#[derive(Default)]
struct CacheState {
    root: Option<NodeId>,
    epoch: u64,
    generation: u64,
    nodes: HashMap<NodeId, Node>,
    in_flight: HashMap<NodeId, FetchFuture>,
}

/// Keyed store of fetched nodes for the active scenario.
pub struct GraphCache {
    service: Arc<dyn ContentService>,
    state: Mutex<CacheState>,
}

impl std::fmt::Debug for GraphCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("GraphCache")
            .field("root", &state.root)
            .field("epoch", &state.epoch)
            .field("generation", &state.generation)
            .field("cached", &state.nodes.len())
            .field("in_flight", &state.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl GraphCache {
    /// Creates an empty cache reading from `service`.
    #[must_use]
    pub fn new(service: Arc<dyn ContentService>) -> Self {
        Self {
            service,
            state: Mutex::new(CacheState::default()),
        }
    }

    // State is only held for map lookups, never across an await, so a
    // poisoned lock still holds consistent data.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the node, fetching it on a miss.
    ///
    /// # Errors
    ///
    /// Returns the fetch error: `TransientFetch` for retriable failures,
    /// `InvalidGraphReference` when the node does not exist.
    pub async fn get(&self, node_id: NodeId) -> Result<Node, PresentationError> {
        let (fetch, epoch) = {
            let mut state = self.lock();
            if let Some(node) = state.nodes.get(&node_id) {
                return Ok(node.clone());
            }
            let epoch = state.epoch;
            let fetch = if let Some(pending) = state.in_flight.get(&node_id) {
                debug!(node_id = %node_id, "joining in-flight fetch");
                pending.clone()
            } else {
                debug!(node_id = %node_id, "fetching node");
                let service = Arc::clone(&self.service);
                let fetch = async move { service.fetch_node(node_id).await }
                    .boxed()
                    .shared();
                state.in_flight.insert(node_id, fetch.clone());
                fetch
            };
            (fetch, epoch)
        };

        let result = fetch.clone().await;

        let mut state = self.lock();
        if state.epoch != epoch {
            debug!(node_id = %node_id, "discarding fetch from a previous scenario");
            return result;
        }
        if state
            .in_flight
            .get(&node_id)
            .is_some_and(|pending| pending.ptr_eq(&fetch))
        {
            state.in_flight.remove(&node_id);
        }
        match &result {
            Ok(node) => {
                if !state.nodes.contains_key(&node_id) {
                    state.nodes.insert(node_id, node.clone());
                    state.generation += 1;
                }
            }
            Err(error) => warn!(node_id = %node_id, %error, "node fetch failed"),
        }
        result
    }

    /// Returns the node if it is cached, without fetching.
    #[must_use]
    pub fn peek(&self, node_id: NodeId) -> Option<Node> {
        self.lock().nodes.get(&node_id).cloned()
    }

    /// Returns `true` if a fetch for the node is outstanding.
    #[must_use]
    pub fn is_fetching(&self, node_id: NodeId) -> bool {
        self.lock().in_flight.contains_key(&node_id)
    }

    /// Number of cached nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().nodes.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().nodes.is_empty()
    }

    /// The active scenario root.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.lock().root
    }

    /// Counter bumped whenever the cached contents change.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Drops every cached node and in-flight fetch and makes `root` the
    /// active scenario. Fetches still running for the old scenario are not
    /// stored when they complete.
    pub fn reset(&self, root: Option<NodeId>) {
        let mut state = self.lock();
        info!(
            previous_root = ?state.root,
            root = ?root,
            dropped = state.nodes.len(),
            "resetting graph cache"
        );
        state.root = root;
        state.epoch += 1;
        state.generation += 1;
        state.nodes.clear();
        state.in_flight.clear();
    }

    /// Drops one cached node so the next `get` refetches it.
    pub fn invalidate(&self, node_id: NodeId) {
        let mut state = self.lock();
        if state.nodes.remove(&node_id).is_some() {
            debug!(node_id = %node_id, "invalidated cached node");
            state.generation += 1;
        }
    }

    /// Stores a node the caller already holds, e.g. one returned by an edit.
    pub fn store(&self, node: Node) {
        let mut state = self.lock();
        state.nodes.insert(node.id, node);
        state.generation += 1;
    }

    /// Snapshot of the currently cached nodes.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        let state = self.lock();
        GraphSnapshot::new(state.root, state.generation, state.nodes.values().cloned())
    }

    /// Fetches every node reachable from `root` through resolved routes, one
    /// breadth-first layer at a time, and returns the resulting snapshot.
    ///
    /// A node that fails to fetch is recorded in the snapshot's failures and
    /// its subtree is skipped; the rest of the traversal continues.
    pub async fn prefetch_reachable(&self, root: NodeId) -> GraphSnapshot {
        let mut seen = HashSet::from([root]);
        let mut frontier = vec![root];
        let mut failures = Vec::new();

        while !frontier.is_empty() {
            let results = join_all(frontier.iter().map(|node_id| self.get(*node_id))).await;
            let mut next = Vec::new();
            for (node_id, result) in frontier.iter().zip(results) {
                match result {
                    Ok(node) => {
                        next.extend(node.resolved_targets().filter(|target| seen.insert(*target)));
                    }
                    Err(error) => failures.push((*node_id, error)),
                }
            }
            frontier = next;
        }

        if !failures.is_empty() {
            warn!(root = %root, failed = failures.len(), "prefetch left unreachable nodes");
        }
        self.snapshot().with_failures(failures)
    }
}
