//! Navigation against the graph cache.
//!
//! A navigation runs in two phases so a slow fetch never blocks newer
//! requests: [`Navigator::begin`] issues a ticket, the fetch runs without
//! touching presentation state, and [`Navigator::complete`] applies the
//! result only if the ticket is still the latest.

use std::sync::Arc;

use storycast_core::error::PresentationError;
use storycast_core::ids::{NodeId, SessionId};
use storycast_core::node::Node;
use storycast_graph::application::cache::GraphCache;
use storycast_graph::application::path_engine::PathEngine;
use storycast_graph::domain::snapshot::GraphSnapshot;
use tracing::{debug, info, instrument, warn};

use super::bridge::DisplayBridge;
use crate::domain::state::{NavigationTicket, PresentationState};

/// Result of a navigation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The node became current.
    Applied(NodeId),
    /// A newer navigation was issued while this one was fetching; its
    /// result was discarded.
    Superseded(NodeId),
}

/// Moves the current node and keeps the displayed path in step.
#[derive(Debug, Clone)]
pub struct Navigator {
    cache: Arc<GraphCache>,
    bridge: DisplayBridge,
}

impl Navigator {
    #[must_use]
    pub fn new(cache: Arc<GraphCache>, bridge: DisplayBridge) -> Self {
        Self { cache, bridge }
    }

    /// The cache navigations read through.
    #[must_use]
    pub fn cache(&self) -> &Arc<GraphCache> {
        &self.cache
    }

    /// The bridge successful navigations render through.
    #[must_use]
    pub fn bridge(&self) -> &DisplayBridge {
        &self.bridge
    }

    /// Makes `root` the active scenario: drops everything cached for the
    /// previous one, restarts history at `root` and computes its path.
    ///
    /// # Errors
    ///
    /// Returns the fetch error for `root`. History and the previous scenario
    /// are left in place, so a later selection of `root` fetches again.
    #[instrument(skip(self, state, engine))]
    pub async fn select_scenario(
        &self,
        state: &mut PresentationState,
        engine: &mut PathEngine,
        root: NodeId,
    ) -> Result<(), PresentationError> {
        self.cache.reset(Some(root));
        engine.reset();

        if let Err(error) = self.cache.get(root).await {
            warn!(%error, "scenario root could not be fetched");
            self.cache.reset(state.root());
            state.record_error(error.clone());
            return Err(error);
        }
        state.select_root(root);
        self.refresh_path(state, engine).await;
        info!(root = %root, "scenario selected");
        Ok(())
    }

    /// Issues a navigation ticket for `node_id`.
    pub fn begin(&self, state: &mut PresentationState, node_id: NodeId) -> NavigationTicket {
        state.begin_navigation(node_id)
    }

    /// Fetches the ticket's node through the cache.
    ///
    /// # Errors
    ///
    /// Returns the cache's fetch error.
    pub async fn fetch(&self, ticket: &NavigationTicket) -> Result<Node, PresentationError> {
        self.cache.get(ticket.node_id).await
    }

    /// Applies a finished fetch. A superseded ticket changes nothing. A
    /// failure is recorded and the previous node stays current. On success
    /// the node is appended to history, the path is recomputed and, when a
    /// session is held, the display is told to load it.
    ///
    /// # Errors
    ///
    /// Returns the fetch error of a still-current ticket.
    pub async fn complete(
        &self,
        state: &mut PresentationState,
        engine: &mut PathEngine,
        ticket: NavigationTicket,
        fetched: Result<Node, PresentationError>,
        session_id: Option<SessionId>,
    ) -> Result<NavigationOutcome, PresentationError> {
        if !state.is_latest(&ticket) {
            debug!(node_id = %ticket.node_id, "discarding superseded navigation");
            return Ok(NavigationOutcome::Superseded(ticket.node_id));
        }
        if let Err(error) = fetched {
            warn!(node_id = %ticket.node_id, %error, "navigation failed");
            state.record_error(error.clone());
            return Err(error);
        }

        state.arrive(&ticket);
        self.refresh_path(state, engine).await;
        if let Some(session_id) = session_id {
            self.bridge.load_node(ticket.node_id, session_id);
        }
        Ok(NavigationOutcome::Applied(ticket.node_id))
    }

    /// Navigates to `node_id` in one call. With no scenario selected the
    /// node becomes the scenario root.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the previous node stays current.
    #[instrument(skip(self, state, engine))]
    pub async fn navigate(
        &self,
        state: &mut PresentationState,
        engine: &mut PathEngine,
        node_id: NodeId,
        session_id: Option<SessionId>,
    ) -> Result<NavigationOutcome, PresentationError> {
        if state.root().is_none() {
            self.select_scenario(state, engine, node_id).await?;
            if let Some(session_id) = session_id {
                self.bridge.load_node(node_id, session_id);
            }
            return Ok(NavigationOutcome::Applied(node_id));
        }

        let ticket = self.begin(state, node_id);
        let fetched = self.fetch(&ticket).await;
        self.complete(state, engine, ticket, fetched, session_id)
            .await
    }

    /// Drops the cached copy of `node_id` and navigates to a fresh one.
    ///
    /// # Errors
    ///
    /// Returns the refetch error.
    pub async fn reload(
        &self,
        state: &mut PresentationState,
        engine: &mut PathEngine,
        node_id: NodeId,
        session_id: Option<SessionId>,
    ) -> Result<NavigationOutcome, PresentationError> {
        self.cache.invalidate(node_id);
        self.navigate(state, engine, node_id, session_id).await
    }

    /// Breadcrumb jump to history position `index`. Returns the node jumped
    /// to, or `None` for an out-of-range index.
    pub async fn jump_back(
        &self,
        state: &mut PresentationState,
        engine: &mut PathEngine,
        index: usize,
        session_id: Option<SessionId>,
    ) -> Option<NodeId> {
        let node_id = state.jump_to(index)?;
        self.refresh_path(state, engine).await;
        if let Some(session_id) = session_id {
            self.bridge.load_node(node_id, session_id);
        }
        Some(node_id)
    }

    /// Fetches the scenario's reachable nodes and recomputes the displayed
    /// path for the current history. Returns the snapshot used.
    pub async fn refresh_path(
        &self,
        state: &mut PresentationState,
        engine: &mut PathEngine,
    ) -> GraphSnapshot {
        let Some(root) = state.root() else {
            state.set_path(Vec::new());
            return self.cache.snapshot();
        };
        let snapshot = self.cache.prefetch_reachable(root).await;
        let path = engine.longest_path(&snapshot, Some(root), state.history().as_slice());
        state.set_path(path);
        snapshot
    }
}
