//! Presentation client: one host or follower, wired together.

use std::ops::ControlFlow;
use std::sync::Arc;

use chrono::Duration;
use storycast_core::channel::{ChannelSignal, ChannelSubscription, EventChannel};
use storycast_core::clock::Clock;
use storycast_core::content::ContentService;
use storycast_core::display::DisplaySurface;
use storycast_core::error::PresentationError;
use storycast_core::ids::{ClientId, NodeId, SessionId};
use storycast_graph::application::cache::GraphCache;
use storycast_graph::application::editor::GraphEditor;
use storycast_graph::application::path_engine::PathEngine;
use storycast_graph::domain::paths::PathEntry;
use storycast_graph::domain::snapshot::{DanglingRoute, GraphSnapshot};
use tracing::{debug, info, instrument};

use super::bridge::DisplayBridge;
use super::controller::SessionController;
use super::navigator::{NavigationOutcome, Navigator};
use super::sync::{SyncContext, SyncLayer, SyncOutcome};
use crate::domain::dedup::{DEFAULT_DEDUP_WINDOW_MS, DuplicateFilter};
use crate::domain::session::{Authority, Session};
use crate::domain::state::PresentationState;

/// Per-client settings fixed at construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_id: ClientId,
    pub authority: Authority,
    /// Observe the session without fetching or rendering on inbound
    /// navigation.
    pub externally_controlled: bool,
    /// Window inside which a repeated `(node, session)` navigation is dropped.
    pub dedup_window: Duration,
}

impl ClientConfig {
    /// A presenting client.
    #[must_use]
    pub fn host(client_id: ClientId) -> Self {
        Self::new(client_id, Authority::Host)
    }

    /// A client driven by inbound events.
    #[must_use]
    pub fn follower(client_id: ClientId) -> Self {
        Self::new(client_id, Authority::Follower)
    }

    fn new(client_id: ClientId, authority: Authority) -> Self {
        Self {
            client_id,
            authority,
            externally_controlled: false,
            dedup_window: Duration::milliseconds(DEFAULT_DEDUP_WINDOW_MS),
        }
    }

    #[must_use]
    pub fn externally_controlled(mut self) -> Self {
        self.externally_controlled = true;
        self
    }

    #[must_use]
    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }
}

/// Owns one client's cache, path engine, session controller, sync layer
/// and presentation state. All mutation goes through `&mut self`.
pub struct PresentationClient {
    service: Arc<dyn ContentService>,
    channel: Arc<dyn EventChannel>,
    navigator: Navigator,
    controller: SessionController,
    sync: SyncLayer,
    state: PresentationState,
    engine: PathEngine,
}

impl std::fmt::Debug for PresentationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationClient")
            .field("controller", &self.controller)
            .field("sync", &self.sync)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl PresentationClient {
    #[must_use]
    pub fn new(
        config: ClientConfig,
        service: Arc<dyn ContentService>,
        channel: Arc<dyn EventChannel>,
        surface: Arc<dyn DisplaySurface>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let bridge = DisplayBridge::new(surface);
        let cache = Arc::new(GraphCache::new(Arc::clone(&service)));
        let controller = SessionController::new(
            config.client_id,
            config.authority,
            Arc::clone(&channel),
            bridge.clone(),
            Arc::clone(&clock),
        );
        let sync = SyncLayer::new(
            config.externally_controlled,
            DuplicateFilter::new(config.dedup_window),
            clock,
        );
        Self {
            service,
            channel,
            navigator: Navigator::new(cache, bridge),
            controller,
            sync,
            state: PresentationState::new(),
            engine: PathEngine::new(),
        }
    }

    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.controller.client_id()
    }

    #[must_use]
    pub fn is_host(&self) -> bool {
        self.controller.is_host()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.controller.is_active()
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.controller.session()
    }

    #[must_use]
    pub fn state(&self) -> &PresentationState {
        &self.state
    }

    #[must_use]
    pub fn current(&self) -> Option<NodeId> {
        self.state.current()
    }

    #[must_use]
    pub fn path(&self) -> &[PathEntry] {
        self.state.path()
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<GraphCache> {
        self.navigator.cache()
    }

    /// Authoring operations over this client's cache.
    #[must_use]
    pub fn editor(&self) -> GraphEditor {
        GraphEditor::new(Arc::clone(&self.service), Arc::clone(self.navigator.cache()))
    }

    /// Subscribes to this client's channel.
    #[must_use]
    pub fn subscribe(&self) -> ChannelSubscription {
        self.channel.subscribe()
    }

    /// Routes of the active scenario whose targets do not exist.
    pub async fn dangling_routes(&self) -> Vec<DanglingRoute> {
        self.editor().dangling_routes(&self.reachable().await)
    }

    async fn reachable(&self) -> GraphSnapshot {
        match self.state.root() {
            Some(root) => self.navigator.cache().prefetch_reachable(root).await,
            None => self.navigator.cache().snapshot(),
        }
    }

    /// Render target for local navigation: only a live session drives the
    /// display.
    fn live_session(&self) -> Option<SessionId> {
        self.controller
            .session()
            .filter(|session| session.active)
            .map(|session| session.session_id)
    }

    /// Switches scenario.
    ///
    /// # Errors
    ///
    /// Returns the root's fetch error.
    pub async fn select_scenario(&mut self, root: NodeId) -> Result<(), PresentationError> {
        self.navigator
            .select_scenario(&mut self.state, &mut self.engine, root)
            .await
    }

    /// Local navigation. An active host broadcasts the move.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the previous node stays current.
    #[instrument(skip(self), fields(client_id = %self.client_id()))]
    pub async fn navigate(&mut self, node_id: NodeId) -> Result<NavigationOutcome, PresentationError> {
        let session = self.live_session();
        let outcome = self
            .navigator
            .navigate(&mut self.state, &mut self.engine, node_id, session)
            .await?;
        if let NavigationOutcome::Applied(node_id) = outcome {
            self.controller.announce_navigation(node_id).await;
        }
        Ok(outcome)
    }

    /// Breadcrumb jump. An active host broadcasts the move.
    pub async fn jump_back(&mut self, index: usize) -> Option<NodeId> {
        let session = self.live_session();
        let node_id = self
            .navigator
            .jump_back(&mut self.state, &mut self.engine, index, session)
            .await?;
        self.controller.announce_navigation(node_id).await;
        Some(node_id)
    }

    /// Starts presenting from the current node.
    ///
    /// # Errors
    ///
    /// See [`SessionController::start`].
    pub async fn start(&mut self) -> Result<Session, PresentationError> {
        self.controller.start(self.state.current()).await
    }

    /// Stops presenting.
    pub async fn end(&mut self) -> Option<SessionId> {
        self.controller.end().await
    }

    /// Applies one inbound channel signal.
    pub async fn handle_signal(&mut self, signal: ChannelSignal) -> SyncOutcome {
        let ctx = SyncContext {
            controller: &mut self.controller,
            navigator: &self.navigator,
            state: &mut self.state,
            engine: &mut self.engine,
        };
        self.sync.handle(signal, ctx).await
    }

    /// Handles signals from `subscription` until the channel closes or
    /// `on_outcome` breaks.
    pub async fn run<F>(&mut self, mut subscription: ChannelSubscription, mut on_outcome: F)
    where
        F: FnMut(&SyncOutcome) -> ControlFlow<()>,
    {
        info!(client_id = %self.client_id(), "presentation client listening");
        while let Some(signal) = subscription.recv().await {
            let outcome = self.handle_signal(signal).await;
            debug!(?outcome, "signal handled");
            if on_outcome(&outcome).is_break() {
                break;
            }
        }
        info!(client_id = %self.client_id(), "presentation client stopped");
    }
}
