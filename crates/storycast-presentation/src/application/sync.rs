//! Reconciles local presentation state with inbound channel traffic.
//!
//! Every inbound signal passes, in order: session scoping, duplicate
//! suppression, the externally-controlled gate, then the no-op
//! short-circuit. Only what survives all four reaches the navigator.

use std::sync::Arc;

use storycast_core::channel::ChannelSignal;
use storycast_core::clock::Clock;
use storycast_core::error::PresentationError;
use storycast_core::event::ChannelEvent;
use storycast_core::ids::{NodeId, SessionId};
use storycast_graph::application::path_engine::PathEngine;
use tracing::{debug, info, warn};

use super::bridge::WAITING_MESSAGE;
use super::controller::SessionController;
use super::navigator::{NavigationOutcome, Navigator};
use crate::domain::dedup::DuplicateFilter;
use crate::domain::state::PresentationState;

/// Why a signal changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Scoped to a session other than the one held.
    ForeignSession,
    /// Refers to a session this client never held, or reports none active.
    NoActiveSession,
    /// A resync query this client is not in a position to answer.
    NotAnswering,
    /// A resync answer addressed to followers.
    HostOnly,
}

/// What handling one signal did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Ignored(IgnoreReason),
    /// A repeat of a navigation seen inside the duplicate window.
    Duplicate(NodeId),
    /// Externally controlled: session bookkeeping only, no fetch or render.
    Deferred(NodeId),
    Navigated(NodeId),
    /// The navigation lost to a newer one while fetching.
    Superseded(NodeId),
    /// The node was already current; nothing was fetched.
    AlreadyCurrent(NodeId),
    /// The node was already current and was refetched on request.
    Refreshed(NodeId),
    SessionJoined(SessionId),
    SessionEnded(SessionId),
    /// A resync query was sent.
    ResyncRequested,
    /// An active host restored its announcement after reconnecting.
    Reannounced,
    /// A resync query was answered.
    Answered,
    /// The session has no current node yet.
    Waiting(SessionId),
    /// Quiz or poll toggle, passed through untouched.
    Auxiliary(ChannelEvent),
    /// Navigation failed; the previous node stays current.
    Failed(PresentationError),
    /// The transport dropped. Local state is kept.
    Disconnected,
}

/// Everything a signal may touch, borrowed for one call.
pub struct SyncContext<'a> {
    pub controller: &'a mut SessionController,
    pub navigator: &'a Navigator,
    pub state: &'a mut PresentationState,
    pub engine: &'a mut PathEngine,
}

/// Inbound half of channel synchronization.
pub struct SyncLayer {
    externally_controlled: bool,
    dedup: DuplicateFilter,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SyncLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncLayer")
            .field("externally_controlled", &self.externally_controlled)
            .field("dedup", &self.dedup)
            .finish_non_exhaustive()
    }
}

impl SyncLayer {
    /// Creates a sync layer. An externally controlled client tracks the
    /// session but never fetches or renders on inbound navigation.
    #[must_use]
    pub fn new(externally_controlled: bool, dedup: DuplicateFilter, clock: Arc<dyn Clock>) -> Self {
        Self {
            externally_controlled,
            dedup,
            clock,
        }
    }

    #[must_use]
    pub fn is_externally_controlled(&self) -> bool {
        self.externally_controlled
    }

    /// Applies one channel signal.
    pub async fn handle(&mut self, signal: ChannelSignal, ctx: SyncContext<'_>) -> SyncOutcome {
        match signal {
            ChannelSignal::Connected => Self::on_connected(ctx).await,
            ChannelSignal::Disconnected => {
                warn!("channel disconnected, keeping local state");
                SyncOutcome::Disconnected
            }
            ChannelSignal::Event(event) => self.on_event(event, ctx).await,
        }
    }

    async fn on_connected(ctx: SyncContext<'_>) -> SyncOutcome {
        if ctx.controller.is_host() && ctx.controller.is_active() {
            ctx.controller.reannounce(ctx.state.current()).await;
            return SyncOutcome::Reannounced;
        }
        let held = ctx.controller.session_id();
        debug!(?held, "asking for the active session");
        ctx.controller
            .broadcast(ChannelEvent::WhoIsHost { session_id: held })
            .await;
        SyncOutcome::ResyncRequested
    }

    async fn on_event(&mut self, event: ChannelEvent, ctx: SyncContext<'_>) -> SyncOutcome {
        if let Some(session_id) = event.session_id() {
            if !ctx.controller.accepts(session_id) {
                debug!(event_type = event.event_type(), %session_id, "ignoring foreign session");
                return SyncOutcome::Ignored(IgnoreReason::ForeignSession);
            }
        }

        match event {
            ChannelEvent::Navigate {
                session_id,
                node_id,
                refresh,
            } => self.on_navigate(session_id, node_id, refresh, ctx).await,
            ChannelEvent::CurrentNode {
                session_id,
                node_id: Some(node_id),
            } => self.on_navigate(session_id, node_id, false, ctx).await,
            ChannelEvent::CurrentNode {
                session_id,
                node_id: None,
            } => {
                if !self.externally_controlled {
                    ctx.show_waiting();
                }
                SyncOutcome::Waiting(session_id)
            }
            ChannelEvent::SessionStart {
                session_id,
                host_id,
                node_id,
            } => {
                if !ctx.controller.join(session_id, Some(host_id)) {
                    return SyncOutcome::Ignored(IgnoreReason::ForeignSession);
                }
                match node_id {
                    Some(node_id) => {
                        let outcome = self.on_navigate(session_id, node_id, false, ctx).await;
                        if let SyncOutcome::Failed(error) = outcome {
                            warn!(%error, "could not show the announced node");
                        }
                    }
                    None if !self.externally_controlled => ctx.show_waiting(),
                    None => {}
                }
                SyncOutcome::SessionJoined(session_id)
            }
            ChannelEvent::SessionEnd { session_id } => {
                let released = if self.externally_controlled {
                    ctx.controller.release(session_id)
                } else {
                    ctx.controller.end_remote(session_id)
                };
                if !released {
                    return SyncOutcome::Ignored(IgnoreReason::NoActiveSession);
                }
                ctx.state.end_session();
                self.dedup.clear();
                SyncOutcome::SessionEnded(session_id)
            }
            ChannelEvent::HostInfo { session_id, active } => {
                if ctx.controller.is_host() {
                    return SyncOutcome::Ignored(IgnoreReason::HostOnly);
                }
                let Some(session_id) = session_id.filter(|_| active) else {
                    debug!("no active session reported");
                    return SyncOutcome::Ignored(IgnoreReason::NoActiveSession);
                };
                if !ctx.controller.join(session_id, None) {
                    return SyncOutcome::Ignored(IgnoreReason::ForeignSession);
                }
                ctx.controller
                    .broadcast(ChannelEvent::WhatIsCurrentNode { session_id })
                    .await;
                SyncOutcome::ResyncRequested
            }
            query @ (ChannelEvent::WhoIsHost { .. } | ChannelEvent::WhatIsCurrentNode { .. }) => {
                if ctx.controller.answer(&query, ctx.state.current()).await {
                    SyncOutcome::Answered
                } else {
                    SyncOutcome::Ignored(IgnoreReason::NotAnswering)
                }
            }
            toggle @ ChannelEvent::Toggle { .. } => SyncOutcome::Auxiliary(toggle),
        }
    }

    async fn on_navigate(
        &mut self,
        session_id: SessionId,
        node_id: NodeId,
        refresh: bool,
        ctx: SyncContext<'_>,
    ) -> SyncOutcome {
        if !self.dedup.admit(node_id, session_id, self.clock.now()) {
            debug!(%node_id, %session_id, "dropping duplicate navigation");
            return SyncOutcome::Duplicate(node_id);
        }
        if !ctx.controller.adopt(session_id) {
            return SyncOutcome::Ignored(IgnoreReason::ForeignSession);
        }
        if self.externally_controlled {
            debug!(%node_id, "externally controlled, deferring navigation");
            return SyncOutcome::Deferred(node_id);
        }

        let session = Some(session_id);
        let result = if ctx.state.current() == Some(node_id) {
            if !refresh {
                return SyncOutcome::AlreadyCurrent(node_id);
            }
            ctx.navigator
                .reload(ctx.state, ctx.engine, node_id, session)
                .await
                .map(|_| SyncOutcome::Refreshed(node_id))
        } else {
            ctx.navigator
                .navigate(ctx.state, ctx.engine, node_id, session)
                .await
                .map(|outcome| match outcome {
                    NavigationOutcome::Applied(node_id) => {
                        info!(%node_id, %session_id, "followed navigation");
                        SyncOutcome::Navigated(node_id)
                    }
                    NavigationOutcome::Superseded(node_id) => SyncOutcome::Superseded(node_id),
                })
        };

        result.unwrap_or_else(|error| {
            // A re-emit of a failed navigation is a retry, not a duplicate.
            self.dedup.forget(node_id, session_id);
            SyncOutcome::Failed(error)
        })
    }
}

impl SyncContext<'_> {
    fn show_waiting(&self) {
        self.navigator.bridge().show_message(WAITING_MESSAGE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storycast_core::display::DisplayMessage;
    use storycast_core::event::{ToggleTarget, WHAT_IS_CURRENT_NODE_EVENT, WHO_IS_HOST_EVENT};
    use storycast_core::ids::ClientId;
    use storycast_graph::application::cache::GraphCache;
    use storycast_test_support::{
        InMemoryContentService, ManualClock, RecordingChannel, RecordingDisplaySurface, StoryGraph,
    };

    use crate::application::bridge::DisplayBridge;
    use crate::domain::session::Authority;

    struct Fixture {
        graph: StoryGraph,
        service: Arc<InMemoryContentService>,
        channel: Arc<RecordingChannel>,
        surface: Arc<RecordingDisplaySurface>,
        clock: Arc<ManualClock>,
        controller: SessionController,
        navigator: Navigator,
        state: PresentationState,
        engine: PathEngine,
        sync: SyncLayer,
    }

    impl Fixture {
        fn new(authority: Authority, externally_controlled: bool) -> Self {
            let graph = StoryGraph::new()
                .root("A")
                .route("A", "B")
                .route("A", "C")
                .route("B", "D");
            let service = Arc::new(graph.clone().into_service());
            let channel = Arc::new(RecordingChannel::new());
            let surface = Arc::new(RecordingDisplaySurface::new());
            let clock = Arc::new(ManualClock::new());
            let bridge = DisplayBridge::new(surface.clone());
            let controller = SessionController::new(
                ClientId::new(),
                authority,
                channel.clone(),
                bridge.clone(),
                clock.clone(),
            );
            let navigator = Navigator::new(Arc::new(GraphCache::new(service.clone())), bridge);
            let sync = SyncLayer::new(externally_controlled, DuplicateFilter::default(), clock.clone());
            Self {
                graph,
                service,
                channel,
                surface,
                clock,
                controller,
                navigator,
                state: PresentationState::new(),
                engine: PathEngine::new(),
                sync,
            }
        }

        fn follower() -> Self {
            Self::new(Authority::Follower, false)
        }

        async fn deliver(&mut self, signal: ChannelSignal) -> SyncOutcome {
            let ctx = SyncContext {
                controller: &mut self.controller,
                navigator: &self.navigator,
                state: &mut self.state,
                engine: &mut self.engine,
            };
            self.sync.handle(signal, ctx).await
        }

        async fn event(&mut self, event: ChannelEvent) -> SyncOutcome {
            self.deliver(ChannelSignal::Event(event)).await
        }
    }

    fn navigate(session_id: SessionId, node_id: NodeId) -> ChannelEvent {
        ChannelEvent::Navigate {
            session_id,
            node_id,
            refresh: false,
        }
    }

    #[tokio::test]
    async fn test_follower_navigates_and_renders() {
        // Arrange
        let mut f = Fixture::follower();
        let (a, b) = (f.graph.id("A"), f.graph.id("B"));
        let session_id = SessionId::new();

        // Act
        f.event(navigate(session_id, a)).await;
        let outcome = f.event(navigate(session_id, b)).await;

        // Assert
        assert_eq!(outcome, SyncOutcome::Navigated(b));
        assert_eq!(f.state.history().as_slice(), &[a, b]);
        assert_eq!(f.controller.session_id(), Some(session_id));
        assert_eq!(
            f.surface.last(),
            Some(DisplayMessage::LoadNode {
                node_id: b,
                session_id
            })
        );
    }

    #[tokio::test]
    async fn test_duplicate_inside_window_appends_once() {
        // Arrange
        let mut f = Fixture::follower();
        let (a, b) = (f.graph.id("A"), f.graph.id("B"));
        let session_id = SessionId::new();
        f.event(navigate(session_id, a)).await;
        let loads_before = f.surface.load_count();

        // Act
        let first = f.event(navigate(session_id, b)).await;
        f.clock.advance_millis(200);
        let second = f.event(navigate(session_id, b)).await;

        // Assert
        assert_eq!(first, SyncOutcome::Navigated(b));
        assert_eq!(second, SyncOutcome::Duplicate(b));
        assert_eq!(f.state.history().as_slice(), &[a, b]);
        assert_eq!(f.surface.load_count(), loads_before + 1);
    }

    #[tokio::test]
    async fn test_repeat_after_window_reaches_no_op_check() {
        let mut f = Fixture::follower();
        let a = f.graph.id("A");
        let session_id = SessionId::new();
        f.event(navigate(session_id, a)).await;

        f.clock.advance_millis(600);
        let outcome = f.event(navigate(session_id, a)).await;

        assert_eq!(outcome, SyncOutcome::AlreadyCurrent(a));
        assert_eq!(f.service.fetch_count(a), 1);
    }

    #[tokio::test]
    async fn test_refresh_of_current_node_refetches() {
        // Arrange
        let mut f = Fixture::follower();
        let a = f.graph.id("A");
        let session_id = SessionId::new();
        f.event(navigate(session_id, a)).await;
        f.clock.advance_millis(600);

        // Act
        let outcome = f
            .event(ChannelEvent::Navigate {
                session_id,
                node_id: a,
                refresh: true,
            })
            .await;

        // Assert
        assert_eq!(outcome, SyncOutcome::Refreshed(a));
        assert_eq!(f.service.fetch_count(a), 2);
        assert_eq!(f.state.history().as_slice(), &[a]);
    }

    #[tokio::test]
    async fn test_foreign_session_is_ignored() {
        // Arrange
        let mut f = Fixture::follower();
        let (a, b) = (f.graph.id("A"), f.graph.id("B"));
        let held = SessionId::new();
        f.event(navigate(held, a)).await;

        // Act
        let outcome = f.event(navigate(SessionId::new(), b)).await;

        // Assert
        assert_eq!(outcome, SyncOutcome::Ignored(IgnoreReason::ForeignSession));
        assert_eq!(f.state.current(), Some(a));
        assert_eq!(f.service.fetch_count(b), 0);
    }

    #[tokio::test]
    async fn test_externally_controlled_client_only_tracks_session() {
        // Arrange
        let mut f = Fixture::new(Authority::Follower, true);
        let x = f.graph.id("B");
        let session_id = SessionId::new();

        // Act
        let outcome = f.event(navigate(session_id, x)).await;

        // Assert
        assert_eq!(outcome, SyncOutcome::Deferred(x));
        assert_eq!(f.controller.session_id(), Some(session_id));
        assert_eq!(f.service.fetch_count(x), 0);
        assert!(f.state.history().is_empty());
        assert!(f.surface.messages().is_empty());
    }

    #[tokio::test]
    async fn test_connect_asks_for_active_session() {
        let mut f = Fixture::follower();

        let outcome = f.deliver(ChannelSignal::Connected).await;

        assert_eq!(outcome, SyncOutcome::ResyncRequested);
        assert_eq!(
            f.channel.emitted_of(WHO_IS_HOST_EVENT),
            vec![ChannelEvent::WhoIsHost { session_id: None }]
        );
    }

    #[tokio::test]
    async fn test_resync_handshake_lands_on_current_node() {
        // Arrange
        let mut f = Fixture::follower();
        let d = f.graph.id("D");
        let session_id = SessionId::new();
        f.deliver(ChannelSignal::Connected).await;

        // Act
        let asked = f
            .event(ChannelEvent::HostInfo {
                session_id: Some(session_id),
                active: true,
            })
            .await;
        let landed = f
            .event(ChannelEvent::CurrentNode {
                session_id,
                node_id: Some(d),
            })
            .await;

        // Assert
        assert_eq!(asked, SyncOutcome::ResyncRequested);
        assert_eq!(
            f.channel.emitted_of(WHAT_IS_CURRENT_NODE_EVENT),
            vec![ChannelEvent::WhatIsCurrentNode { session_id }]
        );
        assert_eq!(landed, SyncOutcome::Navigated(d));
        assert!(f.controller.is_active());
        assert_eq!(f.state.current(), Some(d));
    }

    #[tokio::test]
    async fn test_inactive_host_info_is_ignored() {
        let mut f = Fixture::follower();

        let outcome = f
            .event(ChannelEvent::HostInfo {
                session_id: None,
                active: false,
            })
            .await;

        assert_eq!(outcome, SyncOutcome::Ignored(IgnoreReason::NoActiveSession));
        assert_eq!(f.controller.session_id(), None);
    }

    #[tokio::test]
    async fn test_session_start_without_node_shows_waiting_message() {
        let mut f = Fixture::follower();
        let session_id = SessionId::new();

        let outcome = f
            .event(ChannelEvent::SessionStart {
                session_id,
                host_id: ClientId::new(),
                node_id: None,
            })
            .await;

        assert_eq!(outcome, SyncOutcome::SessionJoined(session_id));
        assert!(f.controller.is_active());
        assert_eq!(
            f.surface.last(),
            Some(DisplayMessage::ShowMessage {
                text: WAITING_MESSAGE.to_owned()
            })
        );
    }

    #[tokio::test]
    async fn test_session_end_clears_history_and_dedup() {
        // Arrange
        let mut f = Fixture::follower();
        let (a, b) = (f.graph.id("A"), f.graph.id("B"));
        let session_id = SessionId::new();
        f.event(ChannelEvent::SessionStart {
            session_id,
            host_id: ClientId::new(),
            node_id: Some(a),
        })
        .await;
        f.event(navigate(session_id, b)).await;

        // Act
        let outcome = f.event(ChannelEvent::SessionEnd { session_id }).await;

        // Assert
        assert_eq!(outcome, SyncOutcome::SessionEnded(session_id));
        assert!(!f.controller.is_active());
        assert_eq!(f.controller.session_id(), None);
        assert!(f.state.history().is_empty());
        assert_eq!(f.surface.last(), Some(DisplayMessage::SessionEnded {}));
    }

    #[tokio::test]
    async fn test_end_for_unheld_session_is_ignored() {
        let mut f = Fixture::follower();

        let outcome = f
            .event(ChannelEvent::SessionEnd {
                session_id: SessionId::new(),
            })
            .await;

        assert_eq!(outcome, SyncOutcome::Ignored(IgnoreReason::NoActiveSession));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_node() {
        // Arrange
        let mut f = Fixture::follower();
        let (a, c) = (f.graph.id("A"), f.graph.id("C"));
        let session_id = SessionId::new();
        f.service.fail_node(c);
        f.event(navigate(session_id, a)).await;

        // Act
        let outcome = f.event(navigate(session_id, c)).await;

        // Assert
        assert!(matches!(
            outcome,
            SyncOutcome::Failed(PresentationError::TransientFetch(_))
        ));
        assert_eq!(f.state.current(), Some(a));
    }

    #[tokio::test]
    async fn test_failed_first_navigation_is_retried_after_heal() {
        // Arrange
        let mut f = Fixture::follower();
        let a = f.graph.id("A");
        let session_id = SessionId::new();
        f.service.fail_node(a);

        // Act
        let failed = f.event(navigate(session_id, a)).await;
        f.service.heal_node(a);
        f.clock.advance_millis(600);
        let retried = f.event(navigate(session_id, a)).await;

        // Assert
        assert!(matches!(
            failed,
            SyncOutcome::Failed(PresentationError::TransientFetch(_))
        ));
        assert_eq!(retried, SyncOutcome::Navigated(a));
        assert_eq!(f.state.current(), Some(a));
        assert_eq!(f.surface.load_count(), 1);
    }

    #[tokio::test]
    async fn test_re_emit_inside_window_after_failure_is_retried() {
        // Arrange
        let mut f = Fixture::follower();
        let (a, c) = (f.graph.id("A"), f.graph.id("C"));
        let session_id = SessionId::new();
        f.event(navigate(session_id, a)).await;
        f.service.fail_node(c);
        let failed = f.event(navigate(session_id, c)).await;
        f.service.heal_node(c);

        // Act
        f.clock.advance_millis(100);
        let retried = f.event(navigate(session_id, c)).await;

        // Assert
        assert!(matches!(failed, SyncOutcome::Failed(_)));
        assert_eq!(retried, SyncOutcome::Navigated(c));
        assert_eq!(f.state.history().as_slice(), &[a, c]);
    }

    #[tokio::test]
    async fn test_toggle_passes_through() {
        let mut f = Fixture::follower();
        let toggle = ChannelEvent::Toggle {
            session_id: SessionId::new(),
            target: ToggleTarget::Poll,
            item_id: None,
            visible: true,
        };

        let outcome = f.event(toggle.clone()).await;

        assert_eq!(outcome, SyncOutcome::Auxiliary(toggle));
    }

    #[tokio::test]
    async fn test_active_host_reannounces_on_reconnect() {
        // Arrange
        let mut f = Fixture::new(Authority::Host, false);
        let session = f.controller.start(None).await.unwrap();
        f.channel.clear();

        // Act
        let outcome = f.deliver(ChannelSignal::Connected).await;

        // Assert
        assert_eq!(outcome, SyncOutcome::Reannounced);
        assert!(matches!(
            f.channel.emitted()[..],
            [ChannelEvent::SessionStart { session_id, .. }] if session_id == session.session_id
        ));
    }

    #[tokio::test]
    async fn test_disconnect_keeps_state() {
        let mut f = Fixture::follower();
        let a = f.graph.id("A");
        f.event(navigate(SessionId::new(), a)).await;

        let outcome = f.deliver(ChannelSignal::Disconnected).await;

        assert_eq!(outcome, SyncOutcome::Disconnected);
        assert_eq!(f.state.current(), Some(a));
    }
}
