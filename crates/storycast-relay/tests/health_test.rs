//! Integration tests for the health endpoint.

mod common;

use axum::http::StatusCode;
use storycast_core::event::ChannelEvent;
use storycast_core::ids::{ClientId, SessionId};

#[tokio::test]
async fn test_health_names_the_relay() {
    let (app, _) = common::build_test_app();

    let (status, json) = common::get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "storycast-relay");
    assert!(json["version"].is_string());
    assert_eq!(json["openSessions"], 0);
}

#[tokio::test]
async fn test_health_counts_open_sessions() {
    // Arrange
    let (app, hub) = common::build_test_app();
    let host_id = ClientId::new();
    let (open, closed) = (SessionId::new(), SessionId::new());
    for session_id in [open, closed] {
        hub.publish(
            host_id,
            ChannelEvent::SessionStart {
                session_id,
                host_id,
                node_id: None,
            },
        );
    }
    hub.publish(host_id, ChannelEvent::SessionEnd { session_id: closed });

    // Act
    let (status, json) = common::get_json(app, "/health").await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["openSessions"], 1);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (app, _) = common::build_test_app();

    let status = common::get_status(app, "/api/v1/nonexistent").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ws_without_upgrade_is_rejected() {
    let (app, _) = common::build_test_app();

    let status = common::get_status(app, "/ws").await;

    assert!(status.is_client_error());
}
