//! `reqwest` implementation of the `ContentService` trait.
//!
//! Endpoints, relative to the configured base URL:
//!
//! | operation | request |
//! |-----------|---------|
//! | list roots | `GET /nodes/roots` |
//! | list unlinked | `GET /nodes/unlinked` |
//! | fetch node | `GET /nodes/{id}` |
//! | create node | `POST /nodes` `{title}` |
//! | update node | `PATCH /nodes/{id}` `{field, value}` |
//! | delete scenario | `DELETE /nodes/{id}/scenario` |
//! | duplicate node | `POST /nodes/{id}/duplicate` |
//! | create route | `POST /nodes/{id}/routes` `{title}` |
//! | rename route | `PATCH /routes/{id}` `{title}` |
//! | delete route | `DELETE /routes/{id}` |
//! | set route target | `PUT /routes/{id}/target` `{toNodeId}` |

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use storycast_core::content::ContentService;
use storycast_core::error::PresentationError;
use storycast_core::ids::{NodeId, RouteId};
use storycast_core::node::{Node, NodeField, NodeSummary, Route};
use tracing::{debug, warn};

use crate::config::ContentClientConfig;

/// What a request is about, for mapping a 404.
#[derive(Debug, Clone, Copy)]
enum Subject {
    Node(NodeId),
    Route(RouteId),
    Listing,
}

/// HTTP-backed content service.
#[derive(Debug, Clone)]
pub struct HttpContentService {
    client: Client,
    base_url: String,
}

impl HttpContentService {
    /// Creates a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns `PresentationError::Infrastructure` if the HTTP client
    /// cannot be built.
    pub fn new(config: &ContentClientConfig) -> Result<Self, PresentationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PresentationError::Infrastructure(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        subject: Subject,
    ) -> Result<Response, PresentationError> {
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, ?subject, "content service unreachable");
            PresentationError::TransientFetch(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        debug!(%status, ?subject, message, "content service rejected request");
        Err(map_status(status, subject, message))
    }

    async fn json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        subject: Subject,
    ) -> Result<T, PresentationError> {
        self.send(request, subject)
            .await?
            .json()
            .await
            .map_err(|e| PresentationError::Infrastructure(format!("malformed response: {e}")))
    }

    async fn json_with<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        body: &B,
        subject: Subject,
    ) -> Result<T, PresentationError> {
        self.json(request.json(body), subject).await
    }
}

fn map_status(status: StatusCode, subject: Subject, message: String) -> PresentationError {
    match (status, subject) {
        (StatusCode::NOT_FOUND, Subject::Node(node_id)) => {
            PresentationError::InvalidGraphReference(node_id)
        }
        (StatusCode::NOT_FOUND, Subject::Route(route_id)) => {
            PresentationError::Validation(format!("route {route_id} not found"))
        }
        (StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY, _) => {
            PresentationError::Validation(message)
        }
        (StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS, _) => {
            PresentationError::TransientFetch(format!("{status}: {message}"))
        }
        (status, _) if status.is_server_error() => {
            PresentationError::TransientFetch(format!("{status}: {message}"))
        }
        (status, _) => PresentationError::Infrastructure(format!("{status}: {message}")),
    }
}

#[async_trait]
impl ContentService for HttpContentService {
    async fn list_root_nodes(&self) -> Result<Vec<NodeSummary>, PresentationError> {
        self.json(self.client.get(self.url("/nodes/roots")), Subject::Listing)
            .await
    }

    async fn fetch_node(&self, node_id: NodeId) -> Result<Node, PresentationError> {
        debug!(%node_id, "fetching node over http");
        self.json(
            self.client.get(self.url(&format!("/nodes/{node_id}"))),
            Subject::Node(node_id),
        )
        .await
    }

    async fn create_node(&self, title: &str) -> Result<Node, PresentationError> {
        self.json_with(
            self.client.post(self.url("/nodes")),
            &json!({ "title": title }),
            Subject::Listing,
        )
        .await
    }

    async fn delete_root_node(&self, node_id: NodeId) -> Result<(), PresentationError> {
        self.send(
            self.client
                .delete(self.url(&format!("/nodes/{node_id}/scenario"))),
            Subject::Node(node_id),
        )
        .await?;
        Ok(())
    }

    async fn update_node(
        &self,
        node_id: NodeId,
        field: NodeField,
    ) -> Result<Node, PresentationError> {
        self.json_with(
            self.client.patch(self.url(&format!("/nodes/{node_id}"))),
            &field,
            Subject::Node(node_id),
        )
        .await
    }

    async fn create_route(
        &self,
        from_node_id: NodeId,
        title: &str,
    ) -> Result<Route, PresentationError> {
        self.json_with(
            self.client
                .post(self.url(&format!("/nodes/{from_node_id}/routes"))),
            &json!({ "title": title }),
            Subject::Node(from_node_id),
        )
        .await
    }

    async fn update_route_title(
        &self,
        route_id: RouteId,
        title: &str,
    ) -> Result<Route, PresentationError> {
        self.json_with(
            self.client.patch(self.url(&format!("/routes/{route_id}"))),
            &json!({ "title": title }),
            Subject::Route(route_id),
        )
        .await
    }

    async fn delete_route(&self, route_id: RouteId) -> Result<(), PresentationError> {
        self.send(
            self.client.delete(self.url(&format!("/routes/{route_id}"))),
            Subject::Route(route_id),
        )
        .await?;
        Ok(())
    }

    async fn set_route_target(
        &self,
        route_id: RouteId,
        target: Option<NodeId>,
    ) -> Result<Route, PresentationError> {
        let subject = target.map_or(Subject::Route(route_id), Subject::Node);
        self.json_with(
            self.client
                .put(self.url(&format!("/routes/{route_id}/target"))),
            &json!({ "toNodeId": target }),
            subject,
        )
        .await
    }

    async fn duplicate_node(&self, node_id: NodeId) -> Result<Node, PresentationError> {
        self.json(
            self.client
                .post(self.url(&format!("/nodes/{node_id}/duplicate"))),
            Subject::Node(node_id),
        )
        .await
    }

    async fn list_unlinked_nodes(&self) -> Result<Vec<NodeSummary>, PresentationError> {
        self.json(self.client.get(self.url("/nodes/unlinked")), Subject::Listing)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_node_is_invalid_graph_reference() {
        let node_id = NodeId::new();

        let error = map_status(StatusCode::NOT_FOUND, Subject::Node(node_id), String::new());

        assert_eq!(error, PresentationError::InvalidGraphReference(node_id));
    }

    #[test]
    fn test_server_errors_are_retriable() {
        let bad_gateway = map_status(StatusCode::BAD_GATEWAY, Subject::Listing, "down".into());
        let throttled = map_status(StatusCode::TOO_MANY_REQUESTS, Subject::Listing, String::new());

        assert!(bad_gateway.is_retriable());
        assert!(throttled.is_retriable());
    }

    #[test]
    fn test_client_errors_are_not_retriable() {
        let invalid = map_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            Subject::Listing,
            "title must not be blank".into(),
        );
        let forbidden = map_status(StatusCode::FORBIDDEN, Subject::Listing, String::new());

        assert_eq!(
            invalid,
            PresentationError::Validation("title must not be blank".into())
        );
        assert!(matches!(forbidden, PresentationError::Infrastructure(_)));
    }
}
