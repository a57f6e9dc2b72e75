//! WebSocket endpoint carrying channel events.
//!
//! Each text frame from a client is one encoded `ChannelEvent`. Frames that
//! do not decode are logged and dropped.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use storycast_core::channel::ChannelSignal;
use storycast_core::event::ChannelEvent;
use storycast_core::ids::ClientId;
use tracing::{debug, info, instrument, warn};

use crate::hub::RelayHub;
use crate::state::AppState;

/// GET /ws
#[instrument(skip_all)]
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

async fn handle_socket(socket: WebSocket, hub: Arc<RelayHub>) {
    let client_id = ClientId::new();
    info!(%client_id, "client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subscription = hub.subscribe(client_id);

    let send_task = tokio::spawn(async move {
        while let Some(signal) = subscription.recv().await {
            let ChannelSignal::Event(event) = signal else {
                continue;
            };
            if ws_tx.send(Message::Text(event.encode().into())).await.is_err() {
                debug!(%client_id, "send failed, client gone");
                break;
            }
        }
    });

    while let Some(frame) = ws_rx.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(%client_id, error = %e, "websocket error");
                break;
            }
        };
        match ChannelEvent::decode(text.as_str()) {
            Ok(event) => {
                hub.publish(client_id, event);
            }
            Err(error) => warn!(%client_id, %error, "dropping unrecognized frame"),
        }
    }

    info!(%client_id, "client disconnected");
    send_task.abort();
}

/// Returns the WebSocket router.
pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}
