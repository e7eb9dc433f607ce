//! WebSocket handler for real-time updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tracing::{debug, info};

use crate::hub::Session;
use crate::state::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let Session {
        id: session,
        mut outbound,
    } = state.hub.connect();

    info!(session = %session, "WebSocket client connected");

    // Forward queued events to this client
    let mut send_task = tokio::spawn(async move {
        while let Some(json) = outbound.recv().await {
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!(session = %session, "WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    // Forward client payloads to command intake
    let hub = state.hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => hub.submit(session, text.as_str()),
                Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                    Ok(text) => hub.submit(session, text),
                    Err(_) => debug!(session = %session, len = bytes.len(), "Ignoring non-UTF-8 binary frame"),
                },
                Ok(Message::Close(_)) => {
                    debug!(session = %session, "WebSocket client sent close frame");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(session = %session, error = %e, "WebSocket receive failed");
                    break;
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.disconnect(session);
    info!(session = %session, "WebSocket client disconnected");
}
