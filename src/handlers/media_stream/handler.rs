//! Axum WebSocket handler for the media stream
//!
//! This module contains the WebSocket upgrade handler and the per-connection loop.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::state::AppState;

use super::{
    messages::OutgoingMessage,
    processor::{ConnectionState, handle_incoming_message, parse_frame},
};

/// Outbound frames queued per connection before senders wait
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Media stream handler
/// Upgrades the HTTP connection to a WebSocket carrying one call's audio
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Media stream connection upgrade requested");
    ws.on_upgrade(move |socket| handle_media_socket(socket, state))
}

/// Handle one media stream connection until the provider stops it or the socket closes
async fn handle_media_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("Media stream connection established");

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<OutgoingMessage>(CHANNEL_BUFFER_SIZE);

    // Single writer for the socket
    let sender_task = tokio::spawn(async move {
        while let Some(message) = message_rx.recv().await {
            let json_str = match serde_json::to_string(&message) {
                Ok(json_str) => json_str,
                Err(e) => {
                    error!("Failed to serialize outgoing message: {}", e);
                    continue;
                }
            };

            if let Err(e) = sender.send(Message::Text(json_str.into())).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    let mut state = ConnectionState::default();

    while let Some(msg_result) = receiver.next().await {
        match msg_result {
            Ok(msg) => {
                if !process_message(msg, &mut state, &message_tx, &app_state).await {
                    break;
                }
            }
            Err(e) => {
                warn!("WebSocket error: {}", e);
                break;
            }
        }
    }

    // Clean up resources
    if let Some(session) = state.session.take()
        && let Err(e) = session.stop().await
    {
        error!("Failed to stop session cleanly: {}", e);
    }
    if let Some(call_sid) = state.call_sid.take() {
        app_state.sessions.remove(&call_sid);
    }
    sender_task.abort();

    info!("Media stream connection terminated");
}

/// Process one WebSocket message. Returns false to end the connection.
async fn process_message(
    msg: Message,
    state: &mut ConnectionState,
    message_tx: &mpsc::Sender<OutgoingMessage>,
    app_state: &Arc<AppState>,
) -> bool {
    match msg {
        Message::Text(text) => {
            let result = match parse_frame(&text) {
                Ok(incoming) => {
                    handle_incoming_message(incoming, state, message_tx, app_state).await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(keep_going) => keep_going,
                Err(e) if e.is_fatal() => {
                    error!("{}", e);
                    false
                }
                Err(e) => {
                    warn!("Dropping media stream frame: {}", e);
                    true
                }
            }
        }
        Message::Binary(data) => {
            debug!("Ignoring binary frame: {} bytes", data.len());
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            info!("WebSocket connection closed by client");
            false
        }
    }
}
