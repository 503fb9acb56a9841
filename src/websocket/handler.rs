//! Connection handler
//!
//! Owns the lifecycle of one upgraded WebSocket: registers with the hub
//! before any message is processed, pumps inbound frames through the router,
//! forwards outbound frames (responses and broadcasts alike) from the
//! per-connection channel, and deregisters exactly once on close — whether
//! the client closed, the server closed, or the transport failed.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::messages::Response;
use crate::server::GatewayState;

/// Drive an established WebSocket connection until it closes
pub(crate) async fn handle_socket(socket: WebSocket, state: Arc<GatewayState>, peer: String) {
    let (mut sender, mut receiver) = socket.split();

    // Per-connection outbound channel; the hub holds a clone for broadcasts.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let connection_id = match state.hub.register(tx.clone(), peer.clone()).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "connection refused");
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    // Forward frames from the channel to the socket, in FIFO order.
    let conn_id_for_send = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                tracing::debug!(
                    connection_id = %conn_id_for_send,
                    "socket send failed, closing connection"
                );
                break;
            }
        }
    });

    // Route inbound frames; every request gets exactly one response.
    let state_for_recv = Arc::clone(&state);
    let conn_id_for_recv = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(message) => {
                    if !handle_message(&state_for_recv, &tx, message).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "socket receive error"
                    );
                    break;
                }
            }
        }
    });

    // Whichever side finishes first tears the other down.
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    state.hub.unregister(&connection_id).await;
}

/// Handle one inbound frame; returns false when the connection should close
async fn handle_message(
    state: &Arc<GatewayState>,
    tx: &mpsc::UnboundedSender<String>,
    message: Message,
) -> bool {
    match message {
        Message::Text(text) => {
            let response = state.router.route_text(&text).await;
            send_response(tx, &response);
            true
        }
        Message::Binary(_) => {
            let response = state.router.reject_binary();
            send_response(tx, &response);
            true
        }
        // Axum answers pings itself; pongs just confirm liveness.
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => false,
    }
}

/// Serialize a response and queue it for this connection
fn send_response(tx: &mpsc::UnboundedSender<String>, response: &Response) {
    match serde_json::to_string(response) {
        Ok(payload) => {
            tracing::debug!(payload = %payload, "response sent");
            // A closed channel here means the connection is already being
            // torn down; the frame is dropped silently.
            let _ = tx.send(payload);
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response");
        }
    }
}
