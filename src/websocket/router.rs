//! Request router
//!
//! Turns one inbound frame into exactly one [`Response`]. Every failure mode
//! short of a transport error — unreadable JSON, unknown action, bad params,
//! watcher rejection — collapses into a `success = 0` response so that a
//! malformed command can never terminate the connection or the process.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use super::messages::{Command, Response};
use crate::watcher::{Watcher, WatcherError};

/// Routes parsed commands to the watcher facade
pub struct RequestRouter {
    watcher: Arc<dyn Watcher>,
}

/// Failures during dispatch, all caught at the routing boundary
#[derive(Debug, Error)]
enum DispatchError {
    #[error(transparent)]
    Watcher(#[from] WatcherError),

    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl RequestRouter {
    /// Create a router dispatching to the given watcher
    pub fn new(watcher: Arc<dyn Watcher>) -> Self {
        Self { watcher }
    }

    /// Process one text frame and produce the response to send back
    pub async fn route_text(&self, text: &str) -> Response {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable request payload");
                return Response::failure("");
            }
        };

        // Best-effort echo: whatever action string was syntactically
        // present comes back on the response, even for failures.
        let action = value
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        tracing::info!(action = %action, "request received");

        let params = value.get("params").cloned().unwrap_or(Value::Null);
        let command = match Command::parse(&action, params) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(action = %action, error = %e, "rejected request");
                return Response::failure(action);
            }
        };

        match self.dispatch(command).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(action = %action, error = %e, "dispatch failed");
                Response::failure(action)
            }
        }
    }

    /// Produce the failure response for a binary frame
    ///
    /// Binary input is a protocol violation; it is acknowledged with a
    /// failure rather than a close so the client can keep using the channel.
    pub fn reject_binary(&self) -> Response {
        tracing::warn!("binary frame rejected, this server only accepts text frames");
        Response::failure("")
    }

    async fn dispatch(&self, command: Command) -> Result<Response, DispatchError> {
        match command {
            Command::AddItem { item } => {
                // Submission is awaited before responding: success reflects
                // the actual outcome rather than acknowledging a submission
                // that may later fail silently.
                self.watcher.submit_item(item).await?;
                Ok(Response::acknowledged("addItem"))
            }
            Command::RemoveItem { id } => {
                self.watcher.remove_item(&id).await;
                Ok(Response::acknowledged("removeItem"))
            }
            Command::GetStats => {
                let stats = self.watcher.stats().await;
                Ok(Response::success("getStats", serde_json::to_value(stats)?))
            }
        }
    }
}
