//! Connection hub
//!
//! The registry of live client connections. Membership tracks the connection
//! lifecycle exactly: a connection is added once the upgrade completes and
//! removed exactly once when the channel closes, so a broadcast pass only
//! ever enumerates channels that are (or were an instant ago) open.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Unique identifier for a client connection
pub type ConnectionId = String;

/// Configuration for the connection hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
        }
    }
}

/// Handle for pushing serialized frames to one connection
struct ConnectionHandle {
    /// Per-connection outbound channel; the send task on the other end
    /// writes frames to the socket in FIFO order
    sender: mpsc::UnboundedSender<String>,
    /// Remote peer address, kept for logging only
    peer: String,
}

/// Registry of all live connections
pub struct ConnectionHub {
    connections: Arc<RwLock<HashMap<ConnectionId, ConnectionHandle>>>,
    config: HubConfig,
}

impl ConnectionHub {
    /// Create a new hub
    pub fn new(config: HubConfig) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Register a new connection
    ///
    /// Returns the connection ID on success, or an error if the connection
    /// limit has been reached.
    pub async fn register(
        &self,
        sender: mpsc::UnboundedSender<String>,
        peer: impl Into<String>,
    ) -> Result<ConnectionId, HubError> {
        let peer = peer.into();
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        connections.insert(id.clone(), ConnectionHandle { sender, peer: peer.clone() });

        tracing::info!(connection_id = %id, peer = %peer, "client connected");
        Ok(id)
    }

    /// Remove a connection; safe to call for ids that are already gone
    pub async fn unregister(&self, id: &str) {
        if let Some(handle) = self.connections.write().await.remove(id) {
            tracing::info!(connection_id = %id, peer = %handle.peer, "client disconnected");
        }
    }

    /// Push one serialized frame to every current connection
    ///
    /// A send failure against a connection that closed between enumeration
    /// and send is ignored; delivery to the remaining connections proceeds.
    pub async fn broadcast(&self, frame: &str) {
        let connections = self.connections.read().await;

        let mut sent = 0;
        for handle in connections.values() {
            if handle.sender.send(frame.to_string()).is_ok() {
                sent += 1;
            }
        }

        if sent > 0 {
            tracing::trace!(recipients = sent, "broadcast delivered");
        }
    }

    /// Drop every connection handle, forcing the send tasks to finish and
    /// the sockets to close. Used on gateway shutdown.
    pub async fn drain(&self) {
        let mut connections = self.connections.write().await;
        let count = connections.len();
        connections.clear();
        if count > 0 {
            tracing::info!(connections = count, "closed remaining connections");
        }
    }

    /// Current number of registered connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("too many connections (limit: {0})")]
    TooManyConnections(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_unregister() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = hub.register(tx, "127.0.0.1:50000").await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);

        // Unregistering twice is harmless.
        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let hub = ConnectionHub::new(HubConfig { max_connections: 2 });

        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let (tx3, _rx3) = mpsc::unbounded_channel();

        hub.register(tx1, "peer-1").await.unwrap();
        hub.register(tx2, "peer-2").await.unwrap();
        let result = hub.register(tx3, "peer-3").await;

        assert!(matches!(result, Err(HubError::TooManyConnections(2))));
        assert_eq!(hub.connection_count().await, 2);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_connections() {
        let hub = ConnectionHub::new(HubConfig::default());

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.register(tx1, "peer-1").await.unwrap();
        hub.register(tx2, "peer-2").await.unwrap();

        hub.broadcast(r#"{"action":"update"}"#).await;

        assert_eq!(rx1.try_recv().unwrap(), r#"{"action":"update"}"#);
        assert_eq!(rx2.try_recv().unwrap(), r#"{"action":"update"}"#);
    }

    #[tokio::test]
    async fn test_broadcast_skips_unregistered() {
        let hub = ConnectionHub::new(HubConfig::default());

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let id1 = hub.register(tx1, "peer-1").await.unwrap();
        hub.register(tx2, "peer-2").await.unwrap();

        hub.unregister(&id1).await;
        hub.broadcast("frame").await;

        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.try_recv().unwrap(), "frame");
    }

    #[tokio::test]
    async fn test_broadcast_survives_dead_receiver() {
        let hub = ConnectionHub::new(HubConfig::default());

        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.register(tx1, "peer-1").await.unwrap();
        hub.register(tx2, "peer-2").await.unwrap();

        // Receiver dropped without unregistering, as happens when a socket
        // dies mid-broadcast. The other connection must still be served.
        drop(rx1);
        hub.broadcast("frame").await;

        assert_eq!(rx2.try_recv().unwrap(), "frame");
    }

    #[tokio::test]
    async fn test_drain_closes_all() {
        let hub = ConnectionHub::new(HubConfig::default());

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.register(tx1, "peer-1").await.unwrap();
        hub.register(tx2, "peer-2").await.unwrap();

        hub.drain().await;
        assert_eq!(hub.connection_count().await, 0);

        // Senders are gone, so the per-connection channels report closed.
        assert!(rx1.recv().await.is_none());
        assert!(rx2.recv().await.is_none());
    }
}
