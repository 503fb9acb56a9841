//! Broadcast relay
//!
//! Bridges the watcher's state-change stream to the connection hub: one
//! subscription taken at gateway construction, one broadcast frame per
//! event, pushed to every connection registered at that moment. Fault
//! events travel in `result` exactly like state events; clients tell them
//! apart by payload shape.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use super::hub::ConnectionHub;
use super::messages::Response;
use crate::watcher::ChangeEvent;

/// Relay task handle
pub struct BroadcastRelay;

impl BroadcastRelay {
    /// Spawn the relay over an already-taken facade subscription
    ///
    /// The task runs for the lifetime of the gateway; it ends when the
    /// watcher drops its event channel.
    pub fn spawn(
        mut events: broadcast::Receiver<ChangeEvent>,
        hub: Arc<ConnectionHub>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let frame = match Response::update(&event) {
                            Ok(frame) => frame,
                            Err(e) => {
                                tracing::error!(error = %e, "failed to encode change event");
                                continue;
                            }
                        };
                        match serde_json::to_string(&frame) {
                            Ok(text) => hub.broadcast(&text).await,
                            Err(e) => {
                                tracing::error!(error = %e, "failed to serialize broadcast frame");
                            }
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "broadcast relay lagged behind watcher events");
                    }
                    Err(RecvError::Closed) => {
                        tracing::debug!("watcher event channel closed, relay stopping");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::hub::HubConfig;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    async fn recv_frame(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for broadcast")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_one_event_reaches_every_connection() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let (events_tx, events_rx) = broadcast::channel(16);
        let relay = BroadcastRelay::spawn(events_rx, Arc::clone(&hub));

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.register(tx1, "peer-1").await.unwrap();
        hub.register(tx2, "peer-2").await.unwrap();

        events_tx
            .send(ChangeEvent::invalid("item-1", "item expired"))
            .unwrap();

        let frame1 = recv_frame(&mut rx1).await;
        let frame2 = recv_frame(&mut rx2).await;
        assert_eq!(frame1, frame2);

        let parsed: serde_json::Value = serde_json::from_str(&frame1).unwrap();
        assert_eq!(parsed["action"], "update");
        assert_eq!(parsed["success"], 1);
        assert_eq!(parsed["result"]["id"], "item-1");

        relay.abort();
    }

    #[tokio::test]
    async fn test_fault_event_carried_in_result() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let (events_tx, events_rx) = broadcast::channel(16);
        let relay = BroadcastRelay::spawn(events_rx, Arc::clone(&hub));

        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.register(tx, "peer").await.unwrap();

        events_tx
            .send(ChangeEvent::fault("backing store unavailable"))
            .unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&recv_frame(&mut rx).await).unwrap();
        assert_eq!(parsed["action"], "update");
        assert_eq!(parsed["success"], 1);
        assert_eq!(parsed["result"]["error"], "backing store unavailable");
        assert!(parsed["result"].get("id").is_none());

        relay.abort();
    }

    #[tokio::test]
    async fn test_events_arrive_in_emission_order() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let (events_tx, events_rx) = broadcast::channel(16);
        let relay = BroadcastRelay::spawn(events_rx, Arc::clone(&hub));

        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.register(tx, "peer").await.unwrap();

        for n in 0..5 {
            events_tx
                .send(ChangeEvent::invalid(format!("item-{}", n), "item expired"))
                .unwrap();
        }

        for n in 0..5 {
            let parsed: serde_json::Value =
                serde_json::from_str(&recv_frame(&mut rx).await).unwrap();
            assert_eq!(parsed["result"]["id"], format!("item-{}", n));
        }

        relay.abort();
    }

    #[tokio::test]
    async fn test_closed_connection_is_skipped() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let (events_tx, events_rx) = broadcast::channel(16);
        let relay = BroadcastRelay::spawn(events_rx, Arc::clone(&hub));

        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let id1 = hub.register(tx1, "peer-1").await.unwrap();
        hub.register(tx2, "peer-2").await.unwrap();

        hub.unregister(&id1).await;
        drop(rx1);

        events_tx
            .send(ChangeEvent::invalid("item-1", "item expired"))
            .unwrap();

        // The surviving connection still gets the event.
        let frame = recv_frame(&mut rx2).await;
        assert!(frame.contains("item-1"));

        relay.abort();
    }
}
