//! Reference watcher implementation
//!
//! An in-memory item tracker: items carry an exact-precision quantity and an
//! expiry instant. State changes come from two places: the expiry sweep task
//! (items past their expiry become invalid and are dropped) and the
//! [`ItemTracker::consume`] path (quantity reductions, with exhaustion
//! invalidating the item).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

use super::types::{
    ChangeEvent, ItemDescriptor, ItemId, ItemSnapshot, WatcherError, WatcherStats,
};
use super::Watcher;

/// Configuration for the item tracker
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// How often the expiry sweep runs
    pub sweep_interval_ms: u64,
    /// Capacity of the state-change broadcast channel
    pub event_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: 1000,
            event_capacity: 256,
        }
    }
}

/// In-memory tracked item state
#[derive(Debug, Clone)]
struct TrackedItem {
    quantity: u128,
    expires_at_seconds: i64,
}

/// In-memory watcher tracking items until they expire or are consumed
pub struct ItemTracker {
    items: RwLock<HashMap<ItemId, TrackedItem>>,
    events: broadcast::Sender<ChangeEvent>,
    config: TrackerConfig,
}

impl ItemTracker {
    /// Create a new tracker; call [`Self::start_expiry_sweep`] to activate
    /// expiry-driven invalidation.
    pub fn new(config: TrackerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            items: RwLock::new(HashMap::new()),
            events,
            config,
        }
    }

    /// Spawn the background task that invalidates expired items
    pub fn start_expiry_sweep(self: &Arc<Self>) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_millis(tracker.config.sweep_interval_ms));
            loop {
                interval.tick().await;
                tracker.sweep_expired().await;
            }
        })
    }

    /// Drop every item whose expiry has passed and emit an invalid-state
    /// change for each.
    pub async fn sweep_expired(&self) {
        let now = Utc::now().timestamp();
        let expired: Vec<ItemId> = {
            let mut items = self.items.write().await;
            let ids: Vec<ItemId> = items
                .iter()
                .filter(|(_, item)| item.expires_at_seconds <= now)
                .map(|(id, _)| id.clone())
                .collect();
            for id in &ids {
                items.remove(id);
            }
            ids
        };

        for id in expired {
            tracing::info!(item_id = %id, "item expired");
            let _ = self.events.send(ChangeEvent::invalid(id, "item expired"));
        }
    }

    /// Reduce an item's quantity, emitting a state change
    ///
    /// Exhausting the quantity invalidates the item and stops tracking it,
    /// the same way expiry does.
    pub async fn consume(&self, id: &str, amount: u128) -> Result<(), WatcherError> {
        let event = {
            let mut items = self.items.write().await;
            let item = items
                .get_mut(id)
                .ok_or_else(|| WatcherError::UnknownItem(id.to_string()))?;

            item.quantity = item.quantity.saturating_sub(amount);
            if item.quantity == 0 {
                items.remove(id);
                ChangeEvent::invalid(id, "quantity exhausted")
            } else {
                ChangeEvent::valid(
                    id,
                    ItemSnapshot {
                        quantity: item.quantity,
                        expires_at_seconds: item.expires_at_seconds,
                    },
                )
            }
        };

        let _ = self.events.send(event);
        Ok(())
    }

    fn validate(descriptor: &ItemDescriptor) -> Result<(), WatcherError> {
        if descriptor.id.is_empty() {
            return Err(WatcherError::InvalidDescriptor("empty id".to_string()));
        }
        if descriptor.quantity == 0 {
            return Err(WatcherError::InvalidDescriptor(
                "quantity must be non-zero".to_string(),
            ));
        }
        if descriptor.expires_at_seconds <= Utc::now().timestamp() {
            return Err(WatcherError::InvalidDescriptor(
                "expiry is in the past".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Watcher for ItemTracker {
    async fn submit_item(&self, item: ItemDescriptor) -> Result<(), WatcherError> {
        Self::validate(&item)?;

        let mut items = self.items.write().await;
        if items.contains_key(&item.id) {
            return Err(WatcherError::DuplicateItem(item.id));
        }

        tracing::debug!(item_id = %item.id, quantity = %item.quantity, "tracking item");
        items.insert(
            item.id,
            TrackedItem {
                quantity: item.quantity,
                expires_at_seconds: item.expires_at_seconds,
            },
        );
        Ok(())
    }

    async fn remove_item(&self, id: &str) {
        let removed = self.items.write().await.remove(id);
        if removed.is_some() {
            tracing::debug!(item_id = %id, "item removed");
        }
    }

    async fn stats(&self) -> WatcherStats {
        WatcherStats {
            count: self.items.read().await.len(),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }
}
