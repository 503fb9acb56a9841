//! Watcher Facade
//!
//! The gateway never touches watcher internals; it consumes a watcher
//! exclusively through the [`Watcher`] trait defined here. The crate ships
//! one reference implementation, [`ItemTracker`], so the binary runs end to
//! end, but any subsystem that tracks items and emits [`ChangeEvent`]s can
//! sit behind the gateway.

mod tracker;
mod types;

pub use tracker::{ItemTracker, TrackerConfig};
pub use types::{
    ChangeEvent, ItemDescriptor, ItemId, ItemSnapshot, WatcherError, WatcherStats,
};

use async_trait::async_trait;
use tokio::sync::broadcast;

/// Interface the gateway depends on
///
/// `submit_item` is the only fallible operation; `remove_item` is idempotent
/// and removing an unknown id is indistinguishable from success.
/// `subscribe` hands out an event stream carrying every state change,
/// including watcher-level faults ([`ChangeEvent::Fault`]).
#[async_trait]
pub trait Watcher: Send + Sync {
    /// Begin tracking an item; completes once the item is registered
    async fn submit_item(&self, item: ItemDescriptor) -> Result<(), WatcherError>;

    /// Stop tracking an item; no-op for unknown ids
    async fn remove_item(&self, id: &str);

    /// Current aggregate counters
    async fn stats(&self) -> WatcherStats;

    /// Subscribe to the state-change stream
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}
