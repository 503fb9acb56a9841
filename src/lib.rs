//! # Vigil
//!
//! Real-time watcher notification gateway. Vigil sits in front of a stateful
//! watcher process, exposes a bidirectional WebSocket channel to any number
//! of clients, routes per-client commands (`addItem`, `removeItem`,
//! `getStats`) to the watcher, and fans out every watcher state change to
//! every connected client.
//!
//! ## Features
//!
//! - **Command routing**: one JSON request in, exactly one response out,
//!   with every failure mode acknowledged instead of dropping the connection
//! - **Broadcast fan-out**: a single watcher subscription feeding all
//!   connections, with per-recipient failure isolation
//! - **Lifecycle bookkeeping**: connections registered on accept and
//!   deregistered exactly once on close, so broadcasts never target a dead
//!   channel
//! - **Pluggable watcher**: the gateway depends only on the [`watcher::Watcher`]
//!   trait; an in-memory [`watcher::ItemTracker`] ships as the reference
//!   implementation
//!
//! ## Modules
//!
//! - [`watcher`]: the watcher facade trait, its data types, and the
//!   reference tracker
//! - [`websocket`]: connection hub, request router, and broadcast relay
//! - [`server`]: transport listener and process lifecycle
//! - [`config`]: TOML + environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vigil::config::Config;
//! use vigil::server::{Gateway, GatewayState};
//! use vigil::watcher::{ItemTracker, TrackerConfig, Watcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!
//!     let tracker = Arc::new(ItemTracker::new(TrackerConfig::default()));
//!     let sweep = tracker.start_expiry_sweep();
//!
//!     let watcher: Arc<dyn Watcher> = tracker;
//!     let state = Arc::new(GatewayState::new(watcher, config.server.hub_config()));
//!     let gateway = Gateway::start(&config.server, state).await?;
//!
//!     vigil::server::shutdown_signal().await;
//!
//!     gateway.stop().await;
//!     sweep.abort();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod server;
pub mod watcher;
pub mod websocket;

// Re-export top-level types for convenience
pub use config::{Config, ConfigError, LoggingConfig, ServerConfig, WatcherConfig};

pub use server::{build_router, shutdown_signal, Gateway, GatewayError, GatewayState};

pub use watcher::{
    ChangeEvent, ItemDescriptor, ItemId, ItemSnapshot, ItemTracker, TrackerConfig, Watcher,
    WatcherError, WatcherStats,
};

pub use websocket::{
    BroadcastRelay, Command, CommandError, ConnectionHub, ConnectionId, HubConfig, HubError,
    RequestRouter, Response,
};
