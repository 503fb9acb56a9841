//! WebSocket gateway core
//!
//! The connection/request/broadcast layer of the gateway:
//!
//! - **ConnectionHub**: registry of live connections, the broadcast audience
//! - **RequestRouter**: one inbound frame in, one typed response out
//! - **BroadcastRelay**: watcher state changes fanned out to every connection
//! - **Handler**: per-connection lifecycle plumbing
//!
//! Clients speak JSON text frames: requests as
//! `{"action": ..., "params": {...}}`, responses as
//! `{"action": ..., "success": 0|1, "result": ...}`, and unsolicited
//! `{"action": "update", ...}` broadcasts whenever any tracked item's state
//! changes, regardless of which connection caused the change.

mod handler;
mod hub;
mod messages;
mod relay;
mod router;

pub(crate) use handler::handle_socket;
pub use hub::{ConnectionHub, ConnectionId, HubConfig, HubError};
pub use messages::{Command, CommandError, Response, WireItemDescriptor, UPDATE_ACTION};
pub use relay::BroadcastRelay;
pub use router::RequestRouter;
