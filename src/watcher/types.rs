//! Core data types for the watcher facade
//!
//! This module defines the types that cross the gateway/watcher boundary:
//! - `ItemDescriptor`: what a client asks the watcher to track
//! - `ChangeEvent`: a state-change notification emitted by the watcher
//! - `WatcherStats`: aggregate counters returned by `getStats`

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a tracked item
pub type ItemId = String;

/// A request to track one item
///
/// Quantities are exact-precision integers. On the wire they travel as
/// strings and are reconstructed at the routing boundary, so this struct
/// only ever holds already-validated values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDescriptor {
    /// Unique identifier chosen by the client
    pub id: ItemId,
    /// Tracked quantity, must be non-zero
    pub quantity: u128,
    /// Unix timestamp (seconds) after which the item is no longer valid
    pub expires_at_seconds: i64,
}

/// Point-in-time view of a tracked item carried in valid-state events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemSnapshot {
    /// Remaining quantity, serialized as a string to survive JSON number
    /// precision limits on the client side
    #[serde(with = "string_quantity")]
    pub quantity: u128,
    /// Expiry instant of the item
    pub expires_at_seconds: i64,
}

/// A state change emitted by the watcher
///
/// The union is untagged on purpose: consumers distinguish a valid-state
/// payload from an invalid-state or fault payload by shape, not by an
/// extra discriminator field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ChangeEvent {
    /// The item is still valid; `state` carries its current snapshot
    Valid {
        id: ItemId,
        is_valid: bool,
        state: ItemSnapshot,
    },
    /// The item became invalid and is no longer tracked
    Invalid {
        id: ItemId,
        is_valid: bool,
        error: String,
    },
    /// The watcher itself failed; not tied to a single item
    Fault { error: String },
}

impl ChangeEvent {
    /// Valid-state change for a tracked item
    pub fn valid(id: impl Into<ItemId>, state: ItemSnapshot) -> Self {
        Self::Valid {
            id: id.into(),
            is_valid: true,
            state,
        }
    }

    /// Invalid-state change; the item has been dropped by the watcher
    pub fn invalid(id: impl Into<ItemId>, error: impl Into<String>) -> Self {
        Self::Invalid {
            id: id.into(),
            is_valid: false,
            error: error.into(),
        }
    }

    /// Watcher-level fault carried on the same channel as state changes
    pub fn fault(error: impl Into<String>) -> Self {
        Self::Fault {
            error: error.into(),
        }
    }
}

/// Aggregate counters reported by `getStats`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatcherStats {
    /// Number of currently tracked items
    pub count: usize,
}

/// Errors surfaced by the watcher facade
#[derive(Debug, Error)]
pub enum WatcherError {
    /// An item with this id is already tracked
    #[error("item already tracked: {0}")]
    DuplicateItem(ItemId),

    /// The id does not match any tracked item
    #[error("item not tracked: {0}")]
    UnknownItem(ItemId),

    /// The descriptor failed validation
    #[error("invalid item descriptor: {0}")]
    InvalidDescriptor(String),
}

mod string_quantity {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_event_shape() {
        let event = ChangeEvent::valid(
            "item-1",
            ItemSnapshot {
                quantity: 340_282_366_920_938_463_463_374_607_431_768_211_455,
                expires_at_seconds: 1_900_000_000,
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"is_valid\":true"));
        // Max u128 survives the round trip untouched.
        assert!(json.contains("\"quantity\":\"340282366920938463463374607431768211455\""));

        let back: ChangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_invalid_event_shape() {
        let event = ChangeEvent::invalid("item-2", "item expired");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"is_valid\":false"));
        assert!(json.contains("\"error\":\"item expired\""));
        assert!(!json.contains("state"));
    }

    #[test]
    fn test_fault_event_has_no_item_fields() {
        let event = ChangeEvent::fault("backing store unavailable");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json.get("error").unwrap(), "backing store unavailable");
        assert!(json.get("id").is_none());
        assert!(json.get("is_valid").is_none());
    }

    #[test]
    fn test_untagged_deserialize_picks_by_shape() {
        let invalid: ChangeEvent =
            serde_json::from_str(r#"{"id":"x","is_valid":false,"error":"gone"}"#).unwrap();
        assert!(matches!(invalid, ChangeEvent::Invalid { .. }));

        let fault: ChangeEvent = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert!(matches!(fault, ChangeEvent::Fault { .. }));
    }

    #[test]
    fn test_stats_serialize() {
        let stats = WatcherStats { count: 0 };
        assert_eq!(serde_json::to_string(&stats).unwrap(), r#"{"count":0}"#);
    }
}
