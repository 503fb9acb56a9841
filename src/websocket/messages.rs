//! Wire message types
//!
//! Defines the JSON frames exchanged with clients and the typed command
//! union the router dispatches on. Inbound frames are decoded in two steps:
//! a permissive raw shape that keeps the `action` string available for
//! echoing, then a per-action typed parse that rejects anything malformed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::watcher::{ChangeEvent, ItemDescriptor, ItemId};

/// Action name used for watcher state-change broadcasts
pub const UPDATE_ACTION: &str = "update";

/// Outbound frame: `{"action": ..., "success": 0|1, "result": ...}`
///
/// `result` is omitted entirely when there is nothing to report, matching
/// the protocol's "undefined" result for acknowledgements and failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    /// Echo of the request action; empty when the request was unreadable
    pub action: String,
    /// 1 on success, 0 on failure
    pub success: u8,
    /// Action-specific payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Response {
    /// Successful response carrying a payload
    pub fn success(action: impl Into<String>, result: Value) -> Self {
        Self {
            action: action.into(),
            success: 1,
            result: Some(result),
        }
    }

    /// Successful response with no payload
    pub fn acknowledged(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            success: 1,
            result: None,
        }
    }

    /// Failure response; `result` stays absent
    pub fn failure(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            success: 0,
            result: None,
        }
    }

    /// Broadcast frame wrapping a watcher state change
    pub fn update(event: &ChangeEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            action: UPDATE_ACTION.to_string(),
            success: 1,
            result: Some(serde_json::to_value(event)?),
        })
    }
}

/// A parsed, typed client command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Track a new item
    AddItem { item: ItemDescriptor },
    /// Stop tracking an item
    RemoveItem { id: ItemId },
    /// Report aggregate watcher counters
    GetStats,
}

/// Item descriptor as it arrives on the wire
///
/// Numeric fields travel as strings because JSON numbers cannot carry the
/// full integer range; they are reconstructed into exact-precision values
/// here before anything downstream sees them.
#[derive(Debug, Clone, Deserialize)]
pub struct WireItemDescriptor {
    pub id: String,
    pub quantity: String,
    pub expires_at_seconds: String,
}

impl WireItemDescriptor {
    /// Reconstruct the exact-precision descriptor
    pub fn reconstruct(self) -> Result<ItemDescriptor, CommandError> {
        let quantity = self
            .quantity
            .parse::<u128>()
            .map_err(|_| CommandError::BadNumber {
                field: "quantity",
                value: self.quantity.clone(),
            })?;
        let expires_at_seconds =
            self.expires_at_seconds
                .parse::<i64>()
                .map_err(|_| CommandError::BadNumber {
                    field: "expires_at_seconds",
                    value: self.expires_at_seconds.clone(),
                })?;
        Ok(ItemDescriptor {
            id: self.id,
            quantity,
            expires_at_seconds,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AddItemParams {
    item: WireItemDescriptor,
}

#[derive(Debug, Deserialize)]
struct RemoveItemParams {
    id: String,
}

/// Errors produced while turning a raw request into a [`Command`]
#[derive(Debug, Error)]
pub enum CommandError {
    /// The action string matched no known command
    #[error("unrecognized action: {0}")]
    UnknownAction(String),

    /// Params did not deserialize into the action's expected shape
    #[error("invalid params for {action}: {message}")]
    BadParams {
        action: &'static str,
        message: String,
    },

    /// A stringified numeric field failed exact reconstruction
    #[error("field {field} is not a valid integer: {value:?}")]
    BadNumber {
        field: &'static str,
        value: String,
    },
}

impl Command {
    /// Parse a command from an action string and its raw params
    pub fn parse(action: &str, params: Value) -> Result<Self, CommandError> {
        match action {
            "addItem" => {
                let params: AddItemParams =
                    serde_json::from_value(params).map_err(|e| CommandError::BadParams {
                        action: "addItem",
                        message: e.to_string(),
                    })?;
                Ok(Command::AddItem {
                    item: params.item.reconstruct()?,
                })
            }
            "removeItem" => {
                let params: RemoveItemParams =
                    serde_json::from_value(params).map_err(|e| CommandError::BadParams {
                        action: "removeItem",
                        message: e.to_string(),
                    })?;
                Ok(Command::RemoveItem { id: params.id })
            }
            "getStats" => Ok(Command::GetStats),
            other => Err(CommandError::UnknownAction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_add_item() {
        let params = json!({
            "item": {
                "id": "item-1",
                "quantity": "123456789012345678901234567890",
                "expires_at_seconds": "1900000000"
            }
        });
        let command = Command::parse("addItem", params).unwrap();
        match command {
            Command::AddItem { item } => {
                assert_eq!(item.id, "item-1");
                assert_eq!(item.quantity, 123_456_789_012_345_678_901_234_567_890);
                assert_eq!(item.expires_at_seconds, 1_900_000_000);
            }
            other => panic!("expected AddItem, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_add_item_bad_quantity() {
        let params = json!({
            "item": {
                "id": "item-1",
                "quantity": "not-a-number",
                "expires_at_seconds": "1900000000"
            }
        });
        let err = Command::parse("addItem", params).unwrap_err();
        assert!(matches!(
            err,
            CommandError::BadNumber {
                field: "quantity",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_remove_item() {
        let command = Command::parse("removeItem", json!({"id": "item-1"})).unwrap();
        assert_eq!(
            command,
            Command::RemoveItem {
                id: "item-1".to_string()
            }
        );
    }

    #[test]
    fn test_parse_remove_item_missing_id() {
        let err = Command::parse("removeItem", json!({})).unwrap_err();
        assert!(matches!(
            err,
            CommandError::BadParams {
                action: "removeItem",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_get_stats_ignores_params() {
        assert_eq!(
            Command::parse("getStats", json!({})).unwrap(),
            Command::GetStats
        );
        assert_eq!(
            Command::parse("getStats", Value::Null).unwrap(),
            Command::GetStats
        );
    }

    #[test]
    fn test_parse_unknown_action() {
        let err = Command::parse("bogus", json!({})).unwrap_err();
        assert!(matches!(err, CommandError::UnknownAction(_)));
    }

    #[test]
    fn test_failure_response_omits_result() {
        let json = serde_json::to_string(&Response::failure("bogus")).unwrap();
        assert_eq!(json, r#"{"action":"bogus","success":0}"#);
    }

    #[test]
    fn test_success_response_carries_result() {
        let json =
            serde_json::to_string(&Response::success("getStats", json!({"count": 0}))).unwrap();
        assert_eq!(
            json,
            r#"{"action":"getStats","success":1,"result":{"count":0}}"#
        );
    }

    #[test]
    fn test_update_frame_shape() {
        let event = ChangeEvent::invalid("item-1", "item expired");
        let frame = Response::update(&event).unwrap();
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["action"], "update");
        assert_eq!(json["success"], 1);
        assert_eq!(json["result"]["id"], "item-1");
        assert_eq!(json["result"]["is_valid"], false);
    }
}
