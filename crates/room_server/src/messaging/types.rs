//! Message type definitions for client-server communication.
//!
//! This module defines the structure of messages exchanged between
//! clients and the server. Requests use a namespace/event pattern; every
//! request gets exactly one reply on the same connection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A message sent from a client to the server.
/// 
/// # Fields
/// 
/// * `namespace` - `"room"` for room operations, `"system"` for keepalives
/// * `event` - The operation within the namespace (e.g., "join_room", "submit_move")
/// * `data` - The payload data for the event as a JSON value
/// * `request_id` - Echoed back on the reply so clients can correlate
/// 
/// # Examples
/// 
/// ```json
/// {
///   "namespace": "room",
///   "event": "submit_move",
///   "data": { "room_id": "r1", "from": "e2", "to": "e4" },
///   "request_id": 7
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMessage {
    /// The namespace that should handle this message
    pub namespace: String,
    
    /// The specific event type within the namespace
    pub event: String,
    
    /// The message payload as a JSON value
    #[serde(default)]
    pub data: Value,

    /// Opaque correlation id chosen by the client
    #[serde(default)]
    pub request_id: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRoomRequest {
    #[serde(default, alias = "roomId")]
    pub room_id: Option<String>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinRoomRequest {
    #[serde(alias = "roomId")]
    pub room_id: String,
    /// Identity reference attached by the credential layer in front of us
    #[serde(default)]
    pub identity: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitMoveRequest {
    #[serde(alias = "roomId")]
    pub room_id: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub promotion: Option<char>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetRoomRequest {
    #[serde(alias = "roomId")]
    pub room_id: String,
}

/// The single reply a connection receives for each request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerReply {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub event: String,
    pub request_id: Option<Value>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServerReply {
    pub fn success(event: impl Into<String>, request_id: Option<Value>, data: Value) -> Self {
        Self {
            kind: "reply",
            event: event.into(),
            request_id,
            ok: true,
            data: Some(data),
            code: None,
            message: None,
        }
    }

    pub fn failure(
        event: impl Into<String>,
        request_id: Option<Value>,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: "reply",
            event: event.into(),
            request_id,
            ok: false,
            data: None,
            code: Some(code),
            message: Some(message.into()),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_defaults() {
        let message: ClientMessage =
            serde_json::from_str(r#"{"namespace":"system","event":"ping"}"#).unwrap();
        assert!(message.data.is_null());
        assert!(message.request_id.is_none());
    }

    #[test]
    fn test_requests_accept_camel_case_room_id() {
        let join: JoinRoomRequest = serde_json::from_value(json!({"roomId": "r1"})).unwrap();
        assert_eq!(join.room_id, "r1");

        let mv: SubmitMoveRequest = serde_json::from_value(json!({
            "room_id": "r1", "from": "a7", "to": "a8", "promotion": "n"
        }))
        .unwrap();
        assert_eq!(mv.promotion, Some('n'));
    }

    #[test]
    fn test_reply_envelopes() {
        let ok = serde_json::to_value(ServerReply::success("create_room", Some(json!(1)), json!({"room_id": "r1"}))).unwrap();
        assert_eq!(ok, json!({
            "type": "reply",
            "event": "create_room",
            "request_id": 1,
            "ok": true,
            "data": {"room_id": "r1"}
        }));

        let err = serde_json::to_value(ServerReply::failure("submit_move", None, "not_your_turn", "Not your turn")).unwrap();
        assert_eq!(err["ok"], false);
        assert_eq!(err["code"], "not_your_turn");
        assert_eq!(err["message"], "Not your turn");
        assert!(err.get("data").is_none());
    }
}
