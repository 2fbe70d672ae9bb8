//! Message routing logic for dispatching client requests to the room manager.
//!
//! Every inbound text frame produces exactly one [`ServerReply`] for the
//! requesting connection. Room events for other participants are emitted by
//! the manager itself through the broadcast gateway.

use super::types::{
    ClientMessage, CreateRoomRequest, GetRoomRequest, JoinRoomRequest, ServerReply,
    SubmitMoveRequest,
};
use crate::connection::ConnectionId;
use crate::error::RoomError;
use crate::room::{MoveRequest, RoomOptions, RoomSessionManager};
use crate::utils::current_timestamp;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, trace};

/// Routes a raw client message to the room session manager.
/// 
/// # Arguments
/// 
/// * `text` - The raw message text from the client (expected to be JSON)
/// * `connection_id` - The unique identifier for the client connection
/// * `rooms` - The room session manager
/// 
/// # Returns
/// 
/// The reply to send back to the requesting connection. Malformed frames
/// and unknown events produce a failure reply rather than an error.
pub async fn route_client_message(
    text: &str,
    connection_id: ConnectionId,
    rooms: &RoomSessionManager,
) -> ServerReply {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            debug!("Unparseable frame from connection {}: {}", connection_id, e);
            return ServerReply::failure("unknown", None, "invalid_message", format!("Invalid JSON: {e}"));
        }
    };

    debug!(
        "📨 Routing '{}:{}' from connection {}",
        message.namespace, message.event, connection_id
    );

    let ClientMessage { namespace, event, data, request_id } = message;

    let outcome = match (namespace.as_str(), event.as_str()) {
        ("system", "ping") => Ok(json!({ "pong": current_timestamp() })),
        ("room", "create_room") => create_room(data, rooms).await,
        ("room", "join_room") => join_room(data, connection_id, rooms).await,
        ("room", "submit_move") => submit_move(data, connection_id, rooms).await,
        ("room", "get_room") => get_room(data, rooms).await,
        _ => Err(Rejection::new(
            "unknown_event",
            format!("Unknown event {namespace}:{event}"),
        )),
    };

    match outcome {
        Ok(data) => {
            trace!("✅ '{}:{}' from connection {} succeeded", namespace, event, connection_id);
            ServerReply::success(event, request_id, data)
        }
        Err(rejection) => ServerReply::failure(event, request_id, rejection.code, rejection.message),
    }
}

/// A failure reply in the making.
struct Rejection {
    code: &'static str,
    message: String,
}

impl Rejection {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl From<RoomError> for Rejection {
    fn from(err: RoomError) -> Self {
        if err.is_internal() {
            error!("Room operation failed: {}", err);
        }
        Self::new(err.code(), err.client_message())
    }
}

/// Decodes a request payload; a missing payload reads as an empty object.
fn parse_data<T: DeserializeOwned>(data: Value) -> Result<T, Rejection> {
    let data = if data.is_null() { json!({}) } else { data };
    serde_json::from_value(data)
        .map_err(|e| Rejection::new("invalid_request", format!("Invalid request: {e}")))
}

fn to_data<T: Serialize>(value: &T) -> Result<Value, Rejection> {
    serde_json::to_value(value).map_err(|e| RoomError::Internal(e.to_string()).into())
}

async fn create_room(data: Value, rooms: &RoomSessionManager) -> Result<Value, Rejection> {
    let request: CreateRoomRequest = parse_data(data)?;
    let room_id = rooms
        .create_room(request.room_id.as_deref(), RoomOptions { meta: request.meta })
        .await?;
    Ok(json!({ "room_id": room_id }))
}

async fn join_room(
    data: Value,
    connection_id: ConnectionId,
    rooms: &RoomSessionManager,
) -> Result<Value, Rejection> {
    let request: JoinRoomRequest = parse_data(data)?;
    let outcome = rooms
        .join_room(&request.room_id, connection_id, request.identity)
        .await?;
    to_data(&outcome)
}

async fn submit_move(
    data: Value,
    connection_id: ConnectionId,
    rooms: &RoomSessionManager,
) -> Result<Value, Rejection> {
    let request: SubmitMoveRequest = parse_data(data)?;
    let outcome = rooms
        .submit_move(
            &request.room_id,
            connection_id,
            MoveRequest {
                from: request.from,
                to: request.to,
                promotion: request.promotion,
            },
        )
        .await?;
    to_data(&outcome)
}

async fn get_room(data: Value, rooms: &RoomSessionManager) -> Result<Value, Rejection> {
    let request: GetRoomRequest = parse_data(data)?;
    let snapshot = rooms.get_room(&request.room_id).await?;
    to_data(&snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomConfig;
    use crate::rules::ChessRules;
    use crate::stats::ServerStats;
    use crate::store::MemoryRoomStore;
    use crate::tests::RecordingSink;
    use std::sync::Arc;

    fn rooms() -> RoomSessionManager {
        RoomSessionManager::new(
            Arc::new(MemoryRoomStore::new()),
            Arc::new(ChessRules::new()),
            Arc::new(RecordingSink::default()),
            RoomConfig::default(),
            Arc::new(ServerStats::new()),
        )
    }

    fn request(event: &str, data: Value) -> String {
        json!({ "namespace": "room", "event": event, "data": data, "request_id": "req" }).to_string()
    }

    #[tokio::test]
    async fn test_full_request_flow() {
        let rooms = rooms();

        let created = route_client_message(&request("create_room", json!({"room_id": "r1"})), 1, &rooms).await;
        assert!(created.ok);
        assert_eq!(created.request_id, Some(json!("req")));
        assert_eq!(created.data.unwrap()["room_id"], "r1");

        let joined = route_client_message(&request("join_room", json!({"roomId": "r1"})), 1, &rooms).await;
        assert!(joined.ok);
        assert_eq!(joined.data.unwrap()["role"], "first-mover");

        let moved = route_client_message(
            &request("submit_move", json!({"room_id": "r1", "from": "e2", "to": "e4"})),
            1,
            &rooms,
        )
        .await;
        assert!(moved.ok);
        assert_eq!(moved.data.unwrap()["notation"], "e4");

        let snapshot = route_client_message(&request("get_room", json!({"room_id": "r1"})), 2, &rooms).await;
        assert_eq!(snapshot.data.unwrap()["move_log"], json!(["e4"]));
    }

    #[tokio::test]
    async fn test_create_room_without_payload_generates_id() {
        let rooms = rooms();
        let frame = json!({"namespace": "room", "event": "create_room"}).to_string();
        let reply = route_client_message(&frame, 1, &rooms).await;
        assert!(reply.ok);
        assert_eq!(reply.data.unwrap()["room_id"].as_str().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_failures_are_replies() {
        let rooms = rooms();

        let garbage = route_client_message("{not json", 1, &rooms).await;
        assert!(!garbage.ok);
        assert_eq!(garbage.code, Some("invalid_message"));

        let unknown = route_client_message(&request("teleport", json!({})), 1, &rooms).await;
        assert_eq!(unknown.code, Some("unknown_event"));

        let missing_field = route_client_message(&request("join_room", json!({})), 1, &rooms).await;
        assert_eq!(missing_field.code, Some("invalid_request"));

        let missing_room = route_client_message(&request("join_room", json!({"room_id": "nope"})), 1, &rooms).await;
        assert_eq!(missing_room.code, Some("room_not_found"));
        assert_eq!(missing_room.message.as_deref(), Some("Room nope not found"));
    }

    #[tokio::test]
    async fn test_ping() {
        let rooms = rooms();
        let frame = json!({"namespace": "system", "event": "ping"}).to_string();
        let reply = route_client_message(&frame, 1, &rooms).await;
        assert!(reply.ok);
        assert!(reply.data.unwrap()["pong"].is_u64());
    }
}
