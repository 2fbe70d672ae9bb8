//! Connection handling logic for WebSocket clients.
//!
//! This module contains the core connection handling logic that manages
//! the lifecycle of individual client connections, including WebSocket
//! handshaking, message processing, and cleanup.

use crate::{
    connection::{ConnectionId, ConnectionManager},
    error::ServerError,
    messaging::{route_client_message, ServerReply},
    room::RoomSessionManager,
    security::RequestGuard,
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, warn};

/// Handles a single client connection from establishment to cleanup.
/// 
/// # Connection Flow
/// 
/// 1. Perform WebSocket handshake
/// 2. Register connection with the connection manager
/// 3. Start the writer task draining the connection's outbound queue
/// 4. Guard, route and answer inbound frames
/// 5. On close, error or idle timeout, release the connection's room seat
/// 
/// # Arguments
/// 
/// * `stream` - The TCP stream for the client connection
/// * `addr` - The remote address of the client
/// * `connection_manager` - Manager for tracking connections
/// * `rooms` - Room session manager handling requests
/// * `guard` - Inbound frame checks
/// * `idle_timeout` - Seconds without a frame before the connection is dropped (0 disables)
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    connection_manager: Arc<ConnectionManager>,
    rooms: Arc<RoomSessionManager>,
    guard: Arc<RequestGuard>,
    idle_timeout: u64,
) -> Result<(), ServerError> {
    // Perform WebSocket handshake
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| ServerError::Network(format!("WebSocket handshake failed: {e}")))?;

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (connection_id, mut outbound) = connection_manager.add_connection(addr);

    // Outgoing message task: everything written to the socket goes through the queue
    let outgoing_task = async move {
        while let Some(frame) = outbound.recv().await {
            let text = String::from_utf8_lossy(&frame).into_owned();
            if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                debug!("Failed to send message to connection {}: {}", connection_id, e);
                break;
            }
        }
        let _ = ws_sender.close().await;
    };

    // Incoming message task
    let incoming_task = {
        let connection_manager = connection_manager.clone();
        let rooms = rooms.clone();
        let guard = guard.clone();

        async move {
            loop {
                let next = if idle_timeout > 0 {
                    match tokio::time::timeout(Duration::from_secs(idle_timeout), ws_receiver.next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            debug!("⏱️ Connection {} idle for {}s, closing", connection_id, idle_timeout);
                            break;
                        }
                    }
                } else {
                    ws_receiver.next().await
                };

                let Some(msg) = next else { break };
                match msg {
                    Ok(Message::Text(text)) => {
                        let reply = match guard.check(connection_id, text.as_bytes()).await {
                            Ok(()) => route_client_message(&text, connection_id, &rooms).await,
                            Err(e) => {
                                warn!("🛡️ Rejected frame from connection {}: {}", connection_id, e);
                                ServerReply::failure("unknown", None, "request_rejected", e.to_string())
                            }
                        };

                        send_reply(&connection_manager, connection_id, &reply);
                    }
                    Ok(Message::Binary(_)) => {
                        let reply = ServerReply::failure("unknown", None, "invalid_message", "Binary frames are not supported");
                        send_reply(&connection_manager, connection_id, &reply);
                    }
                    Ok(Message::Close(_)) => {
                        debug!("🔌 Client {} requested close", connection_id);
                        break;
                    }
                    // tungstenite answers pings itself on the next write
                    Ok(_) => {}
                    Err(e) => {
                        debug!("WebSocket error for connection {}: {}", connection_id, e);
                        break;
                    }
                }
            }
        }
    };

    // Run both tasks concurrently until one completes
    tokio::select! {
        _ = incoming_task => {},
        _ = outgoing_task => {},
    }

    rooms.handle_disconnect(connection_id).await;
    guard.forget(connection_id).await;
    connection_manager.remove_connection(connection_id);
    Ok(())
}

/// Queues a reply on the connection's outbound queue.
fn send_reply(connection_manager: &ConnectionManager, connection_id: ConnectionId, reply: &ServerReply) {
    match reply.encode() {
        Ok(frame) => {
            if let Err(e) = connection_manager.send_to_connection(connection_id, frame) {
                warn!("Reply to connection {} dropped: {}", connection_id, e);
            }
        }
        Err(e) => error!("Failed to encode reply for connection {}: {}", connection_id, e),
    }
}
