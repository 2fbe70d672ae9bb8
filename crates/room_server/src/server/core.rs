//! Core room server implementation.
//!
//! This module contains the main `RoomServer` struct and its implementation,
//! wiring the connection manager, request guard and room session manager
//! together behind a WebSocket accept loop.

use crate::{
    config::ServerConfig,
    connection::{ConnectionManager, ConnectionSink},
    error::ServerError,
    room::RoomSessionManager,
    rules::{ChessRules, RulesEngine},
    security::RequestGuard,
    server::handlers::handle_connection,
    shutdown::ShutdownState,
    stats::{ServerStats, StatsSnapshot},
    store::RoomStore,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// The core room server structure.
/// 
/// `RoomServer` owns the networking side of the service and hands every
/// parsed request to the [`RoomSessionManager`], which owns all room state.
/// 
/// # Architecture
/// 
/// * **Connection Management**: connection ids and bounded outbound queues
/// * **Request Guard**: frame size limits and per-connection rate limiting
/// * **Room Session Manager**: creation, joins, moves, disconnects
pub struct RoomServer {
    /// Server configuration settings
    config: ServerConfig,
    
    /// Manager for client connections and messaging
    connection_manager: Arc<ConnectionManager>,

    /// Authoritative room operations
    rooms: Arc<RoomSessionManager>,

    /// Inbound frame checks
    guard: Arc<RequestGuard>,

    /// Server-wide counters
    stats: Arc<ServerStats>,
    
    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl RoomServer {
    /// Creates a new room server playing standard chess.
    /// 
    /// # Arguments
    /// 
    /// * `config` - Configuration parameters for server behavior
    /// * `store` - Where room records are persisted
    pub fn new(config: ServerConfig, store: Arc<dyn RoomStore>) -> Self {
        Self::with_rules(config, store, Arc::new(ChessRules::new()))
    }

    /// Creates a new room server with a custom rules engine.
    pub fn with_rules(
        config: ServerConfig,
        store: Arc<dyn RoomStore>,
        rules: Arc<dyn RulesEngine>,
    ) -> Self {
        let connection_manager = Arc::new(ConnectionManager::new(config.outbound_queue_size));
        let stats = Arc::new(ServerStats::new());
        let sink = Arc::new(ConnectionSink::new(connection_manager.clone()));
        let rooms = Arc::new(RoomSessionManager::new(
            store,
            rules,
            sink,
            config.rooms.clone(),
            stats.clone(),
        ));
        let guard = Arc::new(RequestGuard::new(config.security.clone()));
        let (shutdown_sender, _) = broadcast::channel(1);

        Self {
            config,
            connection_manager,
            rooms,
            guard,
            stats,
            shutdown_sender,
        }
    }

    /// Starts the room server with graceful shutdown support.
    /// 
    /// The accept loop stops as soon as `shutdown_state` reports that
    /// shutdown has been initiated.
    pub async fn start_with_shutdown_state(&self, shutdown_state: ShutdownState) -> Result<(), ServerError> {
        self.start_internal(Some(shutdown_state)).await
    }

    /// Starts the room server and begins accepting connections.
    /// 
    /// Runs until [`RoomServer::shutdown`] is called or the listener fails.
    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_internal(None).await
    }

    async fn start_internal(&self, shutdown_state: Option<ShutdownState>) -> Result<(), ServerError> {
        info!("🚀 Starting room server on {}", self.config.bind_address);
        info!("💾 Room store backend: {}", self.rooms.store().backend_name());

        self.rooms
            .reset_membership()
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to reset room membership: {e}")))?;

        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| ServerError::Network(format!("Failed to bind {}: {e}", self.config.bind_address)))?;
        info!("🎧 Listening on {}", self.config.bind_address);

        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let accept_loop = async {
            loop {
                // Check if shutdown has been initiated
                if let Some(ref shutdown_state) = shutdown_state {
                    if shutdown_state.is_shutdown_initiated() {
                        info!("🛑 Accept loop stopping - shutdown initiated");
                        break;
                    }
                }

                // Re-check the shutdown flag at least once a second
                let accepted = match tokio::time::timeout(Duration::from_secs(1), listener.accept()).await {
                    Ok(accepted) => accepted,
                    Err(_) => continue,
                };

                match accepted {
                    Ok((stream, addr)) => {
                        if self.connection_manager.connection_count() >= self.config.max_connections {
                            warn!("🚫 Refusing connection from {}: {} connections open", addr, self.config.max_connections);
                            drop(stream);
                            continue;
                        }

                        let connection_manager = self.connection_manager.clone();
                        let rooms = self.rooms.clone();
                        let guard = self.guard.clone();
                        let idle_timeout = self.config.connection_timeout;

                        // Spawn individual connection handler
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(
                                stream,
                                addr,
                                connection_manager,
                                rooms,
                                guard,
                                idle_timeout,
                            )
                            .await
                            {
                                debug!("Connection error: {:?}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        break;
                    }
                }
            }
        };

        // Run until shutdown is initiated or internal shutdown signal
        tokio::select! {
            _ = accept_loop => {}
            _ = shutdown_receiver.recv() => {
                info!("Internal shutdown signal received");
            }
        }

        info!("✅ Server stopped accepting connections");
        Ok(())
    }

    /// Initiates server shutdown.
    /// 
    /// Stops the accept loop. Open connections finish on their own.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
        Ok(())
    }

    /// Gets a reference to the room session manager.
    pub fn rooms(&self) -> Arc<RoomSessionManager> {
        self.rooms.clone()
    }

    /// Gets a reference to the connection manager.
    pub fn connection_manager(&self) -> Arc<ConnectionManager> {
        self.connection_manager.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Current counter values.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Frames refused by the rate limiter so far.
    pub async fn rate_limited_requests(&self) -> u64 {
        self.guard.rate_limited_requests().await
    }
}
