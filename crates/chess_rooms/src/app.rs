//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that orchestrates server
//! startup, periodic statistics and phased shutdown.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{setup_signal_handlers, wait_for_signal},
};
use room_server::{open_store, RoomServer, ShutdownState, StatsSnapshot};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Polling interval while waiting for open connections to drain.
const DRAIN_POLL_MS: u64 = 100;
/// Upper bound on drain polls (3 seconds total).
const MAX_DRAIN_CYCLES: u32 = 30;

/// Main application struct.
/// 
/// Owns the merged configuration and the room server, and drives the
/// server from startup through graceful shutdown.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Room server instance
    server: Arc<RoomServer>,
}

impl Application {
    /// Creates a new application instance.
    /// 
    /// # Process
    /// 
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    /// 5. Open the room store and build the server
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_cli_overrides(&args);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        } else {
            info!("✅ Configuration loaded and validated successfully");
        }

        display_banner();

        let server_config = config.to_server_config()?;
        let store = open_store(&server_config.store).await?;
        let server = RoomServer::new(server_config, store);

        info!("🚀 Chess Rooms v{}", env!("CARGO_PKG_VERSION"));
        info!("📂 Config: {}", args.config_path.display());

        Ok(Self {
            config,
            server: Arc::new(server),
        })
    }

    /// Runs the server until a termination signal arrives, then shuts down
    /// in phases and reports final statistics.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Chess Rooms application");
        self.log_configuration_summary();

        let shutdown_state = ShutdownState::new();

        let server_handle = {
            let server = self.server.clone();
            let shutdown_state = shutdown_state.clone();
            tokio::spawn(async move {
                match server.start_with_shutdown_state(shutdown_state).await {
                    Ok(()) => {
                        info!("✅ Server completed successfully");
                    }
                    Err(e) => {
                        error!("❌ Server error: {:?}", e);
                        std::process::exit(1);
                    }
                }
            })
        };

        let monitoring_handle = {
            let server = self.server.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
                let mut last = StatsSnapshot::default();

                loop {
                    interval.tick().await;

                    let stats = server.stats();
                    let moves_this_period = stats.moves_applied - last.moves_applied;
                    last = stats;

                    info!(
                        "📊 Server Health - {} connections | {} moves/min | {} rooms created | {} rejected moves | {} dropped deliveries | {} rate limited",
                        server.connection_manager().connection_count(),
                        moves_this_period,
                        stats.rooms_created,
                        stats.moves_rejected,
                        stats.deliveries_dropped,
                        server.rate_limited_requests().await,
                    );
                }
            })
        };

        info!("✅ Chess Rooms is now running!");
        info!("♟️ Ready to accept connections on {}", self.config.server.bind_address);
        info!("🔍 Health monitoring active - stats every 60 seconds");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        setup_signal_handlers(&shutdown_state).await?;

        // A second signal skips the graceful path
        tokio::spawn(async move {
            if let Err(e) = wait_for_signal().await {
                error!("Failed to set up forced shutdown signal handler: {e}");
                return;
            }

            warn!("Shutdown signal received again, exiting immediately.");
            std::process::exit(1);
        });

        info!("📡 Phase 1: Stopped accepting new connections");
        monitoring_handle.abort();

        info!("⏳ Phase 2: Waiting for open connections to drain...");
        let connection_manager = self.server.connection_manager();
        let mut wait_cycles = 0;
        while wait_cycles < MAX_DRAIN_CYCLES && connection_manager.connection_count() > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(DRAIN_POLL_MS)).await;
            wait_cycles += 1;
        }

        if wait_cycles >= MAX_DRAIN_CYCLES {
            info!(
                "⏰ Timeout reached with {} connections still open, proceeding with shutdown",
                connection_manager.connection_count()
            );
        } else {
            info!("✅ All connections closed");
        }

        shutdown_state.complete_shutdown();

        info!("🧹 Phase 3: Final cleanup - stopping server accept loop...");
        if let Err(e) = self.server.shutdown().await {
            warn!("Failed to signal server shutdown: {e}");
        }
        match tokio::time::timeout(tokio::time::Duration::from_secs(8), server_handle).await {
            Ok(_) => info!("✅ Server task completed gracefully"),
            Err(e) => warn!("⏰ Server task did not complete within timeout: {:?}", e),
        }

        log_final_statistics(&self.server.stats());

        info!("✅ Chess Rooms shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!("  ⏱️ Connection timeout: {}s", self.config.server.connection_timeout);
        info!(
            "  💾 Room store: {}{}",
            self.config.store.backend,
            if self.config.store.backend == "file" {
                format!(" ({})", self.config.store.directory)
            } else {
                String::new()
            }
        );
        info!(
            "  🎲 Room ids: {} chars, default promotion '{}'",
            self.config.rooms.id_length, self.config.rooms.default_promotion
        );
    }
}

/// Logs final statistics during shutdown.
fn log_final_statistics(stats: &StatsSnapshot) {
    info!("📊 Final Statistics:");
    info!("  - Rooms created: {}", stats.rooms_created);
    info!("  - Joins: {}", stats.joins);
    info!("  - Moves applied: {}", stats.moves_applied);
    info!("  - Moves rejected: {}", stats.moves_rejected);
    info!("  - Disconnects: {}", stats.disconnects);
    info!("  - Dropped deliveries: {}", stats.deliveries_dropped);
}
