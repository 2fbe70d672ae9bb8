//! # Chess Rooms - Main Entry Point
//!
//! Authoritative multiplayer chess room server. This entry point handles CLI
//! parsing, configuration loading, and application lifecycle management.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! chess_rooms
//!
//! # Specify custom configuration
//! chess_rooms --config production.toml
//!
//! # Persist rooms on disk and override the bind address
//! chess_rooms --bind 0.0.0.0:8080 --data-dir /var/lib/chess_rooms --log-level debug
//!
//! # JSON logging for production
//! chess_rooms --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! The server handles graceful shutdown on:
//! - SIGINT (Ctrl+C)
//! - SIGTERM (Unix systems)
//!
//! A second signal exits immediately.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Runs the complete application lifecycle:
/// 1. Command-line argument parsing
/// 2. Configuration loading
/// 3. Logging system initialization
/// 4. Application creation and execution
/// 
/// # Exit Codes
/// 
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
/// 
/// Called from `main` under `#[tokio::main]`.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    config.apply_cli_overrides(&args);

    // Setup logging before anything else
    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

// Re-export main types for potential library usage
pub use config::{LoggingSettings, RoomSettings, SecuritySettings, ServerSettings, StoreSettings};

#[cfg(test)]
mod tests {
    use super::*;
    use room_server::StoreConfig;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let server_config = config
            .to_server_config()
            .expect("Default config should convert to ServerConfig");
        assert_eq!(server_config.max_connections, 1000);
        assert_eq!(server_config.store, StoreConfig::Memory);
    }

    #[test]
    fn test_cli_parsing() {
        let args = CliArgs {
            config_path: PathBuf::from("test.toml"),
            bind_address: Some("127.0.0.1:9000".to_string()),
            data_dir: Some(PathBuf::from("rooms")),
            log_level: Some("debug".to_string()),
            json_logs: true,
        };

        let mut config = AppConfig::default();
        config.apply_cli_overrides(&args);
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.store.backend, "file");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
    }

    #[tokio::test]
    async fn test_application_creation() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let args = CliArgs {
            config_path: dir.path().join("test_config.toml"),
            bind_address: Some("127.0.0.1:0".to_string()),
            data_dir: Some(dir.path().join("rooms")),
            log_level: None,
            json_logs: false,
        };

        let app = Application::new(args.clone()).await;
        assert!(app.is_ok());

        // Missing config file gets created with defaults
        assert!(args.config_path.exists());
        assert!(dir.path().join("rooms").is_dir());
    }

    #[tokio::test]
    async fn test_application_rejects_invalid_config() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_path = dir.path().join("bad.toml");
        tokio::fs::write(&config_path, "[logging]\nlevel = \"loud\"\njson_format = false\n")
            .await
            .expect("Failed to write test config file");

        let args = CliArgs {
            config_path,
            bind_address: None,
            data_dir: None,
            log_level: None,
            json_logs: false,
        };

        assert!(Application::new(args).await.is_err());
    }
}
