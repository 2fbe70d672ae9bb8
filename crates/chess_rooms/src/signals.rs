//! Signal handling for graceful server shutdown.
//!
//! This module provides cross-platform signal handling so the server can
//! stop accepting connections, let in-flight room operations finish, and
//! then exit.

use room_server::ShutdownState;
use tokio::signal;
use tracing::info;

/// Waits for a termination signal and then initiates shutdown on `shutdown_state`.
/// 
/// # Platform Support
/// 
/// * **Unix platforms**: Handles SIGINT and SIGTERM signals
/// * **Windows**: Handles Ctrl+C signal
pub async fn setup_signal_handlers(shutdown_state: &ShutdownState) -> Result<(), Box<dyn std::error::Error>> {
    wait_for_signal().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    shutdown_state.initiate_shutdown();
    Ok(())
}

/// Waits for a termination signal without logging or touching shared state.
pub async fn wait_for_signal() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}
