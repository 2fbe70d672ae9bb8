//! Shutdown coordination for graceful server shutdown.
//!
//! Shared between the application and the accept loop so that new
//! connections stop being admitted before in-flight room operations are
//! allowed to drain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Shared shutdown state for coordinating graceful shutdown across components.
#[derive(Debug, Clone, Default)]
pub struct ShutdownState {
    /// Set once shutdown begins; the accept loop stops admitting connections
    shutdown_initiated: Arc<AtomicBool>,
    /// Set once in-flight work has drained and final cleanup can run
    shutdown_complete: Arc<AtomicBool>,
}

impl ShutdownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    pub fn is_shutdown_complete(&self) -> bool {
        self.shutdown_complete.load(Ordering::Acquire)
    }

    /// Stops the server from admitting new connections.
    pub fn initiate_shutdown(&self) {
        if !self.shutdown_initiated.swap(true, Ordering::AcqRel) {
            info!("🛑 Shutdown initiated - no new connections will be accepted");
        }
    }

    /// Marks in-flight room operations as drained.
    pub fn complete_shutdown(&self) {
        if !self.shutdown_complete.swap(true, Ordering::AcqRel) {
            info!("✅ In-flight work drained - ready for final cleanup");
        }
    }
}
