//! Tracing subscriber setup for the room server.
//!
//! Room operations log through `tracing` with the connection id and room id
//! in the message. This module installs the subscriber that renders them,
//! either as ANSI text for a terminal or as one JSON object per line for log
//! shippers.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Chooses the level filter: `RUST_LOG` when set, otherwise the configured
/// level.
fn level_filter(config: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Installs the global subscriber.
///
/// `json_format` forces JSON output regardless of `config.json_format`.
/// Fails if a subscriber is already installed.
pub fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = json_format || config.json_format;

    // Exactly one of the two layers is present
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
    });
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_ansi(true)
            .with_target(false)
            .with_thread_ids(true)
    });

    tracing_subscriber::registry()
        .with(level_filter(config))
        .with(json_layer)
        .with(text_layer)
        .try_init()?;

    info!(
        "🔧 Logging initialized at '{}' ({})",
        config.level,
        if json { "json" } else { "text" }
    );
    Ok(())
}

/// Displays the startup banner through the logger.
pub fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║            ♞ CHESS ROOMS ♞               ║");
    info!("║                 v{:<24}║", version);
    info!("║                                          ║");
    info!("║  Authoritative multiplayer rooms         ║");
    info!("║  Server-side move validation             ║");
    info!("║  Per-room serialized state changes       ║");
    info!("║                                          ║");
    info!("╚══════════════════════════════════════════╝");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_uses_configured_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingSettings {
            level: "warn".to_string(),
            json_format: false,
        };
        assert_eq!(level_filter(&config).to_string(), "warn");
    }
}
