//! Structured logging setup.
//!
//! The library itself only emits `tracing` events. Applications and tests that want
//! to see them call [`init_logging`] once at startup.

use crate::config::LoggingConfig;
use tracing::level_filters::LevelFilter;

/// Install a global fmt subscriber on stderr.
///
/// Safe to call more than once: later calls leave the first subscriber in place.
pub fn init_logging(config: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::from_level(config.log_level))
        .with_ansi(false)
        .with_target(false);

    let installed = if config.json_format {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(app = %config.app_name, "logging initialized");
    }
}
