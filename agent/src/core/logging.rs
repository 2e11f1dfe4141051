//! Logging setup for hosts that do not install their own subscriber

use super::constants::{CRATE_NAME, ENV_LOG};

/// Install a compact `tracing` subscriber.
///
/// The filter is read from `MONITOR_LOG`, then `RUST_LOG`, and defaults to
/// `info`. Returns `false` when a global subscriber was already installed,
/// in which case the host's subscriber keeps receiving our events.
pub fn init_logging() -> bool {
    let filter = std::env::var(ENV_LOG)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_filter());

    tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_ansi(false)
        .compact()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

fn default_filter() -> String {
    format!("info,{}=info", CRATE_NAME)
}
