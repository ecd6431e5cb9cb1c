//! Lifecycle log events shared by the CLI and embedding hosts.

use tracing::{error, info};

pub fn log_app_startup() {
    info!(
        event = "core.app.startup_completed",
        version = env!("CARGO_PKG_VERSION")
    );
}

/// Logged once the explorer has seeded its state from the initial hash.
pub fn log_explorer_ready(hash: &str, key_count: usize) {
    info!(
        event = "core.explorer.ready",
        hash = hash,
        key_count = key_count
    );
}

pub fn log_explorer_teardown(record_count: usize, marker_count: usize) {
    info!(
        event = "core.explorer.teardown_started",
        record_count = record_count,
        marker_count = marker_count
    );
}

pub fn log_app_error(error: &dyn std::error::Error) {
    error!(
        event = "core.app.error_occurred",
        error = %error,
        error_type = std::any::type_name_of_val(error)
    );
}
