//! Logging setup for binaries and tests embedding the client.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,dukan=debug";

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` (or [`DEFAULT_FILTER`]).
///
/// ## Environment Variables
/// - `RUST_LOG=debug` - Show debug logs everywhere
/// - `RUST_LOG=dukan_client=trace` - Trace every request
///
/// Returns `false` if a global subscriber was already installed, so calling
/// it twice is harmless.
pub fn init_tracing(default_filter: Option<&str>) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.unwrap_or(DEFAULT_FILTER)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
