//! Logging setup for the command-line driver

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Default filter when `RUST_LOG` is not set
const DEFAULT_FILTER: &str = "info";

/// Install the global `tracing` subscriber
///
/// Honours `RUST_LOG`; falls back to [`DEFAULT_FILTER`]. With the `profiling`
/// feature, profiling scopes are emitted as tracing spans through the same layer.
pub fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let fmt_layer = fmt::layer().with_filter(filter);
    tracing_subscriber::registry().with(fmt_layer).init();

    tracing::info!(
        "{} {} logging initialized",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
}
