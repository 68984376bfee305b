//! Process-wide tracing setup shared by the server and the admin CLI.

use tracing_subscriber::{EnvFilter, prelude::*};

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber. `RUST_LOG` wins over `default_filter`.
///
/// When a sentry client is active its tracing layer is attached so that
/// `error!` events are reported.
pub fn init(default_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.unwrap_or(DEFAULT_FILTER)));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false));

    let result = if crate::sentry::is_enabled() {
        registry.with(crate::sentry::sentry_layer()).try_init()
    } else {
        registry.try_init()
    };

    if let Err(e) = result {
        // A subscriber was already installed (tests, embedding binaries).
        tracing::debug!("tracing subscriber already initialised: {}", e);
    }
}
