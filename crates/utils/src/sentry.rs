use std::sync::OnceLock;

use sentry_tracing::EventFilter;
use tracing::Level;

static SENTRY_GUARD: OnceLock<sentry::ClientInitGuard> = OnceLock::new();

/// Initialise sentry once per process. A `None` DSN leaves reporting off.
pub fn init_once(dsn: Option<&str>, environment: &str) {
    let Some(dsn) = dsn.filter(|d| !d.trim().is_empty()) else {
        return;
    };

    SENTRY_GUARD.get_or_init(|| {
        sentry::init((
            dsn.to_string(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(environment.to_string().into()),
                ..Default::default()
            },
        ))
    });
}

pub fn is_enabled() -> bool {
    SENTRY_GUARD
        .get()
        .map(|guard| guard.is_enabled())
        .unwrap_or(false)
}

pub fn sentry_layer<S>() -> sentry_tracing::SentryLayer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    sentry_tracing::layer().event_filter(|metadata| match *metadata.level() {
        Level::ERROR => EventFilter::Event,
        Level::WARN => EventFilter::Breadcrumb,
        _ => EventFilter::Ignore,
    })
}
