//! Telemetry initialization: stdout tracing subscriber with an env filter.
//!
//! `RUST_LOG` wins when set; otherwise the crate logs at the configured
//! `LOG_LEVEL` and tower-http request spans are shown at debug.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a given log level.
pub fn default_filter(log_level: &str) -> String {
    format!(
        "chart_keeper_backend={level},chart_keeper={level},tower_http=debug",
        level = log_level
    )
}

/// Initialize the tracing subscriber.
pub fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(log_level).into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
