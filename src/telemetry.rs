//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, falling back to `default_level`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber: human-readable, or JSON lines when `json`.
pub fn init(default_level: &str, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_target(true);
    if json {
        builder.json().with_current_span(true).init();
    } else {
        builder.init();
    }
}
