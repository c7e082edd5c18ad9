//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Call once at startup before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections accepted (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket connections closed (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// WebSocket connections open right now (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Sounds that reached playback (counter).
pub const SOUNDS_STARTED_TOTAL: &str = "sounds_started_total";
/// Sounds removed by a stop command (counter).
pub const SOUNDS_STOPPED_TOTAL: &str = "sounds_stopped_total";
/// Sounds removed by the sweeper (counter).
pub const SOUNDS_EXPIRED_TOTAL: &str = "sounds_expired_total";
/// Outbound messages dropped on a full or closed queue (counter).
pub const MESSAGES_DROPPED_TOTAL: &str = "messages_dropped_total";
