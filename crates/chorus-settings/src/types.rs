//! Settings type definitions.
//!
//! Field names are camelCase on the wire. Every struct is
//! `#[serde(default)]`, so a settings file only needs the keys it changes.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Root settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChorusSettings {
    /// Network listener.
    pub server: ServerSettings,
    /// Tone rendering and fades.
    pub sound: SoundSettings,
    /// Expiry sweep.
    pub sweeper: SweeperSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Network listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// WebSocket + HTTP port.
    pub port: u16,
    /// Directory served at `/` for browser clients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<String>,
    /// Outbound messages buffered per client before new ones are dropped.
    pub max_send_queue: usize,
    /// Seconds between server Ping frames.
    pub ping_interval_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8765,
            static_dir: None,
            max_send_queue: 256,
            ping_interval_secs: 30,
        }
    }
}

/// Accepted `sound.durationSecs`.
pub const DURATION_SECS_RANGE: RangeInclusive<f64> = 0.1..=3_600.0;

/// Accepted `sound.sampleRate`.
pub const SAMPLE_RATE_RANGE: RangeInclusive<u32> = 1_000..=192_000;

/// Tone rendering and fade settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoundSettings {
    /// Frames per second of rendered buffers.
    pub sample_rate: u32,
    /// Lifetime of every sound, in seconds.
    pub duration_secs: f64,
    /// Carrier amplitude and target playback volume.
    pub base_volume: f64,
    /// Fade-in length for a new sound.
    pub fade_in_ms: u64,
    /// Volume steps in the fade-in.
    pub fade_in_steps: u32,
    /// Fade-out for a sound replaced by a new play command.
    pub replace_fadeout_ms: u64,
    /// Fade-out for an explicit stop.
    pub stop_fadeout_ms: u64,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            duration_secs: 12.0,
            base_volume: 0.7,
            fade_in_ms: 5,
            fade_in_steps: 5,
            replace_fadeout_ms: 10,
            stop_fadeout_ms: 1_000,
        }
    }
}

/// Expiry sweep settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SweeperSettings {
    /// Milliseconds between sweeps.
    pub interval_ms: u64,
}

impl Default for SweeperSettings {
    fn default() -> Self {
        Self { interval_ms: 1_000 }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive. `RUST_LOG` wins when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
