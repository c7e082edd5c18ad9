//! # chorus-settings
//!
//! Layered configuration for the chorus session server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ChorusSettings::default()`]
//! 2. **User file**: `~/.chorus/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `CHORUS_*` overrides (highest priority)
//!
//! Command-line flags are applied on top by the binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = ChorusSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = ChorusSettings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8765);
        assert!(settings.server.static_dir.is_none());
        assert_eq!(settings.sound.sample_rate, 44_100);
        assert!((settings.sound.duration_secs - 12.0).abs() < f64::EPSILON);
        assert!((settings.sound.base_volume - 0.7).abs() < f64::EPSILON);
        assert_eq!(settings.sound.fade_in_ms, 5);
        assert_eq!(settings.sound.replace_fadeout_ms, 10);
        assert_eq!(settings.sound.stop_fadeout_ms, 1_000);
        assert_eq!(settings.sweeper.interval_ms, 1_000);
        assert_eq!(settings.logging.level, "info");
        assert!(!settings.logging.json);
    }
}
