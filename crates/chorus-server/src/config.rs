//! Runtime configuration resolved from [`ChorusSettings`].

use std::path::PathBuf;
use std::time::Duration;

use chorus_settings::{ChorusSettings, DURATION_SECS_RANGE, SAMPLE_RATE_RANGE};
use chorus_synth::{FadeIn, RenderSpec};

/// How sounds are rendered, faded and retired.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoundConfig {
    /// Buffer format and carrier amplitude.
    pub render: RenderSpec,
    /// Ramp applied when a sound starts.
    pub fade_in: FadeIn,
    /// Fade-out for a sound replaced by a new one.
    pub replace_fadeout: Duration,
    /// Fade-out for an explicit stop.
    pub stop_fadeout: Duration,
}

impl SoundConfig {
    /// Lifetime of every sound, capped at an hour.
    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.render.duration_secs.min(*DURATION_SECS_RANGE.end()))
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for SoundConfig {
    fn default() -> Self {
        let render = RenderSpec::default();
        Self {
            render,
            fade_in: FadeIn {
                target: render.base_volume as f32,
                duration: Duration::from_millis(5),
                steps: 5,
            },
            replace_fadeout: Duration::from_millis(10),
            stop_fadeout: Duration::from_millis(1_000),
        }
    }
}

/// Configuration for the chorus server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Directory served for paths no route matches.
    pub static_dir: Option<PathBuf>,
    /// Per-client outbound queue capacity.
    pub max_send_queue: usize,
    /// Interval between server Ping frames.
    pub ping_interval: Duration,
    /// Interval between expiry sweeps.
    pub sweep_interval: Duration,
    /// Sound rendering and fades.
    pub sound: SoundConfig,
}

impl ServerConfig {
    /// Resolve from loaded settings.
    pub fn from_settings(settings: &ChorusSettings) -> Self {
        let sound = &settings.sound;
        let render = RenderSpec {
            sample_rate: sound
                .sample_rate
                .clamp(*SAMPLE_RATE_RANGE.start(), *SAMPLE_RATE_RANGE.end()),
            // NaN lands on the minimum.
            duration_secs: sound
                .duration_secs
                .max(*DURATION_SECS_RANGE.start())
                .min(*DURATION_SECS_RANGE.end()),
            base_volume: sound.base_volume,
        };
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            static_dir: settings.server.static_dir.as_ref().map(PathBuf::from),
            max_send_queue: settings.server.max_send_queue.max(1),
            ping_interval: Duration::from_secs(settings.server.ping_interval_secs.max(1)),
            sweep_interval: Duration::from_millis(settings.sweeper.interval_ms.max(1)),
            sound: SoundConfig {
                render,
                fade_in: FadeIn {
                    target: sound.base_volume as f32,
                    duration: Duration::from_millis(sound.fade_in_ms),
                    steps: sound.fade_in_steps.max(1),
                },
                replace_fadeout: Duration::from_millis(sound.replace_fadeout_ms),
                stop_fadeout: Duration::from_millis(sound.stop_fadeout_ms),
            },
        }
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            static_dir: None,
            max_send_queue: 256,
            ping_interval: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(1),
            sound: SoundConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_loopback_on_any_port() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:0");
    }

    #[test]
    fn default_sound_lasts_twelve_seconds() {
        let sound = SoundConfig::default();
        assert_eq!(sound.duration(), Duration::from_secs(12));
        assert!((sound.fade_in.target - 0.7).abs() < 1e-6);
        assert_eq!(sound.replace_fadeout, Duration::from_millis(10));
        assert_eq!(sound.stop_fadeout, Duration::from_secs(1));
    }

    #[test]
    fn from_settings_copies_every_group() {
        let mut settings = ChorusSettings::default();
        settings.server.host = "0.0.0.0".into();
        settings.server.port = 9000;
        settings.server.static_dir = Some("./static".into());
        settings.sweeper.interval_ms = 250;
        settings.sound.duration_secs = 2.5;
        settings.sound.stop_fadeout_ms = 400;

        let cfg = ServerConfig::from_settings(&settings);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9000");
        assert_eq!(cfg.static_dir, Some(PathBuf::from("./static")));
        assert_eq!(cfg.sweep_interval, Duration::from_millis(250));
        assert_eq!(cfg.sound.duration(), Duration::from_millis(2_500));
        assert_eq!(cfg.sound.stop_fadeout, Duration::from_millis(400));
        assert_eq!(cfg.sound.render.sample_rate, 44_100);
    }

    #[test]
    fn zero_intervals_are_raised() {
        let mut settings = ChorusSettings::default();
        settings.sweeper.interval_ms = 0;
        settings.server.ping_interval_secs = 0;
        settings.server.max_send_queue = 0;
        let cfg = ServerConfig::from_settings(&settings);
        assert_eq!(cfg.sweep_interval, Duration::from_millis(1));
        assert_eq!(cfg.ping_interval, Duration::from_secs(1));
        assert_eq!(cfg.max_send_queue, 1);
    }

    #[test]
    fn render_settings_are_bounded() {
        let mut settings = ChorusSettings::default();
        settings.sound.sample_rate = u32::MAX;
        settings.sound.duration_secs = 1e12;
        let cfg = ServerConfig::from_settings(&settings);
        assert_eq!(cfg.sound.render.sample_rate, 192_000);
        assert_eq!(cfg.sound.duration(), Duration::from_secs(3_600));

        settings.sound.sample_rate = 0;
        settings.sound.duration_secs = 0.0;
        let cfg = ServerConfig::from_settings(&settings);
        assert_eq!(cfg.sound.render.sample_rate, 1_000);
        assert_eq!(cfg.sound.duration().as_millis(), 100);
    }

    #[test]
    fn oversubdivided_fade_in_keeps_a_nonzero_period() {
        let mut settings = ChorusSettings::default();
        settings.sound.fade_in_ms = 1;
        settings.sound.fade_in_steps = 2_000_000;
        let cfg = ServerConfig::from_settings(&settings);
        assert_eq!(cfg.sound.fade_in.effective_steps(), 1);
    }

    #[test]
    fn hand_built_duration_is_capped() {
        let mut sound = SoundConfig::default();
        sound.render.duration_secs = f64::MAX;
        assert_eq!(sound.duration(), Duration::from_secs(3_600));
    }

    #[test]
    fn negative_duration_is_zero() {
        let mut sound = SoundConfig::default();
        sound.render.duration_secs = -1.0;
        assert_eq!(sound.duration(), Duration::ZERO);
    }
}
