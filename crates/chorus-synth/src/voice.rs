//! Playback seam between the session engine and an output device.
//!
//! The engine only needs a handful of mixer capabilities: start a buffer,
//! change its volume, fade it out, and ask whether it is still sounding.
//! [`HeadlessSink`] provides them without hardware by modelling every voice
//! against the tokio clock, which also makes playback state testable with a
//! paused runtime.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

use crate::buffer::StereoBuffer;

/// Something that can play rendered buffers.
pub trait AudioSink: Send + Sync {
    /// Start playing `buffer` at volume 0 and return a handle to it.
    fn play(&self, buffer: StereoBuffer) -> Arc<dyn Voice>;
}

/// A single playing buffer.
pub trait Voice: Send + Sync {
    /// Set the playback volume (`0.0..=1.0`). Ignored once a fade-out began.
    fn set_volume(&self, level: f32);
    /// Current effective volume, including any fade-out in progress.
    fn volume(&self) -> f32;
    /// Ramp the volume to silence over `duration`, then stop.
    fn fadeout(&self, duration: Duration);
    /// Silence immediately.
    fn stop(&self);
    /// Whether the voice is still audible.
    fn is_playing(&self) -> bool;
    /// Length of the underlying buffer.
    fn length(&self) -> Duration;
}

impl fmt::Debug for dyn Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Voice")
            .field("volume", &self.volume())
            .field("playing", &self.is_playing())
            .field("length", &self.length())
            .finish()
    }
}

#[derive(Debug)]
struct FadeOut {
    from: f32,
    started_at: Instant,
    duration: Duration,
}

impl FadeOut {
    fn level(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.started_at);
        if elapsed >= self.duration {
            return 0.0;
        }
        let progress = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.from * (1.0 - progress)
    }

    fn finished(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) >= self.duration
    }
}

#[derive(Debug, Default)]
struct VoiceState {
    volume: f32,
    fade_out: Option<FadeOut>,
    stopped: bool,
}

/// A voice whose playback position is derived from the clock.
#[derive(Debug)]
pub struct ClockVoice {
    length: Duration,
    started_at: Instant,
    state: Mutex<VoiceState>,
}

impl ClockVoice {
    /// Start a voice of the given length now, at volume 0.
    pub fn new(length: Duration) -> Self {
        Self {
            length,
            started_at: Instant::now(),
            state: Mutex::new(VoiceState::default()),
        }
    }

    /// Time since playback started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Whether a fade-out has been requested.
    pub fn is_fading_out(&self) -> bool {
        self.state.lock().fade_out.is_some()
    }
}

impl Voice for ClockVoice {
    fn set_volume(&self, level: f32) {
        let mut state = self.state.lock();
        if state.stopped || state.fade_out.is_some() {
            return;
        }
        state.volume = level.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        let state = self.state.lock();
        if state.stopped {
            return 0.0;
        }
        match &state.fade_out {
            Some(fade) => fade.level(Instant::now()),
            None => state.volume,
        }
    }

    fn fadeout(&self, duration: Duration) {
        let mut state = self.state.lock();
        if state.stopped || state.fade_out.is_some() {
            return;
        }
        if duration.is_zero() {
            state.stopped = true;
            return;
        }
        let from = state.volume;
        state.fade_out = Some(FadeOut {
            from,
            started_at: Instant::now(),
            duration,
        });
    }

    fn stop(&self) {
        self.state.lock().stopped = true;
    }

    fn is_playing(&self) -> bool {
        let state = self.state.lock();
        if state.stopped || self.started_at.elapsed() >= self.length {
            return false;
        }
        !state
            .fade_out
            .as_ref()
            .is_some_and(|fade| fade.finished(Instant::now()))
    }

    fn length(&self) -> Duration {
        self.length
    }
}

/// Output sink with no device behind it.
///
/// Like a mixer, the sink keeps each voice alive until it finishes, so a
/// voice that is fading out keeps sounding after its owner lets go.
#[derive(Default)]
pub struct HeadlessSink {
    voices: Mutex<Vec<Arc<ClockVoice>>>,
    started: AtomicU64,
}

impl HeadlessSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total voices started since creation.
    pub fn voices_started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    /// Voices that are still audible. Forgets finished ones.
    pub fn active_voices(&self) -> usize {
        let mut voices = self.voices.lock();
        voices.retain(|v| v.is_playing());
        voices.len()
    }
}

impl AudioSink for HeadlessSink {
    fn play(&self, buffer: StereoBuffer) -> Arc<dyn Voice> {
        let voice = Arc::new(ClockVoice::new(buffer.duration()));
        {
            let mut voices = self.voices.lock();
            voices.retain(|v| v.is_playing());
            voices.push(Arc::clone(&voice));
        }
        let total = self.started.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(frames = buffer.len(), total, "voice started");
        voice
    }
}
