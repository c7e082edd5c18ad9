//! Interleaved 16-bit stereo PCM buffer.

use std::time::Duration;

/// Full-scale multiplier used when quantizing `[-1.0, 1.0]` floats.
const FULL_SCALE: f64 = 32767.0;

/// A rendered stereo buffer. Each frame is `[left, right]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StereoBuffer {
    sample_rate: u32,
    frames: Vec<[i16; 2]>,
}

impl StereoBuffer {
    /// Wrap already-quantized frames.
    pub fn new(sample_rate: u32, frames: Vec<[i16; 2]>) -> Self {
        Self {
            sample_rate,
            frames,
        }
    }

    /// Build a buffer from float channel pairs, quantizing each sample.
    pub fn from_float_frames(sample_rate: u32, frames: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let frames = frames
            .into_iter()
            .map(|(l, r)| [quantize(l), quantize(r)])
            .collect();
        Self::new(sample_rate, frames)
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Raw frames.
    pub fn frames(&self) -> &[[i16; 2]] {
        &self.frames
    }

    /// Left channel samples.
    pub fn left(&self) -> impl Iterator<Item = i16> + '_ {
        self.frames.iter().map(|f| f[0])
    }

    /// Right channel samples.
    pub fn right(&self) -> impl Iterator<Item = i16> + '_ {
        self.frames.iter().map(|f| f[1])
    }

    /// Largest absolute left sample.
    pub fn peak_left(&self) -> u16 {
        self.left().map(i16::unsigned_abs).max().unwrap_or(0)
    }

    /// Largest absolute right sample.
    pub fn peak_right(&self) -> u16 {
        self.right().map(i16::unsigned_abs).max().unwrap_or(0)
    }

    /// Playback length at the buffer's sample rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames.len() as f64 / f64::from(self.sample_rate))
    }
}

/// Quantize a float sample to `i16`, saturating at the integer range.
pub fn quantize(sample: f64) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample * FULL_SCALE).clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}
