//! Phase-modulated oscillator rendering.
//!
//! The carrier is `sin(2π·f·t + m(t))` where `m` is the LFO output in
//! `[-1, 1]`, so the LFO bends phase rather than amplitude. Panning is the
//! linear law `left = s·(1 − pan)`, `right = s·pan`. Inputs are not
//! validated: negative frequencies and pan outside `[0, 1]` render as the
//! formulas dictate and are saturated at quantization.

use std::f64::consts::TAU;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::buffer::StereoBuffer;

/// LFO waveform.
///
/// Unknown names are kept verbatim so they can be reported back to clients;
/// they render as a silent (all-zero) modulator. Decoding never fails: `null`
/// is the default and any other non-string value is unrecognized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value", into = "String")]
pub enum LfoShape {
    /// `sin(2π·lfo·t)`
    #[default]
    Sine,
    /// Period `1/lfo` triangle in `[-1, 1]`.
    Triangle,
    /// `sign(sin(2π·lfo·t))`
    Square,
    /// Anything else. Renders no modulation.
    Unrecognized(String),
}

impl LfoShape {
    /// Wire name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sine => "sine",
            Self::Triangle => "triangle",
            Self::Square => "square",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Modulator value at time `t` (seconds) for an LFO at `lfo_hz`.
    pub fn sample(&self, lfo_hz: f64, t: f64) -> f64 {
        match self {
            Self::Sine => (TAU * lfo_hz * t).sin(),
            Self::Triangle => {
                let x = t * lfo_hz;
                2.0 * (2.0 * (x - (x + 0.5).floor())).abs() - 1.0
            }
            Self::Square => sign((TAU * lfo_hz * t).sin()),
            Self::Unrecognized(_) => 0.0,
        }
    }
}

impl From<String> for LfoShape {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "sine" => Self::Sine,
            "triangle" => Self::Triangle,
            "square" => Self::Square,
            _ => Self::Unrecognized(raw),
        }
    }
}

impl From<Value> for LfoShape {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::default(),
            Value::String(raw) => Self::from(raw),
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl From<&str> for LfoShape {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_owned())
    }
}

impl From<LfoShape> for String {
    fn from(shape: LfoShape) -> Self {
        match shape {
            LfoShape::Unrecognized(raw) => raw,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for LfoShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `sign` with `sign(0) = 0`; `f64::signum` maps zero to one.
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// What a client asked to hear. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneParams {
    /// Carrier frequency in Hz.
    pub frequency: f64,
    /// LFO frequency in Hz. Negative values reverse the modulation direction.
    pub lfo_frequency: f64,
    /// LFO waveform.
    pub lfo_shape: LfoShape,
    /// 0.0 = full left, 1.0 = full right.
    pub pan: f64,
}

impl Default for ToneParams {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            lfo_frequency: 0.0,
            lfo_shape: LfoShape::Sine,
            pan: 0.5,
        }
    }
}

/// Output format for a render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSpec {
    /// Frames per second.
    pub sample_rate: u32,
    /// Buffer length in seconds.
    pub duration_secs: f64,
    /// Carrier amplitude before panning.
    pub base_volume: f64,
}

impl RenderSpec {
    /// Frame count, `floor(sample_rate · duration)`.
    pub fn frame_count(&self) -> usize {
        let frames = f64::from(self.sample_rate) * self.duration_secs;
        if frames.is_finite() && frames > 0.0 {
            frames as usize
        } else {
            0
        }
    }
}

impl Default for RenderSpec {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            duration_secs: 12.0,
            base_volume: 0.7,
        }
    }
}

/// Render `params` into a stereo buffer.
pub fn synthesize(params: &ToneParams, spec: &RenderSpec) -> StereoBuffer {
    let frames = spec.frame_count();
    let step = if frames == 0 {
        0.0
    } else {
        spec.duration_secs / frames as f64
    };
    let left_gain = 1.0 - params.pan;
    let right_gain = params.pan;

    let samples = (0..frames).map(|i| {
        let t = i as f64 * step;
        let modulator = params.lfo_shape.sample(params.lfo_frequency, t);
        let signal = (TAU * params.frequency * t + modulator).sin() * spec.base_volume;
        (signal * left_gain, signal * right_gain)
    });

    StereoBuffer::from_float_frames(spec.sample_rate, samples)
}
