//! Wire messages exchanged over `/ws`.
//!
//! Every message is a JSON object discriminated by its `type` field.
//! Unknown types decode to [`Inbound::Unknown`] rather than failing.

use chorus_synth::{LfoShape, ToneParams};
use serde::{Deserialize, Serialize};

use crate::errors::DispatchError;
use crate::ids::ClientId;

/// Client → server.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// Replace the caller's sound with a new tone.
    PlaySignalOscillator(ToneParams),
    /// Fade out and remove the caller's sound.
    StopAudio,
    /// Ask for every client's sound.
    GetAllPlayingSounds,
    /// Ask for what every other client is playing.
    GetOtherClientsActions,
    /// Any other `type`.
    #[serde(other)]
    Unknown,
}

impl Inbound {
    /// Wire name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlaySignalOscillator(_) => "play_signal_oscillator",
            Self::StopAudio => "stop_audio",
            Self::GetAllPlayingSounds => "get_all_playing_sounds",
            Self::GetOtherClientsActions => "get_other_clients_actions",
            Self::Unknown => "unknown",
        }
    }
}

/// Server → client.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Reply to `get_all_playing_sounds`.
    ActiveSounds {
        /// One entry per client with a sound.
        data: Vec<SoundSnapshot>,
    },
    /// Reply to `get_other_clients_actions`.
    OtherClientsActions {
        /// One entry per other client with a sound.
        data: Vec<ClientAction>,
    },
}

impl Outbound {
    /// Serialize for a text frame.
    pub fn to_json(&self) -> Result<String, DispatchError> {
        serde_json::to_string(self).map_err(DispatchError::Encode)
    }
}

/// Point-in-time copy of one client's sound.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SoundSnapshot {
    /// Owner.
    pub client_id: ClientId,
    /// Carrier Hz.
    pub frequency: f64,
    /// LFO Hz.
    pub lfo_frequency: f64,
    /// 0.0 left … 1.0 right.
    pub pan: f64,
    /// LFO waveform as the client sent it.
    pub lfo_shape: LfoShape,
    /// Whether the voice is audible. `false` while the buffer is rendering.
    pub is_playing: bool,
    /// Length of the rendered buffer in seconds, 0 until rendered.
    pub length_sec: f64,
    /// Seconds until the sweeper may remove the sound.
    pub remaining_sec: f64,
    /// Current playback volume.
    pub volume: f64,
}

/// The reduced view a client gets of its peers: no pan, no volume.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClientAction {
    /// Owner.
    pub client_id: ClientId,
    /// Carrier Hz.
    pub frequency: f64,
    /// LFO Hz.
    pub lfo_frequency: f64,
    /// LFO waveform as the client sent it.
    pub lfo_shape: LfoShape,
}

impl ClientAction {
    /// Project tone parameters for `client_id`.
    pub fn from_params(client_id: ClientId, params: &ToneParams) -> Self {
        Self {
            client_id,
            frequency: params.frequency,
            lfo_frequency: params.lfo_frequency,
            lfo_shape: params.lfo_shape.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> Inbound {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn play_with_all_fields() {
        let msg = decode(json!({
            "type": "play_signal_oscillator",
            "frequency": 220.0,
            "lfo_frequency": -3.5,
            "lfo_shape": "triangle",
            "pan": 0.0,
        }));
        let Inbound::PlaySignalOscillator(params) = msg else {
            panic!("expected play, got {msg:?}");
        };
        assert!((params.frequency - 220.0).abs() < f64::EPSILON);
        assert!((params.lfo_frequency + 3.5).abs() < f64::EPSILON);
        assert_eq!(params.lfo_shape, LfoShape::Triangle);
        assert!(params.pan.abs() < f64::EPSILON);
    }

    #[test]
    fn play_defaults_missing_fields() {
        let msg = decode(json!({"type": "play_signal_oscillator"}));
        assert_eq!(msg, Inbound::PlaySignalOscillator(ToneParams::default()));
    }

    #[test]
    fn out_of_range_values_are_kept() {
        let msg = decode(json!({"type": "play_signal_oscillator", "frequency": -10, "pan": 7}));
        let Inbound::PlaySignalOscillator(params) = msg else {
            panic!("expected play");
        };
        assert!((params.frequency + 10.0).abs() < f64::EPSILON);
        assert!((params.pan - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn null_shape_plays_with_default() {
        let msg = decode(json!({"type": "play_signal_oscillator", "frequency": 220, "lfo_shape": null}));
        let Inbound::PlaySignalOscillator(params) = msg else {
            panic!("expected play, got {msg:?}");
        };
        assert_eq!(params.lfo_shape, LfoShape::Sine);
        assert!((params.frequency - 220.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_string_shape_plays_unmodulated() {
        let msg = decode(json!({"type": "play_signal_oscillator", "lfo_shape": 3}));
        let Inbound::PlaySignalOscillator(params) = msg else {
            panic!("expected play, got {msg:?}");
        };
        assert_eq!(params.lfo_shape, LfoShape::Unrecognized("3".into()));
        assert!(params.lfo_shape.sample(5.0, 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn unit_messages_ignore_extra_fields() {
        assert_eq!(decode(json!({"type": "stop_audio", "x": 1})), Inbound::StopAudio);
        assert_eq!(
            decode(json!({"type": "get_all_playing_sounds"})),
            Inbound::GetAllPlayingSounds
        );
        assert_eq!(
            decode(json!({"type": "get_other_clients_actions"})),
            Inbound::GetOtherClientsActions
        );
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        assert_eq!(decode(json!({"type": "harmonize_please"})), Inbound::Unknown);
    }

    #[test]
    fn missing_type_is_an_error() {
        assert!(serde_json::from_value::<Inbound>(json!({"frequency": 1})).is_err());
    }

    #[test]
    fn active_sounds_wire_shape() {
        let out = Outbound::ActiveSounds {
            data: vec![SoundSnapshot {
                client_id: ClientId::from_raw("client_a"),
                frequency: 220.0,
                lfo_frequency: 0.0,
                pan: 0.0,
                lfo_shape: LfoShape::Sine,
                is_playing: true,
                length_sec: 12.0,
                remaining_sec: 11.5,
                volume: 0.7,
            }],
        };
        let value: serde_json::Value = serde_json::from_str(&out.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "active_sounds");
        assert_eq!(value["data"][0]["client_id"], "client_a");
        assert_eq!(value["data"][0]["lfo_shape"], "sine");
        assert_eq!(value["data"][0]["is_playing"], true);
    }

    #[test]
    fn other_actions_omit_pan_and_volume() {
        let params = ToneParams {
            lfo_shape: LfoShape::from("wobble"),
            ..ToneParams::default()
        };
        let out = Outbound::OtherClientsActions {
            data: vec![ClientAction::from_params(ClientId::from_raw("client_b"), &params)],
        };
        let value: serde_json::Value = serde_json::from_str(&out.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "other_clients_actions");
        let entry = value["data"][0].as_object().unwrap();
        assert_eq!(entry.len(), 4);
        assert!(!entry.contains_key("pan"));
        assert!(!entry.contains_key("volume"));
        assert_eq!(entry["lfo_shape"], "wobble");
    }
}
