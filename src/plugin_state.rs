//! Parameters are kept as the single "source of truth" for the long-term state of the plugin. As
//! used by the VST API, the parameter bank is accessible by both the audio processing thread and
//! the host's UI thread, and updated using thread-safe interior mutability. However, to avoid
//! costly synchronization overhead on the audio thread, the audio processing side subscribes to
//! parameter updates through cross-thread message passing.
//!
//! The long-term state consists of the gain knob and the phase invert toggle. Both are persisted
//! through the host's preset/bank chunk mechanism as a fixed little-endian record, and a restore
//! re-seeds the processing side so the first block after loading a session plays at the restored
//! gain instead of ramping toward it.

use std::convert::TryInto;
use std::sync::{mpsc::Sender, Mutex};

use vst::plugin::PluginParameters;

/// Initial value of the gain knob, used until the host or a restored session says otherwise.
pub(super) const DEFAULT_GAIN: f32 = 0.5;

/// Host-visible parameter indices.
const PARAM_GAIN: i32 = 0;
const PARAM_INVERT_PHASE: i32 = 1;
pub(super) const PARAM_COUNT: usize = 2;

/// Size of the persisted state record: one little-endian `f32` per parameter.
const STATE_CHUNK_LEN: usize = PARAM_COUNT * 4;

/// Describes a discrete operation that can update this plugin's long-term state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateUpdate {
    SetGain(f32),
    SetInvertPhase(bool),
    /// A full state reload from persisted data. Delivered as one message so the processing side
    /// swaps both values and re-seeds its ramp atomically with respect to block boundaries.
    RestoreState { gain: f32, invert_phase: bool },
}

pub struct PluginState {
    to_dsp: Mutex<Sender<StateUpdate>>,

    state_record: Mutex<Vec<f32>>,
}

/// VST-accessible long-term plugin state storage. This is accessed through the audio processing
/// thread and the host's UI thread, so all fields are protected by thread-safe interior mutable
/// constructs.
impl PluginState {
    pub fn new(to_dsp: Sender<StateUpdate>) -> Self {
        Self {
            to_dsp: Mutex::new(to_dsp),
            state_record: Mutex::new(vec![DEFAULT_GAIN, 0.]),
        }
    }

    /// Serialize the parameter record as the preset/bank chunk handed to the host.
    fn serialize_state(&self) -> Vec<u8> {
        let record = self.state_record.lock().unwrap();
        let mut data = Vec::with_capacity(STATE_CHUNK_LEN);
        for value in record.iter() {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data
    }

    /// Restore the parameter record from a persisted chunk and notify the processing side.
    /// Truncated chunks indicate host-side corruption and are ignored in full.
    fn restore_state(&self, data: &[u8]) {
        if data.len() < STATE_CHUNK_LEN {
            log::warn!(
                "ignoring persisted state of {} bytes (expected {})",
                data.len(),
                STATE_CHUNK_LEN
            );
            return;
        }

        let gain = f32::from_le_bytes(data[0..4].try_into().unwrap());
        let invert = f32::from_le_bytes(data[4..8].try_into().unwrap());

        {
            let mut record = self.state_record.lock().unwrap();
            record[PARAM_GAIN as usize] = gain;
            record[PARAM_INVERT_PHASE as usize] = invert;
        }

        self.to_dsp
            .lock()
            .unwrap()
            .send(StateUpdate::RestoreState {
                gain,
                invert_phase: invert > 0.5,
            })
            .unwrap();
    }
}

/// The DAW directly accesses the plugin state through the VST API to get reports on knob states.
impl PluginParameters for PluginState {
    fn set_parameter(&self, index: i32, value: f32) {
        let state_update = match index {
            PARAM_GAIN => StateUpdate::SetGain(value),
            PARAM_INVERT_PHASE => StateUpdate::SetInvertPhase(value > 0.5),
            _ => return,
        };
        self.to_dsp.lock().unwrap().send(state_update).unwrap();
        self.state_record.lock().unwrap()[index as usize] = value;
    }

    fn get_parameter(&self, index: i32) -> f32 {
        self.state_record.lock().unwrap()[index as usize]
    }

    fn get_parameter_label(&self, index: i32) -> String {
        match index {
            PARAM_GAIN => "x".to_string(),
            PARAM_INVERT_PHASE => String::new(),
            _ => unreachable!(),
        }
    }

    fn get_parameter_text(&self, index: i32) -> String {
        match index {
            PARAM_GAIN => format!("{:.2}", self.state_record.lock().unwrap()[index as usize]),
            PARAM_INVERT_PHASE => {
                if self.state_record.lock().unwrap()[index as usize] > 0.5 {
                    "Inverted".to_string()
                } else {
                    "Normal".to_string()
                }
            }
            _ => unreachable!(),
        }
    }

    fn get_parameter_name(&self, index: i32) -> String {
        match index {
            PARAM_GAIN => "Gain",
            PARAM_INVERT_PHASE => "Invert Phase",
            _ => unreachable!(),
        }
        .to_string()
    }

    fn string_to_parameter(&self, index: i32, text: String) -> bool {
        match index {
            PARAM_GAIN => match text.parse::<f32>() {
                Ok(value) if value >= 0. && value <= 1. => {
                    self.set_parameter(index, value);
                    true
                }
                _ => false,
            },
            PARAM_INVERT_PHASE => match text.to_lowercase().as_str() {
                "inverted" | "1" | "true" => {
                    self.set_parameter(index, 1.);
                    true
                }
                "normal" | "0" | "false" => {
                    self.set_parameter(index, 0.);
                    true
                }
                _ => false,
            },
            _ => unreachable!(),
        }
    }

    fn get_preset_data(&self) -> Vec<u8> {
        self.serialize_state()
    }

    fn get_bank_data(&self) -> Vec<u8> {
        self.serialize_state()
    }

    fn load_preset_data(&self, data: &[u8]) {
        self.restore_state(data);
    }

    fn load_bank_data(&self, data: &[u8]) {
        self.restore_state(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn set_parameter_records_and_forwards() {
        let (to_dsp, dsp_recv) = channel();
        let state = PluginState::new(to_dsp);

        state.set_parameter(PARAM_GAIN, 0.75);
        state.set_parameter(PARAM_INVERT_PHASE, 1.);

        assert!((state.get_parameter(PARAM_GAIN) - 0.75).abs() < 1e-6);
        assert_eq!(dsp_recv.try_recv().unwrap(), StateUpdate::SetGain(0.75));
        assert_eq!(
            dsp_recv.try_recv().unwrap(),
            StateUpdate::SetInvertPhase(true)
        );
    }

    #[test]
    fn preset_data_round_trips_and_reseeds_dsp() {
        let (to_dsp, _dsp_recv) = channel();
        let state = PluginState::new(to_dsp);
        state.set_parameter(PARAM_GAIN, 0.25);
        state.set_parameter(PARAM_INVERT_PHASE, 1.);

        let chunk = state.get_preset_data();
        assert_eq!(chunk.len(), STATE_CHUNK_LEN);

        let (to_dsp, dsp_recv) = channel();
        let restored = PluginState::new(to_dsp);
        restored.load_preset_data(&chunk);

        assert!((restored.get_parameter(PARAM_GAIN) - 0.25).abs() < 1e-6);
        assert!(restored.get_parameter(PARAM_INVERT_PHASE) > 0.5);
        assert_eq!(
            dsp_recv.try_recv().unwrap(),
            StateUpdate::RestoreState {
                gain: 0.25,
                invert_phase: true,
            }
        );
    }

    #[test]
    fn truncated_preset_data_changes_nothing() {
        let (to_dsp, dsp_recv) = channel();
        let state = PluginState::new(to_dsp);

        state.load_preset_data(&[0x00, 0x01, 0x02]);

        assert!((state.get_parameter(PARAM_GAIN) - DEFAULT_GAIN).abs() < 1e-6);
        assert!(dsp_recv.try_recv().is_err());
    }

    #[test]
    fn text_entry_accepts_bounded_gain_only() {
        let (to_dsp, _dsp_recv) = channel();
        let state = PluginState::new(to_dsp);

        assert!(state.string_to_parameter(PARAM_GAIN, "0.8".to_string()));
        assert!((state.get_parameter(PARAM_GAIN) - 0.8).abs() < 1e-6);

        assert!(!state.string_to_parameter(PARAM_GAIN, "1.5".to_string()));
        assert!(!state.string_to_parameter(PARAM_GAIN, "loud".to_string()));

        assert!(state.string_to_parameter(PARAM_INVERT_PHASE, "Inverted".to_string()));
        assert!(state.get_parameter(PARAM_INVERT_PHASE) > 0.5);
    }
}
