//! The plugin's digital signal processing is fully implemented within this module.
//!
//! All updates to input parameters are received through message passing to avoid thread locking
//! during audio processing. Parameter changes are applied block-wise: the `GainRamp` struct
//! interpolates from the previously applied gain to the new one across the samples of a block,
//! so automation never produces an audible click.

use crate::plugin_state::{StateUpdate, DEFAULT_GAIN};
use std::sync::mpsc::Receiver;

mod ramp;
use ramp::GainRamp;

use vst::buffer::AudioBuffer;

/// Handles all audio processing algorithms for the plugin.
pub(super) struct PluginDsp {
    gain: f32,
    invert_phase: bool,
    ramp: GainRamp,

    messages_from_params: Receiver<StateUpdate>,
}

impl PluginDsp {
    pub fn new(incoming_messages: Receiver<StateUpdate>) -> Self {
        Self {
            gain: DEFAULT_GAIN,
            invert_phase: false,
            ramp: GainRamp::new(DEFAULT_GAIN),

            messages_from_params: incoming_messages,
        }
    }

    /// Seed the ramp with the current control values so the next block is processed at constant
    /// gain. Called when the host (re)activates processing and after a state restore.
    pub fn reset(&mut self) {
        let seed = self.effective_gain();
        self.ramp.reset(seed);
    }

    /// The signed gain actually applied to samples: the gain control, negated while the phase
    /// invert toggle is on. Ramping this single value also covers polarity flips, since the
    /// interpolation passes through zero on its way to the negated target.
    fn effective_gain(&self) -> f32 {
        if self.invert_phase {
            -self.gain
        } else {
            self.gain
        }
    }

    /// Applies any incoming state update events to the audio processing algorithm, and then
    /// writes processed audio into the output buffer.
    pub fn process(&mut self, buffer: &mut AudioBuffer<f32>) {
        // First, drain pending parameter changes so the whole block sees a single consistent
        // snapshot of the controls.
        while let Ok(message) = self.messages_from_params.try_recv() {
            match message {
                StateUpdate::SetGain(value) => self.gain = value,
                StateUpdate::SetInvertPhase(inverted) => self.invert_phase = inverted,
                StateUpdate::RestoreState { gain, invert_phase } => {
                    self.gain = gain;
                    self.invert_phase = invert_phase;
                    // The first block after a restore must be gain-constant, not a sweep from
                    // whatever was last playing.
                    self.reset();
                }
            }
        }

        // Copy the dry signal across, then scale every channel in place with one shared ramp
        // decision; the carried gain state advances once per block, not once per channel.
        let current = self.effective_gain();
        let result = self.ramp.process_channels(
            buffer.zip().map(|(input, output)| {
                output.copy_from_slice(input);
                output
            }),
            current,
        );

        if let Err(err) = result {
            log::warn!("gain not applied this block: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    const BLOCK: usize = 8;

    /// Run one stereo block of constant-valued input through the processor and collect both
    /// output channels.
    fn process_stereo(dsp: &mut PluginDsp, input: f32) -> (Vec<f32>, Vec<f32>) {
        let left_in = vec![input; BLOCK];
        let right_in = vec![input; BLOCK];
        let mut left_out = vec![0.0f32; BLOCK];
        let mut right_out = vec![0.0f32; BLOCK];

        let inputs: Vec<*const f32> = vec![left_in.as_ptr(), right_in.as_ptr()];
        let mut outputs: Vec<*mut f32> = vec![left_out.as_mut_ptr(), right_out.as_mut_ptr()];
        let mut buffer =
            unsafe { AudioBuffer::from_raw(2, 2, inputs.as_ptr(), outputs.as_mut_ptr(), BLOCK) };

        dsp.process(&mut buffer);

        (left_out, right_out)
    }

    #[test]
    fn default_state_applies_constant_default_gain() {
        let (_to_dsp, dsp_recv) = channel();
        let mut dsp = PluginDsp::new(dsp_recv);

        let (left, right) = process_stereo(&mut dsp, 1.0);

        for sample in left.iter().chain(right.iter()) {
            assert!((sample - DEFAULT_GAIN).abs() < 1e-6);
        }
    }

    #[test]
    fn gain_change_ramps_then_settles() {
        let (to_dsp, dsp_recv) = channel();
        let mut dsp = PluginDsp::new(dsp_recv);

        to_dsp.send(StateUpdate::SetGain(1.0)).unwrap();
        let (left, right) = process_stereo(&mut dsp, 1.0);

        // The block sweeps from the previously applied default up to the new value, identically
        // on both channels.
        assert!((left[0] - DEFAULT_GAIN).abs() < 1e-6);
        assert!((left[BLOCK - 1] - 1.0).abs() < 1e-6);
        assert_eq!(left, right);

        // The following block is constant at the new value.
        let (left, _right) = process_stereo(&mut dsp, 1.0);
        for sample in &left {
            assert!((sample - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn phase_invert_ramps_through_zero() {
        let (to_dsp, dsp_recv) = channel();
        let mut dsp = PluginDsp::new(dsp_recv);

        to_dsp.send(StateUpdate::SetInvertPhase(true)).unwrap();
        let (left, _right) = process_stereo(&mut dsp, 1.0);

        assert!((left[0] - DEFAULT_GAIN).abs() < 1e-6);
        assert!((left[BLOCK - 1] + DEFAULT_GAIN).abs() < 1e-6);
        // The sweep to the negated gain crosses zero mid-block instead of flipping sign abruptly.
        assert!(left[3] > 0.0);
        assert!(left[4] < 0.0);
    }

    #[test]
    fn restore_is_applied_without_a_ramp() {
        let (to_dsp, dsp_recv) = channel();
        let mut dsp = PluginDsp::new(dsp_recv);

        to_dsp
            .send(StateUpdate::RestoreState {
                gain: 0.9,
                invert_phase: false,
            })
            .unwrap();
        let (left, _right) = process_stereo(&mut dsp, 1.0);

        for sample in &left {
            assert!((sample - 0.9).abs() < 1e-6);
        }
    }
}
