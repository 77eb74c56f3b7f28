//! smooth-gain is a minimal yet complete VST2 volume effect.
//!
//! It exposes a gain knob and a phase invert toggle to the host, and applies them to the audio
//! stream without ever producing an audible click: whenever a control changes between blocks,
//! the applied gain is interpolated linearly across the next block instead of jumping. The
//! host's generic parameter UI stands in for a custom editor.

use std::sync::{mpsc::channel, Arc};

use vst::{
    api::Supported,
    buffer::AudioBuffer,
    plugin::{CanDo, HostCallback, Info, Plugin, PluginParameters},
};

mod dsp;
use dsp::PluginDsp;

mod plugin_state;
use plugin_state::PluginState;

/// Top level wrapper that exposes a full `vst::Plugin` implementation.
struct SmoothGainVst {
    /// The `PluginDsp` handles all of the plugin's audio processing, and is only accessed from
    /// the audio processing thread.
    dsp: PluginDsp,

    /// The `PluginState` holds the long-term state of the plugin and distributes raw parameter
    /// updates to the processing thread as they occur. It is shared with the host's UI thread
    /// and updated using thread-safe interior mutability.
    state_handle: Arc<PluginState>,
}

impl SmoothGainVst {
    fn new() -> Self {
        let (to_dsp, dsp_recv) = channel();

        let state_handle = Arc::new(PluginState::new(to_dsp));
        let dsp = PluginDsp::new(dsp_recv);

        Self { dsp, state_handle }
    }
}

/// `vst::plugin_main` requires a `Default` implementation.
impl Default for SmoothGainVst {
    fn default() -> Self {
        Self::new()
    }
}

/// Main `vst` plugin implementation.
impl Plugin for SmoothGainVst {
    fn new(_host: HostCallback) -> Self {
        Self::new()
    }

    fn get_info(&self) -> Info {
        /// Use a hash of a string describing this plugin to avoid unique ID conflicts.
        const UNIQUE_ID_SEED: &str = "smooth-gain Ramped Volume VST2 Plugin";
        static UNIQUE_ID: once_cell::sync::Lazy<i32> = once_cell::sync::Lazy::new(|| {
            use std::collections::hash_map::DefaultHasher;
            use std::hash::{Hash, Hasher};

            let mut s = DefaultHasher::new();
            UNIQUE_ID_SEED.hash(&mut s);
            s.finish() as i32
        });

        Info {
            name: "Smooth Gain".to_string(),
            unique_id: *UNIQUE_ID,
            inputs: 2,
            outputs: 2,
            parameters: plugin_state::PARAM_COUNT as i32,
            initial_delay: 0,
            preset_chunks: true,
            ..Info::default()
        }
    }

    fn resume(&mut self) {
        // Seed the gain ramp with the current control values, so the first block after
        // activation plays at constant gain rather than sweeping from a stale default.
        self.dsp.reset();
    }

    fn process(&mut self, buffer: &mut AudioBuffer<f32>) {
        self.dsp.process(buffer);
    }

    fn can_do(&self, _can_do: CanDo) -> Supported {
        Supported::Maybe
    }

    fn get_parameter_object(&mut self) -> Arc<dyn PluginParameters> {
        Arc::clone(&self.state_handle) as Arc<dyn PluginParameters>
    }
}

vst::plugin_main!(SmoothGainVst);
