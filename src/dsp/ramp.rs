/// Control values within this distance of each other are treated as unchanged, so the block is
/// scaled at constant gain instead of ramped. Host automation math rarely reproduces a value
/// bit-for-bit; 1e-6 is far below audibility for a 0-to-1 control but well above that noise.
const CONTROL_EPSILON: f32 = 1e-6;

/// Failure modes of block-wise gain application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub(super) enum RampError {
    /// The host handed us a zero-length block, which indicates a caller bug rather than a
    /// condition worth absorbing silently.
    #[error("cannot apply gain to an empty sample block")]
    EmptyBlock,
}

/// Applies a gain value to whole blocks of samples, linearly interpolating from the previously
/// applied value whenever the control has moved since the last block. The interpolation is what
/// keeps the output free of audible clicks under automation.
///
/// The entire ramp state is the single `previous` scalar, so a processor only needs to carry one
/// of these per smoothed control.
#[derive(Clone)]
pub(super) struct GainRamp {
    /// The gain in effect at the end of the most recently processed block.
    previous: f32,
}

impl GainRamp {
    pub fn new(initial: f32) -> Self {
        Self { previous: initial }
    }

    /// Seed the ramp as if `value` had just been applied, so the next block is processed at
    /// constant gain. Used at activation and after state restore.
    pub fn reset(&mut self, value: f32) {
        self.previous = value;
    }

    #[cfg(test)]
    pub fn previous(&self) -> f32 {
        self.previous
    }

    /// Scale one block of samples by `current`, ramping from the previously applied value when
    /// the control changed since the last block.
    ///
    /// Sample i of an N-sample ramp is scaled by `previous + (current - previous) * i / (N - 1)`,
    /// so the first sample continues exactly where the last block left off and the final sample
    /// lands exactly on `current`. A single-sample block takes the `current` endpoint directly.
    pub fn process_block(&mut self, block: &mut [f32], current: f32) -> Result<(), RampError> {
        self.process_channels(std::iter::once(block), current)
    }

    /// Scale every channel of one block identically, advancing the ramp state once for the whole
    /// block rather than once per channel.
    pub fn process_channels<'a>(
        &mut self,
        channels: impl IntoIterator<Item = &'a mut [f32]>,
        current: f32,
    ) -> Result<(), RampError> {
        let start = self.previous;
        let ramping = (current - start).abs() > CONTROL_EPSILON;

        let mut touched = false;
        for block in channels {
            if block.is_empty() {
                return Err(RampError::EmptyBlock);
            }
            touched = true;
            if ramping {
                apply_gain_ramp(block, start, current);
            } else {
                apply_gain(block, current);
            }
        }

        // A channel-less call applied nothing, so the carried value stays put.
        if touched && ramping {
            self.previous = current;
        }
        Ok(())
    }
}

/// Multiply every sample by a constant gain.
fn apply_gain(block: &mut [f32], gain: f32) {
    for sample in block.iter_mut() {
        *sample *= gain;
    }
}

/// Multiply the block by a gain sweeping linearly from `start` on the first sample to `end` on
/// the last.
fn apply_gain_ramp(block: &mut [f32], start: f32, end: f32) {
    let last = block.len() - 1;
    if last == 0 {
        block[0] *= end;
        return;
    }

    let step = (end - start) / last as f32;
    for (i, sample) in block.iter_mut().enumerate() {
        *sample *= start + step * i as f32;
    }
}
