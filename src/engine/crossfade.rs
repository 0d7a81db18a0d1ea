//! Equal-power crossfade between colouring modes.

use crate::protocol::NoiseMode;
use std::f64::consts::FRAC_PI_2;

/// Default fade length in milliseconds.
pub const CROSSFADE_MS: f64 = 50.0;

/// Mode crossfade state.
///
/// At rest `remaining == 0`, `progress == 1` and `current == target`.
/// While fading `remaining > 0` and `progress < 1`.
#[derive(Debug, Clone)]
pub struct Crossfade {
    current: NoiseMode,
    target: NoiseMode,
    progress: f64,
    remaining: u32,
    fade_samples: u32,
}

impl Crossfade {
    /// Creates a steady crossfade in `mode`.
    ///
    /// `fade_samples` is clamped to at least one sample.
    pub fn new(mode: NoiseMode, fade_samples: u32) -> Self {
        Self {
            current: mode,
            target: mode,
            progress: 1.0,
            remaining: 0,
            fade_samples: fade_samples.max(1),
        }
    }

    /// Creates a steady crossfade with a fade length in milliseconds.
    pub fn with_duration(mode: NoiseMode, sample_rate: f64, fade_ms: f64) -> Self {
        let samples = (sample_rate * fade_ms / 1000.0).round();
        let samples = if samples.is_finite() && samples > 0.0 {
            samples.min(u32::MAX as f64) as u32
        } else {
            1
        };
        Self::new(mode, samples)
    }

    /// Requests a target mode.
    ///
    /// While steady, a different mode arms a full-length fade. While
    /// already fading only the target changes; progress and remaining
    /// length are left alone. Returns true if a new fade was armed.
    pub fn request(&mut self, mode: NoiseMode) -> bool {
        if self.is_fading() {
            self.target = mode;
            return false;
        }
        if mode == self.current {
            return false;
        }

        self.target = mode;
        self.progress = 0.0;
        self.remaining = self.fade_samples;
        true
    }

    /// Returns true while a fade is in progress.
    #[inline]
    pub fn is_fading(&self) -> bool {
        self.remaining > 0
    }

    /// Returns the `(current, target)` gains for the present progress.
    #[inline]
    pub fn gains(&self) -> (f64, f64) {
        let angle = FRAC_PI_2 * self.progress;
        (angle.cos(), angle.sin())
    }

    /// Blends one sample at the present progress.
    ///
    /// `pink` and `brown` are the two filter outputs for this sample; the
    /// blend reads whichever of them the current and target modes select.
    /// Does not advance the fade, so both channels of a frame share gains.
    #[inline]
    pub fn blend(&self, pink: f64, brown: f64) -> f64 {
        let pick = |mode: NoiseMode| match mode {
            NoiseMode::Pink => pink,
            NoiseMode::Brown => brown,
        };

        if !self.is_fading() {
            return pick(self.current);
        }

        let (old_gain, new_gain) = self.gains();
        old_gain * pick(self.current) + new_gain * pick(self.target)
    }

    /// Advances the fade by one sample.
    ///
    /// Returns true when the fade completes on this step.
    pub fn advance(&mut self) -> bool {
        if !self.is_fading() {
            return false;
        }

        self.progress += (1.0 - self.progress) / self.remaining as f64;
        self.remaining -= 1;

        if self.remaining == 0 {
            self.progress = 1.0;
            self.current = self.target;
            return true;
        }
        false
    }

    /// Mode currently sounding (the fade source while fading).
    pub fn current(&self) -> NoiseMode {
        self.current
    }

    /// Mode being faded towards.
    pub fn target(&self) -> NoiseMode {
        self.target
    }

    /// Fade progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Samples left in the active fade.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Configured fade length in samples.
    pub fn fade_samples(&self) -> u32 {
        self.fade_samples
    }
}
