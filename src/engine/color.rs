//! Noise colouring filters.
//!
//! Both filters take a white sample in `[-1, 1)` and return a coloured
//! sample. Filter state is per channel.

/// Default brown integrator time constant in seconds.
pub const BROWN_TIME_CONSTANT_S: f64 = 0.02;

/// Output normalisation of the pink filter.
const PINK_NORMALIZATION: f64 = 0.16;

/// Paul Kellet's economy 3-tap pink filter.
#[derive(Debug, Clone, Default)]
pub struct PinkFilter {
    b0: f64,
    b1: f64,
    b2: f64,
}

impl PinkFilter {
    /// Creates a filter with zeroed taps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters one white sample.
    #[inline]
    pub fn process(&mut self, white: f64) -> f64 {
        self.b0 = 0.99765 * self.b0 + white * 0.099_046_0;
        self.b1 = 0.96300 * self.b1 + white * 0.296_516_4;
        self.b2 = 0.57000 * self.b2 + white * 1.052_691_3;
        (self.b0 + self.b1 + self.b2 + white * 0.1848) * PINK_NORMALIZATION
    }

    /// Current tap values.
    pub fn taps(&self) -> [f64; 3] {
        [self.b0, self.b1, self.b2]
    }
}

/// Clamped leaky integrator producing brown noise.
///
/// `decay`, `scale` and `gain` are fixed at construction.
#[derive(Debug, Clone)]
pub struct BrownFilter {
    acc: f64,
    decay: f64,
    scale: f64,
    gain: f64,
}

impl BrownFilter {
    /// Creates an integrator with the default time constant.
    pub fn new(sample_rate: f64) -> Self {
        Self::with_time_constant(sample_rate, BROWN_TIME_CONSTANT_S)
    }

    /// Creates an integrator with a custom time constant in seconds.
    ///
    /// A non-finite or non-positive `tau` falls back to
    /// [`BROWN_TIME_CONSTANT_S`]; a non-positive `sample_rate` to 1 Hz.
    pub fn with_time_constant(sample_rate: f64, tau: f64) -> Self {
        let tau = if tau.is_finite() && tau > 0.0 {
            tau
        } else {
            BROWN_TIME_CONSTANT_S
        };
        let sample_rate = if sample_rate.is_finite() && sample_rate >= 1.0 {
            sample_rate
        } else {
            1.0
        };
        let decay = (-1.0 / (sample_rate * tau)).exp();
        let scale = 1.0 - decay;
        let gain = 0.5 * ((1.0 + decay) / (1.0 - decay)).sqrt();
        Self {
            acc: 0.0,
            decay,
            scale,
            gain,
        }
    }

    /// Filters one white sample.
    #[inline]
    pub fn process(&mut self, white: f64) -> f64 {
        // The clamp bounds the random walk.
        self.acc = (self.decay * self.acc + self.scale * white).clamp(-1.0, 1.0);
        self.acc * self.gain
    }

    /// Current accumulator value.
    pub fn accumulator(&self) -> f64 {
        self.acc
    }

    /// Per-sample decay factor.
    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Output gain restoring unit-ish level.
    pub fn gain(&self) -> f64 {
        self.gain
    }
}
