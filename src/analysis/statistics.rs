//! Output signal statistics.
//!
//! Cheap summary numbers for rendered audio. They are regression checks
//! on level and spectral tilt, not a spectral analysis.

/// Summary of a block of samples.
#[derive(Debug, Clone, Default)]
pub struct OutputStatistics {
    /// Root-mean-square level.
    pub rms: f64,
    /// Mean value (DC offset).
    pub mean: f64,
    /// Largest absolute sample.
    pub peak: f64,
    /// Lag-1 autocorrelation. Near 0 for white noise, near 1 for
    /// strongly low-frequency biased noise.
    pub autocorrelation: f64,
    /// Number of samples analyzed.
    pub sample_size: usize,
}

impl OutputStatistics {
    /// Analyzes a complete buffer.
    pub fn analyze(samples: &[f32]) -> Self {
        let mut acc = StatsAccumulator::new();
        acc.extend(samples);
        acc.finish()
    }
}

/// Streaming accumulator behind [`OutputStatistics`].
///
/// Keeps running sums so arbitrarily long renders can be summarised
/// without holding the audio.
#[derive(Debug, Clone, Default)]
pub struct StatsAccumulator {
    count: usize,
    sum: f64,
    sum_sq: f64,
    peak: f64,
    lag_products: f64,
    first: Option<f64>,
    previous: Option<f64>,
}

impl StatsAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one sample.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        let x = sample as f64;
        if let Some(prev) = self.previous {
            self.lag_products += prev * x;
        } else {
            self.first = Some(x);
        }
        self.previous = Some(x);

        self.count += 1;
        self.sum += x;
        self.sum_sq += x * x;
        self.peak = self.peak.max(x.abs());
    }

    /// Adds a slice of samples.
    pub fn extend(&mut self, samples: &[f32]) {
        for &s in samples {
            self.push(s);
        }
    }

    /// Computes the summary.
    pub fn finish(&self) -> OutputStatistics {
        if self.count == 0 {
            return OutputStatistics::default();
        }

        let n = self.count as f64;
        let mean = self.sum / n;
        let rms = (self.sum_sq / n).sqrt();

        // sum((x_i - m)^2) and sum((x_i - m)(x_{i+1} - m)) from raw sums.
        let centered_sq = self.sum_sq - n * mean * mean;
        let autocorrelation = if self.count < 2 {
            0.0
        } else if centered_sq <= f64::EPSILON {
            // All same value = perfect correlation
            1.0
        } else {
            let first = self.first.unwrap_or(0.0);
            let last = self.previous.unwrap_or(0.0);
            let lag_sum = self.sum - last;
            let lead_sum = self.sum - first;
            let covariance =
                self.lag_products - mean * (lag_sum + lead_sum) + (n - 1.0) * mean * mean;
            covariance / centered_sq
        };

        OutputStatistics {
            rms,
            mean,
            peak: self.peak,
            autocorrelation,
            sample_size: self.count,
        }
    }
}
