//! True-peak brick-wall limiter (spec §4.I post-processing step 4):
//! applied when any oversampled peak exceeds `max_true_peak_dbfs`.

use daw_meter::TruePeakDetector;

pub struct BrickWallLimiter {
    threshold_linear: f64,
    release_coeff: f64,
    gain_reduction: f64,
}

impl BrickWallLimiter {
    pub fn new(threshold_dbfs: f64, release_ms: f64, sample_rate_hz: f64) -> Self {
        Self {
            threshold_linear: 10f64.powf(threshold_dbfs / 20.0),
            release_coeff: (-1.0 / (release_ms / 1000.0 * sample_rate_hz)).exp(),
            gain_reduction: 1.0,
        }
    }

    /// Process one channel in place, instant attack / exponential release.
    pub fn process(&mut self, channel: &mut [f64]) {
        for sample in channel.iter_mut() {
            let magnitude = sample.abs();
            let needed_gain = if magnitude > self.threshold_linear && magnitude > 0.0 {
                self.threshold_linear / magnitude
            } else {
                1.0
            };

            self.gain_reduction = if needed_gain < self.gain_reduction {
                needed_gain
            } else {
                needed_gain + (self.gain_reduction - needed_gain) * self.release_coeff
            };

            *sample *= self.gain_reduction;
        }
    }
}

/// Whether any channel's 4x-oversampled true peak exceeds the ceiling.
pub fn exceeds_true_peak_ceiling(channels: &[Vec<f64>], ceiling_dbfs: f64) -> bool {
    channels.iter().any(|samples| {
        let mut detector = TruePeakDetector::new();
        for &s in samples {
            detector.process(s);
        }
        detector.peak_dbfs() > ceiling_dbfs
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_samples_above_threshold() {
        let mut limiter = BrickWallLimiter::new(-3.0, 50.0, 48_000.0);
        let mut channel = vec![1.0, 1.0, 1.0, 1.0];
        limiter.process(&mut channel);
        let threshold = 10f64.powf(-3.0 / 20.0);
        for &s in &channel {
            assert!(s <= threshold + 1e-9);
        }
    }

    #[test]
    fn leaves_quiet_signal_untouched() {
        let mut limiter = BrickWallLimiter::new(-1.0, 50.0, 48_000.0);
        let mut channel = vec![0.1, -0.1, 0.05];
        let before = channel.clone();
        limiter.process(&mut channel);
        for (a, b) in channel.iter().zip(before.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
