//! RMS meter over a sliding window, maintained as an O(1)-per-sample
//! running sum of squares in a circular buffer (spec §4.C: RMS meter).

const DEFAULT_WINDOW_MS: f64 = 300.0;

#[derive(Debug, Clone)]
pub struct RmsMeter {
    squares: Vec<f64>,
    write_pos: usize,
    sum_squares: f64,
    filled: usize,
}

impl RmsMeter {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_window(sample_rate, DEFAULT_WINDOW_MS)
    }

    pub fn with_window(sample_rate: f64, window_ms: f64) -> Self {
        let window_samples = ((window_ms / 1000.0) * sample_rate).round().max(1.0) as usize;
        Self {
            squares: vec![0.0; window_samples],
            write_pos: 0,
            sum_squares: 0.0,
            filled: 0,
        }
    }

    pub fn process(&mut self, sample: f32) {
        let squared = (sample as f64) * (sample as f64);
        let old = self.squares[self.write_pos];
        self.sum_squares += squared - old;
        self.squares[self.write_pos] = squared;
        self.write_pos = (self.write_pos + 1) % self.squares.len();
        self.filled = (self.filled + 1).min(self.squares.len());
    }

    pub fn process_block(&mut self, samples: &[f32]) {
        for &s in samples {
            self.process(s);
        }
    }

    /// Current RMS value over the window filled so far (not yet the full
    /// window length until `filled == window length`).
    pub fn rms(&self) -> f64 {
        if self.filled == 0 {
            return 0.0;
        }
        (self.sum_squares / self.filled as f64).max(0.0).sqrt()
    }

    pub fn reset(&mut self) {
        self.squares.fill(0.0);
        self.write_pos = 0;
        self.sum_squares = 0.0;
        self.filled = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_amplitude_sine_approaches_expected_rms() {
        let sample_rate = 44_100.0;
        let mut meter = RmsMeter::new(sample_rate);
        for n in 0..10_000 {
            let t = n as f64 / sample_rate;
            let s = (0.5 * (2.0 * std::f64::consts::PI * 1000.0 * t).sin()) as f32;
            meter.process(s);
        }
        let expected = 0.5 / std::f64::consts::SQRT_2;
        assert!((meter.rms() - expected).abs() < 0.005, "got {}", meter.rms());
    }

    #[test]
    fn silence_gives_zero_rms() {
        let mut meter = RmsMeter::new(48_000.0);
        meter.process_block(&[0.0; 100]);
        assert_eq!(meter.rms(), 0.0);
    }
}
