//! K-weighting filter (ITU-R BS.1770-4 §4.C.1): a highpass at 38 Hz
//! followed by a high-frequency shelf at 1500 Hz, +4 dB. Coefficients are
//! derived from the sample rate via the standard RBJ biquad cookbook
//! formulas rather than pinned to 48 kHz and rescaled, so the response
//! holds at any supported rate.

#[derive(Debug, Clone, Copy)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    fn highpass(sample_rate: f64, freq_hz: f64, q: f64) -> Self {
        let w0 = 2.0 * std::f64::consts::PI * freq_hz / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let b0 = (1.0 + cos_w0) / 2.0;
        let b1 = -(1.0 + cos_w0);
        let b2 = (1.0 + cos_w0) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self { b0: b0 / a0, b1: b1 / a0, b2: b2 / a0, a1: a1 / a0, a2: a2 / a0 }
    }

    fn high_shelf(sample_rate: f64, freq_hz: f64, gain_db: f64, q: f64) -> Self {
        let a = 10f64.powf(gain_db / 40.0);
        let w0 = 2.0 * std::f64::consts::PI * freq_hz / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let sqrt_a = a.sqrt();
        let two_sqrt_a_alpha = 2.0 * sqrt_a * alpha;

        let b0 = a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha);
        let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0);
        let b2 = a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha);
        let a0 = (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha;
        let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cos_w0);
        let a2 = (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha;

        Self { b0: b0 / a0, b1: b1 / a0, b2: b2 / a0, a1: a1 / a0, a2: a2 / a0 }
    }
}

/// Direct-form-II-transposed biquad stage with its own state.
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}

impl BiquadState {
    fn process(&mut self, coeffs: &BiquadCoeffs, input: f64) -> f64 {
        let out = coeffs.b0 * input + self.z1;
        self.z1 = coeffs.b1 * input - coeffs.a1 * out + self.z2;
        self.z2 = coeffs.b2 * input - coeffs.a2 * out;
        out
    }

    fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Two-stage K-weighting filter: highpass then high shelf, per channel.
#[derive(Debug, Clone)]
pub struct KWeightingFilter {
    highpass: BiquadCoeffs,
    shelf: BiquadCoeffs,
    highpass_state: BiquadState,
    shelf_state: BiquadState,
}

impl KWeightingFilter {
    pub fn new(sample_rate_hz: f64) -> Self {
        Self {
            highpass: BiquadCoeffs::highpass(sample_rate_hz, 38.0, 0.5),
            shelf: BiquadCoeffs::high_shelf(sample_rate_hz, 1500.0, 4.0, 0.707),
            highpass_state: BiquadState::default(),
            shelf_state: BiquadState::default(),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let hp_out = self.highpass_state.process(&self.highpass, input);
        self.shelf_state.process(&self.shelf, hp_out)
    }

    pub fn reset(&mut self) {
        self.highpass_state.reset();
        self.shelf_state.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_input_settles_near_zero() {
        let mut filter = KWeightingFilter::new(48_000.0);
        let mut last = 0.0;
        for _ in 0..10_000 {
            last = filter.process(1.0);
        }
        assert!(last.abs() < 0.05, "highpass stage should reject DC, got {last}");
    }

    #[test]
    fn silence_stays_silent() {
        let mut filter = KWeightingFilter::new(44_100.0);
        for _ in 0..100 {
            assert_eq!(filter.process(0.0), 0.0);
        }
    }
}
