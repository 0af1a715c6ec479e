//! True-peak estimation via 4x oversampling (spec §4.C.9, §9). The kernel
//! `{0, 0.25, 0.5, 0.75, 1.0, 0.75, 0.5, 0.25}` is a linear interpolator,
//! not a band-limited polyphase design — acceptable for this spec, not for
//! ITU-R BS.1770-4 conformance proper (see design notes). A faithful
//! conformant implementation would substitute a 4x polyphase FIR with
//! ≥ 60 dB alias rejection.

const UPSAMPLE_KERNEL: [f64; 8] = [0.0, 0.25, 0.5, 0.75, 1.0, 0.75, 0.5, 0.25];

#[derive(Debug, Clone)]
pub struct TruePeakDetector {
    delay_line: [f64; 8],
    pos: usize,
    peak: f64,
}

impl Default for TruePeakDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TruePeakDetector {
    pub fn new() -> Self {
        Self { delay_line: [0.0; 8], pos: 0, peak: 0.0 }
    }

    /// Feed one sample, returning the running peak (linear, not dB) after
    /// this sample.
    pub fn process(&mut self, sample: f64) -> f64 {
        self.delay_line[self.pos] = sample;
        self.pos = (self.pos + 1) % self.delay_line.len();

        let mut upsampled = 0.0;
        for (j, &coeff) in UPSAMPLE_KERNEL.iter().enumerate() {
            let idx = (self.pos + j) % self.delay_line.len();
            upsampled += self.delay_line[idx] * coeff;
        }

        let magnitude = upsampled.abs();
        if magnitude > self.peak {
            self.peak = magnitude;
        }
        self.peak
    }

    #[inline]
    pub fn peak_linear(&self) -> f64 {
        self.peak
    }

    pub fn peak_dbfs(&self) -> f64 {
        if self.peak > 1e-10 {
            20.0 * self.peak.log10()
        } else {
            -70.0
        }
    }

    pub fn reset(&mut self) {
        self.delay_line = [0.0; 8];
        self.pos = 0;
        self.peak = 0.0;
    }
}
