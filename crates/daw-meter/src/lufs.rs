//! EBU R128 / ITU-R BS.1770-4 loudness meter (spec §4.C.4-8): momentary,
//! short-term, integrated (gated) and loudness-range measurement, plus
//! true-peak per channel.

use crate::kweighting::KWeightingFilter;
use crate::true_peak::TruePeakDetector;

const SILENCE_FLOOR_LUFS: f64 = -70.0;
const ABSOLUTE_GATE_LUFS: f64 = -70.0;
const RELATIVE_GATE_OFFSET_LU: f64 = -10.0;
const MOMENTARY_BLOCKS: usize = 4; // 400 ms / 100 ms
const SHORT_TERM_BLOCKS: usize = 30; // 3 s / 100 ms

/// A channel's role in EBU R128 weighting (spec §4.C.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    Left,
    Right,
    Center,
    Lfe,
    LeftSurround,
    RightSurround,
}

impl ChannelRole {
    pub fn weight(self) -> f64 {
        match self {
            ChannelRole::Left | ChannelRole::Right | ChannelRole::Center => 1.0,
            ChannelRole::Lfe => 0.0,
            ChannelRole::LeftSurround | ChannelRole::RightSurround => 1.41,
        }
    }

    /// Standard role assignment for a channel index given the total
    /// channel count, following common stereo/5.1 conventions.
    pub fn for_layout(index: usize, total_channels: usize) -> Self {
        match (index, total_channels) {
            (0, _) => ChannelRole::Left,
            (1, n) if n >= 2 => ChannelRole::Right,
            (2, n) if n >= 5 => ChannelRole::Center,
            (3, n) if n >= 5 => ChannelRole::Lfe,
            (4, n) if n >= 5 => ChannelRole::LeftSurround,
            (5, n) if n >= 6 => ChannelRole::RightSurround,
            _ => ChannelRole::Center,
        }
    }
}

fn mean_square_to_lufs(mean_square: f64) -> f64 {
    if mean_square <= 0.0 {
        SILENCE_FLOOR_LUFS
    } else {
        -0.691 + 10.0 * mean_square.log10()
    }
}

/// Fixed-length circular mean over the last N block energies.
#[derive(Debug, Clone)]
struct SlidingBlockMean {
    values: Vec<f64>,
    pos: usize,
    filled: usize,
    sum: f64,
}

impl SlidingBlockMean {
    fn new(len: usize) -> Self {
        Self { values: vec![0.0; len], pos: 0, filled: 0, sum: 0.0 }
    }

    fn push(&mut self, value: f64) -> f64 {
        let old = self.values[self.pos];
        self.sum += value - old;
        self.values[self.pos] = value;
        self.pos = (self.pos + 1) % self.values.len();
        self.filled = (self.filled + 1).min(self.values.len());
        self.sum / self.filled as f64
    }
}

pub struct LufsMeter {
    sample_rate_hz: f64,
    block_size: usize,
    filters: Vec<KWeightingFilter>,
    true_peaks: Vec<TruePeakDetector>,
    weights: Vec<f64>,
    block_sum: f64,
    samples_in_block: usize,
    momentary: SlidingBlockMean,
    short_term: SlidingBlockMean,
    short_term_history: Vec<f64>,
    integrated_blocks: Vec<f64>,
    momentary_lufs: f64,
    short_term_lufs: f64,
    integrated_lufs: f64,
    loudness_range: f64,
    max_true_peak_dbfs: f64,
}

impl LufsMeter {
    pub fn new(sample_rate_hz: f64, channel_roles: &[ChannelRole]) -> Self {
        let n = channel_roles.len();
        Self {
            sample_rate_hz,
            block_size: (sample_rate_hz / 10.0).round() as usize,
            filters: (0..n).map(|_| KWeightingFilter::new(sample_rate_hz)).collect(),
            true_peaks: (0..n).map(|_| TruePeakDetector::new()).collect(),
            weights: channel_roles.iter().map(|r| r.weight()).collect(),
            block_sum: 0.0,
            samples_in_block: 0,
            momentary: SlidingBlockMean::new(MOMENTARY_BLOCKS),
            short_term: SlidingBlockMean::new(SHORT_TERM_BLOCKS),
            short_term_history: Vec::new(),
            integrated_blocks: Vec::new(),
            momentary_lufs: SILENCE_FLOOR_LUFS,
            short_term_lufs: SILENCE_FLOOR_LUFS,
            integrated_lufs: SILENCE_FLOOR_LUFS,
            loudness_range: 0.0,
            max_true_peak_dbfs: SILENCE_FLOOR_LUFS,
        }
    }

    pub fn with_stereo(sample_rate_hz: f64) -> Self {
        Self::new(sample_rate_hz, &[ChannelRole::Left, ChannelRole::Right])
    }

    /// Feed one interleaved-deinterleaved frame: `channels[c][n]`.
    pub fn process(&mut self, channels: &[&[f32]]) {
        let n = channels.len().min(self.filters.len());
        let frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);

        for i in 0..frames {
            let mut weighted_energy = 0.0;
            for ch in 0..n {
                let input = channels[ch][i] as f64;
                let filtered = self.filters[ch].process(input);
                let weighted = filtered * self.weights[ch];
                weighted_energy += weighted * weighted;
                self.true_peaks[ch].process(input);
            }

            self.block_sum += weighted_energy;
            self.samples_in_block += 1;

            if self.samples_in_block >= self.block_size {
                let mean_square = self.block_sum / self.samples_in_block as f64;
                self.finish_block(mean_square);
                self.block_sum = 0.0;
                self.samples_in_block = 0;
            }
        }

        let peak = self.true_peaks.iter().map(|d| d.peak_dbfs()).fold(SILENCE_FLOOR_LUFS, f64::max);
        if peak > self.max_true_peak_dbfs {
            self.max_true_peak_dbfs = peak;
        }
    }

    fn finish_block(&mut self, mean_square: f64) {
        if mean_square <= 0.0 {
            return;
        }
        let block_lufs = mean_square_to_lufs(mean_square);

        let momentary_mean = self.momentary.push(mean_square);
        if momentary_mean > 0.0 {
            self.momentary_lufs = mean_square_to_lufs(momentary_mean);
        }

        let short_term_mean = self.short_term.push(mean_square);
        if short_term_mean > 0.0 {
            self.short_term_lufs = mean_square_to_lufs(short_term_mean);
            self.short_term_history.push(self.short_term_lufs);
        }

        if block_lufs >= ABSOLUTE_GATE_LUFS {
            self.integrated_blocks.push(mean_square);
            self.update_integrated();
        }

        self.update_loudness_range();
    }

    fn update_integrated(&mut self) {
        if self.integrated_blocks.is_empty() {
            return;
        }
        let ungated_mean: f64 =
            self.integrated_blocks.iter().sum::<f64>() / self.integrated_blocks.len() as f64;
        let ungated_lufs = mean_square_to_lufs(ungated_mean);
        let relative_threshold = ungated_lufs + RELATIVE_GATE_OFFSET_LU;

        let gated: Vec<f64> = self
            .integrated_blocks
            .iter()
            .copied()
            .filter(|&block| mean_square_to_lufs(block) >= relative_threshold)
            .collect();

        if !gated.is_empty() {
            let gated_mean = gated.iter().sum::<f64>() / gated.len() as f64;
            self.integrated_lufs = mean_square_to_lufs(gated_mean);
        } else {
            self.integrated_lufs = ungated_lufs;
        }
    }

    fn update_loudness_range(&mut self) {
        if self.short_term_history.len() < 10 {
            return;
        }
        let mut sorted = self.short_term_history.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n = sorted.len();
        let p10 = sorted[(n as f64 * 0.10) as usize];
        let p95 = sorted[((n as f64 * 0.95) as usize).min(n - 1)];
        self.loudness_range = p95 - p10;
    }

    pub fn momentary(&self) -> f64 {
        self.momentary_lufs
    }

    pub fn short_term(&self) -> f64 {
        self.short_term_lufs
    }

    pub fn integrated(&self) -> f64 {
        self.integrated_lufs
    }

    pub fn loudness_range(&self) -> f64 {
        self.loudness_range
    }

    pub fn true_peak_dbfs(&self) -> f64 {
        self.max_true_peak_dbfs
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
        for detector in &mut self.true_peaks {
            detector.reset();
        }
        self.block_sum = 0.0;
        self.samples_in_block = 0;
        self.momentary = SlidingBlockMean::new(MOMENTARY_BLOCKS);
        self.short_term = SlidingBlockMean::new(SHORT_TERM_BLOCKS);
        self.short_term_history.clear();
        self.integrated_blocks.clear();
        self.momentary_lufs = SILENCE_FLOOR_LUFS;
        self.short_term_lufs = SILENCE_FLOOR_LUFS;
        self.integrated_lufs = SILENCE_FLOOR_LUFS;
        self.loudness_range = 0.0;
        self.max_true_peak_dbfs = SILENCE_FLOOR_LUFS;
    }
}
