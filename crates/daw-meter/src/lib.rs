//! daw-meter: peak, RMS, stereo correlation, and EBU R128 / ITU-R
//! BS.1770-4 loudness metering, published lock-free via atomic-swapped
//! snapshots for any number of reader threads (spec §4.C, §5).

mod correlation;
mod kweighting;
mod lufs;
mod peak;
mod rms;
mod snapshot;
mod true_peak;

pub use correlation::CorrelationMeter;
pub use kweighting::KWeightingFilter;
pub use lufs::{ChannelRole, LufsMeter};
pub use peak::PeakMeter;
pub use rms::RmsMeter;
pub use snapshot::{MeterSnapshot, SnapshotPublisher, SnapshotReader};
pub use true_peak::TruePeakDetector;

/// Composite meter bank for one stereo bus: peak + RMS per channel,
/// correlation across the pair, and full LUFS/true-peak measurement.
/// Owns the publisher side of the lock-free snapshot.
pub struct StreamMeter {
    peak_l: PeakMeter,
    peak_r: PeakMeter,
    rms_l: RmsMeter,
    rms_r: RmsMeter,
    correlation: CorrelationMeter,
    lufs: LufsMeter,
    publisher: SnapshotPublisher,
}

impl StreamMeter {
    pub fn new(sample_rate_hz: f64) -> Self {
        Self {
            peak_l: PeakMeter::new(sample_rate_hz),
            peak_r: PeakMeter::new(sample_rate_hz),
            rms_l: RmsMeter::new(sample_rate_hz),
            rms_r: RmsMeter::new(sample_rate_hz),
            correlation: CorrelationMeter::new(sample_rate_hz),
            lufs: LufsMeter::with_stereo(sample_rate_hz),
            publisher: SnapshotPublisher::new(),
        }
    }

    /// Audio thread: process one block and publish the resulting
    /// snapshot. `left`/`right` share length.
    pub fn process_and_publish(&mut self, left: &[f32], right: &[f32]) {
        self.peak_l.process_block(left);
        self.peak_r.process_block(right);
        self.rms_l.process_block(left);
        self.rms_r.process_block(right);
        self.correlation.process_block(left, right);
        self.lufs.process(&[left, right]);

        let snapshot = MeterSnapshot {
            peak: self.peak_l.current().max(self.peak_r.current()),
            peak_hold: self.peak_l.held_peak().max(self.peak_r.held_peak()),
            clipped: self.peak_l.clipped() || self.peak_r.clipped(),
            rms: self.rms_l.rms().max(self.rms_r.rms()),
            correlation: self.correlation.correlation(),
            momentary_lufs: self.lufs.momentary(),
            short_term_lufs: self.lufs.short_term(),
            integrated_lufs: self.lufs.integrated(),
            loudness_range: self.lufs.loudness_range(),
            true_peak_dbfs: self.lufs.true_peak_dbfs(),
        };
        self.publisher.publish(snapshot);
    }

    pub fn reader(&self) -> SnapshotReader {
        self.publisher.reader()
    }

    pub fn reset(&mut self) {
        self.peak_l.reset();
        self.peak_r.reset();
        self.rms_l.reset();
        self.rms_r.reset();
        self.correlation.reset();
        self.lufs.reset();
        self.publisher.publish(MeterSnapshot::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_and_publish_is_visible_to_readers() {
        let mut meter = StreamMeter::new(48_000.0);
        let reader = meter.reader();
        let block = vec![0.5f32; 512];
        meter.process_and_publish(&block, &block);
        let snap = reader.read();
        assert!(snap.peak > 0.0);
        assert!((snap.correlation - 1.0).abs() < 1e-6);
    }
}
