//! Whole-graph integration tests: a track routed through a group bus
//! into the master, processed across many blocks, mirroring the
//! teacher's `rf-engine/tests/integration_test.rs` signal-flow checks
//! (stability across blocks, not just single-call unit behavior).

use daw_core::AudioBuffer;
use daw_mixer::{BusKind, BusManager, Effect, RouteDestination, TrackSource};

const SAMPLE_RATE: f64 = 48_000.0;
const BLOCK_SIZE: usize = 256;
const TEST_BLOCKS: usize = 200;

struct SineSource {
    phase: f64,
    freq_hz: f64,
    amplitude: f32,
}

impl TrackSource for SineSource {
    fn pull(&mut self, _block_start_samples: u64, n_frames: usize, out_buf: &mut AudioBuffer) -> usize {
        out_buf.set_frames(n_frames);
        for i in 0..n_frames {
            let sample = (self.phase * std::f64::consts::TAU).sin() as f32 * self.amplitude;
            self.phase = (self.phase + self.freq_hz / SAMPLE_RATE).fract();
            for ch in 0..out_buf.channel_count() {
                out_buf.channel_mut(ch)[i] = sample;
            }
        }
        n_frames
    }

    fn channel_count(&self) -> usize {
        2
    }
}

/// A minimal soft-clip saturator, used here only to exercise the
/// effect chain and PDC resync with a non-zero reported latency.
struct ReportedLatencyEffect {
    latency: usize,
}

impl Effect for ReportedLatencyEffect {
    fn process(&mut self, buffer: &mut AudioBuffer, _block_start_time: u64) {
        for ch in 0..buffer.channel_count() {
            for sample in buffer.channel_mut(ch).iter_mut() {
                *sample = sample.tanh();
            }
        }
    }

    fn latency_samples(&self) -> usize {
        self.latency
    }

    fn name(&self) -> &str {
        "test-saturator"
    }
}

#[test]
fn track_through_group_into_master_stays_finite_and_active() {
    let mut manager = BusManager::new(2, 4096);
    let master = manager.master_id();

    let group = manager.create_bus(BusKind::Group, "drums");
    manager.bus_mut(group).unwrap().set_gain_db(-3.0);
    manager.bus_mut(group).unwrap().effects_mut().push(Box::new(ReportedLatencyEffect { latency: 64 }));
    manager.bus_mut(group).unwrap().resync_pdc();
    manager.add_send(group, RouteDestination::Bus(master), 1.0, 0.0, false).unwrap();

    let track = manager.create_bus(BusKind::Aux, "kick");
    manager.set_track_source(track, Box::new(SineSource { phase: 0.0, freq_hz: 80.0, amplitude: 0.8 }));
    manager.add_send(track, RouteDestination::Bus(group), 1.0, 0.0, false).unwrap();

    let mut block_start = 0u64;
    let mut saw_active_master = false;

    for _ in 0..TEST_BLOCKS {
        let master_out = manager.process_block(block_start, BLOCK_SIZE).unwrap();

        for ch in 0..master_out.channel_count() {
            for &sample in master_out.channel(ch) {
                assert!(!sample.is_nan() && !sample.is_infinite(), "non-finite sample in master output");
                assert!(sample.abs() <= 1.5, "sample escaped the saturator's range: {sample}");
            }
        }

        if manager.bus(master).unwrap().active() {
            saw_active_master = true;
        }

        block_start += BLOCK_SIZE as u64;
    }

    assert!(saw_active_master, "master bus never reported activity despite a driven track");
}

#[test]
fn removing_a_bus_mid_graph_drops_its_route() {
    let mut manager = BusManager::new(2, 4096);
    let master = manager.master_id();
    let group = manager.create_bus(BusKind::Group, "fx-return");
    manager.add_send(group, RouteDestination::Bus(master), 1.0, 0.0, false).unwrap();

    manager.remove_bus(group).unwrap();
    assert!(manager.bus(group).is_none());

    // Graph still renders cleanly with only the master bus left.
    let out = manager.process_block(0, BLOCK_SIZE).unwrap();
    assert_eq!(out.frames(), BLOCK_SIZE);
}
