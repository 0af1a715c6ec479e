//! End-to-end render pipeline tests: a track bus feeding the master
//! through `BusManager`, rendered via `daw-render`'s job pipeline and
//! queue, mirroring the teacher's `rf-engine/tests/integration_test.rs`
//! whole-graph style rather than testing modules in isolation.

use daw_mixer::{BusKind, BusManager, RouteDestination, TrackSource};
use daw_render::{RenderJobConfig, RenderMetadata, RenderQueue};
use std::path::PathBuf;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

const SAMPLE_RATE: f64 = 48_000.0;

/// Deterministic xorshift32 PRNG, used only to synthesize test signals —
/// no external RNG crate is warranted for a fixed seed in a test fixture.
struct XorShift32(u32);

impl XorShift32 {
    fn next_f64(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        (x as f64 / u32::MAX as f64) * 2.0 - 1.0
    }
}

/// Voss-McCartney pink noise approximation: sums several octaves of
/// white noise, each updated at half the rate of the one before it.
struct PinkNoiseSource {
    rng: XorShift32,
    octaves: Vec<f64>,
    counter: u64,
}

impl PinkNoiseSource {
    fn new(seed: u32) -> Self {
        Self { rng: XorShift32(seed), octaves: vec![0.0; 8], counter: 0 }
    }

    fn next_sample(&mut self) -> f64 {
        for (i, octave) in self.octaves.iter_mut().enumerate() {
            if self.counter % (1 << i) == 0 {
                *octave = self.rng.next_f64();
            }
        }
        self.counter += 1;
        self.octaves.iter().sum::<f64>() / self.octaves.len() as f64
    }
}

impl TrackSource for PinkNoiseSource {
    fn pull(&mut self, _block_start_samples: u64, n_frames: usize, out_buf: &mut daw_core::AudioBuffer) -> usize {
        out_buf.set_frames(n_frames);
        for i in 0..n_frames {
            let sample = self.next_sample() as f32 * 0.3;
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

struct SineSource {
    phase: f64,
    freq_hz: f64,
}

impl TrackSource for SineSource {
    fn pull(&mut self, _block_start_samples: u64, n_frames: usize, out_buf: &mut daw_core::AudioBuffer) -> usize {
        out_buf.set_frames(n_frames);
        for i in 0..n_frames {
            let sample = (self.phase * std::f64::consts::TAU).sin() as f32 * 0.5;
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

fn build_single_track_manager(source: Box<dyn TrackSource>) -> Arc<Mutex<BusManager>> {
    let mut manager = BusManager::new(2, 8192);
    let master = manager.master_id();
    let track = manager.create_bus(BusKind::Aux, "bed");
    manager.set_track_source(track, source);
    manager.add_send(track, RouteDestination::Bus(master), 1.0, 0.0, false).unwrap();
    Arc::new(Mutex::new(manager))
}

fn default_job_config(output_path: PathBuf, end_sample: u64, target_lufs: Option<f64>) -> RenderJobConfig {
    RenderJobConfig {
        output_path,
        format: daw_fileio_format(),
        start_sample: 0,
        end_sample,
        output_sample_rate: 48_000,
        channel_count: 2,
        chunk_frames: 1024,
        target_lufs,
        normalize_peak_dbfs: None,
        max_true_peak_dbfs: Some(-1.0),
        resample_quality: 5,
        memory_limit_mb: Some(1024),
        metadata: RenderMetadata::default(),
    }
}

fn daw_fileio_format() -> daw_fileio::AudioFormat {
    daw_fileio::AudioFormat::WavPcm24
}

#[test]
fn lufs_normalization_hits_target_within_tolerance() {
    let manager = build_single_track_manager(Box::new(PinkNoiseSource::new(0xC0FFEE)));
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("bed.wav");

    let config = default_job_config(output_path, (SAMPLE_RATE as u64) * 10, Some(-23.0));
    let handle = daw_render::RenderJobHandle::new(daw_render::next_job_id());

    let outcome = daw_render::process_render_job(&config, &manager, &handle);
    assert_eq!(outcome.status, daw_render::RenderJobStatus::Done);

    let analysis = outcome.analysis.expect("successful render carries an analysis");
    approx::assert_abs_diff_eq!(analysis.integrated_lufs, -23.0, epsilon = 0.1);
}

#[test]
fn render_cancellation_completes_within_two_seconds() {
    let manager = build_single_track_manager(Box::new(SineSource { phase: 0.0, freq_hz: 440.0 }));
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("long_render.wav");

    let config = default_job_config(output_path, (SAMPLE_RATE as u64) * 30, None);

    let queue = RenderQueue::with_default_workers(manager);
    let handle = queue.submit(config);

    std::thread::sleep(Duration::from_millis(100));
    handle.cancel();

    let started_wait = Instant::now();
    let outcome = handle.wait_for_completion();
    assert!(started_wait.elapsed() < Duration::from_secs(2), "cancellation did not complete within 2 seconds");
    assert_eq!(outcome.status, daw_render::RenderJobStatus::Cancelled);
    assert!(outcome.output_path.is_none());
}
