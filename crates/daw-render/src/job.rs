//! Render job definitions: config, lifecycle status, progress tracking,
//! and the shared handle a caller polls (spec §4.I), grounded
//! structurally on the teacher's `OfflineJob`/`JobProgress`/`JobResult`.

use daw_fileio::AudioFormat;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type RenderJobId = u64;

static JOB_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

pub fn next_job_id() -> RenderJobId {
    JOB_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Default)]
pub struct RenderMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<u32>,
    pub isrc: Option<String>,
    pub custom_tags: HashMap<String, String>,
}

/// Immutable render job configuration (spec §4.I "Materialize the target").
#[derive(Debug, Clone)]
pub struct RenderJobConfig {
    pub output_path: PathBuf,
    pub format: AudioFormat,
    /// Region `[start, end)` in samples at the internal engine sample rate.
    pub start_sample: u64,
    pub end_sample: u64,
    pub output_sample_rate: u32,
    pub channel_count: usize,
    pub chunk_frames: usize,
    /// `None` disables LUFS normalization.
    pub target_lufs: Option<f64>,
    /// Scales the whole buffer so its sample peak lands at this level,
    /// applied before loudness normalization. Used by stem rendering's
    /// optional per-stem peak normalize; `None` for the master mix.
    pub normalize_peak_dbfs: Option<f64>,
    pub max_true_peak_dbfs: Option<f64>,
    /// Resampling quality, 1 (fast) – 10 (best).
    pub resample_quality: u8,
    /// Upper bound on the render's working-buffer allocation, in
    /// megabytes; `None` disables the check. Guards against a
    /// misconfigured region (e.g. an unbounded end sample) allocating
    /// an unreasonable amount of memory before any audio is pulled.
    pub memory_limit_mb: Option<u32>,
    pub metadata: RenderMetadata,
}

impl RenderJobConfig {
    pub fn region_frames(&self) -> u64 {
        self.end_sample.saturating_sub(self.start_sample)
    }

    /// Estimated size of the `f64`-per-channel working buffers the render
    /// pipeline accumulates the whole region into before post-processing.
    pub fn estimated_buffer_bytes(&self) -> u64 {
        self.region_frames() * self.channel_count as u64 * std::mem::size_of::<f64>() as u64
    }

    /// `Some(limit_mb)` if `memory_limit_mb` is set and the region's
    /// estimated buffer size would exceed it.
    pub fn exceeds_memory_limit(&self) -> Option<u32> {
        let limit_mb = self.memory_limit_mb?;
        let limit_bytes = (limit_mb as u64) * 1024 * 1024;
        (self.estimated_buffer_bytes() > limit_bytes).then_some(limit_mb)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderJobStatus {
    Queued,
    Running,
    Done,
    Cancelled,
    Failed,
}

const STATUS_QUEUED: u8 = 0;
const STATUS_RUNNING: u8 = 1;
const STATUS_DONE: u8 = 2;
const STATUS_CANCELLED: u8 = 3;
const STATUS_FAILED: u8 = 4;

fn status_from_u8(v: u8) -> RenderJobStatus {
    match v {
        STATUS_RUNNING => RenderJobStatus::Running,
        STATUS_DONE => RenderJobStatus::Done,
        STATUS_CANCELLED => RenderJobStatus::Cancelled,
        STATUS_FAILED => RenderJobStatus::Failed,
        _ => RenderJobStatus::Queued,
    }
}

fn status_to_u8(status: RenderJobStatus) -> u8 {
    match status {
        RenderJobStatus::Queued => STATUS_QUEUED,
        RenderJobStatus::Running => STATUS_RUNNING,
        RenderJobStatus::Done => STATUS_DONE,
        RenderJobStatus::Cancelled => STATUS_CANCELLED,
        RenderJobStatus::Failed => STATUS_FAILED,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderProgress {
    /// 0.0 - 1.0, spanning render (0-50%), post-processing (50-90%), write (90-100%).
    pub fraction: f64,
    pub samples_processed: u64,
    pub total_samples: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RenderAnalysis {
    pub integrated_lufs: f64,
    pub momentary_max_lufs: f64,
    pub short_term_max_lufs: f64,
    pub true_peak_dbfs: f64,
    pub loudness_range: f64,
    pub dynamic_range_db: f64,
    pub intersample_peak_count: u64,
    pub clipping_positions: Vec<u64>,
    pub file_size_bytes: u64,
    pub duration_secs: f64,
}

#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub status: RenderJobStatus,
    pub output_path: Option<PathBuf>,
    pub analysis: Option<RenderAnalysis>,
    pub error: Option<String>,
    pub duration: Duration,
}

impl RenderOutcome {
    pub fn success(output_path: PathBuf, analysis: RenderAnalysis, duration: Duration) -> Self {
        Self { status: RenderJobStatus::Done, output_path: Some(output_path), analysis: Some(analysis), error: None, duration }
    }

    pub fn cancelled(duration: Duration) -> Self {
        Self { status: RenderJobStatus::Cancelled, output_path: None, analysis: None, error: None, duration }
    }

    pub fn failed(error: String, duration: Duration) -> Self {
        Self { status: RenderJobStatus::Failed, output_path: None, analysis: None, error: Some(error), duration }
    }
}

/// Shared handle a caller polls for progress/completion and uses to
/// request cooperative cancellation (spec §5 "Cancellation").
#[derive(Clone)]
pub struct RenderJobHandle {
    id: RenderJobId,
    status: Arc<AtomicU8>,
    cancel_requested: Arc<AtomicBool>,
    progress: Arc<Mutex<RenderProgress>>,
    outcome: Arc<Mutex<Option<RenderOutcome>>>,
    started_at: Arc<Mutex<Option<Instant>>>,
}

impl RenderJobHandle {
    pub fn new(id: RenderJobId) -> Self {
        Self {
            id,
            status: Arc::new(AtomicU8::new(STATUS_QUEUED)),
            cancel_requested: Arc::new(AtomicBool::new(false)),
            progress: Arc::new(Mutex::new(RenderProgress::default())),
            outcome: Arc::new(Mutex::new(None)),
            started_at: Arc::new(Mutex::new(None)),
        }
    }

    pub fn id(&self) -> RenderJobId {
        self.id
    }

    pub fn status(&self) -> RenderJobStatus {
        status_from_u8(self.status.load(Ordering::Acquire))
    }

    pub(crate) fn set_status(&self, status: RenderJobStatus) {
        self.status.store(status_to_u8(status), Ordering::Release);
    }

    pub fn progress(&self) -> RenderProgress {
        *self.progress.lock()
    }

    pub(crate) fn set_progress(&self, progress: RenderProgress) {
        *self.progress.lock() = progress;
    }

    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::Relaxed);
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_started(&self) {
        *self.started_at.lock() = Some(Instant::now());
        self.set_status(RenderJobStatus::Running);
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started_at.lock().map(|t| t.elapsed()).unwrap_or_default()
    }

    pub(crate) fn finish(&self, outcome: RenderOutcome) {
        self.set_status(outcome.status);
        *self.outcome.lock() = Some(outcome);
    }

    pub fn outcome(&self) -> Option<RenderOutcome> {
        self.outcome.lock().clone()
    }

    /// Blocks the calling thread until the job reaches a terminal state.
    pub fn wait_for_completion(&self) -> RenderOutcome {
        loop {
            if let Some(outcome) = self.outcome() {
                return outcome;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for_region(start_sample: u64, end_sample: u64, channel_count: usize, memory_limit_mb: Option<u32>) -> RenderJobConfig {
        RenderJobConfig {
            output_path: PathBuf::from("/tmp/out.wav"),
            format: AudioFormat::WavPcm24,
            start_sample,
            end_sample,
            output_sample_rate: 48_000,
            channel_count,
            chunk_frames: 1024,
            target_lufs: None,
            normalize_peak_dbfs: None,
            max_true_peak_dbfs: None,
            resample_quality: 5,
            memory_limit_mb,
            metadata: RenderMetadata::default(),
        }
    }

    #[test]
    fn no_limit_never_trips() {
        let config = config_for_region(0, 48_000 * 3600, 2, None);
        assert!(config.exceeds_memory_limit().is_none());
    }

    #[test]
    fn small_region_stays_under_limit() {
        let config = config_for_region(0, 48_000, 2, Some(1024));
        assert!(config.exceeds_memory_limit().is_none());
    }

    #[test]
    fn oversized_region_trips_the_limit() {
        // 2 channels * 8 bytes/f64 * region_frames must exceed 1 MB.
        let frames_for_2mb = (2 * 1024 * 1024) / (2 * std::mem::size_of::<f64>()) as u64;
        let config = config_for_region(0, frames_for_2mb, 2, Some(1));
        assert_eq!(config.exceeds_memory_limit(), Some(1));
    }
}
