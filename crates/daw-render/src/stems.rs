//! Per-track stem rendering (spec §4.I "Stems"). Each track renders
//! through the same master-mix pipeline, but under a render-scoped
//! solo override rather than the shared mute/solo state: a snapshot of
//! every track's mute/solo flags is taken, all but the target track
//! are force-muted, the render runs, and the snapshot is restored
//! before the next track starts. Concurrent UI-thread solo changes are
//! unaffected because the override never outlives one stem's render.

use crate::job::{RenderJobConfig, RenderJobHandle, RenderOutcome};
use crate::pipeline::process_render_job;
use daw_core::BusId;
use daw_fileio::{default_variables, process_template, AudioFormat};
use daw_mixer::BusManager;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct StemsJobConfig {
    pub output_dir: PathBuf,
    /// e.g. `"{project}_{track_name}_{date}"`; extension is appended
    /// from `format`.
    pub filename_template: String,
    pub project_name: String,
    pub format: AudioFormat,
    pub start_sample: u64,
    pub end_sample: u64,
    pub output_sample_rate: u32,
    pub channel_count: usize,
    pub chunk_frames: usize,
    pub resample_quality: u8,
    /// Optional per-stem peak normalize target, e.g. `-1.0` dBFS.
    pub normalize_peak_dbfs: Option<f64>,
    pub memory_limit_mb: Option<u32>,
}

struct MuteSnapshot {
    bus_id: BusId,
    muted: bool,
    soloed: bool,
}

fn snapshot_mute_state(manager: &Mutex<BusManager>, track_ids: &[BusId]) -> Vec<MuteSnapshot> {
    let guard = manager.lock();
    track_ids
        .iter()
        .filter_map(|&id| guard.bus(id).map(|b| MuteSnapshot { bus_id: id, muted: b.muted(), soloed: b.soloed() }))
        .collect()
}

fn restore_mute_state(manager: &Mutex<BusManager>, snapshot: &[MuteSnapshot]) {
    let mut guard = manager.lock();
    for entry in snapshot {
        if let Some(bus) = guard.bus_mut(entry.bus_id) {
            bus.set_muted(entry.muted);
            bus.set_soloed(entry.soloed);
        }
    }
    guard.update_solo_arbitration();
}

/// Mutes every track except `target`, without touching `soloed` flags
/// (the override lives purely in `muted`, so it composes cleanly with
/// the snapshot/restore above).
fn isolate_track(manager: &Mutex<BusManager>, track_ids: &[BusId], target: BusId) {
    let mut guard = manager.lock();
    for &id in track_ids {
        if let Some(bus) = guard.bus_mut(id) {
            bus.set_muted(id != target);
        }
    }
    guard.update_solo_arbitration();
}

/// A "track" is not a bus kind (spec §3 only defines Aux/Group/Master/
/// Monitor); it is any bus with a [`daw_mixer::TrackSource`] attached.
fn track_bus_ids(manager: &Mutex<BusManager>) -> Vec<BusId> {
    let guard = manager.lock();
    guard.bus_ids().filter(|&id| guard.has_track_source(id)).collect()
}

/// A timestamp in the same format the original filename templating used
/// for `{timestamp}`/`{date}`, for callers that don't already have one
/// from the transport/session clock.
pub fn render_timestamp_now() -> String {
    chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}

fn stem_output_path(config: &StemsJobConfig, track_name: &str, timestamp: &str) -> PathBuf {
    let variables = default_variables(&config.project_name, track_name, config.format, timestamp);
    let stem = process_template(&config.filename_template, &variables);
    config.output_dir.join(format!("{stem}.{}", config.format.extension()))
}

fn job_config_for_track(config: &StemsJobConfig, track_name: &str, timestamp: &str) -> RenderJobConfig {
    RenderJobConfig {
        output_path: stem_output_path(config, track_name, timestamp),
        format: config.format,
        start_sample: config.start_sample,
        end_sample: config.end_sample,
        output_sample_rate: config.output_sample_rate,
        channel_count: config.channel_count,
        chunk_frames: config.chunk_frames,
        target_lufs: None,
        normalize_peak_dbfs: config.normalize_peak_dbfs,
        max_true_peak_dbfs: None,
        resample_quality: config.resample_quality,
        memory_limit_mb: config.memory_limit_mb,
        metadata: crate::job::RenderMetadata { title: Some(track_name.to_string()), ..Default::default() },
    }
}

/// Renders one file per track bus under `manager`, each with the
/// render-scoped solo override applied and restored around it.
/// Stops early (returning what has rendered so far) if cancellation
/// is requested on `handle` between tracks.
pub fn render_stems(config: &StemsJobConfig, manager: &Arc<Mutex<BusManager>>, handle: &RenderJobHandle, timestamp: Option<&str>) -> Vec<RenderOutcome> {
    let owned_timestamp;
    let timestamp = match timestamp {
        Some(t) => t,
        None => {
            owned_timestamp = render_timestamp_now();
            &owned_timestamp
        }
    };

    let track_ids = track_bus_ids(manager);
    let mut outcomes = Vec::with_capacity(track_ids.len());

    for &track_id in &track_ids {
        if handle.cancel_requested() {
            break;
        }

        let track_name = manager.lock().bus(track_id).map(|b| b.name().to_string()).unwrap_or_else(|| format!("track_{}", track_id.0));

        let snapshot = snapshot_mute_state(manager, &track_ids);
        isolate_track(manager, &track_ids, track_id);

        let job_config = job_config_for_track(config, &track_name, timestamp);
        let outcome = process_render_job(&job_config, manager, handle);

        restore_mute_state(manager, &snapshot);

        outcomes.push(outcome);
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use daw_fileio::AudioFormat;

    fn sample_config() -> StemsJobConfig {
        StemsJobConfig {
            output_dir: PathBuf::from("/tmp/stems"),
            filename_template: "{project}_{track_name}".to_string(),
            project_name: "Session".to_string(),
            format: AudioFormat::WavPcm24,
            start_sample: 0,
            end_sample: 48_000,
            output_sample_rate: 48_000,
            channel_count: 2,
            chunk_frames: 1024,
            resample_quality: 5,
            normalize_peak_dbfs: Some(-1.0),
            memory_limit_mb: Some(1024),
        }
    }

    #[test]
    fn stem_output_path_substitutes_track_name() {
        let config = sample_config();
        let path = stem_output_path(&config, "Guitar", "20260101T000000Z");
        assert_eq!(path, PathBuf::from("/tmp/stems/Session_Guitar.wav"));
    }

    #[test]
    fn no_track_buses_yields_no_stems() {
        let manager = Arc::new(Mutex::new(BusManager::new(2, 4096)));
        let handle = RenderJobHandle::new(1);
        let outcomes = render_stems(&sample_config(), &manager, &handle, Some("20260101T000000Z"));
        assert!(outcomes.is_empty());
    }

    #[test]
    fn render_timestamp_now_is_well_formed() {
        let ts = render_timestamp_now();
        assert_eq!(ts.len(), 16);
        assert!(ts.ends_with('Z'));
    }
}
