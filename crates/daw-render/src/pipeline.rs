//! Master mix render pipeline (spec §4.I): chunked graph rendering,
//! resample/normalize/limit post-processing, file write, and final
//! analysis, grounded structurally on the teacher's `OfflinePipeline`
//! job-execution loop but driving `daw-mixer`'s real bus graph instead
//! of a standalone buffer chain.

use crate::analyze::analyze_render;
use crate::job::{RenderJobConfig, RenderJobHandle, RenderOutcome, RenderProgress};
use crate::limiter::{exceeds_true_peak_ceiling, BrickWallLimiter};
use crate::resample;
use daw_core::DawResult;
use daw_fileio::{AiffWriter, AudioFileWriter, AudioFormat, WavWriter};
use daw_mixer::BusManager;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

const RENDER_PHASE_END: f64 = 0.5;
const POST_PHASE_END: f64 = 0.9;

pub fn process_render_job(config: &RenderJobConfig, manager: &Arc<Mutex<BusManager>>, handle: &RenderJobHandle) -> RenderOutcome {
    let start = Instant::now();

    match run(config, manager, handle) {
        Ok(outcome) => outcome,
        Err(RunError::Cancelled) => {
            log::debug!("render job {} cancelled", handle.id());
            RenderOutcome::cancelled(handle.elapsed())
        }
        Err(RunError::Failed(msg)) => {
            log::warn!("render job {} failed: {msg}", handle.id());
            RenderOutcome::failed(msg, handle.elapsed())
        }
    }
    .with_duration(start.elapsed())
}

enum RunError {
    Cancelled,
    Failed(String),
}

impl From<daw_core::DawError> for RunError {
    fn from(e: daw_core::DawError) -> Self {
        RunError::Failed(e.to_string())
    }
}

impl RenderOutcome {
    fn with_duration(mut self, duration: std::time::Duration) -> Self {
        self.duration = duration;
        self
    }
}

fn run(config: &RenderJobConfig, manager: &Arc<Mutex<BusManager>>, handle: &RenderJobHandle) -> Result<RenderOutcome, RunError> {
    let total_frames = config.region_frames();

    if let Some(limit_mb) = config.exceeds_memory_limit() {
        return Err(RunError::Failed(format!(
            "render region requires {} MB, exceeding the {limit_mb} MB limit",
            config.estimated_buffer_bytes() / (1024 * 1024)
        )));
    }

    let mut channels: Vec<Vec<f64>> = vec![Vec::with_capacity(total_frames as usize); config.channel_count];

    let source_rate = internal_sample_rate(manager);

    render_region(config, manager, handle, &mut channels, total_frames)?;

    if handle.cancel_requested() {
        return Err(RunError::Cancelled);
    }

    post_process(config, handle, &mut channels, source_rate)?;

    handle.set_progress(RenderProgress { fraction: POST_PHASE_END, samples_processed: total_frames, total_samples: total_frames });

    let output_path = write_output(config, &channels)?;

    handle.set_progress(RenderProgress { fraction: 1.0, samples_processed: total_frames, total_samples: total_frames });

    let file_size = std::fs::metadata(&output_path).map(|m| m.len()).unwrap_or(0);
    let analysis = analyze_render(&channels, config.output_sample_rate.max(source_rate as u32) as f64, file_size);

    Ok(RenderOutcome::success(output_path, analysis, std::time::Duration::default()))
}

fn internal_sample_rate(manager: &Arc<Mutex<BusManager>>) -> f64 {
    manager.lock().sample_rate_hz()
}

/// Pulls the master bus output chunk by chunk, reporting progress over
/// the render phase's share of the overall 0-100% scale.
fn render_region(
    config: &RenderJobConfig,
    manager: &Arc<Mutex<BusManager>>,
    handle: &RenderJobHandle,
    channels: &mut [Vec<f64>],
    total_frames: u64,
) -> Result<(), RunError> {
    let chunk_frames = config.chunk_frames.max(1);
    let mut block_start = config.start_sample;
    let end = config.end_sample;

    while block_start < end {
        if handle.cancel_requested() {
            return Err(RunError::Cancelled);
        }

        let n = chunk_frames.min((end - block_start) as usize);
        let master_buf: DawResult<daw_core::AudioBuffer> = {
            let mut guard = manager.lock();
            guard.process_block(block_start, n)
        };
        let master_buf = master_buf?;

        for (ch_idx, out_channel) in channels.iter_mut().enumerate() {
            if ch_idx < master_buf.channel_count() {
                out_channel.extend(master_buf.channel(ch_idx).iter().map(|&s| s as f64));
            } else {
                out_channel.extend(std::iter::repeat(0.0).take(master_buf.frames()));
            }
        }

        block_start += n as u64;
        let processed = block_start - config.start_sample;
        let fraction = (processed as f64 / total_frames.max(1) as f64) * RENDER_PHASE_END;
        handle.set_progress(RenderProgress { fraction, samples_processed: processed, total_samples: total_frames });
    }

    Ok(())
}

/// Resample to the target output rate, then optionally normalize to a
/// target integrated loudness and brick-wall limit any resulting
/// true-peak overshoot (spec §4.I post-processing, in that order).
fn post_process(config: &RenderJobConfig, handle: &RenderJobHandle, channels: &mut Vec<Vec<f64>>, source_rate_hz: f64) -> Result<(), RunError> {
    let source_rate = source_rate_hz.round() as u32;

    if config.output_sample_rate != source_rate {
        *channels = resample::resample_channels(channels, source_rate, config.output_sample_rate, config.resample_quality)
            .map_err(|e| RunError::Failed(e.to_string()))?;
    }

    if handle.cancel_requested() {
        return Err(RunError::Cancelled);
    }

    if let Some(target_peak_dbfs) = config.normalize_peak_dbfs {
        let peak = channels.iter().flat_map(|c| c.iter()).fold(0.0_f64, |acc, &s| acc.max(s.abs()));
        if peak > 0.0 {
            let target_linear = 10f64.powf(target_peak_dbfs / 20.0);
            let gain = target_linear / peak;
            for channel in channels.iter_mut() {
                for sample in channel.iter_mut() {
                    *sample *= gain;
                }
            }
        }
    }

    if let Some(target_lufs) = config.target_lufs {
        let measured = analyze_render(channels, config.output_sample_rate as f64, 0);
        if measured.integrated_lufs.is_finite() && measured.integrated_lufs > -70.0 {
            let gain = 10f64.powf((target_lufs - measured.integrated_lufs) / 20.0);
            for channel in channels.iter_mut() {
                for sample in channel.iter_mut() {
                    *sample *= gain;
                }
            }
        }
    }

    if let Some(ceiling) = config.max_true_peak_dbfs {
        if exceeds_true_peak_ceiling(channels, ceiling) {
            let mut limiter = BrickWallLimiter::new(ceiling, 50.0, config.output_sample_rate as f64);
            for channel in channels.iter_mut() {
                limiter.process(channel);
            }
        }
    }

    Ok(())
}

fn write_output(config: &RenderJobConfig, channels: &[Vec<f64>]) -> Result<std::path::PathBuf, RunError> {
    let num_samples = channels.first().map(|c| c.len()).unwrap_or(0);

    let channel_count = config.channel_count as u32;

    if config.format.is_aiff() {
        let mut writer = AiffWriter::create(&config.output_path, channel_count, config.output_sample_rate, config.format)
            .map_err(|e| RunError::Failed(e.to_string()))?;
        writer.write_samples(channels, num_samples).map_err(|e| RunError::Failed(e.to_string()))?;
        writer.close().map_err(|e| RunError::Failed(e.to_string()))?;
    } else {
        let mut writer = WavWriter::create(&config.output_path, channel_count, config.output_sample_rate, config.format)
            .map_err(|e| RunError::Failed(e.to_string()))?;
        writer.write_samples(channels, num_samples).map_err(|e| RunError::Failed(e.to_string()))?;
        writer.close().map_err(|e| RunError::Failed(e.to_string()))?;
    }

    Ok(config.output_path.clone())
}

/// Picks the writer's natural format default when a caller only wants
/// the file extension for a given format (used by stem rendering).
pub fn default_format_for_extension(ext: &str) -> Option<AudioFormat> {
    match ext.to_ascii_lowercase().as_str() {
        "wav" => Some(AudioFormat::WavPcm24),
        "aiff" | "aif" => Some(AudioFormat::AiffPcm24),
        _ => None,
    }
}
