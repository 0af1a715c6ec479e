//! Post-render loudness and peak analysis (spec §4.I step 6), built on
//! the shared `LufsMeter`/`TruePeakDetector` the real-time meter path
//! also uses, so offline numbers agree with what the meter showed live.

use crate::job::RenderAnalysis;
use daw_meter::{ChannelRole, LufsMeter, TruePeakDetector};

const CLIP_THRESHOLD_LINEAR: f64 = 1.0;
const ANALYSIS_CHUNK_FRAMES: usize = 4096;

/// Walks the fully rendered, post-processed buffer once, feeding it
/// through a fresh `LufsMeter` in chunks and tracking the running
/// maxima of momentary/short-term loudness alongside true-peak,
/// dynamic range, and clipping detection.
pub fn analyze_render(channels: &[Vec<f64>], sample_rate_hz: f64, file_size_bytes: u64) -> RenderAnalysis {
    if channels.is_empty() || channels[0].is_empty() {
        return RenderAnalysis::default();
    }

    let roles: Vec<ChannelRole> = (0..channels.len()).map(|i| ChannelRole::for_layout(i, channels.len())).collect();
    let mut meter = LufsMeter::new(sample_rate_hz, &roles);
    // One detector per channel: true peak interpolation depends on each
    // channel's own sample history, so a single shared detector fed
    // channel-by-channel would corrupt that history at every boundary.
    let mut true_peaks: Vec<TruePeakDetector> = (0..channels.len()).map(|_| TruePeakDetector::new()).collect();

    let total_frames = channels[0].len();
    let mut momentary_max = f64::NEG_INFINITY;
    let mut short_term_max = f64::NEG_INFINITY;
    let mut sum_squares = 0.0_f64;
    let mut sample_count = 0_u64;
    let mut peak_abs = 0.0_f64;
    let mut clipping_positions = Vec::new();
    let mut intersample_peak_count = 0_u64;
    let mut overall_true_peak_dbfs = -70.0_f64;

    let mut scratch: Vec<Vec<f32>> = vec![Vec::with_capacity(ANALYSIS_CHUNK_FRAMES); channels.len()];

    let mut start = 0;
    while start < total_frames {
        let end = (start + ANALYSIS_CHUNK_FRAMES).min(total_frames);

        for (ch_idx, channel) in channels.iter().enumerate() {
            scratch[ch_idx].clear();
            for &s in &channel[start..end] {
                scratch[ch_idx].push(s as f32);
            }
        }

        let refs: Vec<&[f32]> = scratch.iter().map(|c| c.as_slice()).collect();
        meter.process(&refs);

        momentary_max = momentary_max.max(meter.momentary());
        short_term_max = short_term_max.max(meter.short_term());

        for frame in start..end {
            let mut frame_clips = false;
            let mut frame_has_intersample_peak = false;

            for (ch_idx, channel) in channels.iter().enumerate() {
                let s = channel[frame];
                let abs = s.abs();
                peak_abs = peak_abs.max(abs);
                sum_squares += s * s;
                sample_count += 1;
                frame_clips |= abs >= CLIP_THRESHOLD_LINEAR;

                let tp = true_peaks[ch_idx].process(s);
                if tp > CLIP_THRESHOLD_LINEAR {
                    frame_has_intersample_peak = true;
                }
            }

            if frame_clips {
                clipping_positions.push(frame as u64);
            }
            if frame_has_intersample_peak {
                intersample_peak_count += 1;
            }
        }

        start = end;
    }

    for detector in &true_peaks {
        overall_true_peak_dbfs = overall_true_peak_dbfs.max(detector.peak_dbfs());
    }

    let rms = if sample_count > 0 { (sum_squares / sample_count as f64).sqrt() } else { 0.0 };
    let peak_dbfs = if peak_abs > 0.0 { 20.0 * peak_abs.log10() } else { -70.0 };
    let rms_dbfs = if rms > 0.0 { 20.0 * rms.log10() } else { -70.0 };

    RenderAnalysis {
        integrated_lufs: meter.integrated(),
        momentary_max_lufs: if momentary_max.is_finite() { momentary_max } else { -70.0 },
        short_term_max_lufs: if short_term_max.is_finite() { short_term_max } else { -70.0 },
        true_peak_dbfs: overall_true_peak_dbfs,
        loudness_range: meter.loudness_range(),
        dynamic_range_db: peak_dbfs - rms_dbfs,
        intersample_peak_count,
        clipping_positions,
        file_size_bytes,
        duration_secs: total_frames as f64 / sample_rate_hz,
    }
}
