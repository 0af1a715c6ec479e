//! Per-block automation scheduler (spec §4.E), run from the audio
//! thread. Reads lanes through a lock-free snapshot published by the
//! recorder (spec §9 "automation lane mutation during playback") and
//! dispatches mapped values to weakly-held targets.

use crate::lane::AutomationLane;
use crate::target::{map_value, TargetRegistration};
use arc_swap::ArcSwap;
use daw_core::ParameterId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A lane behind an atomically-swapped pointer: the recorder publishes a
/// new `Arc<AutomationLane>` at a quiescence point, the engine always
/// reads whatever is currently published without locking.
pub type SharedLane = Arc<ArcSwap<AutomationLane>>;

pub fn new_shared_lane(default_value: f64) -> SharedLane {
    Arc::new(ArcSwap::from_pointee(AutomationLane::new(default_value)))
}

struct ParameterState {
    lane: SharedLane,
    target: TargetRegistration,
    current_value: f64,
    smoothing_ms: Option<f64>,
    manual_override: Option<f64>,
    /// Engine-side playback lock, independent of the lane's own `enabled`
    /// flag (which gates recording/editing, not dispatch).
    read_only: bool,
}

/// Loop region for playback (spec §4.E playback control).
#[derive(Debug, Clone, Copy, Default)]
struct LoopRegion {
    start: u64,
    end: u64,
    enabled: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnginePerfCounters {
    pub parameters_processed: u64,
    pub events_dispatched: u64,
    pub last_block_duration: Duration,
    /// Processing time as a percentage of `reference_block_duration`.
    pub cpu_percent: f64,
}

pub struct AutomationEngine {
    sample_rate_hz: f64,
    parameters: HashMap<ParameterId, ParameterState>,
    playhead_samples: u64,
    rate: f64,
    loop_region: LoopRegion,
    playing: bool,
    reference_block_duration: Duration,
    perf: EnginePerfCounters,
}

impl AutomationEngine {
    pub fn new(sample_rate_hz: f64, reference_block_frames: u64) -> Self {
        Self {
            sample_rate_hz,
            parameters: HashMap::new(),
            playhead_samples: 0,
            rate: 1.0,
            loop_region: LoopRegion::default(),
            playing: false,
            reference_block_duration: Duration::from_secs_f64(reference_block_frames as f64 / sample_rate_hz),
            perf: EnginePerfCounters::default(),
        }
    }

    /// Register (or replace) the lane and dispatch target for a parameter.
    /// The engine never holds strong ownership of `target.host`.
    pub fn register_target(&mut self, parameter_id: ParameterId, lane: SharedLane, target: TargetRegistration, smoothing_ms: Option<f64>) {
        self.parameters.insert(
            parameter_id,
            ParameterState {
                lane,
                target,
                current_value: 0.0,
                smoothing_ms,
                manual_override: None,
                read_only: false,
            },
        );
    }

    pub fn unregister(&mut self, parameter_id: &ParameterId) {
        self.parameters.remove(parameter_id);
    }

    pub fn set_override(&mut self, parameter_id: &ParameterId, value: Option<f64>) {
        if let Some(state) = self.parameters.get_mut(parameter_id) {
            state.manual_override = value;
        }
    }

    pub fn set_read_only(&mut self, parameter_id: &ParameterId, read_only: bool) {
        if let Some(state) = self.parameters.get_mut(parameter_id) {
            state.read_only = read_only;
        }
    }

    pub fn current_value(&self, parameter_id: &ParameterId) -> Option<f64> {
        self.parameters.get(parameter_id).map(|s| s.current_value)
    }

    // ---- playback control (spec §4.E) ----

    pub fn start(&mut self) {
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn set_position(&mut self, samples: u64) {
        self.playhead_samples = samples;
    }

    pub fn position(&self) -> u64 {
        self.playhead_samples
    }

    pub fn set_rate(&mut self, factor: f64) {
        self.rate = factor;
    }

    pub fn set_loop(&mut self, start: u64, end: u64, enabled: bool) {
        self.loop_region = LoopRegion { start, end, enabled };
    }

    /// Process one block of `n_frames` at the current playhead, dispatch
    /// mapped values to every registered target, then advance the
    /// playhead (honoring rate and loop wrap).
    pub fn process_block(&mut self, n_frames: u64) {
        let started = std::time::Instant::now();
        let position = self.playhead_samples;
        self.perf.parameters_processed = 0;
        self.perf.events_dispatched = 0;

        for state in self.parameters.values_mut() {
            self.perf.parameters_processed += 1;

            let target_value = if let Some(v) = state.manual_override {
                v
            } else {
                let lane = state.lane.load();
                if !lane.enabled() || state.read_only {
                    continue;
                }
                lane.value_at(position)
            };

            if let Some(smoothing_ms) = state.smoothing_ms {
                let alpha = 1.0 - (-(n_frames as f64) / (smoothing_ms / 1000.0 * self.sample_rate_hz)).exp();
                state.current_value += alpha * (target_value - state.current_value);
            } else {
                state.current_value = target_value;
            }

            if let Some(host) = state.target.host.upgrade() {
                let mapped = map_value(state.target.kind, state.current_value);
                host.apply(state.target.parameter_index, mapped);
                self.perf.events_dispatched += 1;
            }
        }

        if self.playing {
            self.advance_playhead(n_frames);
        }

        self.perf.last_block_duration = started.elapsed();
        self.perf.cpu_percent = if self.reference_block_duration.as_secs_f64() > 0.0 {
            100.0 * self.perf.last_block_duration.as_secs_f64() / self.reference_block_duration.as_secs_f64()
        } else {
            0.0
        };
    }

    fn advance_playhead(&mut self, n_frames: u64) {
        let advance = (n_frames as f64 * self.rate).round() as i64;
        let new_position = (self.playhead_samples as i64 + advance).max(0) as u64;

        self.playhead_samples = if self.loop_region.enabled && self.loop_region.end > self.loop_region.start {
            let span = self.loop_region.end - self.loop_region.start;
            if new_position >= self.loop_region.start {
                self.loop_region.start + (new_position - self.loop_region.start) % span
            } else {
                new_position
            }
        } else {
            new_position
        };
    }

    pub fn perf_counters(&self) -> EnginePerfCounters {
        self.perf
    }
}
