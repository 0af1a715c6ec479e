//! The automation recorder (spec §4.F, §5): converts MIDI/hardware/direct
//! parameter events into lane writes on a dedicated processor thread,
//! publishing each lane update atomically for the engine to pick up at
//! its next read (spec §9 shadow-lane strategy).

use crate::curve::CurveType;
use crate::engine::SharedLane;
use crate::lane::AutomationLane;
use daw_core::ParameterId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Armed,
    Recording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingMode {
    Latch,
    Touch,
    Write,
    Trim,
    Read,
}

#[derive(Debug, Clone)]
pub enum IncomingEvent {
    MidiCc { channel: u8, cc: u8, value: u8, time_samples: u64 },
    Aftertouch { channel: u8, value: u8, time_samples: u64 },
    PitchBend { channel: u8, value: i16, time_samples: u64 },
    ParameterChange { parameter_id: ParameterId, normalized_value: f64, time_samples: u64 },
    TouchStart { parameter_id: ParameterId },
    TouchEnd { parameter_id: ParameterId },
}

/// A MIDI-source-to-parameter binding with deadzone/sensitivity/inversion
/// shaping (spec §4.F event pipeline step 1).
#[derive(Debug, Clone)]
pub struct MappingEntry {
    pub parameter_id: ParameterId,
    pub deadzone: f64,
    pub sensitivity: f64,
    pub inverted: bool,
    pub range: (f64, f64),
}

impl MappingEntry {
    fn shape(&self, raw_normalized: f64) -> Option<f64> {
        let mut v = raw_normalized;
        if v.abs() < self.deadzone {
            return None;
        }
        v *= self.sensitivity;
        if self.inverted {
            v = 1.0 - v;
        }
        let (lo, hi) = self.range;
        Some((lo + v.clamp(0.0, 1.0) * (hi - lo)).clamp(0.0, 1.0))
    }
}

#[derive(Default)]
struct MappingTable {
    cc: HashMap<(u8, u8), MappingEntry>,
    aftertouch: HashMap<u8, MappingEntry>,
    pitch_bend: HashMap<u8, MappingEntry>,
}

struct RecorderInner {
    lanes: HashMap<ParameterId, SharedLane>,
    touched: HashSet<ParameterId>,
    last_recorded_value: HashMap<ParameterId, f64>,
    last_recorded_time: HashMap<ParameterId, u64>,
    mapping: MappingTable,
}

fn trim_proximity_samples(recording_resolution: u64) -> u64 {
    4 * recording_resolution
}

/// Configuration knobs that don't change per event (spec §4.F step 3).
#[derive(Debug, Clone, Copy)]
pub struct RecorderConfig {
    pub punch_in: Option<u64>,
    pub punch_out: Option<u64>,
    pub min_change_threshold: f64,
    pub recording_resolution: u64,
    pub auto_thin: bool,
    pub thin_tolerance: f64,
    pub quantize_grid: Option<u64>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            punch_in: None,
            punch_out: None,
            min_change_threshold: 0.001,
            recording_resolution: 64,
            auto_thin: false,
            thin_tolerance: 0.002,
            quantize_grid: None,
        }
    }
}

pub struct AutomationRecorder {
    state: Arc<AtomicU8>,
    mode: Arc<AtomicU8>,
    config: Arc<Mutex<RecorderConfig>>,
    inner: Arc<Mutex<RecorderInner>>,
    sender: crossbeam_channel::Sender<IncomingEvent>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

const STATE_IDLE: u8 = 0;
const STATE_ARMED: u8 = 1;
const STATE_RECORDING: u8 = 2;

const MODE_LATCH: u8 = 0;
const MODE_TOUCH: u8 = 1;
const MODE_WRITE: u8 = 2;
const MODE_TRIM: u8 = 3;
const MODE_READ: u8 = 4;

fn state_from_u8(v: u8) -> RecorderState {
    match v {
        STATE_ARMED => RecorderState::Armed,
        STATE_RECORDING => RecorderState::Recording,
        _ => RecorderState::Idle,
    }
}

fn mode_from_u8(v: u8) -> RecordingMode {
    match v {
        MODE_TOUCH => RecordingMode::Touch,
        MODE_WRITE => RecordingMode::Write,
        MODE_TRIM => RecordingMode::Trim,
        MODE_READ => RecordingMode::Read,
        _ => RecordingMode::Latch,
    }
}

fn mode_to_u8(mode: RecordingMode) -> u8 {
    match mode {
        RecordingMode::Latch => MODE_LATCH,
        RecordingMode::Touch => MODE_TOUCH,
        RecordingMode::Write => MODE_WRITE,
        RecordingMode::Trim => MODE_TRIM,
        RecordingMode::Read => MODE_READ,
    }
}

impl AutomationRecorder {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let state = Arc::new(AtomicU8::new(STATE_IDLE));
        let mode = Arc::new(AtomicU8::new(MODE_LATCH));
        let config = Arc::new(Mutex::new(RecorderConfig::default()));
        let inner = Arc::new(Mutex::new(RecorderInner {
            lanes: HashMap::new(),
            touched: HashSet::new(),
            last_recorded_value: HashMap::new(),
            last_recorded_time: HashMap::new(),
            mapping: MappingTable::default(),
        }));
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = {
            let state = state.clone();
            let mode = mode.clone();
            let config = config.clone();
            let inner = inner.clone();
            let shutdown = shutdown.clone();
            std::thread::Builder::new()
                .name("daw-automation-recorder".into())
                .spawn(move || processor_loop(receiver, state, mode, config, inner, shutdown))
                .expect("spawn automation recorder thread")
        };

        Self { state, mode, config, inner, sender, shutdown, worker: Some(worker) }
    }

    pub fn state(&self) -> RecorderState {
        state_from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn mode(&self) -> RecordingMode {
        mode_from_u8(self.mode.load(Ordering::Acquire))
    }

    pub fn set_mode(&self, mode: RecordingMode) {
        self.mode.store(mode_to_u8(mode), Ordering::Release);
    }

    pub fn arm(&self) {
        self.state.store(STATE_ARMED, Ordering::Release);
    }

    pub fn start_recording(&self) {
        self.state.store(STATE_RECORDING, Ordering::Release);
    }

    /// Stop recording: flush the queue, then go idle. Per spec §5, the
    /// queue drains before the state transition is observed complete.
    pub fn stop_recording(&self) {
        while !self.sender.is_empty() {
            std::thread::yield_now();
        }
        self.state.store(STATE_IDLE, Ordering::Release);
    }

    pub fn set_config(&self, config: RecorderConfig) {
        *self.config.lock() = config;
    }

    pub fn register_lane(&self, parameter_id: ParameterId, lane: SharedLane) {
        self.inner.lock().lanes.insert(parameter_id, lane);
    }

    /// Arm or disarm `parameter_id` for recording. Armed state lives on the
    /// lane itself (spec §3), so this publishes a new lane snapshot with
    /// `armed` flipped rather than tracking it separately.
    pub fn set_armed(&self, parameter_id: ParameterId, armed: bool) {
        let inner = self.inner.lock();
        if let Some(shared_lane) = inner.lanes.get(&parameter_id) {
            let mut new_lane = (**shared_lane.load()).clone();
            new_lane.set_armed(armed);
            shared_lane.store(Arc::new(new_lane));
        }
    }

    pub fn add_mapping_cc(&self, channel: u8, cc: u8, entry: MappingEntry) {
        self.inner.lock().mapping.cc.insert((channel, cc), entry);
    }

    /// Enqueue an incoming event for the processor thread. Safe to call
    /// from a MIDI callback or control-thread handler.
    pub fn submit(&self, event: IncomingEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for AutomationRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AutomationRecorder {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

fn processor_loop(
    receiver: crossbeam_channel::Receiver<IncomingEvent>,
    state: Arc<AtomicU8>,
    mode: Arc<AtomicU8>,
    config: Arc<Mutex<RecorderConfig>>,
    inner: Arc<Mutex<RecorderInner>>,
    shutdown: Arc<AtomicBool>,
) {
    loop {
        match receiver.recv_timeout(Duration::from_millis(1)) {
            Ok(event) => {
                let current_state = state_from_u8(state.load(Ordering::Acquire));
                let current_mode = mode_from_u8(mode.load(Ordering::Acquire));
                let cfg = *config.lock();
                handle_event(event, current_state, current_mode, &cfg, &inner);
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                if shutdown.load(Ordering::Acquire) && receiver.is_empty() {
                    return;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn handle_event(
    event: IncomingEvent,
    state: RecorderState,
    mode: RecordingMode,
    config: &RecorderConfig,
    inner: &Arc<Mutex<RecorderInner>>,
) {
    match event {
        IncomingEvent::TouchStart { parameter_id } => {
            inner.lock().touched.insert(parameter_id);
            return;
        }
        IncomingEvent::TouchEnd { parameter_id } => {
            inner.lock().touched.remove(&parameter_id);
            return;
        }
        _ => {}
    }

    if state != RecorderState::Recording || mode == RecordingMode::Read {
        return;
    }

    let Some((parameter_id, normalized, time_samples)) = resolve_event(event, inner) else {
        return;
    };

    if let Some(punch_in) = config.punch_in {
        if time_samples < punch_in {
            return;
        }
    }
    if let Some(punch_out) = config.punch_out {
        if time_samples > punch_out {
            return;
        }
    }

    let mut inner = inner.lock();
    let Some(shared_lane) = inner.lanes.get(&parameter_id).cloned() else {
        return;
    };
    if !shared_lane.load().armed() {
        return;
    }

    if mode == RecordingMode::Touch && !inner.touched.contains(&parameter_id) {
        return;
    }

    let last_value = inner.last_recorded_value.get(&parameter_id).copied();
    let last_time = inner.last_recorded_time.get(&parameter_id).copied();

    if let Some(last_value) = last_value {
        if (normalized - last_value).abs() < config.min_change_threshold {
            return;
        }
    }
    if let Some(last_time) = last_time {
        if time_samples.saturating_sub(last_time) < config.recording_resolution {
            return;
        }
    }

    let mut new_lane = (**shared_lane.load()).clone();

    match mode {
        RecordingMode::Write => {
            let window_start = time_samples;
            let window_end = time_samples + config.recording_resolution * 8;
            new_lane.clear_range(window_start, window_end);
        }
        RecordingMode::Trim => {
            let proximity = trim_proximity_samples(config.recording_resolution);
            let has_nearby = new_lane.points().iter().any(|p| p.time_samples.abs_diff(time_samples) <= proximity);
            if !has_nearby {
                return;
            }
        }
        RecordingMode::Touch | RecordingMode::Latch | RecordingMode::Read => {}
    }

    let quantized_time = match config.quantize_grid {
        Some(grid) if grid > 0 => {
            let half = grid / 2;
            ((time_samples + half) / grid) * grid
        }
        _ => time_samples,
    };

    new_lane.add_point(quantized_time, normalized, CurveType::Linear);

    if config.auto_thin {
        let all_indices: Vec<usize> = (0..new_lane.len()).collect();
        new_lane.thin(&all_indices, config.thin_tolerance);
    }

    shared_lane.store(Arc::new(new_lane));
    inner.last_recorded_value.insert(parameter_id.clone(), normalized);
    inner.last_recorded_time.insert(parameter_id, time_samples);
}

fn resolve_event(event: IncomingEvent, inner: &Arc<Mutex<RecorderInner>>) -> Option<(ParameterId, f64, u64)> {
    match event {
        IncomingEvent::ParameterChange { parameter_id, normalized_value, time_samples } => {
            Some((parameter_id, normalized_value.clamp(0.0, 1.0), time_samples))
        }
        IncomingEvent::MidiCc { channel, cc, value, time_samples } => {
            let inner = inner.lock();
            let entry = inner.mapping.cc.get(&(channel, cc))?;
            let raw = value as f64 / 127.0;
            let shaped = entry.shape(raw)?;
            Some((entry.parameter_id.clone(), shaped, time_samples))
        }
        IncomingEvent::Aftertouch { channel, value, time_samples } => {
            let inner = inner.lock();
            let entry = inner.mapping.aftertouch.get(&channel)?;
            let raw = value as f64 / 127.0;
            let shaped = entry.shape(raw)?;
            Some((entry.parameter_id.clone(), shaped, time_samples))
        }
        IncomingEvent::PitchBend { channel, value, time_samples } => {
            let inner = inner.lock();
            let entry = inner.mapping.pitch_bend.get(&channel)?;
            let raw = (value as f64 + 8192.0) / 16384.0;
            let shaped = entry.shape(raw)?;
            Some((entry.parameter_id.clone(), shaped, time_samples))
        }
        IncomingEvent::TouchStart { .. } | IncomingEvent::TouchEnd { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::new_shared_lane;
    use std::time::Duration as StdDuration;

    #[test]
    fn latch_mode_records_parameter_change_events() {
        let recorder = AutomationRecorder::new();
        let pid = ParameterId::track_volume(0);
        let lane = new_shared_lane(0.0);
        recorder.register_lane(pid.clone(), lane.clone());
        recorder.set_armed(pid.clone(), true);
        recorder.set_mode(RecordingMode::Latch);
        recorder.arm();
        recorder.start_recording();

        recorder.submit(IncomingEvent::ParameterChange { parameter_id: pid.clone(), normalized_value: 0.6, time_samples: 1000 });
        std::thread::sleep(StdDuration::from_millis(20));
        recorder.stop_recording();

        let committed = lane.load();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed.points()[0].value, 0.6);
    }

    #[test]
    fn touch_mode_ignores_events_when_not_touched() {
        let recorder = AutomationRecorder::new();
        let pid = ParameterId::track_volume(1);
        let lane = new_shared_lane(0.0);
        recorder.register_lane(pid.clone(), lane.clone());
        recorder.set_armed(pid.clone(), true);
        recorder.set_mode(RecordingMode::Touch);
        recorder.arm();
        recorder.start_recording();

        recorder.submit(IncomingEvent::ParameterChange { parameter_id: pid.clone(), normalized_value: 0.6, time_samples: 1000 });
        std::thread::sleep(StdDuration::from_millis(20));
        recorder.stop_recording();

        assert_eq!(lane.load().len(), 0, "untouched parameter should not record in Touch mode");
    }

    #[test]
    fn read_mode_never_writes() {
        let recorder = AutomationRecorder::new();
        let pid = ParameterId::track_volume(2);
        let lane = new_shared_lane(0.0);
        recorder.register_lane(pid.clone(), lane.clone());
        recorder.set_armed(pid.clone(), true);
        recorder.set_mode(RecordingMode::Read);
        recorder.arm();
        recorder.start_recording();

        recorder.submit(IncomingEvent::ParameterChange { parameter_id: pid, normalized_value: 0.9, time_samples: 10 });
        std::thread::sleep(StdDuration::from_millis(20));
        recorder.stop_recording();

        assert_eq!(lane.load().len(), 0);
    }
}
