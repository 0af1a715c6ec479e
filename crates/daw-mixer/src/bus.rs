//! A single mixer bus and its seven-step per-block process pass
//! (spec §4.G), grounded structurally on the teacher's `AudioGraph` node
//! bookkeeping but with bus-specific gain/pan/meter/PDC logic.

use crate::effect::EffectChain;
use crate::pdc::PdcDelayLine;
use daw_core::{AudioBuffer, BusId, Decibels};
use daw_meter::StreamMeter;

/// Silence threshold for the "active" flag (spec §4.G step 7): -60 dBFS.
const ACTIVE_THRESHOLD_LINEAR: f32 = 0.001; // 10^(-60/20)

/// Bus type (spec §3). A "track" channel strip is not a distinct kind
/// here: it is whichever kind the session assigns (typically `Aux` or
/// `Group`) with a [`crate::TrackSource`] attached via
/// `BusManager::set_track_source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusKind {
    Aux,
    Group,
    Master,
    Monitor,
}

pub struct Bus {
    id: BusId,
    kind: BusKind,
    name: String,
    num_channels: usize,

    gain: Decibels,
    pan: f64,
    muted: bool,
    soloed: bool,
    /// Set by the manager's solo arbitration pass; never touched by the
    /// user directly (spec §4.H).
    mixer_mute_override: bool,
    record_arm: bool,

    effects: EffectChain,
    pdc: PdcDelayLine,

    working: AudioBuffer,
    meter: Option<StreamMeter>,

    samples_processed: u64,
    active: bool,
}

impl Bus {
    pub fn new(id: BusId, kind: BusKind, name: impl Into<String>, num_channels: usize, max_frames: usize) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            num_channels,
            gain: Decibels::ZERO,
            pan: 0.0,
            muted: false,
            soloed: false,
            mixer_mute_override: false,
            record_arm: false,
            effects: EffectChain::new(),
            pdc: PdcDelayLine::new(num_channels, max_frames.max(1)),
            working: AudioBuffer::new(num_channels, max_frames),
            meter: None,
            samples_processed: 0,
            active: false,
        }
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn kind(&self) -> BusKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn set_gain_db(&mut self, db: f64) {
        self.gain = Decibels(db).clamp_bus_range();
    }

    pub fn gain_db(&self) -> f64 {
        self.gain.0
    }

    pub fn set_pan(&mut self, pan: f64) {
        self.pan = pan.clamp(-1.0, 1.0);
    }

    pub fn pan(&self) -> f64 {
        self.pan
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn set_soloed(&mut self, soloed: bool) {
        self.soloed = soloed;
    }

    pub fn soloed(&self) -> bool {
        self.soloed
    }

    pub fn set_mixer_mute_override(&mut self, value: bool) {
        self.mixer_mute_override = value;
    }

    pub fn mixer_mute_override(&self) -> bool {
        self.mixer_mute_override
    }

    pub fn set_record_arm(&mut self, armed: bool) {
        self.record_arm = armed;
    }

    pub fn record_arm(&self) -> bool {
        self.record_arm
    }

    pub fn effects_mut(&mut self) -> &mut EffectChain {
        &mut self.effects
    }

    pub fn effects(&self) -> &EffectChain {
        &self.effects
    }

    pub fn enable_metering(&mut self, sample_rate_hz: f64) {
        self.meter = Some(StreamMeter::new(sample_rate_hz));
    }

    pub fn meter(&self) -> Option<&StreamMeter> {
        self.meter.as_ref()
    }

    pub fn samples_processed(&self) -> u64 {
        self.samples_processed
    }

    pub fn active(&self) -> bool {
        self.active
    }

    /// Resize the PDC line to compensate for `effects.total_latency_samples()`
    /// (spec §4.G "Delay compensation setter"); called by the manager
    /// whenever routing or the effect chain changes.
    pub fn resync_pdc(&mut self) {
        let needed = self.effects.total_latency_samples();
        self.pdc.set_delay(needed);
    }

    /// Seven-step per-block process pass (spec §4.G).
    pub fn process(&mut self, summed_input: &AudioBuffer, out_buffer: &mut AudioBuffer, block_start_time: u64, n: usize) {
        // Step 1: muted (and not soloed) silences the bus entirely.
        if (self.muted || self.mixer_mute_override) && !self.soloed {
            out_buffer.clear();
            self.active = false;
            self.samples_processed += n as u64;
            return;
        }

        // Step 2: copy summed input into the working buffer.
        self.working.clear();
        self.working.set_frames(n);
        self.working.copy_from(summed_input);

        // Step 3: PDC delay line, per channel.
        {
            let mut refs = self.working.all_channels_mut();
            self.pdc.process(&mut refs);
        }

        // Step 4: effect chain, serially.
        self.effects.process(&mut self.working, block_start_time);

        // Step 5: gain + pan.
        let linear = self.gain.to_gain();
        if self.num_channels == 2 {
            let left_gain = linear * (0.5 * (1.0 - self.pan)).sqrt();
            let right_gain = linear * (0.5 * (1.0 + self.pan)).sqrt();
            for s in self.working.channel_mut(0) {
                *s *= left_gain as f32;
            }
            for s in self.working.channel_mut(1) {
                *s *= right_gain as f32;
            }
        } else {
            let g = linear as f32;
            for c in 0..self.num_channels {
                for s in self.working.channel_mut(c) {
                    *s *= g;
                }
            }
        }

        // Step 6: tap to the meter processor.
        if let Some(meter) = self.meter.as_mut() {
            if self.num_channels >= 2 {
                let left = self.working.channel(0).to_vec();
                let right = self.working.channel(1).to_vec();
                meter.process_and_publish(&left, &right);
            } else if self.num_channels == 1 {
                let mono = self.working.channel(0).to_vec();
                meter.process_and_publish(&mono, &mono);
            }
        }

        // Step 7: copy out, update counters, compute active flag.
        out_buffer.clear();
        out_buffer.set_frames(n);
        out_buffer.copy_from(&self.working);
        self.samples_processed += n as u64;
        self.active = self.working.peak_abs() > ACTIVE_THRESHOLD_LINEAR;
    }
}
