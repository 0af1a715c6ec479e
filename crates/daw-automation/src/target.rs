//! Automation dispatch targets (spec §4.E step 5, §6). The engine never
//! owns a target strongly — registrations are [`Weak`] references so a
//! torn-down plugin or track doesn't need to deregister itself.

use daw_core::ParameterKind;
use std::sync::Weak;

/// Host-side receiver of a dispatched automation value: a plugin
/// instance, a track strip, or a MIDI processor (spec §6).
pub trait AutomationTarget: Send + Sync {
    fn apply(&self, parameter_index: u32, normalized_value: f64);
}

/// A registered automation destination: which kind of mapping to use, and
/// a weak handle to the thing that ultimately receives the mapped value.
#[derive(Clone)]
pub struct TargetRegistration {
    pub kind: ParameterKind,
    pub parameter_index: u32,
    pub host: Weak<dyn AutomationTarget>,
}

/// Map a normalized `[0,1]` automation value to the dispatched value for
/// its parameter kind (spec §4.E step 5). Returns the value already in
/// the host's native units; `PluginParameter` is pass-through (the plugin
/// interprets `[0,1]` itself).
pub fn map_value(kind: ParameterKind, normalized: f64) -> f64 {
    let normalized = normalized.clamp(0.0, 1.0);
    match kind {
        ParameterKind::TrackVolume => {
            let db = -60.0 + normalized * (12.0 - -60.0);
            10f64.powf(db / 20.0)
        }
        ParameterKind::TrackPan => -1.0 + normalized * 2.0,
        ParameterKind::MidiCc => (normalized * 127.0).round(),
        ParameterKind::PluginParameter => normalized,
        _ => normalized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_volume_maps_to_linear_gain() {
        let gain_at_zero = map_value(ParameterKind::TrackVolume, 0.0);
        let expected_floor = 10f64.powf(-60.0 / 20.0);
        assert!((gain_at_zero - expected_floor).abs() < 1e-9);

        let gain_at_one = map_value(ParameterKind::TrackVolume, 1.0);
        let expected_ceiling = 10f64.powf(12.0 / 20.0);
        assert!((gain_at_one - expected_ceiling).abs() < 1e-9);
    }

    #[test]
    fn track_pan_spans_negative_one_to_one() {
        assert_eq!(map_value(ParameterKind::TrackPan, 0.0), -1.0);
        assert_eq!(map_value(ParameterKind::TrackPan, 0.5), 0.0);
        assert_eq!(map_value(ParameterKind::TrackPan, 1.0), 1.0);
    }

    #[test]
    fn midi_cc_rounds_to_integer_range() {
        assert_eq!(map_value(ParameterKind::MidiCc, 1.0), 127.0);
        assert_eq!(map_value(ParameterKind::MidiCc, 0.0), 0.0);
    }

    #[test]
    fn plugin_parameter_is_pass_through() {
        assert_eq!(map_value(ParameterKind::PluginParameter, 0.33), 0.33);
    }
}
