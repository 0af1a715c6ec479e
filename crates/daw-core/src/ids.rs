//! Bus identity and the automation parameter identity composite key
//! (spec §3, §6).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Opaque bus identifier assigned monotonically by the bus manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BusId(pub u64);

/// The kind of thing an automation point stream controls (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParameterKind {
    TrackVolume,
    TrackPan,
    TrackMute,
    TrackSolo,
    SendLevel,
    SendPan,
    PluginParameter,
    MidiCc,
    Custom,
}

impl ParameterKind {
    pub fn label(&self) -> &'static str {
        match self {
            ParameterKind::TrackVolume => "Track Volume",
            ParameterKind::TrackPan => "Track Pan",
            ParameterKind::TrackMute => "Track Mute",
            ParameterKind::TrackSolo => "Track Solo",
            ParameterKind::SendLevel => "Send Level",
            ParameterKind::SendPan => "Send Pan",
            ParameterKind::PluginParameter => "Plugin Parameter",
            ParameterKind::MidiCc => "MIDI CC",
            ParameterKind::Custom => "Custom",
        }
    }
}

/// Composite automation parameter identity. Totally ordered, bitwise on
/// `(kind, track_id, parameter_index, plugin_instance_id, custom_tag)` in
/// that order (spec §6), and usable as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterId {
    pub kind: ParameterKind,
    pub track_id: u64,
    pub parameter_index: u32,
    pub plugin_instance_id: u64,
    pub custom_tag: String,
}

impl ParameterId {
    pub fn track_volume(track_id: u64) -> Self {
        Self {
            kind: ParameterKind::TrackVolume,
            track_id,
            parameter_index: 0,
            plugin_instance_id: 0,
            custom_tag: String::new(),
        }
    }

    pub fn track_pan(track_id: u64) -> Self {
        Self {
            kind: ParameterKind::TrackPan,
            track_id,
            parameter_index: 0,
            plugin_instance_id: 0,
            custom_tag: String::new(),
        }
    }

    pub fn plugin_parameter(track_id: u64, plugin_instance_id: u64, parameter_index: u32) -> Self {
        Self {
            kind: ParameterKind::PluginParameter,
            track_id,
            parameter_index,
            plugin_instance_id,
            custom_tag: String::new(),
        }
    }

    pub fn midi_cc(track_id: u64, cc_number: u32) -> Self {
        Self {
            kind: ParameterKind::MidiCc,
            track_id,
            parameter_index: cc_number,
            plugin_instance_id: 0,
            custom_tag: String::new(),
        }
    }

    pub fn custom(tag: impl Into<String>) -> Self {
        Self {
            kind: ParameterKind::Custom,
            track_id: 0,
            parameter_index: 0,
            plugin_instance_id: 0,
            custom_tag: tag.into(),
        }
    }

    /// Display name derived from kind + ids, as spec §3 requires.
    pub fn display_name(&self) -> String {
        match self.kind {
            ParameterKind::PluginParameter => format!(
                "{} — track {} plugin {} #{}",
                self.kind.label(),
                self.track_id,
                self.plugin_instance_id,
                self.parameter_index
            ),
            ParameterKind::MidiCc => {
                format!("{} — track {} CC{}", self.kind.label(), self.track_id, self.parameter_index)
            }
            ParameterKind::Custom => format!("{} — {}", self.kind.label(), self.custom_tag),
            _ => format!("{} — track {}", self.kind.label(), self.track_id),
        }
    }
}

impl PartialOrd for ParameterId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParameterId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.track_id.cmp(&other.track_id))
            .then_with(|| self.parameter_index.cmp(&other.parameter_index))
            .then_with(|| self.plugin_instance_id.cmp(&other.plugin_instance_id))
            .then_with(|| self.custom_tag.cmp(&other.custom_tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_field_wise() {
        let a = ParameterId::track_volume(1);
        let b = ParameterId::track_volume(2);
        assert!(a < b);

        let c = ParameterId::track_pan(0);
        assert!(a < c, "TrackVolume < TrackPan by enum declaration order");
    }

    #[test]
    fn equal_ids_hash_equal() {
        use std::collections::HashMap;
        let mut map: HashMap<ParameterId, f64> = HashMap::new();
        map.insert(ParameterId::track_volume(5), 0.8);
        assert_eq!(map.get(&ParameterId::track_volume(5)), Some(&0.8));
    }
}
