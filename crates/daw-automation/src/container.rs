//! The automation data container (spec §4.D): all of a session's lanes,
//! keyed by parameter, plus a single global enable/visible pair that sits
//! above every per-lane flag.

use crate::lane::AutomationLane;
use daw_core::ParameterId;
use std::collections::HashMap;
use std::collections::hash_map::{Iter, IterMut};

/// Owns every [`AutomationLane`] in a session, keyed by parameter identity.
///
/// The global flags here are a coarser override above the per-lane
/// `enabled`/`visible` flags: `global_enabled = false` mutes automation
/// playback entirely regardless of what any individual lane says, and
/// `global_visible = false` hides the whole automation view.
#[derive(Debug, Clone, Default)]
pub struct AutomationDataContainer {
    lanes: HashMap<ParameterId, AutomationLane>,
    global_enabled: bool,
    global_visible: bool,
}

impl AutomationDataContainer {
    pub fn new() -> Self {
        Self { lanes: HashMap::new(), global_enabled: true, global_visible: true }
    }

    pub fn global_enabled(&self) -> bool {
        self.global_enabled
    }

    pub fn set_global_enabled(&mut self, enabled: bool) {
        self.global_enabled = enabled;
    }

    pub fn global_visible(&self) -> bool {
        self.global_visible
    }

    pub fn set_global_visible(&mut self, visible: bool) {
        self.global_visible = visible;
    }

    /// Insert or replace the lane for `parameter_id`.
    pub fn insert(&mut self, parameter_id: ParameterId, lane: AutomationLane) {
        self.lanes.insert(parameter_id, lane);
    }

    /// Get the lane for `parameter_id`, creating one with `default_value`
    /// on first access (spec §4.D: the container owns lane lifetime).
    pub fn get_or_create(&mut self, parameter_id: ParameterId, default_value: f64) -> &mut AutomationLane {
        self.lanes.entry(parameter_id).or_insert_with(|| AutomationLane::new(default_value))
    }

    pub fn get(&self, parameter_id: &ParameterId) -> Option<&AutomationLane> {
        self.lanes.get(parameter_id)
    }

    pub fn get_mut(&mut self, parameter_id: &ParameterId) -> Option<&mut AutomationLane> {
        self.lanes.get_mut(parameter_id)
    }

    pub fn remove(&mut self, parameter_id: &ParameterId) -> Option<AutomationLane> {
        self.lanes.remove(parameter_id)
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Evaluate `parameter_id` at `position`, honoring both the global
    /// enable flag and the lane's own `enabled` flag. Falls back to `0.0`
    /// if no lane is registered for the parameter.
    pub fn value_at(&self, parameter_id: &ParameterId, position: u64) -> f64 {
        if !self.global_enabled {
            return 0.0;
        }
        self.lanes.get(parameter_id).map(|l| l.value_at(position)).unwrap_or(0.0)
    }

    pub fn iter(&self) -> Iter<'_, ParameterId, AutomationLane> {
        self.lanes.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, ParameterId, AutomationLane> {
        self.lanes.iter_mut()
    }
}
