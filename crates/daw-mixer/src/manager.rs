//! Bus graph ownership: dynamic id assignment, cycle-checked routing,
//! Kahn's-algorithm topological order, solo arbitration, and the
//! per-block process pass (spec §4.H).
//!
//! Storage conventions (`HashMap<BusId, _>`, a dirty flag gating
//! topology recompute) follow the teacher's `AudioGraph`; the sort
//! itself is in-degree based rather than the teacher's DFS walk, since
//! the routing semantics here call for Kahn's algorithm specifically.

use crate::bus::{Bus, BusKind};
use crate::route::{RouteDestination, RouteSend};
use crate::source::TrackSource;
use daw_core::{AudioBuffer, BusId, DawError, DawResult};
use std::collections::{HashMap, HashSet, VecDeque};

pub struct BusManager {
    buses: HashMap<BusId, Bus>,
    /// Source bus -> its declared sends (spec §3 route destination union).
    sends: HashMap<BusId, Vec<RouteSend>>,
    /// Track buses pull raw content from here before their routed
    /// sends are summed in (spec §6 "Track source interface").
    track_sources: HashMap<BusId, Box<dyn TrackSource>>,
    /// Last block's tapped audio per `ExternalOut` id, for a render or
    /// driver layer to pull from after `process_block`.
    external_outs: HashMap<u32, AudioBuffer>,
    master: BusId,
    next_id: u64,
    topo_order: Vec<BusId>,
    dirty: bool,
    num_channels: usize,
    max_frames: usize,
    sample_rate_hz: f64,
}

/// Matches the rate `BusManager::new` assumes until `set_sample_rate_hz`
/// is called; most hosts run at 48kHz and tests rely on this default.
const DEFAULT_SAMPLE_RATE_HZ: f64 = 48_000.0;

impl BusManager {
    pub fn new(num_channels: usize, max_frames: usize) -> Self {
        let master_id = BusId(0);
        let mut buses = HashMap::new();
        buses.insert(master_id, Bus::new(master_id, BusKind::Master, "Master", num_channels, max_frames));

        Self {
            buses,
            sends: HashMap::new(),
            track_sources: HashMap::new(),
            external_outs: HashMap::new(),
            master: master_id,
            next_id: 1,
            topo_order: vec![master_id],
            dirty: false,
            num_channels,
            max_frames,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
        }
    }

    /// The rate this graph's buses, PDC lines, and meters are assumed to
    /// run at. Set once by the host/session layer before playback starts.
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn set_sample_rate_hz(&mut self, sample_rate_hz: f64) {
        self.sample_rate_hz = sample_rate_hz;
    }

    fn resolve_graph_destination(&self, destination: RouteDestination) -> Option<BusId> {
        match destination {
            RouteDestination::Bus(id) => Some(id),
            RouteDestination::Master => Some(self.master),
            RouteDestination::ExternalOut(_) => None,
        }
    }

    pub fn has_track_source(&self, id: BusId) -> bool {
        self.track_sources.contains_key(&id)
    }

    /// The most recent block's tapped audio for `ExternalOut(out_id)`, if
    /// any send targeted it.
    pub fn external_out(&self, out_id: u32) -> Option<&AudioBuffer> {
        self.external_outs.get(&out_id)
    }

    pub fn master_id(&self) -> BusId {
        self.master
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.buses.get(&id)
    }

    pub fn bus_mut(&mut self, id: BusId) -> Option<&mut Bus> {
        self.buses.get_mut(&id)
    }

    pub fn bus_ids(&self) -> impl Iterator<Item = BusId> + '_ {
        self.buses.keys().copied()
    }

    /// Create a new non-master bus, assigning its id monotonically.
    pub fn create_bus(&mut self, kind: BusKind, name: impl Into<String>) -> BusId {
        let id = BusId(self.next_id);
        self.next_id += 1;
        self.buses.insert(id, Bus::new(id, kind, name, self.num_channels, self.max_frames));
        self.sends.insert(id, Vec::new());
        self.dirty = true;
        id
    }

    /// The master bus can never be removed (spec §4.H).
    pub fn remove_bus(&mut self, id: BusId) -> DawResult<()> {
        if id == self.master {
            return Err(DawError::InvalidParameter("the master bus cannot be removed".into()));
        }
        if self.buses.remove(&id).is_none() {
            return Err(DawError::NotFound(format!("bus {id:?}")));
        }
        self.sends.remove(&id);
        self.track_sources.remove(&id);
        for sends in self.sends.values_mut() {
            sends.retain(|s| s.destination != RouteDestination::Bus(id));
        }
        self.dirty = true;
        Ok(())
    }

    /// Declare a send from `from` to `destination` (spec §3 route
    /// destination union). For `Bus`/`Master` destinations, validates no
    /// cycle would result by walking the output graph from the
    /// destination and failing if `from` is reachable (spec §4.H);
    /// `ExternalOut` destinations skip this check since they never
    /// re-enter the graph.
    pub fn add_send(&mut self, from: BusId, destination: RouteDestination, level: f64, pan: f64, pre_fader: bool) -> DawResult<()> {
        if !self.buses.contains_key(&from) {
            return Err(DawError::NotFound(format!("bus {from:?}")));
        }
        if let Some(to) = self.resolve_graph_destination(destination) {
            if !self.buses.contains_key(&to) {
                return Err(DawError::NotFound(format!("bus {to:?}")));
            }
            if self.reachable_from(to, from) {
                return Err(DawError::Cycle(format!("routing {from:?} -> {to:?} would create a cycle")));
            }
        }

        let entry = self.sends.entry(from).or_default();
        if entry.iter().any(|s| s.destination == destination) {
            return Err(DawError::AlreadyExists(format!("send {from:?} -> {destination:?}")));
        }
        let mut send = RouteSend::new(destination);
        send.level = level;
        send.pan = pan.clamp(-1.0, 1.0);
        send.pre_fader = pre_fader;
        entry.push(send);
        self.dirty = true;
        Ok(())
    }

    /// Attach (or replace) the source a track bus pulls raw content from.
    pub fn set_track_source(&mut self, bus_id: BusId, source: Box<dyn TrackSource>) {
        self.track_sources.insert(bus_id, source);
    }

    pub fn clear_track_source(&mut self, bus_id: BusId) {
        self.track_sources.remove(&bus_id);
    }

    pub fn remove_send(&mut self, from: BusId, destination: RouteDestination) {
        if let Some(sends) = self.sends.get_mut(&from) {
            sends.retain(|s| s.destination != destination);
        }
        self.dirty = true;
    }

    /// Enable or disable an existing send without discarding its level,
    /// pan, and pre/post-fader configuration (spec §3 `enabled`).
    pub fn set_send_enabled(&mut self, from: BusId, destination: RouteDestination, enabled: bool) {
        if let Some(sends) = self.sends.get_mut(&from) {
            if let Some(send) = sends.iter_mut().find(|s| s.destination == destination) {
                send.enabled = enabled;
            }
        }
        self.dirty = true;
    }

    pub fn sends_from(&self, from: BusId) -> &[RouteSend] {
        self.sends.get(&from).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Is `target` reachable from `start` by following declared, enabled
    /// sends forward (start -> ... -> target)?
    fn reachable_from(&self, start: BusId, target: BusId) -> bool {
        if start == target {
            return true;
        }
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([start]);
        visited.insert(start);

        while let Some(node) = queue.pop_front() {
            for destinations in self.destinations_of(node) {
                if destinations == target {
                    return true;
                }
                if visited.insert(destinations) {
                    queue.push_back(destinations);
                }
            }
        }
        false
    }

    fn destinations_of(&self, node: BusId) -> Vec<BusId> {
        self.sends
            .get(&node)
            .into_iter()
            .flatten()
            .filter(|s| s.enabled)
            .filter_map(|s| self.resolve_graph_destination(s.destination))
            .collect()
    }

    /// Kahn's algorithm over the bus-to-bus subgraph (spec §4.H).
    /// `ExternalOut` sends are leaves outside this subgraph and never
    /// contribute an edge.
    fn recompute_topology(&mut self) -> DawResult<()> {
        let mut in_degree: HashMap<BusId, usize> = self.buses.keys().map(|id| (*id, 0)).collect();
        let mut edges: HashMap<BusId, Vec<BusId>> = self.buses.keys().map(|id| (*id, Vec::new())).collect();

        for (from, sends) in &self.sends {
            for send in sends {
                if !send.enabled {
                    continue;
                }
                if let Some(to) = self.resolve_graph_destination(send.destination) {
                    edges.entry(*from).or_default().push(to);
                    *in_degree.entry(to).or_insert(0) += 1;
                }
            }
        }

        let mut queue: VecDeque<BusId> = in_degree.iter().filter(|(_, &d)| d == 0).map(|(id, _)| *id).collect();
        let mut order = Vec::with_capacity(self.buses.len());

        while let Some(node) = queue.pop_front() {
            order.push(node);
            if let Some(outgoing) = edges.get(&node) {
                for &next in outgoing {
                    let degree = in_degree.get_mut(&next).unwrap();
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        if order.len() != self.buses.len() {
            return Err(DawError::Cycle("bus graph contains a cycle".into()));
        }

        self.topo_order = order;
        self.dirty = false;
        Ok(())
    }

    /// Solo arbitration (spec §4.H): when any bus is soloed, every
    /// non-soloed, non-master bus gets its mixer-mute-override set.
    pub fn update_solo_arbitration(&mut self) {
        let solo_active = self.buses.values().any(|b| b.soloed());
        for (id, bus) in self.buses.iter_mut() {
            if *id == self.master {
                continue;
            }
            bus.set_mixer_mute_override(solo_active && !bus.soloed());
        }
    }

    /// Per-block process pass (spec §4.H), called from the audio
    /// callback. Returns the master bus's rendered output.
    pub fn process_block(&mut self, block_start_time: u64, n: usize) -> DawResult<AudioBuffer> {
        if self.dirty {
            self.recompute_topology()?;
        }

        let mut accumulators: HashMap<BusId, AudioBuffer> =
            self.buses.keys().map(|id| (*id, AudioBuffer::new(self.num_channels, n))).collect();
        let mut outputs: HashMap<BusId, AudioBuffer> = HashMap::new();

        for &bus_id in &self.topo_order.clone() {
            let mut scratch = accumulators.remove(&bus_id).unwrap_or_else(|| AudioBuffer::new(self.num_channels, n));

            if let Some(source) = self.track_sources.get_mut(&bus_id) {
                let mut pulled = AudioBuffer::new(self.num_channels, n);
                source.pull(block_start_time, n, &mut pulled);
                scratch.add_from(&pulled);
            }

            let mut out_buffer = AudioBuffer::new(self.num_channels, n);
            if let Some(bus) = self.buses.get_mut(&bus_id) {
                bus.process(&scratch, &mut out_buffer, block_start_time, n);
            }

            // Fan this bus's post-fader (or pre-fader) output to every
            // send it declares: into another bus's accumulator, or out to
            // an external output tap.
            if let Some(sends) = self.sends.get(&bus_id) {
                for send in sends {
                    if !send.enabled {
                        continue;
                    }
                    let contribution = if send.pre_fader { &scratch } else { &out_buffer };
                    match self.resolve_graph_destination(send.destination) {
                        Some(dest) => {
                            let dest_acc = accumulators.entry(dest).or_insert_with(|| AudioBuffer::new(self.num_channels, n));
                            accumulate_send(dest_acc, contribution, send, self.num_channels);
                        }
                        None => {
                            if let RouteDestination::ExternalOut(out_id) = send.destination {
                                let tap = self.external_outs.entry(out_id).or_insert_with(|| AudioBuffer::new(self.num_channels, n));
                                tap.clear();
                                tap.set_frames(n);
                                accumulate_send(tap, contribution, send, self.num_channels);
                            }
                        }
                    }
                }
            }

            outputs.insert(bus_id, out_buffer);
        }

        outputs
            .remove(&self.master)
            .ok_or_else(|| DawError::Invariant("master bus produced no output".into()))
    }
}

/// Accumulate `contribution` into `dest_acc` at `send.level`, applying an
/// equal-power pan split across the two legs of a stereo send when
/// `send.pan != 0.0` (mirrors the bus's own gain/pan stage in
/// [`crate::bus::Bus::process`]).
fn accumulate_send(dest_acc: &mut AudioBuffer, contribution: &AudioBuffer, send: &RouteSend, num_channels: usize) {
    if num_channels == 2 && send.pan != 0.0 {
        let left_gain = send.level * (0.5 * (1.0 - send.pan)).sqrt();
        let right_gain = send.level * (0.5 * (1.0 + send.pan)).sqrt();
        dest_acc.add_scaled_channel_from(0, contribution, 0, left_gain);
        dest_acc.add_scaled_channel_from(1, contribution, 1, right_gain);
    } else {
        dest_acc.add_scaled_from(contribution, send.level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_manager_has_only_master() {
        let manager = BusManager::new(2, 64);
        assert_eq!(manager.bus_ids().count(), 1);
        assert_eq!(manager.bus(manager.master_id()).unwrap().kind(), BusKind::Master);
    }

    #[test]
    fn master_bus_cannot_be_removed() {
        let mut manager = BusManager::new(2, 64);
        let master = manager.master_id();
        assert!(manager.remove_bus(master).is_err());
    }

    #[test]
    fn routing_a_cycle_is_rejected() {
        let mut manager = BusManager::new(2, 64);
        let a = manager.create_bus(BusKind::Group, "A");
        let b = manager.create_bus(BusKind::Group, "B");
        manager.add_send(a, RouteDestination::Bus(b), 1.0, 0.0, false).unwrap();
        assert!(manager.add_send(b, RouteDestination::Bus(a), 1.0, 0.0, false).is_err());
    }

    #[test]
    fn solo_arbitration_scenario() {
        // Spec §8 Scenario 4: A/B/C routed to master, solo B.
        let mut manager = BusManager::new(2, 64);
        let master = manager.master_id();
        let a = manager.create_bus(BusKind::Group, "A");
        let b = manager.create_bus(BusKind::Group, "B");
        let c = manager.create_bus(BusKind::Group, "C");
        manager.add_send(a, RouteDestination::Bus(master), 1.0, 0.0, false).unwrap();
        manager.add_send(b, RouteDestination::Bus(master), 1.0, 0.0, false).unwrap();
        manager.add_send(c, RouteDestination::Bus(master), 1.0, 0.0, false).unwrap();

        manager.bus_mut(b).unwrap().set_soloed(true);
        manager.update_solo_arbitration();

        assert!(manager.bus(a).unwrap().mixer_mute_override());
        assert!(!manager.bus(b).unwrap().mixer_mute_override());
        assert!(manager.bus(c).unwrap().mixer_mute_override());

        manager.bus_mut(b).unwrap().set_soloed(false);
        manager.update_solo_arbitration();

        assert!(!manager.bus(a).unwrap().mixer_mute_override());
        assert!(!manager.bus(b).unwrap().mixer_mute_override());
        assert!(!manager.bus(c).unwrap().mixer_mute_override());
    }

    struct ConstantSource {
        value: f32,
    }

    impl crate::source::TrackSource for ConstantSource {
        fn pull(&mut self, _block_start_samples: u64, n_frames: usize, out_buf: &mut AudioBuffer) -> usize {
            for c in 0..out_buf.channel_count() {
                out_buf.channel_mut(c)[..n_frames].fill(self.value);
            }
            n_frames
        }

        fn channel_count(&self) -> usize {
            2
        }
    }

    #[test]
    fn process_pass_sums_tracks_into_master() {
        let n = 32;
        let mut manager = BusManager::new(2, n);
        let master = manager.master_id();
        let a = manager.create_bus(BusKind::Group, "A");
        manager.add_send(a, RouteDestination::Bus(master), 1.0, 0.0, false).unwrap();
        manager.bus_mut(a).unwrap().set_gain_db(0.0);
        manager.set_track_source(a, Box::new(ConstantSource { value: 0.5 }));
        assert!(manager.has_track_source(a));

        let out = manager.process_block(0, n).unwrap();
        assert_eq!(out.channel_count(), 2);
        assert_eq!(out.frames(), n);
        assert!(out.channel(0).iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn external_out_send_taps_without_joining_the_bus_graph() {
        let n = 16;
        let mut manager = BusManager::new(2, n);
        let a = manager.create_bus(BusKind::Aux, "A");
        manager.add_send(a, RouteDestination::Master, 1.0, 0.0, false).unwrap();
        manager.add_send(a, RouteDestination::ExternalOut(0), 1.0, 0.0, false).unwrap();
        manager.bus_mut(a).unwrap().set_gain_db(0.0);
        manager.set_track_source(a, Box::new(ConstantSource { value: 0.25 }));

        let out = manager.process_block(0, n).unwrap();
        assert!(out.channel(0).iter().all(|&s| (s - 0.25).abs() < 1e-6));

        let tap = manager.external_out(0).expect("external out tap recorded");
        assert!(tap.channel(0).iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn disabled_send_is_excluded_from_the_bus_graph() {
        let mut manager = BusManager::new(2, 64);
        let master = manager.master_id();
        let a = manager.create_bus(BusKind::Group, "A");
        manager.add_send(a, RouteDestination::Bus(master), 1.0, 0.0, false).unwrap();
        manager.set_send_enabled(a, RouteDestination::Bus(master), false);
        // disabling the only outgoing send should not break the cycle
        // check for a fresh route in the other direction
        assert!(manager.add_send(master, RouteDestination::Bus(a), 1.0, 0.0, false).is_ok());
    }
}
