//! Time-ordered sparse automation point set for one parameter, with
//! binary-search lookup and an index-hint fast path for sequential
//! playback (spec §4.D), grounded on the teacher's `AutomationLane`.

use crate::curve::CurveType;
use crate::point::AutomationPoint;

#[derive(Debug, Clone)]
pub struct AutomationLane {
    points: Vec<AutomationPoint>,
    default_value: f64,
    /// Index hint for `value_at_hint`: the last segment's starting index.
    hint_index: usize,
    /// Playback/recording gate: a disabled lane reports `default_value`
    /// instead of evaluating its points (spec §4.D).
    enabled: bool,
    /// Record-arm flag, set by the recorder when the user arms this
    /// parameter for write/touch/latch/trim capture.
    armed: bool,
    /// Editor-only display attributes; never consulted by playback.
    visible: bool,
    color: u32,
}

impl AutomationLane {
    pub fn new(default_value: f64) -> Self {
        Self {
            points: Vec::new(),
            default_value: default_value.clamp(0.0, 1.0),
            hint_index: 0,
            enabled: true,
            armed: false,
            visible: true,
            color: 0x8080FF,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn armed(&self) -> bool {
        self.armed
    }

    pub fn set_armed(&mut self, armed: bool) {
        self.armed = armed;
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn set_color(&mut self, color: u32) {
        self.color = color;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[AutomationPoint] {
        &self.points
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.hint_index = 0;
    }

    /// Insert a point, validating `value ∈ [0,1]` (clamped) and any
    /// Bezier control points `∈ [-1,1]` (clamped). If a point already
    /// exists at `time_samples`, overwrite it in place; otherwise insert
    /// maintaining strict time order.
    pub fn add_point(&mut self, time_samples: u64, value: f64, curve: CurveType) {
        let value = value.clamp(0.0, 1.0);
        let curve = match curve {
            CurveType::Bezier { cp1, cp2 } => {
                CurveType::Bezier { cp1: cp1.clamp(-1.0, 1.0), cp2: cp2.clamp(-1.0, 1.0) }
            }
            other => other,
        };

        match self.points.binary_search_by_key(&time_samples, |p| p.time_samples) {
            Ok(idx) => {
                self.points[idx].value = value;
                self.points[idx].curve = curve;
            }
            Err(idx) => {
                self.points.insert(idx, AutomationPoint { time_samples, value, curve, selected: false });
                if self.hint_index >= idx {
                    self.hint_index += 1;
                }
            }
        }
    }

    pub fn remove_at_index(&mut self, index: usize) -> bool {
        if index >= self.points.len() {
            return false;
        }
        self.points.remove(index);
        if self.hint_index > index && self.hint_index > 0 {
            self.hint_index -= 1;
        }
        true
    }

    /// Remove the point nearest `time_samples` within `tolerance_samples`,
    /// if any.
    pub fn remove_near(&mut self, time_samples: u64, tolerance_samples: u64) -> bool {
        let nearest = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.time_samples.abs_diff(time_samples)))
            .filter(|&(_, d)| d <= tolerance_samples)
            .min_by_key(|&(_, d)| d);

        match nearest {
            Some((idx, _)) => self.remove_at_index(idx),
            None => false,
        }
    }

    /// Find the surrounding points for `query`: `p1` is the latest point
    /// with `t <= query`, `p2` the earliest with `t > query`.
    fn surrounding(&self, query: u64) -> (Option<usize>, Option<usize>) {
        match self.points.binary_search_by_key(&query, |p| p.time_samples) {
            Ok(idx) => (Some(idx), self.points.get(idx + 1).map(|_| idx + 1)),
            Err(idx) => {
                let p1 = if idx == 0 { None } else { Some(idx - 1) };
                let p2 = if idx < self.points.len() { Some(idx) } else { None };
                (p1, p2)
            }
        }
    }

    /// Value at an arbitrary sample position (spec §4.D value-at-time
    /// query). Does not use or update the playback hint.
    pub fn value_at(&self, query: u64) -> f64 {
        if !self.enabled {
            return self.default_value;
        }
        let (p1, p2) = self.surrounding(query);
        self.resolve(p1, p2, query)
    }

    /// Sequential-playback fast path: walks the hint index forward or
    /// backward from its last position instead of binary-searching from
    /// scratch. Behaves identically to [`value_at`] for any query order,
    /// just faster for monotonically increasing queries.
    pub fn value_at_hint(&mut self, query: u64) -> f64 {
        if !self.enabled {
            return self.default_value;
        }
        if self.points.is_empty() {
            return self.default_value;
        }
        if self.hint_index >= self.points.len() {
            self.hint_index = self.points.len() - 1;
        }

        while self.hint_index + 1 < self.points.len()
            && self.points[self.hint_index + 1].time_samples <= query
        {
            self.hint_index += 1;
        }
        while self.hint_index > 0 && self.points[self.hint_index].time_samples > query {
            self.hint_index -= 1;
        }

        let p1 = if self.points[self.hint_index].time_samples <= query {
            Some(self.hint_index)
        } else {
            None
        };
        let p2 = self
            .points
            .get(self.hint_index + 1)
            .filter(|p| p.time_samples > query)
            .map(|_| self.hint_index + 1);

        self.resolve(p1, p2, query)
    }

    pub fn reset_playback_hint(&mut self) {
        self.hint_index = 0;
    }

    fn resolve(&self, p1: Option<usize>, p2: Option<usize>, query: u64) -> f64 {
        match (p1, p2) {
            (None, None) => self.default_value,
            (Some(i), None) => self.points[i].value,
            (None, Some(j)) => self.points[j].value,
            (Some(i), Some(j)) => {
                let p1 = &self.points[i];
                let p2 = &self.points[j];
                if p2.time_samples == p1.time_samples {
                    return p1.value;
                }
                let u = (query - p1.time_samples) as f64 / (p2.time_samples - p1.time_samples) as f64;
                let t = p1.curve.shape(u);
                (p1.value + (p2.value - p1.value) * t).clamp(0.0, 1.0)
            }
        }
    }

    // ---- editing operations (spec §4.D) ----

    /// Select every point with `time_samples ∈ [start, end]`, setting
    /// [`AutomationPoint::selected`] on the match and clearing it on every
    /// other point, then return the selected indices.
    pub fn select_range(&mut self, start: u64, end: u64) -> Vec<usize> {
        let mut selected = Vec::new();
        for (i, p) in self.points.iter_mut().enumerate() {
            p.selected = p.time_samples >= start && p.time_samples <= end;
            if p.selected {
                selected.push(i);
            }
        }
        selected
    }

    /// Clear selection on every point in the lane.
    pub fn deselect_all(&mut self) {
        for p in self.points.iter_mut() {
            p.selected = false;
        }
    }

    /// Move the selected points by `delta_time` (time clamped so no point
    /// goes below sample 0) and `delta_value` (clamped so no point leaves
    /// `[0,1]`), then re-sort to restore ordering.
    pub fn move_points(&mut self, indices: &[usize], delta_time: i64, delta_value: f64) {
        for &i in indices {
            if let Some(p) = self.points.get_mut(i) {
                let new_time = (p.time_samples as i64 + delta_time).max(0) as u64;
                p.time_samples = new_time;
                p.value = (p.value + delta_value).clamp(0.0, 1.0);
            }
        }
        self.resort();
    }

    /// Scale the selected points' values around `pivot_value` by `factor`.
    pub fn scale_points(&mut self, indices: &[usize], pivot_value: f64, factor: f64) {
        for &i in indices {
            if let Some(p) = self.points.get_mut(i) {
                p.value = (pivot_value + (p.value - pivot_value) * factor).clamp(0.0, 1.0);
            }
        }
    }

    pub fn set_curve(&mut self, indices: &[usize], curve: CurveType) {
        for &i in indices {
            if let Some(p) = self.points.get_mut(i) {
                p.curve = curve;
            }
        }
    }

    /// 3-point weighted-average smoothing: each selected interior point is
    /// blended toward the average of its neighbors by `strength ∈ [0,1]`.
    pub fn smooth(&mut self, indices: &[usize], strength: f64) {
        let strength = strength.clamp(0.0, 1.0);
        let snapshot = self.points.clone();
        for &i in indices {
            if i == 0 || i + 1 >= snapshot.len() {
                continue;
            }
            let neighbor_avg = (snapshot[i - 1].value + snapshot[i + 1].value) / 2.0;
            let current = snapshot[i].value;
            self.points[i].value = (current + (neighbor_avg - current) * strength).clamp(0.0, 1.0);
        }
    }

    /// Snap each selected point's time to the nearest multiple of
    /// `grid_samples`, rounding half-grid up, then re-sort.
    pub fn quantize_to_grid(&mut self, indices: &[usize], grid_samples: u64) {
        if grid_samples == 0 {
            return;
        }
        for &i in indices {
            if let Some(p) = self.points.get_mut(i) {
                let half = grid_samples / 2;
                p.time_samples = ((p.time_samples + half) / grid_samples) * grid_samples;
            }
        }
        self.resort();
    }

    /// Remove any selected interior point whose value differs from the
    /// straight interpolation between its neighbors by no more than
    /// `tolerance` — a classic Douglas-Peucker-style thinning pass for a
    /// single iteration (no recursion; spec defines single-pass removal).
    pub fn thin(&mut self, indices: &[usize], tolerance: f64) {
        let mut to_remove: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i > 0 && i + 1 < self.points.len())
            .filter(|&i| {
                let prev = &self.points[i - 1];
                let next = &self.points[i + 1];
                let u = (self.points[i].time_samples - prev.time_samples) as f64
                    / (next.time_samples - prev.time_samples) as f64;
                let t = prev.curve.shape(u);
                let interpolated = prev.value + (next.value - prev.value) * t;
                (interpolated - self.points[i].value).abs() <= tolerance
            })
            .collect();
        to_remove.sort_unstable_by(|a, b| b.cmp(a));
        for idx in to_remove {
            self.remove_at_index(idx);
        }
    }

    pub fn clear_range(&mut self, start: u64, end: u64) {
        self.points.retain(|p| p.time_samples < start || p.time_samples > end);
        self.hint_index = self.hint_index.min(self.points.len().saturating_sub(1));
    }

    fn resort(&mut self) {
        self.points.sort_by_key(|p| p.time_samples);
        self.hint_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn value_at_point_matches_point_exactly() {
        let mut lane = AutomationLane::new(0.0);
        lane.add_point(0, 0.0, CurveType::Linear);
        lane.add_point(44_100, 1.0, CurveType::Linear);
        assert_abs_diff_eq!(lane.value_at(0), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lane.value_at(44_100), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn linear_fade_in_scenario() {
        let mut lane = AutomationLane::new(0.0);
        lane.add_point(0, 0.0, CurveType::Linear);
        lane.add_point(44_100, 1.0, CurveType::Linear);
        assert_abs_diff_eq!(lane.value_at(22_050), 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(lane.value_at(88_200), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn overwrite_at_exact_time() {
        let mut lane = AutomationLane::new(0.0);
        lane.add_point(100, 0.2, CurveType::Linear);
        lane.add_point(100, 0.9, CurveType::Exponential);
        assert_eq!(lane.len(), 1);
        assert_abs_diff_eq!(lane.value_at(100), 0.9, epsilon = 1e-9);
    }

    #[test]
    fn hint_path_matches_binary_search_path() {
        let mut lane = AutomationLane::new(0.0);
        for i in 0..20 {
            lane.add_point(i * 1000, (i as f64) / 20.0, CurveType::Linear);
        }
        for t in (0..20_000).step_by(137) {
            let a = lane.value_at(t);
            let b = lane.value_at_hint(t);
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn empty_lane_returns_default() {
        let lane = AutomationLane::new(0.37);
        assert_eq!(lane.value_at(12345), 0.37);
    }

    #[test]
    fn quantize_snaps_to_grid() {
        let mut lane = AutomationLane::new(0.0);
        lane.add_point(1049, 0.5, CurveType::Linear);
        lane.quantize_to_grid(&[0], 1000);
        assert_eq!(lane.points()[0].time_samples, 1000);
    }

    #[test]
    fn select_range_marks_points_and_clears_outside() {
        let mut lane = AutomationLane::new(0.0);
        lane.add_point(0, 0.0, CurveType::Linear);
        lane.add_point(500, 0.5, CurveType::Linear);
        lane.add_point(1000, 1.0, CurveType::Linear);
        let selected = lane.select_range(400, 600);
        assert_eq!(selected, vec![1]);
        assert!(!lane.points()[0].selected);
        assert!(lane.points()[1].selected);
        assert!(!lane.points()[2].selected);

        lane.deselect_all();
        assert!(lane.points().iter().all(|p| !p.selected));
    }

    #[test]
    fn disabled_lane_reports_default_value() {
        let mut lane = AutomationLane::new(0.25);
        lane.add_point(0, 1.0, CurveType::Linear);
        lane.set_enabled(false);
        assert_eq!(lane.value_at(0), 0.25);
        assert_eq!(lane.value_at_hint(0), 0.25);
    }

    #[test]
    fn clear_range_removes_only_points_inside() {
        let mut lane = AutomationLane::new(0.0);
        lane.add_point(0, 0.0, CurveType::Linear);
        lane.add_point(500, 0.5, CurveType::Linear);
        lane.add_point(1000, 1.0, CurveType::Linear);
        lane.clear_range(400, 600);
        assert_eq!(lane.len(), 2);
    }
}
