//! Pre-baked automation shape generators (spec §4.D "lane factories", §9
//! "generators/LFO"). Each shape is a finite, restartable iterator over
//! `(time_samples, value)` pairs that is a pure function of its
//! parameters — constructing it twice with the same arguments yields the
//! same sequence.

use crate::curve::CurveType;
use crate::point::AutomationPoint;

/// Waveform shape for [`lfo_points`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoShape {
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

impl LfoShape {
    /// Evaluate the waveform at phase `p ∈ [0, 1)`, returning a value in
    /// `[-1, 1]`.
    fn sample(self, phase: f64) -> f64 {
        let p = phase.rem_euclid(1.0);
        match self {
            LfoShape::Sine => (p * 2.0 * std::f64::consts::PI).sin(),
            LfoShape::Triangle => 4.0 * (p - (p + 0.5).floor()).abs() - 1.0,
            LfoShape::Sawtooth => 2.0 * p - 1.0,
            LfoShape::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

/// Finite iterator sampling an LFO at a fixed number of evenly spaced
/// points across `duration_samples`, starting at `start_samples`.
pub struct LfoGenerator {
    start_samples: u64,
    duration_samples: u64,
    sample_rate_hz: f64,
    rate_hz: f64,
    depth: f64,
    center: f64,
    shape: LfoShape,
    num_points: usize,
    index: usize,
}

impl LfoGenerator {
    pub fn new(
        start_samples: u64,
        duration_samples: u64,
        sample_rate_hz: f64,
        shape: LfoShape,
        rate_hz: f64,
        depth: f64,
        center: f64,
        num_points: usize,
    ) -> Self {
        Self {
            start_samples,
            duration_samples,
            sample_rate_hz,
            rate_hz,
            depth: depth.clamp(0.0, 1.0),
            center: center.clamp(0.0, 1.0),
            shape,
            num_points: num_points.max(2),
            index: 0,
        }
    }
}

impl Iterator for LfoGenerator {
    type Item = (u64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.num_points {
            return None;
        }
        let fraction = self.index as f64 / (self.num_points - 1) as f64;
        let offset_samples = (fraction * self.duration_samples as f64).round() as u64;
        let time_seconds = offset_samples as f64 / self.sample_rate_hz;
        let phase = time_seconds * self.rate_hz;
        let raw = self.shape.sample(phase);
        let value = (self.center + raw * self.depth * 0.5).clamp(0.0, 1.0);
        self.index += 1;
        Some((self.start_samples + offset_samples, value))
    }
}

fn points_from_pairs(pairs: impl IntoIterator<Item = (u64, f64)>, curve: CurveType) -> Vec<AutomationPoint> {
    pairs.into_iter().map(|(t, v)| AutomationPoint::new(t, v, curve)).collect()
}

/// Two-point straight ramp from `start_value` to `end_value`.
pub fn linear_ramp(start_samples: u64, duration_samples: u64, start_value: f64, end_value: f64) -> Vec<AutomationPoint> {
    vec![
        AutomationPoint::new(start_samples, start_value, CurveType::Linear),
        AutomationPoint::new(start_samples + duration_samples, end_value, CurveType::Linear),
    ]
}

/// Exponential fade: in (0 → 1, slow start) or out (1 → 0, using the
/// logarithmic shape so the fade-out feels symmetric to a fade-in).
pub fn exponential_fade(start_samples: u64, duration_samples: u64, fade_in: bool) -> Vec<AutomationPoint> {
    let (start_value, end_value, curve) = if fade_in {
        (0.0, 1.0, CurveType::Exponential)
    } else {
        (1.0, 0.0, CurveType::Logarithmic)
    };
    vec![
        AutomationPoint::new(start_samples, start_value, curve),
        AutomationPoint::new(start_samples + duration_samples, end_value, CurveType::Linear),
    ]
}

/// Sample an LFO shape into a point list with `num_points` samples across
/// the duration.
pub fn lfo_points(
    start_samples: u64,
    duration_samples: u64,
    sample_rate_hz: f64,
    shape: LfoShape,
    rate_hz: f64,
    depth: f64,
    center: f64,
    num_points: usize,
) -> Vec<AutomationPoint> {
    points_from_pairs(
        LfoGenerator::new(start_samples, duration_samples, sample_rate_hz, shape, rate_hz, depth, center, num_points),
        CurveType::Linear,
    )
}

/// Auto-pan: a centered sine LFO over the pan parameter.
pub fn auto_pan(start_samples: u64, duration_samples: u64, sample_rate_hz: f64, rate_hz: f64, depth: f64, num_points: usize) -> Vec<AutomationPoint> {
    lfo_points(start_samples, duration_samples, sample_rate_hz, LfoShape::Sine, rate_hz, depth, 0.5, num_points)
}

/// Alternating high/low stepped gate pattern.
pub fn gate_pattern(
    start_samples: u64,
    duration_samples: u64,
    on_samples: u64,
    off_samples: u64,
    high_value: f64,
    low_value: f64,
) -> Vec<AutomationPoint> {
    let cycle = on_samples + off_samples;
    if cycle == 0 {
        return Vec::new();
    }
    let mut points = Vec::new();
    let mut t = start_samples;
    let end = start_samples + duration_samples;
    while t < end {
        points.push(AutomationPoint::new(t, high_value, CurveType::Stepped));
        let off_start = t + on_samples;
        if off_start < end {
            points.push(AutomationPoint::new(off_start, low_value, CurveType::Stepped));
        }
        t += cycle;
    }
    points
}

/// Linear build-up ramp that drops instantly to `drop_value` at
/// `drop_fraction` of the duration.
pub fn build_up_drop(start_samples: u64, duration_samples: u64, drop_fraction: f64, build_value: f64, drop_value: f64) -> Vec<AutomationPoint> {
    let drop_fraction = drop_fraction.clamp(0.0, 1.0);
    let drop_time = start_samples + (duration_samples as f64 * drop_fraction).round() as u64;
    vec![
        AutomationPoint::new(start_samples, 0.0, CurveType::Exponential),
        AutomationPoint::new(drop_time, build_value, CurveType::Stepped),
        AutomationPoint::new(drop_time + 1, drop_value, CurveType::Linear),
        AutomationPoint::new(start_samples + duration_samples, drop_value, CurveType::Linear),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_ramp_has_two_endpoints() {
        let points = linear_ramp(0, 1000, 0.0, 1.0);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 0.0);
        assert_eq!(points[1].value, 1.0);
    }

    #[test]
    fn lfo_generator_is_restartable_and_pure() {
        let a: Vec<_> = LfoGenerator::new(0, 48_000, 48_000.0, LfoShape::Sine, 1.0, 1.0, 0.5, 10).collect();
        let b: Vec<_> = LfoGenerator::new(0, 48_000, 48_000.0, LfoShape::Sine, 1.0, 1.0, 0.5, 10).collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
    }

    #[test]
    fn gate_pattern_alternates_high_low() {
        let points = gate_pattern(0, 4000, 1000, 1000, 1.0, 0.0);
        assert!(points.len() >= 4);
        assert_eq!(points[0].value, 1.0);
        assert_eq!(points[1].value, 0.0);
    }

    #[test]
    fn square_lfo_is_bistable() {
        for i in 0..20 {
            let phase = i as f64 / 20.0;
            let v = LfoShape::Square.sample(phase);
            assert!(v == 1.0 || v == -1.0);
        }
    }
}
