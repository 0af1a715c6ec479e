//! Automation curve shapes and the segment interpolation formula
//! (spec §4.D). The Bezier shape is deliberately non-standard — see the
//! module-level note on [`CurveType::Bezier`].

use serde::{Deserialize, Serialize};

/// The curve applied across a segment, attached to its *starting* point —
/// `p1.curve` governs how `p1` blends into `p2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CurveType {
    Linear,
    Exponential,
    Logarithmic,
    /// Cubic Bezier with `P0 = 0`, `P1 = cp1`, `P2 = 1 + cp2`, `P3 = 1`.
    ///
    /// This produces values outside `[0, 1]` when `cp1 > 0` or `cp2 > 0` —
    /// a deliberate shape carried over unchanged from the source behavior
    /// (see design notes), not the standard `P1 = cp1, P2 = cp2`
    /// formulation. The final interpolated result is clamped to `[0, 1]`
    /// by the caller regardless.
    Bezier { cp1: f64, cp2: f64 },
    Smooth,
    Stepped,
}

impl Default for CurveType {
    fn default() -> Self {
        CurveType::Linear
    }
}

impl CurveType {
    /// Shape a normalized position `u ∈ [0, 1]` into a blend factor
    /// `t ∈ [0, 1]` per spec §4.D. Callers apply `value = v1 + (v2-v1)*t`.
    pub fn shape(&self, u: f64) -> f64 {
        let u = u.clamp(0.0, 1.0);
        let t = match self {
            CurveType::Linear => u,
            CurveType::Exponential => u * u,
            CurveType::Logarithmic => u.sqrt(),
            CurveType::Smooth => ((u - 0.5) * std::f64::consts::PI).sin() / 2.0 + 0.5,
            CurveType::Stepped => {
                if u < 1.0 {
                    0.0
                } else {
                    1.0
                }
            }
            CurveType::Bezier { cp1, cp2 } => cubic_bezier(u, 0.0, *cp1, 1.0 + cp2, 1.0),
        };
        t.clamp(0.0, 1.0)
    }
}

/// Evaluate a cubic Bezier's Y value parametrically at `u`, treating `u`
/// itself as the Bezier parameter (not an x-coordinate lookup) — matching
/// the source formulation this is grounded on.
fn cubic_bezier(u: f64, p0: f64, p1: f64, p2: f64, p3: f64) -> f64 {
    let inv = 1.0 - u;
    inv.powi(3) * p0 + 3.0 * inv.powi(2) * u * p1 + 3.0 * inv * u.powi(2) * p2 + u.powi(3) * p3
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn linear_is_identity() {
        assert_abs_diff_eq!(CurveType::Linear.shape(0.25), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn exponential_and_logarithmic_are_inverses_in_shape() {
        assert_abs_diff_eq!(CurveType::Exponential.shape(0.5), 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(CurveType::Logarithmic.shape(0.25), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn stepped_jumps_at_the_end() {
        assert_eq!(CurveType::Stepped.shape(0.99), 0.0);
        assert_eq!(CurveType::Stepped.shape(1.0), 1.0);
    }

    #[test]
    fn smooth_passes_through_midpoint() {
        assert_abs_diff_eq!(CurveType::Smooth.shape(0.5), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn bezier_endpoints_match_linear_regardless_of_control_points() {
        let curve = CurveType::Bezier { cp1: 0.3, cp2: -0.2 };
        assert_abs_diff_eq!(curve.shape(0.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.shape(1.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn bezier_is_clamped_when_control_points_push_outside_unit_range() {
        let curve = CurveType::Bezier { cp1: 0.9, cp2: 0.9 };
        let t = curve.shape(0.5);
        assert!((0.0..=1.0).contains(&t));
    }
}
