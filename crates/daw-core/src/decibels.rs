//! Decibel value wrapper shared by bus gain, send levels, and meter readouts.

use serde::{Deserialize, Serialize};

/// A gain expressed in decibels.
///
/// Bus gain is clamped to `[-70, +20]` (spec §3); `-70` dB and below is
/// treated as `-inf` linear gain by [`Decibels::to_gain`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decibels(pub f64);

impl Decibels {
    pub const ZERO: Self = Self(0.0);
    pub const NEG_INF: Self = Self(f64::NEG_INFINITY);

    /// Lowest bus gain before it is treated as silence (spec §3).
    pub const SILENCE_FLOOR: f64 = -70.0;
    /// Highest bus gain (spec §3).
    pub const MAX_GAIN: f64 = 20.0;

    #[inline]
    pub fn from_gain(gain: f64) -> Self {
        if gain <= 0.0 {
            Self::NEG_INF
        } else {
            Self(20.0 * gain.log10())
        }
    }

    /// Convert to a linear amplitude multiplier. Values at or below the
    /// silence floor collapse to `0.0` rather than a tiny non-zero value.
    #[inline]
    pub fn to_gain(self) -> f64 {
        if self.0 <= Self::SILENCE_FLOOR {
            0.0
        } else {
            10.0_f64.powf(self.0 / 20.0)
        }
    }

    /// Clamp to the bus gain range from spec §3.
    #[inline]
    pub fn clamp_bus_range(self) -> Self {
        if self.0 <= Self::SILENCE_FLOOR {
            Self::NEG_INF
        } else {
            Self(self.0.min(Self::MAX_GAIN))
        }
    }
}

impl Default for Decibels {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_db_is_unity_gain() {
        assert!((Decibels::ZERO.to_gain() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn silence_floor_collapses_to_zero_gain() {
        assert_eq!(Decibels(-70.0).to_gain(), 0.0);
        assert_eq!(Decibels(-90.0).to_gain(), 0.0);
    }

    #[test]
    fn minus_twelve_db_round_trips() {
        let gain = Decibels(-12.0).to_gain();
        assert!((gain - 0.2512).abs() < 1e-3);
        let back = Decibels::from_gain(gain);
        assert!((back.0 - (-12.0)).abs() < 1e-6);
    }

    #[test]
    fn clamp_respects_ceiling_and_floor() {
        assert_eq!(Decibels(40.0).clamp_bus_range().0, 20.0);
        assert_eq!(Decibels(-100.0).clamp_bus_range(), Decibels::NEG_INF);
    }
}
