// ==============================================================================
// curve.rs — STEPPED TRACTION CURVE
// ------------------------------------------------------------------------------
// Three-segment grip curve shared by the longitudinal (slip ratio) and lateral
// (slip angle) tire directions:
//
//   slip < S          : linear ramp      T * slip / S
//   S <= slip <= S+L  : plateau          T
//   slip > S+L        : linear decay     T + (S+L - slip) * D, floored at T/2
//
// Odd symmetric: f(-slip) = -f(slip). Output is dimensionless grip; the
// traction model multiplies it by the normal load.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, ensure_range, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TractionCurve {
    pub peak_slip: f32,   // S
    pub peak_force: f32,  // T
    pub peak_length: f32, // L
    pub decay_rate: f32,  // D
}

impl TractionCurve {
    #[inline]
    pub fn force(&self, slip: f32) -> f32 {
        stepped_traction(slip, self.peak_slip, self.peak_force, self.peak_length, self.decay_rate)
    }

    pub(crate) fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        ensure_positive(field, self.peak_slip)?;
        ensure_positive(field, self.peak_force)?;
        ensure_range(field, self.peak_length, 0.0, f32::MAX)?;
        ensure_range(field, self.decay_rate, 0.0, f32::MAX)?;
        Ok(())
    }
}

pub fn stepped_traction(
    slip: f32,
    peak_slip: f32,
    peak_force: f32,
    peak_length: f32,
    decay_rate: f32,
) -> f32 {
    if slip < 0.0 {
        return -stepped_traction(-slip, peak_slip, peak_force, peak_length, decay_rate);
    }

    let plateau_end = peak_slip + peak_length;

    if slip < peak_slip {
        peak_force * slip / peak_slip
    } else if slip <= plateau_end {
        peak_force
    } else {
        (peak_force + (plateau_end - slip) * decay_rate).max(peak_force * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CURVE: TractionCurve = TractionCurve {
        peak_slip: 0.1,
        peak_force: 1.2,
        peak_length: 0.05,
        decay_rate: 2.0,
    };

    fn sweep() -> impl Iterator<Item = f32> {
        (0..=400).map(|i| i as f32 * 0.0125)
    }

    #[test]
    fn odd_symmetry() {
        for slip in sweep() {
            assert_eq!(CURVE.force(-slip), -CURVE.force(slip));
        }
    }

    #[test]
    fn decay_never_drops_below_half_peak() {
        for slip in sweep().filter(|s| *s > CURVE.peak_slip + CURVE.peak_length) {
            assert!(CURVE.force(slip) >= CURVE.peak_force * 0.5);
        }
        assert_eq!(CURVE.force(1000.0), 0.6);
    }

    #[test]
    fn continuous_at_breakpoints() {
        let s = CURVE.peak_slip;
        let l = CURVE.peak_length;
        assert_eq!(CURVE.force(s), CURVE.peak_force);
        assert_eq!(CURVE.force(s + l), CURVE.peak_force);
        assert_relative_eq!(CURVE.force(s - 1e-4), CURVE.peak_force, epsilon = 1e-2);
        assert_relative_eq!(CURVE.force(s + l + 1e-4), CURVE.peak_force, epsilon = 1e-2);
    }

    #[test]
    fn segments() {
        assert_eq!(CURVE.force(0.0), 0.0);
        assert_relative_eq!(CURVE.force(0.05), 0.6, epsilon = 1e-6);
        assert_eq!(CURVE.force(0.125), 1.2);
        // 1.2 + (0.15 - 0.35) * 2.0
        assert_relative_eq!(CURVE.force(0.35), 0.8, epsilon = 1e-5);
    }
}
