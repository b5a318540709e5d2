//! Core shared types for `dynamics` (engine-agnostic).
use std::fmt;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

pub type Vec3 = Vector3<f32>;
pub type Pos3 = Point3<f32>;

/// Chassis-local up axis. Suspension rays travel along `-LOCAL_UP`.
pub const LOCAL_UP: Vec3 = Vector3::new(0.0, 1.0, 0.0);
/// Chassis-local forward axis (+Z forward, +X left, +Y up).
pub const LOCAL_FORWARD: Vec3 = Vector3::new(0.0, 0.0, 1.0);
/// Chassis-local left axis.
pub const LOCAL_LEFT: Vec3 = Vector3::new(1.0, 0.0, 0.0);

pub const NUM_WHEELS: usize = 4;

// ============================================
// Wheel identification
// ============================================

/// Index layout is fixed: 0=FL, 1=FR, 2=RL, 3=RR.
/// Even indices are left wheels, indices below 2 are on the front axle.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum WheelId { FL, FR, RL, RR }

impl WheelId {
    pub const ALL: [WheelId; NUM_WHEELS] = [WheelId::FL, WheelId::FR, WheelId::RL, WheelId::RR];

    pub fn from_index(index: usize) -> Self {
        match index {
            0 => WheelId::FL,
            1 => WheelId::FR,
            2 => WheelId::RL,
            _ => WheelId::RR,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            WheelId::FL => 0,
            WheelId::FR => 1,
            WheelId::RL => 2,
            WheelId::RR => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelId::FL => "FL",
            WheelId::FR => "FR",
            WheelId::RL => "RL",
            WheelId::RR => "RR",
        }
    }

    pub fn is_front(&self) -> bool {
        self.index() < 2
    }

    pub fn is_rear(&self) -> bool {
        !self.is_front()
    }

    pub fn is_left(&self) -> bool {
        self.index() % 2 == 0
    }

    /// The other wheel on the same axle (0↔1, 2↔3).
    pub fn opposite(&self) -> WheelId {
        WheelId::from_index(self.index() ^ 1)
    }
}

impl fmt::Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// ----- inputs -------------------------------
// ============================================

/// Per-tick driver (or AI) input record. Read-only for the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DrivingInputs {
    pub accelerator: f32, // 0..1
    pub brake: f32,       // 0..1
    pub steering: f32,    // radians, +left
    pub handbrake: bool,
}

impl DrivingInputs {
    /// Clamp pedal values into their valid ranges.
    pub fn sanitized(self) -> Self {
        Self {
            accelerator: finite_or_zero(self.accelerator).clamp(0.0, 1.0),
            brake: finite_or_zero(self.brake).clamp(0.0, 1.0),
            steering: finite_or_zero(self.steering),
            handbrake: self.handbrake,
        }
    }
}

#[inline]
pub fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}

/// Sign that maps zero to zero (`f32::signum` maps +0.0 to 1.0).
#[inline]
pub fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_layout_parity() {
        for id in WheelId::ALL {
            assert_eq!(WheelId::from_index(id.index()), id);
            assert_eq!(id.is_left(), id.index() % 2 == 0);
            assert_eq!(id.opposite().opposite(), id);
            assert_eq!(id.opposite().is_front(), id.is_front());
        }
        assert_eq!(WheelId::FL.opposite(), WheelId::FR);
        assert_eq!(WheelId::RR.opposite(), WheelId::RL);
        assert!(WheelId::FR.is_front() && WheelId::RL.is_rear());
    }

    #[test]
    fn sign_of_zero_is_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.0), 0.0);
        assert_eq!(sign(-3.0), -1.0);
    }

    #[test]
    fn sanitized_inputs_are_clamped() {
        let raw =
            DrivingInputs { accelerator: 1.7, brake: f32::NAN, steering: 0.2, handbrake: true };
        let s = raw.sanitized();
        assert_eq!(s.accelerator, 1.0);
        assert_eq!(s.brake, 0.0);
        assert_eq!(s.steering, 0.2);
        assert!(s.handbrake);
    }
}
