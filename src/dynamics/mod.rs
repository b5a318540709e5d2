//! dynamics - engine-agnostic vehicle simulation core (suspension, tires, drivetrain)

pub mod types;
pub mod curve;
pub mod wheel;
pub mod kinematics;
pub mod backend;
pub mod suspension;
pub mod traction;
pub mod drivetrain;
pub mod transmission;
pub mod aero;
pub mod telemetry;
pub mod vehicle;

pub use types::*;
pub use backend::{BodyRef, BodyState, PhysicsBackend, RayHit};
pub use vehicle::VehicleSim;

// ====================================================================
// Tuning constants
// ====================================================================

/// Converts suspension stiffness units (kN/m) into force units. Empirical.
pub const SUSPENSION_FORCE_SCALE: f32 = 1000.0;

/// kg/m^3 at sea level.
pub const AIR_DENSITY: f32 = 1.225;

/// rad/s divergence between free-rolling and braked wheel speed that counts as lockup.
pub const ABS_SLIP_THRESHOLD: f32 = 10.0;

/// s of forced braking after a traction-control intervention.
pub const TC_COOLDOWN: f32 = 0.1;

/// (m/s)^2, traction control stays out below this speed.
pub const TC_MIN_SPEED_SQ: f32 = 25.0;

/// m/s, tire wear is not accumulated below this speed.
pub const WEAR_MIN_SPEED: f32 = 2.0;

/// Grip lost at full wear (1.0 - WEAR_GRIP_LOSS remains).
pub const WEAR_GRIP_LOSS: f32 = 0.5;

/// m/s substituted for |v_forward| in slip-ratio division.
pub const GROUND_SPEED_EPSILON: f32 = 0.01;

/// Accelerator input treated as "off" for engine braking.
pub const THROTTLE_DEADZONE: f32 = 0.01;
