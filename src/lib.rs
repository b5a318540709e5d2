//! vehicle_physics - raycast vehicle dynamics (suspension, slip tires, drivetrain)
//! plus a rapier3d host world.

pub mod config;
pub mod dynamics;
pub mod error;
pub mod physics;
pub mod upgrade;

pub use config::{GearSpeedTable, VehicleParameters};
pub use dynamics::{BodyRef, DrivingInputs, PhysicsBackend, VehicleSim, WheelId};
pub use error::ConfigError;
