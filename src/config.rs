// ==============================================================================
// config.rs — VEHICLE PARAMETERS (LOADED ONCE, IMMUTABLE PER SIMULATION)
// ------------------------------------------------------------------------------
// VehicleParameters is the fully-resolved parameter record consumed by the
// dynamics core. It can be built in code (sports_coupe()), or loaded from a
// .toml / .json file. validate() is the single gate: the per-tick loop never
// re-checks anything here.
//
// GearSpeedTable holds the per-gear upshift / downshift road speeds. It is
// normally derived from the parameters (from_parameters) but may also be
// supplied by an external loader and checked with validate_for().
// ==============================================================================

use std::f32::consts::PI;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dynamics::curve::TractionCurve;
use crate::dynamics::types::{WheelId, NUM_WHEELS};
use crate::error::{ensure_positive, ensure_range, ConfigError};

/// Road speed buffer (m/s) subtracted from the lower gear's upshift speed to
/// get a gear's downshift speed.
pub const DOWNSHIFT_BUFFER: f32 = 2.0;

const RAD_PER_SEC_TO_RPM: f32 = 60.0 / (2.0 * PI);

// --------------------------------------------------
// Per-axle suspension
// --------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuspensionParameters {
    pub preload: f32,           // m, added to travel before multiplying stiffness
    pub stiffness: f32,         // kN/m
    pub anti_roll: f32,         // kN/m of left/right travel difference
    pub compression_ratio: f32, // fraction of critical damping
    pub rebound_ratio: f32,     // fraction of critical damping
    pub min_travel: f32,        // m, wheel center offset from mount at full droop (<= 0)
    pub max_travel: f32,        // m, wheel center offset from mount at full bump (>= 0)
}

impl SuspensionParameters {
    pub fn travel_total(&self) -> f32 {
        self.max_travel - self.min_travel
    }

    pub fn compression_coefficient(&self) -> f32 {
        self.compression_ratio * 2.0 * self.stiffness.sqrt()
    }

    pub fn rebound_coefficient(&self) -> f32 {
        self.rebound_ratio * 2.0 * self.stiffness.sqrt()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("suspension.stiffness", self.stiffness)?;
        ensure_positive("suspension.travel_total", self.travel_total())?;
        ensure_range("suspension.preload", self.preload, 0.0, f32::MAX)?;
        ensure_range("suspension.anti_roll", self.anti_roll, 0.0, f32::MAX)?;
        ensure_range("suspension.compression_ratio", self.compression_ratio, 0.0, 10.0)?;
        ensure_range("suspension.rebound_ratio", self.rebound_ratio, 0.0, 10.0)?;
        Ok(())
    }
}

// --------------------------------------------------
// Per-wheel
// --------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelParameters {
    pub mount: [f32; 3],  // chassis-local wheel center at rest travel offset 0
    pub radius: f32,      // m
    pub mass: f32,        // kg
    pub width: f32,       // m
    pub wear_rate: f32,   // wear per second at full over-slip
}

impl WheelParameters {
    /// Solid-disc rotational inertia.
    pub fn inertia(&self) -> f32 {
        0.5 * self.mass * self.radius * self.radius
    }

    fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("wheel.radius", self.radius)?;
        ensure_positive("wheel.mass", self.mass)?;
        ensure_range("wheel.width", self.width, 0.0, f32::MAX)?;
        ensure_range("wheel.wear_rate", self.wear_rate, 0.0, f32::MAX)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TireParameters {
    pub longitudinal: TractionCurve, // slip ratio domain
    pub lateral: TractionCurve,      // slip angle domain (radians)
}

// --------------------------------------------------
// Engine + drivetrain
// --------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorquePoint {
    pub rpm: f32,
    pub torque: f32, // N*m at the crank
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineParameters {
    pub idle_rpm: f32,
    pub max_rpm: f32,
    pub clutch_rpm: f32,         // first-gear anti-stall floor at standstill
    pub idle_drag: f32,          // N*m per rpm above idle, off-throttle
    pub flywheel_inertia: f32,   // kg*m^2 added to driven wheels
    pub fuel_capacity: f32,      // litres
    pub fuel_rate: f32,          // litres per (1000 rpm * s) at full throttle
    #[serde(default)]
    pub simulate_fuel: bool,
    pub torque_curve: Vec<TorquePoint>,
}

impl EngineParameters {
    /// Piecewise-linear torque lookup, clamped to the curve's end points.
    pub fn torque_at(&self, rpm: f32) -> f32 {
        let curve = &self.torque_curve;
        let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
            return 0.0;
        };
        if rpm <= first.rpm {
            return first.torque;
        }
        if rpm >= last.rpm {
            return last.torque;
        }
        for pair in curve.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if rpm <= b.rpm {
                let t = (rpm - a.rpm) / (b.rpm - a.rpm);
                return a.torque + (b.torque - a.torque) * t;
            }
        }
        last.torque
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.torque_curve.is_empty() {
            return Err(ConfigError::EmptyTorqueCurve);
        }
        for (index, pair) in self.torque_curve.windows(2).enumerate() {
            if !(pair[1].rpm > pair[0].rpm) {
                return Err(ConfigError::UnsortedTorqueCurve { index: index + 1 });
            }
        }
        ensure_positive("engine.idle_rpm", self.idle_rpm)?;
        ensure_range("engine.max_rpm", self.max_rpm, self.idle_rpm + 1.0, f32::MAX)?;
        ensure_range("engine.clutch_rpm", self.clutch_rpm, self.idle_rpm, self.max_rpm)?;
        ensure_range("engine.idle_drag", self.idle_drag, 0.0, f32::MAX)?;
        ensure_range("engine.flywheel_inertia", self.flywheel_inertia, 0.0, f32::MAX)?;
        ensure_range("engine.fuel_capacity", self.fuel_capacity, 0.0, f32::MAX)?;
        ensure_range("engine.fuel_rate", self.fuel_rate, 0.0, f32::MAX)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivetrainParameters {
    pub front_drive: bool,
    pub rear_drive: bool,
    pub rear_balance: f32,     // AWD split: 0 = all front, 1 = all rear
    pub gear_ratios: Vec<f32>, // [reverse, 1st, 2nd, ...]
    pub final_drive: f32,
    pub efficiency: f32,       // 0..1
    pub shift_duration: f32,   // s, engine disconnected while shifting
    pub shift_up_rpm: f32,
}

impl DrivetrainParameters {
    pub fn is_driven(&self, id: WheelId) -> bool {
        if id.is_front() { self.front_drive } else { self.rear_drive }
    }

    pub fn top_gear(&self) -> usize {
        self.gear_ratios.len().saturating_sub(1)
    }

    /// Share of the drive torque delivered to one wheel.
    pub fn torque_share(&self, id: WheelId) -> f32 {
        match (self.front_drive, self.rear_drive) {
            (true, true) => {
                let axle = if id.is_front() { 1.0 - self.rear_balance } else { self.rear_balance };
                axle * 0.5
            }
            (true, false) if id.is_front() => 0.5,
            (false, true) if id.is_rear() => 0.5,
            _ => 0.0,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.front_drive && !self.rear_drive {
            return Err(ConfigError::NoDriveWheels);
        }
        if self.gear_ratios.len() < 2 {
            return Err(ConfigError::NoForwardGears);
        }
        for &ratio in &self.gear_ratios {
            ensure_positive("drivetrain.gear_ratios", ratio)?;
        }
        ensure_positive("drivetrain.final_drive", self.final_drive)?;
        ensure_range("drivetrain.efficiency", self.efficiency, f32::MIN_POSITIVE, 1.0)?;
        ensure_range("drivetrain.rear_balance", self.rear_balance, 0.0, 1.0)?;
        ensure_range("drivetrain.shift_duration", self.shift_duration, 0.0, 10.0)?;
        ensure_positive("drivetrain.shift_up_rpm", self.shift_up_rpm)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrakeParameters {
    pub max_torque: f32,          // N*m per wheel at full pedal
    pub abs_timeout: f32,         // s brake release after lockup; 0 disables ABS
    pub traction_control: bool,
    pub traction_max_slip: f32,   // rad, drift angle reference for intervention
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AeroParameters {
    pub drag_coefficient: f32,
    pub cross_section: f32,       // m^2
    pub downforce_coefficient: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChassisParameters {
    pub half_extents: [f32; 3], // [hx, hy, hz] meters
    pub com_offset: [f32; 3],   // local offset of the collider from the body origin
}

// --------------------------------------------------
// Whole vehicle
// --------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleParameters {
    pub mass: f32, // kg
    pub chassis: ChassisParameters,
    pub aero: AeroParameters,
    pub front_suspension: SuspensionParameters,
    pub rear_suspension: SuspensionParameters,
    pub wheels: [WheelParameters; NUM_WHEELS], // FL, FR, RL, RR
    pub tires: TireParameters,
    pub engine: EngineParameters,
    pub drivetrain: DrivetrainParameters,
    pub brakes: BrakeParameters,
}

impl VehicleParameters {
    pub fn suspension(&self, id: WheelId) -> &SuspensionParameters {
        if id.is_front() { &self.front_suspension } else { &self.rear_suspension }
    }

    pub fn wheel(&self, id: WheelId) -> &WheelParameters {
        &self.wheels[id.index()]
    }

    /// Mean radius of the driven wheels.
    pub fn drive_wheel_radius(&self) -> Result<f32, ConfigError> {
        let driven: Vec<f32> = WheelId::ALL
            .iter()
            .filter(|id| self.drivetrain.is_driven(**id))
            .map(|id| self.wheel(*id).radius)
            .collect();
        if driven.is_empty() {
            return Err(ConfigError::NoDriveWheels);
        }
        Ok(driven.iter().sum::<f32>() / driven.len() as f32)
    }

    /// Road speed (m/s) at `rpm` in `gear`, assuming no wheel slip.
    pub fn road_speed_at(&self, gear: usize, rpm: f32, drive_radius: f32) -> f32 {
        let ratio = self.drivetrain.gear_ratios.get(gear).copied().unwrap_or(1.0);
        rpm / RAD_PER_SEC_TO_RPM / (ratio * self.drivetrain.final_drive) * drive_radius
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("mass", self.mass)?;
        for half in self.chassis.half_extents {
            ensure_positive("chassis.half_extents", half)?;
        }
        ensure_range("aero.drag_coefficient", self.aero.drag_coefficient, 0.0, f32::MAX)?;
        ensure_range("aero.cross_section", self.aero.cross_section, 0.0, f32::MAX)?;
        self.front_suspension.validate()?;
        self.rear_suspension.validate()?;
        for wheel in &self.wheels {
            wheel.validate()?;
        }
        self.tires.longitudinal.validate("tires.longitudinal")?;
        self.tires.lateral.validate("tires.lateral")?;
        self.engine.validate()?;
        self.drivetrain.validate()?;
        ensure_range("brakes.max_torque", self.brakes.max_torque, 0.0, f32::MAX)?;
        ensure_range("brakes.abs_timeout", self.brakes.abs_timeout, 0.0, 10.0)?;
        ensure_positive("brakes.traction_max_slip", self.brakes.traction_max_slip)?;
        self.drive_wheel_radius()?;
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let params: Self = toml::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let params: Self = serde_json::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    /// Load a parameter file, picking the parser from the extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Rear-drive coupe, roughly 1250 kg.
    pub fn sports_coupe() -> Self {
        let suspension = SuspensionParameters {
            preload: 0.05,
            stiffness: 20.0,
            anti_roll: 8.0,
            compression_ratio: 0.35,
            rebound_ratio: 0.5,
            min_travel: -0.12,
            max_travel: 0.08,
        };
        let wheel = |x: f32, z: f32| WheelParameters {
            mount: [x, -0.2, z],
            radius: 0.33,
            mass: 18.0,
            width: 0.225,
            wear_rate: 0.002,
        };

        Self {
            mass: 1250.0,
            chassis: ChassisParameters {
                half_extents: [0.9, 0.35, 2.1],
                com_offset: [0.0, 0.1, 0.0],
            },
            aero: AeroParameters {
                drag_coefficient: 0.32,
                cross_section: 2.0,
                downforce_coefficient: 0.3,
            },
            front_suspension: suspension,
            rear_suspension: SuspensionParameters { anti_roll: 5.0, ..suspension },
            wheels: [
                wheel(0.78, 1.3),
                wheel(-0.78, 1.3),
                wheel(0.78, -1.25),
                wheel(-0.78, -1.25),
            ],
            tires: TireParameters {
                longitudinal: TractionCurve {
                    peak_slip: 0.12,
                    peak_force: 1.1,
                    peak_length: 0.08,
                    decay_rate: 1.5,
                },
                lateral: TractionCurve {
                    peak_slip: 0.14,
                    peak_force: 1.0,
                    peak_length: 0.1,
                    decay_rate: 1.2,
                },
            },
            engine: EngineParameters {
                torque_curve: vec![
                    TorquePoint { rpm: 0.0, torque: 150.0 },
                    TorquePoint { rpm: 1000.0, torque: 220.0 },
                    TorquePoint { rpm: 3000.0, torque: 300.0 },
                    TorquePoint { rpm: 5000.0, torque: 320.0 },
                    TorquePoint { rpm: 6500.0, torque: 290.0 },
                    TorquePoint { rpm: 7500.0, torque: 250.0 },
                ],
                idle_rpm: 900.0,
                max_rpm: 7500.0,
                clutch_rpm: 2500.0,
                idle_drag: 0.08,
                flywheel_inertia: 0.25,
                fuel_capacity: 50.0,
                fuel_rate: 0.0005,
                simulate_fuel: false,
            },
            drivetrain: DrivetrainParameters {
                front_drive: false,
                rear_drive: true,
                rear_balance: 1.0,
                gear_ratios: vec![3.2, 3.4, 2.1, 1.5, 1.15, 0.92, 0.76],
                final_drive: 3.9,
                efficiency: 0.85,
                shift_duration: 0.25,
                shift_up_rpm: 6800.0,
            },
            brakes: BrakeParameters {
                max_torque: 2500.0,
                abs_timeout: 0.08,
                traction_control: true,
                traction_max_slip: 0.2,
            },
        }
    }
}

// ==============================================================================
// Gear speed lookup
// ==============================================================================

/// Upshift / downshift road speeds per gear index (index 0 = reverse, unused).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearSpeedTable {
    pub upshift: Vec<f32>,
    pub downshift: Vec<f32>,
}

impl GearSpeedTable {
    pub fn from_parameters(params: &VehicleParameters) -> Result<Self, ConfigError> {
        let radius = params.drive_wheel_radius()?;
        let gears = params.drivetrain.gear_ratios.len();
        let shift_rpm = params.drivetrain.shift_up_rpm.min(params.engine.max_rpm);

        let upshift: Vec<f32> = (0..gears)
            .map(|gear| if gear == 0 { 0.0 } else { params.road_speed_at(gear, shift_rpm, radius) })
            .collect();

        let downshift: Vec<f32> = (0..gears)
            .map(|gear| if gear <= 1 { 0.0 } else { upshift[gear - 1] - DOWNSHIFT_BUFFER })
            .collect();

        Ok(Self { upshift, downshift })
    }

    pub fn validate_for(&self, params: &VehicleParameters) -> Result<(), ConfigError> {
        let expected = params.drivetrain.gear_ratios.len();
        for found in [self.upshift.len(), self.downshift.len()] {
            if found != expected {
                return Err(ConfigError::GearTableMismatch { expected, found });
            }
        }
        Ok(())
    }

    pub fn upshift_speed(&self, gear: usize) -> f32 {
        self.upshift.get(gear).copied().unwrap_or(f32::MAX)
    }

    pub fn downshift_speed(&self, gear: usize) -> f32 {
        self.downshift.get(gear).copied().unwrap_or(f32::MIN)
    }
}
