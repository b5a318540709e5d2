// ==============================================================================
// drivetrain.rs — ENGINE + DRIVELINE
// ------------------------------------------------------------------------------
// Runs once per tick BEFORE the wheels, using last tick's wheel speeds:
//
// 1) rpm = |mean driven ω| * ratio * final_drive * 60/2π, floored at idle
//    (first gear launch: floor raised toward clutch_rpm while slow)
// 2) gearbox update (may start or finish a shift)
// 3) crank torque = curve(rpm) * throttle
//      zero above max_rpm (limiter) or while a shift is in progress
// 4) engine drag  = (rpm - idle) * idle_drag * sign(ω)   (throttle off only)
// 5) wheel torque = crank * ratio * final * efficiency - drag
//    split across the driven wheels by DrivetrainParameters::torque_share()
// 6) fuel burn ~ rpm/1000 * throttle * fuel_rate * dt
// ==============================================================================

use std::f32::consts::PI;

use crate::config::{GearSpeedTable, VehicleParameters};
use crate::dynamics::transmission::{GearState, ShiftInputs, Transmission};
use crate::dynamics::types::{sign, WheelId, NUM_WHEELS};
use crate::dynamics::wheel::WheelState;
use crate::dynamics::THROTTLE_DEADZONE;
use crate::error::ConfigError;

const RAD_PER_SEC_TO_RPM: f32 = 60.0 / (2.0 * PI);

/// Observable engine state.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub gear_state: GearState,
    pub rpm: f32,
    pub torque: f32,        // N*m at the crank
    pub output_torque: f32, // N*m after gearing, before the split
    pub wheel_torque: [f32; NUM_WHEELS],
    pub fuel: f32, // litres
}

impl EngineState {
    pub fn gear(&self) -> usize {
        self.gear_state.gear()
    }

    pub fn power_kw(&self) -> f32 {
        self.torque * self.rpm / RAD_PER_SEC_TO_RPM / 1000.0
    }
}

#[derive(Debug, Clone)]
pub struct Drivetrain {
    pub state: EngineState,
    gearbox: Transmission,
    gears: GearSpeedTable,
    drive_radius: f32,
    launch_speed: f32, // m/s at clutch_rpm in first gear
}

impl Drivetrain {
    pub fn new(params: &VehicleParameters, gears: GearSpeedTable) -> Result<Self, ConfigError> {
        gears.validate_for(params)?;
        let drive_radius = params.drive_wheel_radius()?;
        let launch_speed = params.road_speed_at(1, params.engine.clutch_rpm, drive_radius);
        let gearbox = Transmission::new(
            params.drivetrain.gear_ratios.clone(),
            params.engine.max_rpm,
            params.drivetrain.shift_duration,
        );

        Ok(Self {
            state: EngineState {
                gear_state: gearbox.state,
                rpm: params.engine.idle_rpm,
                torque: 0.0,
                output_torque: 0.0,
                wheel_torque: [0.0; NUM_WHEELS],
                fuel: params.engine.fuel_capacity,
            },
            gearbox,
            gears,
            drive_radius,
            launch_speed,
        })
    }

    pub fn gears(&self) -> &GearSpeedTable {
        &self.gears
    }

    pub fn drive_radius(&self) -> f32 {
        self.drive_radius
    }

    pub fn request_gear(&mut self, gear: usize) -> bool {
        let accepted = self.gearbox.request_gear(gear);
        self.state.gear_state = self.gearbox.state;
        accepted
    }

    /// Mean angular speed of the driven wheels (rad/s, signed).
    fn driven_wheel_speed(params: &VehicleParameters, wheels: &[WheelState; NUM_WHEELS]) -> f32 {
        let (sum, count) = WheelId::ALL
            .iter()
            .filter(|id| params.drivetrain.is_driven(**id))
            .fold((0.0, 0), |(sum, n), id| (sum + wheels[id.index()].angular_speed, n + 1));
        if count == 0 { 0.0 } else { sum / count as f32 }
    }

    pub fn update(
        &mut self,
        params: &VehicleParameters,
        wheels: &[WheelState; NUM_WHEELS],
        throttle: f32,
        forward_speed: f32,
        any_contact: bool,
        dt: f32,
    ) {
        let engine = &params.engine;
        let drivetrain = &params.drivetrain;

        let mut throttle = throttle.clamp(0.0, 1.0);
        if engine.simulate_fuel && self.state.fuel <= 0.0 {
            throttle = 0.0;
        }

        // 1) rpm
        let wheel_speed = Self::driven_wheel_speed(params, wheels);
        let ratio = self.gearbox.ratio();
        let mut rpm = (wheel_speed.abs() * ratio * drivetrain.final_drive * RAD_PER_SEC_TO_RPM)
            .max(engine.idle_rpm);
        let launching = self.gearbox.gear() == 1 && throttle > THROTTLE_DEADZONE;
        if launching && forward_speed < self.launch_speed {
            let t = (forward_speed.max(0.0) / self.launch_speed).clamp(0.0, 1.0);
            let floor = engine.clutch_rpm + (engine.idle_rpm - engine.clutch_rpm) * t;
            rpm = rpm.max(floor);
        }
        if !rpm.is_finite() {
            rpm = engine.idle_rpm;
        }

        // 2) gearbox
        self.gearbox.update(&self.gears, ShiftInputs { forward_speed, rpm, any_contact, dt });
        let changing = self.gearbox.state.is_changing();
        let ratio = self.gearbox.ratio();
        let direction = if self.gearbox.is_reverse() { -1.0 } else { 1.0 };

        // 3) crank torque
        let over_rev = rpm > engine.max_rpm;
        let torque = if over_rev || changing { 0.0 } else { engine.torque_at(rpm) * throttle };

        // 4) engine braking
        let drag = if throttle < THROTTLE_DEADZONE && !changing {
            (rpm - engine.idle_rpm) * engine.idle_drag * sign(wheel_speed)
        } else {
            0.0
        };

        // 5) delivery
        let output = if changing {
            0.0
        } else if over_rev {
            -drag
        } else {
            torque * ratio * drivetrain.final_drive * drivetrain.efficiency * direction - drag
        };

        let mut wheel_torque = [0.0; NUM_WHEELS];
        for id in WheelId::ALL {
            wheel_torque[id.index()] = output * drivetrain.torque_share(id);
        }

        // 6) fuel
        let burn = rpm / 1000.0 * dt * throttle * engine.fuel_rate;
        let fuel = (self.state.fuel - burn).max(0.0);

        self.state = EngineState {
            gear_state: self.gearbox.state,
            rpm,
            torque,
            output_torque: output,
            wheel_torque,
            fuel,
        };
    }
}
