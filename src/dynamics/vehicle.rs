// ==============================================================================
// vehicle.rs — VEHICLE INTEGRATOR (ONE FIXED STEP)
// ------------------------------------------------------------------------------
// VehicleSim owns the per-vehicle simulation state (4 WheelStates + the
// drivetrain) and borrows the physics engine for the duration of a tick.
//
// Tick order (fixed; wheel order FL, FR, RL, RR):
//   1) sanitize inputs
//   2) engine / gearbox (previous tick's wheel speeds)
//   3) raycast all four wheels -> contact + travel
//   4) per wheel: suspension, then traction (same-tick load)
//   5) drift angle from the rear axle
//   6) aero drag + downforce at the center of mass
//
// Step 3 finishes before step 4 so the anti-roll term reads the opposite
// wheel's travel from the same tick.
// ==============================================================================

use log::info;

use crate::config::{GearSpeedTable, VehicleParameters};
use crate::dynamics::aero::aero_force;
use crate::dynamics::backend::{BodyRef, BodyState, PhysicsBackend};
use crate::dynamics::drivetrain::{Drivetrain, EngineState};
use crate::dynamics::suspension::{self, SuspensionOutput};
use crate::dynamics::telemetry::{Metric, MetricsExport};
use crate::dynamics::traction::{self, TireForce, TractionInput};
use crate::dynamics::types::{DrivingInputs, Pos3, Vec3, WheelId, LOCAL_UP, NUM_WHEELS};
use crate::dynamics::wheel::WheelState;
use crate::error::ConfigError;

pub struct VehicleSim {
    body: BodyRef,
    params: VehicleParameters,
    wheels: [WheelState; NUM_WHEELS],
    drivetrain: Drivetrain,
    inputs: DrivingInputs,
    drift_angle: f32, // rad, mean rear slip angle
    distance: f32,    // m
    speed: f32,       // m/s
}

impl VehicleSim {
    /// Validates the parameters and the gear table. Nothing is re-checked per tick.
    pub fn new(
        body: BodyRef,
        params: VehicleParameters,
        gears: GearSpeedTable,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        let drivetrain = Drivetrain::new(&params, gears)?;
        let wheels =
            WheelId::ALL.map(|id| WheelState::new(id, params.suspension(id).travel_total()));

        info!(
            "vehicle {:?}: {:.0} kg, {} forward gears, drive radius {:.3} m",
            body,
            params.mass,
            params.drivetrain.top_gear(),
            drivetrain.drive_radius()
        );

        Ok(Self {
            body,
            params,
            wheels,
            drivetrain,
            inputs: DrivingInputs::default(),
            drift_angle: 0.0,
            distance: 0.0,
            speed: 0.0,
        })
    }

    /// Builds the gear speed table from the parameters.
    pub fn with_default_gears(
        body: BodyRef,
        params: VehicleParameters,
    ) -> Result<Self, ConfigError> {
        let gears = GearSpeedTable::from_parameters(&params)?;
        Self::new(body, params, gears)
    }

    // --------------------------------------------------
    // Accessors
    // --------------------------------------------------

    pub fn body(&self) -> BodyRef {
        self.body
    }

    pub fn params(&self) -> &VehicleParameters {
        &self.params
    }

    pub fn wheels(&self) -> &[WheelState; NUM_WHEELS] {
        &self.wheels
    }

    pub fn wheel(&self, id: WheelId) -> &WheelState {
        &self.wheels[id.index()]
    }

    pub fn wheel_mut(&mut self, id: WheelId) -> &mut WheelState {
        &mut self.wheels[id.index()]
    }

    pub fn engine(&self) -> &EngineState {
        &self.drivetrain.state
    }

    pub fn gear_speeds(&self) -> &GearSpeedTable {
        self.drivetrain.gears()
    }

    pub fn gear(&self) -> usize {
        self.drivetrain.state.gear()
    }

    pub fn rpm(&self) -> f32 {
        self.drivetrain.state.rpm
    }

    pub fn inputs(&self) -> DrivingInputs {
        self.inputs
    }

    /// Rear-axle slip angle, degrees.
    pub fn drift_angle(&self) -> f32 {
        self.drift_angle.to_degrees()
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn request_gear(&mut self, gear: usize) -> bool {
        self.drivetrain.request_gear(gear)
    }

    // --------------------------------------------------
    // Tick
    // --------------------------------------------------

    pub fn tick<B: PhysicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        inputs: DrivingInputs,
        dt: f32,
    ) {
        if !(dt > 0.0 && dt.is_finite()) {
            return;
        }
        let inputs = inputs.sanitized();
        self.inputs = inputs;

        let Some(body) = backend.body_state(self.body) else {
            return;
        };

        // 2) engine
        let forward_speed = body.to_local_vector(&body.linvel).z;
        let any_contact = self.wheels.iter().any(|w| w.in_contact);
        self.drivetrain
            .update(&self.params, &self.wheels, inputs.accelerator, forward_speed, any_contact, dt);
        for wheel in self.wheels.iter_mut() {
            wheel.drive_torque = self.drivetrain.state.wheel_torque[wheel.id.index()];
        }

        // 3) raycasts
        let down = body.to_world_vector(&-LOCAL_UP);
        for id in WheelId::ALL {
            let wheel_params = self.params.wheel(id);
            let susp = self.params.suspension(id);
            let origin = body.to_world_point(&suspension::ray_origin(wheel_params, susp));
            let reach = suspension::ray_length(wheel_params, susp);
            let hit = backend.cast_ray(origin, down, reach, self.body);
            let wheel = &mut self.wheels[id.index()];
            suspension::update_contact(wheel, hit, &body, wheel_params.radius);
        }

        // 4) suspension + traction
        for id in WheelId::ALL {
            let opposite = &self.wheels[id.opposite().index()];
            let other_travel = opposite.in_contact.then_some(opposite.travel);

            let partner_ref = self.wheels[id.index()].contact.partner;
            let partner = partner_ref.and_then(|b| backend.body_state(b));
            let partner_pair = partner_ref.zip(partner.as_ref());

            let wheel = &mut self.wheels[id.index()];

            if let Some(SuspensionOutput { force, point }) =
                suspension::solve(
                    wheel,
                    self.params.suspension(id),
                    other_travel,
                    &body,
                    partner.as_ref(),
                )
            {
                apply_pair(backend, self.body, &body, partner_pair, force, &point);
            }

            let traction_input = TractionInput {
                body: &body,
                partner: partner.as_ref(),
                wheel: self.params.wheel(id),
                tires: &self.params.tires,
                brakes: &self.params.brakes,
                driven: self.params.drivetrain.is_driven(id),
                flywheel_inertia: self.params.engine.flywheel_inertia,
                steer: if id.is_front() { inputs.steering } else { 0.0 },
                brake: inputs.brake,
                handbrake: inputs.handbrake,
                drift_angle: self.drift_angle,
                dt,
            };
            if let Some(TireForce { force, point }) = traction::solve(wheel, &traction_input) {
                apply_pair(backend, self.body, &body, partner_pair, force, &point);
            }
        }

        // 5) drift
        let (sum, count) = [WheelId::RL, WheelId::RR]
            .iter()
            .map(|id| &self.wheels[id.index()])
            .filter(|w| w.in_contact)
            .fold((0.0, 0), |(sum, n), w| (sum + w.slip_angle, n + 1));
        self.drift_angle = if count > 0 { sum / count as f32 } else { 0.0 };

        // 6) aero
        let aero = aero_force(&self.params.aero, &body);
        if aero.iter().all(|c| c.is_finite()) {
            backend.apply_central_force(self.body, aero);
        }

        self.speed = body.linvel.norm();
        self.distance += self.speed * dt;
    }
}

/// Force on the vehicle at `point`, reaction on the contact partner.
fn apply_pair<B: PhysicsBackend + ?Sized>(
    backend: &mut B,
    own: BodyRef,
    own_state: &BodyState,
    partner: Option<(BodyRef, &BodyState)>,
    force: Vec3,
    point: &Pos3,
) {
    backend.apply_force(own, force, own_state.offset_of(point));
    if let Some((other, other_state)) = partner {
        backend.apply_force(other, -force, other_state.offset_of(point));
    }
}

impl MetricsExport for VehicleSim {
    fn metrics(&self) -> Vec<Metric> {
        let engine = self.engine();
        let mut out = vec![
            Metric::new("gear", engine.gear() as f32),
            Metric::new("shifting", if engine.gear_state.is_changing() { 1.0 } else { 0.0 }),
            Metric::new("rpm", engine.rpm),
            Metric::new("torque", engine.torque),
            Metric::new("power_kw", engine.power_kw()),
            Metric::new("drift_angle", self.drift_angle()),
            Metric::new("fuel", engine.fuel),
            Metric::new("distance", self.distance),
            Metric::new("speed", self.speed),
        ];
        for wheel in &self.wheels {
            out.extend(wheel.metrics());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::backend::RayHit;
    use nalgebra::{Isometry3, Point3, Vector3};

    /// A body hovering with all rays missing.
    struct Void {
        state: BodyState,
        forces: Vec<Vec3>,
    }

    impl PhysicsBackend for Void {
        fn body_state(&self, body: BodyRef) -> Option<BodyState> {
            (body == BodyRef(1)).then_some(self.state)
        }
        fn cast_ray(&self, _: Pos3, _: Vec3, _: f32, _: BodyRef) -> Option<RayHit> {
            None
        }
        fn apply_force(&mut self, _: BodyRef, force: Vec3, _: Vec3) {
            self.forces.push(force);
        }
        fn apply_central_force(&mut self, _: BodyRef, force: Vec3) {
            self.forces.push(force);
        }
    }

    fn void(linvel: Vec3) -> Void {
        Void {
            state: BodyState {
                mass: 1250.0,
                position: Isometry3::translation(0.0, 5.0, 0.0),
                center_of_mass: Point3::new(0.0, 5.0, 0.0),
                linvel,
                angvel: Vector3::zeros(),
            },
            forces: Vec::new(),
        }
    }

    #[test]
    fn invalid_parameters_fail_construction() {
        let mut params = VehicleParameters::sports_coupe();
        params.drivetrain.rear_drive = false;
        assert!(matches!(
            VehicleSim::with_default_gears(BodyRef(1), params),
            Err(ConfigError::NoDriveWheels)
        ));
    }

    #[test]
    fn mismatched_gear_table_fails_construction() {
        let params = VehicleParameters::sports_coupe();
        let gears = GearSpeedTable { upshift: vec![0.0; 3], downshift: vec![0.0; 3] };
        assert!(matches!(
            VehicleSim::new(BodyRef(1), params, gears),
            Err(ConfigError::GearTableMismatch { .. })
        ));
    }

    #[test]
    fn airborne_tick_applies_only_aero() {
        let mut sim =
            VehicleSim::with_default_gears(BodyRef(1), VehicleParameters::sports_coupe()).unwrap();
        let mut backend = void(Vector3::new(0.0, 0.0, 10.0));
        let throttle = DrivingInputs { accelerator: 1.0, ..Default::default() };
        sim.tick(&mut backend, throttle, 1.0 / 60.0);

        assert_eq!(backend.forces.len(), 1);
        assert!(backend.forces[0].z < 0.0);
        assert!(sim.wheels().iter().all(|w| !w.in_contact));
        // airborne driven wheels still spin up
        assert!(sim.wheel(WheelId::RL).angular_speed > 0.0);
        assert_eq!(sim.wheel(WheelId::FL).angular_speed, 0.0);
        assert_eq!(sim.drift_angle(), 0.0);
    }

    #[test]
    fn unknown_body_and_bad_dt_are_ignored() {
        let mut sim =
            VehicleSim::with_default_gears(BodyRef(2), VehicleParameters::sports_coupe()).unwrap();
        let mut backend = void(Vector3::zeros());
        sim.tick(&mut backend, DrivingInputs::default(), 1.0 / 60.0);
        sim.tick(&mut backend, DrivingInputs::default(), f32::NAN);
        assert!(backend.forces.is_empty());
        assert_eq!(sim.distance(), 0.0);
    }

    #[test]
    fn distance_integrates_speed() {
        let mut sim =
            VehicleSim::with_default_gears(BodyRef(1), VehicleParameters::sports_coupe()).unwrap();
        let mut backend = void(Vector3::new(3.0, 0.0, 4.0));
        for _ in 0..60 {
            sim.tick(&mut backend, DrivingInputs::default(), 1.0 / 60.0);
        }
        approx::assert_relative_eq!(sim.distance(), 5.0, epsilon = 1e-3);
        assert_eq!(sim.speed(), 5.0);
    }

    #[test]
    fn metrics_cover_vehicle_and_wheels() {
        let sim =
            VehicleSim::with_default_gears(BodyRef(1), VehicleParameters::sports_coupe()).unwrap();
        assert_eq!(sim.metric("gear"), Some(1.0));
        assert_eq!(sim.metric("rpm"), Some(900.0));
        assert!(sim.metric("RL.wear").is_some());
        assert_eq!(sim.metrics().len(), 9 + 4 * 9);
    }
}
