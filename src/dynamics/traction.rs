// ==============================================================================
// traction.rs — SLIP-BASED TIRE MODEL (TC + ABS + WHEEL SPIN + TRACTION CIRCLE)
// ------------------------------------------------------------------------------
// Per wheel, per tick, after the suspension has produced this tick's load:
//
// 1) Ground-relative contact velocity in chassis space (partner subtracted)
// 2) Traction control: brake the outer front wheel while the car is drifting
// 3) Effective inertia (wheel, plus flywheel when driven)
// 4) ABS: release the brake when the wheel trails rolling speed (lockup)
// 5) Integrate ω from drive torque, last tick's tire reaction and the brake
// 6) Slip ratio   κ = (ω r - v_z) / max(|v_z|, ε)
// 7) Slip angle   α = atan2(v_x, |v_z|) - steer (front)
// 8) Traction circle: p = |(κ/κ_peak, α/α_peak)|, normalise when p >= 1
// 9) Wear accumulates from (p - 1) above WEAR_MIN_SPEED
// 10-11) F = curve(slip) * fraction * load * grip(wear)
// 12) Return the world force at the contact point
//
// Airborne wheels still spin under drive and brake torque; slip and forces
// are zero.
// ==============================================================================

use log::debug;

use crate::config::{BrakeParameters, TireParameters, WheelParameters};
use crate::dynamics::backend::BodyState;
use crate::dynamics::kinematics::{ground_relative_velocity, steer_rotation};
use crate::dynamics::types::{sign, Pos3, Vec3};
use crate::dynamics::wheel::WheelState;
use crate::dynamics::{
    ABS_SLIP_THRESHOLD, GROUND_SPEED_EPSILON, TC_COOLDOWN, TC_MIN_SPEED_SQ, WEAR_GRIP_LOSS,
    WEAR_MIN_SPEED,
};

/// Everything the traction model reads for one wheel.
pub struct TractionInput<'a> {
    pub body: &'a BodyState,
    pub partner: Option<&'a BodyState>,
    pub wheel: &'a WheelParameters,
    pub tires: &'a TireParameters,
    pub brakes: &'a BrakeParameters,
    pub driven: bool,
    pub flywheel_inertia: f32,
    pub steer: f32,       // rad, 0 for rear wheels
    pub brake: f32,       // pedal 0..1
    pub handbrake: bool,
    pub drift_angle: f32, // rad, previous tick
    pub dt: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TireForce {
    pub force: Vec3, // world, N
    pub point: Pos3, // world
}

// --------------------------------------------------
// Traction circle
// --------------------------------------------------

/// Returns `(ratio_fraction, angle_fraction, p)`.
///
/// Inside the grip limit (p < 1) each fraction collapses to its sign; above
/// it both are normalised onto the unit circle.
pub fn traction_circle(
    slip_ratio: f32,
    slip_angle: f32,
    peak_ratio: f32,
    peak_angle: f32,
) -> (f32, f32, f32) {
    let mut rf = (slip_ratio / peak_ratio).abs();
    let mut af = (slip_angle / peak_angle).abs();
    let raw = (rf * rf + af * af).sqrt();

    let mut p = raw;
    if p == 0.0 || !p.is_finite() {
        p = 1.0;
        rf = 0.0;
        af = 0.0;
    }

    rf /= p;
    af /= p;

    if p < 1.0 {
        rf = sign(rf);
        af = sign(af);
    }

    (rf, af, if raw.is_finite() { raw } else { 0.0 })
}

/// Grip multiplier for a given wear level.
pub fn wear_grip(wear: f32) -> f32 {
    1.0 - WEAR_GRIP_LOSS * wear.clamp(0.0, 1.0)
}

// --------------------------------------------------
// Solver
// --------------------------------------------------

pub fn solve(state: &mut WheelState, input: &TractionInput) -> Option<TireForce> {
    let dt = input.dt;
    let radius = input.wheel.radius;
    let body = input.body;

    // 1) ground velocity (chassis space)
    let local_vel = if state.in_contact {
        let world = ground_relative_velocity(body, input.partner, &state.contact.point);
        body.to_local_vector(&world)
    } else {
        Vec3::zeros()
    };

    let mut brake = input.brake;

    // 2) traction control
    if input.brakes.traction_control && state.id.is_front() {
        if state.tc_timer > 0.0 {
            state.tc_timer = (state.tc_timer - dt).max(0.0);
            brake = 1.0;
        } else {
            let outer_is_left = input.drift_angle > 0.0;
            let drifting = input.drift_angle.abs() > 1.5 * input.brakes.traction_max_slip;
            let fast = body.linvel.norm_squared() > TC_MIN_SPEED_SQ;
            if drifting && fast && state.id.is_left() == outer_is_left {
                state.tc_timer = TC_COOLDOWN;
                brake = 1.0;
                debug!("traction control on {} (drift {:.2} rad)", state.id, input.drift_angle);
            }
        }
    }

    // 3) inertia
    let inertia = input.wheel.inertia() + if input.driven { input.flywheel_inertia } else { 0.0 };

    // 4) ABS
    let mut brake_torque = brake * input.brakes.max_torque;
    if input.brakes.abs_timeout > 0.0 {
        if state.abs_timer > 0.0 {
            state.abs_timer = (state.abs_timer - dt).max(0.0);
            brake_torque = 0.0;
        } else if brake_torque > 0.0 && state.in_contact {
            // lockup: the wheel trails the ground by more than last tick's
            // brake torque accounts for
            let rolling = local_vel.z / radius;
            let explained = state.brake_torque / inertia * dt;
            let lag = (rolling - state.angular_speed) * sign(rolling) - explained;
            if lag > ABS_SLIP_THRESHOLD {
                state.abs_timer = input.brakes.abs_timeout;
                brake_torque = 0.0;
                debug!("abs release on {} ({:.1} rad/s behind rolling)", state.id, lag);
            }
        }
    }
    let brake_dv = brake_torque / inertia * dt;

    // 5) wheel spin
    let mut omega = state.angular_speed + state.drive_torque / inertia * dt;
    let reaction = -state.long_force * radius / inertia * dt;
    if state.in_contact {
        let rolling = local_vel.z / radius;
        let before = omega - rolling;
        let after = before + reaction;
        // chatter guard: the tire reaction pulls the wheel to rolling
        // speed but never across it
        if before * after < 0.0 {
            omega = rolling;
        } else {
            omega += reaction;
        }
    }
    if omega.abs() <= brake_dv {
        omega = 0.0;
    } else {
        omega -= brake_dv * sign(omega);
    }
    if input.handbrake && state.id.is_rear() {
        omega = 0.0;
    }
    state.angular_speed = if omega.is_finite() { omega } else { 0.0 };
    state.brake_torque = brake_torque;

    if !state.in_contact || !(state.load() > 0.0) {
        state.clear_tire_forces();
        return None;
    }

    // 6) slip ratio
    let ground_speed = local_vel.z.abs().max(GROUND_SPEED_EPSILON);
    let slip_ratio = (state.angular_speed * radius - local_vel.z) / ground_speed;

    // 7) slip angle
    let mut slip_angle = local_vel.x.atan2(local_vel.z.abs());
    if state.id.is_front() {
        let steer = if local_vel.z < 0.0 { -input.steer } else { input.steer };
        slip_angle -= steer;
    }

    // 8) traction circle
    let (rf, af, p) = traction_circle(
        slip_ratio,
        slip_angle,
        input.tires.longitudinal.peak_slip,
        input.tires.lateral.peak_slip,
    );

    // 9) wear
    if local_vel.norm() > WEAR_MIN_SPEED {
        let worn = (p - 1.0).clamp(0.0, 3.0) * input.wheel.wear_rate * dt;
        state.wear = (state.wear + worn).clamp(0.0, 1.0);
    }

    // 10-11) forces
    let load = state.load();
    let grip = wear_grip(state.wear);
    let long_force = input.tires.longitudinal.force(slip_ratio) * rf * load * grip;
    let lat_force = -input.tires.lateral.force(slip_angle) * af * load * grip;

    let mut local_force = Vec3::new(lat_force, 0.0, long_force);
    if state.id.is_front() {
        local_force = steer_rotation(input.steer) * local_force;
    }

    state.slip_ratio = slip_ratio;
    state.slip_angle = slip_angle;
    state.skid = p;
    state.long_force = long_force;
    state.lat_force = lat_force;
    state.grip_direction = local_force.try_normalize(1e-6).unwrap_or_else(Vec3::zeros);

    let force = body.to_world_vector(&local_force);
    if !force.iter().all(|c| c.is_finite()) {
        state.clear_tire_forces();
        return None;
    }

    // 12)
    Some(TireForce { force, point: state.contact.point })
}
