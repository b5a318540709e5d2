// ==============================================================================
// suspension.rs — RAYCAST SUSPENSION: SPRING + DAMPER + ANTI-ROLL
// ------------------------------------------------------------------------------
// Geometry (chassis-local):
// - The ray starts at the wheel's hard point, mount + up * max_travel, and
//   travels along -up for travel_total + radius.
// - A hit at distance d gives travel = travel_total - (d - radius), clamped to
//   [0, travel_total]. Zero travel = full droop.
//
// Force (per wheel, per tick):
//   spring  = (preload + travel) * stiffness
//   damping = c * (n · v_contact)      c = compression coeff if relVel > 0,
//                                          rebound coeff otherwise
//   sway    = (travel_other - travel_this) * anti_roll
//   total   = spring - damping - sway          (only applied when > 0)
//
//   F = up_world * total * (n · up_world) * SUSPENSION_FORCE_SCALE
//
// The force goes on the vehicle at the contact point; a dynamic contact partner
// gets the opposite force at the same point.
//
// This module does NOT call the backend. update_contact() records the raycast
// and solve() returns the force for the integrator to apply.
// ==============================================================================

use nalgebra::Point3;

use crate::config::{SuspensionParameters, WheelParameters};
use crate::dynamics::backend::{BodyState, RayHit};
use crate::dynamics::kinematics::ground_relative_velocity;
use crate::dynamics::types::{Pos3, Vec3, LOCAL_UP};
use crate::dynamics::wheel::{ContactInfo, WheelState};
use crate::dynamics::SUSPENSION_FORCE_SCALE;

/// Force produced by one wheel's suspension this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuspensionOutput {
    pub force: Vec3, // world, N
    pub point: Pos3, // world application point
}

// --------------------------------------------------
// Ray geometry
// --------------------------------------------------

/// Chassis-local ray origin (the hard point).
pub fn ray_origin(wheel: &WheelParameters, susp: &SuspensionParameters) -> Pos3 {
    let [x, y, z] = wheel.mount;
    Point3::new(x, y, z) + LOCAL_UP * susp.max_travel
}

pub fn ray_length(wheel: &WheelParameters, susp: &SuspensionParameters) -> f32 {
    susp.travel_total() + wheel.radius
}

/// Compression from a hit distance measured from the hard point.
pub fn travel_from_distance(distance: f32, radius: f32, travel_total: f32) -> f32 {
    (travel_total - (distance - radius)).clamp(0.0, travel_total)
}

/// Record a raycast result in the wheel. A miss resets the contact.
pub fn update_contact(wheel: &mut WheelState, hit: Option<RayHit>, body: &BodyState, radius: f32) {
    let Some(hit) = hit else {
        wheel.reset_contact();
        return;
    };

    wheel.in_contact = true;
    wheel.travel = travel_from_distance(hit.distance, radius, wheel.travel_total);
    wheel.contact = ContactInfo {
        point: hit.point,
        normal: hit.normal,
        local_point: body.to_local_point(&hit.point),
        local_normal: body.to_local_vector(&hit.normal),
        distance: hit.distance,
        partner: hit.body,
    };
}

// --------------------------------------------------
// Solver
// --------------------------------------------------

/// `other_travel` is the opposite wheel's travel on the same axle, `None` when
/// that wheel is airborne.
pub fn solve(
    wheel: &mut WheelState,
    susp: &SuspensionParameters,
    other_travel: Option<f32>,
    body: &BodyState,
    partner: Option<&BodyState>,
) -> Option<SuspensionOutput> {
    if !wheel.in_contact {
        wheel.clear_suspension();
        return None;
    }

    let point = wheel.contact.point;
    let normal = wheel.contact.normal;

    let hit_vel = ground_relative_velocity(body, partner, &point);
    let rel_vel = normal.dot(&hit_vel);
    let damping = if rel_vel > 0.0 {
        susp.compression_coefficient() * rel_vel
    } else {
        susp.rebound_coefficient() * rel_vel
    };

    let sway = (other_travel.unwrap_or(0.0) - wheel.travel) * susp.anti_roll;
    let spring = (susp.preload + wheel.travel) * susp.stiffness;
    let total = spring - damping - sway;

    wheel.spring_force = spring;
    wheel.damping_force = damping;
    wheel.sway_force = sway;

    if !(total > 0.0) {
        wheel.suspension_force = Vec3::zeros();
        return None;
    }

    let up = body.to_world_vector(&LOCAL_UP);
    let surface_factor = normal.dot(&up);
    let force = up * (total * surface_factor * SUSPENSION_FORCE_SCALE);

    if !force.iter().all(|c| c.is_finite()) {
        wheel.suspension_force = Vec3::zeros();
        return None;
    }

    wheel.suspension_force = force;
    Some(SuspensionOutput { force, point })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VehicleParameters;
    use crate::dynamics::backend::BodyRef;
    use crate::dynamics::types::WheelId;
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, Vector3};

    fn resting_body() -> BodyState {
        BodyState {
            mass: 1250.0,
            position: Isometry3::identity(),
            center_of_mass: Point3::origin(),
            linvel: Vector3::zeros(),
            angvel: Vector3::zeros(),
        }
    }

    fn grounded(travel: f32) -> WheelState {
        let mut wheel = WheelState::new(WheelId::FL, 0.2);
        wheel.in_contact = true;
        wheel.travel = travel;
        wheel.contact.point = Point3::new(0.78, -0.6, 1.3);
        wheel.contact.normal = Vector3::y();
        wheel
    }

    #[test]
    fn travel_is_clamped_to_range() {
        assert_relative_eq!(travel_from_distance(0.43, 0.33, 0.2), 0.1, epsilon = 1e-6);
        assert_eq!(travel_from_distance(0.2, 0.33, 0.2), 0.2);
        assert_eq!(travel_from_distance(0.6, 0.33, 0.2), 0.0);
    }

    #[test]
    fn ray_starts_at_hard_point() {
        let params = VehicleParameters::sports_coupe();
        let origin = ray_origin(&params.wheels[0], &params.front_suspension);
        assert_relative_eq!(origin.y, -0.2 + 0.08, epsilon = 1e-6);
        let length = ray_length(&params.wheels[0], &params.front_suspension);
        assert_relative_eq!(length, 0.53, epsilon = 1e-6);
    }

    #[test]
    fn miss_resets_contact() {
        let mut wheel = grounded(0.1);
        update_contact(&mut wheel, None, &resting_body(), 0.33);
        assert!(!wheel.in_contact);
        assert_eq!(wheel.travel, 0.0);
    }

    #[test]
    fn hit_records_partner_and_travel() {
        let mut wheel = WheelState::new(WheelId::FR, 0.2);
        let hit = RayHit {
            point: Point3::new(-0.78, -0.55, 1.3),
            normal: Vector3::y(),
            distance: 0.43,
            body: Some(BodyRef(3)),
        };
        update_contact(&mut wheel, Some(hit), &resting_body(), 0.33);
        assert!(wheel.in_contact);
        assert_relative_eq!(wheel.travel, 0.1, epsilon = 1e-6);
        assert_eq!(wheel.contact.partner, Some(BodyRef(3)));
    }

    #[test]
    fn spring_force_at_rest() {
        let susp = VehicleParameters::sports_coupe().front_suspension;
        let mut wheel = grounded(0.1);
        let out = solve(&mut wheel, &susp, Some(0.1), &resting_body(), None).unwrap();
        // (0.05 + 0.1) * 20 * 1000
        assert_relative_eq!(out.force.y, 3000.0, epsilon = 1e-2);
        assert_eq!(wheel.sway_force, 0.0);
        assert_eq!(wheel.damping_force, 0.0);
    }

    #[test]
    fn airborne_opposite_wheel_maximises_sway() {
        let susp = VehicleParameters::sports_coupe().front_suspension;
        let mut wheel = grounded(0.1);
        solve(&mut wheel, &susp, None, &resting_body(), None).unwrap();
        assert_relative_eq!(wheel.sway_force, -0.1 * susp.anti_roll, epsilon = 1e-6);
    }

    #[test]
    fn never_pulls_the_body_down() {
        let susp = VehicleParameters::sports_coupe().front_suspension;
        let mut wheel = grounded(0.0);
        let mut body = resting_body();
        // body leaving the ground fast: rebound damping exceeds the spring
        body.linvel = Vector3::new(0.0, 50.0, 0.0);
        let out = solve(&mut wheel, &susp, Some(0.0), &body, None);
        assert!(out.is_none());
        assert_eq!(wheel.suspension_force, Vector3::zeros());
    }

    #[test]
    fn moving_partner_cancels_damping() {
        let susp = VehicleParameters::sports_coupe().front_suspension;
        let mut body = resting_body();
        body.linvel = Vector3::new(0.0, -1.0, 0.0);
        let partner = body;

        let mut wheel = grounded(0.1);
        solve(&mut wheel, &susp, Some(0.1), &body, Some(&partner)).unwrap();
        assert_eq!(wheel.damping_force, 0.0);

        let mut wheel = grounded(0.1);
        solve(&mut wheel, &susp, Some(0.1), &body, None).unwrap();
        assert!(wheel.damping_force < 0.0);
    }

    #[test]
    fn sloped_normal_scales_force() {
        let susp = VehicleParameters::sports_coupe().front_suspension;
        let mut wheel = grounded(0.1);
        let tilt = 0.3_f32;
        wheel.contact.normal = Vector3::new(tilt.sin(), tilt.cos(), 0.0);
        let out = solve(&mut wheel, &susp, Some(0.1), &resting_body(), None).unwrap();
        assert_relative_eq!(out.force.y, 3000.0 * tilt.cos(), epsilon = 1e-2);
    }
}
