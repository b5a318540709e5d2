// ==============================================================================
// wheel.rs — PER-WHEEL SIMULATION STATE
// ------------------------------------------------------------------------------
// WheelState is a passive record. It is created once per wheel when the
// vehicle is built and carried across ticks; the suspension solver and the
// traction model are the only writers.
//
// Contact fields are refreshed every tick from the suspension raycast. A miss
// calls reset_contact(), which returns every contact-dependent field to its
// "airborne" default (zero vectors, zero travel, no partner body).
// ==============================================================================

use nalgebra::{Point3, Vector3};

use crate::dynamics::backend::BodyRef;
use crate::dynamics::types::{Pos3, Vec3, WheelId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactInfo {
    pub point: Pos3,        // world
    pub normal: Vec3,       // world, unit
    pub local_point: Pos3,  // chassis
    pub local_normal: Vec3, // chassis
    pub distance: f32,      // ray origin to hit, m
    pub partner: Option<BodyRef>,
}

impl Default for ContactInfo {
    fn default() -> Self {
        Self {
            point: Point3::origin(),
            normal: Vector3::zeros(),
            local_point: Point3::origin(),
            local_normal: Vector3::zeros(),
            distance: 0.0,
            partner: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WheelState {
    pub id: WheelId,
    pub angular_speed: f32, // rad/s, + rolls forward

    // contact
    pub in_contact: bool,
    pub contact: ContactInfo,
    pub travel: f32,       // m of compression, 0..travel_total
    pub travel_total: f32, // m, copied from the axle's suspension

    // suspension output
    pub suspension_force: Vec3, // world, N
    pub spring_force: f32,
    pub damping_force: f32,
    pub sway_force: f32,

    // tire
    pub slip_ratio: f32,
    pub slip_angle: f32, // rad
    pub skid: f32,       // traction-circle magnitude p
    pub wear: f32,       // 0 = new, 1 = worn out
    pub long_force: f32, // N along the wheel's rolling direction
    pub lat_force: f32,  // N along the wheel's left axis
    pub grip_direction: Vec3, // chassis-local unit direction of the tire force

    // driver aids
    pub abs_timer: f32, // s
    pub tc_timer: f32,  // s

    // torque bookkeeping
    pub drive_torque: f32, // N*m from the drivetrain this tick
    pub brake_torque: f32, // N*m actually applied this tick
}

impl WheelState {
    pub fn new(id: WheelId, travel_total: f32) -> Self {
        Self {
            id,
            angular_speed: 0.0,
            in_contact: false,
            contact: ContactInfo::default(),
            travel: 0.0,
            travel_total,
            suspension_force: Vector3::zeros(),
            spring_force: 0.0,
            damping_force: 0.0,
            sway_force: 0.0,
            slip_ratio: 0.0,
            slip_angle: 0.0,
            skid: 0.0,
            wear: 0.0,
            long_force: 0.0,
            lat_force: 0.0,
            grip_direction: Vector3::zeros(),
            abs_timer: 0.0,
            tc_timer: 0.0,
            drive_torque: 0.0,
            brake_torque: 0.0,
        }
    }

    /// No ray hit: the wheel is airborne.
    pub fn reset_contact(&mut self) {
        self.in_contact = false;
        self.contact = ContactInfo::default();
        self.travel = 0.0;
        self.clear_suspension();
        self.clear_tire_forces();
    }

    pub(crate) fn clear_suspension(&mut self) {
        self.suspension_force = Vector3::zeros();
        self.spring_force = 0.0;
        self.damping_force = 0.0;
        self.sway_force = 0.0;
    }

    pub(crate) fn clear_tire_forces(&mut self) {
        self.slip_ratio = 0.0;
        self.slip_angle = 0.0;
        self.skid = 0.0;
        self.long_force = 0.0;
        self.lat_force = 0.0;
        self.grip_direction = Vector3::zeros();
    }

    /// Compression as a fraction of the available travel.
    pub fn travel_fraction(&self) -> f32 {
        if self.travel_total > 0.0 {
            (self.travel / self.travel_total).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Normal load carried by this wheel (N).
    pub fn load(&self) -> f32 {
        self.suspension_force.norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_contact_returns_to_airborne_defaults() {
        let mut wheel = WheelState::new(WheelId::RL, 0.2);
        wheel.in_contact = true;
        wheel.travel = 0.1;
        wheel.contact.partner = Some(BodyRef(7));
        wheel.contact.distance = 0.4;
        wheel.suspension_force = Vector3::new(0.0, 3000.0, 0.0);
        wheel.slip_ratio = 0.3;
        wheel.wear = 0.2;
        wheel.angular_speed = 12.0;

        wheel.reset_contact();

        assert!(!wheel.in_contact);
        assert_eq!(wheel.contact, ContactInfo::default());
        assert_eq!(wheel.travel, 0.0);
        assert_eq!(wheel.load(), 0.0);
        assert_eq!(wheel.slip_ratio, 0.0);
        // wear and spin survive a jump
        assert_eq!(wheel.wear, 0.2);
        assert_eq!(wheel.angular_speed, 12.0);
    }

    #[test]
    fn travel_fraction_is_clamped() {
        let mut wheel = WheelState::new(WheelId::FL, 0.2);
        wheel.travel = 0.05;
        assert_eq!(wheel.travel_fraction(), 0.25);
        wheel.travel = 0.5;
        assert_eq!(wheel.travel_fraction(), 1.0);
        assert_eq!(WheelState::new(WheelId::FL, 0.0).travel_fraction(), 0.0);
    }
}
