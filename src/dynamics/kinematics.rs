// ==============================================================================
// kinematics.rs — CONTACT POINT VELOCITY + WHEEL BASIS
// ------------------------------------------------------------------------------
// point_velocity(): velocity of a point rigidly attached to a body,
//   v(p) = v_com + ω × (p - com)
// ground_relative_velocity(): the same at a tire contact, minus the contact
//   partner's velocity at that point when the wheel stands on a moving body.
// steer_rotation(): chassis-local rotation of a front wheel about local up.
// ==============================================================================

use nalgebra::{UnitQuaternion, Vector3};

use crate::dynamics::backend::BodyState;
use crate::dynamics::types::{Pos3, Vec3};

#[inline]
pub fn point_velocity(linvel: Vec3, angvel: Vec3, com: &Pos3, p: &Pos3) -> Vec3 {
    let r = p - com;
    linvel + angvel.cross(&r)
}

/// World-space velocity of `p` on `body` relative to `partner` (if any).
#[inline]
pub fn ground_relative_velocity(body: &BodyState, partner: Option<&BodyState>, p: &Pos3) -> Vec3 {
    let own = body.point_velocity(p);
    match partner {
        Some(other) => own - other.point_velocity(p),
        None => own,
    }
}

/// Rotation of a wheel's rolling direction about chassis-local up. Positive
/// angles steer left.
#[inline]
pub fn steer_rotation(angle: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::types::{LOCAL_FORWARD, LOCAL_LEFT};
    use approx::assert_abs_diff_eq;
    use nalgebra::{Isometry3, Point3};

    fn body(linvel: Vec3, angvel: Vec3) -> BodyState {
        BodyState {
            mass: 1000.0,
            position: Isometry3::identity(),
            center_of_mass: Point3::origin(),
            linvel,
            angvel,
        }
    }

    #[test]
    fn spinning_body_adds_tangential_velocity() {
        let v = point_velocity(
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
            &Point3::origin(),
            &Point3::new(0.0, 0.0, 1.0),
        );
        // ω × r = (0,2,0) × (0,0,1) = (2,0,0)
        assert_abs_diff_eq!(v, Vector3::new(3.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn partner_velocity_is_subtracted() {
        let car = body(Vector3::new(0.0, 0.0, 10.0), Vector3::zeros());
        let platform = body(Vector3::new(0.0, 0.0, 4.0), Vector3::zeros());
        let p = Point3::new(0.5, 0.0, 1.0);
        assert_abs_diff_eq!(
            ground_relative_velocity(&car, Some(&platform), &p),
            Vector3::new(0.0, 0.0, 6.0),
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            ground_relative_velocity(&car, None, &p),
            Vector3::new(0.0, 0.0, 10.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn positive_steer_turns_left() {
        let forward = steer_rotation(0.3) * LOCAL_FORWARD;
        assert!(forward.dot(&LOCAL_LEFT) > 0.0);
        assert_abs_diff_eq!(forward.norm(), 1.0, epsilon = 1e-6);
    }
}
