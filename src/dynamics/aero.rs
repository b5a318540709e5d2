// ==============================================================================
// aero.rs — BODY DRAG + DOWNFORCE
// ------------------------------------------------------------------------------
// Chassis-local, applied at the center of mass (no aero torque):
//   drag      = -ρ * Cd * A * v ⊙ |v|            per axis
//   downforce = up * (-0.5 * Cl * ρ * v_z²)
// ==============================================================================

use crate::config::AeroParameters;
use crate::dynamics::backend::BodyState;
use crate::dynamics::types::{Vec3, LOCAL_UP};
use crate::dynamics::AIR_DENSITY;

pub fn local_aero_force(params: &AeroParameters, local_vel: &Vec3) -> Vec3 {
    let drag_factor = AIR_DENSITY * params.drag_coefficient * params.cross_section;
    let drag = -local_vel.component_mul(&local_vel.abs()) * drag_factor;
    let downforce_factor = -0.5 * params.downforce_coefficient * AIR_DENSITY;
    let downforce = LOCAL_UP * (downforce_factor * local_vel.z * local_vel.z);
    drag + downforce
}

/// World-space central force for this tick.
pub fn aero_force(params: &AeroParameters, body: &BodyState) -> Vec3 {
    let local_vel = body.to_local_vector(&body.linvel);
    body.to_world_vector(&local_aero_force(params, &local_vel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    const AERO: AeroParameters = AeroParameters {
        drag_coefficient: 0.3,
        cross_section: 2.0,
        downforce_coefficient: 0.5,
    };

    #[test]
    fn drag_opposes_motion_on_every_axis() {
        let f = local_aero_force(&AERO, &Vector3::new(-3.0, 2.0, 10.0));
        assert!(f.x > 0.0);
        assert!(f.z < 0.0);
        // 1.225 * 0.3 * 2.0 * 100
        assert_relative_eq!(f.z, -73.5, epsilon = 1e-3);
    }

    #[test]
    fn downforce_pushes_down_either_direction() {
        for vz in [20.0, -20.0] {
            let f = local_aero_force(&AERO, &Vector3::new(0.0, 0.0, vz));
            // 0.5 * 0.5 * 1.225 * 400
            assert_relative_eq!(f.y, -122.5, epsilon = 1e-3);
        }
    }

    #[test]
    fn at_rest_no_force() {
        assert_eq!(local_aero_force(&AERO, &Vector3::zeros()), Vector3::zeros());
    }
}
