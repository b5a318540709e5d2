// ==============================================================================
// backend.rs — PHYSICS ENGINE COLLABORATOR
// ------------------------------------------------------------------------------
// The dynamics core never owns a rigid body. Everything it needs from the host
// physics engine goes through PhysicsBackend:
// - body_state(): mass, pose, center of mass, linear + angular velocity
// - cast_ray(): suspension raycasts (the vehicle's own body is excluded)
// - apply_force() / apply_central_force(): force output for one tick
//
// Bodies are named by BodyRef, an opaque 64-bit key the backend maps to its
// own handles. physics::RapierBackend is the production implementation; the
// scenario tests use a flat-ground integrator.
// ==============================================================================

use nalgebra::{Isometry3, UnitQuaternion};

use crate::dynamics::kinematics::point_velocity;
use crate::dynamics::types::{Pos3, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BodyRef(pub u64);

/// Read-only snapshot of a rigid body at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub mass: f32,
    pub position: Isometry3<f32>,
    pub center_of_mass: Pos3, // world space
    pub linvel: Vec3,
    pub angvel: Vec3,
}

impl BodyState {
    pub fn rotation(&self) -> &UnitQuaternion<f32> {
        &self.position.rotation
    }

    pub fn point_velocity(&self, p: &Pos3) -> Vec3 {
        point_velocity(self.linvel, self.angvel, &self.center_of_mass, p)
    }

    pub fn to_world_point(&self, local: &Pos3) -> Pos3 {
        self.position * local
    }

    pub fn to_local_point(&self, world: &Pos3) -> Pos3 {
        self.position.inverse_transform_point(world)
    }

    pub fn to_world_vector(&self, local: &Vec3) -> Vec3 {
        self.position.rotation * local
    }

    pub fn to_local_vector(&self, world: &Vec3) -> Vec3 {
        self.position.rotation.inverse_transform_vector(world)
    }

    /// Offset of a world point from the center of mass.
    pub fn offset_of(&self, world: &Pos3) -> Vec3 {
        world - self.center_of_mass
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Pos3,
    pub normal: Vec3,
    pub distance: f32,
    /// Dynamic body owning the hit collider, if any. Static ground is `None`.
    pub body: Option<BodyRef>,
}

pub trait PhysicsBackend {
    fn body_state(&self, body: BodyRef) -> Option<BodyState>;

    /// Cast from `origin` along unit `dir`, ignoring colliders of `exclude`.
    fn cast_ray(
        &self,
        origin: Pos3,
        dir: Vec3,
        max_distance: f32,
        exclude: BodyRef,
    ) -> Option<RayHit>;

    /// Apply `force` (N, world) at `offset` from the body's center of mass.
    fn apply_force(&mut self, body: BodyRef, force: Vec3, offset: Vec3);

    fn apply_central_force(&mut self, body: BodyRef, force: Vec3);
}
