// ==============================================================================
// physics.rs — RAPIER HOST WORLD + PhysicsBackend ADAPTER
// ------------------------------------------------------------------------------
// PhysicsWorld owns the rapier sets and one VehicleSim per connected player.
//
// step(dt):
//   1) refresh the query pipeline (suspension rays read it)
//   2) tick every vehicle through RapierBackend (forces -> impulses, F * dt)
//   3) rapier pipeline step (gravity, contacts, integration)
//   4) reset bodies that left the world or went non-finite
//
// RapierBackend maps BodyRef <-> RigidBodyHandle through the handle's raw
// (index, generation) parts, so a stale BodyRef never aliases a new body.
// ==============================================================================

use std::collections::HashMap;

use log::{info, warn};
use rapier3d::prelude::*;
use rapier3d::prelude::{Group, InteractionGroups};

use crate::config::VehicleParameters;
use crate::dynamics::backend::{BodyRef, BodyState, PhysicsBackend, RayHit};
use crate::dynamics::suspension::ray_origin;
use crate::dynamics::types::{DrivingInputs, Pos3, Vec3};
use crate::dynamics::VehicleSim;
use crate::error::ConfigError;

const GROUP_GROUND: Group  = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

const WORLD_LIMIT: f32 = 1_000.0; // m, bodies past this are reset

// --------------------------------------------------
// Handle mapping
// --------------------------------------------------

pub fn body_ref(handle: RigidBodyHandle) -> BodyRef {
    let (index, generation) = handle.into_raw_parts();
    BodyRef(((generation as u64) << 32) | index as u64)
}

pub fn body_handle(body: BodyRef) -> RigidBodyHandle {
    RigidBodyHandle::from_raw_parts(body.0 as u32, (body.0 >> 32) as u32)
}

// --------------------------------------------------
// Backend
// --------------------------------------------------

/// Borrowed view of the rapier world for one vehicle tick.
pub struct RapierBackend<'a> {
    pub bodies: &'a mut RigidBodySet,
    pub colliders: &'a ColliderSet,
    pub query_pipeline: &'a QueryPipeline,
    pub dt: Real,
}

impl PhysicsBackend for RapierBackend<'_> {
    fn body_state(&self, body: BodyRef) -> Option<BodyState> {
        let rb = self.bodies.get(body_handle(body))?;
        Some(BodyState {
            mass: rb.mass(),
            position: *rb.position(),
            center_of_mass: *rb.center_of_mass(),
            linvel: *rb.linvel(),
            angvel: *rb.angvel(),
        })
    }

    fn cast_ray(
        &self,
        origin: Pos3,
        dir: Vec3,
        max_distance: f32,
        exclude: BodyRef,
    ) -> Option<RayHit> {
        let ray = Ray::new(origin, dir);
        let filter = QueryFilter::default().exclude_rigid_body(body_handle(exclude));

        let (collider, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &*self.bodies,
            self.colliders,
            &ray,
            max_distance,
            true,
            filter,
        )?;

        // static / kinematic ground never receives reaction forces
        let partner = self
            .colliders
            .get(collider)
            .and_then(|c| c.parent())
            .filter(|h| self.bodies.get(*h).is_some_and(|rb| rb.is_dynamic()))
            .map(body_ref);

        Some(RayHit {
            point: ray.point_at(hit.time_of_impact),
            normal: hit.normal,
            distance: hit.time_of_impact,
            body: partner,
        })
    }

    fn apply_force(&mut self, body: BodyRef, force: Vec3, offset: Vec3) {
        let dt = self.dt;
        if let Some(rb) = self.bodies.get_mut(body_handle(body)) {
            let point = rb.center_of_mass() + offset;
            rb.apply_impulse_at_point(force * dt, point, true);
        }
    }

    fn apply_central_force(&mut self, body: BodyRef, force: Vec3) {
        let dt = self.dt;
        if let Some(rb) = self.bodies.get_mut(body_handle(body)) {
            rb.apply_impulse(force * dt, true);
        }
    }
}

// --------------------------------------------------
// World
// --------------------------------------------------

pub struct PlayerVehicle {
    pub sim: VehicleSim,
    pub inputs: DrivingInputs,
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline,
    pub vehicles: HashMap<String, PlayerVehicle>, // player id -> vehicle
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // Static ground slab; top surface at y = 0.
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -0.1, 0.0])
            .build();
        let ground_handle = bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::cuboid(500.0, 0.1, 500.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(ground_collider, ground_handle, &mut bodies);

        info!("ground inserted: {} bodies, {} colliders", bodies.len(), colliders.len());

        Self {
            gravity: vector![0.0, -9.81, 0.0],
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            vehicles: HashMap::new(),
        }
    }

    /// Body height at which the front-left wheel sits at half travel on y = 0.
    pub fn ride_height(params: &VehicleParameters) -> f32 {
        let wheel = &params.wheels[0];
        let susp = &params.front_suspension;
        wheel.radius + susp.travel_total() * 0.5 - ray_origin(wheel, susp).y
    }

    /// Dynamic box chassis plus a VehicleSim driving it.
    pub fn spawn_vehicle(
        &mut self,
        id: String,
        params: VehicleParameters,
        position: [f32; 3],
    ) -> Result<RigidBodyHandle, ConfigError> {
        params.validate()?;

        let [hx, hy, hz] = params.chassis.half_extents;
        let [cx, cy, cz] = params.chassis.com_offset;
        let volume = 8.0 * hx * hy * hz;
        let density = params.mass / volume;
        let spawn_y = Self::ride_height(&params) + position[1];

        let rb = RigidBodyBuilder::dynamic()
            .translation(vector![position[0], spawn_y, position[2]])
            .ccd_enabled(true)
            .build();

        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .translation(vector![cx, cy, cz])
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
            .density(density)
            .friction(0.0)
            .restitution(0.0)
            .build();

        let handle = self.bodies.insert(rb);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);

        let sim = match VehicleSim::with_default_gears(body_ref(handle), params) {
            Ok(sim) => sim,
            Err(err) => {
                self.remove_body(handle);
                return Err(err);
            }
        };

        info!("spawned vehicle for {} at {:?} (body = {:?})", id, position, handle);
        self.vehicles.insert(id, PlayerVehicle { sim, inputs: DrivingInputs::default() });
        Ok(handle)
    }

    pub fn remove_vehicle(&mut self, id: &str) {
        if let Some(vehicle) = self.vehicles.remove(id) {
            self.remove_body(body_handle(vehicle.sim.body()));
            info!("removed vehicle for {}", id);
        }
    }

    fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Stores input; it is consumed on the next step.
    pub fn set_inputs(&mut self, id: &str, inputs: DrivingInputs) {
        if let Some(vehicle) = self.vehicles.get_mut(id) {
            vehicle.inputs = inputs;
        }
    }

    pub fn request_gear(&mut self, id: &str, gear: usize) -> bool {
        self.vehicles.get_mut(id).is_some_and(|v| v.sim.request_gear(gear))
    }

    pub fn vehicle(&self, id: &str) -> Option<&PlayerVehicle> {
        self.vehicles.get(id)
    }

    pub fn step(&mut self, dt: Real) {
        // 1) raycasts read the pre-step world
        self.query_pipeline.update(&self.colliders);

        // 2) vehicle forces
        {
            let mut backend = RapierBackend {
                bodies: &mut self.bodies,
                colliders: &self.colliders,
                query_pipeline: &self.query_pipeline,
                dt,
            };
            for vehicle in self.vehicles.values_mut() {
                vehicle.sim.tick(&mut backend, vehicle.inputs, dt);
            }
        }

        // 3) rapier
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        // 4) keep bodies inside the world
        for (handle, body) in self.bodies.iter_mut() {
            let pos = *body.translation();
            let bad =
                !pos.iter().all(|c| c.is_finite()) || pos.iter().any(|c| c.abs() > WORLD_LIMIT);
            if bad {
                let reset = vector![0.0, 2.0, 0.0];
                body.set_translation(reset, true);
                body.set_rotation(Rotation::identity(), true);
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);
                warn!("reset body {:?} from {:?}", handle, pos);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn handle_mapping_round_trips() {
        let handle = RigidBodyHandle::from_raw_parts(42, 7);
        assert_eq!(body_handle(body_ref(handle)), handle);
        assert_ne!(body_ref(handle), body_ref(RigidBodyHandle::from_raw_parts(42, 8)));
    }

    #[test]
    fn ray_hits_ground_without_partner() {
        let mut world = PhysicsWorld::new();
        world.query_pipeline.update(&world.colliders);
        let backend = RapierBackend {
            bodies: &mut world.bodies,
            colliders: &world.colliders,
            query_pipeline: &world.query_pipeline,
            dt: DT,
        };
        let hit = backend
            .cast_ray(point![0.0, 1.0, 0.0], vector![0.0, -1.0, 0.0], 5.0, BodyRef(u64::MAX))
            .unwrap();
        approx::assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-4);
        approx::assert_relative_eq!(hit.normal.y, 1.0, epsilon = 1e-4);
        assert_eq!(hit.body, None);
    }

    #[test]
    fn car_settles_on_ground() {
        let mut world = PhysicsWorld::new();
        world
            .spawn_vehicle("p1".into(), VehicleParameters::sports_coupe(), [0.0, 0.05, 0.0])
            .unwrap();

        for _ in 0..240 {
            world.step(DT);
        }

        let vehicle = world.vehicle("p1").unwrap();
        let rb = &world.bodies[body_handle(vehicle.sim.body())];
        let y = rb.translation().y;
        assert!(y.is_finite());
        assert!(y > 0.0 && y < 2.0, "ride height {y}");
        assert!(vehicle.sim.wheels().iter().all(|w| w.in_contact));
        assert!(rb.linvel().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn remove_vehicle_drops_body() {
        let mut world = PhysicsWorld::new();
        let handle = world
            .spawn_vehicle("p1".into(), VehicleParameters::sports_coupe(), [0.0, 0.0, 0.0])
            .unwrap();
        world.remove_vehicle("p1");
        assert!(world.bodies.get(handle).is_none());
        assert!(world.vehicle("p1").is_none());
    }
}
