use std::collections::HashMap;

use log::warn;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use vehicle_physics::dynamics::telemetry::{Metric, MetricsExport};
use vehicle_physics::physics::{body_handle, PhysicsWorld};

#[derive(Serialize)]
pub struct PlayerSnapshot {
    pub id: String,
    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion (x, y, z, w)
    pub gear: usize,
    pub rpm: f32,
    pub speed: f32,
    pub metrics: Vec<Metric>,
}

#[derive(Serialize)]
pub struct Snapshot {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub tick: u64,
    pub players: Vec<PlayerSnapshot>,
}

/// Connection bookkeeping. Vehicles themselves live in PhysicsWorld.
pub struct SharedGameState {
    pub tick: u64,
    pub clients: HashMap<String, UnboundedSender<String>>, // player id -> outbound
}

impl SharedGameState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            clients: HashMap::new(),
        }
    }

    pub fn register_client(&mut self, id: String, tx: UnboundedSender<String>) {
        self.clients.insert(id, tx);
    }

    pub fn remove_client(&mut self, id: &str) {
        self.clients.remove(id);
    }

    pub fn snapshot(&self, physics: &PhysicsWorld) -> Snapshot {
        let mut players = Vec::with_capacity(physics.vehicles.len());

        for (id, vehicle) in &physics.vehicles {
            let sim = &vehicle.sim;
            let Some(body) = physics.bodies.get(body_handle(sim.body())) else {
                continue;
            };
            let pos = body.translation();
            let rot = body.rotation();
            players.push(PlayerSnapshot {
                id: id.clone(),
                position: [pos.x, pos.y, pos.z],
                rotation: [rot.i, rot.j, rot.k, rot.w],
                gear: sim.gear(),
                rpm: sim.rpm(),
                speed: sim.speed(),
                metrics: sim.metrics(),
            });
        }

        Snapshot { kind: "snapshot", tick: self.tick, players }
    }

    /// Build and send a snapshot of all vehicles to all clients.
    pub fn broadcast_snapshot(&self, physics: &PhysicsWorld) {
        let json = match serde_json::to_string(&self.snapshot(physics)) {
            Ok(json) => json,
            Err(err) => {
                warn!("snapshot serialization failed: {}", err);
                return;
            }
        };

        for tx in self.clients.values() {
            let _ = tx.send(json.clone());
        }
    }
}
