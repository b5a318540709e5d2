use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::accept_async;
use tungstenite::Message;
use uuid::Uuid;

use vehicle_physics::config::VehicleParameters;
use vehicle_physics::dynamics::DrivingInputs;
use vehicle_physics::physics::PhysicsWorld;

use crate::state::SharedGameState;

#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientMessage {
    Input {
        #[serde(default)]
        accelerator: f32,
        #[serde(default)]
        brake: f32,
        #[serde(default)]
        steering: f32, // radians, +left
        #[serde(default)]
        handbrake: bool,
    },
    Gear {
        gear: usize,
    },
    Ping,
}

impl ClientMessage {
    fn from_json(txt: &str) -> Option<Self> {
        serde_json::from_str(txt).ok()
    }
}

pub async fn start_websocket_server(
    listener: TcpListener,
    state: Arc<Mutex<SharedGameState>>,
    physics: Arc<Mutex<PhysicsWorld>>,
    params: VehicleParameters,
) {
    if let Ok(addr) = listener.local_addr() {
        info!("websocket listening on ws://{}", addr);
    }

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!("accept failed: {}", err);
                continue;
            }
        };
        debug!("tcp connection from {}", peer);

        tokio::spawn(handle_connection(
            raw,
            Arc::clone(&state),
            Arc::clone(&physics),
            params.clone(),
        ));
    }
}

async fn handle_connection(
    raw: TcpStream,
    state: Arc<Mutex<SharedGameState>>,
    physics: Arc<Mutex<PhysicsWorld>>,
    params: VehicleParameters,
) {
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!("websocket handshake failed: {}", err);
            return;
        }
    };
    let (mut write, mut read) = ws.split();
    let player_id = Uuid::new_v4().to_string();

    // -------------------------------
    // 1) Vehicle
    // -------------------------------
    {
        let mut phys = physics.lock().await;
        let lane = phys.vehicles.len() as f32 * 4.0;
        if let Err(err) = phys.spawn_vehicle(player_id.clone(), params, [lane, 0.0, 0.0]) {
            error!("could not spawn vehicle for {}: {}", player_id, err);
            return;
        }
    }

    // -------------------------------
    // 2) Outgoing channel + send loop
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    state.lock().await.register_client(player_id.clone(), tx.clone());

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    info!("player connected: {}", player_id);
    let welcome = serde_json::json!({ "type": "welcome", "player_id": player_id });
    let _ = tx.send(welcome.to_string());

    // -------------------------------
    // 3) Receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(err) => {
                debug!("read error for {}: {}", player_id, err);
                break;
            }
        };
        let Ok(text) = msg.to_text() else {
            continue;
        };
        let Some(parsed) = ClientMessage::from_json(text) else {
            continue;
        };

        match parsed {
            ClientMessage::Ping => {
                let _ = tx.send(r#"{"type":"pong"}"#.into());
            }
            ClientMessage::Input { accelerator, brake, steering, handbrake } => {
                let inputs = DrivingInputs { accelerator, brake, steering, handbrake };
                physics.lock().await.set_inputs(&player_id, inputs);
            }
            ClientMessage::Gear { gear } => {
                if !physics.lock().await.request_gear(&player_id, gear) {
                    debug!("gear {} rejected for {}", gear, player_id);
                }
            }
        }
    }

    info!("player disconnected: {}", player_id);
    state.lock().await.remove_client(&player_id);
    physics.lock().await.remove_vehicle(&player_id);
}
