mod logging;
mod net;
mod state;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, MissedTickBehavior};

use vehicle_physics::config::VehicleParameters;
use vehicle_physics::error::ConfigError;
use vehicle_physics::physics::PhysicsWorld;
use vehicle_physics::upgrade::{apply_upgrade, UpgradeSpec};

use crate::net::start_websocket_server;
use crate::state::SharedGameState;

/// Fixed-step vehicle physics server.
///
/// Every connected websocket client drives one car; the server streams a
/// JSON snapshot with telemetry after each physics tick.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Vehicle parameter file (.toml or .json). Defaults to the built-in coupe.
    #[arg(short, long)]
    vehicle: Option<PathBuf>,

    /// Upgrade record (.toml or .json) applied on top of the vehicle.
    #[arg(short, long)]
    upgrade: Option<PathBuf>,

    /// Websocket bind address.
    #[arg(short, long, default_value = "0.0.0.0:9001")]
    bind: String,

    /// Physics ticks per second.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=1000))]
    tick_hz: u32,
}

fn load_parameters(cli: &Cli) -> Result<VehicleParameters, ConfigError> {
    let base = match &cli.vehicle {
        Some(path) => VehicleParameters::from_path(path)?,
        None => VehicleParameters::sports_coupe(),
    };
    match &cli.upgrade {
        Some(path) => {
            let spec = UpgradeSpec::from_path(path)?;
            info!("applying upgrade {}", spec.name.as_deref().unwrap_or("(unnamed)"));
            apply_upgrade(&base, &spec)
        }
        None => Ok(base),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = logging::try_init() {
        eprintln!("logger init failed: {err}");
    }
    let cli = Cli::parse();

    let params = match load_parameters(&cli) {
        Ok(params) => params,
        Err(err) => {
            error!("invalid vehicle configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let listener = match TcpListener::bind(&cli.bind).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {}: {}", cli.bind, err);
            return ExitCode::FAILURE;
        }
    };

    info!("starting vehicle physics server at {} Hz", cli.tick_hz);

    let state = Arc::new(Mutex::new(SharedGameState::new()));
    let physics = Arc::new(Mutex::new(PhysicsWorld::new()));

    tokio::spawn(start_websocket_server(
        listener,
        Arc::clone(&state),
        Arc::clone(&physics),
        params,
    ));

    let dt = 1.0 / cli.tick_hz as f32;
    let mut ticker = interval(Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let mut phys = physics.lock().await;
        phys.step(dt);

        let mut game = state.lock().await;
        game.tick += 1;
        game.broadcast_snapshot(&phys);
    }
}
