use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};

use drift_server::config;
use drift_server::drift::StepContext;
use drift_server::net::start_websocket_server;
use drift_server::physics::PhysicsWorld;
use drift_server::state::SharedGameState;
use drift_server::storage::JsonFileStore;
use drift_server::track::TrackLayout;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional
    let _ = dotenvy::dotenv();
    init_tracing();

    let tick_hz = config::tick_hz();
    let store = JsonFileStore::open(config::store_path());
    tracing::info!(store = %store.path().display(), tick_hz, "starting drift server");

    let track = TrackLayout::ring();
    let physics = PhysicsWorld::new(&track);
    let game = match SharedGameState::new(store, track) {
        Ok(game) => game,
        Err(e) => {
            tracing::error!(error = %e, "stored tuning is invalid; refusing to start");
            return Err(e.into());
        }
    };

    let state = Arc::new(Mutex::new(game));
    let physics = Arc::new(Mutex::new(physics));

    let addr = config::bind_addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind");
            return Err(e.into());
        }
    };

    tokio::spawn(start_websocket_server(
        listener,
        Arc::clone(&state),
        Arc::clone(&physics),
    ));

    // Fixed timestep; off the reference rate the per-tick factors are rescaled
    let dt = 1.0 / tick_hz as f32;
    let step = if tick_hz == config::DEFAULT_TICK_HZ {
        StepContext::fixed(dt)
    } else {
        StepContext::scaled(dt)
    };
    let mut ticker = interval(config::tick_interval(tick_hz));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let mut phys = physics.lock().await;
        let mut game = state.lock().await;

        game.advance(&mut phys, &step);
        game.broadcast_snapshot(&phys);
    }
}
