// src/state.rs
use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::drift::StepContext;
use crate::error::TuningError;
use crate::input::RawControls;
use crate::lap::LapEvent;
use crate::physics::{PhysicsEvent, PhysicsWorld};
use crate::protocol::ServerMessage;
use crate::storage::{self, KeyValueStore};
use crate::track::TrackLayout;
use crate::tuning::TuningParameters;
use crate::vehicle::Vehicle;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlayerSnapshot {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub speed: f32,         // units / tick
    pub rpm: f32,
    pub gear: usize,
    pub side_velocity: f32,
    pub steer: f32,
    pub drive_force: f32,
    pub lateral_front: f32,
    pub lateral_rear: f32,
    pub lap: u32,
    pub lap_time: f32,      // seconds into the current lap
    pub best_lap: Option<f32>,  // server record
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Snapshot {
    pub tick: u64,
    pub players: Vec<PlayerSnapshot>,
}

/// Commanded speed (units / tick) above which a wall contact is logged.
pub const STRONG_HIT_SPEED: f32 = 5.0;

pub struct SharedGameState<S: KeyValueStore> {
    pub tick: u64,
    pub tuning: TuningParameters,
    pub track: TrackLayout,
    pub best_lap: Option<f32>,     // server-wide record, persisted
    pub clients: HashMap<String, UnboundedSender<String>>,
    pub vehicles: HashMap<String, Vehicle>,
    store: S,
}

impl<S: KeyValueStore> SharedGameState<S> {
    /// Loads tuning and the lap record from `store`. Stored tuning that fails
    /// validation is returned as an error.
    pub fn new(store: S, track: TrackLayout) -> Result<Self, TuningError> {
        let tuning = storage::load_tuning(&store)?;
        let best_lap = storage::best_lap(&store);

        tracing::info!(best_lap = ?best_lap, gears = tuning.gear_ratios.len(), "game state loaded");

        Ok(Self {
            tick: 0,
            tuning,
            track,
            best_lap,
            clients: HashMap::new(),
            vehicles: HashMap::new(),
            store,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a player: outgoing channel, drift state, rigid body at the spawn.
    pub fn add_player(&mut self, tx: UnboundedSender<String>, physics: &mut PhysicsWorld) -> String {
        let id = Uuid::new_v4().to_string();
        let spawn = self.track.spawn;

        let vehicle = Vehicle::new(spawn, &self.tuning, self.track.checkpoint_count(), self.best_lap);
        physics.spawn_car(&id, spawn);

        self.clients.insert(id.clone(), tx);
        self.vehicles.insert(id.clone(), vehicle);
        id
    }

    pub fn remove_player(&mut self, id: &str, physics: &mut PhysicsWorld) {
        self.clients.remove(id);
        self.vehicles.remove(id);
        physics.remove_car(id);
    }

    pub fn update_controls(&mut self, id: &str, controls: RawControls) {
        if let Some(vehicle) = self.vehicles.get_mut(id) {
            vehicle.controls = controls;
        }
    }

    /// Swap in new tuning for every car. Validated first; persisted after.
    /// A failed write keeps the new tuning live for this session.
    pub fn replace_tuning(&mut self, tuning: TuningParameters) -> Result<(), TuningError> {
        let tuning = tuning.validated()?;
        if let Err(e) = storage::save_tuning(&mut self.store, &tuning) {
            tracing::error!(error = %e, "failed to persist tuning");
        }
        self.tuning = tuning;
        tracing::info!("tuning replaced");
        Ok(())
    }

    // --------------------------------------------------
    // One simulation tick
    // --------------------------------------------------
    pub fn advance(&mut self, physics: &mut PhysicsWorld, step: &StepContext) {
        for (id, vehicle) in self.vehicles.iter_mut() {
            let (Some(pose), Some(mass)) = (physics.pose(id), physics.mass(id)) else {
                continue;
            };

            let out = vehicle.drive(&self.tuning, pose, mass, step);
            if let Some(spawn) = out.teleport {
                physics.teleport(id, spawn);
                tracing::debug!(player_id = %id, "car reset to spawn");
            }
            physics.apply_motion(id, out.motion);
        }

        let events = physics.step(step.dt);

        self.tick += 1;
        let now = self.tick as f64 * step.dt as f64;

        for vehicle in self.vehicles.values_mut() {
            vehicle.race.tick(now);
        }

        for event in events {
            self.on_physics_event(event, now, physics);
        }
    }

    fn on_physics_event(&mut self, event: PhysicsEvent, now: f64, physics: &mut PhysicsWorld) {
        match event {
            PhysicsEvent::SensorEntered { player_id, label } => {
                let Some(vehicle) = self.vehicles.get_mut(&player_id) else { return };
                if let Some(lap) = vehicle.race.on_sensor(&label, now) {
                    self.on_lap_event(&player_id, lap);
                }
            }
            PhysicsEvent::WallHit { player_id } => {
                let speed = self.vehicles.get(&player_id).map_or(0.0, |v| v.telemetry.speed);
                if speed > STRONG_HIT_SPEED {
                    tracing::info!(player_id = %player_id, speed, "hard wall hit");
                }
            }
            PhysicsEvent::OutOfBounds { player_id } => {
                tracing::warn!(player_id = %player_id, "car left the world; resetting");
                let Some(vehicle) = self.vehicles.get_mut(&player_id) else { return };
                vehicle.dynamics.reset(&self.tuning);
                vehicle.race.reset();
                physics.teleport(&player_id, vehicle.dynamics.spawn);
            }
        }
    }

    fn on_lap_event(&mut self, player_id: &str, event: LapEvent) {
        match &event {
            LapEvent::RaceStarted => {
                tracing::debug!(player_id = %player_id, "race started");
            }
            LapEvent::Checkpoint { label } => {
                tracing::debug!(player_id = %player_id, checkpoint = %label, "checkpoint");
            }
            LapEvent::LapCompleted { lap, time, new_best } => {
                tracing::info!(player_id = %player_id, lap, lap_time = time, new_best, "lap completed");
                if self.best_lap.is_none_or(|best| *time < best) {
                    self.best_lap = Some(*time);
                    if let Err(e) = storage::save_best_lap(&mut self.store, *time) {
                        tracing::error!(error = %e, "failed to persist best lap");
                    }
                    // every race judges new_best against the server record
                    for vehicle in self.vehicles.values_mut() {
                        vehicle.race.best_lap = self.best_lap;
                    }
                }
            }
        }
        self.send_to(player_id, &ServerMessage::Lap(event));
    }

    // --------------------------------------------------
    // Outgoing
    // --------------------------------------------------
    pub fn send_to(&self, id: &str, msg: &ServerMessage) {
        let Some(tx) = self.clients.get(id) else { return };
        match serde_json::to_string(msg) {
            Ok(json) => {
                let _ = tx.send(json);
            }
            Err(e) => tracing::error!(error = %e, "failed to encode message"),
        }
    }

    pub fn snapshot(&self, physics: &PhysicsWorld) -> Snapshot {
        let mut players = Vec::with_capacity(self.vehicles.len());

        for (id, vehicle) in &self.vehicles {
            let Some(pose) = physics.pose(id) else { continue };
            let t = &vehicle.telemetry;
            players.push(PlayerSnapshot {
                id: id.clone(),
                x: pose.position.x,
                y: pose.position.y,
                heading: pose.heading,
                speed: t.speed,
                rpm: t.rpm,
                gear: vehicle.latch.gear(),
                side_velocity: t.side_velocity,
                steer: t.steer,
                drive_force: t.drive_force,
                lateral_front: t.lateral_front,
                lateral_rear: t.lateral_rear,
                lap: vehicle.race.lap,
                lap_time: vehicle.race.current_lap_time,
                best_lap: self.best_lap,
            });
        }
        players.sort_by(|a, b| a.id.cmp(&b.id));

        Snapshot { tick: self.tick, players }
    }

    /// Build and send a snapshot of all cars to all clients.
    pub fn broadcast_snapshot(&self, physics: &PhysicsWorld) {
        let json = match serde_json::to_string(&ServerMessage::Snapshot(self.snapshot(physics))) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode snapshot");
                return;
            }
        };

        for tx in self.clients.values() {
            let _ = tx.send(json.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use tokio::sync::mpsc;

    const DT: f32 = 1.0 / 60.0;

    fn setup() -> (SharedGameState<MemoryStore>, PhysicsWorld) {
        let track = TrackLayout::ring();
        let physics = PhysicsWorld::new(&track);
        let game = SharedGameState::new(MemoryStore::new(), track).unwrap();
        (game, physics)
    }

    #[test]
    fn throttle_moves_car_along_heading() {
        let (mut game, mut physics) = setup();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = game.add_player(tx, &mut physics);
        game.update_controls(&id, RawControls { throttle: 1.0, ..Default::default() });

        let start = physics.pose(&id).unwrap().position;
        for _ in 0..30 {
            game.advance(&mut physics, &StepContext::fixed(DT));
        }
        let end = physics.pose(&id).unwrap().position;
        assert!(end.x > start.x);
        assert_eq!(game.tick, 30);

        let snap = game.snapshot(&physics);
        assert!(snap.players[0].drive_force > 0.0);
    }

    #[test]
    fn spawning_on_finish_starts_the_race_and_notifies() {
        let (mut game, mut physics) = setup();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = game.add_player(tx, &mut physics);

        game.advance(&mut physics, &StepContext::fixed(DT));
        assert_eq!(game.vehicles[&id].race.lap, 1);

        let msg = rx.try_recv().unwrap();
        assert!(msg.contains("\"type\":\"lap\""));
        assert!(msg.contains("race_started"));
    }

    #[test]
    fn invalid_tuning_is_rejected_and_not_stored() {
        let (mut game, _physics) = setup();
        let bad = TuningParameters { gear_ratios: vec![], ..Default::default() };
        assert_eq!(game.replace_tuning(bad), Err(TuningError::NoGears));
        assert_eq!(game.tuning, TuningParameters::default());
        assert_eq!(storage::load_tuning(game.store()).unwrap(), TuningParameters::default());
    }

    #[test]
    fn valid_tuning_is_applied_and_persisted() {
        let (mut game, _physics) = setup();
        let tuned = TuningParameters { mu_rear: 0.6, ..Default::default() };
        game.replace_tuning(tuned.clone()).unwrap();
        assert_eq!(game.tuning, tuned);
        assert_eq!(storage::load_tuning(game.store()).unwrap(), tuned);
    }

    fn run_lap(game: &mut SharedGameState<MemoryStore>, physics: &mut PhysicsWorld, id: &str, start: f64, end: f64) {
        for (label, now) in [("finish", start), ("cp1", start + 1.0), ("cp2", start + 2.0), ("finish", end)] {
            let event = PhysicsEvent::SensorEntered { player_id: id.to_string(), label: label.to_string() };
            game.on_physics_event(event, now, physics);
        }
    }

    fn last_message(rx: &mut mpsc::UnboundedReceiver<String>) -> Option<String> {
        let mut last = None;
        while let Ok(msg) = rx.try_recv() {
            last = Some(msg);
        }
        last
    }

    #[test]
    fn best_lap_is_shared_by_every_player() {
        let (mut game, mut physics) = setup();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = game.add_player(tx_a, &mut physics);
        let b = game.add_player(tx_b, &mut physics);

        run_lap(&mut game, &mut physics, &a, 0.0, 50.0);
        assert_eq!(game.best_lap, Some(50.0));
        assert_eq!(game.vehicles[&b].race.best_lap, Some(50.0));

        // slower lap by the other player is not a record
        run_lap(&mut game, &mut physics, &b, 100.0, 160.0);
        assert_eq!(game.best_lap, Some(50.0));
        assert_eq!(storage::best_lap(game.store()), Some(50.0));

        let msg = last_message(&mut rx_b).unwrap();
        assert!(msg.contains("lap_completed"));
        assert!(msg.contains("\"new_best\":false"));

        let snap = game.snapshot(&physics);
        assert!(snap.players.iter().all(|p| p.best_lap == Some(50.0)));
    }

    #[test]
    fn faster_lap_by_anyone_replaces_the_record() {
        let (mut game, mut physics) = setup();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = game.add_player(tx_a, &mut physics);
        let b = game.add_player(tx_b, &mut physics);

        run_lap(&mut game, &mut physics, &a, 0.0, 60.0);
        run_lap(&mut game, &mut physics, &b, 100.0, 145.0);

        assert_eq!(game.best_lap, Some(45.0));
        assert_eq!(storage::best_lap(game.store()), Some(45.0));
        assert_eq!(game.vehicles[&a].race.best_lap, Some(45.0));
        assert!(last_message(&mut rx_b).unwrap().contains("\"new_best\":true"));
    }

    #[test]
    fn snapshot_lists_every_player() {
        let (mut game, mut physics) = setup();
        let (tx, _rx) = mpsc::unbounded_channel();
        let a = game.add_player(tx.clone(), &mut physics);
        let b = game.add_player(tx, &mut physics);
        game.remove_player(&a, &mut physics);

        let snap = game.snapshot(&physics);
        assert_eq!(snap.players.len(), 1);
        assert_eq!(snap.players[0].id, b);
        assert_eq!(snap.players[0].rpm, 0.0);
    }
}
