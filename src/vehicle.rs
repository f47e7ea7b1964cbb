// src/vehicle.rs
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::drift::{solve_step, Pose, StepContext, Telemetry, TickOutput, VehicleDynamicsState};
use crate::input::{InputLatch, RawControls};
use crate::lap::RaceState;
use crate::tuning::TuningParameters;

/// Everything one player's car carries between ticks, apart from its rigid
/// body (owned by `PhysicsWorld`, keyed by the same player id).
pub struct Vehicle {
    pub dynamics: VehicleDynamicsState, // velocity, yaw rate, rpm, steer
    pub latch: InputLatch,              // gear + edge state
    pub controls: RawControls,          // latest frame from the client
    pub race: RaceState,                // lap / checkpoint progress
    pub telemetry: Telemetry,           // last tick's readout
    rng: StdRng,                        // limiter bounce
}

impl Vehicle {
    pub fn new(spawn: Pose, tuning: &TuningParameters, checkpoints: usize, best_lap: Option<f32>) -> Self {
        Self::with_rng(spawn, tuning, checkpoints, best_lap, StdRng::from_entropy())
    }

    /// Deterministic limiter for replays and tests.
    pub fn seeded(
        spawn: Pose,
        tuning: &TuningParameters,
        checkpoints: usize,
        best_lap: Option<f32>,
        seed: u64,
    ) -> Self {
        Self::with_rng(spawn, tuning, checkpoints, best_lap, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        spawn: Pose,
        tuning: &TuningParameters,
        checkpoints: usize,
        best_lap: Option<f32>,
        rng: StdRng,
    ) -> Self {
        Self {
            dynamics: VehicleDynamicsState::new(spawn, tuning),
            latch: InputLatch::default(),
            controls: RawControls::default(),
            race: RaceState::new(checkpoints, best_lap),
            telemetry: Telemetry::default(),
            rng,
        }
    }

    /// Latch the held controls and advance the drift model one tick.
    /// A reset also rewinds the race.
    pub fn drive(
        &mut self,
        tuning: &TuningParameters,
        pose: Pose,
        mass: f32,
        step: &StepContext,
    ) -> TickOutput {
        let input = self.latch.sample(&self.controls, tuning);
        let out = solve_step(tuning, &mut self.dynamics, &input, pose, mass, step, &mut self.rng);

        if out.teleport.is_some() {
            self.race.reset();
        }
        self.telemetry = out.telemetry;
        out
    }
}
