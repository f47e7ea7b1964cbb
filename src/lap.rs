// ==============================================================================
// lap.rs — LAP TIMING FROM SENSOR CROSSINGS
// ------------------------------------------------------------------------------
// Fed with sensor labels on the tick the car enters them (physics.rs does the
// edge detection) plus the simulation clock:
//
// - lap 0, finish      : race starts, lap 1 timer starts
// - checkpoint         : remembered for the current lap
// - finish, all cps    : lap complete, timer restarts, best lap updated
// - finish, cps missing: ignored (no shortcutting)
//
// Times are simulation seconds (tick * dt), not wall clock.
// ==============================================================================

use std::collections::HashSet;

use serde::Serialize;

use crate::track::FINISH_LABEL;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LapEvent {
    RaceStarted,
    Checkpoint { label: String },
    LapCompleted { lap: u32, time: f32, new_best: bool },
}

#[derive(Debug, Clone)]
pub struct RaceState {
    pub lap: u32,
    lap_started_at: f64,
    pub current_lap_time: f32,
    pub best_lap: Option<f32>,
    checkpoints_passed: HashSet<String>,
    total_checkpoints: usize,
}

impl RaceState {
    pub fn new(total_checkpoints: usize, best_lap: Option<f32>) -> Self {
        Self {
            lap: 0,
            lap_started_at: 0.0,
            current_lap_time: 0.0,
            best_lap,
            checkpoints_passed: HashSet::new(),
            total_checkpoints,
        }
    }

    pub fn checkpoints_passed(&self) -> usize {
        self.checkpoints_passed.len()
    }

    /// Advance the running lap clock.
    pub fn tick(&mut self, now: f64) {
        if self.lap > 0 {
            self.current_lap_time = (now - self.lap_started_at) as f32;
        }
    }

    pub fn on_sensor(&mut self, label: &str, now: f64) -> Option<LapEvent> {
        if label == FINISH_LABEL {
            if self.lap > 0 && self.checkpoints_passed.len() >= self.total_checkpoints {
                return Some(self.complete_lap(now));
            }
            if self.lap == 0 {
                self.start(now);
                return Some(LapEvent::RaceStarted);
            }
            return None;
        }

        if self.lap > 0 && self.checkpoints_passed.insert(label.to_string()) {
            return Some(LapEvent::Checkpoint { label: label.to_string() });
        }
        None
    }

    /// Back to the grid; the best lap is kept.
    pub fn reset(&mut self) {
        self.lap = 0;
        self.lap_started_at = 0.0;
        self.current_lap_time = 0.0;
        self.checkpoints_passed.clear();
    }

    fn start(&mut self, now: f64) {
        self.lap = 1;
        self.lap_started_at = now;
        self.current_lap_time = 0.0;
        self.checkpoints_passed.clear();
    }

    fn complete_lap(&mut self, now: f64) -> LapEvent {
        let time = (now - self.lap_started_at) as f32;
        let new_best = self.best_lap.is_none_or(|best| time < best);
        if new_best {
            self.best_lap = Some(time);
        }

        let lap = self.lap;
        self.lap += 1;
        self.lap_started_at = now;
        self.current_lap_time = 0.0;
        self.checkpoints_passed.clear();

        LapEvent::LapCompleted { lap, time, new_best }
    }
}
