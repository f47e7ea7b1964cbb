//! Core shared types for `drift` (engine-agnostic).
// drift/types.rs
use nalgebra::Vector2;

use crate::tuning::TuningParameters;

pub type Vec2 = Vector2<f32>;

// ============================================
// Model constants (calibrated against a ~60 Hz tick)
// ============================================
pub const AXLE_OFFSET: f32 = 30.0;            // COM -> axle, also the torque arm
pub const YAW_INERTIA_DIVISOR: f32 = 150.0;   // effective inertia = mass * this
pub const REDLINE_MARGIN_RPM: f32 = 500.0;    // rpm ceiling above redline
pub const LIMITER_BOUNCE_RPM: f32 = 200.0;    // needle drop per limiter hit
pub const WHEEL_RPM_SCALE: f32 = 10.0;        // gameplay feel, not a unit conversion
pub const REFERENCE_TICK_HZ: f32 = 60.0;

// ============================================
// Driver input
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SteerIntent {
    #[default]
    None,
    Left,
    Right,
}

/// One frame of driver input, already latched from raw controls.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriverInputSample {
    pub steer: SteerIntent,
    pub throttle: f32,      // 0..1
    pub brake: f32,         // 0..1
    pub handbrake: bool,
    pub gear: usize,        // index into gear_ratios (0 = neutral)
    pub reset: bool,        // one-shot
}

// ============================================
// Split ownership: solver owns Pose, core owns Motion
// ============================================

/// Position + heading as reported by the rigid-body solver at tick start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec2,
    pub heading: f32,   // radians, 0 = +x
}

impl Pose {
    pub fn new(x: f32, y: f32, heading: f32) -> Self {
        Self { position: Vec2::new(x, y), heading }
    }

    #[inline]
    pub fn forward(&self) -> Vec2 {
        Vec2::new(self.heading.cos(), self.heading.sin())
    }

    #[inline]
    pub fn right(&self) -> Vec2 {
        Vec2::new(-self.heading.sin(), self.heading.cos())
    }
}

/// Velocity + yaw rate written by the core. The solver adopts these verbatim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub velocity: Vec2,         // units / tick
    pub angular_velocity: f32,  // rad / tick
}

impl Motion {
    pub fn rest() -> Self {
        Self { velocity: Vec2::zeros(), angular_velocity: 0.0 }
    }
}

/// Per-vehicle state carried across ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleDynamicsState {
    pub velocity: Vec2,
    pub angular_velocity: f32,
    pub rpm: f32,
    pub side_velocity: f32,     // telemetry only
    pub steer: f32,             // smoothed, -1..1
    pub spawn: Pose,
}

impl VehicleDynamicsState {
    pub fn new(spawn: Pose, tuning: &TuningParameters) -> Self {
        Self {
            velocity: Vec2::zeros(),
            angular_velocity: 0.0,
            rpm: tuning.idle_rpm,
            side_velocity: 0.0,
            steer: 0.0,
            spawn,
        }
    }

    /// Back to spawn conditions. Steering is input-layer state and survives.
    pub fn reset(&mut self, tuning: &TuningParameters) {
        self.velocity = Vec2::zeros();
        self.angular_velocity = 0.0;
        self.rpm = tuning.idle_rpm;
        self.side_velocity = 0.0;
    }

    pub fn motion(&self) -> Motion {
        Motion { velocity: self.velocity, angular_velocity: self.angular_velocity }
    }
}

// ============================================
// Tick cadence
// ============================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cadence {
    /// Every call is exactly one reference tick; flat factors apply as-is.
    Fixed,
    /// Variable dt: flat per-tick factors are re-derived for dt / reference_dt.
    Scaled { reference_dt: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepContext {
    pub dt: f32,    // seconds
    pub cadence: Cadence,
}

impl StepContext {
    pub fn fixed(dt: f32) -> Self {
        Self { dt, cadence: Cadence::Fixed }
    }

    pub fn scaled(dt: f32) -> Self {
        Self { dt, cadence: Cadence::Scaled { reference_dt: 1.0 / REFERENCE_TICK_HZ } }
    }

    /// How many reference ticks this step represents.
    pub fn ticks(&self) -> f32 {
        match self.cadence {
            Cadence::Fixed => 1.0,
            Cadence::Scaled { reference_dt } if reference_dt > 0.0 => {
                (self.dt / reference_dt).max(0.0)
            }
            Cadence::Scaled { .. } => 1.0,
        }
    }

    /// Fraction removed/blended this step for a flat per-tick factor `k`:
    /// 1 - (1 - k)^ticks. Equals `k` for one tick.
    pub fn per_tick(&self, k: f32) -> f32 {
        match self.cadence {
            Cadence::Fixed => k,
            Cadence::Scaled { .. } => 1.0 - (1.0 - k).powf(self.ticks()),
        }
    }
}

// ============================================
// Tick output
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Telemetry {
    pub rpm: f32,
    pub gear: usize,
    pub side_velocity: f32,
    pub steer: f32,
    pub speed: f32,
    pub drive_force: f32,
    pub lateral_front: f32,
    pub lateral_rear: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    pub motion: Motion,
    /// Set on the reset edge: the solver must move the body here.
    pub teleport: Option<Pose>,
    pub telemetry: Telemetry,
}
