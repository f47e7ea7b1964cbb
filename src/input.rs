// ==============================================================================
// input.rs — RAW CONTROLS -> DriverInputSample (EDGE LATCHING)
// ------------------------------------------------------------------------------
// Clients send their current key/axis state every frame. This latch turns that
// into one DriverInputSample per tick:
// - steer intent from held left/right (left wins when both are down)
// - throttle / brake clamped to 0..1
// - gear up / down on rising edges only, kept inside the gearbox
// - reset as a one-shot on its rising edge
// ==============================================================================

use serde::Deserialize;

use crate::drift::{DriverInputSample, SteerIntent};
use crate::tuning::TuningParameters;

/// Raw per-frame controls as sent by a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawControls {
    pub left: bool,
    pub right: bool,
    pub throttle: f32,
    pub brake: f32,
    pub handbrake: bool,
    pub gear_up: bool,
    pub gear_down: bool,
    pub reset: bool,
}

#[derive(Debug, Clone)]
pub struct InputLatch {
    gear: usize,
    prev: RawControls,
}

impl Default for InputLatch {
    fn default() -> Self {
        // first gear, not neutral, so a fresh car pulls away immediately
        Self { gear: 1, prev: RawControls::default() }
    }
}

impl InputLatch {
    pub fn gear(&self) -> usize {
        self.gear
    }

    pub fn sample(&mut self, raw: &RawControls, tuning: &TuningParameters) -> DriverInputSample {
        let top = tuning.top_gear();
        self.gear = self.gear.min(top);

        if raw.gear_up && !self.prev.gear_up && self.gear < top {
            self.gear += 1;
        }
        if raw.gear_down && !self.prev.gear_down && self.gear > 0 {
            self.gear -= 1;
        }

        let reset = raw.reset && !self.prev.reset;

        let steer = if raw.left {
            SteerIntent::Left
        } else if raw.right {
            SteerIntent::Right
        } else {
            SteerIntent::None
        };

        self.prev = *raw;

        DriverInputSample {
            steer,
            throttle: sanitize_pedal(raw.throttle),
            brake: sanitize_pedal(raw.brake),
            handbrake: raw.handbrake,
            gear: self.gear,
            reset,
        }
    }
}

#[inline]
fn sanitize_pedal(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}
