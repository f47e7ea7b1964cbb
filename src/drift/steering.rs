// ==============================================================================
// steering.rs — STEER SMOOTHING (RATE LIMIT + SELF-CENTERING)
// ==============================================================================
// Converts a held left/right intent into a normalized steer value s ∈ [-1, 1]:
//
//   held left   : s -= (steer_rate   / max_steer) * dt
//   held right  : s += (steer_rate   / max_steer) * dt
//   released    : |s| -= (steer_return / max_steer) * dt, pinned at 0
//
// Rates are given in deg/s and normalized by max_steer_deg so that the value
// maps linearly onto the wheel angle (s * max_steer). Releasing never flips
// the sign in one step.
// ==============================================================================

use crate::drift::types::SteerIntent;
use crate::tuning::TuningParameters;

pub fn update_steer(
    steer: f32,
    intent: SteerIntent,
    dt: f32,                    // seconds
    tuning: &TuningParameters,
) -> f32 {
    let dt = dt.max(0.0);
    let max = tuning.max_steer_deg;
    let steer_speed = tuning.steer_rate_deg_per_sec / max;
    let return_speed = tuning.steer_return_deg_per_sec / max;

    let s = match intent {
        SteerIntent::Left => steer - steer_speed * dt,
        SteerIntent::Right => steer + steer_speed * dt,
        SteerIntent::None => return_to_center(steer, return_speed * dt),
    };

    s.clamp(-1.0, 1.0)
}

#[inline]
fn return_to_center(steer: f32, step: f32) -> f32 {
    if steer > 0.0 {
        (steer - step).max(0.0)
    } else if steer < 0.0 {
        (steer + step).min(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn left_and_right_move_at_rate() {
        let t = TuningParameters::default();
        // 150 / 40 per second
        let s = update_steer(0.0, SteerIntent::Right, 0.1, &t);
        assert!((s - 0.375).abs() < 1e-6);
        let s = update_steer(0.0, SteerIntent::Left, 0.1, &t);
        assert!((s + 0.375).abs() < 1e-6);
    }

    #[test]
    fn release_pins_at_zero() {
        let t = TuningParameters::default();
        // return step is 2.5/s * 1s = 2.5, far past zero
        assert_eq!(update_steer(0.3, SteerIntent::None, 1.0, &t), 0.0);
        assert_eq!(update_steer(-0.3, SteerIntent::None, 1.0, &t), 0.0);
    }

    #[test]
    fn holding_saturates() {
        let t = TuningParameters::default();
        let mut s = 0.0;
        for _ in 0..120 {
            s = update_steer(s, SteerIntent::Right, DT, &t);
        }
        assert_eq!(s, 1.0);
    }

    proptest! {
        #[test]
        fn prop_steer_stays_in_range(
            start in -1.0f32..=1.0,
            dt in 0.0f32..0.5,
            dir in 0u8..3,
        ) {
            let t = TuningParameters::default();
            let intent = match dir { 0 => SteerIntent::None, 1 => SteerIntent::Left, _ => SteerIntent::Right };
            let s = update_steer(start, intent, dt, &t);
            prop_assert!((-1.0..=1.0).contains(&s));
        }

        #[test]
        fn prop_release_decays_without_overshoot(start in -1.0f32..=1.0, dt in 0.0f32..0.1) {
            let t = TuningParameters::default();
            let mut s = start;
            for _ in 0..200 {
                let next = update_steer(s, SteerIntent::None, dt, &t);
                prop_assert!(next.abs() <= s.abs());
                prop_assert!(next == 0.0 || next.signum() == start.signum());
                s = next;
            }
        }
    }
}
