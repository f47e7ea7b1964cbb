// ==============================================================================
// integrate.rs — FORCE -> VELOCITY (EXPLICIT EULER, ONE TICK)
// ==============================================================================
// Combines longitudinal (drive - brake) and the two axle lateral forces:
//
//   F_fwd  = drive - brake * brake_force
//   τ      = F_front * cos δ * AXLE_OFFSET - F_rear * AXLE_OFFSET
//   a_fwd  = F_fwd / m
//   a_side = (F_front + F_rear) / m
//   v     += forward * a_fwd + right * a_side
//   v     *= 1 - linear_drag
//   ω     += τ / (m * YAW_INERTIA_DIVISOR)
//   ω     *= 1 - angular_damping
//
// Accelerations are per tick; under Cadence::Scaled they are multiplied by the
// tick count and the decay factors are compounded (see StepContext).
// ==============================================================================

use crate::drift::lateral::AxleForces;
use crate::drift::types::{Motion, StepContext, Vec2, AXLE_OFFSET, YAW_INERTIA_DIVISOR};
use crate::tuning::TuningParameters;

#[derive(Debug, Clone, Copy)]
pub struct ChassisForces {
    pub drive_force: f32,
    pub brake: f32,         // 0..1 pedal
    pub lateral: AxleForces,
    pub steer_rad: f32,
}

#[inline]
pub fn yaw_torque(lateral: &AxleForces, steer_rad: f32) -> f32 {
    lateral.front * steer_rad.cos() * AXLE_OFFSET - lateral.rear * AXLE_OFFSET
}

pub fn integrate(
    tuning: &TuningParameters,
    motion: Motion,
    forces: &ChassisForces,
    mass: f32,
    forward: Vec2,
    right: Vec2,
    step: &StepContext,
) -> Motion {
    let ticks = step.ticks();
    let brake = forces.brake.clamp(0.0, 1.0);

    let total_forward = forces.drive_force - brake * tuning.brake_force;
    let torque = yaw_torque(&forces.lateral, forces.steer_rad);

    let acc_forward = total_forward / mass;
    let acc_side = (forces.lateral.front + forces.lateral.rear) / mass;

    // local -> world
    let acc = forward * acc_forward + right * acc_side;

    let mut velocity = motion.velocity + acc * ticks;
    velocity *= 1.0 - step.per_tick(tuning.linear_drag);

    let mut angular_velocity =
        motion.angular_velocity + torque / (mass * YAW_INERTIA_DIVISOR) * ticks;
    angular_velocity *= 1.0 - step.per_tick(tuning.angular_damping);

    Motion { velocity, angular_velocity }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_lateral() -> AxleForces {
        AxleForces::default()
    }

    #[test]
    fn drive_accelerates_along_heading() {
        let t = TuningParameters::default();
        let forces = ChassisForces { drive_force: 0.025, brake: 0.0, lateral: no_lateral(), steer_rad: 0.0 };
        let forward = Vec2::new(0.0, 1.0);
        let right = Vec2::new(-1.0, 0.0);
        let m = integrate(&t, Motion::rest(), &forces, 1.0, forward, right, &StepContext::fixed(1.0 / 60.0));
        assert!(m.velocity.x.abs() < 1e-9);
        assert!((m.velocity.y - 0.025 * (1.0 - t.linear_drag)).abs() < 1e-7);
        assert_eq!(m.angular_velocity, 0.0);
    }

    #[test]
    fn drag_and_damping_decay() {
        let t = TuningParameters::default();
        let forces = ChassisForces { drive_force: 0.0, brake: 0.0, lateral: no_lateral(), steer_rad: 0.0 };
        let start = Motion { velocity: Vec2::new(10.0, 0.0), angular_velocity: 0.05 };
        let m = integrate(&t, start, &forces, 1.0, Vec2::x(), Vec2::y(), &StepContext::fixed(1.0 / 60.0));
        assert!((m.velocity.x - 9.95).abs() < 1e-5);
        assert!((m.angular_velocity - 0.045).abs() < 1e-7);
    }

    #[test]
    fn rear_push_yaws_opposite_to_front_push() {
        let front_only = AxleForces { front: 0.1, ..Default::default() };
        let rear_only = AxleForces { rear: 0.1, ..Default::default() };
        assert!(yaw_torque(&front_only, 0.0) > 0.0);
        assert!(yaw_torque(&rear_only, 0.0) < 0.0);
        // steered front loses lever arm
        assert!(yaw_torque(&front_only, 0.5) < yaw_torque(&front_only, 0.0));
    }

    #[test]
    fn scaled_cadence_matches_fixed_at_reference_dt() {
        let t = TuningParameters::default();
        let forces = ChassisForces {
            drive_force: 0.03,
            brake: 0.2,
            lateral: AxleForces { front: 0.1, rear: -0.05, ..Default::default() },
            steer_rad: 0.1,
        };
        let start = Motion { velocity: Vec2::new(3.0, -1.0), angular_velocity: 0.01 };
        let a = integrate(&t, start, &forces, 1.0, Vec2::x(), Vec2::y(), &StepContext::fixed(1.0 / 60.0));
        let b = integrate(&t, start, &forces, 1.0, Vec2::x(), Vec2::y(), &StepContext::scaled(1.0 / 60.0));
        assert!((a.velocity - b.velocity).norm() < 1e-5);
        assert!((a.angular_velocity - b.angular_velocity).abs() < 1e-6);
    }
}
