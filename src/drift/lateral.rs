// ==============================================================================
// lateral.rs — AXLE LATERAL TIRE MODEL (LINEAR + COULOMB CLAMP)
// ==============================================================================
// Two lumped axles, AXLE_OFFSET ahead of / behind the centre of mass.
//
// Model steps:
// 1) side velocity at each axle from yaw:  v_side ± ω * AXLE_OFFSET
// 2) front slip measured in the steered wheel frame:
//        slip_f = v_side_f * cos δ - v_forward * sin δ
//    rear wheels are not steered: slip_r = v_side_r
// 3) linear force opposing slip:  F = -slip * C_lat
// 4) Coulomb clamp:  |F| <= μ_axle * mass * 0.5   (mass split evenly)
//    handbrake scales μ_rear by mu_rear_handbrake_mult
//
// The clamp is the only nonlinearity here and is what lets the rear step out.
// ==============================================================================
// Cardinal Rules
// ==============================================================================
// - Force always opposes slip; it never exceeds the axle friction limit.
// ==============================================================================

use crate::drift::types::AXLE_OFFSET;
use crate::tuning::TuningParameters;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxleForces {
    pub front: f32,
    pub rear: f32,
    pub limit_front: f32,
    pub limit_rear: f32,
}

/// (front, rear) friction limits. Never negative.
pub fn friction_limits(tuning: &TuningParameters, mass: f32, handbrake: bool) -> (f32, f32) {
    let mu_rear = if handbrake {
        tuning.mu_rear * tuning.mu_rear_handbrake_mult
    } else {
        tuning.mu_rear
    };

    let front = (tuning.mu_front * mass * 0.5).max(0.0);
    let rear = (mu_rear * mass * 0.5).max(0.0);
    (front, rear)
}

pub fn solve_lateral(
    tuning: &TuningParameters,
    v_forward: f32,
    v_side: f32,
    angular_velocity: f32,
    steer_rad: f32,
    mass: f32,
    handbrake: bool,
) -> AxleForces {
    let (limit_front, limit_rear) = friction_limits(tuning, mass, handbrake);

    let v_side_front = v_side + angular_velocity * AXLE_OFFSET;
    let v_side_rear = v_side - angular_velocity * AXLE_OFFSET;

    // project onto the axis perpendicular to the steered wheel
    let slip_front = v_side_front * steer_rad.cos() - v_forward * steer_rad.sin();
    let slip_rear = v_side_rear;

    let front = (-slip_front * tuning.c_lat).clamp(-limit_front, limit_front);
    let rear = (-slip_rear * tuning.c_lat).clamp(-limit_rear, limit_rear);

    AxleForces { front, rear, limit_front, limit_rear }
}
