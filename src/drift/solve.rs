// ==============================================================================
// solve.rs — PER-TICK VEHICLE SOLVER (STEER -> DRIVETRAIN -> TIRES -> EULER)
// ==============================================================================
// ------------------------------------------------------------------------------
// One call advances one vehicle by one tick:
// 1) body basis from the solver-reported heading, local (forward, side) speed
// 2) steering smoothing (steering.rs) -> wheel angle δ = s * max_steer
// 3) drivetrain (drivetrain.rs)      -> rpm, drive force
// 4) axle lateral forces (lateral.rs)
// 5) Euler step with drag/damping (integrate.rs)
// 6) reset edge: state back to spawn, teleport returned for the solver
//
// Pose is only read. Motion is written into the state and returned; the caller
// pushes it into the rigid-body solver verbatim.
// ------------------------------------------------------------------------------

use rand::Rng;

use crate::drift::drivetrain::update_drivetrain;
use crate::drift::integrate::{integrate, ChassisForces};
use crate::drift::lateral::solve_lateral;
use crate::drift::steering::update_steer;
use crate::drift::types::{
    DriverInputSample, Motion, Pose, StepContext, Telemetry, TickOutput, VehicleDynamicsState,
};
use crate::tuning::TuningParameters;

const MIN_MASS: f32 = 1e-6;

pub fn solve_step<R: Rng + ?Sized>(
    tuning: &TuningParameters,
    state: &mut VehicleDynamicsState,
    input: &DriverInputSample,
    pose: Pose,
    mass: f32,
    step: &StepContext,
    rng: &mut R,
) -> TickOutput {
    // steering is sampled every frame, reset or not
    state.steer = update_steer(state.steer, input.steer, step.dt, tuning);

    if input.reset {
        state.reset(tuning);
        return TickOutput {
            motion: Motion::rest(),
            teleport: Some(state.spawn),
            telemetry: Telemetry {
                rpm: state.rpm,
                gear: input.gear.min(tuning.top_gear()),
                steer: state.steer,
                ..Default::default()
            },
        };
    }

    let mass = mass.max(MIN_MASS);

    // --------------------------------------------------
    // Local frame
    // --------------------------------------------------
    let forward = pose.forward();
    let right = pose.right();
    let v_forward = state.velocity.dot(&forward);
    let v_side = state.velocity.dot(&right);

    let steer_rad = state.steer * tuning.max_steer_rad();

    // --------------------------------------------------
    // Engine
    // --------------------------------------------------
    let drivetrain = update_drivetrain(
        tuning,
        v_forward,
        input.gear,
        input.throttle,
        state.rpm,
        step,
        rng,
    );
    state.rpm = drivetrain.rpm;

    // --------------------------------------------------
    // Tires
    // --------------------------------------------------
    let lateral = solve_lateral(
        tuning,
        v_forward,
        v_side,
        state.angular_velocity,
        steer_rad,
        mass,
        input.handbrake,
    );

    // --------------------------------------------------
    // Integrate
    // --------------------------------------------------
    let forces = ChassisForces {
        drive_force: drivetrain.drive_force,
        brake: input.brake,
        lateral,
        steer_rad,
    };
    let motion = integrate(tuning, state.motion(), &forces, mass, forward, right, step);

    state.velocity = motion.velocity;
    state.angular_velocity = motion.angular_velocity;
    state.side_velocity = v_side;

    TickOutput {
        motion,
        teleport: None,
        telemetry: Telemetry {
            rpm: state.rpm,
            gear: drivetrain.gear,
            side_velocity: v_side,
            steer: state.steer,
            speed: motion.velocity.norm(),
            drive_force: drivetrain.drive_force,
            lateral_front: lateral.front,
            lateral_rear: lateral.rear,
        },
    }
}
