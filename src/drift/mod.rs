//! drift - engine-agnostic top-down vehicle dynamics (pure types + per-tick solver)

pub mod types;
pub mod steering;
pub mod drivetrain;
pub mod lateral;
pub mod integrate;
pub mod solve;

pub use types::*;
pub use solve::solve_step;
