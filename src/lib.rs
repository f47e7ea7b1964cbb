//! drift-server: top-down drift-racing simulation served over websockets.
//!
//! `drift` is the engine-agnostic per-tick vehicle model. The rest wires it to
//! a rapier3d world, lap timing, persistence and the network.

pub mod config;
pub mod drift;
pub mod error;
pub mod input;
pub mod lap;
pub mod net;
pub mod physics;
pub mod protocol;
pub mod state;
pub mod storage;
pub mod track;
pub mod tuning;
pub mod vehicle;
