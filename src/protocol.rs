// src/protocol.rs
use serde::{Deserialize, Serialize};

use crate::input::RawControls;
use crate::lap::LapEvent;
use crate::state::Snapshot;
use crate::tuning::TuningParameters;

/// Client -> server, one JSON text frame each, tagged by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Input(RawControls),
    Tuning(TuningParameters),
    Ping,
}

/// Server -> client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome { player_id: String, tuning: TuningParameters },
    Pong,
    Snapshot(Snapshot),
    TuningRejected { reason: String },
    Lap(LapEvent),
}
