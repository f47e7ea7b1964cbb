// ==============================================================================
// error.rs — ERROR TYPES (CONFIG LOAD + PERSISTENCE)
// ------------------------------------------------------------------------------
// The per-tick solver never fails: out-of-range inputs are clamped. The only
// failures in this server happen at the edges:
// - TuningError: a degenerate TuningParameters value, rejected before any tick
// - StoreError:  the key-value store could not be read or written
// ==============================================================================

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TuningError {
    #[error("redlineRPM ({redline}) must be greater than idleRPM ({idle})")]
    DegenerateRpmBand { idle: f32, redline: f32 },

    #[error("gearRatios must contain at least the neutral entry")]
    NoGears,

    #[error("{field} must be finite")]
    NonFinite { field: &'static str },

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f32 },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents are not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store root must be a json object")]
    NotAnObject,
}
