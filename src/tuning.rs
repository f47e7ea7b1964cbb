// ==============================================================================
// tuning.rs — PHYSICS TUNING (ONE IMMUTABLE VALUE PER SESSION)
// ------------------------------------------------------------------------------
// TuningParameters is handed by reference into every solver call. It is never
// mutated mid-tick; a settings change replaces the whole value between ticks
// (after validate()).
//
// Field names on the wire / in the store keep the camelCase keys the clients
// already use (muFront, C_lat, idleRPM, ...). Missing keys fall back to the
// default for that field only.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::error::TuningError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TuningParameters {
    // --- Friction / grip ---
    pub mu_front: f32,                  // front axle grip coefficient
    pub mu_rear: f32,                   // rear axle grip coefficient
    pub mu_rear_handbrake_mult: f32,    // rear grip scale while handbrake held
    #[serde(rename = "C_lat")]
    pub c_lat: f32,                     // linear lateral force per unit slip

    // --- Steering ---
    pub max_steer_deg: f32,             // degrees at |steer| == 1
    pub steer_rate_deg_per_sec: f32,    // while a direction is held
    pub steer_return_deg_per_sec: f32,  // self-centering rate

    // --- Drive / brake / drag ---
    pub max_drive_force: f32,           // peak engine force (per tick units)
    pub brake_force: f32,               // full-pedal brake force
    pub linear_drag: f32,               // per-tick velocity decay (0..1)
    pub angular_damping: f32,           // per-tick yaw-rate decay (0..1)

    // --- Engine / transmission ---
    pub gear_ratios: Vec<f32>,          // index 0 = neutral
    pub final_drive: f32,
    pub wheel_radius: f32,              // world units
    #[serde(rename = "idleRPM")]
    pub idle_rpm: f32,
    #[serde(rename = "redlineRPM")]
    pub redline_rpm: f32,
    pub rpm_response: f32,              // per-tick smoothing weight (0..1)
}

impl Default for TuningParameters {
    fn default() -> Self {
        Self {
            mu_front: 0.9,
            mu_rear: 0.8,
            mu_rear_handbrake_mult: 0.4,
            c_lat: 0.5,

            max_steer_deg: 40.0,
            steer_rate_deg_per_sec: 150.0,
            steer_return_deg_per_sec: 100.0,

            max_drive_force: 0.05,
            brake_force: 0.03,
            linear_drag: 0.005,
            angular_damping: 0.1,

            gear_ratios: vec![0.0, 3.5, 2.3, 1.6, 1.2, 1.0],
            final_drive: 3.5,
            wheel_radius: 15.0,
            idle_rpm: 800.0,
            redline_rpm: 7500.0,
            rpm_response: 0.15,
        }
    }
}

impl TuningParameters {
    /// Highest valid gear index (neutral is 0).
    pub fn top_gear(&self) -> usize {
        self.gear_ratios.len().saturating_sub(1)
    }

    pub fn max_steer_rad(&self) -> f32 {
        self.max_steer_deg.to_radians()
    }

    /// Reject values that would make the model degenerate. Runs once at load
    /// and again on every hot reload; the solver assumes it has passed.
    pub fn validate(&self) -> Result<(), TuningError> {
        let scalars = [
            ("muFront", self.mu_front),
            ("muRear", self.mu_rear),
            ("muRearHandbrakeMult", self.mu_rear_handbrake_mult),
            ("C_lat", self.c_lat),
            ("maxSteerDeg", self.max_steer_deg),
            ("steerRateDegPerSec", self.steer_rate_deg_per_sec),
            ("steerReturnDegPerSec", self.steer_return_deg_per_sec),
            ("maxDriveForce", self.max_drive_force),
            ("brakeForce", self.brake_force),
            ("linearDrag", self.linear_drag),
            ("angularDamping", self.angular_damping),
            ("finalDrive", self.final_drive),
            ("wheelRadius", self.wheel_radius),
            ("idleRPM", self.idle_rpm),
            ("redlineRPM", self.redline_rpm),
            ("rpmResponse", self.rpm_response),
        ];

        for (field, value) in scalars {
            if !value.is_finite() {
                return Err(TuningError::NonFinite { field });
            }
        }

        if self.gear_ratios.is_empty() {
            return Err(TuningError::NoGears);
        }
        if self.gear_ratios.iter().any(|r| !r.is_finite()) {
            return Err(TuningError::NonFinite { field: "gearRatios" });
        }
        if let Some(&r) = self.gear_ratios.iter().find(|r| **r < 0.0) {
            return Err(TuningError::Negative { field: "gearRatios", value: r });
        }

        if self.redline_rpm <= self.idle_rpm {
            return Err(TuningError::DegenerateRpmBand {
                idle: self.idle_rpm,
                redline: self.redline_rpm,
            });
        }

        // divisors
        for (field, value) in [
            ("maxSteerDeg", self.max_steer_deg),
            ("wheelRadius", self.wheel_radius),
        ] {
            if value <= 0.0 {
                return Err(TuningError::NotPositive { field, value });
            }
        }

        for (field, value) in [
            ("muFront", self.mu_front),
            ("muRear", self.mu_rear),
            ("muRearHandbrakeMult", self.mu_rear_handbrake_mult),
            ("C_lat", self.c_lat),
            ("steerRateDegPerSec", self.steer_rate_deg_per_sec),
            ("steerReturnDegPerSec", self.steer_return_deg_per_sec),
            ("maxDriveForce", self.max_drive_force),
            ("brakeForce", self.brake_force),
            ("finalDrive", self.final_drive),
            ("idleRPM", self.idle_rpm),
        ] {
            if value < 0.0 {
                return Err(TuningError::Negative { field, value });
            }
        }

        for (field, value) in [
            ("linearDrag", self.linear_drag),
            ("angularDamping", self.angular_damping),
            ("rpmResponse", self.rpm_response),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TuningError::OutOfUnitRange { field, value });
            }
        }

        Ok(())
    }

    /// Consume and return self if valid.
    pub fn validated(self) -> Result<Self, TuningError> {
        self.validate()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(TuningParameters::default().validate(), Ok(()));
    }

    #[test]
    fn redline_at_or_below_idle_is_rejected() {
        let t = TuningParameters { redline_rpm: 800.0, ..Default::default() };
        assert_eq!(
            t.validate(),
            Err(TuningError::DegenerateRpmBand { idle: 800.0, redline: 800.0 })
        );
    }

    #[test]
    fn empty_gearbox_is_rejected() {
        let t = TuningParameters { gear_ratios: vec![], ..Default::default() };
        assert_eq!(t.validate(), Err(TuningError::NoGears));
    }

    #[test]
    fn zero_wheel_radius_is_rejected() {
        let t = TuningParameters { wheel_radius: 0.0, ..Default::default() };
        assert!(matches!(
            t.validate(),
            Err(TuningError::NotPositive { field: "wheelRadius", .. })
        ));
    }

    #[test]
    fn nan_is_rejected() {
        let t = TuningParameters { c_lat: f32::NAN, ..Default::default() };
        assert_eq!(t.validate(), Err(TuningError::NonFinite { field: "C_lat" }));
    }

    #[test]
    fn drag_above_one_is_rejected() {
        let t = TuningParameters { linear_drag: 1.5, ..Default::default() };
        assert!(matches!(
            t.validate(),
            Err(TuningError::OutOfUnitRange { field: "linearDrag", .. })
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let t: TuningParameters =
            serde_json::from_str(r#"{"muRear": 0.5, "C_lat": 0.7, "idleRPM": 900}"#).unwrap();
        assert_eq!(t.mu_rear, 0.5);
        assert_eq!(t.c_lat, 0.7);
        assert_eq!(t.idle_rpm, 900.0);
        assert_eq!(t.redline_rpm, 7500.0);
        assert_eq!(t.gear_ratios.len(), 6);
    }

    #[test]
    fn serializes_with_client_keys() {
        let v = serde_json::to_value(TuningParameters::default()).unwrap();
        for key in ["muFront", "muRearHandbrakeMult", "C_lat", "idleRPM", "redlineRPM", "gearRatios", "finalDrive"] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
    }
}
