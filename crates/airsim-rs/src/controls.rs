use serde::{Deserialize, Serialize};

/// Actuation values applied to the car.
///
/// Field names match AirSim's `CarControls`, which the server decodes from a
/// named msgpack map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CarControls {
    /// Fraction of maximum throttle, `0.0..=1.0`.
    pub throttle: f32,
    /// Fraction of maximum steering angle, `-1.0..=1.0` (positive steers right).
    pub steering: f32,
    pub brake: f32,
    pub handbrake: bool,
    pub is_manual_gear: bool,
    pub manual_gear: i32,
    pub gear_immediate: bool,
}

impl Default for CarControls {
    fn default() -> Self {
        Self {
            throttle: 0.0,
            steering: 0.0,
            brake: 0.0,
            handbrake: false,
            is_manual_gear: false,
            manual_gear: 0,
            gear_immediate: true,
        }
    }
}

impl CarControls {
    /// Controls with the given throttle and steering and everything else at rest.
    pub fn new(throttle: f32, steering: f32) -> Self {
        Self {
            throttle,
            steering,
            ..Self::default()
        }
    }

    /// Whether throttle, steering and brake are all finite numbers.
    pub fn is_finite(&self) -> bool {
        self.throttle.is_finite() && self.steering.is_finite() && self.brake.is_finite()
    }
}

/// Snapshot of the car as reported by `getCarState`.
///
/// Kinematics and collision data are sent too but not decoded here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CarState {
    /// Speed in m/s.
    pub speed: f32,
    pub gear: i32,
    pub rpm: f32,
    pub maxrpm: f32,
    pub handbrake: bool,
    /// Simulation clock in nanoseconds.
    pub timestamp: u64,
}
