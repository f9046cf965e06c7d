// Sensor fusion - IMU orientation and force estimation
//
// Two estimators, both stateful and owned by exactly one session:
// - OrientationFilter: complementary filter blending gyro integration with
//   accelerometer inclination
// - ForceEstimator: orientation-independent smoothed force magnitude for the
//   live display, with staleness detection and a tagged synthetic fallback

pub mod force;
pub mod orientation;

pub use force::{ground_reaction_force, ForceEstimator, LiveForceSample, SignalSource};
pub use orientation::{OrientationEstimate, OrientationFilter};

use serde::{Deserialize, Serialize};

/// 3-axis sensor reading (m/s^2 for acceleration, rad/s for gyro rate)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm of the vector
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// One motion event from the inertial sensor
///
/// Acceleration includes gravity (device-frame), matching what mobile motion
/// APIs deliver. Gyro rate is optional; some devices expose only the
/// accelerometer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuSample {
    /// Producer clock timestamp in milliseconds; shared with the redraw loop
    pub time_millis: u64,
    pub accel: Vec3,
    pub gyro: Option<Vec3>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_magnitude() {
        let v = Vec3::new(3.0, 4.0, 0.0);
        assert!((v.magnitude() - 5.0).abs() < 1e-12);

        let zero = Vec3::new(0.0, 0.0, 0.0);
        assert_eq!(zero.magnitude(), 0.0);
    }
}
