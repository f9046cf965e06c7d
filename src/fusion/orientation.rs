//! Complementary filter for IMU orientation
//!
//! Gyro integration is accurate over short windows but drifts without bound;
//! accelerometer inclination is drift-free but noisy under motion. Blending
//! the two with a fixed weight favoring the gyro suppresses both failure
//! modes:
//!
//! `new = alpha * (old + gyro_axis * dt) + (1 - alpha) * accel_angle`
//!
//! The filter must be fed the true elapsed dt of each sample, since gyro
//! drift scales with integration time.

use serde::{Deserialize, Serialize};

use super::Vec3;

/// Pitch/roll estimate in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationEstimate {
    pub pitch_radians: f64,
    pub roll_radians: f64,
}

/// Stateful complementary filter, one instance per session
///
/// Filter memory persists across frames within a session and is reset only
/// at session start; it is never shared between sessions.
#[derive(Debug, Clone)]
pub struct OrientationFilter {
    alpha: f64,
    pitch: f64,
    roll: f64,
}

impl OrientationFilter {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            pitch: 0.0,
            roll: 0.0,
        }
    }

    /// Reset filter memory for a new session
    pub fn reset(&mut self) {
        self.pitch = 0.0;
        self.roll = 0.0;
    }

    /// Blend one gyro/accel pair into the running orientation estimate
    ///
    /// `dt` is the true elapsed time in seconds since the previous sample.
    /// Without a gyro reading the filter degrades to a pure accelerometer
    /// estimate weighted by (1 - alpha), which stays bias-free.
    pub fn update(&mut self, accel: Vec3, gyro: Option<Vec3>, dt: f64) -> OrientationEstimate {
        let (pitch_gyro, roll_gyro) = match gyro {
            Some(g) => (self.pitch + g.x * dt, self.roll + g.y * dt),
            None => (self.pitch, self.roll),
        };

        let pitch_accel = accel.y.atan2(accel.z);
        let roll_accel = (-accel.x).atan2((accel.y * accel.y + accel.z * accel.z).sqrt());

        self.pitch = self.alpha * pitch_gyro + (1.0 - self.alpha) * pitch_accel;
        self.roll = self.alpha * roll_gyro + (1.0 - self.alpha) * roll_accel;

        OrientationEstimate {
            pitch_radians: self.pitch,
            roll_radians: self.roll,
        }
    }

    /// Current estimate without feeding a new sample
    pub fn estimate(&self) -> OrientationEstimate {
        OrientationEstimate {
            pitch_radians: self.pitch,
            roll_radians: self.roll,
        }
    }
}
