//! Configuration management for the analysis pipeline
//!
//! This module provides the immutable per-session inputs (test configuration
//! and subject) plus runtime-tunable pipeline parameters loadable from a JSON
//! file, enabling threshold experiments without recompilation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Jump test protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpProtocol {
    /// Countermovement jump
    Cmj,
    /// Squat jump (static start, no countermovement)
    Sj,
    /// Drop jump (off a box, rebound on contact)
    Dj,
}

impl JumpProtocol {
    /// Coaching hint shown before the test starts
    pub fn hint(&self) -> &'static str {
        match self {
            JumpProtocol::Cmj => "Hands on hips, jump as high as you can.",
            JumpProtocol::Sj => "Hold the squat for 2 seconds, then jump with no dip.",
            JumpProtocol::Dj => "Step off the box and rebound as fast as possible.",
        }
    }
}

/// Signal source used for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMethod {
    /// Pose-estimator landmark frames
    Camera,
    /// Inertial sensor samples
    Imu,
}

/// Camera placement relative to the subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraAngle {
    /// Side view; one leg visible, sagittal-plane knee angle
    Sagittal,
    /// Front view; both legs visible, enables left/right asymmetry
    Frontal,
}

/// Immutable test configuration for one session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    pub protocol: JumpProtocol,
    pub method: DetectionMethod,
    pub camera_angle: CameraAngle,
    /// Box height for drop jumps, centimetres
    pub drop_height_cm: Option<f64>,
}

impl TestConfig {
    pub fn new(protocol: JumpProtocol, method: DetectionMethod) -> Self {
        Self {
            protocol,
            method,
            camera_angle: CameraAngle::Sagittal,
            drop_height_cm: None,
        }
    }
}

/// Subject anthropometrics, immutable for the session
///
/// Weight feeds all force computations; the rest is carried through to the
/// result for the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub height_cm: f64,
    pub weight_kg: f64,
    pub age_years: u32,
    pub gender: String,
}

impl Subject {
    /// Bodyweight in Newtons (1 G standing force)
    pub fn bodyweight_newtons(&self) -> f64 {
        self.weight_kg * crate::metrics::GRAVITY
    }
}

/// Tunable pipeline parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum landmark visibility for a frame to produce an angle sample
    pub visibility_threshold: f64,
    /// Complementary filter weight favoring the gyro integral
    pub fusion_alpha: f64,
    /// Exponential smoothing weight for the live force magnitude
    pub force_smoothing_alpha: f64,
    /// Sensor considered stale after this many ms without a fresh sample
    pub staleness_timeout_ms: u64,
    /// Force below this fraction of bodyweight counts as airborne
    pub flight_force_fraction: f64,
    /// Minimum duration for a run of airborne samples to count as flight
    pub min_flight_ms: f64,
    /// Knee angle above this is treated as full extension (camera flight detection)
    pub extension_threshold_deg: f64,
    /// Capacity of the live force display window
    pub force_window_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.5,
            fusion_alpha: 0.98,
            force_smoothing_alpha: 0.8,
            staleness_timeout_ms: 500,
            flight_force_fraction: 0.3,
            min_flight_ms: 120.0,
            extension_threshold_deg: 170.0,
            force_window_capacity: 150,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file
    ///
    /// Falls back to defaults if the file is missing or malformed so a broken
    /// config never blocks a testing session.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
