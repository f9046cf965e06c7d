use serde::{Deserialize, Serialize};

use crate::fusion::LiveForceSample;

/// Live scalar readout for the display layer
///
/// Display only, never persisted. The force value carries its provenance tag
/// so the UI can show whether the sensor is connected or the placeholder
/// waveform is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveReadout {
    /// Milliseconds since session start
    pub time_millis: u64,
    /// Current knee angle when the frame produced one
    pub knee_angle_deg: Option<f64>,
    /// Current smoothed (or synthetic) force
    pub force: Option<LiveForceSample>,
    /// Running peak knee flexion of the session so far
    pub max_flexion_deg: f64,
    /// Whether a recording is in progress
    pub recording: bool,
}
