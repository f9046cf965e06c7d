//! Streaming force estimation for the live display
//!
//! Two separate concerns live here:
//! - `ground_reaction_force`: the exact GRF formula for an already
//!   vertical-axis-isolated acceleration
//! - `ForceEstimator`: orientation-independent smoothed force magnitude fed
//!   by raw 3-axis samples, with staleness detection and a synthetic
//!   placeholder waveform for UI continuity
//!
//! The synthetic waveform is explicitly tagged with its provenance so
//! downstream consumers can always distinguish real sensor data from the
//! placeholder. It exists for display continuity only and must never be
//! written into the analysis time series.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::Vec3;
use crate::metrics::GRAVITY;

/// Ground reaction force from vertical acceleration: `F = m * (a + g)`
///
/// The caller must supply an acceleration already isolated to the vertical
/// axis (gravity removed from the reading, world frame).
pub fn ground_reaction_force(vertical_accel: f64, mass_kg: f64) -> f64 {
    mass_kg * (vertical_accel + GRAVITY)
}

/// Provenance tag for live force values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalSource {
    /// Value derived from a fresh sensor sample
    Sensor,
    /// Placeholder waveform; the sensor went stale
    Synthetic,
}

/// One value for the live force readout, tagged with provenance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveForceSample {
    pub time_millis: u64,
    pub force_newtons: f64,
    pub source: SignalSource,
}

/// Streaming smoothed force magnitude estimator, one instance per session
///
/// Computes `mass * |(x, y, z)|` per sample so 1 G reads as bodyweight
/// regardless of device orientation, then smooths with an exponential weight.
/// Raw magnitudes can transiently dip below bodyweight (or the smoothed value
/// below zero after subtraction elsewhere); values are displayed as-is and
/// never fed unclamped into height/flight-time formulas.
#[derive(Debug, Clone)]
pub struct ForceEstimator {
    alpha: f64,
    staleness_timeout_ms: u64,
    smoothed_newtons: f64,
    last_sample_at_ms: Option<u64>,
}

impl ForceEstimator {
    pub fn new(alpha: f64, staleness_timeout_ms: u64) -> Self {
        Self {
            alpha,
            staleness_timeout_ms,
            smoothed_newtons: 0.0,
            last_sample_at_ms: None,
        }
    }

    /// Reset estimator memory for a new session
    pub fn reset(&mut self) {
        self.smoothed_newtons = 0.0;
        self.last_sample_at_ms = None;
    }

    /// Fold one raw 3-axis acceleration sample into the smoothed estimate
    ///
    /// Returns the updated smoothed force in Newtons.
    pub fn update(&mut self, accel: Vec3, mass_kg: f64, time_millis: u64) -> f64 {
        let magnitude_force = accel.magnitude() * mass_kg;
        self.smoothed_newtons =
            self.alpha * self.smoothed_newtons + (1.0 - self.alpha) * magnitude_force;
        self.last_sample_at_ms = Some(time_millis);
        self.smoothed_newtons
    }

    /// Whether a sensor sample arrived within the staleness timeout
    pub fn is_fresh(&self, now_millis: u64) -> bool {
        match self.last_sample_at_ms {
            Some(last) => now_millis.saturating_sub(last) < self.staleness_timeout_ms,
            None => false,
        }
    }

    /// Current value for the live readout
    ///
    /// While the sensor is fresh this is the smoothed real signal. Once it
    /// goes stale a synthetic placeholder waveform substitutes, tagged
    /// `Synthetic`, so the display keeps moving without ever contaminating
    /// analysis data.
    pub fn live_sample(
        &self,
        now_millis: u64,
        bodyweight_newtons: f64,
        recording_elapsed_ms: Option<u64>,
    ) -> LiveForceSample {
        if self.is_fresh(now_millis) {
            LiveForceSample {
                time_millis: now_millis,
                force_newtons: self.smoothed_newtons,
                source: SignalSource::Sensor,
            }
        } else {
            LiveForceSample {
                time_millis: now_millis,
                force_newtons: synthetic_waveform(
                    now_millis,
                    bodyweight_newtons,
                    recording_elapsed_ms,
                ),
                source: SignalSource::Synthetic,
            }
        }
    }

    pub fn smoothed_newtons(&self) -> f64 {
        self.smoothed_newtons
    }
}

/// Placeholder waveform for a stale sensor
///
/// While recording, sketches the five phases of a countermovement jump
/// (quiet stance, unweighting, propulsion, flight, landing impact). Idle,
/// a slow sine around bodyweight with jitter keeps the trace alive.
fn synthetic_waveform(
    now_millis: u64,
    bodyweight_newtons: f64,
    recording_elapsed_ms: Option<u64>,
) -> f64 {
    let mut rng = rand::thread_rng();
    match recording_elapsed_ms {
        Some(elapsed) => match elapsed {
            0..=999 => bodyweight_newtons + rng.gen_range(-25.0..25.0),
            1000..=1299 => bodyweight_newtons * 0.4,
            1300..=1599 => bodyweight_newtons * 2.2,
            1600..=1999 => 0.0,
            2000..=2299 => bodyweight_newtons * 3.5,
            _ => bodyweight_newtons + rng.gen_range(-25.0..25.0),
        },
        None => {
            let sine = ((now_millis as f64) / 300.0).sin() * 20.0;
            bodyweight_newtons + sine + rng.gen_range(-15.0..15.0)
        }
    }
}
