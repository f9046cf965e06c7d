//! Session time-series buffers
//!
//! Append-only, strictly time-ordered buffers owned by the capture session.
//! Late or duplicate timestamps are dropped rather than interleaved so the
//! ordering invariant survives overlapping producer callbacks. The live
//! display window has an independent lifetime and a fixed capacity.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// One joint angle observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointAngleSample {
    /// Seconds since session start
    pub time_seconds: f64,
    /// Knee angle in degrees, [0, 180]
    pub angle_degrees: f64,
}

/// One force observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceSample {
    /// Milliseconds since session start
    pub time_millis: u64,
    /// May be transiently negative from sensor noise
    pub force_newtons: f64,
}

/// Append-only angle series with strictly increasing timestamps
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AngleSeries {
    samples: Vec<JointAngleSample>,
}

impl AngleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample; returns false if the timestamp does not advance
    /// (the late sample is dropped to preserve ordering).
    pub fn push(&mut self, sample: JointAngleSample) -> bool {
        if let Some(last) = self.samples.last() {
            if sample.time_seconds <= last.time_seconds {
                tracing::debug!(
                    "[Series] Dropping late angle sample: t={} <= last t={}",
                    sample.time_seconds,
                    last.time_seconds
                );
                return false;
            }
        }
        self.samples.push(sample);
        true
    }

    pub fn samples(&self) -> &[JointAngleSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Minimum recorded angle, if any samples exist
    pub fn min_angle(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|s| s.angle_degrees)
            .fold(None, |acc, a| match acc {
                Some(min) if min <= a => Some(min),
                _ => Some(a),
            })
    }
}

/// Append-only force trace with strictly increasing timestamps
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForceTrace {
    samples: Vec<ForceSample>,
}

impl ForceTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample; drops late samples like [`AngleSeries::push`].
    pub fn push(&mut self, sample: ForceSample) -> bool {
        if let Some(last) = self.samples.last() {
            if sample.time_millis <= last.time_millis {
                tracing::debug!(
                    "[Series] Dropping late force sample: t={}ms <= last t={}ms",
                    sample.time_millis,
                    last.time_millis
                );
                return false;
            }
        }
        self.samples.push(sample);
        true
    }

    pub fn samples(&self) -> &[ForceSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Fixed-capacity sliding window for the live force display
///
/// Read-only with respect to analysis state: the redraw loop consumes this
/// window, never the session trace.
#[derive(Debug, Clone)]
pub struct ForceWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl ForceWindow {
    pub fn new(capacity: usize) -> Self {
        let mut values = VecDeque::with_capacity(capacity);
        // Pre-fill with zeros so the display draws a full-width trace at once
        values.extend(std::iter::repeat(0.0).take(capacity));
        Self { values, capacity }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
