// Kinematics extraction - joint angles from 2D pose landmarks
//
// Pure geometry over landmark triples. The pose estimator itself is an
// external collaborator; this module only consumes its per-frame indexed
// landmark arrays and reads the hip/knee/ankle indices.
//
// Angle math is axis-convention agnostic: any internally consistent planar
// coordinate system from the producer works.

use serde::{Deserialize, Serialize};

/// MediaPipe-style landmark indices for the joints we read
pub mod landmark_index {
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    pub const LEFT_KNEE: usize = 25;
    pub const RIGHT_KNEE: usize = 26;
    pub const LEFT_ANKLE: usize = 27;
    pub const RIGHT_ANKLE: usize = 28;
}

/// Body side for landmark selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One 2D landmark with detection confidence
///
/// The z coordinate from the pose estimator is dropped; the pipeline works on
/// a planar approximation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
    /// Detection confidence in [0, 1]
    pub visibility: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self { x, y, visibility }
    }
}

/// One frame of indexed landmarks from the pose estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Seconds since session start
    pub time_seconds: f64,
    /// Indexed landmark array; indices follow `landmark_index`
    pub landmarks: Vec<Point2D>,
}

/// Angle at vertex `b` between vectors (a - b) and (c - b), in degrees
///
/// Computed via dot product over magnitudes and `acos`. A zero-length vector
/// (coincident landmarks) returns exactly 180 degrees, treated as a fully
/// extended joint. That is a defined policy for degenerate geometry, not an
/// error path.
///
/// For non-degenerate input the result lies in [0, 180]: same-direction
/// collinear vectors give 0, opposite-direction collinear vectors give 180.
pub fn joint_angle(a: Point2D, b: Point2D, c: Point2D) -> f64 {
    let v1 = (a.x - b.x, a.y - b.y);
    let v2 = (c.x - b.x, c.y - b.y);

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();

    if mag1 * mag2 == 0.0 {
        return 180.0;
    }

    // Clamp the cosine: floating error can push it fractionally outside [-1, 1]
    let cos = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Extract the knee angle for one side of a landmark frame
///
/// Returns `None` when the frame is missing the required indices or either
/// endpoint (hip, ankle) fails the visibility threshold; such frames are
/// skipped silently and excluded from the session series.
pub fn knee_angle(frame: &LandmarkFrame, side: Side, visibility_threshold: f64) -> Option<f64> {
    let (hip_idx, knee_idx, ankle_idx) = match side {
        Side::Left => (
            landmark_index::LEFT_HIP,
            landmark_index::LEFT_KNEE,
            landmark_index::LEFT_ANKLE,
        ),
        Side::Right => (
            landmark_index::RIGHT_HIP,
            landmark_index::RIGHT_KNEE,
            landmark_index::RIGHT_ANKLE,
        ),
    };

    let hip = frame.landmarks.get(hip_idx)?;
    let knee = frame.landmarks.get(knee_idx)?;
    let ankle = frame.landmarks.get(ankle_idx)?;

    if hip.visibility <= visibility_threshold || ankle.visibility <= visibility_threshold {
        return None;
    }

    Some(joint_angle(*hip, *knee, *ankle))
}
