// Capture session - state machine gating sample ingestion
//
// One session owns its buffers for the whole lifetime: Idle -> Recording ->
// Analyzing -> Complete, with a cancel transition back to Idle from Recording.
// Samples are accepted only while Recording; anything arriving in another
// state is discarded, not queued. stop() freezes the buffers and runs metrics
// derivation synchronously, so the Complete state is never observable before
// the result exists.

pub mod series;

use crate::advice;
use crate::config::{Subject, TestConfig};
use crate::error::SessionError;
use crate::metrics::{AnalysisResult, MetricsEngine};
use series::{AngleSeries, ForceSample, ForceTrace, JointAngleSample};

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Analyzing,
    Complete,
}

/// Frozen session buffers handed to the metrics engine
///
/// `angles` is the primary (right-side) knee series; `left_angles` is filled
/// only for frontal camera sessions and enables asymmetry.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    pub angles: AngleSeries,
    pub left_angles: AngleSeries,
    pub forces: ForceTrace,
}

/// Capture session controller
///
/// Exactly one writer: all buffer mutation goes through this struct, and the
/// live display reads only scalar snapshots (`live_max_flexion`), never the
/// buffers.
pub struct CaptureSession {
    state: SessionState,
    config: TestConfig,
    subject: Subject,
    recording: Recording,
    /// Running peak flexion for the live readout, cleared at start
    max_flexion_deg: f64,
}

impl CaptureSession {
    pub fn new(config: TestConfig, subject: Subject) -> Self {
        Self {
            state: SessionState::Idle,
            config,
            subject,
            recording: Recording::default(),
            max_flexion_deg: 0.0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Begin recording
    ///
    /// Valid from Idle or Complete (a new start re-initializes the session).
    /// Clears all buffers and the running max-flexion accumulator.
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Recording | SessionState::Analyzing => {
                Err(SessionError::AlreadyRecording)
            }
            SessionState::Idle | SessionState::Complete => {
                self.recording = Recording::default();
                self.max_flexion_deg = 0.0;
                self.state = SessionState::Recording;
                tracing::info!("[CaptureSession] Recording started");
                Ok(())
            }
        }
    }

    /// Append a primary knee angle sample; ignored unless Recording
    pub fn push_angle(&mut self, time_seconds: f64, angle_degrees: f64) -> bool {
        if self.state != SessionState::Recording {
            return false;
        }
        let accepted = self.recording.angles.push(JointAngleSample {
            time_seconds,
            angle_degrees,
        });
        if accepted {
            self.max_flexion_deg = self.max_flexion_deg.max(180.0 - angle_degrees);
        }
        accepted
    }

    /// Append a left-side knee angle sample; ignored unless Recording
    pub fn push_left_angle(&mut self, time_seconds: f64, angle_degrees: f64) -> bool {
        if self.state != SessionState::Recording {
            return false;
        }
        self.recording.left_angles.push(JointAngleSample {
            time_seconds,
            angle_degrees,
        })
    }

    /// Append a force sample; ignored unless Recording
    pub fn push_force(&mut self, time_millis: u64, force_newtons: f64) -> bool {
        if self.state != SessionState::Recording {
            return false;
        }
        self.recording.forces.push(ForceSample {
            time_millis,
            force_newtons,
        })
    }

    /// Number of buffered samples across all series (for gating tests/UI)
    pub fn buffered_samples(&self) -> usize {
        self.recording.angles.len() + self.recording.left_angles.len() + self.recording.forces.len()
    }

    /// Running peak knee flexion for the live readout
    pub fn live_max_flexion(&self) -> f64 {
        self.max_flexion_deg
    }

    /// Stop recording, derive metrics synchronously, and expose the result
    ///
    /// The buffers are frozen against writes the instant the state leaves
    /// Recording. Derivation and advice generation complete before the state
    /// becomes Complete. On derivation failure the session returns to Idle
    /// without producing a result.
    pub fn stop(&mut self, engine: &MetricsEngine) -> Result<AnalysisResult, SessionError> {
        if self.state != SessionState::Recording {
            return Err(SessionError::NotRecording);
        }
        self.state = SessionState::Analyzing;

        match engine.derive(&self.recording, &self.config, &self.subject) {
            Ok(mut result) => {
                result.advice = advice::generate(&result.metrics, self.config.protocol);
                self.state = SessionState::Complete;
                tracing::info!(
                    "[CaptureSession] Analysis complete: {} advice line(s)",
                    result.advice.len()
                );
                Ok(result)
            }
            Err(err) => {
                self.state = SessionState::Idle;
                tracing::warn!("[CaptureSession] Derivation failed: {}", err);
                Err(SessionError::Derivation(err))
            }
        }
    }

    /// Abort a recording, discarding buffers without producing a result
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Recording {
            return Err(SessionError::NotRecording);
        }
        self.recording = Recording::default();
        self.max_flexion_deg = 0.0;
        self.state = SessionState::Idle;
        tracing::info!("[CaptureSession] Recording cancelled, buffers discarded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DetectionMethod, JumpProtocol, PipelineConfig};
    use crate::error::AnalysisError;

    fn test_session(method: DetectionMethod) -> CaptureSession {
        let config = TestConfig::new(JumpProtocol::Cmj, method);
        let subject = Subject {
            height_cm: 175.0,
            weight_kg: 70.0,
            age_years: 28,
            gender: "Female".to_string(),
        };
        CaptureSession::new(config, subject)
    }

    fn test_engine() -> MetricsEngine {
        MetricsEngine::new(PipelineConfig::default())
    }

    fn record_jump_trace(session: &mut CaptureSession) {
        let bw = session.subject().bodyweight_newtons();
        let mut t = 0u64;
        while t <= 2300 {
            let force = match t {
                0..=999 => bw,
                1000..=1299 => bw * 0.4,
                1300..=1599 => bw * 2.2,
                1600..=1999 => 0.0,
                _ => bw * 3.5,
            };
            session.push_force(t, force);
            t += 10;
        }
    }

    #[test]
    fn test_initial_state_is_idle() {
        let session = test_session(DetectionMethod::Imu);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_samples_discarded_while_idle() {
        let mut session = test_session(DetectionMethod::Camera);

        assert!(!session.push_angle(0.1, 170.0));
        assert!(!session.push_force(100, 690.0));
        assert_eq!(session.buffered_samples(), 0);
    }

    #[test]
    fn test_samples_accepted_while_recording() {
        let mut session = test_session(DetectionMethod::Camera);
        session.start().unwrap();

        assert!(session.push_angle(0.1, 170.0));
        assert!(session.push_angle(0.2, 150.0));
        assert_eq!(session.buffered_samples(), 2);
        assert_eq!(session.live_max_flexion(), 30.0);
    }

    #[test]
    fn test_double_start_rejected() {
        let mut session = test_session(DetectionMethod::Imu);
        session.start().unwrap();
        assert_eq!(session.start(), Err(SessionError::AlreadyRecording));
    }

    #[test]
    fn test_stop_without_start_rejected() {
        let mut session = test_session(DetectionMethod::Imu);
        let engine = test_engine();
        assert!(matches!(
            session.stop(&engine),
            Err(SessionError::NotRecording)
        ));
    }

    #[test]
    fn test_exactly_one_stop_produces_exactly_one_result() {
        let mut session = test_session(DetectionMethod::Imu);
        let engine = test_engine();

        session.start().unwrap();
        record_jump_trace(&mut session);

        let result = session.stop(&engine).unwrap();
        assert_eq!(session.state(), SessionState::Complete);
        assert!(result.metrics.jump_height_cm > 0.0);

        // Second stop cannot trigger a second derivation
        assert!(matches!(
            session.stop(&engine),
            Err(SessionError::NotRecording)
        ));
    }

    #[test]
    fn test_samples_discarded_after_stop() {
        let mut session = test_session(DetectionMethod::Imu);
        let engine = test_engine();

        session.start().unwrap();
        record_jump_trace(&mut session);
        let buffered = session.buffered_samples();
        session.stop(&engine).unwrap();

        assert!(!session.push_force(5000, 700.0));
        assert_eq!(session.buffered_samples(), buffered);
    }

    #[test]
    fn test_stop_with_empty_buffer_fails_and_returns_to_idle() {
        let mut session = test_session(DetectionMethod::Imu);
        let engine = test_engine();

        session.start().unwrap();
        match session.stop(&engine) {
            Err(SessionError::Derivation(AnalysisError::InsufficientSamples { .. })) => {}
            other => panic!("Expected Derivation(InsufficientSamples), got {:?}", other.err()),
        }
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_cancel_discards_without_result() {
        let mut session = test_session(DetectionMethod::Imu);
        session.start().unwrap();
        record_jump_trace(&mut session);
        assert!(session.buffered_samples() > 0);

        session.cancel().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.buffered_samples(), 0);
        assert_eq!(session.live_max_flexion(), 0.0);
    }

    #[test]
    fn test_cancel_only_valid_while_recording() {
        let mut session = test_session(DetectionMethod::Imu);
        assert_eq!(session.cancel(), Err(SessionError::NotRecording));
    }

    #[test]
    fn test_restart_clears_previous_buffers() {
        let mut session = test_session(DetectionMethod::Imu);
        let engine = test_engine();

        session.start().unwrap();
        record_jump_trace(&mut session);
        session.stop(&engine).unwrap();

        // New start from Complete re-initializes
        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Recording);
        assert_eq!(session.buffered_samples(), 0);
        assert_eq!(session.live_max_flexion(), 0.0);
    }

    #[test]
    fn test_advice_attached_to_result() {
        let mut session = test_session(DetectionMethod::Imu);
        let engine = test_engine();

        session.start().unwrap();
        record_jump_trace(&mut session);
        let result = session.stop(&engine).unwrap();

        // CMJ protocol always carries the hip-hinge technique tip
        assert!(result.advice.iter().any(|a| a.contains("hip hinge")));
    }
}
