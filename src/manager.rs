// SessionManager: wires the extractors, estimators and capture session
//
// Single Responsibility: sample routing and session lifecycle. Owns one
// CaptureSession plus the per-session filter/estimator instances, so
// sequential sessions never share or leak filter memory. All shared state is
// behind locks with typed LockPoisoned errors instead of unwrap.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::api::LiveReadout;
use crate::config::{CameraAngle, DetectionMethod, PipelineConfig, Subject, TestConfig};
use crate::error::{log_session_error, SessionError};
use crate::fusion::{ForceEstimator, ImuSample, LiveForceSample, OrientationFilter};
use crate::kinematics::{self, LandmarkFrame, Side};
use crate::metrics::{AnalysisResult, MetricsEngine};
use crate::session::series::ForceWindow;
use crate::session::{CaptureSession, SessionState};

/// Broadcast channel capacity for live readouts and results
const CHANNEL_CAPACITY: usize = 64;

/// Facade owning one capture session and its estimator instances
///
/// Producers call `feed_landmark_frame` / `feed_imu_sample`; the live
/// visualization redraw loop calls `live_snapshot` at its own cadence and
/// never touches the session buffers.
pub struct SessionManager {
    pipeline: PipelineConfig,
    engine: MetricsEngine,
    session: Arc<Mutex<CaptureSession>>,
    orientation: Mutex<OrientationFilter>,
    force: Mutex<ForceEstimator>,
    force_window: Mutex<ForceWindow>,
    last_imu_millis: Mutex<Option<u64>>,
    /// Producer-clock timestamp of the current recording's start; the
    /// synthetic waveform phases are keyed to elapsed time since this
    recording_started_ms: Mutex<Option<u64>>,
    live_tx: broadcast::Sender<LiveReadout>,
    result_tx: broadcast::Sender<AnalysisResult>,
}

impl SessionManager {
    pub fn new(pipeline: PipelineConfig, config: TestConfig, subject: Subject) -> Self {
        let (live_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (result_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let orientation = OrientationFilter::new(pipeline.fusion_alpha);
        let force = ForceEstimator::new(
            pipeline.force_smoothing_alpha,
            pipeline.staleness_timeout_ms,
        );
        let force_window = ForceWindow::new(pipeline.force_window_capacity);
        let engine = MetricsEngine::new(pipeline.clone());

        Self {
            pipeline,
            engine,
            session: Arc::new(Mutex::new(CaptureSession::new(config, subject))),
            orientation: Mutex::new(orientation),
            force: Mutex::new(force),
            force_window: Mutex::new(force_window),
            last_imu_millis: Mutex::new(None),
            recording_started_ms: Mutex::new(None),
            live_tx,
            result_tx,
        }
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, CaptureSession>, SessionError> {
        self.session.lock().map_err(|_| SessionError::LockPoisoned {
            component: "capture_session".to_string(),
        })
    }

    fn lock<'a, T>(
        &self,
        mutex: &'a Mutex<T>,
        component: &str,
    ) -> Result<MutexGuard<'a, T>, SessionError> {
        mutex.lock().map_err(|_| SessionError::LockPoisoned {
            component: component.to_string(),
        })
    }

    /// Start recording; resets filter/estimator memory for the new session
    pub fn start_session(&self) -> Result<(), SessionError> {
        let mut session = self.lock_session()?;
        session.start().inspect_err(|err| {
            log_session_error(err, "start_session");
        })?;

        self.lock(&self.orientation, "orientation_filter")?.reset();
        self.lock(&self.force, "force_estimator")?.reset();

        // Key the recording clock to the latest known producer timestamp;
        // when no sample has arrived yet the first recorded sample seeds it
        let mut imu_clock = self.lock(&self.last_imu_millis, "imu_clock")?;
        *self.lock(&self.recording_started_ms, "recording_clock")? = *imu_clock;
        *imu_clock = None;
        Ok(())
    }

    /// Stop recording, run derivation synchronously, broadcast the result
    pub fn stop_session(&self) -> Result<AnalysisResult, SessionError> {
        let result = {
            let mut session = self.lock_session()?;
            session.stop(&self.engine).inspect_err(|err| {
                log_session_error(err, "stop_session");
            })?
        };
        let _ = self.result_tx.send(result.clone());
        Ok(result)
    }

    /// Abort the current recording without producing a result
    pub fn cancel_session(&self) -> Result<(), SessionError> {
        self.lock_session()?.cancel()
    }

    pub fn state(&self) -> Result<SessionState, SessionError> {
        Ok(self.lock_session()?.state())
    }

    /// Ingest one pose-estimator frame
    ///
    /// Extracts the knee angle(s), appends to the session series while
    /// Recording, and emits a live readout. Low-visibility frames produce no
    /// sample and no readout update; returns the extracted primary angle.
    pub fn feed_landmark_frame(
        &self,
        frame: &LandmarkFrame,
    ) -> Result<Option<f64>, SessionError> {
        let threshold = self.pipeline.visibility_threshold;
        let angle = kinematics::knee_angle(frame, Side::Right, threshold);

        let mut session = self.lock_session()?;
        if let Some(angle) = angle {
            session.push_angle(frame.time_seconds, angle);

            if session.config().camera_angle == CameraAngle::Frontal {
                if let Some(left) = kinematics::knee_angle(frame, Side::Left, threshold) {
                    session.push_left_angle(frame.time_seconds, left);
                }
            }

            let readout = LiveReadout {
                time_millis: (frame.time_seconds * 1000.0) as u64,
                knee_angle_deg: Some(angle),
                force: None,
                max_flexion_deg: session.live_max_flexion(),
                recording: session.state() == SessionState::Recording,
            };
            drop(session);
            let _ = self.live_tx.send(readout);
        }
        Ok(angle)
    }

    /// Ingest one inertial sensor event
    ///
    /// Updates the orientation filter with the true elapsed dt, folds the
    /// sample into the smoothed force estimate, appends the smoothed force to
    /// the analysis trace while Recording, and emits a live readout.
    pub fn feed_imu_sample(&self, sample: ImuSample) -> Result<LiveForceSample, SessionError> {
        let dt = {
            let mut last = self.lock(&self.last_imu_millis, "imu_clock")?;
            let dt = match *last {
                Some(prev) => sample.time_millis.saturating_sub(prev) as f64 / 1000.0,
                None => 0.0,
            };
            *last = Some(sample.time_millis);
            dt
        };

        self.lock(&self.orientation, "orientation_filter")?
            .update(sample.accel, sample.gyro, dt);

        let mut session = self.lock_session()?;
        if session.state() == SessionState::Recording {
            let mut started = self.lock(&self.recording_started_ms, "recording_clock")?;
            if started.is_none() {
                *started = Some(sample.time_millis);
            }
        }
        let mass = session.subject().weight_kg;
        let smoothed = self
            .lock(&self.force, "force_estimator")?
            .update(sample.accel, mass, sample.time_millis);

        session.push_force(sample.time_millis, smoothed);
        self.lock(&self.force_window, "force_window")?.push(smoothed);

        let live = LiveForceSample {
            time_millis: sample.time_millis,
            force_newtons: smoothed,
            source: crate::fusion::SignalSource::Sensor,
        };
        let readout = LiveReadout {
            time_millis: sample.time_millis,
            knee_angle_deg: None,
            force: Some(live),
            max_flexion_deg: session.live_max_flexion(),
            recording: session.state() == SessionState::Recording,
        };
        drop(session);
        let _ = self.live_tx.send(readout);
        Ok(live)
    }

    /// Read-only snapshot for the redraw loop
    ///
    /// When the sensor has gone stale this substitutes the tagged synthetic
    /// waveform; the substitute is never written to the analysis buffers.
    pub fn live_snapshot(&self, now_millis: u64) -> Result<LiveReadout, SessionError> {
        let session = self.lock_session()?;
        let recording = session.state() == SessionState::Recording;
        let bodyweight = session.subject().bodyweight_newtons();
        let max_flexion = session.live_max_flexion();
        drop(session);

        let elapsed = if recording {
            self.lock(&self.recording_started_ms, "recording_clock")?
                .map(|start| now_millis.saturating_sub(start))
        } else {
            None
        };
        let force = self
            .lock(&self.force, "force_estimator")?
            .live_sample(now_millis, bodyweight, elapsed);

        Ok(LiveReadout {
            time_millis: now_millis,
            knee_angle_deg: None,
            force: Some(force),
            max_flexion_deg: max_flexion,
            recording,
        })
    }

    /// Copy of the live display window (read-only view for the renderer)
    pub fn display_window(&self) -> Result<Vec<f64>, SessionError> {
        Ok(self
            .lock(&self.force_window, "force_window")?
            .values()
            .collect())
    }

    pub fn subscribe_live(&self) -> broadcast::Receiver<LiveReadout> {
        self.live_tx.subscribe()
    }

    pub fn subscribe_results(&self) -> broadcast::Receiver<AnalysisResult> {
        self.result_tx.subscribe()
    }

    pub fn method(&self) -> Result<DetectionMethod, SessionError> {
        Ok(self.lock_session()?.config().method)
    }
}
