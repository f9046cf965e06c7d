// Metrics derivation - frozen session buffers to jump performance metrics
//
// Pure transform over a frozen recording + test configuration + subject.
// All jump metrics are derived from the recorded signal itself:
// - IMU path: flight phases detected on the force trace (force below a
//   fraction of bodyweight for a minimum duration)
// - Camera path: the flight window is the longest fully-bounded run of
//   near-full knee extension in the angle series
//
// Numeric edge cases (guarded divisions, missing optional signals) resolve
// locally with documented fallbacks; only an empty required series is a hard
// error.

use serde::{Deserialize, Serialize};

use crate::config::{DetectionMethod, JumpProtocol, PipelineConfig, Subject, TestConfig};
use crate::error::AnalysisError;
use crate::session::Recording;

/// Standard gravity in m/s^2, shared by every force/height formula
pub const GRAVITY: f64 = 9.81;

/// Jump performance metrics for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpMetrics {
    pub jump_height_cm: f64,
    pub flight_time_ms: f64,
    /// Ground contact time between drop landing and takeoff (drop jumps only)
    pub contact_time_ms: Option<f64>,
    /// Reactive strength index; present only when contact time was measured
    pub rsi: Option<f64>,
    pub max_knee_flexion_deg: f64,
    /// Left/right imbalance; present only when both sides were observed
    pub asymmetry_percent: Option<f64>,
    /// Estimated from force x velocity; omitted when the signal is insufficient
    pub peak_power_watts: Option<f64>,
}

/// One point of a chart series handed to the display collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub time_seconds: f64,
    pub value: f64,
}

/// Immutable per-session result: metrics, chart curves, advice
///
/// Produced exactly once per session. Chart series are direct full-resolution
/// copies of the recorded buffers, never decimated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub config: TestConfig,
    pub subject: Subject,
    pub metrics: JumpMetrics,
    pub knee_angle_chart: Vec<ChartPoint>,
    pub grf_chart: Vec<ChartPoint>,
    pub advice: Vec<String>,
}

/// Jump height in cm from airborne time: `H = g * t^2 / 8` (t in seconds)
///
/// Assumes symmetric takeoff/landing posture. The inverse
/// [`flight_time_from_height`] uses the same single formula so the pair
/// round-trips.
pub fn height_from_flight_time(flight_time_s: f64) -> f64 {
    (GRAVITY * flight_time_s * flight_time_s / 8.0) * 100.0
}

/// Airborne time in seconds from jump height in cm (inverse of the above)
pub fn flight_time_from_height(height_cm: f64) -> f64 {
    (8.0 * height_cm / (100.0 * GRAVITY)).sqrt()
}

/// Reactive strength index: jump height (m) over contact time (s)
///
/// Guarded: non-positive contact time yields 0.
pub fn reactive_strength_index(height_cm: f64, contact_time_ms: f64) -> f64 {
    if contact_time_ms <= 0.0 {
        return 0.0;
    }
    (height_cm / 100.0) / (contact_time_ms / 1000.0)
}

/// Left/right asymmetry as a percentage of the pair average
///
/// Positive values mean the right side dominates. Guarded: a zero average
/// yields 0.
pub fn asymmetry_percent(left: f64, right: f64) -> f64 {
    let avg = (left + right) / 2.0;
    if avg == 0.0 {
        return 0.0;
    }
    (right - left) / avg * 100.0
}

/// Half-open interval of airborne time, session-relative milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
struct FlightInterval {
    start_ms: f64,
    end_ms: f64,
}

impl FlightInterval {
    fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }
}

/// Metrics derivation engine
///
/// Stateless apart from the pipeline tunables; safe to reuse across sessions.
pub struct MetricsEngine {
    config: PipelineConfig,
}

impl MetricsEngine {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Derive metrics and chart series from a frozen recording
    ///
    /// Hard failures: zero/negative subject mass, or an empty required series
    /// for the configured method (angle series for Camera, force trace for
    /// Imu). Everything else resolves via documented fallbacks.
    pub fn derive(
        &self,
        recording: &Recording,
        test: &TestConfig,
        subject: &Subject,
    ) -> Result<AnalysisResult, AnalysisError> {
        if subject.weight_kg <= 0.0 {
            return Err(AnalysisError::InvalidSubject {
                reason: format!("weight must be positive, got {} kg", subject.weight_kg),
            });
        }

        match test.method {
            DetectionMethod::Camera => {
                if recording.angles.len() < 2 {
                    return Err(AnalysisError::InsufficientSamples {
                        required: 2,
                        collected: recording.angles.len(),
                    });
                }
            }
            DetectionMethod::Imu => {
                if recording.forces.len() < 2 {
                    return Err(AnalysisError::InsufficientSamples {
                        required: 2,
                        collected: recording.forces.len(),
                    });
                }
            }
        }

        let max_knee_flexion_deg = recording
            .angles
            .min_angle()
            .map(|min| 180.0 - min)
            .unwrap_or(0.0);

        let bodyweight = subject.bodyweight_newtons();
        let (flight, contact_time_ms) = match test.method {
            DetectionMethod::Imu => {
                let intervals = self.detect_force_flight_intervals(recording, bodyweight);
                let jump = intervals
                    .iter()
                    .copied()
                    .max_by(|a, b| a.duration_ms().total_cmp(&b.duration_ms()));
                let contact = if test.protocol == JumpProtocol::Dj {
                    self.drop_jump_contact_ms(&intervals, jump)
                } else {
                    None
                };
                (jump, contact)
            }
            DetectionMethod::Camera => (self.detect_extension_flight(recording), None),
        };

        let flight_time_ms = match flight {
            Some(interval) => interval.duration_ms(),
            None => {
                tracing::warn!("[MetricsEngine] No flight phase detected; reporting zero height");
                0.0
            }
        };
        let jump_height_cm = height_from_flight_time(flight_time_ms / 1000.0);

        let rsi = contact_time_ms.map(|contact| reactive_strength_index(jump_height_cm, contact));

        let asymmetry = match (
            recording.left_angles.min_angle(),
            recording.angles.min_angle(),
        ) {
            (Some(left_min), Some(right_min)) => {
                Some(asymmetry_percent(180.0 - left_min, 180.0 - right_min))
            }
            _ => None,
        };

        let peak_power_watts = self.estimate_peak_power(recording, subject, flight);

        let metrics = JumpMetrics {
            jump_height_cm,
            flight_time_ms,
            contact_time_ms,
            rsi,
            max_knee_flexion_deg,
            asymmetry_percent: asymmetry,
            peak_power_watts,
        };

        tracing::info!(
            "[MetricsEngine] Derived metrics: height {:.1} cm, flight {:.0} ms, flexion {:.1} deg",
            metrics.jump_height_cm,
            metrics.flight_time_ms,
            metrics.max_knee_flexion_deg
        );

        Ok(AnalysisResult {
            config: *test,
            subject: subject.clone(),
            metrics,
            knee_angle_chart: recording
                .angles
                .samples()
                .iter()
                .map(|s| ChartPoint {
                    time_seconds: s.time_seconds,
                    value: s.angle_degrees,
                })
                .collect(),
            grf_chart: recording
                .forces
                .samples()
                .iter()
                .map(|s| ChartPoint {
                    time_seconds: s.time_millis as f64 / 1000.0,
                    value: s.force_newtons,
                })
                .collect(),
            advice: Vec::new(),
        })
    }

    /// Runs of force below `flight_force_fraction x bodyweight` lasting at
    /// least `min_flight_ms`, interpreted as airborne phases
    fn detect_force_flight_intervals(
        &self,
        recording: &Recording,
        bodyweight_newtons: f64,
    ) -> Vec<FlightInterval> {
        let threshold = self.config.flight_force_fraction * bodyweight_newtons;
        let mut intervals = Vec::new();
        let mut run_start: Option<f64> = None;
        let mut run_end = 0.0;

        for sample in recording.forces.samples() {
            let t = sample.time_millis as f64;
            if sample.force_newtons < threshold {
                if run_start.is_none() {
                    run_start = Some(t);
                }
                run_end = t;
            } else if let Some(start) = run_start.take() {
                let interval = FlightInterval {
                    start_ms: start,
                    end_ms: run_end,
                };
                if interval.duration_ms() >= self.config.min_flight_ms {
                    intervals.push(interval);
                }
            }
        }
        if let Some(start) = run_start {
            let interval = FlightInterval {
                start_ms: start,
                end_ms: run_end,
            };
            if interval.duration_ms() >= self.config.min_flight_ms {
                intervals.push(interval);
            }
        }
        intervals
    }

    /// Drop-jump contact time: gap between the drop flight (the airborne
    /// phase immediately preceding the jump flight) and the takeoff
    fn drop_jump_contact_ms(
        &self,
        intervals: &[FlightInterval],
        jump: Option<FlightInterval>,
    ) -> Option<f64> {
        let jump = jump?;
        let preceding = intervals
            .iter()
            .filter(|i| i.end_ms < jump.start_ms)
            .max_by(|a, b| a.end_ms.total_cmp(&b.end_ms))?;
        Some(jump.start_ms - preceding.end_ms)
    }

    /// Camera-path flight detection on the knee angle series
    ///
    /// The flight window is the longest run of angles above the extension
    /// threshold that is bounded by sub-threshold samples on both sides.
    /// The bound requirement excludes the initial quiet stance (also fully
    /// extended but unbounded on the left). Approximate: the run includes
    /// the final instant of push-off extension.
    fn detect_extension_flight(&self, recording: &Recording) -> Option<FlightInterval> {
        let threshold = self.config.extension_threshold_deg;
        let samples = recording.angles.samples();

        let mut best: Option<FlightInterval> = None;
        let mut run_start: Option<f64> = None;
        let mut run_end = 0.0;
        let mut bounded_left = false;

        for sample in samples {
            if sample.angle_degrees > threshold {
                if run_start.is_none() {
                    run_start = Some(sample.time_seconds * 1000.0);
                }
                run_end = sample.time_seconds * 1000.0;
            } else {
                if let Some(start) = run_start.take() {
                    // Sub-threshold sample after the run: bounded on the right
                    if bounded_left {
                        let candidate = FlightInterval {
                            start_ms: start,
                            end_ms: run_end,
                        };
                        if candidate.duration_ms() >= self.config.min_flight_ms
                            && best
                                .map(|b| candidate.duration_ms() > b.duration_ms())
                                .unwrap_or(true)
                        {
                            best = Some(candidate);
                        }
                    }
                }
                bounded_left = true;
            }
        }
        best
    }

    /// Peak power from force x net vertical velocity, integrated up to takeoff
    ///
    /// `v += (F/m - g) * dt` across the trace; peak power is the maximum of
    /// `F * v` over samples with positive velocity. Returns `None` without a
    /// force trace rather than fabricating a value.
    fn estimate_peak_power(
        &self,
        recording: &Recording,
        subject: &Subject,
        flight: Option<FlightInterval>,
    ) -> Option<f64> {
        let samples = recording.forces.samples();
        if samples.len() < 2 {
            return None;
        }
        let takeoff_ms = flight.map(|f| f.start_ms).unwrap_or(f64::INFINITY);

        let mut velocity = 0.0;
        let mut peak = 0.0f64;
        for pair in samples.windows(2) {
            let t = pair[1].time_millis as f64;
            if t > takeoff_ms {
                break;
            }
            let dt = (pair[1].time_millis - pair[0].time_millis) as f64 / 1000.0;
            let net_accel = pair[1].force_newtons / subject.weight_kg - GRAVITY;
            velocity += net_accel * dt;
            if velocity > 0.0 {
                peak = peak.max(pair[1].force_newtons * velocity);
            }
        }
        Some(peak)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::series::{ForceSample, JointAngleSample};

    fn test_subject() -> Subject {
        Subject {
            height_cm: 180.0,
            weight_kg: 70.0,
            age_years: 25,
            gender: "Male".to_string(),
        }
    }

    fn engine() -> MetricsEngine {
        MetricsEngine::new(PipelineConfig::default())
    }

    #[test]
    fn test_height_formula() {
        // 0.4 s flight: H = 9.81 * 0.16 / 8 * 100 = 19.62 cm
        let h = height_from_flight_time(0.4);
        assert!((h - 19.62).abs() < 1e-9);

        assert_eq!(height_from_flight_time(0.0), 0.0);
    }

    #[test]
    fn test_flight_time_height_round_trip() {
        for t in [0.2, 0.35, 0.5, 0.65] {
            let h = height_from_flight_time(t);
            let t2 = flight_time_from_height(h);
            assert!((t - t2).abs() < 1e-9, "round trip failed for t={}", t);
        }
    }

    #[test]
    fn test_rsi_guarded() {
        assert_eq!(reactive_strength_index(30.0, 0.0), 0.0);
        assert_eq!(reactive_strength_index(30.0, -5.0), 0.0);

        // 30 cm over 250 ms: 0.3 / 0.25 = 1.2
        let rsi = reactive_strength_index(30.0, 250.0);
        assert!((rsi - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_asymmetry_guarded() {
        assert_eq!(asymmetry_percent(0.0, 0.0), 0.0);

        for x in [10.0, 42.5, 90.0] {
            assert_eq!(asymmetry_percent(x, x), 0.0);
        }

        // Right dominant: positive
        assert!(asymmetry_percent(90.0, 110.0) > 0.0);
        // Left dominant: negative
        assert!(asymmetry_percent(110.0, 90.0) < 0.0);

        // (110 - 90) / 100 * 100 = 20
        assert!((asymmetry_percent(90.0, 110.0) - 20.0).abs() < 1e-9);
    }

    /// Build a five-phase CMJ force trace at 100 Hz:
    /// quiet (0-1s) -> unweighting (1-1.3s) -> propulsion (1.3-1.6s)
    /// -> flight (1.6-2.0s) -> landing (2.0-2.3s)
    fn five_phase_recording(bodyweight: f64) -> Recording {
        let mut recording = Recording::default();
        let mut t = 0u64;
        while t <= 2300 {
            let force = match t {
                0..=999 => bodyweight,
                1000..=1299 => bodyweight * 0.4,
                1300..=1599 => bodyweight * 2.2,
                1600..=1999 => 0.0,
                _ => bodyweight * 3.5,
            };
            recording.forces.push(ForceSample {
                time_millis: t,
                force_newtons: force,
            });
            t += 10;
        }
        recording
    }

    #[test]
    fn test_imu_flight_detection() {
        let subject = test_subject();
        let recording = five_phase_recording(subject.bodyweight_newtons());
        let test = TestConfig::new(JumpProtocol::Cmj, DetectionMethod::Imu);

        let result = engine().derive(&recording, &test, &subject).unwrap();

        // Flight spans 1600..1990 ms of below-threshold samples (~390 ms)
        assert!((result.metrics.flight_time_ms - 390.0).abs() < 20.0);
        let expected_height = height_from_flight_time(result.metrics.flight_time_ms / 1000.0);
        assert!((result.metrics.jump_height_cm - expected_height).abs() < 1e-9);
        assert!(result.metrics.jump_height_cm > 15.0);

        // CMJ: no contact time, no RSI
        assert!(result.metrics.contact_time_ms.is_none());
        assert!(result.metrics.rsi.is_none());

        // Peak power present and positive for a real propulsion phase
        let power = result.metrics.peak_power_watts.unwrap();
        assert!(power > 0.0);
    }

    #[test]
    fn test_drop_jump_contact_and_rsi() {
        let subject = test_subject();
        let bw = subject.bodyweight_newtons();
        let mut recording = Recording::default();

        // Drop flight (0.3s) -> contact (0.25s) -> jump flight (0.4s) -> landing
        let mut t = 0u64;
        while t <= 1800 {
            let force = match t {
                0..=299 => 0.0,
                300..=549 => bw * 2.5,
                550..=949 => 0.0,
                _ => bw * 3.0,
            };
            recording.forces.push(ForceSample {
                time_millis: t,
                force_newtons: force,
            });
            t += 10;
        }

        let mut test = TestConfig::new(JumpProtocol::Dj, DetectionMethod::Imu);
        test.drop_height_cm = Some(30.0);
        let result = engine().derive(&recording, &test, &subject).unwrap();

        let contact = result.metrics.contact_time_ms.unwrap();
        assert!((contact - 260.0).abs() < 30.0, "contact was {} ms", contact);

        let rsi = result.metrics.rsi.unwrap();
        let expected =
            reactive_strength_index(result.metrics.jump_height_cm, contact);
        assert!((rsi - expected).abs() < 1e-9);
        assert!(rsi > 0.0);
    }

    #[test]
    fn test_no_flight_falls_back_to_zero() {
        let subject = test_subject();
        let bw = subject.bodyweight_newtons();
        let mut recording = Recording::default();
        // Subject just stands there
        for i in 0..200u64 {
            recording.forces.push(ForceSample {
                time_millis: i * 10,
                force_newtons: bw,
            });
        }

        let test = TestConfig::new(JumpProtocol::Cmj, DetectionMethod::Imu);
        let result = engine().derive(&recording, &test, &subject).unwrap();
        assert_eq!(result.metrics.flight_time_ms, 0.0);
        assert_eq!(result.metrics.jump_height_cm, 0.0);
    }

    /// Camera angle trace: stance (178) -> squat (min 95) -> extension/flight
    /// (176) -> landing flexion (120) -> recovery
    fn camera_recording() -> Recording {
        let mut recording = Recording::default();
        let profile: &[(f64, f64, f64)] = &[
            // (start_s, end_s, angle)
            (0.0, 1.0, 178.0),
            (1.0, 1.4, 95.0),
            (1.4, 1.6, 150.0),
            (1.6, 2.0, 176.0),
            (2.0, 2.2, 120.0),
            (2.2, 2.5, 178.0),
        ];
        for &(start, end, angle) in profile {
            let mut t = start;
            while t < end {
                recording.angles.push(JointAngleSample {
                    time_seconds: t,
                    angle_degrees: angle,
                });
                t += 0.02;
            }
        }
        recording
    }

    #[test]
    fn test_camera_flight_detection_skips_initial_stance() {
        let subject = test_subject();
        let recording = camera_recording();
        let test = TestConfig::new(JumpProtocol::Cmj, DetectionMethod::Camera);

        let result = engine().derive(&recording, &test, &subject).unwrap();

        // Flight window is the bounded extension run at 1.6-2.0s, not the
        // initial stance at 0-1.0s
        assert!(result.metrics.flight_time_ms < 500.0);
        assert!((result.metrics.flight_time_ms - 380.0).abs() < 40.0);
        assert!(result.metrics.jump_height_cm > 0.0);

        // Max flexion from the squat bottom
        assert!((result.metrics.max_knee_flexion_deg - 85.0).abs() < 1e-9);

        // No force trace: no fabricated power, empty GRF chart
        assert!(result.metrics.peak_power_watts.is_none());
        assert!(result.grf_chart.is_empty());
    }

    #[test]
    fn test_charts_are_full_resolution_copies() {
        let subject = test_subject();
        let recording = five_phase_recording(subject.bodyweight_newtons());
        let test = TestConfig::new(JumpProtocol::Cmj, DetectionMethod::Imu);

        let result = engine().derive(&recording, &test, &subject).unwrap();
        assert_eq!(result.grf_chart.len(), recording.forces.len());
        assert_eq!(result.knee_angle_chart.len(), recording.angles.len());
    }

    #[test]
    fn test_empty_series_is_hard_error() {
        let subject = test_subject();
        let recording = Recording::default();

        let camera = TestConfig::new(JumpProtocol::Cmj, DetectionMethod::Camera);
        match engine().derive(&recording, &camera, &subject) {
            Err(AnalysisError::InsufficientSamples { collected, .. }) => {
                assert_eq!(collected, 0);
            }
            other => panic!("Expected InsufficientSamples, got {:?}", other.map(|r| r.metrics)),
        }

        let imu = TestConfig::new(JumpProtocol::Cmj, DetectionMethod::Imu);
        assert!(engine().derive(&recording, &imu, &subject).is_err());
    }

    #[test]
    fn test_zero_mass_rejected() {
        let mut subject = test_subject();
        subject.weight_kg = 0.0;
        let recording = five_phase_recording(686.7);
        let test = TestConfig::new(JumpProtocol::Cmj, DetectionMethod::Imu);

        match engine().derive(&recording, &test, &subject) {
            Err(AnalysisError::InvalidSubject { reason }) => {
                assert!(reason.contains("weight"));
            }
            other => panic!("Expected InvalidSubject, got {:?}", other.map(|r| r.metrics)),
        }
    }

    #[test]
    fn test_asymmetry_from_bilateral_series() {
        let subject = test_subject();
        let mut recording = five_phase_recording(subject.bodyweight_newtons());

        // Right knee flexes to 90 (flexion 90), left only to 110 (flexion 70)
        for (i, angle) in [(0u64, 178.0), (1, 90.0), (2, 178.0)] {
            recording.angles.push(JointAngleSample {
                time_seconds: i as f64 * 0.5,
                angle_degrees: angle,
            });
        }
        for (i, angle) in [(0u64, 178.0), (1, 110.0), (2, 178.0)] {
            recording.left_angles.push(JointAngleSample {
                time_seconds: i as f64 * 0.5,
                angle_degrees: angle,
            });
        }

        let test = TestConfig::new(JumpProtocol::Cmj, DetectionMethod::Imu);
        let result = engine().derive(&recording, &test, &subject).unwrap();

        // left flexion 70, right flexion 90: (90-70)/80*100 = 25
        let asym = result.metrics.asymmetry_percent.unwrap();
        assert!((asym - 25.0).abs() < 1e-9);
    }
}
