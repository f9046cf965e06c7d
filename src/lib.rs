// Jump Analyzer Core - vertical jump assessment pipeline
// Streaming kinematics/IMU processing with synchronous metrics derivation

// Module declarations
pub mod advice;
pub mod api;
pub mod config;
pub mod error;
pub mod fusion;
pub mod kinematics;
pub mod manager;
pub mod metrics;
pub mod session;

// Re-exports for convenience
pub use api::LiveReadout;
pub use config::{CameraAngle, DetectionMethod, JumpProtocol, PipelineConfig, Subject, TestConfig};
pub use error::{AnalysisError, ErrorCode, SessionError};
pub use manager::SessionManager;
pub use metrics::{AnalysisResult, JumpMetrics, MetricsEngine};
pub use session::{CaptureSession, SessionState};

/// Initialize tracing for binaries and ad-hoc debugging
///
/// Library consumers embedding the pipeline should install their own
/// subscriber instead.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
