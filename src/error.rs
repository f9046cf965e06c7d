// Error types for the jump analyzer pipeline
//
// This module defines custom error types for session and analysis operations,
// providing structured error handling with error codes suitable for surfacing
// to display/persistence collaborators.

use log::error;
use std::fmt;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling at the
/// boundary to UI collaborators.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Log a session error with structured context
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=CaptureSession, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Log an analysis error with structured context
pub fn log_analysis_error(err: &AnalysisError, context: &str) {
    error!(
        "Analysis error in {}: code={}, component=MetricsEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Capture-session lifecycle errors
///
/// These errors cover state-machine transitions: starting, stopping and
/// cancelling a recording session. Samples arriving in the wrong state are
/// NOT errors; they are silently discarded per the ingestion contract.
///
/// Error code range: 1001-1005
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// A recording is already in progress
    AlreadyRecording,

    /// No recording in progress (stop/cancel called while idle or complete)
    NotRecording,

    /// No finished result is available yet
    ResultNotReady,

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Metrics derivation failed at stop(); the session returned to Idle
    Derivation(AnalysisError),
}

impl From<AnalysisError> for SessionError {
    fn from(err: AnalysisError) -> Self {
        SessionError::Derivation(err)
    }
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::AlreadyRecording => 1001,
            SessionError::NotRecording => 1002,
            SessionError::ResultNotReady => 1003,
            SessionError::LockPoisoned { .. } => 1004,
            SessionError::Derivation(..) => 1005,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::AlreadyRecording => {
                "Recording already in progress. Call stop() or cancel() first.".to_string()
            }
            SessionError::NotRecording => {
                "No recording in progress. Call start() first.".to_string()
            }
            SessionError::ResultNotReady => {
                "No analysis result available for this session".to_string()
            }
            SessionError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
            SessionError::Derivation(err) => {
                format!("Metrics derivation failed: {}", err.message())
            }
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {}

/// Metrics-derivation errors
///
/// Numeric edge cases inside the pipeline (degenerate vectors, guarded
/// divisions) resolve locally via documented fallbacks and never reach this
/// type. Only structurally unusable input is a hard failure.
///
/// Error code range: 2001-2002
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The required time series is empty or too short for derivation
    InsufficientSamples { required: usize, collected: usize },

    /// Subject parameters make force math meaningless (mass must be > 0)
    InvalidSubject { reason: String },
}

impl ErrorCode for AnalysisError {
    fn code(&self) -> i32 {
        match self {
            AnalysisError::InsufficientSamples { .. } => 2001,
            AnalysisError::InvalidSubject { .. } => 2002,
        }
    }

    fn message(&self) -> String {
        match self {
            AnalysisError::InsufficientSamples {
                required,
                collected,
            } => {
                format!("Insufficient samples: need {}, got {}", required, collected)
            }
            AnalysisError::InvalidSubject { reason } => {
                format!("Invalid subject: {}", reason)
            }
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnalysisError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AnalysisError {}
