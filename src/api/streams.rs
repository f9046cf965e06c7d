//! Stream adapters over the manager's broadcast channels
//!
//! The display layer consumes readouts and results as async streams; lagged
//! subscribers silently skip missed values, which is acceptable for live
//! visualization (only the latest value matters).

use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::manager::SessionManager;
use crate::metrics::AnalysisResult;

use super::LiveReadout;

/// Stream of live readouts (current angle, smoothed force, freshness)
pub fn live_readout_stream(manager: &SessionManager) -> impl Stream<Item = LiveReadout> {
    BroadcastStream::new(manager.subscribe_live()).filter_map(drop_lagged)
}

/// Stream of completed analysis results, one per stopped session
pub fn result_stream(manager: &SessionManager) -> impl Stream<Item = AnalysisResult> {
    BroadcastStream::new(manager.subscribe_results()).filter_map(drop_lagged)
}

fn drop_lagged<T>(item: Result<T, BroadcastStreamRecvError>) -> Option<T> {
    match item {
        Ok(value) => Some(value),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::debug!("[Streams] Subscriber lagged, skipped {} values", skipped);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DetectionMethod, JumpProtocol, PipelineConfig, Subject, TestConfig};
    use crate::fusion::{ImuSample, Vec3};
    use crate::metrics::GRAVITY;

    fn test_manager() -> SessionManager {
        SessionManager::new(
            PipelineConfig::default(),
            TestConfig::new(JumpProtocol::Cmj, DetectionMethod::Imu),
            Subject {
                height_cm: 180.0,
                weight_kg: 70.0,
                age_years: 30,
                gender: "Male".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_live_readout_stream_delivers_samples() {
        let manager = test_manager();
        let mut stream = Box::pin(live_readout_stream(&manager));

        manager
            .feed_imu_sample(ImuSample {
                time_millis: 0,
                accel: Vec3::new(0.0, 0.0, GRAVITY),
                gyro: None,
            })
            .unwrap();

        let readout = stream.next().await.unwrap();
        assert_eq!(readout.time_millis, 0);
        assert!(readout.force.is_some());
        assert!(!readout.recording);
    }
}
