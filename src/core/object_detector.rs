// Restricted-object presence detection
// Scans run on a spawned task; the frame loop only ever polls for the result.

use crate::models::capture::{ObjectPrediction, VideoFrame};
use crate::models::error::ProctorResult;
use crate::platform::inference::ObjectDetector;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default label of the restricted object
pub const DEFAULT_RESTRICTED_LABEL: &str = "cell phone";
/// Default minimum spacing between scan starts
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(500);

struct InFlightScan {
    result: oneshot::Receiver<ProctorResult<Vec<ObjectPrediction>>>,
    task: JoinHandle<()>,
}

/// Throttled, non-blocking wrapper around an [`ObjectDetector`]
///
/// The cached presence flag is what every tick reports; it only changes when a
/// scan completes.
pub struct ObjectPresenceDetector {
    detector: Arc<dyn ObjectDetector>,
    restricted_label: String,
    scan_interval: Duration,
    last_scan: Option<Instant>,
    in_flight: Option<InFlightScan>,
    detected: bool,
}

impl ObjectPresenceDetector {
    pub fn new(
        detector: Arc<dyn ObjectDetector>,
        restricted_label: impl Into<String>,
        scan_interval: Duration,
    ) -> Self {
        Self {
            detector,
            restricted_label: restricted_label.into(),
            scan_interval,
            last_scan: None,
            in_flight: None,
            detected: false,
        }
    }

    /// Collect a finished scan, start a new one if due, and report the cached flag
    pub fn poll(&mut self, frame: &Arc<VideoFrame>, now: Instant) -> bool {
        self.collect();

        let due = match self.last_scan {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.scan_interval,
        };

        if due && self.in_flight.is_none() {
            self.start_scan(Arc::clone(frame));
            self.last_scan = Some(now);
        }

        self.detected
    }

    fn collect(&mut self) {
        let Some(scan) = self.in_flight.as_mut() else {
            return;
        };

        match scan.result.try_recv() {
            Ok(Ok(predictions)) => {
                self.detected = self.contains_restricted(&predictions);
                self.in_flight = None;
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Object detection failed, keeping last result");
                self.in_flight = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => {
                tracing::debug!("Object detection task ended without a result");
                self.in_flight = None;
            }
        }
    }

    fn start_scan(&mut self, frame: Arc<VideoFrame>) {
        let (tx, rx) = oneshot::channel();
        let detector = Arc::clone(&self.detector);

        let task = tokio::spawn(async move {
            let result = detector.detect(&frame).await;
            // Receiver is gone once the session tears down
            let _ = tx.send(result);
        });

        self.in_flight = Some(InFlightScan { result: rx, task });
    }

    fn contains_restricted(&self, predictions: &[ObjectPrediction]) -> bool {
        predictions
            .iter()
            .any(|p| p.class_label == self.restricted_label)
    }

    pub fn is_detected(&self) -> bool {
        self.detected
    }

    pub fn is_scanning(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn restricted_label(&self) -> &str {
        &self.restricted_label
    }
}

impl Drop for ObjectPresenceDetector {
    fn drop(&mut self) {
        if let Some(scan) = self.in_flight.take() {
            scan.task.abort();
        }
    }
}
