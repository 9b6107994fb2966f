// Proctoring session lifecycle
// Loads the inference capabilities, runs the frame loop and the reporter, and
// tears both down in a fixed order.

use crate::core::config::ProctorConfig;
use crate::core::frame_scheduler::FrameScheduler;
use crate::core::reporter::{ReportSink, ReportStats, ReportingChannel};
use crate::models::error::{ProctorError, ProctorResult};
use crate::models::report::AttemptId;
use crate::models::violation::{SessionStatus, ViolationCounts};
use crate::platform::inference::{Capabilities, ModelProvider};
use crate::platform::media::CaptureStream;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Message handed to the host when the session cannot start
pub const SETUP_FAILURE_MESSAGE: &str =
    "Failed to initialize proctoring system. Please refresh the page.";

/// Final figures returned by [`ProctoringSession::shutdown`]
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub attempt_id: AttemptId,
    pub frames_processed: u64,
    pub counts: ViolationCounts,
    pub reports: ReportStats,
}

/// Releases the capture tracks when dropped
struct TrackRelease(CaptureStream);

impl Drop for TrackRelease {
    fn drop(&mut self) {
        self.0.stop_tracks();
    }
}

/// A running proctoring session for one attempt
///
/// Dropping the session without [`ProctoringSession::shutdown`] still stops
/// the tracks first; the frame loop and reporter then end on their own.
pub struct ProctoringSession {
    // Declared first so the tracks are released before the tasks are signalled
    tracks: TrackRelease,
    session_id: Uuid,
    attempt_id: AttemptId,
    status: watch::Receiver<SessionStatus>,
    shutdown: watch::Sender<bool>,
    frame_loop: JoinHandle<u64>,
    reporter: ReportingChannel,
}

impl ProctoringSession {
    /// Load the models and start monitoring
    ///
    /// On any setup failure `on_error` is called exactly once with
    /// [`SETUP_FAILURE_MESSAGE`], the capture tracks are released, and the
    /// error is returned.
    pub async fn start<F>(
        config: &ProctorConfig,
        attempt_id: AttemptId,
        stream: CaptureStream,
        models: &dyn ModelProvider,
        sink: Arc<dyn ReportSink>,
        on_error: F,
    ) -> ProctorResult<Self>
    where
        F: Fn(String),
    {
        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("proctoring_session", %attempt_id, %session_id);

        let capabilities = match load_capabilities(config, models).instrument(span.clone()).await {
            Ok(capabilities) => capabilities,
            Err(e) => {
                span.in_scope(|| tracing::error!(error = %e, "Failed to initialize proctoring"));
                stream.stop_tracks();
                on_error(SETUP_FAILURE_MESSAGE.to_string());
                return Err(e);
            }
        };

        let scheduler = FrameScheduler::new(&capabilities, config);
        let (status_tx, status_rx) = watch::channel(scheduler.status());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let frame_loop = tokio::spawn(
            run_frame_loop(scheduler, stream.clone(), status_tx, shutdown_rx).instrument(span.clone()),
        );

        let reporter = {
            let _entered = span.enter();
            ReportingChannel::spawn(attempt_id, config.report_interval(), status_rx.clone(), sink)
        };

        span.in_scope(|| tracing::info!("Proctoring session started"));

        Ok(Self {
            tracks: TrackRelease(stream),
            session_id,
            attempt_id,
            status: status_rx,
            shutdown: shutdown_tx,
            frame_loop,
            reporter,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    /// Latest status published by the frame loop
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Receiver that wakes on every status change
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// False once the video track has ended or the loop was stopped
    pub fn is_monitoring(&self) -> bool {
        !self.frame_loop.is_finished()
    }

    pub fn report_stats(&self) -> ReportStats {
        self.reporter.stats()
    }

    /// Stop the tracks, then the frame loop, then the reporter
    pub async fn shutdown(self) -> SessionSummary {
        self.tracks.0.stop_tracks();

        let _ = self.shutdown.send(true);
        let frames_processed = match self.frame_loop.await {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(error = %e, "Frame loop ended abnormally");
                0
            }
        };

        let reports = self.reporter.shutdown().await;
        let counts = self.status.borrow().counts;

        tracing::info!(
            attempt_id = %self.attempt_id,
            session_id = %self.session_id,
            frames_processed,
            violations = counts.total(),
            "Proctoring session ended"
        );

        SessionSummary {
            session_id: self.session_id,
            attempt_id: self.attempt_id,
            frames_processed,
            counts,
            reports,
        }
    }
}

async fn load_capabilities(config: &ProctorConfig, models: &dyn ModelProvider) -> ProctorResult<Capabilities> {
    config
        .validate()
        .map_err(|e| ProctorError::InvalidConfig(e.to_string()))?;

    Capabilities::load(models, &config.face_mesh_options())
        .await
        .map_err(|e| match e {
            ProctorError::ModelLoadFailed(_) => e,
            other => ProctorError::ModelLoadFailed(other.to_string()),
        })
}

async fn run_frame_loop(
    mut scheduler: FrameScheduler,
    stream: CaptureStream,
    status: watch::Sender<SessionStatus>,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    loop {
        let next = tokio::select! {
            _ = shutdown.changed() => break,
            next = stream.video.next_frame() => next,
        };

        let frame = match next {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!("Video track ended");
                stream.stop_tracks();
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Video capture failed, stopping frame loop");
                stream.stop_tracks();
                break;
            }
        };

        let spectrum = stream.spectrum();

        // Inference still running at teardown is dropped without touching state
        let tick = tokio::select! {
            _ = shutdown.changed() => break,
            tick = scheduler.on_frame(frame, spectrum, Instant::now()) => tick,
        };

        status.send_if_modified(|current| {
            if *current == tick {
                false
            } else {
                *current = tick;
                true
            }
        });
    }

    // Dropping `status` here ends the reporter as well
    scheduler.frames_processed()
}
