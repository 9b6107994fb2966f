// Periodic session-report submission
// Runs beside the frame loop and only ever reads the latest published counts.

use crate::core::config::ProctorConfig;
use crate::models::error::{ProctorError, ProctorResult};
use crate::models::report::{AttemptId, SessionReportSnapshot, SessionReportUpdate};
use crate::models::violation::{SessionStatus, ViolationCounts};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::Instrument;

/// Destination for session-report updates
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn submit(&self, attempt_id: AttemptId, update: &SessionReportUpdate) -> ProctorResult<()>;
}

/// Sends updates to the assessment backend with `PUT`
pub struct HttpReportSink {
    http: Client,
    config: ProctorConfig,
}

impl HttpReportSink {
    pub fn new(config: &ProctorConfig) -> ProctorResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("proctor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl ReportSink for HttpReportSink {
    async fn submit(&self, attempt_id: AttemptId, update: &SessionReportUpdate) -> ProctorResult<()> {
        let url = self.config.report_url(attempt_id);

        let mut request = self.http.put(&url).json(update);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ProctorError::ReportFailed(format!(
            "{} returned {}: {}",
            url, status, body
        )))
    }
}

/// Submission counters kept for diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportStats {
    pub sent: u64,
    pub failed: u64,
    /// Counts carried by the last successful submission
    pub last_sent: Option<ViolationCounts>,
    pub last_sent_at: Option<DateTime<Utc>>,
}

/// Handle to the spawned reporting task
pub struct ReportingChannel {
    shutdown: watch::Sender<bool>,
    stats: Arc<Mutex<ReportStats>>,
    task: JoinHandle<()>,
}

impl ReportingChannel {
    /// Start submitting every `interval`, the first one `interval` from now
    ///
    /// The task ends on [`ReportingChannel::shutdown`] or once every sender of
    /// `status` is gone.
    pub fn spawn(
        attempt_id: AttemptId,
        interval: Duration,
        status: watch::Receiver<SessionStatus>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(Mutex::new(ReportStats::default()));

        let task = tokio::spawn(run_reporter(
            attempt_id,
            interval,
            status,
            sink,
            shutdown_rx,
            Arc::clone(&stats),
        )
        .in_current_span());

        tracing::info!(%attempt_id, interval_secs = interval.as_secs(), "Session reporting started");

        Self {
            shutdown,
            stats,
            task,
        }
    }

    pub fn stats(&self) -> ReportStats {
        match self.stats.lock() {
            Ok(stats) => stats.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Stop the task and wait for it. An in-progress submission is abandoned.
    pub async fn shutdown(self) -> ReportStats {
        let _ = self.shutdown.send(true);
        let stats = Arc::clone(&self.stats);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Reporting task ended abnormally");
        }
        let stats = match stats.lock() {
            Ok(stats) => stats.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        tracing::info!(sent = stats.sent, failed = stats.failed, "Session reporting stopped");
        stats
    }
}

async fn run_reporter(
    attempt_id: AttemptId,
    interval: Duration,
    mut status: watch::Receiver<SessionStatus>,
    sink: Arc<dyn ReportSink>,
    mut shutdown: watch::Receiver<bool>,
    stats: Arc<Mutex<ReportStats>>,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            published = status.changed() => {
                if published.is_err() {
                    tracing::info!(%attempt_id, "Status publisher closed, session reporting stopped");
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        let snapshot = SessionReportSnapshot::new(attempt_id, status.borrow().counts);
        let update = snapshot.update();

        let result = tokio::select! {
            _ = shutdown.changed() => break,
            result = sink.submit(attempt_id, &update) => result,
        };

        let Ok(mut recorded) = stats.lock() else {
            break;
        };
        match result {
            Ok(()) => {
                recorded.sent += 1;
                recorded.last_sent = Some(snapshot.counts);
                recorded.last_sent_at = Some(Utc::now());
                tracing::debug!(%attempt_id, total = snapshot.counts.total(), "Session report submitted");
            }
            Err(e) => {
                recorded.failed += 1;
                tracing::warn!(%attempt_id, error = %e, "Failed to update session report");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_sinks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records every submission; the first `failures` calls fail
    #[derive(Default)]
    pub struct RecordingSink {
        pub submitted: Mutex<Vec<(AttemptId, SessionReportUpdate)>>,
        failures: AtomicUsize,
    }

    impl RecordingSink {
        pub fn failing_first(failures: usize) -> Self {
            Self {
                submitted: Mutex::new(Vec::new()),
                failures: AtomicUsize::new(failures),
            }
        }

        pub fn submissions(&self) -> Vec<(AttemptId, SessionReportUpdate)> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReportSink for RecordingSink {
        async fn submit(&self, attempt_id: AttemptId, update: &SessionReportUpdate) -> ProctorResult<()> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(ProctorError::ReportFailed("backend unavailable".to_string()));
            }
            self.submitted.lock().unwrap().push((attempt_id, *update));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_sinks::RecordingSink;
    use super::*;
    use crate::models::violation::ViolationKind;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const INTERVAL: Duration = Duration::from_secs(30);

    fn status_with(kinds: &[(ViolationKind, u32)]) -> SessionStatus {
        let mut counts = ViolationCounts::default();
        for (kind, n) in kinds {
            for _ in 0..*n {
                counts.increment(*kind);
            }
        }
        SessionStatus {
            counts,
            ..SessionStatus::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_submission_after_one_interval() {
        let (_tx, rx) = watch::channel(SessionStatus::default());
        let sink = Arc::new(RecordingSink::default());
        let channel = ReportingChannel::spawn(AttemptId(7), INTERVAL, rx, sink.clone());

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(sink.submissions().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let submissions = sink.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].0, AttemptId(7));
        assert_eq!(submissions[0].1, SessionReportUpdate::default());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(sink.submissions().len(), 3);

        let stats = channel.shutdown().await;
        assert_eq!(stats.sent, 3);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_submission_is_not_retried() {
        let (tx, rx) = watch::channel(status_with(&[(ViolationKind::GazeAway, 1)]));
        let sink = Arc::new(RecordingSink::failing_first(1));
        let channel = ReportingChannel::spawn(AttemptId(7), INTERVAL, rx, sink.clone());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(sink.submissions().is_empty());
        let stats = channel.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.last_sent, None);

        // Next tick carries the latest cumulative counts
        tx.send(status_with(&[(ViolationKind::GazeAway, 2), (ViolationKind::HeadTilt, 1)]))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        let submissions = sink.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].1.look_aways, 2);
        assert_eq!(submissions[0].1.head_tilts, 1);

        let stats = channel.shutdown().await;
        assert_eq!((stats.sent, stats.failed), (1, 1));
        assert_eq!(stats.last_sent.map(|c| c.total()), Some(3));
        assert!(stats.last_sent_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshots_are_monotonic() {
        let (tx, rx) = watch::channel(SessionStatus::default());
        let sink = Arc::new(RecordingSink::default());
        let channel = ReportingChannel::spawn(AttemptId(1), INTERVAL, rx, sink.clone());

        for n in 1..=4 {
            tx.send(status_with(&[(ViolationKind::AudioDetected, n), (ViolationKind::HeadTurned, n / 2)]))
                .unwrap();
            tokio::time::sleep(INTERVAL).await;
        }
        channel.shutdown().await;

        let submissions = sink.submissions();
        assert!(submissions.len() >= 3);
        for pair in submissions.windows(2) {
            assert!(pair[1].1.audio_incidents >= pair[0].1.audio_incidents);
            assert!(pair[1].1.heads_turned >= pair[0].1.heads_turned);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_submissions() {
        let (_tx, rx) = watch::channel(SessionStatus::default());
        let sink = Arc::new(RecordingSink::default());
        let channel = ReportingChannel::spawn(AttemptId(1), INTERVAL, rx, sink.clone());

        tokio::time::sleep(Duration::from_secs(10)).await;
        channel.shutdown().await;

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(sink.submissions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_status_stops_submissions() {
        let (tx, rx) = watch::channel(status_with(&[(ViolationKind::MultiplePeople, 1)]));
        let sink = Arc::new(RecordingSink::default());
        let channel = ReportingChannel::spawn(AttemptId(3), INTERVAL, rx, sink.clone());

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(sink.submissions().len(), 1);

        drop(tx);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(sink.submissions().len(), 1);

        let stats = channel.shutdown().await;
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.last_sent.map(|c| c.total()), Some(1));
    }

    #[tokio::test]
    async fn test_http_sink_puts_camel_case_counts() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/attempts/42/session-report"))
            .and(header("authorization", "Bearer exam-token"))
            .and(body_json(json!({
                "headsTurned": 0,
                "headTilts": 0,
                "lookAways": 3,
                "multiplePeople": 0,
                "faceVisibilityIssues": 1,
                "mobileDetected": 0,
                "audioIncidents": 2
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = ProctorConfig::default();
        config.api_base_url = server.uri();
        config.api_token = Some("exam-token".to_string());
        let sink = HttpReportSink::new(&config).unwrap();

        let status = status_with(&[
            (ViolationKind::GazeAway, 3),
            (ViolationKind::FaceVisibility, 1),
            (ViolationKind::AudioDetected, 2),
        ]);
        let update = SessionReportUpdate::from(&status.counts);
        sink.submit(AttemptId(42), &update).await.unwrap();
    }

    #[tokio::test]
    async fn test_http_sink_reports_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let mut config = ProctorConfig::default();
        config.api_base_url = server.uri();
        let sink = HttpReportSink::new(&config).unwrap();

        let err = sink
            .submit(AttemptId(42), &SessionReportUpdate::default())
            .await
            .unwrap_err();
        match err {
            ProctorError::ReportFailed(message) => {
                assert!(message.contains("503"));
                assert!(message.contains("maintenance"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
