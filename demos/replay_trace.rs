// Replay a recorded trace through a full proctoring session
//
// Usage: cargo run --example replay_trace -- [trace.jsonl] [attempt_id]
// Reports go to the configured backend when PROCTOR_API_URL is set, otherwise
// they are only logged.

use async_trait::async_trait;
use proctor_lib::core::config::ProctorConfig;
use proctor_lib::core::logging::init_logging;
use proctor_lib::core::reporter::{HttpReportSink, ReportSink};
use proctor_lib::core::session::ProctoringSession;
use proctor_lib::models::error::ProctorResult;
use proctor_lib::models::report::{AttemptId, SessionReportUpdate};
use proctor_lib::platform::replay::{ReplayStream, ReplayTrace};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Sink that only logs what would have been sent
struct LoggingSink;

#[async_trait]
impl ReportSink for LoggingSink {
    async fn submit(&self, attempt_id: AttemptId, update: &SessionReportUpdate) -> ProctorResult<()> {
        tracing::info!(%attempt_id, payload = %serde_json::to_string(update)?, "Session report");
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let trace_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/sample_trace.jsonl")));
    let attempt_id = AttemptId(args.next().and_then(|a| a.parse().ok()).unwrap_or(1));

    let mut config = ProctorConfig::default();
    config.apply_env_overrides();
    config.report_interval_secs = 5;
    init_logging(config.json_logs);

    println!("=== Proctoring Trace Replay ===\n");
    println!("Trace: {}", trace_path.display());

    let trace = match ReplayTrace::load(&trace_path, config.fft_size, config.fallback_sample_rate) {
        Ok(trace) => trace,
        Err(e) => {
            println!("✗ Failed to load trace: {}", e);
            return;
        }
    };
    println!("✓ Loaded {} frames ({:.1} s)\n", trace.len(), trace.duration().as_secs_f32());

    let sink: Arc<dyn ReportSink> = if std::env::var("PROCTOR_API_URL").is_ok() {
        match HttpReportSink::new(&config) {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                println!("✗ Failed to create HTTP client: {}", e);
                return;
            }
        }
    } else {
        Arc::new(LoggingSink)
    };

    let duration = trace.duration();
    let (stream, models) = ReplayStream::build(trace, config.capture_width, config.capture_height);

    let session = match ProctoringSession::start(&config, attempt_id, stream, &models, sink, |message| {
        println!("✗ {}", message)
    })
    .await
    {
        Ok(session) => session,
        Err(_) => return,
    };

    // Print every alert change while the trace plays
    let mut updates = session.subscribe();
    let watcher = tokio::spawn(async move {
        let mut last_label = None;
        while updates.changed().await.is_ok() {
            let status = *updates.borrow_and_update();
            if status.alert_label != last_label {
                match status.alert_label {
                    Some(label) => println!("  ⚠ {}", label),
                    None => println!("  ✓ clear"),
                }
                last_label = status.alert_label;
            }
        }
    });

    tokio::time::sleep(duration + Duration::from_millis(500)).await;
    let summary = session.shutdown().await;
    watcher.abort();

    println!("\n=== Summary ===");
    println!("Session:   {}", summary.session_id);
    println!("Frames:    {}", summary.frames_processed);
    for (kind, count) in summary.counts.iter() {
        println!("  {:<16} {}", kind.report_field(), count);
    }
    println!("Head movements: {}", summary.counts.head_movements());
    println!(
        "Reports:   {} sent, {} failed",
        summary.reports.sent, summary.reports.failed
    );
}
