pub mod core;
pub mod models;
pub mod platform;

pub use crate::core::config::ProctorConfig;
pub use crate::core::logging::init_logging;
pub use crate::core::reporter::{HttpReportSink, ReportSink, ReportStats};
pub use crate::core::session::{ProctoringSession, SessionSummary, SETUP_FAILURE_MESSAGE};
pub use crate::models::error::{ProctorError, ProctorResult};
pub use crate::models::report::{AttemptId, SessionReportUpdate};
pub use crate::models::violation::{SessionStatus, ViolationCounts, ViolationKind};
