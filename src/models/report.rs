// Data models for the session-report wire contract

use crate::models::violation::{ViolationCounts, ViolationKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the assessment attempt being proctored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(pub i64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Body submitted to the attempt-scoped session-report endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReportUpdate {
    pub heads_turned: u32,
    pub head_tilts: u32,
    pub look_aways: u32,
    pub multiple_people: u32,
    pub face_visibility_issues: u32,
    pub mobile_detected: u32,
    pub audio_incidents: u32,
}

impl From<&ViolationCounts> for SessionReportUpdate {
    fn from(counts: &ViolationCounts) -> Self {
        Self {
            heads_turned: counts.get(ViolationKind::HeadTurned),
            head_tilts: counts.get(ViolationKind::HeadTilt),
            look_aways: counts.get(ViolationKind::GazeAway),
            multiple_people: counts.get(ViolationKind::MultiplePeople),
            face_visibility_issues: counts.get(ViolationKind::FaceVisibility),
            mobile_detected: counts.get(ViolationKind::MobileDetected),
            audio_incidents: counts.get(ViolationKind::AudioDetected),
        }
    }
}

/// Immutable counts captured at transmission time, tagged with the attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReportSnapshot {
    pub attempt_id: AttemptId,
    pub counts: ViolationCounts,
}

impl SessionReportSnapshot {
    pub fn new(attempt_id: AttemptId, counts: ViolationCounts) -> Self {
        Self { attempt_id, counts }
    }

    pub fn update(&self) -> SessionReportUpdate {
        SessionReportUpdate::from(&self.counts)
    }
}
