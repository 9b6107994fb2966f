// Data models for violation kinds, counters, and UI status

use serde::{Deserialize, Serialize};
use std::fmt;

// ==============================================================================
// Violation Kind
// ==============================================================================

/// The seven recognized anomaly categories, in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    HeadTurned,
    HeadTilt,
    GazeAway,
    MultiplePeople,
    FaceVisibility,
    MobileDetected,
    AudioDetected,
}

impl ViolationKind {
    pub const COUNT: usize = 7;

    /// Declaration order
    pub const ALL: [ViolationKind; Self::COUNT] = [
        ViolationKind::HeadTurned,
        ViolationKind::HeadTilt,
        ViolationKind::GazeAway,
        ViolationKind::MultiplePeople,
        ViolationKind::FaceVisibility,
        ViolationKind::MobileDetected,
        ViolationKind::AudioDetected,
    ];

    /// Kinds derived from face landmarks
    pub const FACE: [ViolationKind; 5] = [
        ViolationKind::HeadTurned,
        ViolationKind::HeadTilt,
        ViolationKind::GazeAway,
        ViolationKind::MultiplePeople,
        ViolationKind::FaceVisibility,
    ];

    /// Alert precedence when several kinds are active, highest first
    pub const ALERT_PRIORITY: [ViolationKind; Self::COUNT] = [
        ViolationKind::AudioDetected,
        ViolationKind::MobileDetected,
        ViolationKind::FaceVisibility,
        ViolationKind::MultiplePeople,
        ViolationKind::GazeAway,
        ViolationKind::HeadTilt,
        ViolationKind::HeadTurned,
    ];

    pub fn is_face_derived(self) -> bool {
        Self::FACE.contains(&self)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::HeadTurned => "HEAD_TURNED",
            ViolationKind::HeadTilt => "HEAD_TILT",
            ViolationKind::GazeAway => "GAZE_AWAY",
            ViolationKind::MultiplePeople => "MULTIPLE_PEOPLE",
            ViolationKind::FaceVisibility => "FACE_VISIBILITY",
            ViolationKind::MobileDetected => "MOBILE_DETECTED",
            ViolationKind::AudioDetected => "AUDIO_DETECTED",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
    }

    /// Text shown on the camera widget while this kind is active
    pub fn alert_label(&self) -> &'static str {
        match self {
            ViolationKind::HeadTurned => "HEAD TURNED",
            ViolationKind::HeadTilt => "HEAD TILT",
            ViolationKind::GazeAway => "GAZE AWAY",
            ViolationKind::MultiplePeople => "MULTIPLE PEOPLE",
            ViolationKind::FaceVisibility => "FACE VISIBILITY",
            ViolationKind::MobileDetected => "PHONE DETECTED",
            ViolationKind::AudioDetected => "SPEECH DETECTED",
        }
    }

    /// Field name in the session-report payload
    pub fn report_field(&self) -> &'static str {
        match self {
            ViolationKind::HeadTurned => "headsTurned",
            ViolationKind::HeadTilt => "headTilts",
            ViolationKind::GazeAway => "lookAways",
            ViolationKind::MultiplePeople => "multiplePeople",
            ViolationKind::FaceVisibility => "faceVisibilityIssues",
            ViolationKind::MobileDetected => "mobileDetected",
            ViolationKind::AudioDetected => "audioIncidents",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================================================================
// Violation Set
// ==============================================================================

/// Kinds raised during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViolationSet {
    raised: [bool; ViolationKind::COUNT],
}

impl ViolationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ViolationKind) {
        self.raised[kind.index()] = true;
    }

    pub fn contains(&self, kind: ViolationKind) -> bool {
        self.raised[kind.index()]
    }

    pub fn extend(&mut self, other: &ViolationSet) {
        for kind in other.iter() {
            self.insert(kind);
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.raised.iter().any(|r| *r)
    }

    pub fn len(&self) -> usize {
        self.raised.iter().filter(|r| **r).count()
    }

    /// Raised kinds in declaration order
    pub fn iter(&self) -> impl Iterator<Item = ViolationKind> + '_ {
        ViolationKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl FromIterator<ViolationKind> for ViolationSet {
    fn from_iter<I: IntoIterator<Item = ViolationKind>>(iter: I) -> Self {
        let mut set = ViolationSet::new();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

// ==============================================================================
// Counters
// ==============================================================================

/// Cumulative per-kind episode counts for a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationCounts {
    counts: [u32; ViolationKind::COUNT],
}

impl ViolationCounts {
    pub fn get(&self, kind: ViolationKind) -> u32 {
        self.counts[kind.index()]
    }

    pub(crate) fn increment(&mut self, kind: ViolationKind) {
        let slot = &mut self.counts[kind.index()];
        *slot = slot.saturating_add(1);
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Turned plus tilted, the figure grouped as "Head" on the status panel
    pub fn head_movements(&self) -> u32 {
        self.get(ViolationKind::HeadTurned) + self.get(ViolationKind::HeadTilt)
    }

    /// True when no kind decreased relative to `earlier`
    pub fn dominates(&self, earlier: &ViolationCounts) -> bool {
        ViolationKind::ALL
            .into_iter()
            .all(|kind| self.get(kind) >= earlier.get(kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ViolationKind, u32)> + '_ {
        ViolationKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }
}

// ==============================================================================
// UI Status
// ==============================================================================

/// What the host renders: counts plus the live alert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub counts: ViolationCounts,
    pub violating: bool,
    pub alert_label: Option<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in ViolationKind::ALL {
            assert_eq!(ViolationKind::from_string(kind.as_str()), Some(kind));
        }
        assert_eq!(ViolationKind::from_string("no_face"), None);
    }

    #[test]
    fn test_alert_labels() {
        assert_eq!(ViolationKind::AudioDetected.alert_label(), "SPEECH DETECTED");
        assert_eq!(ViolationKind::MobileDetected.alert_label(), "PHONE DETECTED");
        for kind in ViolationKind::ALL {
            if !matches!(kind, ViolationKind::AudioDetected | ViolationKind::MobileDetected) {
                assert_eq!(kind.alert_label(), kind.as_str().replace('_', " "));
            }
        }
    }

    #[test]
    fn test_priority_covers_every_kind_once() {
        let mut seen = ViolationKind::ALERT_PRIORITY.to_vec();
        seen.sort();
        assert_eq!(seen, ViolationKind::ALL.to_vec());
    }

    #[test]
    fn test_set_iterates_in_declaration_order() {
        let set: ViolationSet = [
            ViolationKind::AudioDetected,
            ViolationKind::HeadTurned,
            ViolationKind::GazeAway,
        ]
        .into_iter()
        .collect();

        let kinds: Vec<_> = set.iter().collect();
        assert_eq!(
            kinds,
            vec![
                ViolationKind::HeadTurned,
                ViolationKind::GazeAway,
                ViolationKind::AudioDetected
            ]
        );
        assert_eq!(set.len(), 3);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_counts_helpers() {
        let mut counts = ViolationCounts::default();
        counts.increment(ViolationKind::HeadTurned);
        counts.increment(ViolationKind::HeadTilt);
        counts.increment(ViolationKind::HeadTilt);
        counts.increment(ViolationKind::AudioDetected);

        assert_eq!(counts.head_movements(), 3);
        assert_eq!(counts.total(), 4);
        assert!(counts.dominates(&ViolationCounts::default()));
        assert!(!ViolationCounts::default().dominates(&counts));
    }
}
