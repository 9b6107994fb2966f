// Violation aggregation - edge-triggered episode counting

use crate::models::violation::{SessionStatus, ViolationCounts, ViolationKind, ViolationSet};

/// Merges per-tick detector output into cumulative episode counts
///
/// A kind is counted once when it goes from inactive to active; it stays active
/// (and uncounted) for as long as consecutive ticks keep raising it.
#[derive(Debug, Default, Clone)]
pub struct ViolationAggregator {
    active: ViolationSet,
    counts: ViolationCounts,
}

impl ViolationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one tick's raised set and return the resulting status
    pub fn update(&mut self, raised: &ViolationSet) -> SessionStatus {
        for kind in raised.iter() {
            if !self.active.contains(kind) {
                self.counts.increment(kind);
                tracing::debug!(kind = %kind, count = self.counts.get(kind), "Violation episode started");
            }
        }
        self.active = *raised;

        self.status()
    }

    pub fn counts(&self) -> ViolationCounts {
        self.counts
    }

    pub fn active(&self) -> &ViolationSet {
        &self.active
    }

    pub fn is_violating(&self) -> bool {
        !self.active.is_empty()
    }

    /// Label of the highest-priority active kind
    pub fn alert_label(&self) -> Option<&'static str> {
        ViolationKind::ALERT_PRIORITY
            .into_iter()
            .find(|kind| self.active.contains(*kind))
            .map(|kind| kind.alert_label())
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            counts: self.counts,
            violating: self.is_violating(),
            alert_label: self.alert_label(),
        }
    }
}
