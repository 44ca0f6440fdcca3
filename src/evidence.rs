//! Evidence validation
//!
//! A card whose cited proof has vanished from the canonical dataset (for
//! example the user deleted a logged event between window-build and
//! validation) must never be shown. Validation is a hard drop of the whole
//! signal, never a partial repair.

use crate::types::{BehaviorEvent, EvidenceRef, Goal, Signal};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

/// Id index over the canonical dataset supplied for one call
#[derive(Debug, Default)]
pub struct CanonicalDataset {
    event_ids: HashSet<Uuid>,
    goal_ids: HashSet<Uuid>,
}

impl CanonicalDataset {
    pub fn new(events: &[BehaviorEvent], goals: &[Goal]) -> Self {
        Self {
            event_ids: events.iter().map(|e| e.id).collect(),
            goal_ids: goals.iter().map(|g| g.id).collect(),
        }
    }

    /// Whether one evidence reference still resolves
    pub fn resolves(&self, evidence: &EvidenceRef) -> bool {
        match evidence {
            EvidenceRef::Event(id) => self.event_ids.contains(id),
            EvidenceRef::Goal(id) => self.goal_ids.contains(id),
        }
    }
}

/// Keep only signals whose evidence is non-empty and fully resolvable.
///
/// Dropped signals are logged at debug level; stale evidence is an expected
/// degradation, not an error.
pub fn filter_valid(signals: Vec<Signal>, dataset: &CanonicalDataset) -> Vec<Signal> {
    signals
        .into_iter()
        .filter(|signal| {
            let valid = !signal.evidence.is_empty()
                && signal.evidence.iter().all(|e| dataset.resolves(e));
            if !valid {
                debug!(
                    signal = signal.signal_type.as_str(),
                    "dropping signal with stale or empty evidence"
                );
            }
            valid
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{event, goal};
    use crate::types::{Polarity, SignalType};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn signal_with_evidence(evidence: Vec<EvidenceRef>) -> Signal {
        Signal {
            signal_type: SignalType::RoutineForming,
            child_id: Uuid::new_v4(),
            severity: 60,
            evidence,
            latest_evidence_at: Utc::now(),
            params: BTreeMap::new(),
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn test_resolvable_evidence_passes() {
        let child = Uuid::new_v4();
        let e = event(child, Polarity::Positive, 1, Utc::now());
        let g = goal(child, 10, 0, None, Utc::now());
        let dataset = CanonicalDataset::new(&[e.clone()], &[g.clone()]);

        let signals = vec![signal_with_evidence(vec![
            EvidenceRef::Event(e.id),
            EvidenceRef::Goal(g.id),
        ])];
        assert_eq!(filter_valid(signals, &dataset).len(), 1);
    }

    #[test]
    fn test_single_missing_ref_drops_whole_signal() {
        let child = Uuid::new_v4();
        let e = event(child, Polarity::Positive, 1, Utc::now());
        let dataset = CanonicalDataset::new(&[e.clone()], &[]);

        let signals = vec![signal_with_evidence(vec![
            EvidenceRef::Event(e.id),
            // Deleted event
            EvidenceRef::Event(Uuid::new_v4()),
        ])];
        assert_eq!(filter_valid(signals, &dataset).len(), 0);
    }

    #[test]
    fn test_empty_evidence_is_invalid() {
        let dataset = CanonicalDataset::default();
        let signals = vec![signal_with_evidence(vec![])];
        assert_eq!(filter_valid(signals, &dataset).len(), 0);
    }

    #[test]
    fn test_goal_ref_does_not_resolve_against_event_ids() {
        let child = Uuid::new_v4();
        let e = event(child, Polarity::Positive, 1, Utc::now());
        let dataset = CanonicalDataset::new(&[e.clone()], &[]);
        // Same id, wrong kind
        assert!(!dataset.resolves(&EvidenceRef::Goal(e.id)));
    }
}
