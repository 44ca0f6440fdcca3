//! Goal-stalled detection
//!
//! An active goal with zero (or near-zero) positive point progress across
//! the last 14 days is stalled. Severity grows with the number of days since
//! the last progress was logged.

use crate::config::{DetectorConfig, STALL_BASE_SEVERITY, STALL_SEVERITY_PER_DAY};
use crate::detect::Detector;
use crate::types::{BehaviorEvent, EvidenceRef, Signal, SignalType};
use crate::window::WindowedView;
use serde_json::json;
use std::collections::BTreeMap;

/// The stall observation window in days
const STALL_WINDOW_DAYS: i64 = 14;

pub struct GoalStalledDetector {
    config: DetectorConfig,
}

impl GoalStalledDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

impl Detector for GoalStalledDetector {
    fn signal_type(&self) -> SignalType {
        SignalType::GoalStalled
    }

    fn detect(&self, view: &WindowedView) -> Option<Signal> {
        if view.last_14.positive_points() > self.config.stall_point_epsilon {
            return None;
        }

        // Only goals that existed for the whole stall window can be stalled;
        // goals are pre-sorted by id, so the subject choice is stable.
        let cutoff = view.now - chrono::Duration::days(STALL_WINDOW_DAYS);
        let goal = view
            .goals
            .iter()
            .find(|g| g.is_active() && g.created_at <= cutoff)?;

        let last_progress = last_progress_event(&view.all_events);
        let days_since_progress = match last_progress {
            Some(e) => (view.now - e.occurred_at).num_days(),
            None => (view.now - goal.created_at).num_days(),
        };
        let severity = stall_severity(days_since_progress);

        let mut evidence = vec![EvidenceRef::Goal(goal.id)];
        if let Some(e) = last_progress {
            evidence.push(EvidenceRef::Event(e.id));
        }
        let latest_evidence_at = last_progress
            .map(|e| e.occurred_at)
            .unwrap_or(goal.created_at);

        let mut params = BTreeMap::new();
        params.insert("goal_id".into(), json!(goal.id));
        params.insert("days_since_progress".into(), json!(days_since_progress));
        params.insert("current_points".into(), json!(goal.current_points));
        params.insert("target_points".into(), json!(goal.target_points));

        Some(Signal {
            signal_type: SignalType::GoalStalled,
            child_id: goal.child_id,
            severity,
            evidence,
            latest_evidence_at,
            params,
            computed_at: view.now,
        })
    }
}

/// Most recent positive event that actually carried points
fn last_progress_event(events: &[BehaviorEvent]) -> Option<&BehaviorEvent> {
    events
        .iter()
        .rev()
        .find(|e| matches!(e.polarity, crate::types::Polarity::Positive) && e.points > 0)
}

/// Severity grows linearly with days beyond the stall window, capped at 100
fn stall_severity(days_since_progress: i64) -> u8 {
    let extra = (days_since_progress - STALL_WINDOW_DAYS).max(0);
    let raw = STALL_BASE_SEVERITY as i64 + STALL_SEVERITY_PER_DAY as i64 * extra;
    raw.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::test_support::{event, goal, view_of};
    use crate::types::Polarity;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_stall_severity_grows_with_idle_days() {
        assert_eq!(stall_severity(14), 30);
        assert_eq!(stall_severity(20), 54);
        assert_eq!(stall_severity(40), 100);
    }

    #[test]
    fn test_detects_stalled_goal() {
        let child = Uuid::new_v4();
        let g = goal(child, 50, 10, None, now() - Duration::days(40));
        // Recent activity is all challenge-polarity; last progress 20 days ago
        let progress = event(child, Polarity::Positive, 5, now() - Duration::days(20));
        let events = vec![
            progress.clone(),
            event(child, Polarity::Challenge, 1, now() - Duration::days(2)),
            event(child, Polarity::Challenge, 1, now() - Duration::days(4)),
            event(child, Polarity::Challenge, 1, now() - Duration::days(6)),
        ];

        let view = view_of(events, vec![g.clone()], now(), &EngineConfig::default());
        let detector = GoalStalledDetector::new(DetectorConfig::default());
        let signal = detector.detect(&view).expect("should fire");

        assert_eq!(signal.severity, 54); // 30 + 4 * (20 - 14)
        assert!(signal.evidence.contains(&EvidenceRef::Goal(g.id)));
        assert!(signal.evidence.contains(&EvidenceRef::Event(progress.id)));
        assert_eq!(signal.params["days_since_progress"], json!(20));
    }

    #[test]
    fn test_silent_when_progress_exists() {
        let child = Uuid::new_v4();
        let g = goal(child, 50, 10, None, now() - Duration::days(40));
        let events = vec![
            event(child, Polarity::Positive, 3, now() - Duration::days(2)),
            event(child, Polarity::Challenge, 1, now() - Duration::days(4)),
            event(child, Polarity::Challenge, 1, now() - Duration::days(6)),
        ];

        let view = view_of(events, vec![g], now(), &EngineConfig::default());
        let detector = GoalStalledDetector::new(DetectorConfig::default());
        assert!(detector.detect(&view).is_none());
    }

    #[test]
    fn test_young_goals_are_not_stalled() {
        let child = Uuid::new_v4();
        let g = goal(child, 50, 0, None, now() - Duration::days(3));
        let events = vec![
            event(child, Polarity::Challenge, 1, now() - Duration::days(1)),
            event(child, Polarity::Challenge, 1, now() - Duration::days(2)),
            event(child, Polarity::Challenge, 1, now() - Duration::days(4)),
        ];

        let view = view_of(events, vec![g], now(), &EngineConfig::default());
        let detector = GoalStalledDetector::new(DetectorConfig::default());
        assert!(detector.detect(&view).is_none());
    }

    #[test]
    fn test_zero_point_positive_events_are_not_progress() {
        let child = Uuid::new_v4();
        let g = goal(child, 50, 10, None, now() - Duration::days(40));
        let events = vec![
            event(child, Polarity::Positive, 0, now() - Duration::days(1)),
            event(child, Polarity::Positive, 0, now() - Duration::days(3)),
            event(child, Polarity::Positive, 0, now() - Duration::days(5)),
        ];

        let view = view_of(events, vec![g.clone()], now(), &EngineConfig::default());
        let detector = GoalStalledDetector::new(DetectorConfig::default());
        let signal = detector.detect(&view).expect("should fire");
        // No progress ever logged: measured from goal creation
        assert_eq!(signal.params["days_since_progress"], json!(40));
        assert_eq!(signal.latest_evidence_at, g.created_at);
    }
}
