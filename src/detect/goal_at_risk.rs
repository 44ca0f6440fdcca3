//! Goal-at-risk detection
//!
//! Compares the daily earn rate a goal's deadline demands against the rate
//! actually observed over the last 7 days. When the observed rate implies
//! missing the deadline by more than the configured tolerance, a risk signal
//! fires with severity scaled to the shortfall.

use crate::config::DetectorConfig;
use crate::detect::Detector;
use crate::types::{EvidenceRef, Goal, Signal, SignalType};
use crate::window::WindowedView;
use serde_json::json;
use std::collections::BTreeMap;

/// Deadlines closer than this still produce a finite required rate
const MIN_DAYS_REMAINING: f64 = 0.5;

/// Length of the observation window in days
const OBSERVED_WINDOW_DAYS: f64 = 7.0;

pub struct GoalAtRiskDetector {
    config: DetectorConfig,
}

impl GoalAtRiskDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    fn evaluate_goal(&self, goal: &Goal, view: &WindowedView) -> Option<(u8, f64, f64)> {
        let deadline = goal.deadline?;
        if !goal.is_active() || deadline <= view.now {
            return None;
        }

        let days_remaining = (deadline - view.now).num_seconds() as f64 / 86_400.0;
        let required = required_daily_rate(goal.target_points, goal.current_points, days_remaining);
        let observed = observed_daily_rate(view.last_7.positive_points());

        if !is_at_risk(observed, required, self.config.at_risk_tolerance) {
            return None;
        }

        let severity = shortfall_severity(observed, required, self.config.at_risk_min_severity);
        Some((severity, required, observed))
    }
}

impl Detector for GoalAtRiskDetector {
    fn signal_type(&self) -> SignalType {
        SignalType::GoalAtRisk
    }

    fn detect(&self, view: &WindowedView) -> Option<Signal> {
        // Goals are pre-sorted by id, so "first wins" on equal severity is
        // stable across runs
        let mut best: Option<(u8, &Goal, f64, f64)> = None;
        for goal in &view.goals {
            if let Some((severity, required, observed)) = self.evaluate_goal(goal, view) {
                if best.as_ref().map_or(true, |(s, ..)| severity > *s) {
                    best = Some((severity, goal, required, observed));
                }
            }
        }
        let (severity, goal, required, observed) = best?;

        let mut evidence = vec![EvidenceRef::Goal(goal.id)];
        evidence.extend(view.last_7.positive.iter().map(|e| EvidenceRef::Event(e.id)));
        let latest_evidence_at = view
            .last_7
            .positive
            .last()
            .map(|e| e.occurred_at)
            .unwrap_or(goal.created_at);

        let mut params = BTreeMap::new();
        params.insert("goal_id".into(), json!(goal.id));
        params.insert("target_points".into(), json!(goal.target_points));
        params.insert("current_points".into(), json!(goal.current_points));
        params.insert("required_daily_rate".into(), json!(required));
        params.insert("observed_daily_rate".into(), json!(observed));
        params.insert("deadline".into(), json!(goal.deadline));

        Some(Signal {
            signal_type: SignalType::GoalAtRisk,
            child_id: goal.child_id,
            severity,
            evidence,
            latest_evidence_at,
            params,
            computed_at: view.now,
        })
    }
}

/// Daily rate needed to close the remaining gap by the deadline
///
/// Formula: `(target - current) / days_remaining`
fn required_daily_rate(target: i32, current: i32, days_remaining: f64) -> f64 {
    let remaining = (target - current).max(0) as f64;
    remaining / days_remaining.max(MIN_DAYS_REMAINING)
}

/// Daily rate observed over the last 7 days of positive events
fn observed_daily_rate(points_last_7: i32) -> f64 {
    points_last_7 as f64 / OBSERVED_WINDOW_DAYS
}

/// At risk when the observed rate undershoots the required rate by more
/// than the tolerance
fn is_at_risk(observed: f64, required: f64, tolerance: f64) -> bool {
    required > 0.0 && observed < required * (1.0 - tolerance)
}

/// Severity scaled to the shortfall fraction, floored so a firing signal is
/// never trivially outranked
fn shortfall_severity(observed: f64, required: f64, floor: u8) -> u8 {
    let shortfall = ((required - observed) / required).clamp(0.0, 1.0);
    ((shortfall * 100.0).round() as u8).max(floor)
}
