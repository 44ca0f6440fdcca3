//! Routine-forming detection
//!
//! A behavior category with a consistent positive repeat over the last
//! 7 days is a forming routine: at least the minimum number of occurrences,
//! with no gap between consecutive occurrences (or since the latest one)
//! exceeding the configured maximum. An improvement-tone signal celebrating
//! consistency.

use crate::config::{DetectorConfig, ROUTINE_BASE_SEVERITY, ROUTINE_SEVERITY_PER_EXTRA};
use crate::detect::Detector;
use crate::types::{BehaviorEvent, EvidenceRef, Signal, SignalType};
use crate::window::WindowedView;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

pub struct RoutineFormingDetector {
    config: DetectorConfig,
}

impl RoutineFormingDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

impl Detector for RoutineFormingDetector {
    fn signal_type(&self) -> SignalType {
        SignalType::RoutineForming
    }

    fn detect(&self, view: &WindowedView) -> Option<Signal> {
        // Categories iterate in id order (BTreeMap), so equal-severity ties
        // resolve identically across runs
        let mut best: Option<(u8, Uuid, Vec<&BehaviorEvent>)> = None;
        for (category_id, events) in &view.last_7.by_category {
            let qualifying: Vec<&BehaviorEvent> = events
                .iter()
                .filter(|e| matches!(e.polarity, crate::types::Polarity::Positive))
                .collect();
            if qualifying.len() < self.config.routine_min_occurrences {
                continue;
            }
            if !is_consistent(&qualifying, view.now, self.config.routine_max_gap_days) {
                continue;
            }
            let severity =
                forming_severity(qualifying.len(), self.config.routine_min_occurrences);
            if best.as_ref().map_or(true, |(s, ..)| severity > *s) {
                best = Some((severity, *category_id, qualifying));
            }
        }
        let (severity, category_id, qualifying) = best?;

        let child_id = qualifying[0].child_id;
        let latest_evidence_at = qualifying.last().map(|e| e.occurred_at)?;
        let evidence: Vec<EvidenceRef> =
            qualifying.iter().map(|e| EvidenceRef::Event(e.id)).collect();

        let mut params = BTreeMap::new();
        params.insert("category_id".into(), json!(category_id));
        params.insert("occurrences".into(), json!(qualifying.len()));

        Some(Signal {
            signal_type: SignalType::RoutineForming,
            child_id,
            severity,
            evidence,
            latest_evidence_at,
            params,
            computed_at: view.now,
        })
    }
}

/// True when no gap between consecutive occurrences, nor between the latest
/// occurrence and now, exceeds `max_gap_days`
fn is_consistent(events: &[&BehaviorEvent], now: DateTime<Utc>, max_gap_days: i64) -> bool {
    let max_gap = Duration::days(max_gap_days);
    for pair in events.windows(2) {
        if pair[1].occurred_at - pair[0].occurred_at > max_gap {
            return false;
        }
    }
    match events.last() {
        Some(last) => now - last.occurred_at <= max_gap,
        None => false,
    }
}

/// Severity grows with occurrences beyond the minimum, capped at 100
fn forming_severity(occurrences: usize, min_occurrences: usize) -> u8 {
    let extra = occurrences.saturating_sub(min_occurrences) as u64;
    let raw = ROUTINE_BASE_SEVERITY as u64 + ROUTINE_SEVERITY_PER_EXTRA as u64 * extra;
    raw.min(100) as u8
}
