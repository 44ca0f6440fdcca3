//! Routine-slipping detection
//!
//! A category that held a steady positive cadence in the prior 30-day window
//! but has now gone quiet for longer than that cadence tolerates is slipping.
//! Risk tone; premium-only.

use crate::config::{DetectorConfig, SLIP_BASE_SEVERITY, SLIP_SEVERITY_PER_DAY};
use crate::detect::Detector;
use crate::types::{BehaviorEvent, EvidenceRef, Polarity, Signal, SignalType};
use crate::window::WindowedView;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

pub struct RoutineSlippingDetector {
    config: DetectorConfig,
}

struct SlipCandidate<'a> {
    severity: u8,
    category_id: Uuid,
    establishing: Vec<&'a BehaviorEvent>,
    last_seen_at: DateTime<Utc>,
    cadence_days: f64,
    gap_days: f64,
}

impl RoutineSlippingDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    fn evaluate_category<'a>(
        &self,
        category_id: Uuid,
        prior_events: &'a [BehaviorEvent],
        view: &'a WindowedView,
    ) -> Option<SlipCandidate<'a>> {
        let establishing: Vec<&BehaviorEvent> = prior_events
            .iter()
            .filter(|e| matches!(e.polarity, Polarity::Positive))
            .collect();
        if establishing.len() < self.config.slip_established_min {
            return None;
        }

        let cadence_days = median_gap_days(&establishing);

        // Latest sighting of the category anywhere in the fetch window
        let last_seen_at = view
            .last_30
            .by_category
            .get(&category_id)
            .and_then(|events| events.last())
            .map(|e| e.occurred_at)
            .unwrap_or(establishing.last()?.occurred_at);

        let gap_days = (view.now - last_seen_at).num_seconds() as f64 / 86_400.0;
        let threshold = cadence_days * self.config.slip_factor;
        if gap_days <= threshold {
            return None;
        }

        Some(SlipCandidate {
            severity: slip_severity(gap_days, threshold),
            category_id,
            establishing,
            last_seen_at,
            cadence_days,
            gap_days,
        })
    }
}

impl Detector for RoutineSlippingDetector {
    fn signal_type(&self) -> SignalType {
        SignalType::RoutineSlipping
    }

    fn detect(&self, view: &WindowedView) -> Option<Signal> {
        let mut best: Option<SlipCandidate> = None;
        for (category_id, prior_events) in &view.prior_30.by_category {
            if let Some(candidate) = self.evaluate_category(*category_id, prior_events, view) {
                if best
                    .as_ref()
                    .map_or(true, |b| candidate.severity > b.severity)
                {
                    best = Some(candidate);
                }
            }
        }
        let candidate = best?;

        let child_id = candidate.establishing[0].child_id;
        let evidence: Vec<EvidenceRef> = candidate
            .establishing
            .iter()
            .map(|e| EvidenceRef::Event(e.id))
            .collect();

        let mut params = BTreeMap::new();
        params.insert("category_id".into(), json!(candidate.category_id));
        params.insert(
            "established_occurrences".into(),
            json!(candidate.establishing.len()),
        );
        params.insert("cadence_days".into(), json!(candidate.cadence_days));
        params.insert("gap_days".into(), json!(candidate.gap_days.floor()));

        Some(Signal {
            signal_type: SignalType::RoutineSlipping,
            child_id,
            severity: candidate.severity,
            evidence,
            latest_evidence_at: candidate.last_seen_at,
            params,
            computed_at: view.now,
        })
    }
}

/// Median gap in days between consecutive occurrences, never below one day
fn median_gap_days(events: &[&BehaviorEvent]) -> f64 {
    let mut gaps: Vec<f64> = events
        .windows(2)
        .map(|pair| (pair[1].occurred_at - pair[0].occurred_at).num_seconds() as f64 / 86_400.0)
        .collect();
    if gaps.is_empty() {
        return 1.0;
    }
    gaps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = gaps.len() / 2;
    let median = if gaps.len() % 2 == 0 {
        (gaps[mid - 1] + gaps[mid]) / 2.0
    } else {
        gaps[mid]
    };
    median.max(1.0)
}

/// Severity grows with each day the gap runs past the slip threshold
fn slip_severity(gap_days: f64, threshold_days: f64) -> u8 {
    let excess = (gap_days - threshold_days).max(0.0);
    let raw = SLIP_BASE_SEVERITY as f64 + SLIP_SEVERITY_PER_DAY as f64 * excess;
    raw.round().min(100.0) as u8
}
