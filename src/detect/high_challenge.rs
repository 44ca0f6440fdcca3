//! High-challenge-week detection
//!
//! When challenge-polarity events dominate the last 7 days the week was
//! rough. Informational tone: the card names the pattern without assigning
//! blame. Severity scales with the ratio itself.

use crate::config::DetectorConfig;
use crate::detect::Detector;
use crate::types::{EvidenceRef, Signal, SignalType};
use crate::window::WindowedView;
use serde_json::json;
use std::collections::BTreeMap;

pub struct HighChallengeWeekDetector {
    config: DetectorConfig,
}

impl HighChallengeWeekDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

impl Detector for HighChallengeWeekDetector {
    fn signal_type(&self) -> SignalType {
        SignalType::HighChallengeWeek
    }

    fn detect(&self, view: &WindowedView) -> Option<Signal> {
        let total = view.last_7.events.len();
        if total < self.config.challenge_min_events {
            return None;
        }

        let ratio = challenge_ratio(view.last_7.challenge.len(), total);
        if ratio <= self.config.challenge_ratio_threshold {
            return None;
        }

        let child_id = view.last_7.events[0].child_id;
        let latest_evidence_at = view.last_7.challenge.last().map(|e| e.occurred_at)?;
        let evidence: Vec<EvidenceRef> = view
            .last_7
            .challenge
            .iter()
            .map(|e| EvidenceRef::Event(e.id))
            .collect();

        let mut params = BTreeMap::new();
        params.insert("challenge_events".into(), json!(view.last_7.challenge.len()));
        params.insert("total_events".into(), json!(total));
        params.insert("challenge_ratio".into(), json!(ratio));

        Some(Signal {
            signal_type: SignalType::HighChallengeWeek,
            child_id,
            severity: ratio_severity(ratio),
            evidence,
            latest_evidence_at,
            params,
            computed_at: view.now,
        })
    }
}

/// Fraction of the week's events carrying challenge polarity
fn challenge_ratio(challenge: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    challenge as f64 / total as f64
}

/// Severity is the ratio mapped onto the 0-100 scale
fn ratio_severity(ratio: f64) -> u8 {
    (ratio.clamp(0.0, 1.0) * 100.0).round() as u8
}
