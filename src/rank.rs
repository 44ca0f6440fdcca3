//! Card ranking and truncation
//!
//! The final deterministic total order over surviving signals: severity
//! (descending), then most-recent supporting evidence (descending), then
//! registry position (ascending) as the stable last-resort tie-break. After
//! sorting, the list is truncated to the configured maximum and each signal
//! is mapped into its outward card form.

use crate::detect::SignalRegistry;
use crate::types::{card_id, CoachCard, Signal};
use chrono::NaiveDate;
use std::cmp::Ordering;

/// The engine's one total order over signals
pub fn signal_order(a: &Signal, b: &Signal, registry: &SignalRegistry) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then(b.latest_evidence_at.cmp(&a.latest_evidence_at))
        .then(
            registry
                .position(a.signal_type)
                .cmp(&registry.position(b.signal_type)),
        )
}

/// Sort, truncate to `max_cards`, and map the survivors into coach cards.
///
/// `window_end` is the evaluation window's end date; it feeds the
/// deterministic card id.
pub fn rank_and_truncate(
    mut signals: Vec<Signal>,
    max_cards: usize,
    registry: &SignalRegistry,
    window_end: NaiveDate,
) -> Vec<CoachCard> {
    signals.sort_by(|a, b| signal_order(a, b, registry));
    signals.truncate(max_cards);
    signals.into_iter().map(|s| to_card(s, window_end)).collect()
}

fn to_card(signal: Signal, window_end: NaiveDate) -> CoachCard {
    CoachCard {
        id: card_id(signal.child_id, signal.signal_type, window_end),
        signal_type: signal.signal_type,
        category: signal.signal_type.category(),
        severity: signal.severity,
        evidence: signal.evidence,
        localization_key: signal.signal_type.localization_key(),
        params: signal.params,
    }
}
