//! Safety rails
//!
//! Tone management across the surviving candidate set: no matter how many
//! real patterns fired, at most `cap[category]` cards of each emotional tone
//! survive. Three simultaneous risk cards would overwhelm, so the cap keeps
//! the strongest and discards the rest. This is deliberate composition
//! control, not a data-quality filter.

use crate::config::CategoryCaps;
use crate::detect::SignalRegistry;
use crate::rank::signal_order;
use crate::types::{CardCategory, Signal};

/// Enforce per-category maximum counts.
///
/// Within each category, signals are ordered severity-descending (with the
/// ranker's full tie-break chain, so equal severities resolve identically
/// across runs) and the top `cap` are kept.
pub fn apply_caps(
    signals: Vec<Signal>,
    caps: &CategoryCaps,
    registry: &SignalRegistry,
) -> Vec<Signal> {
    let mut kept = Vec::with_capacity(signals.len());
    for category in [
        CardCategory::Risk,
        CardCategory::Improvement,
        CardCategory::Neutral,
    ] {
        let mut bucket: Vec<Signal> = signals
            .iter()
            .filter(|s| s.signal_type.category() == category)
            .cloned()
            .collect();
        bucket.sort_by(|a, b| signal_order(a, b, registry));
        bucket.truncate(caps.cap_for(category));
        kept.extend(bucket);
    }
    kept
}
