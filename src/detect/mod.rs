//! Signal detectors and the detector registry
//!
//! Each detector is a pure function over the windowed view: it either
//! recognizes its one pattern and emits a signal with evidence attached, or
//! it stays silent. Detectors never consult each other, which keeps them
//! testable in isolation and safe to run in any order.
//!
//! The registry is the fixed, ordered catalog of detectors. Its order is
//! established at construction, never mutated, and doubles as the final
//! ranking tie-break: equal-severity, equal-recency signals always resolve
//! in registration order.

mod goal_at_risk;
mod goal_stalled;
mod high_challenge;
mod routine_forming;
mod routine_slipping;

pub use goal_at_risk::GoalAtRiskDetector;
pub use goal_stalled::GoalStalledDetector;
pub use high_challenge::HighChallengeWeekDetector;
pub use routine_forming::RoutineFormingDetector;
pub use routine_slipping::RoutineSlippingDetector;

use crate::config::DetectorConfig;
use crate::types::{Signal, SignalType};
use crate::window::WindowedView;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// One behavioral pattern recognizer
pub trait Detector: Send + Sync {
    /// The signal type this detector emits
    fn signal_type(&self) -> SignalType;

    /// Evaluate the windowed view; `None` when the pattern is absent
    fn detect(&self, view: &WindowedView) -> Option<Signal>;
}

/// Fixed, ordered catalog of detectors.
///
/// Adding a detector means appending here; removing one means deleting its
/// entry. No other component changes.
pub struct SignalRegistry {
    detectors: Vec<Box<dyn Detector>>,
}

impl SignalRegistry {
    /// The standard catalog in its canonical order
    pub fn standard(config: &DetectorConfig) -> Self {
        Self {
            detectors: vec![
                Box::new(GoalAtRiskDetector::new(*config)),
                Box::new(GoalStalledDetector::new(*config)),
                Box::new(RoutineFormingDetector::new(*config)),
                Box::new(RoutineSlippingDetector::new(*config)),
                Box::new(HighChallengeWeekDetector::new(*config)),
            ],
        }
    }

    /// Build a registry from an explicit detector list (test seam)
    pub fn with_detectors(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    /// All detectors in registration order
    pub fn all(&self) -> &[Box<dyn Detector>] {
        &self.detectors
    }

    /// Position of a signal type in registration order. Types not in the
    /// registry sort last.
    pub fn position(&self, signal_type: SignalType) -> usize {
        self.detectors
            .iter()
            .position(|d| d.signal_type() == signal_type)
            .unwrap_or(self.detectors.len())
    }

    /// Run every eligible detector against the view.
    ///
    /// Premium-only detectors are skipped for non-premium callers. A
    /// panicking detector is isolated: it logs a warning and contributes no
    /// signal instead of aborting the pipeline.
    pub fn run_all(&self, view: &WindowedView, is_premium: bool) -> Vec<Signal> {
        let mut signals = Vec::new();
        for detector in &self.detectors {
            let signal_type = detector.signal_type();
            if signal_type.premium_only() && !is_premium {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| detector.detect(view))) {
                Ok(Some(signal)) => signals.push(signal),
                Ok(None) => {}
                Err(_) => {
                    warn!(
                        detector = signal_type.as_str(),
                        "detector panicked; treating as no signal"
                    );
                }
            }
        }
        signals
    }
}
