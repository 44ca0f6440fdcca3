//! Engine configuration
//!
//! All thresholds, tolerances, and caps are named constants collected into
//! one injectable struct. Nothing here is read from the environment; two
//! runs with the same config are always comparable.

use crate::types::{CardCategory, SignalType};
use serde::{Deserialize, Serialize};

/// Minimum events in the trailing 14 days before any detector runs
pub const DEFAULT_MIN_EVENTS_14D: usize = 3;

/// Maximum cards returned from one `generate_cards` call
pub const DEFAULT_MAX_CARDS: usize = 3;

/// Default cooldown before the same signal type can be shown again (days)
pub const DEFAULT_COOLDOWN_DAYS: i64 = 7;

/// Cooldown for goal-stalled cards (days). A stalled goal changes slowly;
/// re-showing it weekly reads as nagging.
pub const GOAL_STALLED_COOLDOWN_DAYS: i64 = 14;

/// Cooldown records idle longer than this are eligible for pruning (days)
pub const COOLDOWN_RETENTION_DAYS: i64 = 180;

/// How far back the engine fetches events: the 30-day window plus the
/// 7-day offset the routine-slipping detector's prior window needs
pub const FETCH_WINDOW_DAYS: i64 = 37;

/// Observed earn rate may undershoot the required rate by this fraction
/// before a goal counts as at risk
pub const AT_RISK_TOLERANCE: f64 = 0.15;

/// Severity floor for a goal-at-risk signal that fires at all
pub const AT_RISK_MIN_SEVERITY: u8 = 35;

/// Positive points at or below this over 14 days count as "no progress"
pub const STALL_POINT_EPSILON: i32 = 0;

/// Base severity for a stalled goal
pub const STALL_BASE_SEVERITY: u8 = 30;

/// Severity added per day without progress beyond the stall window
pub const STALL_SEVERITY_PER_DAY: u8 = 4;

/// Occurrences of one category in the last 7 days needed to call it a routine
pub const ROUTINE_MIN_OCCURRENCES: usize = 3;

/// Largest tolerated gap (days) between consecutive occurrences of a
/// forming routine, and between the latest occurrence and now
pub const ROUTINE_MAX_GAP_DAYS: i64 = 3;

/// Base severity for a forming routine with exactly the minimum occurrences
pub const ROUTINE_BASE_SEVERITY: u8 = 50;

/// Severity added per occurrence beyond the minimum
pub const ROUTINE_SEVERITY_PER_EXTRA: u8 = 10;

/// Occurrences in the prior 30-day window needed to consider a routine
/// "established" for slip detection
pub const SLIP_ESTABLISHED_MIN: usize = 4;

/// A gap longer than (median cadence x this factor) counts as slipping
pub const SLIP_FACTOR: f64 = 2.0;

/// Base severity for a slipping routine
pub const SLIP_BASE_SEVERITY: u8 = 35;

/// Severity added per day the gap exceeds the slip threshold
pub const SLIP_SEVERITY_PER_DAY: u8 = 6;

/// Challenge-to-total event ratio above which a week counts as high-challenge
pub const CHALLENGE_RATIO_THRESHOLD: f64 = 0.6;

/// Minimum events in the last 7 days before the challenge ratio is meaningful
pub const CHALLENGE_MIN_EVENTS: usize = 4;

/// Per-category maximum card counts enforced by the safety rails
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CategoryCaps {
    pub risk: usize,
    pub improvement: usize,
    pub neutral: usize,
}

impl Default for CategoryCaps {
    fn default() -> Self {
        Self {
            risk: 1,
            improvement: 2,
            neutral: 1,
        }
    }
}

impl CategoryCaps {
    pub fn cap_for(&self, category: CardCategory) -> usize {
        match category {
            CardCategory::Risk => self.risk,
            CardCategory::Improvement => self.improvement,
            CardCategory::Neutral => self.neutral,
        }
    }
}

/// Cooldown windows, per signal type where they differ from the default
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CooldownConfig {
    pub default_days: i64,
    pub goal_stalled_days: i64,
    pub retention_days: i64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            default_days: DEFAULT_COOLDOWN_DAYS,
            goal_stalled_days: GOAL_STALLED_COOLDOWN_DAYS,
            retention_days: COOLDOWN_RETENTION_DAYS,
        }
    }
}

impl CooldownConfig {
    /// Cooldown window in days for one signal type
    pub fn days_for(&self, signal_type: SignalType) -> i64 {
        match signal_type {
            SignalType::GoalStalled => self.goal_stalled_days,
            _ => self.default_days,
        }
    }
}

/// Detector thresholds and tolerances
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub at_risk_tolerance: f64,
    pub at_risk_min_severity: u8,
    pub stall_point_epsilon: i32,
    pub routine_min_occurrences: usize,
    pub routine_max_gap_days: i64,
    pub slip_established_min: usize,
    pub slip_factor: f64,
    pub challenge_ratio_threshold: f64,
    pub challenge_min_events: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            at_risk_tolerance: AT_RISK_TOLERANCE,
            at_risk_min_severity: AT_RISK_MIN_SEVERITY,
            stall_point_epsilon: STALL_POINT_EPSILON,
            routine_min_occurrences: ROUTINE_MIN_OCCURRENCES,
            routine_max_gap_days: ROUTINE_MAX_GAP_DAYS,
            slip_established_min: SLIP_ESTABLISHED_MIN,
            slip_factor: SLIP_FACTOR,
            challenge_ratio_threshold: CHALLENGE_RATIO_THRESHOLD,
            challenge_min_events: CHALLENGE_MIN_EVENTS,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub min_events_14d: usize,
    pub max_cards: usize,
    pub caps: CategoryCaps,
    pub cooldown: CooldownConfig,
    pub detectors: DetectorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_events_14d: DEFAULT_MIN_EVENTS_14D,
            max_cards: DEFAULT_MAX_CARDS,
            caps: CategoryCaps::default(),
            cooldown: CooldownConfig::default(),
            detectors: DetectorConfig::default(),
        }
    }
}
