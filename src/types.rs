//! Core types for the coaching-insight pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: behavior events and goals (read-only inputs), ephemeral signals
//! with their evidence, cooldown records (the only persisted state), and the
//! coach cards returned to the caller.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Polarity of a logged behavior event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Challenge,
}

/// A logged behavior event. Owned by the data provider; the engine only reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorEvent {
    pub id: Uuid,
    pub child_id: Uuid,
    pub category_id: Uuid,
    pub polarity: Polarity,
    pub points: i32,
    pub occurred_at: DateTime<Utc>,
}

/// A point goal for one child. Read-only snapshot supplied per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub child_id: Uuid,
    pub target_points: i32,
    pub current_points: i32,
    /// Optional deadline; goals without one can stall but never be "at risk"
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// A goal is active while its target has not been reached
    pub fn is_active(&self) -> bool {
        self.current_points < self.target_points
    }
}

/// Behavioral pattern a detector can recognize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    GoalAtRisk,
    GoalStalled,
    RoutineForming,
    RoutineSlipping,
    HighChallengeWeek,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::GoalAtRisk => "goal_at_risk",
            SignalType::GoalStalled => "goal_stalled",
            SignalType::RoutineForming => "routine_forming",
            SignalType::RoutineSlipping => "routine_slipping",
            SignalType::HighChallengeWeek => "high_challenge_week",
        }
    }

    /// Emotional tone bucket used by the safety rails
    pub fn category(&self) -> CardCategory {
        match self {
            SignalType::GoalAtRisk => CardCategory::Risk,
            SignalType::GoalStalled => CardCategory::Risk,
            SignalType::RoutineForming => CardCategory::Improvement,
            SignalType::RoutineSlipping => CardCategory::Risk,
            // Informational: surfaces a pattern without assigning blame
            SignalType::HighChallengeWeek => CardCategory::Neutral,
        }
    }

    /// Template key handed to the localization layer; the engine never
    /// formats display text itself
    pub fn localization_key(&self) -> &'static str {
        match self {
            SignalType::GoalAtRisk => "coach.card.goal_at_risk",
            SignalType::GoalStalled => "coach.card.goal_stalled",
            SignalType::RoutineForming => "coach.card.routine_forming",
            SignalType::RoutineSlipping => "coach.card.routine_slipping",
            SignalType::HighChallengeWeek => "coach.card.high_challenge_week",
        }
    }

    /// Whether this signal type is only evaluated for premium subscribers
    pub fn premium_only(&self) -> bool {
        matches!(self, SignalType::RoutineSlipping)
    }
}

/// Emotional tone category of a coach card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardCategory {
    Risk,
    Improvement,
    Neutral,
}

/// Typed pointer into the canonical dataset backing a signal.
///
/// Used only for the validity check; the engine never dereferences these
/// for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EvidenceRef {
    Event(Uuid),
    Goal(Uuid),
}

/// A candidate insight emitted by one detector.
///
/// Created fresh on every `generate_cards` call and discarded at the end;
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Signal {
    pub signal_type: SignalType,
    pub child_id: Uuid,
    /// 0-100, higher = more urgent/notable
    pub severity: u8,
    /// Must be non-empty; every ref must resolve at validation time
    pub evidence: Vec<EvidenceRef>,
    /// Timestamp of the most recent supporting evidence (ranking tie-break)
    pub latest_evidence_at: DateTime<Utc>,
    /// Structured values for template substitution downstream.
    /// BTreeMap keeps serialized output stable across runs.
    pub params: BTreeMap<String, serde_json::Value>,
    pub computed_at: DateTime<Utc>,
}

/// Last-shown bookkeeping for one (child, signal type) pair.
///
/// The only state that survives across calls. Upserted whenever a card of
/// that type is surfaced, never duplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownRecord {
    pub child_id: Uuid,
    pub signal_type: SignalType,
    pub last_shown_at: DateTime<Utc>,
}

/// A surfaced coaching insight, ready for the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct CoachCard {
    /// Deterministic: recomputing identical inputs always yields the same id
    pub id: String,
    pub signal_type: SignalType,
    pub category: CardCategory,
    pub severity: u8,
    pub evidence: Vec<EvidenceRef>,
    pub localization_key: &'static str,
    pub params: BTreeMap<String, serde_json::Value>,
}

/// Compute the deterministic card id for (child, signal type, window end).
///
/// A pure function of its inputs, which makes "already seen today" checks
/// downstream idempotent.
pub fn card_id(child_id: Uuid, signal_type: SignalType, window_end: NaiveDate) -> String {
    format!("{}:{}:{}", child_id, signal_type.as_str(), window_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_card_id_is_deterministic() {
        let child = Uuid::new_v4();
        let day = Utc
            .with_ymd_and_hms(2024, 3, 10, 9, 0, 0)
            .unwrap()
            .date_naive();

        let a = card_id(child, SignalType::GoalAtRisk, day);
        let b = card_id(child, SignalType::GoalAtRisk, day);
        assert_eq!(a, b);
        assert_eq!(a, format!("{}:goal_at_risk:2024-03-10", child));
    }

    #[test]
    fn test_card_id_varies_by_type_and_day() {
        let child = Uuid::new_v4();
        let day = Utc
            .with_ymd_and_hms(2024, 3, 10, 9, 0, 0)
            .unwrap()
            .date_naive();

        let risk = card_id(child, SignalType::GoalAtRisk, day);
        let stall = card_id(child, SignalType::GoalStalled, day);
        assert_ne!(risk, stall);

        let next_day = day.succ_opt().unwrap();
        assert_ne!(risk, card_id(child, SignalType::GoalAtRisk, next_day));
    }

    #[test]
    fn test_signal_type_categories() {
        assert_eq!(SignalType::GoalAtRisk.category(), CardCategory::Risk);
        assert_eq!(SignalType::GoalStalled.category(), CardCategory::Risk);
        assert_eq!(
            SignalType::RoutineForming.category(),
            CardCategory::Improvement
        );
        assert_eq!(SignalType::RoutineSlipping.category(), CardCategory::Risk);
        assert_eq!(
            SignalType::HighChallengeWeek.category(),
            CardCategory::Neutral
        );
    }

    #[test]
    fn test_only_routine_slipping_is_premium() {
        let premium: Vec<SignalType> = [
            SignalType::GoalAtRisk,
            SignalType::GoalStalled,
            SignalType::RoutineForming,
            SignalType::RoutineSlipping,
            SignalType::HighChallengeWeek,
        ]
        .into_iter()
        .filter(|t| t.premium_only())
        .collect();

        assert_eq!(premium, vec![SignalType::RoutineSlipping]);
    }

    #[test]
    fn test_goal_activity() {
        let goal = Goal {
            id: Uuid::new_v4(),
            child_id: Uuid::new_v4(),
            target_points: 50,
            current_points: 20,
            deadline: None,
            created_at: Utc::now(),
        };
        assert!(goal.is_active());

        let done = Goal {
            current_points: 50,
            ..goal
        };
        assert!(!done.is_active());
    }

    #[test]
    fn test_evidence_ref_serialization() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(EvidenceRef::Event(id)).unwrap();
        assert_eq!(json["kind"], "event");
        assert_eq!(json["id"], id.to_string());
    }
}
