//! Event window builder
//!
//! Slices the raw event list into the trailing windows and partitions the
//! detectors consume: last 7/14/30 days, by polarity, by category. Every
//! slice is chronologically sorted before any detector sees it, so no
//! detector ever re-scans or re-orders the full list. `now` is always an
//! explicit parameter; nothing here reads the wall clock.

use crate::config::{EngineConfig, FETCH_WINDOW_DAYS};
use crate::types::{BehaviorEvent, Goal, Polarity};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One trailing window of events with precomputed partitions
#[derive(Debug, Clone, Default)]
pub struct WindowSlice {
    /// All events in the window, chronological
    pub events: Vec<BehaviorEvent>,
    /// Positive-polarity events, chronological
    pub positive: Vec<BehaviorEvent>,
    /// Challenge-polarity events, chronological
    pub challenge: Vec<BehaviorEvent>,
    /// Events grouped by category, chronological within each category.
    /// BTreeMap so iteration order is stable across runs.
    pub by_category: BTreeMap<Uuid, Vec<BehaviorEvent>>,
}

impl WindowSlice {
    fn from_events(events: Vec<BehaviorEvent>) -> Self {
        let mut positive = Vec::new();
        let mut challenge = Vec::new();
        let mut by_category: BTreeMap<Uuid, Vec<BehaviorEvent>> = BTreeMap::new();

        for event in &events {
            match event.polarity {
                Polarity::Positive => positive.push(event.clone()),
                Polarity::Challenge => challenge.push(event.clone()),
            }
            by_category
                .entry(event.category_id)
                .or_default()
                .push(event.clone());
        }

        Self {
            events,
            positive,
            challenge,
            by_category,
        }
    }

    /// Sum of points over positive events in this window
    pub fn positive_points(&self) -> i32 {
        self.positive.iter().map(|e| e.points).sum()
    }
}

/// Pre-sliced, pre-sorted view of one child's recent history.
///
/// Built once per `generate_cards` call and shared read-only by every
/// detector.
#[derive(Debug, Clone)]
pub struct WindowedView {
    pub now: DateTime<Utc>,
    /// Events in (now - 7d, now]
    pub last_7: WindowSlice,
    /// Events in (now - 14d, now]
    pub last_14: WindowSlice,
    /// Events in (now - 30d, now]
    pub last_30: WindowSlice,
    /// Events in (now - 37d, now - 7d]: the "established routine" window
    /// the slip detector compares against
    pub prior_30: WindowSlice,
    /// Every fetched event, chronological (spans the full fetch window)
    pub all_events: Vec<BehaviorEvent>,
    /// Active goals, sorted by id for stable iteration
    pub goals: Vec<Goal>,
    sufficient: bool,
}

impl WindowedView {
    /// Build the windowed view for one child.
    ///
    /// Events outside (now - fetch window, now] are dropped even if the
    /// provider returned them.
    pub fn build(
        mut events: Vec<BehaviorEvent>,
        mut goals: Vec<Goal>,
        now: DateTime<Utc>,
        config: &EngineConfig,
    ) -> Self {
        events.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then(a.id.cmp(&b.id)));
        events.retain(|e| {
            e.occurred_at > now - Duration::days(FETCH_WINDOW_DAYS) && e.occurred_at <= now
        });
        goals.sort_by(|a, b| a.id.cmp(&b.id));

        let in_range = |e: &BehaviorEvent, from_days: i64, to_days: i64| {
            e.occurred_at > now - Duration::days(from_days)
                && e.occurred_at <= now - Duration::days(to_days)
        };

        let last_7: Vec<BehaviorEvent> =
            events.iter().filter(|e| in_range(e, 7, 0)).cloned().collect();
        let last_14: Vec<BehaviorEvent> =
            events.iter().filter(|e| in_range(e, 14, 0)).cloned().collect();
        let last_30: Vec<BehaviorEvent> =
            events.iter().filter(|e| in_range(e, 30, 0)).cloned().collect();
        let prior_30: Vec<BehaviorEvent> = events
            .iter()
            .filter(|e| in_range(e, FETCH_WINDOW_DAYS, 7))
            .cloned()
            .collect();

        let sufficient = last_14.len() >= config.min_events_14d;

        Self {
            now,
            last_7: WindowSlice::from_events(last_7),
            last_14: WindowSlice::from_events(last_14),
            last_30: WindowSlice::from_events(last_30),
            prior_30: WindowSlice::from_events(prior_30),
            all_events: events,
            goals,
            sufficient,
        }
    }

    /// False when the trailing 14 days hold fewer events than the configured
    /// minimum. A normal outcome, not an error: the orchestrator short-circuits
    /// to an empty card list without running any detector.
    pub fn has_sufficient_data(&self) -> bool {
        self.sufficient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{event, event_in_category};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_windows_are_chronological_and_partitioned() {
        let child = Uuid::new_v4();
        let events = vec![
            event(child, Polarity::Positive, 2, now() - Duration::days(1)),
            event(child, Polarity::Challenge, 1, now() - Duration::days(6)),
            event(child, Polarity::Positive, 3, now() - Duration::days(3)),
        ];

        let view = WindowedView::build(events, vec![], now(), &EngineConfig::default());

        assert_eq!(view.last_7.events.len(), 3);
        assert_eq!(view.last_7.positive.len(), 2);
        assert_eq!(view.last_7.challenge.len(), 1);

        let times: Vec<_> = view.last_7.events.iter().map(|e| e.occurred_at).collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
    }

    #[test]
    fn test_window_boundaries() {
        let child = Uuid::new_v4();
        let events = vec![
            event(child, Polarity::Positive, 1, now() - Duration::days(5)),
            event(child, Polarity::Positive, 1, now() - Duration::days(10)),
            event(child, Polarity::Positive, 1, now() - Duration::days(20)),
            event(child, Polarity::Positive, 1, now() - Duration::days(35)),
        ];

        let view = WindowedView::build(events, vec![], now(), &EngineConfig::default());

        assert_eq!(view.last_7.events.len(), 1);
        assert_eq!(view.last_14.events.len(), 2);
        assert_eq!(view.last_30.events.len(), 3);
        // prior window: (now-37d, now-7d]
        assert_eq!(view.prior_30.events.len(), 3);
        assert_eq!(view.all_events.len(), 4);
    }

    #[test]
    fn test_insufficient_data_flag_boundary() {
        let child = Uuid::new_v4();
        let two = vec![
            event(child, Polarity::Positive, 1, now() - Duration::days(1)),
            event(child, Polarity::Positive, 1, now() - Duration::days(2)),
        ];
        let view = WindowedView::build(two, vec![], now(), &EngineConfig::default());
        assert!(!view.has_sufficient_data());

        let three = vec![
            event(child, Polarity::Positive, 1, now() - Duration::days(1)),
            event(child, Polarity::Positive, 1, now() - Duration::days(2)),
            event(child, Polarity::Positive, 1, now() - Duration::days(3)),
        ];
        let view = WindowedView::build(three, vec![], now(), &EngineConfig::default());
        assert!(view.has_sufficient_data());
    }

    #[test]
    fn test_events_outside_14_days_do_not_count_toward_minimum() {
        let child = Uuid::new_v4();
        let events = vec![
            event(child, Polarity::Positive, 1, now() - Duration::days(1)),
            event(child, Polarity::Positive, 1, now() - Duration::days(20)),
            event(child, Polarity::Positive, 1, now() - Duration::days(25)),
        ];
        let view = WindowedView::build(events, vec![], now(), &EngineConfig::default());
        assert!(!view.has_sufficient_data());
    }

    #[test]
    fn test_category_partition_is_stable_and_sorted() {
        let child = Uuid::new_v4();
        let cat_a = Uuid::new_v4();
        let cat_b = Uuid::new_v4();
        let events = vec![
            event_in_category(child, cat_b, Polarity::Positive, 1, now() - Duration::days(1)),
            event_in_category(child, cat_a, Polarity::Positive, 1, now() - Duration::days(2)),
            event_in_category(child, cat_a, Polarity::Positive, 1, now() - Duration::days(4)),
        ];

        let view = WindowedView::build(events, vec![], now(), &EngineConfig::default());
        assert_eq!(view.last_7.by_category.len(), 2);
        assert_eq!(view.last_7.by_category[&cat_a].len(), 2);
        let a_events = &view.last_7.by_category[&cat_a];
        assert!(a_events[0].occurred_at < a_events[1].occurred_at);
    }

    #[test]
    fn test_goals_sorted_by_id() {
        let child = Uuid::new_v4();
        let mut goals: Vec<Goal> = (0..4)
            .map(|i| Goal {
                id: Uuid::new_v4(),
                child_id: child,
                target_points: 10,
                current_points: i,
                deadline: None,
                created_at: now() - Duration::days(10),
            })
            .collect();
        goals.reverse();

        let events = vec![
            event(child, Polarity::Positive, 1, now() - Duration::days(1)),
            event(child, Polarity::Positive, 1, now() - Duration::days(2)),
            event(child, Polarity::Positive, 1, now() - Duration::days(3)),
        ];
        let view = WindowedView::build(events, goals, now(), &EngineConfig::default());

        let ids: Vec<_> = view.goals.iter().map(|g| g.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
