//! Shared fixtures for unit tests

use crate::config::EngineConfig;
use crate::types::{BehaviorEvent, Goal, Polarity};
use crate::window::WindowedView;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub fn event(
    child_id: Uuid,
    polarity: Polarity,
    points: i32,
    occurred_at: DateTime<Utc>,
) -> BehaviorEvent {
    event_in_category(child_id, Uuid::new_v4(), polarity, points, occurred_at)
}

pub fn event_in_category(
    child_id: Uuid,
    category_id: Uuid,
    polarity: Polarity,
    points: i32,
    occurred_at: DateTime<Utc>,
) -> BehaviorEvent {
    BehaviorEvent {
        id: Uuid::new_v4(),
        child_id,
        category_id,
        polarity,
        points,
        occurred_at,
    }
}

pub fn goal(
    child_id: Uuid,
    target_points: i32,
    current_points: i32,
    deadline: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
) -> Goal {
    Goal {
        id: Uuid::new_v4(),
        child_id,
        target_points,
        current_points,
        deadline,
        created_at,
    }
}

pub fn view_of(
    events: Vec<BehaviorEvent>,
    goals: Vec<Goal>,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> WindowedView {
    WindowedView::build(events, goals, now, config)
}
