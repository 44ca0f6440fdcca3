//! Coaching engine orchestration
//!
//! Wires the pipeline stages into the single `generate_cards` entry point:
//! window build -> detect -> validate -> cooldown filter -> safety rails ->
//! rank -> record shown. The engine owns no threads and reads no wall clock;
//! the caller picks the execution context and supplies `now`.

use crate::config::{EngineConfig, FETCH_WINDOW_DAYS};
use crate::cooldown::{CooldownManager, CooldownStore};
use crate::detect::SignalRegistry;
use crate::error::EngineError;
use crate::evidence::{filter_valid, CanonicalDataset};
use crate::rails::apply_caps;
use crate::rank::rank_and_truncate;
use crate::types::{BehaviorEvent, CoachCard, Goal, SignalType};
use crate::window::WindowedView;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Failure reported by a data provider implementation
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

/// Canonical data source for one child's history.
///
/// Must return deduplicated data; the engine performs no deduplication and
/// never mutates what it is given.
pub trait DataProvider: Send + Sync {
    fn fetch_events(
        &self,
        child_id: Uuid,
        since_days: i64,
    ) -> Result<Vec<BehaviorEvent>, ProviderError>;

    fn fetch_goals(&self, child_id: Uuid) -> Result<Vec<Goal>, ProviderError>;
}

/// Localization seam consumed by the presentation layer.
///
/// The engine only selects `localization_key` and `params` on each card;
/// turning those into display text happens entirely behind this trait.
pub trait TemplateResolver {
    fn resolve(
        &self,
        key: &str,
        params: &BTreeMap<String, serde_json::Value>,
        locale: &str,
    ) -> String;
}

/// Cooperative cancellation handle for an in-flight `generate_cards` call.
///
/// Cancellation observed before the record-shown step guarantees no cooldown
/// write happens for a card that was never actually shown.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The deterministic coaching-insight engine.
///
/// All collaborators are injected at construction; for fixed inputs
/// (events, goals, cooldown state, `now`, premium flag) the output is
/// byte-identical across calls.
pub struct CoachingEngine<P: DataProvider, S: CooldownStore> {
    provider: P,
    registry: SignalRegistry,
    cooldowns: CooldownManager<S>,
    config: EngineConfig,
}

impl<P: DataProvider, S: CooldownStore> CoachingEngine<P, S> {
    pub fn new(provider: P, store: S, config: EngineConfig) -> Self {
        let registry = SignalRegistry::standard(&config.detectors);
        let cooldowns = CooldownManager::new(store, config.cooldown);
        Self {
            provider,
            registry,
            cooldowns,
            config,
        }
    }

    /// Generate up to `max_cards` coach cards for one child.
    pub fn generate_cards(
        &self,
        child_id: Uuid,
        now: DateTime<Utc>,
        is_premium: bool,
    ) -> Result<Vec<CoachCard>, EngineError> {
        self.generate_cards_cancellable(child_id, now, is_premium, &CancelToken::new())
    }

    /// `generate_cards` with a cancellation handle. A cancelled call returns
    /// `EngineError::Cancelled` and performs no cooldown writes.
    pub fn generate_cards_cancellable(
        &self,
        child_id: Uuid,
        now: DateTime<Utc>,
        is_premium: bool,
        cancel: &CancelToken,
    ) -> Result<Vec<CoachCard>, EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        // Stage 1: fetch the canonical dataset (the only provider reads)
        let events = self
            .provider
            .fetch_events(child_id, FETCH_WINDOW_DAYS)
            .map_err(|e| EngineError::DataUnavailable(e.to_string()))?;
        let goals = self
            .provider
            .fetch_goals(child_id)
            .map_err(|e| EngineError::DataUnavailable(e.to_string()))?;
        let dataset = CanonicalDataset::new(&events, &goals);

        // Stage 2: slice into windows
        let view = WindowedView::build(events, goals, now, &self.config);
        if !view.has_sufficient_data() {
            // Normal terminal state, not an error: no cards, no side effects
            debug!(child_id = %child_id, "insufficient recent events; returning no cards");
            return Ok(Vec::new());
        }

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        // Stage 3: run every eligible detector
        let signals = self.registry.run_all(&view, is_premium);

        // Stage 4: drop signals whose evidence no longer resolves
        let signals = filter_valid(signals, &dataset);

        // Stage 5: drop signal types still cooling for this child
        let signals = self.cooldowns.filter_eligible(signals, now);

        // Stage 6: per-category composition caps
        let signals = apply_caps(signals, &self.config.caps, &self.registry);

        // Stage 7: deterministic order, truncation, card mapping
        let cards = rank_and_truncate(
            signals,
            self.config.max_cards,
            &self.registry,
            now.date_naive(),
        );

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        // Stage 8: the engine's only write, for surfaced cards only
        let shown: Vec<SignalType> = cards.iter().map(|c| c.signal_type).collect();
        self.cooldowns.record_shown(child_id, &shown, now);

        Ok(cards)
    }

    /// Housekeeping passthrough: drop cooldown records idle beyond the
    /// retention window.
    pub fn prune_cooldowns(&self, child_id: Uuid, now: DateTime<Utc>) {
        self.cooldowns.prune_stale(child_id, now);
    }
}
