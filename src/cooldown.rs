//! Cooldown management
//!
//! Per (child, signal type), a surfaced card moves the pair through
//! Eligible -> Shown -> Cooling -> Eligible. The persisted store is the only
//! state that survives across calls; a per-child decoded cache sits in front
//! of it so reads never re-decode, and the cache is updated synchronously on
//! every write so in-process reads are never stale.
//!
//! Failure semantics: a corrupt or unreadable blob fails open. Every signal
//! is treated as eligible, a warning is logged, and the engine call still
//! returns a best-effort result.

use crate::config::CooldownConfig;
use crate::types::{CooldownRecord, Signal, SignalType};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Errors a cooldown store implementation can report
#[derive(Debug, Error)]
pub enum CooldownStoreError {
    #[error("corrupt cooldown state: {0}")]
    Corrupt(String),

    #[error("cooldown storage unavailable: {0}")]
    Unavailable(String),
}

/// Narrow persistence interface for cooldown state.
///
/// The engine treats the stored records as a small child-scoped blob; the
/// medium (file, database, preferences) is the store's concern.
pub trait CooldownStore: Send + Sync {
    fn load(&self, child_id: Uuid) -> Result<Vec<CooldownRecord>, CooldownStoreError>;
    fn save(&self, child_id: Uuid, records: &[CooldownRecord]) -> Result<(), CooldownStoreError>;
}

impl<'a, T: CooldownStore + ?Sized> CooldownStore for &'a T {
    fn load(&self, child_id: Uuid) -> Result<Vec<CooldownRecord>, CooldownStoreError> {
        (**self).load(child_id)
    }

    fn save(&self, child_id: Uuid, records: &[CooldownRecord]) -> Result<(), CooldownStoreError> {
        (**self).save(child_id, records)
    }
}

impl<T: CooldownStore + ?Sized> CooldownStore for std::sync::Arc<T> {
    fn load(&self, child_id: Uuid) -> Result<Vec<CooldownRecord>, CooldownStoreError> {
        (**self).load(child_id)
    }

    fn save(&self, child_id: Uuid, records: &[CooldownRecord]) -> Result<(), CooldownStoreError> {
        (**self).save(child_id, records)
    }
}

/// In-memory store keeping JSON blobs, mirroring how an on-device key-value
/// store would hold them. Primarily a test double.
#[derive(Debug, Default)]
pub struct MemoryCooldownStore {
    blobs: Mutex<HashMap<Uuid, String>>,
}

impl MemoryCooldownStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw blob, valid or not. Lets tests exercise the corrupt-state
    /// path.
    pub fn insert_raw(&self, child_id: Uuid, blob: impl Into<String>) {
        self.blobs.lock().unwrap().insert(child_id, blob.into());
    }
}

impl CooldownStore for MemoryCooldownStore {
    fn load(&self, child_id: Uuid) -> Result<Vec<CooldownRecord>, CooldownStoreError> {
        let blobs = self.blobs.lock().unwrap();
        match blobs.get(&child_id) {
            Some(blob) => serde_json::from_str(blob)
                .map_err(|e| CooldownStoreError::Corrupt(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, child_id: Uuid, records: &[CooldownRecord]) -> Result<(), CooldownStoreError> {
        let blob = serde_json::to_string(records)
            .map_err(|e| CooldownStoreError::Unavailable(e.to_string()))?;
        self.blobs.lock().unwrap().insert(child_id, blob);
        Ok(())
    }
}

/// Stateful gate suppressing recently shown signal types per child
pub struct CooldownManager<S: CooldownStore> {
    store: S,
    config: CooldownConfig,
    /// Decoded records per child. The mutex is the single-writer critical
    /// section guarding read-modify-write of cache and backing store.
    cache: Mutex<HashMap<Uuid, Vec<CooldownRecord>>>,
}

impl<S: CooldownStore> CooldownManager<S> {
    pub fn new(store: S, config: CooldownConfig) -> Self {
        Self {
            store,
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Records for one child, from cache or a one-time store load.
    /// Must be called with the cache lock held.
    fn records_for<'a>(
        &self,
        cache: &'a mut HashMap<Uuid, Vec<CooldownRecord>>,
        child_id: Uuid,
    ) -> &'a mut Vec<CooldownRecord> {
        cache.entry(child_id).or_insert_with(|| {
            match self.store.load(child_id) {
                Ok(records) => records,
                Err(e) => {
                    // Fail open: treat every signal as eligible
                    warn!(child_id = %child_id, error = %e, "cooldown state unreadable; failing open");
                    Vec::new()
                }
            }
        })
    }

    /// Whether a signal type is still cooling for this child
    pub fn is_on_cooldown(
        &self,
        child_id: Uuid,
        signal_type: SignalType,
        now: DateTime<Utc>,
    ) -> bool {
        let mut cache = self.cache.lock().unwrap();
        let records = self.records_for(&mut cache, child_id);
        records
            .iter()
            .filter(|r| r.signal_type == signal_type)
            .any(|r| now - r.last_shown_at < Duration::days(self.config.days_for(signal_type)))
    }

    /// Drop any signal currently on cooldown.
    ///
    /// One lock acquisition for the whole set, so the call observes a single
    /// consistent snapshot of cooldown state.
    pub fn filter_eligible(&self, signals: Vec<Signal>, now: DateTime<Utc>) -> Vec<Signal> {
        let mut cache = self.cache.lock().unwrap();
        signals
            .into_iter()
            .filter(|signal| {
                let records = self.records_for(&mut cache, signal.child_id);
                !records.iter().any(|r| {
                    r.signal_type == signal.signal_type
                        && now - r.last_shown_at
                            < Duration::days(self.config.days_for(signal.signal_type))
                })
            })
            .collect()
    }

    /// Upsert last-shown timestamps for the signal types just surfaced.
    ///
    /// Cache and store are updated inside one critical section; a store
    /// write failure is logged and the in-process cache stays authoritative.
    pub fn record_shown(&self, child_id: Uuid, shown: &[SignalType], now: DateTime<Utc>) {
        if shown.is_empty() {
            return;
        }
        let mut cache = self.cache.lock().unwrap();
        let records = self.records_for(&mut cache, child_id);
        for &signal_type in shown {
            match records.iter_mut().find(|r| r.signal_type == signal_type) {
                Some(record) => record.last_shown_at = now,
                None => records.push(CooldownRecord {
                    child_id,
                    signal_type,
                    last_shown_at: now,
                }),
            }
        }
        if let Err(e) = self.store.save(child_id, records) {
            warn!(child_id = %child_id, error = %e, "failed to persist cooldown state");
        }
    }

    /// Housekeeping: drop records idle beyond the retention window.
    /// Not safety-critical; stale records only waste space.
    pub fn prune_stale(&self, child_id: Uuid, now: DateTime<Utc>) {
        let retention = Duration::days(self.config.retention_days);
        let mut cache = self.cache.lock().unwrap();
        let records = self.records_for(&mut cache, child_id);
        let before = records.len();
        records.retain(|r| now - r.last_shown_at <= retention);
        if records.len() != before {
            if let Err(e) = self.store.save(child_id, records) {
                warn!(child_id = %child_id, error = %e, "failed to persist pruned cooldown state");
            }
        }
    }
}
