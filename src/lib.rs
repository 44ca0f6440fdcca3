//! Coach Insight - deterministic coaching-insight engine
//!
//! Converts a child's logged behavior history into a small, ranked set of
//! actionable coach cards through a deterministic pipeline: window build ->
//! signal detection -> evidence validation -> cooldown filtering -> safety
//! rails -> ranking and truncation.
//!
//! All decisions are closed-form threshold rules over explicit inputs: the
//! engine reads no wall clock, performs no I/O of its own, and for fixed
//! inputs always produces identical output. Collaborators (data provider,
//! cooldown store, localization) are consumed as injected interfaces.

pub mod config;
pub mod cooldown;
pub mod detect;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod rails;
pub mod rank;
pub mod types;
pub mod window;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{CategoryCaps, CooldownConfig, DetectorConfig, EngineConfig};
pub use cooldown::{CooldownManager, CooldownStore, CooldownStoreError, MemoryCooldownStore};
pub use detect::{Detector, SignalRegistry};
pub use engine::{CancelToken, CoachingEngine, DataProvider, ProviderError, TemplateResolver};
pub use error::EngineError;
pub use types::{
    BehaviorEvent, CardCategory, CoachCard, CooldownRecord, EvidenceRef, Goal, Polarity, Signal,
    SignalType,
};
pub use window::WindowedView;

/// Engine version, handy for callers that log it
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
