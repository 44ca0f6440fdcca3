//! Error types for the coaching-insight engine

use thiserror::Error;

/// Errors surfaced to callers of `generate_cards`.
///
/// Everything else (stale evidence, a corrupt cooldown blob, a faulting
/// detector) degrades to "fewer or no cards" inside the pipeline and is
/// logged rather than returned.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The data provider could not supply the canonical dataset.
    #[error("data provider unavailable: {0}")]
    DataUnavailable(String),

    /// The call was cancelled cooperatively before completion.
    /// No cooldown writes have been performed.
    #[error("card generation cancelled")]
    Cancelled,
}
