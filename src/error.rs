//! Engine error taxonomy.
//!
//! Two layers: `LoadError` covers everything that can go wrong while reading
//! and parsing one knowledge source; `EngineError` is what callers of the
//! ranking facade see. A load failure surfaces as `DataUnavailable` tagged
//! with the source id, so one broken source never masquerades as a total
//! failure.

use std::time::Duration;

/// Errors from fetching or parsing a single knowledge source.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Knowledge file not found: {0}")]
    NotFound(String),

    #[error("I/O error reading knowledge source: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed knowledge file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors surfaced by the ranking engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// One knowledge source is missing, unreachable, or unparsable.
    /// Recovered per-source when possible (stale cache copy, degraded
    /// ranking); fatal only when nothing else is available.
    #[error("Knowledge source '{source_id}' unavailable: {cause}")]
    DataUnavailable {
        source_id: String,
        #[source]
        cause: LoadError,
    },

    /// Every configured knowledge source failed. Distinguishes "no data"
    /// from "no match" (an empty suggestion list).
    #[error("No knowledge source could be loaded")]
    NoKnowledgeAvailable,

    /// The caller-supplied deadline elapsed before any source completed.
    #[error("Ranking timed out after {0:?} with no completed source")]
    Timeout(Duration),

    /// Symptom text empty or too short to score. Rejected before any
    /// loader or scorer runs.
    #[error("Invalid symptom input: {0}")]
    InvalidInput(String),
}
