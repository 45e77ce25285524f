pub mod aggregate; // Cross-source candidate merge/dedup
pub mod cache; // TTL + bounded knowledge cache with single-flight loads
pub mod config;
pub mod engine; // Ranking facade
pub mod error;
pub mod matcher; // Pluggable keyword matching strategy
pub mod models;
pub mod normalize; // Bilingual symptom normalization
pub mod potency; // Score + acuity → potency label
pub mod scoring; // Rubric and dictionary scorers
pub mod store; // Knowledge store loader

pub use cache::KnowledgeCache;
pub use engine::{RankingRequest, RemedyRanker};
pub use error::{EngineError, LoadError};
pub use matcher::{KeywordMatcher, SubstringMatcher};
pub use models::{Acuity, CandidateScore, KnowledgeBase, RemedySuggestion, SourceKind};
pub use store::{SourceConfig, SourceLocation, StoreLoader};

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries and integration harnesses embedding the
/// engine. Library code only emits events; the host decides the subscriber.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Similia engine v{}", config::APP_VERSION);
}
