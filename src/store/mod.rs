//! Knowledge store loader.
//!
//! Fetches one source's JSON knowledge base from disk or network and parses
//! it into an immutable `KnowledgeBase`. No caching here; the cache layer
//! decides when to call this and what to do on failure.

pub mod schema;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::LoadError;
use crate::models::{KnowledgeBase, SourceKind};
use schema::{build_knowledge_base, RawKnowledgeFile};

// ─── Source configuration ────────────────────────────────────────────────────

/// Where a knowledge source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    File(PathBuf),
    Http(String),
}

/// One configured knowledge source.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Stable identifier, also used as the source label on candidates
    /// (e.g. "rubric-kent", "dictionary-boericke").
    pub id: String,
    pub kind: SourceKind,
    pub location: SourceLocation,
}

impl SourceConfig {
    pub fn file(id: &str, kind: SourceKind, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.to_string(),
            kind,
            location: SourceLocation::File(path.into()),
        }
    }

    pub fn http(id: &str, kind: SourceKind, url: &str) -> Self {
        Self {
            id: id.to_string(),
            kind,
            location: SourceLocation::Http(url.to_string()),
        }
    }
}

// ─── Loader ──────────────────────────────────────────────────────────────────

/// Pluggable loader seam. The cache layer, and every test that needs to
/// count or fail loads, talks to this trait instead of the filesystem.
#[async_trait]
pub trait KnowledgeLoader: Send + Sync {
    async fn load(&self, source: &SourceConfig) -> Result<KnowledgeBase, LoadError>;
}

/// Production loader: `tokio::fs` for file sources, `reqwest` for network
/// sources. A file that parses but lacks the kind-relevant section loads as
/// an empty knowledge base; an absent or unparsable file fails loudly so
/// the cache layer can decide between stale data and propagation.
pub struct StoreLoader {
    http: reqwest::Client,
}

impl StoreLoader {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for StoreLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeLoader for StoreLoader {
    async fn load(&self, source: &SourceConfig) -> Result<KnowledgeBase, LoadError> {
        let raw: RawKnowledgeFile = match &source.location {
            SourceLocation::File(path) => {
                let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        LoadError::NotFound(path.display().to_string())
                    } else {
                        LoadError::Io(e)
                    }
                })?;
                serde_json::from_str(&text)?
            }
            SourceLocation::Http(url) => {
                self.http
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?
            }
        };

        let kb = build_knowledge_base(&source.id, source.kind, raw);
        tracing::debug!(
            source = %source.id,
            rubric_categories = kb.rubrics.len(),
            remedies = kb.remedies.len(),
            "Loaded knowledge base"
        );
        Ok(kb)
    }
}
