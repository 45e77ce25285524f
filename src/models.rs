//! Core data model for knowledge sources and ranking candidates.
//!
//! Everything here is immutable once constructed: knowledge bases are built
//! by the store loader, owned by the cache, and shared read-only behind
//! `Arc` across concurrent scorer tasks. Candidate types are transient,
//! created fresh per ranking request.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Source identity ─────────────────────────────────────────────────────────

/// What shape of knowledge a source holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Hierarchical graded rubric index (repertory).
    Rubric,
    /// Flat remedy dictionary: keynotes, mental symptoms, modalities.
    Dictionary,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Rubric => "rubric",
            SourceKind::Dictionary => "dictionary",
        }
    }
}

/// Author/version information carried by a knowledge-base file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMeta {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

// ─── Rubric tree ─────────────────────────────────────────────────────────────

/// Display name of a rubric in the primary language, with an optional
/// secondary-language form when the source carries one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualLabel {
    pub primary: String,
    #[serde(default)]
    pub secondary: Option<String>,
}

impl BilingualLabel {
    /// Parse a raw rubric key. A `|` separates primary from secondary form
    /// ("Fever|Fièvre"); plain keys have no secondary form.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('|') {
            Some((primary, secondary)) => {
                let secondary = secondary.trim();
                Self {
                    primary: primary.trim().to_string(),
                    secondary: (!secondary.is_empty()).then(|| secondary.to_string()),
                }
            }
            None => Self {
                primary: raw.trim().to_string(),
                secondary: None,
            },
        }
    }

    /// Lowercased text used for keyword matching: both language forms.
    pub fn match_text(&self) -> String {
        match &self.secondary {
            Some(secondary) => format!("{} {}", self.primary, secondary).to_lowercase(),
            None => self.primary.to_lowercase(),
        }
    }
}

/// One node of the rubric hierarchy.
///
/// Remedies are unique by name (duplicates collapse to the highest grade at
/// load time); grades are 1..=3 by construction, since they come from the
/// grade3/grade2/grade1 sections of the source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricNode {
    pub id: String,
    pub label: BilingualLabel,
    #[serde(default)]
    pub children: Vec<RubricNode>,
    /// (remedy name, grade) pairs listed on this node.
    #[serde(default)]
    pub remedies: Vec<(String, u8)>,
}

// ─── Remedy dictionary ───────────────────────────────────────────────────────

/// Aggravation/amelioration conditions for a remedy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Modalities {
    #[serde(default)]
    pub worse: Vec<String>,
    #[serde(default)]
    pub better: Vec<String>,
}

/// One remedy's dictionary entry. Text lists may be empty, never absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemedyEntry {
    #[serde(default)]
    pub keynotes: Vec<String>,
    #[serde(default)]
    pub mental: Vec<String>,
    #[serde(default)]
    pub modalities: Modalities,
    #[serde(default)]
    pub clinical: Option<String>,
}

// ─── Knowledge base ──────────────────────────────────────────────────────────

/// One loaded knowledge source, tagged with its label.
///
/// A rubric source fills `rubrics` (and may carry a `remedies` map for
/// keynote lookups); a dictionary source fills `remedies` only. `BTreeMap`
/// keeps iteration order deterministic, which keeps scoring output
/// deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub label: String,
    pub kind: SourceKind,
    pub meta: SourceMeta,
    #[serde(default)]
    pub rubrics: Vec<RubricNode>,
    #[serde(default)]
    pub remedies: BTreeMap<String, RemedyEntry>,
    /// When the loader produced this snapshot (diagnostics only; cache
    /// freshness uses its own monotonic clock).
    pub loaded_at: DateTime<Utc>,
}

impl KnowledgeBase {
    /// An empty knowledge base for a source whose file parsed but carried
    /// no usable sections.
    pub fn empty(label: &str, kind: SourceKind) -> Self {
        Self {
            label: label.to_string(),
            kind,
            meta: SourceMeta::default(),
            rubrics: Vec::new(),
            remedies: BTreeMap::new(),
            loaded_at: Utc::now(),
        }
    }
}

// ─── Ranking candidates ──────────────────────────────────────────────────────

/// A scored remedy candidate produced by one scorer for one source.
/// Transient: created fresh per ranking request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub remedy: String,
    pub score: u32,
    /// Label of the source that produced this candidate.
    pub source: String,
    /// Matched text fragments backing the score.
    #[serde(default)]
    pub fragments: Vec<String>,
}

/// Case acuity hint, affecting potency choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Acuity {
    #[default]
    Acute,
    Chronic,
}

/// Final ranked suggestion returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemedySuggestion {
    pub name: String,
    /// Bounded confidence score, 1..=100.
    pub score: u32,
    /// Comma-joined labels of every source that contributed.
    pub source: String,
    pub justification: String,
    pub potency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keynote: Option<String>,
}
