//! Cross-source candidate aggregation.
//!
//! Merges the per-source candidate sets into one deduplicated list. A
//! remedy named by several sources keeps the maximum of its per-source
//! scores (summing would double-count overlapping evidence), the union of
//! source labels, and every source's justification.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::CandidateScore;
use crate::scoring::SCORE_CAP;

/// How many fragments back one source's justification clause.
const MAX_JUSTIFICATION_FRAGMENTS: usize = 3;

/// Separator between per-source justification clauses.
const JUSTIFICATION_DELIMITER: &str = " | ";

/// One remedy after cross-source merging, before potency/keynote
/// attachment.
#[derive(Debug, Clone)]
pub struct MergedCandidate {
    pub remedy: String,
    /// Maximum per-source score, clamped to [0, 100].
    pub score: u32,
    /// Contributing source labels, first-appearance order, deduplicated.
    pub sources: Vec<String>,
    pub justification: String,
}

impl MergedCandidate {
    /// Comma-joined source labels for the output record.
    pub fn source_label(&self) -> String {
        self.sources.join(", ")
    }
}

/// Render one source's fragments as a justification clause: up to 3
/// fragments, ellipsis when more matched.
pub fn build_justification(fragments: &[String]) -> String {
    if fragments.is_empty() {
        return String::new();
    }
    let mut clause = fragments
        .iter()
        .take(MAX_JUSTIFICATION_FRAGMENTS)
        .cloned()
        .collect::<Vec<_>>()
        .join("; ");
    if fragments.len() > MAX_JUSTIFICATION_FRAGMENTS {
        clause.push('…');
    }
    clause
}

/// Merge every scorer's candidates into one deduplicated, ranked list.
///
/// Input order matters for label/justification assembly: callers present
/// candidates in configured-source order (never completion order), which
/// keeps the merged output deterministic. Zero-score candidates are
/// dropped. Sort: score descending, ties by remedy name ascending.
pub fn merge_candidates(candidates: Vec<CandidateScore>) -> Vec<MergedCandidate> {
    let mut order: Vec<String> = Vec::new();
    let mut by_name: HashMap<String, MergedCandidate> = HashMap::new();

    for candidate in candidates {
        let score = candidate.score.min(SCORE_CAP);
        if score == 0 {
            continue;
        }
        let clause = build_justification(&candidate.fragments);

        match by_name.get_mut(&candidate.remedy) {
            Some(merged) => {
                merged.score = merged.score.max(score);
                if !merged.sources.contains(&candidate.source) {
                    merged.sources.push(candidate.source);
                }
                if !clause.is_empty() {
                    if !merged.justification.is_empty() {
                        merged.justification.push_str(JUSTIFICATION_DELIMITER);
                    }
                    merged.justification.push_str(&clause);
                }
            }
            None => {
                order.push(candidate.remedy.clone());
                by_name.insert(
                    candidate.remedy.clone(),
                    MergedCandidate {
                        remedy: candidate.remedy,
                        score,
                        sources: vec![candidate.source],
                        justification: clause,
                    },
                );
            }
        }
    }

    let mut merged: Vec<MergedCandidate> = order
        .into_iter()
        .filter_map(|name| by_name.remove(&name))
        .collect();

    merged.sort_by(|a, b| match b.score.cmp(&a.score) {
        Ordering::Equal => a.remedy.cmp(&b.remedy),
        other => other,
    });

    merged
}
