//! Keyword scoring over flat remedy dictionaries.

use std::collections::BTreeSet;

use crate::matcher::KeywordMatcher;
use crate::models::{CandidateScore, KnowledgeBase, RemedyEntry};

use super::SCORE_CAP;

/// Score increment per keyword hit in a keynote string.
pub const KEYNOTE_WEIGHT: u32 = 15;
/// Score increment per keyword hit in a mental/emotional symptom string.
/// Mental symptoms weigh more than physical keynotes.
pub const MENTAL_WEIGHT: u32 = 20;
/// Score increment per keyword hit in a modality string (worse or better).
pub const MODALITY_WEIGHT: u32 = 10;

/// Scan every remedy entry's keynotes, mental symptoms, and modalities for
/// keyword hits. Remedies with zero matches are omitted entirely; scores
/// are capped at 100. Matched strings are collected as justification
/// fragments in entry order.
pub fn score_dictionary(
    kb: &KnowledgeBase,
    keywords: &BTreeSet<String>,
    matcher: &dyn KeywordMatcher,
) -> Vec<CandidateScore> {
    let mut candidates = Vec::new();

    for (name, entry) in &kb.remedies {
        if let Some(candidate) = score_entry(&kb.label, name, entry, keywords, matcher) {
            candidates.push(candidate);
        }
    }

    candidates
}

fn score_entry(
    source: &str,
    name: &str,
    entry: &RemedyEntry,
    keywords: &BTreeSet<String>,
    matcher: &dyn KeywordMatcher,
) -> Option<CandidateScore> {
    let mut score: u32 = 0;
    let mut fragments = Vec::new();

    let modality_strings: Vec<&String> = entry
        .modalities
        .worse
        .iter()
        .chain(entry.modalities.better.iter())
        .collect();

    for (strings, weight) in [
        (entry.keynotes.iter().collect::<Vec<_>>(), KEYNOTE_WEIGHT),
        (entry.mental.iter().collect::<Vec<_>>(), MENTAL_WEIGHT),
        (modality_strings, MODALITY_WEIGHT),
    ] {
        for text in strings {
            let lowered = text.to_lowercase();
            let hits = keywords
                .iter()
                .filter(|keyword| matcher.matches(&lowered, keyword))
                .count() as u32;
            if hits > 0 {
                score = score.saturating_add(weight * hits);
                fragments.push(text.clone());
            }
        }
    }

    if score == 0 {
        return None;
    }

    Some(CandidateScore {
        remedy: name.to_string(),
        score: score.min(SCORE_CAP),
        source: source.to_string(),
        fragments,
    })
}
