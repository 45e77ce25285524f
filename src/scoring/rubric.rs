//! Grade-weighted scoring over the hierarchical rubric index.

use std::collections::{BTreeMap, BTreeSet};

use crate::matcher::KeywordMatcher;
use crate::models::{CandidateScore, KnowledgeBase, RubricNode};

use super::SCORE_CAP;

/// Score increment per rubric grade.
const GRADE_WEIGHTS: [(u8, u32); 3] = [(3, 30), (2, 20), (1, 10)];

/// Walk every rubric node at every level and score remedies by
/// grade-weighted keyword hits.
///
/// A node's match text is its ancestor labels concatenated with its own
/// (category + rubric text, both language forms). Each (keyword, node)
/// pair contributes at most once, but one node matched by several distinct
/// keywords contributes once per keyword: repetition signals stronger
/// evidence. Totals are capped at 100.
pub fn score_rubrics(
    kb: &KnowledgeBase,
    keywords: &BTreeSet<String>,
    matcher: &dyn KeywordMatcher,
) -> Vec<CandidateScore> {
    let mut acc: BTreeMap<String, (u32, Vec<String>)> = BTreeMap::new();

    for category in &kb.rubrics {
        walk(category, "", "", keywords, matcher, &mut acc);
    }

    acc.into_iter()
        .map(|(remedy, (score, fragments))| CandidateScore {
            remedy,
            score: score.min(SCORE_CAP),
            source: kb.label.clone(),
            fragments,
        })
        .collect()
}

fn walk(
    node: &RubricNode,
    ancestor_match: &str,
    ancestor_display: &str,
    keywords: &BTreeSet<String>,
    matcher: &dyn KeywordMatcher,
    acc: &mut BTreeMap<String, (u32, Vec<String>)>,
) {
    let match_text = join_text(ancestor_match, &node.label.match_text());
    let display = join_path(ancestor_display, &node.label.primary);

    let hit_count = keywords
        .iter()
        .filter(|keyword| matcher.matches(&match_text, keyword))
        .count() as u32;

    if hit_count > 0 && !node.remedies.is_empty() {
        for (remedy, grade) in &node.remedies {
            let weight = match GRADE_WEIGHTS.iter().find(|(g, _)| g == grade) {
                Some((_, weight)) => *weight,
                None => {
                    tracing::trace!(node = %node.id, remedy = %remedy, grade, "Skipping remedy with out-of-range grade");
                    continue;
                }
            };
            let entry = acc.entry(remedy.clone()).or_insert((0, Vec::new()));
            entry.0 = entry.0.saturating_add(weight * hit_count);
            if !entry.1.contains(&display) {
                entry.1.push(display.clone());
            }
        }
    }

    for child in &node.children {
        walk(child, &match_text, &display, keywords, matcher, acc);
    }
}

fn join_text(ancestor: &str, own: &str) -> String {
    if ancestor.is_empty() {
        own.to_string()
    } else {
        format!("{ancestor} {own}")
    }
}

fn join_path(ancestor: &str, own: &str) -> String {
    if ancestor.is_empty() {
        own.to_string()
    } else {
        format!("{ancestor} / {own}")
    }
}
