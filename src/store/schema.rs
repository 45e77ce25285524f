//! Raw knowledge-file shapes and conversion into the immutable model.
//!
//! Parsing is two-phase: serde gives the file its overall shape, then each
//! rubric category / remedy entry converts individually. A malformed
//! individual entry is skipped with a log line, so one bad record cannot
//! take down an otherwise usable source. A file whose top level is not a
//! JSON object (or whose sections have the wrong type entirely) fails the
//! parse and surfaces as `DataUnavailable` upstream.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::models::{
    BilingualLabel, KnowledgeBase, Modalities, RemedyEntry, RubricNode, SourceKind, SourceMeta,
};

/// Top-level shape of a knowledge-base file. Both payload sections are
/// optional: a rubric source may also carry a `remedies` map for keynote
/// lookups, and a partial file loads as an empty knowledge base.
#[derive(Debug, Deserialize)]
pub(crate) struct RawKnowledgeFile {
    #[serde(default)]
    pub metadata: SourceMeta,
    #[serde(default)]
    pub remedies: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub rubrics: Option<BTreeMap<String, Value>>,
}

/// One remedy dictionary entry as written in the file.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawRemedy {
    #[serde(default)]
    pub keynotes: Vec<String>,
    #[serde(default)]
    pub mental: Vec<String>,
    #[serde(default)]
    pub modalities: RawModalities,
    #[serde(default)]
    pub clinical: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawModalities {
    #[serde(default)]
    pub worse: Vec<String>,
    #[serde(default)]
    pub better: Vec<String>,
}

/// Graded remedy lists of one rubric section.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawGrades {
    #[serde(default)]
    pub grade3: Vec<String>,
    #[serde(default)]
    pub grade2: Vec<String>,
    #[serde(default)]
    pub grade1: Vec<String>,
}

/// Convert a parsed file into the immutable knowledge base for `kind`.
pub(crate) fn build_knowledge_base(
    label: &str,
    kind: SourceKind,
    raw: RawKnowledgeFile,
) -> KnowledgeBase {
    let mut kb = KnowledgeBase::empty(label, kind);
    kb.meta = raw.metadata;

    // The remedies map is primary for dictionary sources and a keynote
    // lookup companion for rubric sources.
    if let Some(raw_remedies) = raw.remedies {
        kb.remedies = convert_remedies(label, raw_remedies);
    } else if kind == SourceKind::Dictionary {
        tracing::warn!(source = %label, "Dictionary source has no remedies section; loading empty");
    }

    match kind {
        SourceKind::Rubric => match raw.rubrics {
            Some(raw_rubrics) => kb.rubrics = convert_rubrics(label, raw_rubrics),
            None => {
                tracing::warn!(source = %label, "Rubric source has no rubrics section; loading empty");
            }
        },
        SourceKind::Dictionary => {
            if raw.rubrics.is_some() {
                tracing::debug!(source = %label, "Ignoring rubrics section in dictionary source");
            }
        }
    }

    kb
}

fn convert_remedies(label: &str, raw: BTreeMap<String, Value>) -> BTreeMap<String, RemedyEntry> {
    let mut remedies = BTreeMap::new();
    for (name, value) in raw {
        let name = name.trim().to_string();
        if name.is_empty() {
            tracing::warn!(source = %label, "Skipping remedy entry with empty name");
            continue;
        }
        match serde_json::from_value::<RawRemedy>(value) {
            Ok(entry) => {
                remedies.insert(
                    name,
                    RemedyEntry {
                        keynotes: entry.keynotes,
                        mental: entry.mental,
                        modalities: Modalities {
                            worse: entry.modalities.worse,
                            better: entry.modalities.better,
                        },
                        clinical: entry.clinical,
                    },
                );
            }
            Err(e) => {
                tracing::warn!(source = %label, remedy = %name, error = %e, "Skipping malformed remedy entry");
            }
        }
    }
    remedies
}

/// Build the two-level rubric tree: one parent node per category, one child
/// per rubric text. Category keys (and rubric keys) may embed a secondary
/// language form after `|`.
fn convert_rubrics(label: &str, raw: BTreeMap<String, Value>) -> Vec<RubricNode> {
    let mut categories = Vec::new();
    for (category_key, value) in raw {
        let entries: BTreeMap<String, Value> = match serde_json::from_value(value) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(source = %label, category = %category_key, error = %e, "Skipping malformed rubric category");
                continue;
            }
        };

        let category_label = BilingualLabel::parse(&category_key);
        let category_id = slug(&category_label.primary);
        let mut children = Vec::new();

        for (rubric_key, sections) in entries {
            let rubric_label = BilingualLabel::parse(&rubric_key);
            let node_id = format!("{}/{}", category_id, slug(&rubric_label.primary));
            match convert_rubric_node(label, node_id, rubric_label, sections) {
                Some(node) => children.push(node),
                None => continue,
            }
        }

        categories.push(RubricNode {
            id: category_id,
            label: category_label,
            children,
            remedies: Vec::new(),
        });
    }
    categories
}

fn convert_rubric_node(
    label: &str,
    id: String,
    rubric_label: BilingualLabel,
    sections: Value,
) -> Option<RubricNode> {
    let sections: BTreeMap<String, RawGrades> = match serde_json::from_value(sections) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!(source = %label, node = %id, error = %e, "Skipping malformed rubric node");
            return None;
        }
    };

    // Merge every section ("general" plus any sub-sections), collapsing
    // duplicate remedy names to their highest grade.
    let mut by_name: BTreeMap<String, u8> = BTreeMap::new();
    for grades in sections.into_values() {
        for (names, grade) in [(grades.grade3, 3u8), (grades.grade2, 2), (grades.grade1, 1)] {
            for name in names {
                let name = name.trim().to_string();
                if name.is_empty() {
                    continue;
                }
                let entry = by_name.entry(name).or_insert(grade);
                if *entry < grade {
                    *entry = grade;
                }
            }
        }
    }

    Some(RubricNode {
        id,
        label: rubric_label,
        children: Vec::new(),
        remedies: by_name.into_iter().collect(),
    })
}

fn slug(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
