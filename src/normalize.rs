//! Bilingual symptom normalization.
//!
//! Turns raw patient text (English, French, or mixed) into a deduplicated
//! set of lowercase English keyword tokens. French hits are translated to
//! their English counterpart through an explicit synonym table keyed by
//! content, so adding a vocabulary entry cannot silently shift every later
//! pairing. Accented and unaccented French spellings are both listed, since
//! patients type either.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::MIN_SYMPTOM_LEN;
use crate::error::EngineError;

/// Primary (English) symptom vocabulary. A token is emitted when it appears
/// as a substring of the normalized input.
pub const PRIMARY_VOCABULARY: &[&str] = &[
    "fever", "chill", "headache", "dizziness", "nausea", "vomiting",
    "diarrhea", "constipation", "cough", "cold", "sneezing", "sore throat",
    "earache", "toothache", "thirst", "sweating", "weakness", "fatigue",
    "restlessness", "anxiety", "fear", "grief", "anger", "irritability",
    "weeping", "sadness", "insomnia", "burning", "cramp", "itching", "rash",
    "swelling", "pain", "backache", "palpitation", "injury", "bruise",
    "sprain", "numbness", "trembling", "colic", "indigestion", "bloating",
    "hoarseness", "wheezing",
];

/// French → English synonym table. Content-keyed: each secondary spelling
/// names its primary token explicitly.
pub const SECONDARY_SYNONYMS: &[(&str, &str)] = &[
    ("fièvre", "fever"),
    ("fievre", "fever"),
    ("frisson", "chill"),
    ("mal de tête", "headache"),
    ("mal de tete", "headache"),
    ("céphalée", "headache"),
    ("cephalee", "headache"),
    ("vertige", "dizziness"),
    ("nausée", "nausea"),
    ("nausee", "nausea"),
    ("vomissement", "vomiting"),
    ("diarrhée", "diarrhea"),
    ("diarrhee", "diarrhea"),
    ("toux", "cough"),
    ("rhume", "cold"),
    ("éternuement", "sneezing"),
    ("eternuement", "sneezing"),
    ("mal de gorge", "sore throat"),
    ("mal d'oreille", "earache"),
    ("mal de dents", "toothache"),
    ("soif", "thirst"),
    ("sueur", "sweating"),
    ("transpiration", "sweating"),
    ("faiblesse", "weakness"),
    ("épuisement", "fatigue"),
    ("epuisement", "fatigue"),
    ("agitation", "restlessness"),
    ("anxiété", "anxiety"),
    ("anxiete", "anxiety"),
    ("angoisse", "anxiety"),
    ("peur", "fear"),
    ("chagrin", "grief"),
    ("colère", "anger"),
    ("colere", "anger"),
    ("irritabilité", "irritability"),
    ("irritabilite", "irritability"),
    ("pleurs", "weeping"),
    ("tristesse", "sadness"),
    ("insomnie", "insomnia"),
    ("brûlure", "burning"),
    ("brulure", "burning"),
    ("crampe", "cramp"),
    ("démangeaison", "itching"),
    ("demangeaison", "itching"),
    ("éruption", "rash"),
    ("eruption", "rash"),
    ("gonflement", "swelling"),
    ("douleur", "pain"),
    ("mal de dos", "backache"),
    ("blessure", "injury"),
    ("ecchymose", "bruise"),
    ("entorse", "sprain"),
    ("engourdissement", "numbness"),
    ("tremblement", "trembling"),
    ("colique", "colic"),
    ("ballonnement", "bloating"),
    ("enrouement", "hoarseness"),
];

static CONTROL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1F\x7F]+").expect("Invalid control-char regex"));
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Reject empty or too-short symptom text before any scoring work begins.
pub fn validate_symptom_text(text: &str) -> Result<(), EngineError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput("symptom text is empty".into()));
    }
    if trimmed.chars().count() < MIN_SYMPTOM_LEN {
        return Err(EngineError::InvalidInput(format!(
            "symptom text shorter than {MIN_SYMPTOM_LEN} characters"
        )));
    }
    Ok(())
}

/// Lowercase, strip control characters, collapse whitespace runs.
pub(crate) fn sanitize(text: &str) -> String {
    let stripped = CONTROL_CHARS.replace_all(text, " ");
    let collapsed = WHITESPACE_RUNS.replace_all(&stripped, " ");
    collapsed.trim().to_lowercase()
}

/// Extract the deduplicated English keyword set from bilingual symptom text.
///
/// Containment check, not a word-boundary tokenizer: short vocabulary
/// tokens can over-match inside longer words.
pub fn normalize_symptoms(text: &str) -> BTreeSet<String> {
    let normalized = sanitize(text);
    let mut keywords = BTreeSet::new();

    for &token in PRIMARY_VOCABULARY {
        if normalized.contains(token) {
            keywords.insert(token.to_string());
        }
    }

    for &(secondary, primary) in SECONDARY_SYNONYMS {
        if normalized.contains(secondary) {
            keywords.insert(primary.to_string());
        }
    }

    tracing::debug!(
        keyword_count = keywords.len(),
        "Normalized symptom text into keyword set"
    );

    keywords
}
