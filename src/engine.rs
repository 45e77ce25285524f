//! Ranking facade.
//!
//! Coordinates: validate → normalize → fan out one task per knowledge
//! source → aggregate → potency + keynote attachment. A single source's
//! failure degrades the result (logged, never thrown); only a total
//! failure surfaces an error.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::aggregate::{merge_candidates, MergedCandidate};
use crate::cache::KnowledgeCache;
use crate::config::DEFAULT_MAX_RESULTS;
use crate::error::EngineError;
use crate::matcher::{KeywordMatcher, SubstringMatcher};
use crate::models::{
    Acuity, CandidateScore, KnowledgeBase, RemedySuggestion, SourceKind,
};
use crate::normalize::{normalize_symptoms, validate_symptom_text};
use crate::potency::recommend_potency;
use crate::scoring::{score_dictionary, score_rubrics};
use crate::store::SourceConfig;

// ─── Request ─────────────────────────────────────────────────────────────────

/// One ranking request from the caller.
#[derive(Debug, Clone)]
pub struct RankingRequest {
    pub symptom_text: String,
    /// Case acuity hint; `None` means acute.
    pub acuity: Option<Acuity>,
    /// When set, fan-out is restricted to this single source id.
    pub preferred_source: Option<String>,
    /// Result list cap; `None` means the engine default.
    pub max_results: Option<usize>,
    /// Caller-supplied deadline for the whole fan-out.
    pub timeout: Option<Duration>,
    /// Candidates submitted by collaborators (structured-note categorizer,
    /// LLM suggestion generator), merged as one more labeled source.
    pub extra_candidates: Vec<CandidateScore>,
}

impl RankingRequest {
    pub fn new(symptom_text: &str) -> Self {
        Self {
            symptom_text: symptom_text.to_string(),
            acuity: None,
            preferred_source: None,
            max_results: None,
            timeout: None,
            extra_candidates: Vec::new(),
        }
    }
}

// ─── Facade ──────────────────────────────────────────────────────────────────

/// Symptom-to-remedy ranking engine over a set of knowledge sources.
pub struct RemedyRanker {
    sources: Vec<SourceConfig>,
    cache: Arc<KnowledgeCache>,
    matcher: Arc<dyn KeywordMatcher>,
}

/// What one per-source task produced.
type SourceOutcome = Result<(Arc<KnowledgeBase>, Vec<CandidateScore>), EngineError>;

impl RemedyRanker {
    pub fn new(sources: Vec<SourceConfig>, cache: Arc<KnowledgeCache>) -> Self {
        Self::with_matcher(sources, cache, Arc::new(SubstringMatcher))
    }

    pub fn with_matcher(
        sources: Vec<SourceConfig>,
        cache: Arc<KnowledgeCache>,
        matcher: Arc<dyn KeywordMatcher>,
    ) -> Self {
        Self {
            sources,
            cache,
            matcher,
        }
    }

    /// Drop every cached knowledge base (maintenance/testing surface).
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Produce the ranked remedy suggestions for a request.
    pub async fn rank(
        &self,
        request: &RankingRequest,
    ) -> Result<Vec<RemedySuggestion>, EngineError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        // Step 1: Reject unusable input before any source is queried.
        validate_symptom_text(&request.symptom_text)?;

        // Step 2: Restrict fan-out when a preferred source is named.
        let selected = self.select_sources(request.preferred_source.as_deref())?;

        // Step 3: Normalize bilingual text into the keyword set.
        let keywords = normalize_symptoms(&request.symptom_text);

        // Step 4: Fan out one task per source. No vocabulary hit means no
        // scorer can match, so skip the knowledge I/O entirely.
        let completed = if keywords.is_empty() {
            tracing::debug!(%request_id, "No vocabulary hits in symptom text; skipping fan-out");
            Vec::new()
        } else {
            self.fan_out(request_id, &selected, &keywords, request.timeout)
                .await
        };

        // Step 5: Total-failure taxonomy. Partial failure degrades silently.
        if completed.is_empty() && !keywords.is_empty() && !selected.is_empty() {
            if request.extra_candidates.is_empty() {
                if let Some(deadline) = request.timeout {
                    if started.elapsed() >= deadline {
                        return Err(EngineError::Timeout(deadline));
                    }
                }
                return Err(EngineError::NoKnowledgeAvailable);
            }
            tracing::warn!(%request_id, "Every knowledge source failed; ranking from submitted candidates only");
        }

        // Step 6: Aggregate in configured-source order, extras last.
        let mut candidates: Vec<CandidateScore> = Vec::new();
        for (_, scored) in &completed {
            candidates.extend(scored.iter().cloned());
        }
        candidates.extend(request.extra_candidates.iter().cloned());
        let merged = merge_candidates(candidates);

        // Step 7: Truncate, then attach potency and keynote excerpts.
        let acuity = request.acuity.unwrap_or_default();
        let max_results = request.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        let knowledge: Vec<&Arc<KnowledgeBase>> = completed.iter().map(|(kb, _)| kb).collect();
        let suggestions: Vec<RemedySuggestion> = merged
            .into_iter()
            .take(max_results)
            .map(|candidate| to_suggestion(candidate, acuity, &knowledge))
            .collect();

        tracing::info!(
            %request_id,
            sources_completed = completed.len(),
            sources_selected = selected.len(),
            suggestions = suggestions.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ranking complete"
        );

        Ok(suggestions)
    }

    // ── Internals ────────────────────────────────────────

    fn select_sources(&self, preferred: Option<&str>) -> Result<Vec<SourceConfig>, EngineError> {
        match preferred {
            None => Ok(self.sources.clone()),
            Some(id) => {
                let found: Vec<SourceConfig> = self
                    .sources
                    .iter()
                    .filter(|s| s.id == id)
                    .cloned()
                    .collect();
                if found.is_empty() {
                    return Err(EngineError::InvalidInput(format!(
                        "unknown preferred source '{id}'"
                    )));
                }
                Ok(found)
            }
        }
    }

    /// Run one task per source and collect completed outcomes in
    /// configured order (never completion order), so downstream merging
    /// stays deterministic.
    async fn fan_out(
        &self,
        request_id: Uuid,
        selected: &[SourceConfig],
        keywords: &BTreeSet<String>,
        timeout: Option<Duration>,
    ) -> Vec<(Arc<KnowledgeBase>, Vec<CandidateScore>)> {
        let deadline = timeout.map(|t| Instant::now() + t);

        let handles: Vec<(String, tokio::task::JoinHandle<SourceOutcome>)> = selected
            .iter()
            .map(|source| {
                let source = source.clone();
                let cache = Arc::clone(&self.cache);
                let matcher = Arc::clone(&self.matcher);
                let keywords = keywords.clone();
                let id = source.id.clone();
                let handle = tokio::spawn(async move {
                    let kb = cache.get(&source).await?;
                    let scored = match source.kind {
                        SourceKind::Rubric => score_rubrics(&kb, &keywords, matcher.as_ref()),
                        SourceKind::Dictionary => {
                            score_dictionary(&kb, &keywords, matcher.as_ref())
                        }
                    };
                    Ok((kb, scored))
                });
                (id, handle)
            })
            .collect();

        let mut completed = Vec::new();
        for (source_id, mut handle) in handles {
            let joined = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match tokio::time::timeout(remaining, &mut handle).await {
                        Ok(joined) => joined,
                        Err(_) => {
                            tracing::warn!(%request_id, source = %source_id, "Source task missed the deadline; abandoning");
                            handle.abort();
                            continue;
                        }
                    }
                }
                None => handle.await,
            };

            match joined {
                Ok(Ok(outcome)) => completed.push(outcome),
                Ok(Err(e)) => {
                    tracing::warn!(%request_id, source = %source_id, error = %e, "Source failed; degrading result");
                }
                Err(e) => {
                    tracing::warn!(%request_id, source = %source_id, error = %e, "Source task aborted");
                }
            }
        }
        completed
    }
}

/// Attach potency and a keynote excerpt to one merged candidate.
fn to_suggestion(
    candidate: MergedCandidate,
    acuity: Acuity,
    knowledge: &[&Arc<KnowledgeBase>],
) -> RemedySuggestion {
    let potency = recommend_potency(candidate.score, acuity).to_string();
    let keynote = knowledge.iter().find_map(|kb| {
        let entry = kb.remedies.get(&candidate.remedy)?;
        entry
            .keynotes
            .first()
            .cloned()
            .or_else(|| entry.clinical.clone())
    });

    RemedySuggestion {
        name: candidate.remedy.clone(),
        score: candidate.score,
        source: candidate.source_label(),
        justification: candidate.justification,
        potency,
        keynote,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SystemClock;
    use crate::error::LoadError;
    use crate::store::{KnowledgeLoader, StoreLoader};
    use async_trait::async_trait;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(1800);

    fn write_fixture(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn rubric_fixture(dir: &tempfile::TempDir) -> PathBuf {
        write_fixture(
            dir,
            "repertory.json",
            r#"{
                "metadata": {"title": "Test Repertory"},
                "rubrics": {
                    "Fever": {
                        "general": {"grade3": ["Aconite"]},
                        "burning heat": {"grade2": ["Belladonna"]}
                    }
                },
                "remedies": {
                    "Aconite": {"keynotes": ["Sudden onset after cold dry wind"]}
                }
            }"#,
        )
    }

    fn dictionary_fixture(dir: &tempfile::TempDir) -> PathBuf {
        write_fixture(
            dir,
            "materia.json",
            r#"{
                "remedies": {
                    "Belladonna": {
                        "keynotes": ["Burning fever with red face"],
                        "mental": ["Delirium during fever", "Rage with burning skin"]
                    },
                    "Pulsatilla": {
                        "keynotes": ["Weeping and clingy"],
                        "modalities": {"better": ["open air"]}
                    }
                }
            }"#,
        )
    }

    fn ranker_for(sources: Vec<SourceConfig>) -> RemedyRanker {
        let cache = Arc::new(KnowledgeCache::new(
            Arc::new(StoreLoader::new()),
            Arc::new(SystemClock),
            TTL,
            10,
        ));
        RemedyRanker::new(sources, cache)
    }

    struct CountingLoader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KnowledgeLoader for CountingLoader {
        async fn load(&self, source: &SourceConfig) -> Result<KnowledgeBase, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(KnowledgeBase::empty(&source.id, source.kind))
        }
    }

    /// Loader that never returns for ids starting with "slow".
    struct HangingLoader;

    #[async_trait]
    impl KnowledgeLoader for HangingLoader {
        async fn load(&self, source: &SourceConfig) -> Result<KnowledgeBase, LoadError> {
            if source.id.starts_with("slow") {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            let mut kb = KnowledgeBase::empty(&source.id, source.kind);
            kb.remedies.insert(
                "Belladonna".into(),
                crate::models::RemedyEntry {
                    keynotes: vec!["Burning fever".into()],
                    ..Default::default()
                },
            );
            Ok(kb)
        }
    }

    #[tokio::test]
    async fn fever_scores_aconite_from_rubric_source() {
        let dir = tempfile::tempdir().unwrap();
        let ranker = ranker_for(vec![SourceConfig::file(
            "rubric-kent",
            SourceKind::Rubric,
            rubric_fixture(&dir),
        )]);

        let suggestions = ranker
            .rank(&RankingRequest::new("High fever since last night, fièvre"))
            .await
            .unwrap();

        let aconite = suggestions.iter().find(|s| s.name == "Aconite").unwrap();
        assert!(aconite.score >= 30);
        assert!(aconite.source.contains("rubric-kent"));
        // Acute default: a 30-ish score maps below the 12C threshold.
        assert_eq!(aconite.potency, "6C");
        assert_eq!(
            aconite.keynote.as_deref(),
            Some("Sudden onset after cold dry wind")
        );
    }

    #[tokio::test]
    async fn shared_remedy_takes_max_score_and_both_labels() {
        let dir = tempfile::tempdir().unwrap();
        let ranker = ranker_for(vec![
            SourceConfig::file("rubric-kent", SourceKind::Rubric, rubric_fixture(&dir)),
            SourceConfig::file(
                "dictionary-boericke",
                SourceKind::Dictionary,
                dictionary_fixture(&dir),
            ),
        ]);

        // "fever" + "burning" hit Belladonna for 2×20=40 in the rubric
        // (grade-2 node, two keywords) and 30+20+20=70 in the dictionary.
        let suggestions = ranker
            .rank(&RankingRequest::new("burning fever"))
            .await
            .unwrap();

        let belladonna = suggestions.iter().find(|s| s.name == "Belladonna").unwrap();
        assert_eq!(belladonna.score, 70, "Max of 40 and 70, not the sum");
        assert!(belladonna.source.contains("rubric-kent"));
        assert!(belladonna.source.contains("dictionary-boericke"));
    }

    #[tokio::test]
    async fn failing_source_degrades_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let ranker = ranker_for(vec![
            SourceConfig::file(
                "rubric-missing",
                SourceKind::Rubric,
                "/nonexistent/repertory.json",
            ),
            SourceConfig::file(
                "dictionary-boericke",
                SourceKind::Dictionary,
                dictionary_fixture(&dir),
            ),
        ]);

        let suggestions = ranker
            .rank(&RankingRequest::new("burning fever"))
            .await
            .unwrap();

        assert!(!suggestions.is_empty(), "Healthy source still answers");
        assert!(suggestions.iter().all(|s| !s.source.contains("rubric-missing")));
    }

    #[tokio::test]
    async fn all_sources_failing_is_no_knowledge() {
        let ranker = ranker_for(vec![
            SourceConfig::file("a", SourceKind::Rubric, "/nonexistent/a.json"),
            SourceConfig::file("b", SourceKind::Dictionary, "/nonexistent/b.json"),
        ]);

        match ranker.rank(&RankingRequest::new("burning fever")).await {
            Err(EngineError::NoKnowledgeAvailable) => {}
            other => panic!("Expected NoKnowledgeAvailable, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_text_rejected_before_any_load() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(KnowledgeCache::new(
            Arc::clone(&loader) as Arc<dyn KnowledgeLoader>,
            Arc::new(SystemClock),
            TTL,
            10,
        ));
        let ranker = RemedyRanker::new(
            vec![SourceConfig::file("rubric-kent", SourceKind::Rubric, "/tmp/x.json")],
            cache,
        );

        match ranker.rank(&RankingRequest::new("")).await {
            Err(EngineError::InvalidInput(_)) => {}
            other => panic!("Expected InvalidInput, got: {other:?}"),
        }
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0, "No loader call");
    }

    #[tokio::test]
    async fn identical_requests_rank_identically() {
        let dir = tempfile::tempdir().unwrap();
        let ranker = ranker_for(vec![
            SourceConfig::file("rubric-kent", SourceKind::Rubric, rubric_fixture(&dir)),
            SourceConfig::file(
                "dictionary-boericke",
                SourceKind::Dictionary,
                dictionary_fixture(&dir),
            ),
        ]);
        let request = RankingRequest::new("burning fever with weeping");

        let first = ranker.rank(&request).await.unwrap();
        let second = ranker.rank(&request).await.unwrap();

        let render = |s: &[RemedySuggestion]| {
            s.iter()
                .map(|r| format!("{}:{}:{}:{}", r.name, r.score, r.source, r.justification))
                .collect::<Vec<_>>()
        };
        assert_eq!(render(&first), render(&second));
    }

    #[tokio::test]
    async fn deadline_with_only_hung_sources_times_out() {
        let cache = Arc::new(KnowledgeCache::new(
            Arc::new(HangingLoader),
            Arc::new(SystemClock),
            TTL,
            10,
        ));
        let ranker = RemedyRanker::new(
            vec![SourceConfig::file("slow-a", SourceKind::Dictionary, "/tmp/a.json")],
            cache,
        );

        let mut request = RankingRequest::new("burning fever");
        request.timeout = Some(Duration::from_millis(50));

        match ranker.rank(&request).await {
            Err(EngineError::Timeout(_)) => {}
            other => panic!("Expected Timeout, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn deadline_keeps_completed_sources() {
        let cache = Arc::new(KnowledgeCache::new(
            Arc::new(HangingLoader),
            Arc::new(SystemClock),
            TTL,
            10,
        ));
        let ranker = RemedyRanker::new(
            vec![
                SourceConfig::file("fast", SourceKind::Dictionary, "/tmp/fast.json"),
                SourceConfig::file("slow-b", SourceKind::Dictionary, "/tmp/slow.json"),
            ],
            cache,
        );

        let mut request = RankingRequest::new("burning fever");
        request.timeout = Some(Duration::from_millis(200));

        let suggestions = ranker.rank(&request).await.unwrap();
        assert!(!suggestions.is_empty());
        assert!(suggestions[0].source.contains("fast"));
    }

    #[tokio::test]
    async fn extra_candidates_merge_as_labeled_source() {
        let dir = tempfile::tempdir().unwrap();
        let ranker = ranker_for(vec![SourceConfig::file(
            "dictionary-boericke",
            SourceKind::Dictionary,
            dictionary_fixture(&dir),
        )]);

        let mut request = RankingRequest::new("burning fever");
        request.extra_candidates = vec![CandidateScore {
            remedy: "Belladonna".into(),
            score: 85,
            source: "ai".into(),
            fragments: vec!["Case summary suggests sudden onset".into()],
        }];

        let suggestions = ranker.rank(&request).await.unwrap();
        let belladonna = suggestions.iter().find(|s| s.name == "Belladonna").unwrap();
        assert_eq!(belladonna.score, 85);
        assert!(belladonna.source.contains("dictionary-boericke"));
        assert!(belladonna.source.contains("ai"));
    }

    #[tokio::test]
    async fn preferred_source_restricts_fanout() {
        let dir = tempfile::tempdir().unwrap();
        let ranker = ranker_for(vec![
            SourceConfig::file("rubric-kent", SourceKind::Rubric, rubric_fixture(&dir)),
            SourceConfig::file(
                "dictionary-boericke",
                SourceKind::Dictionary,
                dictionary_fixture(&dir),
            ),
        ]);

        let mut request = RankingRequest::new("burning fever");
        request.preferred_source = Some("dictionary-boericke".into());

        let suggestions = ranker.rank(&request).await.unwrap();
        assert!(!suggestions.is_empty());
        assert!(suggestions
            .iter()
            .all(|s| s.source == "dictionary-boericke"));
    }

    #[tokio::test]
    async fn unknown_preferred_source_is_invalid_input() {
        let ranker = ranker_for(vec![]);
        let mut request = RankingRequest::new("burning fever");
        request.preferred_source = Some("no-such-source".into());

        assert!(matches!(
            ranker.rank(&request).await,
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn max_results_truncates_ranking() {
        let dir = tempfile::tempdir().unwrap();
        let ranker = ranker_for(vec![SourceConfig::file(
            "dictionary-boericke",
            SourceKind::Dictionary,
            dictionary_fixture(&dir),
        )]);

        let mut request = RankingRequest::new("burning fever and weeping");
        request.max_results = Some(1);

        let suggestions = ranker.rank(&request).await.unwrap();
        assert_eq!(suggestions.len(), 1);
        // Belladonna outscores Pulsatilla, so it survives the cut.
        assert_eq!(suggestions[0].name, "Belladonna");
    }

    #[tokio::test]
    async fn no_vocabulary_hit_returns_empty_not_error() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(KnowledgeCache::new(
            Arc::clone(&loader) as Arc<dyn KnowledgeLoader>,
            Arc::new(SystemClock),
            TTL,
            10,
        ));
        let ranker = RemedyRanker::new(
            vec![SourceConfig::file("rubric-kent", SourceKind::Rubric, "/tmp/x.json")],
            cache,
        );

        let suggestions = ranker
            .rank(&RankingRequest::new("nothing recognizable here"))
            .await
            .unwrap();

        assert!(suggestions.is_empty(), "No match is an empty list, not an error");
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0, "No pointless I/O");
    }

    #[tokio::test]
    async fn chronic_acuity_shifts_potency() {
        let dir = tempfile::tempdir().unwrap();
        let ranker = ranker_for(vec![SourceConfig::file(
            "dictionary-boericke",
            SourceKind::Dictionary,
            dictionary_fixture(&dir),
        )]);

        let mut request = RankingRequest::new("burning fever");
        request.acuity = Some(Acuity::Chronic);

        let suggestions = ranker.rank(&request).await.unwrap();
        let belladonna = suggestions.iter().find(|s| s.name == "Belladonna").unwrap();
        // Score 70 is "12C" acute but "200C" chronic.
        assert_eq!(belladonna.score, 70);
        assert_eq!(belladonna.potency, "200C");
    }
}
