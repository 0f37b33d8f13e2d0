//! The public engine façade: one struct wrapping storage, configuration, and
//! an optional embedding provider, exposing the operation contracts callers
//! actually use (`add`, `recall`, `consolidate`, `forget`, `reward`, `pin`,
//! `update_memory`, `stats`, `export`).

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use lru::LruCache;
use rand::rngs::ThreadRng;

use crate::activation;
use crate::confidence::{self, FeedbackPolarity};
use crate::config::EngineConfig;
use crate::consolidation;
use crate::embeddings::ProviderSelection;
use crate::error::{EngineError, Result};
use crate::forgetting;
use crate::hebbian;
use crate::memory::{
    AddInput, ConfidenceLabel, ConsolidationReport, EngineStats, MemoryEntry, RecallQuery,
    RecallResult,
};
use crate::retrieval;
use crate::storage::Store;

/// Number of lexical/semantic candidates pulled before fusion, relative to
/// the caller's requested `k`.
const CANDIDATE_POOL_MULTIPLIER: usize = 4;
const MIN_CANDIDATE_POOL: usize = 20;
/// Jaccard overlap above which a cached recall is served instead of
/// re-running retrieval.
const SESSION_CACHE_OVERLAP_THRESHOLD: f64 = 0.7;

struct SessionCacheEntry {
    query_tokens: HashSet<String>,
    results: Vec<RecallResult>,
}

/// Cognitive memory engine: the entry point applications embed.
pub struct Engine {
    store: Store,
    config: EngineConfig,
    provider: ProviderSelection,
    started_at: DateTime<Utc>,
    session_cache: Mutex<LruCache<String, SessionCacheEntry>>,
}

impl Engine {
    /// Open (or create) a durable engine at `path`.
    pub fn open(path: &Path, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let store = Store::open(path)?;
        Ok(Self::from_store(store, config))
    }

    /// An ephemeral, in-memory engine. State does not survive the engine
    /// being dropped.
    pub fn in_memory(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let store = Store::open_in_memory()?;
        Ok(Self::from_store(store, config))
    }

    fn from_store(store: Store, config: EngineConfig) -> Self {
        let capacity = NonZeroUsize::new(config.session_cache_capacity.max(1)).unwrap();
        Self {
            store,
            config,
            provider: ProviderSelection::None,
            started_at: Utc::now(),
            session_cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Attach an embedding provider for semantic recall.
    pub fn set_provider(&mut self, provider: ProviderSelection) {
        self.provider = provider;
    }

    // ========================================================================
    // add
    // ========================================================================

    /// Store a new memory. Returns its id.
    pub fn add(&self, input: AddInput) -> Result<String> {
        if input.content.trim().is_empty() {
            return Err(EngineError::EmptyContent);
        }

        if let Some(ref contradicts_id) = input.contradicts {
            if self.store.peek(contradicts_id)?.is_none() {
                return Err(EngineError::MissingEntry(contradicts_id.clone()));
            }
        }

        let now = Utc::now();
        let mut entry = MemoryEntry::new(&input.content, input.kind, now);
        entry.importance = input.importance.unwrap_or(0.5).clamp(0.0, 1.0);
        entry.source = input.source;
        entry.contradicts = input.contradicts;
        entry.embedding = self.provider.embed(&input.content);

        self.store.insert(&entry)?;
        if !input.entities.is_empty() {
            self.store.set_graph_links(&entry.id, &input.entities)?;
        }

        Ok(entry.id)
    }

    // ========================================================================
    // recall
    // ========================================================================

    /// Retrieve up to `query.k` memories ranked by composite activation.
    pub fn recall(&self, query: RecallQuery) -> Result<Vec<RecallResult>> {
        self.recall_impl(query)
    }

    /// Same as [`Engine::recall`], but consults (and updates) a bounded
    /// per-session cache: if the new query's token set overlaps the
    /// session's last query above a threshold, the cached result is served
    /// instead of re-running retrieval. Purely advisory — a cache hit
    /// always returns a subset of a prior real call's output.
    pub fn recall_cached(&self, session_id: &str, query: RecallQuery) -> Result<Vec<RecallResult>> {
        let tokens = tokenize(&query.query);

        if let Some(cached) = self.session_cache.lock().expect("cache mutex poisoned").get(session_id) {
            if retrieval::jaccard_overlap(&tokens, &cached.query_tokens) > SESSION_CACHE_OVERLAP_THRESHOLD {
                return Ok(cached.results.clone());
            }
        }

        let results = self.recall_impl(query)?;
        self.session_cache.lock().expect("cache mutex poisoned").put(
            session_id.to_string(),
            SessionCacheEntry {
                query_tokens: tokens,
                results: results.clone(),
            },
        );
        Ok(results)
    }

    fn recall_impl(&self, query: RecallQuery) -> Result<Vec<RecallResult>> {
        if query.query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let pool = (query.k * CANDIDATE_POOL_MULTIPLIER).max(MIN_CANDIDATE_POOL);

        // 1. Lexical.
        let fts_hits = self.store.search_fts(&query.query, pool)?;
        let fts_scores = normalize_scores(
            fts_hits.iter().enumerate().map(|(rank, e)| (e.id.clone(), (pool - rank) as f64)),
        );

        // 2. Semantic.
        let query_vec = self.provider.embed(&query.query);
        if query_vec.is_none() && !matches!(self.provider, ProviderSelection::None) {
            tracing::warn!("embedding provider failed to embed query; recall degraded to lexical+graph only");
        }
        let (vector_hits, vector_scores) = if let Some(vec) = &query_vec {
            let hits = self.store.vector_search(vec, pool)?;
            let scores = normalize_scores(hits.iter().map(|(e, sim)| (e.id.clone(), *sim as f64)));
            (hits.into_iter().map(|(e, _)| e).collect::<Vec<_>>(), scores)
        } else {
            (Vec::new(), HashMap::new())
        };

        // 3. Fusion.
        let fused = retrieval::fuse_with_adaptive_weights(&vector_scores, &fts_scores);

        let mut pool_entries: HashMap<String, MemoryEntry> = HashMap::new();
        for entry in fts_hits.into_iter().chain(vector_hits) {
            pool_entries.insert(entry.id.clone(), entry);
        }

        let directly_matched: HashSet<String> = fused.keys().cloned().collect();

        // 4. Graph expansion.
        if query.graph_expand {
            let seed_ids: Vec<String> = directly_matched.iter().cloned().collect();
            for id in &seed_ids {
                for link in self.store.graph_links_for(id)? {
                    for related in self.store.search_by_entity(&link.entity)? {
                        pool_entries.entry(related.id.clone()).or_insert(related);
                    }
                }
                for neighbor in self.store.hebbian_neighbors(id, self.config.hebbian_floor)? {
                    let other_id = if neighbor.a == *id { &neighbor.b } else { &neighbor.a };
                    if let Some(entry) = self.store.peek(other_id)? {
                        pool_entries.entry(entry.id.clone()).or_insert(entry);
                    }
                }
            }
        }

        // 5. Filter + 6. Score.
        let context_keywords = query.context.clone();
        let mut scored: Vec<(MemoryEntry, f64, f64)> = Vec::new(); // (entry, activation, confidence)

        for (id, entry) in &pool_entries {
            let matched_directly = directly_matched.contains(id);
            if !retrieval::passes_filter(entry, query.kinds.as_deref(), matched_directly) {
                continue;
            }

            let access_times = self.store.access_history(&entry.id)?;
            let base_level = activation::base_level_activation(&access_times, now, 0.5);
            let spread = self.config.spread_weight
                * retrieval::keyword_match_count(&entry.content, &context_keywords) as f64;

            let neighbor_strengths: Vec<f64> = self
                .store
                .hebbian_neighbors(id, self.config.hebbian_floor)?
                .into_iter()
                .filter(|link| {
                    let other = if link.a == *id { &link.b } else { &link.a };
                    pool_entries.contains_key(other)
                })
                .map(|link| link.strength)
                .collect();
            let hebbian_bonus =
                activation::spreading_activation(&neighbor_strengths, self.config.hebbian_weight);

            let activation_score = activation::composite_activation(
                base_level,
                spread,
                entry.importance,
                self.config.importance_weight,
                entry.is_contradicted(),
                self.config.contradiction_penalty,
            ) + hebbian_bonus;

            let stability = forgetting::stability(
                forgetting::base_stability_for_kind(entry.kind),
                entry.consolidation_count,
                entry.importance,
                self.config.stability_beta,
                self.config.stability_gamma,
            );
            let elapsed_secs = access_times
                .last()
                .map(|t| (now - *t).num_milliseconds() as f64 / 1000.0)
                .unwrap_or(forgetting::elapsed_days(entry.created_at, now) * 86_400.0);
            let retrievability = forgetting::retrievability(elapsed_secs, stability * 86_400.0);

            let match_score = fused.get(id).copied().unwrap_or(0.0);
            let confidence = confidence::confidence_score(
                retrievability,
                match_score,
                entry.working_strength + entry.core_strength,
                entry.is_contradicted(),
            );

            if let Some(min_conf) = query.min_confidence {
                if confidence < min_conf {
                    continue;
                }
            }

            scored.push((entry.clone(), activation_score, confidence));
        }

        let mut ranked: Vec<(MemoryEntry, f64)> =
            scored.iter().map(|(e, a, _)| (e.clone(), *a)).collect();
        retrieval::sort_candidates(&mut ranked);
        ranked.truncate(query.k);

        let confidence_by_id: HashMap<String, f64> =
            scored.into_iter().map(|(e, _, c)| (e.id, c)).collect();

        let mut results = Vec::with_capacity(ranked.len());
        for (entry, activation_score) in &ranked {
            let confidence = confidence_by_id.get(&entry.id).copied().unwrap_or(0.0);
            let stability = forgetting::stability(
                forgetting::base_stability_for_kind(entry.kind),
                entry.consolidation_count,
                entry.importance,
                self.config.stability_beta,
                self.config.stability_gamma,
            );
            let elapsed = forgetting::elapsed_days(entry.created_at, now);
            let retrievability = forgetting::retrievability(elapsed * 86_400.0, stability * 86_400.0);
            let effective = forgetting::effective_strength(
                entry.working_strength,
                entry.core_strength,
                retrievability,
            );

            results.push(RecallResult {
                id: entry.id.clone(),
                content: entry.content.clone(),
                kind: entry.kind,
                confidence,
                confidence_label: ConfidenceLabel::from_score(confidence),
                effective_strength: effective,
                activation: *activation_score,
                age_days: retrieval::age_days(entry.created_at, now),
                layer: entry.layer,
                importance: entry.importance,
                contradicted: entry.is_contradicted(),
            });
        }

        // 7. Record.
        for result in &results {
            self.store.record_access(&result.id, now)?;
        }

        // 8. Hebbian update.
        if self.config.hebbian_enabled && results.len() >= 2 {
            for i in 0..results.len() {
                for j in (i + 1)..results.len() {
                    let a = &results[i].id;
                    let b = &results[j].id;
                    let existing = self.store.hebbian_get(a, b)?;
                    let updated = hebbian::co_activate(
                        existing,
                        a,
                        b,
                        now,
                        self.config.hebbian_form_threshold,
                        self.config.hebbian_eta,
                        self.config.hebbian_max_strength,
                    );
                    self.store.hebbian_upsert(&updated)?;
                }
            }
        }

        tracing::debug!(
            candidates = pool_entries.len(),
            results = results.len(),
            "recall completed"
        );

        Ok(results)
    }

    // ========================================================================
    // consolidate / forget
    // ========================================================================

    /// Run one consolidation pass, advancing simulated time by `delta_t` days.
    pub fn consolidate(&self, delta_t: f64) -> Result<ConsolidationReport> {
        let mut rng = ThreadRng::default();
        let report = consolidation::run(&self.store, &self.config, delta_t, Utc::now(), &mut rng)?;
        tracing::info!(
            entries_processed = report.entries_processed,
            entries_promoted = report.entries_promoted,
            entries_demoted = report.entries_demoted,
            entries_pruned = report.entries_pruned,
            hebbian_links_decayed = report.hebbian_links_decayed,
            hebbian_links_removed = report.hebbian_links_removed,
            failures = report.failures,
            "consolidation cycle complete"
        );
        Ok(report)
    }

    /// Remove memories. Exactly one of `id` / `threshold` must be supplied.
    pub fn forget(&self, id: Option<&str>, threshold: Option<f64>) -> Result<u64> {
        match (id, threshold) {
            (Some(_), Some(_)) => Err(EngineError::AmbiguousForget("both")),
            (None, None) => Err(EngineError::AmbiguousForget("neither")),
            (Some(id), None) => {
                if self.store.delete(id)? {
                    Ok(1)
                } else {
                    Err(EngineError::MissingEntry(id.to_string()))
                }
            }
            (None, Some(threshold)) => {
                let now = Utc::now();
                let mut removed = 0;
                for entry in self.store.all_entries()? {
                    let stability = forgetting::stability(
                        forgetting::base_stability_for_kind(entry.kind),
                        entry.consolidation_count,
                        entry.importance,
                        self.config.stability_beta,
                        self.config.stability_gamma,
                    );
                    let elapsed = forgetting::elapsed_days(entry.created_at, now);
                    let retrievability = forgetting::retrievability(elapsed * 86_400.0, stability * 86_400.0);
                    let effective = forgetting::effective_strength(
                        entry.working_strength,
                        entry.core_strength,
                        retrievability,
                    );

                    if forgetting::should_prune(
                        effective,
                        entry.pinned,
                        entry.is_contradicted(),
                        threshold,
                    ) {
                        self.store.delete(&entry.id)?;
                        removed += 1;
                    }
                }
                Ok(removed)
            }
        }
    }

    // ========================================================================
    // reward
    // ========================================================================

    /// Apply caller feedback to the most recently accessed entries.
    pub fn reward(&self, feedback: &str) -> Result<u64> {
        let polarity = confidence::classify_feedback(feedback);
        if polarity == FeedbackPolarity::Neutral {
            return Ok(0);
        }

        let magnitude = 1.0;
        let delta = confidence::reward_delta(polarity, magnitude, self.config.reward_magnitude);

        let mut seen = HashSet::new();
        let mut affected = 0;
        for record in self.store.recent_accesses(self.config.reward_window * 4)? {
            if seen.len() >= self.config.reward_window {
                break;
            }
            if !seen.insert(record.memory_id.clone()) {
                continue;
            }
            if let Some(mut entry) = self.store.peek(&record.memory_id)? {
                entry.importance = (entry.importance + delta).clamp(0.0, 1.0);
                entry.working_strength = (entry.working_strength + delta).max(0.0);
                self.store.update(&entry)?;
                affected += 1;
            }
        }
        Ok(affected)
    }

    // ========================================================================
    // pin / unpin / update_memory
    // ========================================================================

    pub fn pin(&self, id: &str) -> Result<()> {
        self.set_pinned(id, true)
    }

    pub fn unpin(&self, id: &str) -> Result<()> {
        self.set_pinned(id, false)
    }

    fn set_pinned(&self, id: &str, pinned: bool) -> Result<()> {
        let mut entry = self
            .store
            .peek(id)?
            .ok_or_else(|| EngineError::MissingEntry(id.to_string()))?;
        entry.pinned = pinned;
        self.store.update(&entry)?;
        Ok(())
    }

    /// Supersede `old_id` with a new entry carrying `new_content`, preserving
    /// its kind and importance. Returns the new entry's id.
    pub fn update_memory(&self, old_id: &str, new_content: &str) -> Result<String> {
        let old = self
            .store
            .peek(old_id)?
            .ok_or_else(|| EngineError::MissingEntry(old_id.to_string()))?;

        let mut input = AddInput::new(new_content);
        input.kind = old.kind;
        input.importance = Some(old.importance);
        input.contradicts = Some(old_id.to_string());
        self.add(input)
    }

    // ========================================================================
    // stats / export
    // ========================================================================

    pub fn stats(&self) -> Result<EngineStats> {
        let entries = self.store.all_entries()?;
        let mut by_kind = std::collections::BTreeMap::new();
        let mut by_layer = std::collections::BTreeMap::new();
        let mut pinned_count = 0;
        let mut strength_sum = 0.0;
        let mut importance_sum = 0.0;
        let now = Utc::now();

        for entry in &entries {
            *by_kind.entry(entry.kind.to_string()).or_insert(0u64) += 1;
            *by_layer.entry(entry.layer.to_string()).or_insert(0u64) += 1;
            if entry.pinned {
                pinned_count += 1;
            }
            let stability = forgetting::stability(
                forgetting::base_stability_for_kind(entry.kind),
                entry.consolidation_count,
                entry.importance,
                self.config.stability_beta,
                self.config.stability_gamma,
            );
            let elapsed = forgetting::elapsed_days(entry.created_at, now);
            let retrievability = forgetting::retrievability(elapsed * 86_400.0, stability * 86_400.0);
            strength_sum += forgetting::effective_strength(
                entry.working_strength,
                entry.core_strength,
                retrievability,
            );
            importance_sum += entry.importance;
        }

        let count = entries.len().max(1) as f64;
        Ok(EngineStats {
            total_entries: entries.len() as u64,
            by_kind,
            by_layer,
            average_effective_strength: strength_sum / count,
            average_importance: importance_sum / count,
            pinned_count,
            hebbian_link_count: self.store.hebbian_count()?,
            uptime_seconds: (now - self.started_at).num_seconds().max(0) as u64,
        })
    }

    /// Write a self-contained snapshot of the store to `path`.
    pub fn export(&self, path: &Path) -> Result<()> {
        self.store.export(path)?;
        Ok(())
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Max-normalize a set of raw scores into `[0, 1]`; empty input yields an
/// empty map rather than dividing by zero.
fn normalize_scores(raw: impl Iterator<Item = (String, f64)>) -> HashMap<String, f64> {
    let scores: Vec<(String, f64)> = raw.collect();
    let max = scores.iter().map(|(_, s)| *s).fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return HashMap::new();
    }
    scores.into_iter().map(|(id, s)| (id, s / max)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::in_memory(EngineConfig::default()).unwrap()
    }

    #[test]
    fn add_rejects_empty_content() {
        let engine = engine();
        assert!(matches!(
            engine.add(AddInput::new("   ")),
            Err(EngineError::EmptyContent)
        ));
    }

    #[test]
    fn add_rejects_missing_contradicts_target() {
        let engine = engine();
        let mut input = AddInput::new("fact");
        input.contradicts = Some("does-not-exist".to_string());
        assert!(matches!(
            engine.add(input),
            Err(EngineError::MissingEntry(_))
        ));
    }

    #[test]
    fn add_then_recall_roundtrip() {
        let engine = engine();
        engine.add(AddInput::new("the capital of France is Paris")).unwrap();

        let results = engine.recall(RecallQuery::new("Paris")).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("Paris"));
    }

    #[test]
    fn recall_of_empty_query_returns_empty() {
        let engine = engine();
        engine.add(AddInput::new("something")).unwrap();
        let results = engine.recall(RecallQuery::new("   ")).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn forget_requires_exactly_one_argument() {
        let engine = engine();
        assert!(matches!(
            engine.forget(None, None),
            Err(EngineError::AmbiguousForget("neither"))
        ));
        assert!(matches!(
            engine.forget(Some("x"), Some(0.1)),
            Err(EngineError::AmbiguousForget("both"))
        ));
    }

    #[test]
    fn forget_by_id_removes_entry() {
        let engine = engine();
        let id = engine.add(AddInput::new("temporary")).unwrap();
        assert_eq!(engine.forget(Some(&id), None).unwrap(), 1);
        assert!(engine.recall(RecallQuery::new("temporary")).unwrap().is_empty());
    }

    #[test]
    fn pin_survives_aggressive_threshold_forget() {
        let engine = engine();
        let id = engine.add(AddInput::new("pinned important fact")).unwrap();
        engine.pin(&id).unwrap();

        engine.consolidate(30.0).unwrap();
        let removed = engine.forget(None, Some(f64::MAX)).unwrap();
        assert_eq!(removed, 0);

        let results = engine.recall(RecallQuery::new("pinned important fact")).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn update_memory_contradicts_the_old_entry() {
        let engine = engine();
        let old_id = engine.add(AddInput::new("the meeting is at 3pm")).unwrap();
        let new_id = engine.update_memory(&old_id, "the meeting is at 4pm").unwrap();

        let results = engine.recall(RecallQuery::new("meeting")).unwrap();
        let old_result = results.iter().find(|r| r.id == old_id).unwrap();
        assert!(old_result.contradicted);
        assert_ne!(new_id, old_id);
    }

    #[test]
    fn reward_with_neutral_feedback_affects_nothing() {
        let engine = engine();
        engine.add(AddInput::new("some fact")).unwrap();
        engine.recall(RecallQuery::new("fact")).unwrap();
        assert_eq!(engine.reward("tell me more").unwrap(), 0);
    }

    #[test]
    fn reward_with_positive_feedback_raises_importance() {
        let engine = engine();
        let id = engine.add(AddInput::new("rust is great")).unwrap();
        engine.recall(RecallQuery::new("rust")).unwrap();

        let before = engine.store.peek(&id).unwrap().unwrap().importance;
        engine.reward("yes exactly").unwrap();
        let after = engine.store.peek(&id).unwrap().unwrap().importance;
        assert!(after > before);
    }

    #[test]
    fn stats_reflects_store_contents() {
        let engine = engine();
        engine.add(AddInput::new("fact one")).unwrap();
        engine.add(AddInput::new("fact two")).unwrap();

        let stats = engine.stats().unwrap();
        assert_eq!(stats.total_entries, 2);
    }
}
