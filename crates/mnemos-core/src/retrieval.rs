//! Candidate retrieval: hybrid fusion, graph expansion, and final ranking.
//!
//! This module is deliberately storage-agnostic — it receives whatever the
//! lexical search, vector search, and graph lookups produced and reduces
//! them to one ranked candidate list. [`crate::engine::Engine::recall`]
//! owns the actual store calls and wires this module's pure functions
//! together.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::memory::MemoryEntry;

/// Jaccard overlap between two id sets: `|A ∩ B| / |A ∪ B|`. Empty/empty is
/// defined as `0.0` (no evidence of agreement, not perfect agreement).
pub fn jaccard_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Adaptive fusion weights `(w_vec, w_fts)`, chosen from the agreement
/// between the vector and lexical candidate sets: the more they already
/// agree, the more weight goes to vector similarity (it's corroborated);
/// the less they agree, the more weight shifts to lexical match (safer
/// default when the two signals disagree).
pub fn adaptive_weights(overlap: f64) -> (f64, f64) {
    if overlap > 0.5 {
        (0.8, 0.2)
    } else if overlap > 0.2 {
        (0.6, 0.4)
    } else {
        (0.4, 0.6)
    }
}

/// Fuse per-id vector and lexical scores into one map: `s = w_vec·sim +
/// w_fts·fts`. An id present in only one source is scored using just that
/// source's term.
pub fn fuse_scores(
    vector_scores: &HashMap<String, f64>,
    fts_scores: &HashMap<String, f64>,
    w_vec: f64,
    w_fts: f64,
) -> HashMap<String, f64> {
    let mut fused = HashMap::new();
    for (id, &sim) in vector_scores {
        *fused.entry(id.clone()).or_insert(0.0) += w_vec * sim;
    }
    for (id, &fts) in fts_scores {
        *fused.entry(id.clone()).or_insert(0.0) += w_fts * fts;
    }
    fused
}

/// Compute the adaptively-weighted fusion score map directly from the raw
/// id sets and per-source scores: union the two candidate sets, then fuse
/// with overlap-derived weights.
pub fn fuse_with_adaptive_weights(
    vector_scores: &HashMap<String, f64>,
    fts_scores: &HashMap<String, f64>,
) -> HashMap<String, f64> {
    let vec_ids: HashSet<String> = vector_scores.keys().cloned().collect();
    let fts_ids: HashSet<String> = fts_scores.keys().cloned().collect();
    let overlap = jaccard_overlap(&vec_ids, &fts_ids);
    let (w_vec, w_fts) = adaptive_weights(overlap);
    fuse_scores(vector_scores, fts_scores, w_vec, w_fts)
}

/// Number of `keywords` that appear as a whole, case-insensitive word in
/// `content`. Used for the spreading-activation context term.
pub fn keyword_match_count(content: &str, keywords: &[String]) -> usize {
    let lowered = content.to_lowercase();
    let tokens: HashSet<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    keywords
        .iter()
        .filter(|k| tokens.contains(k.to_lowercase().as_str()))
        .count()
}

/// Whether `entry` should survive the post-fusion filter: its kind is in
/// `allowed_kinds` (if given), and either it isn't archived or it actually
/// matched (archive entries are searchable but never expanded to).
pub fn passes_filter(
    entry: &MemoryEntry,
    allowed_kinds: Option<&[crate::memory::MemoryKind]>,
    matched_directly: bool,
) -> bool {
    if let Some(kinds) = allowed_kinds {
        if !kinds.contains(&entry.kind) {
            return false;
        }
    }
    if entry.layer == crate::memory::Layer::Archive && !matched_directly {
        return false;
    }
    true
}

/// Stable tie-break ordering for final ranking: primarily by activation
/// score (descending), then `created_at` (descending, newer first), then
/// `importance` (descending), then `id` ascending as the final deterministic
/// tiebreaker.
pub fn ranking_key(entry: &MemoryEntry, activation: f64) -> (i64, i64, i64, String) {
    let score_key = (activation * 1_000_000.0).round() as i64;
    let created_key = entry.created_at.timestamp_millis();
    let importance_key = (entry.importance * 1_000_000.0).round() as i64;
    (score_key, created_key, importance_key, entry.id.clone())
}

/// Sort candidates by [`ranking_key`], descending on every component except
/// id (ascending).
pub fn sort_candidates(candidates: &mut [(MemoryEntry, f64)]) {
    candidates.sort_by(|(entry_a, score_a), (entry_b, score_b)| {
        let key_a = ranking_key(entry_a, *score_a);
        let key_b = ranking_key(entry_b, *score_b);
        (key_b.0, key_b.1, key_b.2)
            .cmp(&(key_a.0, key_a.1, key_a.2))
            .then_with(|| key_a.3.cmp(&key_b.3))
    });
}

/// Age of an entry in days at `now`, used for display-only `age_days`.
pub fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    ((now - created_at).num_milliseconds() as f64 / 86_400_000.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKind;

    fn ids(values: &[&str]) -> HashSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn jaccard_overlap_of_identical_sets_is_one() {
        let a = ids(&["1", "2", "3"]);
        assert_eq!(jaccard_overlap(&a, &a), 1.0);
    }

    #[test]
    fn jaccard_overlap_of_disjoint_sets_is_zero() {
        assert_eq!(jaccard_overlap(&ids(&["1"]), &ids(&["2"])), 0.0);
    }

    #[test]
    fn adaptive_weights_match_spec_buckets() {
        assert_eq!(adaptive_weights(0.9), (0.8, 0.2));
        assert_eq!(adaptive_weights(0.3), (0.6, 0.4));
        assert_eq!(adaptive_weights(0.1), (0.4, 0.6));
    }

    #[test]
    fn fuse_scores_combines_both_sources() {
        let mut vec_scores = HashMap::new();
        vec_scores.insert("a".to_string(), 1.0);
        let mut fts_scores = HashMap::new();
        fts_scores.insert("a".to_string(), 0.5);
        fts_scores.insert("b".to_string(), 1.0);

        let fused = fuse_scores(&vec_scores, &fts_scores, 0.8, 0.2);
        assert!((fused["a"] - 0.9).abs() < 1e-9);
        assert!((fused["b"] - 0.2).abs() < 1e-9);
    }

    #[test]
    fn keyword_match_count_is_whole_word_case_insensitive() {
        let count = keyword_match_count(
            "Alice loves Rust programming",
            &["alice".to_string(), "rust".to_string(), "java".to_string()],
        );
        assert_eq!(count, 2);
    }

    #[test]
    fn keyword_match_count_rejects_partial_word_matches() {
        let count = keyword_match_count("programming", &["gram".to_string()]);
        assert_eq!(count, 0);
    }

    #[test]
    fn archive_entries_are_filtered_unless_directly_matched() {
        let mut entry = MemoryEntry::new("x", MemoryKind::Factual, Utc::now());
        entry.layer = crate::memory::Layer::Archive;
        assert!(!passes_filter(&entry, None, false));
        assert!(passes_filter(&entry, None, true));
    }

    #[test]
    fn ranking_orders_by_score_then_recency_then_importance_then_id() {
        let now = Utc::now();
        let mut a = MemoryEntry::new("a", MemoryKind::Factual, now);
        a.id = "aaa".into();
        let mut b = MemoryEntry::new("b", MemoryKind::Factual, now);
        b.id = "bbb".into();

        let mut candidates = vec![(b.clone(), 1.0), (a.clone(), 1.0)];
        sort_candidates(&mut candidates);
        assert_eq!(candidates[0].0.id, "aaa");
    }
}
