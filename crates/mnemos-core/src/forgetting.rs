//! Ebbinghaus retrievability and the dual-strength effective-strength model.
//!
//! Each entry carries two decaying traces — `working_strength` (fast) and
//! `core_strength` (slow) — following Bjork & Bjork's storage/retrieval
//! strength distinction. Effective strength is the sum of both traces scaled
//! by current retrievability; pinned entries never decay.

use chrono::{DateTime, Utc};

use crate::memory::MemoryKind;

/// Base stability (in days) before access-count and importance growth are
/// applied. Procedural knowledge and emotionally salient memories resist
/// decay the longest; episodic detail decays fastest, matching how quickly
/// conversational specifics normally go stale.
pub fn base_stability_for_kind(kind: MemoryKind) -> f64 {
    match kind {
        MemoryKind::Procedural => 30.0,
        MemoryKind::Emotional => 14.0,
        MemoryKind::Relational => 10.0,
        MemoryKind::Opinion => 7.0,
        MemoryKind::Factual => 5.0,
        MemoryKind::Episodic => 3.0,
    }
}

/// `R(t) = e^(-t/S)`, the probability an entry is still retrievable after
/// `elapsed` seconds given stability `stability` (in seconds).
pub fn retrievability(elapsed_secs: f64, stability: f64) -> f64 {
    if stability <= 0.0 {
        return 0.0;
    }
    (-elapsed_secs / stability).exp()
}

/// Stability grows monotonically with each consolidation pass (spacing
/// effect) and with importance:
/// `S = S_0 * (1 + beta * consolidation_count) * (1 + gamma * importance)`.
pub fn stability(
    base_stability: f64,
    consolidation_count: u32,
    importance: f64,
    beta: f64,
    gamma: f64,
) -> f64 {
    base_stability * (1.0 + beta * consolidation_count as f64) * (1.0 + gamma * importance)
}

/// Exponential decay of a single strength trace: `s * e^(-mu * elapsed_days)`.
pub fn decay_trace(strength: f64, mu: f64, elapsed_days: f64) -> f64 {
    strength * (-mu * elapsed_days).exp()
}

/// `E = (r1 + r2) * R`: the sum of both strength traces scaled by
/// retrievability. A high-stability entry that hasn't been touched in a
/// while still has a large `r1 + r2`, but `R` pulls its effective strength
/// down until the next access refreshes it.
pub fn effective_strength(working_strength: f64, core_strength: f64, retrievability: f64) -> f64 {
    (working_strength + core_strength) * retrievability
}

/// Whether an entry should be pruned: non-pinned, not the root of a
/// contradiction chain (superseded-but-still-referenced entries are kept for
/// audit even once their effective strength falls below threshold), and
/// effective strength has fallen below `forget_threshold`.
pub fn should_prune(
    effective_strength: f64,
    pinned: bool,
    is_contradiction_chain_root: bool,
    forget_threshold: f64,
) -> bool {
    !pinned && !is_contradiction_chain_root && effective_strength < forget_threshold
}

/// Days elapsed between two timestamps, never negative (clock skew or a
/// stale "last touched" timestamp clamps to zero rather than growing
/// strength).
pub fn elapsed_days(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    ((now - since).num_milliseconds() as f64 / 86_400_000.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn retrievability_decays_with_elapsed_time() {
        let fresh = retrievability(0.0, 100.0);
        let later = retrievability(200.0, 100.0);
        assert!((fresh - 1.0).abs() < 1e-9);
        assert!(later < fresh);
    }

    #[test]
    fn retrievability_zero_stability_is_zero() {
        assert_eq!(retrievability(10.0, 0.0), 0.0);
    }

    #[test]
    fn stability_grows_with_consolidation_count_and_importance() {
        let low = stability(1.0, 0, 0.0, 0.1, 0.2);
        let high = stability(1.0, 10, 1.0, 0.1, 0.2);
        assert!(high > low);
    }

    #[test]
    fn decay_trace_shrinks_over_time() {
        let s0 = decay_trace(1.0, 0.1, 0.0);
        let s10 = decay_trace(1.0, 0.1, 10.0);
        assert!((s0 - 1.0).abs() < 1e-9);
        assert!(s10 < s0);
    }

    #[test]
    fn effective_strength_is_sum_of_traces_scaled_by_retrievability() {
        assert!((effective_strength(0.2, 0.8, 1.0) - 1.0).abs() < 1e-9);
        assert!((effective_strength(0.2, 0.8, 0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn pinned_entries_are_never_pruned() {
        assert!(!should_prune(0.0, true, false, 0.5));
    }

    #[test]
    fn weak_unpinned_entries_are_pruned() {
        assert!(should_prune(0.001, false, false, 0.01));
        assert!(!should_prune(0.5, false, false, 0.01));
    }

    #[test]
    fn contradiction_chain_roots_are_never_pruned() {
        assert!(!should_prune(0.0, false, true, 0.5));
    }

    #[test]
    fn elapsed_days_clamps_negative_to_zero() {
        let now = Utc::now();
        let future = now + Duration::days(1);
        assert_eq!(elapsed_days(future, now), 0.0);
    }
}
