//! Composite activation score: the number retrieval ranks candidates by.
//!
//! Four components combine additively into one scalar:
//! 1. base-level activation `B`, ACT-R's recency/frequency term
//! 2. spreading activation `C`, contribution from co-activated (Hebbian)
//!    neighbors that are also candidates this recall
//! 3. importance `I`, the caller-assigned weight, scaled
//! 4. a contradiction penalty subtracted when the entry has been superseded
//!
//! All four are pure functions of their inputs — no I/O, no clock reads —
//! so they're trivial to unit test and to call from both retrieval and the
//! consolidation sweep.

use chrono::{DateTime, Utc};

/// `B(m) = ln[Σ (t_now - t_k + ε)^(-d)]` over every access timestamp `t_k`.
///
/// `ε` guards against a just-occurred access driving the term to infinity;
/// an entry with no accesses gets the floor value `f64::NEG_INFINITY`,
/// letting callers treat "never accessed" as "least activated" without a
/// branch.
pub fn base_level_activation(access_times: &[DateTime<Utc>], now: DateTime<Utc>, decay_rate: f64) -> f64 {
    const EPSILON_SECS: f64 = 1.0;

    if access_times.is_empty() {
        return f64::NEG_INFINITY;
    }

    let sum: f64 = access_times
        .iter()
        .map(|&t| {
            let elapsed_secs = (now - t).num_milliseconds() as f64 / 1000.0;
            (elapsed_secs.max(0.0) + EPSILON_SECS).powf(-decay_rate)
        })
        .sum();

    sum.ln()
}

/// `C = Σ strength(i, j)` over Hebbian neighbors `j` of `i` that are also in
/// the candidate set this recall, each weighted by `spread_weight`.
pub fn spreading_activation(neighbor_strengths: &[f64], spread_weight: f64) -> f64 {
    spread_weight * neighbor_strengths.iter().sum::<f64>()
}

/// Importance contribution, linear in the caller-assigned `importance` and
/// scaled by `importance_weight`.
pub fn importance_contribution(importance: f64, importance_weight: f64) -> f64 {
    importance_weight * importance
}

/// Composite activation `A = B + C + I - penalty`, where `penalty` is
/// `contradiction_penalty` if the entry has been superseded, else zero.
#[allow(clippy::too_many_arguments)]
pub fn composite_activation(
    base_level: f64,
    spreading: f64,
    importance: f64,
    importance_weight: f64,
    contradicted: bool,
    contradiction_penalty: f64,
) -> f64 {
    let penalty = if contradicted { contradiction_penalty } else { 0.0 };
    base_level + spreading + importance_contribution(importance, importance_weight) - penalty
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn base_level_is_neg_infinity_with_no_accesses() {
        assert_eq!(base_level_activation(&[], Utc::now(), 0.5), f64::NEG_INFINITY);
    }

    #[test]
    fn base_level_favors_recency() {
        let now = Utc::now();
        let recent = base_level_activation(&[now - Duration::seconds(10)], now, 0.5);
        let old = base_level_activation(&[now - Duration::days(30)], now, 0.5);
        assert!(recent > old);
    }

    #[test]
    fn base_level_favors_frequency() {
        let now = Utc::now();
        let once = base_level_activation(&[now - Duration::days(1)], now, 0.5);
        let thrice = base_level_activation(
            &[
                now - Duration::days(1),
                now - Duration::days(2),
                now - Duration::days(3),
            ],
            now,
            0.5,
        );
        assert!(thrice > once);
    }

    #[test]
    fn spreading_activation_sums_weighted_neighbor_strengths() {
        let s = spreading_activation(&[1.0, 2.0, 0.5], 0.5);
        assert!((s - 1.75).abs() < 1e-9);
    }

    #[test]
    fn contradiction_penalty_lowers_composite_score() {
        let clean = composite_activation(1.0, 0.0, 0.5, 0.7, false, 3.0);
        let contradicted = composite_activation(1.0, 0.0, 0.5, 0.7, true, 3.0);
        assert!(clean > contradicted);
        assert!((clean - contradicted - 3.0).abs() < 1e-9);
    }
}
