//! Engine configuration.
//!
//! A plain Rust struct, not a parsed config file — the same choice the
//! teacher crate makes for its own tunables (feature flags and environment
//! variables such as `VESTIGE_ENCRYPTION_KEY`, not a TOML layer). Invalid
//! combinations are rejected once, at construction time, rather than
//! surfacing as subtle runtime drift later.

use crate::error::{EngineError, Result};

/// Every tunable governing decay, transfer, forgetting, activation weights,
/// Hebbian bookkeeping, feedback, and retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    // ===== Decay / transfer =====
    /// Working-strength decay rate μ₁.
    pub mu1: f64,
    /// Core-strength decay rate μ₂ (μ₁ > μ₂).
    pub mu2: f64,
    /// Working → core transfer rate α.
    pub alpha: f64,

    // ===== Interleaved replay =====
    /// Fraction of entries replayed from the last day.
    pub replay_ratio_recent: f64,
    /// Fraction of entries replayed from 1–7 days.
    pub replay_ratio_week: f64,
    /// Fraction of entries replayed from older than 7 days.
    pub replay_ratio_older: f64,
    /// Working-strength boost applied to each replayed entry.
    pub replay_boost: f64,

    // ===== Layer transitions =====
    /// `core_strength` threshold to promote working/archive → core.
    pub promote_threshold: f64,
    /// Effective-strength threshold below which working → archive.
    pub demote_threshold: f64,

    // ===== Forgetting =====
    /// Effective-strength threshold below which a non-pinned entry is pruned.
    pub forget_threshold: f64,
    /// Per-cycle global strength multiplier (synaptic homeostasis).
    pub downscale_factor: f64,
    /// Stability spacing-effect coefficient β.
    pub stability_beta: f64,
    /// Stability importance coefficient γ.
    pub stability_gamma: f64,

    // ===== Activation weights =====
    pub importance_weight: f64,
    pub spread_weight: f64,
    pub hebbian_weight: f64,
    pub contradiction_penalty: f64,

    // ===== Hebbian =====
    pub hebbian_enabled: bool,
    /// Co-activation count at which a link first materializes (θ_form).
    pub hebbian_form_threshold: u32,
    /// Strengthening factor η.
    pub hebbian_eta: f64,
    /// Per-cycle decay factor λ_heb.
    pub hebbian_decay: f64,
    /// Strength cap S_max.
    pub hebbian_max_strength: f64,
    /// Strength floor below which a link is removed.
    pub hebbian_prune_floor: f64,

    // ===== Feedback =====
    pub reward_magnitude: f64,
    /// N most-recently-accessed entries a reward call can affect.
    pub reward_window: usize,

    // ===== Candidate retrieval =====
    /// Minimum Hebbian link strength to count as a "floor" neighbor.
    pub hebbian_floor: f64,

    // ===== Working-memory cache =====
    /// Miller-bound session cache capacity.
    pub session_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mu1: 0.1,
            mu2: 0.01,
            alpha: 0.2,
            replay_ratio_recent: 0.5,
            replay_ratio_week: 0.3,
            replay_ratio_older: 0.2,
            replay_boost: 0.05,
            promote_threshold: 2.0,
            demote_threshold: 0.3,
            forget_threshold: 0.01,
            downscale_factor: 0.95,
            stability_beta: 0.1,
            stability_gamma: 0.2,
            importance_weight: 0.7,
            spread_weight: 0.5,
            hebbian_weight: 0.3,
            contradiction_penalty: 3.0,
            hebbian_enabled: true,
            hebbian_form_threshold: 3,
            hebbian_eta: 0.1,
            hebbian_decay: 0.95,
            hebbian_max_strength: 5.0,
            hebbian_prune_floor: 0.1,
            reward_magnitude: 0.3,
            reward_window: 3,
            hebbian_floor: 0.1,
            session_cache_capacity: 7,
        }
    }
}

impl EngineConfig {
    /// Reject internally inconsistent configurations before they can corrupt
    /// engine state. Called by [`crate::engine::Engine::new`].
    pub fn validate(&self) -> Result<()> {
        if self.mu1 <= self.mu2 {
            return Err(EngineError::Config(format!(
                "mu1 ({}) must exceed mu2 ({}): working strength must decay faster than core",
                self.mu1, self.mu2
            )));
        }
        if self.demote_threshold >= self.promote_threshold {
            return Err(EngineError::Config(format!(
                "demote_threshold ({}) must be below promote_threshold ({})",
                self.demote_threshold, self.promote_threshold
            )));
        }
        for (name, value) in [
            ("downscale_factor", self.downscale_factor),
            ("hebbian_decay", self.hebbian_decay),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(EngineError::Config(format!(
                    "{name} must be in (0, 1), got {value}"
                )));
            }
        }
        if self.forget_threshold < 0.0 {
            return Err(EngineError::Config(
                "forget_threshold must be non-negative".into(),
            ));
        }
        if self.hebbian_max_strength <= 0.0 {
            return Err(EngineError::Config(
                "hebbian_max_strength must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Preset tuned for short-lived, high-turnover chat sessions: faster
    /// decay, smaller session cache, lower forget threshold so stale chit-chat
    /// clears out quickly.
    pub fn chatbot() -> Self {
        Self {
            mu1: 0.2,
            mu2: 0.02,
            forget_threshold: 0.02,
            session_cache_capacity: 5,
            ..Self::default()
        }
    }

    /// Preset for a long-running task agent: importance and procedural
    /// knowledge should survive; decay is gentler, promotion is easier.
    pub fn task_agent() -> Self {
        Self {
            mu1: 0.08,
            mu2: 0.008,
            promote_threshold: 1.5,
            importance_weight: 0.9,
            ..Self::default()
        }
    }

    /// Preset for a personal assistant: emphasizes Hebbian association
    /// (cross-referencing the user's own facts) over raw recency.
    pub fn personal_assistant() -> Self {
        Self {
            hebbian_weight: 0.5,
            hebbian_form_threshold: 2,
            reward_magnitude: 0.4,
            ..Self::default()
        }
    }

    /// Preset for a research agent: large session cache, slow forgetting,
    /// high spreading weight so keyword-dense corpora surface context well.
    pub fn researcher() -> Self {
        Self {
            mu1: 0.05,
            mu2: 0.005,
            forget_threshold: 0.005,
            spread_weight: 0.8,
            session_cache_capacity: 12,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn all_presets_are_valid() {
        for cfg in [
            EngineConfig::chatbot(),
            EngineConfig::task_agent(),
            EngineConfig::personal_assistant(),
            EngineConfig::researcher(),
        ] {
            cfg.validate().unwrap();
        }
    }

    #[test]
    fn rejects_inverted_decay_rates() {
        let cfg = EngineConfig {
            mu1: 0.01,
            mu2: 0.1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let cfg = EngineConfig {
            promote_threshold: 0.1,
            demote_threshold: 0.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
