//! Periodic consolidation: decay, transfer, interleaved replay, layer
//! transitions, global downscale, and Hebbian decay — run in that order,
//! per entry, as one logical pass.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::config::EngineConfig;
use crate::forgetting;
use crate::hebbian;
use crate::memory::{ConsolidationReport, Layer, MemoryEntry};
use crate::storage::Store;

/// Recency bucket an entry falls into for interleaved-replay sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RecencyBucket {
    LastDay,
    LastWeek,
    Older,
}

fn bucket_for(entry: &MemoryEntry, now: DateTime<Utc>) -> RecencyBucket {
    let age = forgetting::elapsed_days(entry.created_at, now);
    if age <= 1.0 {
        RecencyBucket::LastDay
    } else if age <= 7.0 {
        RecencyBucket::LastWeek
    } else {
        RecencyBucket::Older
    }
}

/// Run one consolidation pass over every entry in `store`, advancing
/// simulated time by `delta_t` days.
pub fn run<R: Rng>(
    store: &Store,
    config: &EngineConfig,
    delta_t: f64,
    now: DateTime<Utc>,
    rng: &mut R,
) -> crate::error::Result<ConsolidationReport> {
    let mut report = ConsolidationReport::default();
    let entries = store.all_entries()?;

    let replay_targets = select_replay_targets(&entries, now, config, rng);

    for mut entry in entries {
        report.entries_processed += 1;

        if !entry.pinned {
            // 1. Decay step.
            entry.working_strength = forgetting::decay_trace(entry.working_strength, config.mu1, delta_t);
            entry.core_strength = forgetting::decay_trace(entry.core_strength, config.mu2, delta_t);

            // 2. Transfer step.
            entry.core_strength +=
                config.alpha * entry.working_strength * delta_t * (1.0 + entry.importance);

            // 3. Interleaved replay.
            if replay_targets.contains(&entry.id) {
                entry.working_strength += config.replay_boost;
            }

            // 4. Layer transitions.
            let stability = forgetting::stability(
                forgetting::base_stability_for_kind(entry.kind),
                entry.consolidation_count,
                entry.importance,
                config.stability_beta,
                config.stability_gamma,
            );
            let elapsed = forgetting::elapsed_days(entry.created_at, now);
            let retrievability = forgetting::retrievability(elapsed * 86_400.0, stability * 86_400.0);
            let effective = forgetting::effective_strength(
                entry.working_strength,
                entry.core_strength,
                retrievability,
            );

            if entry.core_strength >= config.promote_threshold && entry.layer != Layer::Core {
                entry.layer = Layer::Core;
                report.entries_promoted += 1;
            } else if effective < config.demote_threshold && entry.layer == Layer::Working {
                entry.layer = Layer::Archive;
                report.entries_demoted += 1;
            }

            // 5. Global downscale.
            entry.working_strength *= config.downscale_factor;
            entry.core_strength *= config.downscale_factor;
        }

        // 6. Bookkeeping.
        entry.consolidation_count += 1;
        entry.last_consolidated = Some(now);

        // Pruning pass: `E < forget_threshold AND NOT pinned AND NOT
        // contradicts_chain_root` — a superseded entry (one something else
        // now contradicts) is kept regardless of strength so the
        // correction chain stays auditable.
        let stability = forgetting::stability(
            forgetting::base_stability_for_kind(entry.kind),
            entry.consolidation_count,
            entry.importance,
            config.stability_beta,
            config.stability_gamma,
        );
        let elapsed = forgetting::elapsed_days(entry.created_at, now);
        let retrievability = forgetting::retrievability(elapsed * 86_400.0, stability * 86_400.0);
        let effective =
            forgetting::effective_strength(entry.working_strength, entry.core_strength, retrievability);

        if forgetting::should_prune(effective, entry.pinned, entry.is_contradicted(), config.forget_threshold) {
            if store.delete(&entry.id).unwrap_or(false) {
                report.entries_pruned += 1;
            }
            continue;
        }

        if store.update(&entry).is_err() {
            report.failures += 1;
        }
    }

    // Hebbian decay.
    if config.hebbian_enabled {
        for link in store.hebbian_all()? {
            match hebbian::decay(&link, config.hebbian_decay, config.hebbian_prune_floor) {
                Some(decayed) => {
                    store.hebbian_upsert(&decayed)?;
                    report.hebbian_links_decayed += 1;
                }
                None => {
                    store.hebbian_delete(&link.a, &link.b)?;
                    report.hebbian_links_removed += 1;
                }
            }
        }
    }

    Ok(report)
}

/// Sample entries for replay weighted by recency bucket: 50% from the last
/// day, 30% from 1-7 days, 20% older (configurable).
fn select_replay_targets<R: Rng>(
    entries: &[MemoryEntry],
    now: DateTime<Utc>,
    config: &EngineConfig,
    rng: &mut R,
) -> std::collections::HashSet<String> {
    let mut by_bucket: std::collections::HashMap<RecencyBucket, Vec<&MemoryEntry>> =
        std::collections::HashMap::new();
    for entry in entries {
        by_bucket.entry(bucket_for(entry, now)).or_default().push(entry);
    }

    let total = entries.len();
    let sample_count = |ratio: f64| ((total as f64) * ratio).round() as usize;

    let mut targets = std::collections::HashSet::new();
    for (bucket, ratio) in [
        (RecencyBucket::LastDay, config.replay_ratio_recent),
        (RecencyBucket::LastWeek, config.replay_ratio_week),
        (RecencyBucket::Older, config.replay_ratio_older),
    ] {
        if let Some(pool) = by_bucket.get(&bucket) {
            let n = sample_count(ratio).min(pool.len());
            let mut indices: Vec<usize> = (0..pool.len()).collect();
            // Fisher-Yates partial shuffle.
            for i in 0..n {
                let j = rng.gen_range(i..indices.len());
                indices.swap(i, j);
            }
            for &idx in &indices[..n] {
                targets.insert(pool[idx].id.clone());
            }
        }
    }
    targets
}
