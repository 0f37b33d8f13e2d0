//! Hebbian co-activation: "entries recalled together, strengthen together."
//!
//! A link between two entries only materializes once they've been
//! co-activated `hebbian_form_threshold` times; below that it's tracked as a
//! bare counter with zero strength. Once formed, each further co-activation
//! strengthens the link multiplicatively (capped), and every consolidation
//! cycle decays all links, removing any that fall below the prune floor.

use chrono::{DateTime, Utc};

use crate::memory::HebbianLink;

/// Bump the co-activation counter for the pair `(a, b)` and, once the count
/// reaches `form_threshold`, give the link its first non-zero strength.
///
/// `existing` is `None` if no row exists yet for this pair.
pub fn co_activate(
    existing: Option<HebbianLink>,
    a: &str,
    b: &str,
    now: DateTime<Utc>,
    form_threshold: u32,
    eta: f64,
    max_strength: f64,
) -> HebbianLink {
    let (lo, hi) = HebbianLink::canonical_pair(a, b);

    let mut link = existing.unwrap_or(HebbianLink {
        a: lo,
        b: hi,
        strength: 0.0,
        co_activation_count: 0,
        created_at: now,
    });

    link.co_activation_count += 1;

    if link.co_activation_count >= form_threshold {
        if link.strength <= 0.0 {
            link.strength = eta;
        } else {
            link.strength = (link.strength * (1.0 + eta)).min(max_strength);
        }
    }

    link
}

/// Apply one cycle of multiplicative decay. Returns `None` if the link's
/// strength has fallen below `prune_floor` and should be removed.
pub fn decay(link: &HebbianLink, decay_rate: f64, prune_floor: f64) -> Option<HebbianLink> {
    let decayed_strength = link.strength * decay_rate;
    if decayed_strength < prune_floor {
        return None;
    }
    Some(HebbianLink {
        strength: decayed_strength,
        ..link.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_stays_at_zero_strength_below_form_threshold() {
        let mut link: Option<HebbianLink> = None;
        for _ in 0..2 {
            link = Some(co_activate(link, "a", "b", Utc::now(), 3, 0.1, 5.0));
        }
        assert_eq!(link.unwrap().strength, 0.0);
    }

    #[test]
    fn link_forms_at_threshold() {
        let mut link: Option<HebbianLink> = None;
        for _ in 0..3 {
            link = Some(co_activate(link, "a", "b", Utc::now(), 3, 0.1, 5.0));
        }
        let link = link.unwrap();
        assert!(link.strength > 0.0);
        assert_eq!(link.co_activation_count, 3);
    }

    #[test]
    fn link_strengthens_and_is_capped() {
        let mut link: Option<HebbianLink> = None;
        for _ in 0..200 {
            link = Some(co_activate(link, "a", "b", Utc::now(), 1, 0.5, 5.0));
        }
        assert!(link.unwrap().strength <= 5.0);
    }

    #[test]
    fn canonical_pair_independent_of_argument_order() {
        let link_ab = co_activate(None, "a", "z", Utc::now(), 1, 0.1, 5.0);
        let link_za = co_activate(None, "z", "a", Utc::now(), 1, 0.1, 5.0);
        assert_eq!(link_ab.a, link_za.a);
        assert_eq!(link_ab.b, link_za.b);
    }

    #[test]
    fn decay_removes_links_below_floor() {
        let link = HebbianLink {
            a: "a".into(),
            b: "b".into(),
            strength: 0.11,
            co_activation_count: 5,
            created_at: Utc::now(),
        };
        assert!(decay(&link, 0.5, 0.1).is_none());
    }

    #[test]
    fn decay_keeps_links_above_floor() {
        let link = HebbianLink {
            a: "a".into(),
            b: "b".into(),
            strength: 1.0,
            co_activation_count: 5,
            created_at: Utc::now(),
        };
        let decayed = decay(&link, 0.9, 0.1).unwrap();
        assert!((decayed.strength - 0.9).abs() < 1e-9);
    }
}
