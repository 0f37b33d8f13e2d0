//! End-to-end seed scenarios: each covers a property the unit tests exercise
//! in isolation (recency, frequency, importance, contradiction, Hebbian
//! expansion, pin immunity), but here through the public `Engine` surface
//! against a real SQLite-backed engine.

use std::thread::sleep;
use std::time::Duration;

use mnemos_core::{AddInput, Engine, EngineConfig, Layer, RecallQuery};

fn engine() -> Engine {
    Engine::in_memory(EngineConfig::default()).unwrap()
}

/// Guarantee two `add` calls land at distinct `created_at` timestamps; SQLite
/// and chrono's `Utc::now()` resolution is coarser than back-to-back calls.
fn settle() {
    sleep(Duration::from_millis(5));
}

#[test]
fn recency_override_favors_the_later_contradicting_memory() {
    let engine = engine();

    let a = engine.add(AddInput::new("User works at Acme Corp")).unwrap();
    settle();
    let mut update = AddInput::new("User works at Globex Corp");
    update.contradicts = Some(a.clone());
    let b = engine.add(update).unwrap();

    let results = engine
        .recall(RecallQuery::new("where does the user work"))
        .unwrap();

    assert_eq!(results[0].id, b, "the later, non-contradicted memory should rank first");
    let stale = results.iter().find(|r| r.id == a).expect("superseded memory still present");
    assert!(stale.contradicted, "superseded memory should be flagged contradicted");
}

#[test]
fn frequency_reinforcement_promotes_the_repeatedly_recalled_memory() {
    let engine = engine();

    engine
        .add(AddInput::new("I ate sushi for dinner tonight"))
        .unwrap();
    for i in 0..6 {
        engine
            .add(AddInput::new(format!("pizza night was great #{i}")))
            .unwrap();
    }

    // Repeatedly recall the pizza memories so they accumulate access history
    // (and thus ACT-R base-level activation) without touching the sushi one.
    for _ in 0..5 {
        engine
            .recall(RecallQuery {
                k: 6,
                ..RecallQuery::new("pizza")
            })
            .unwrap();
    }

    let results = engine
        .recall(RecallQuery::new("dinner pizza tonight"))
        .unwrap();

    assert!(
        results[0].content.contains("pizza"),
        "repeatedly-recalled pizza memory should outrank the never-recalled sushi one, got: {}",
        results[0].content
    );
}

#[test]
fn importance_persistence_keeps_a_high_importance_memory_on_top() {
    let engine = engine();

    let mut allergy = AddInput::new("severe peanut allergy warning");
    allergy.importance = Some(0.95);
    let allergy_id = engine.add(allergy).unwrap();

    for i in 0..20 {
        engine
            .add(AddInput::new(format!("trivial episodic note {i}")))
            .unwrap();
    }

    let results = engine.recall(RecallQuery::new("food allergies")).unwrap();

    assert_eq!(results[0].id, allergy_id);
}

#[test]
fn contradiction_suppression_flags_and_discounts_the_superseded_memory() {
    let engine = engine();

    let sf = engine.add(AddInput::new("I live in San Francisco")).unwrap();
    settle();
    let mut moved = AddInput::new("I moved to Seattle");
    moved.contradicts = Some(sf.clone());
    let seattle = engine.add(moved).unwrap();

    let results = engine.recall(RecallQuery::new("where do I live")).unwrap();

    assert_eq!(results[0].id, seattle);
    let old = results.iter().find(|r| r.id == sf).expect("old memory still retrievable");
    let new = results.iter().find(|r| r.id == seattle).unwrap();
    assert!(old.contradicted);
    assert!(
        old.confidence < new.confidence,
        "contradicted memory's confidence should be discounted relative to its successor"
    );
}

#[test]
fn forget_by_threshold_preserves_contradiction_chain_roots() {
    let engine = engine();

    let sf = engine.add(AddInput::new("I live in San Francisco")).unwrap();
    settle();
    let mut moved = AddInput::new("I moved to Seattle");
    moved.contradicts = Some(sf.clone());
    engine.add(moved).unwrap();

    let plain = engine.add(AddInput::new("an unrelated, uncontradicted note")).unwrap();

    // An aggressive threshold would normally sweep everything; the
    // superseded San Francisco memory must survive because it's the root
    // of a contradiction chain (audit trail), while the unrelated one does
    // not get that exemption and is removed.
    let removed = engine.forget(None, Some(f64::MAX)).unwrap();
    assert!(removed >= 1);

    let results = engine.recall(RecallQuery::new("San Francisco")).unwrap();
    assert!(results.iter().any(|r| r.id == sf), "contradiction-chain root must survive threshold forgetting");

    let results = engine.recall(RecallQuery::new("unrelated uncontradicted note")).unwrap();
    assert!(
        !results.iter().any(|r| r.id == plain),
        "a plain, non-contradicted memory has no such exemption and should be forgotten"
    );
}

#[test]
fn hebbian_links_emerge_from_repeated_co_activation_and_expand_recall() {
    let engine = engine();

    let apple = engine.add(AddInput::new("apple pie recipe notes")).unwrap();
    let banana = engine.add(AddInput::new("banana bread recipe notes")).unwrap();

    // Co-activate the pair three times to cross the formation threshold.
    for _ in 0..3 {
        let results = engine
            .recall(RecallQuery {
                k: 2,
                ..RecallQuery::new("recipe notes")
            })
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert!(ids.contains(&apple.as_str()) && ids.contains(&banana.as_str()));
    }

    // A query that only lexically matches `apple` should still surface
    // `banana` through the Hebbian graph-expansion step.
    let results = engine
        .recall(RecallQuery {
            graph_expand: true,
            ..RecallQuery::new("apple")
        })
        .unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert!(
        ids.contains(&banana.as_str()),
        "co-activated neighbor should be pulled in via graph expansion, got: {ids:?}"
    );
}

#[test]
fn pinned_memories_survive_consolidation_and_aggressive_forgetting() {
    let engine = engine();

    let id = engine.add(AddInput::new("important pinned fact")).unwrap();
    engine.pin(&id).unwrap();

    let before = engine.recall(RecallQuery::new("important pinned fact")).unwrap();
    let before = before.iter().find(|r| r.id == id).unwrap();
    assert_eq!(before.layer, Layer::Working);

    engine.consolidate(30.0).unwrap();

    let after = engine.recall(RecallQuery::new("important pinned fact")).unwrap();
    let after = after.iter().find(|r| r.id == id).unwrap();
    assert_eq!(after.layer, Layer::Working, "pinned entries never demote");

    let removed = engine.forget(None, Some(f64::MAX)).unwrap();
    assert_eq!(removed, 0, "pinned entries must be immune to threshold-based forgetting");

    let survivors = engine.recall(RecallQuery::new("important pinned fact")).unwrap();
    assert!(survivors.iter().any(|r| r.id == id));
}

#[test]
fn empty_store_returns_empty_results_and_zero_stats() {
    let engine = engine();

    assert!(engine.recall(RecallQuery::new("anything")).unwrap().is_empty());
    engine.consolidate(1.0).unwrap();

    let stats = engine.stats().unwrap();
    assert_eq!(stats.total_entries, 0);
    assert_eq!(stats.pinned_count, 0);
    assert_eq!(stats.hebbian_link_count, 0);
}

#[test]
fn query_with_no_lexical_or_semantic_match_returns_empty() {
    let engine = engine();
    engine.add(AddInput::new("the quick brown fox")).unwrap();

    let results = engine.recall(RecallQuery::new("xyzzy plugh quux")).unwrap();
    assert!(results.is_empty());
}
