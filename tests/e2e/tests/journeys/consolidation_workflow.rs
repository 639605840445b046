//! Journey: nightly consolidation
//!
//! Young, barely reviewed memories get a temporary boost that stretches
//! their review interval. The boost is gone once a memory is a week old,
//! whatever its emotional weight.

use std::sync::Arc;

use chrono::{Duration, NaiveTime, Utc};
use recollect_core::{
    ConsolidationConfig, ConsolidationScheduler, ConsolidationSweep, MemoryStore,
    ReviewCalculator,
};
use recollect_e2e_tests::TestDatabaseManager;
use tokio_util::sync::CancellationToken;

#[test]
fn test_old_memories_end_unboosted_regardless_of_weight() {
    let db = TestDatabaseManager::new_temp();
    let old = db.seed_emotional(1, Duration::days(10));
    for memory in &old {
        db.storage
            .update_consolidation(&memory.id, 0.9, db.now() - Duration::days(9))
            .unwrap();
    }
    // Never boosted, also old
    let untouched = db.save_aged(1, "Amazing trip to the coast", Duration::days(10));

    let report = ConsolidationSweep::new(db.storage.clone()).run(db.now());

    assert_eq!(report.boosts_expired, old.len() as i64);
    assert_eq!(report.failures, 0);
    for memory in old.iter().chain(std::iter::once(&untouched)) {
        assert_eq!(db.fetch(&memory.id).priority_score, 0.0, "{}", memory.content);
    }
}

#[test]
fn test_fresh_memories_are_boosted_by_age_tier() {
    let db = TestDatabaseManager::new_temp();
    let today = db.save_aged(1, "Amazing concert tonight", Duration::hours(3));
    let midweek = db.save_aged(1, "Amazing concert tonight", Duration::days(3));
    let late = db.save_aged(1, "Amazing concert tonight", Duration::days(6));

    let report = ConsolidationSweep::new(db.storage.clone()).run(db.now());
    assert_eq!(report.memories_boosted, 3);

    let weight = today.emotional_weight;
    let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
    assert!(close(db.fetch(&today.id).priority_score, 0.5 * (1.0 + weight)));
    assert!(close(db.fetch(&midweek.id).priority_score, 0.3 * (1.0 + weight)));
    assert!(close(db.fetch(&late.id).priority_score, 0.15 * (1.0 + weight)));
    assert_eq!(db.fetch(&today.id).last_consolidated_at, db.now());
}

#[test]
fn test_twice_reviewed_memories_are_not_boosted() {
    let db = TestDatabaseManager::new_temp();
    let memory = db.save_aged(1, "Learn the chord changes", Duration::days(2));
    let once = db.review(&memory, db.now() - Duration::days(1));
    db.review(&once, db.now() - Duration::hours(1));

    let report = ConsolidationSweep::new(db.storage.clone()).run(db.now());

    assert_eq!(report.memories_boosted, 0);
    assert_eq!(db.fetch(&memory.id).priority_score, 0.0);
}

#[test]
fn test_boost_stretches_the_next_review() {
    let db = TestDatabaseManager::new_temp();
    let memory = db.save_aged(1, "Neighbour's birthday next month", Duration::hours(2));
    let calculator = ReviewCalculator::new();
    let before = calculator.next_review_at(&memory, db.now());

    ConsolidationSweep::new(db.storage.clone()).run(db.now());

    let boosted = db.fetch(&memory.id);
    assert!(boosted.priority_score > 0.0);
    assert!(calculator.next_review_at(&boosted, db.now()) > before);
}

#[test]
fn test_sweep_is_recorded_and_visible_in_stats() {
    let db = TestDatabaseManager::new_temp();
    db.seed_emotional(1, Duration::hours(5));
    db.save_aged(1, "Old note", Duration::days(20));

    let report = ConsolidationSweep::new(db.storage.clone()).run(db.now());

    let history = db.reopen().last_consolidation().unwrap().unwrap();
    assert_eq!(history.completed_at, db.now());
    assert_eq!(history.memories_boosted, report.memories_boosted);
    assert_eq!(history.memories_boosted, 4);

    let stats = db
        .storage
        .stats(1, &ReviewCalculator::new(), db.now())
        .unwrap();
    assert_eq!(stats.total_memories, 5);
    assert_eq!(stats.fragile, 4);
    assert_eq!(stats.due_for_review, 1);
}

#[test]
fn test_second_sweep_is_idempotent() {
    let db = TestDatabaseManager::new_temp();
    let memory = db.save_aged(1, "Good meeting with the team", Duration::days(2));
    let sweep = ConsolidationSweep::new(db.storage.clone());

    sweep.run(db.now());
    let first = db.fetch(&memory.id).priority_score;
    sweep.run(db.now());

    assert_eq!(db.fetch(&memory.id).priority_score, first);
}

#[tokio::test]
async fn test_scheduler_runs_on_demand_and_stops() {
    let db = TestDatabaseManager::new_temp();
    // The scheduler runs on the real clock
    let fresh = db.save_at(1, "Wonderful dinner with friends", Utc::now());

    let config = ConsolidationConfig {
        run_at: NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
    };
    let sweep = ConsolidationSweep::new(Arc::clone(&db.storage)).with_config(config);
    let scheduler = ConsolidationScheduler::new(sweep);

    let report = scheduler.run_now().await.unwrap();
    assert_eq!(report.memories_boosted, 1);
    assert!(db.fetch(&fresh.id).priority_score > 0.0);

    let cancel = CancellationToken::new();
    let handle = scheduler.spawn(cancel.clone());
    cancel.cancel();
    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
