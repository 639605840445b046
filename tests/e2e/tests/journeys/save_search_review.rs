//! Journey: save a note, find it again, get it back for review
//!
//! Covers the path a user takes day to day: notes are saved with their
//! emotional weight and tags, found through the search cascade, and sent
//! back by the review dispatcher once they are due.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use recollect_core::{
    CascadeSearch, Delivery, DispatchConfig, EmotionCategory, MemoryStore, ReviewCalculator,
    ReviewDispatcher, SearchQuery, StorageError, Strategy,
};
use recollect_daemon::ConsoleMessenger;
use recollect_e2e_tests::{FailingIndex, RecordingMessenger, TestDatabaseManager};

fn instant_dispatch() -> DispatchConfig {
    DispatchConfig {
        delivery_delay: StdDuration::ZERO,
        ..DispatchConfig::default()
    }
}

// ============================================================================
// SAVE AND SEARCH
// ============================================================================

#[test]
fn test_saved_note_is_found_by_prefix() {
    let db = TestDatabaseManager::new_temp();
    let memory = db.save(42, "Amazing day at work! #win");

    assert!(memory.emotional_weight >= 0.7);
    assert!(matches!(
        EmotionCategory::from_weight(memory.emotional_weight),
        EmotionCategory::Strong | EmotionCategory::Intense
    ));
    assert_eq!(memory.tags, vec!["win".to_string()]);

    let search = CascadeSearch::new(db.storage.clone());
    let outcome = search.search_at(&SearchQuery::new(42, "amaz"), &db.now());

    assert_eq!(outcome.strategy, Some(Strategy::PrimaryWildcard));
    assert_eq!(outcome.memories()[0].id, memory.id);
}

#[test]
fn test_hashtag_search_matches_tag() {
    let db = TestDatabaseManager::new_temp();
    let tagged = db.save(1, "Shipped the release #win");
    db.save(1, "Lost my keys");

    let search = CascadeSearch::new(db.storage.clone());
    let outcome = search.search_at(&SearchQuery::new(1, "#win"), &db.now());

    assert_eq!(outcome.strategy, Some(Strategy::HashtagExact));
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].memory.id, tagged.id);
}

#[test]
fn test_search_is_scoped_to_owner() {
    let db = TestDatabaseManager::new_temp();
    db.save(1, "Amazing sunset at the beach");

    let search = CascadeSearch::new(db.storage.clone());
    let outcome = search.search_at(&SearchQuery::new(2, "sunset"), &db.now());

    assert!(outcome.is_empty());
    assert_eq!(outcome.strategy, None);
}

#[test]
fn test_context_cues_filter_by_encoding_time() {
    let db = TestDatabaseManager::new_temp();
    // The test clock is Wednesday 2026-06-10
    let monday = db.save_at(1, "standup notes", Utc.with_ymd_and_hms(2026, 6, 8, 9, 0, 0).unwrap());
    let tuesday = db.save_at(1, "standup retro", Utc.with_ymd_and_hms(2026, 6, 9, 15, 0, 0).unwrap());

    let search = CascadeSearch::new(db.storage.clone());

    let outcome = search.search_at(&SearchQuery::new(1, "standup monday"), &db.now());
    assert_eq!(outcome.strategy, Some(Strategy::Contextual));
    assert_eq!(outcome.memories().len(), 1);
    assert_eq!(outcome.memories()[0].id, monday.id);

    let outcome = search.search_at(&SearchQuery::new(1, "retro tuesday"), &db.now());
    assert_eq!(outcome.strategy, Some(Strategy::Contextual));
    assert_eq!(outcome.memories()[0].id, tuesday.id);
}

#[test]
fn test_cue_word_in_content_is_still_found() {
    let db = TestDatabaseManager::new_temp();
    let call = db.save_at(
        1,
        "called mom yesterday about dinner",
        Utc.with_ymd_and_hms(2026, 6, 8, 18, 30, 0).unwrap(),
    );
    db.save_at(
        1,
        "dentist appointment booked",
        Utc.with_ymd_and_hms(2026, 6, 9, 10, 0, 0).unwrap(),
    );

    // Nothing written yesterday mentions the word, so the unfiltered
    // wildcard finds the Monday note
    let search = CascadeSearch::new(db.storage.clone());
    let outcome = search.search_at(&SearchQuery::new(1, "yesterday"), &db.now());

    assert_eq!(outcome.strategy, Some(Strategy::PrimaryWildcard));
    assert_eq!(outcome.memories().len(), 1);
    assert_eq!(outcome.memories()[0].id, call.id);
}

#[test]
fn test_cascade_falls_back_to_partial_words() {
    let db = TestDatabaseManager::new_temp();
    let memory = db.save(1, "Quarterly budget review with finance");

    let search = CascadeSearch::new(db.storage.clone());
    let outcome = search.search_at(&SearchQuery::new(1, "budget planning"), &db.now());

    assert_eq!(outcome.strategy, Some(Strategy::PerWordPartial));
    assert_eq!(outcome.memories()[0].id, memory.id);
}

#[test]
fn test_pathological_queries_never_fail() {
    let db = TestDatabaseManager::new_temp();
    db.seed_notes(1, 3);

    let search = CascadeSearch::new(db.storage.clone());
    for keyword in ["", "   ", "((^-+", "\"unbalanced", "NEAR(", "*", "a OR", "-budget"] {
        let outcome = search.search_at(&SearchQuery::new(1, keyword), &db.now());
        assert!(outcome.results.len() <= 3, "query {keyword:?}");
    }
}

#[test]
fn test_failing_index_tries_every_strategy() {
    let index = Arc::new(FailingIndex::new());
    let search = CascadeSearch::new(index.clone());
    let now = Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap();

    let outcome = search.search_at(&SearchQuery::new(1, "budget planning"), &now);

    assert!(outcome.is_empty());
    assert_eq!(outcome.strategy, None);
    // wildcard, strict AND, two partials, any word, proximity
    assert_eq!(index.calls().len(), 6);
}

#[test]
fn test_search_pages() {
    let db = TestDatabaseManager::new_temp();
    db.seed_notes(1, 12);

    let search = CascadeSearch::new(db.storage.clone());
    let first = search.search_page_at(&SearchQuery::new(1, "budget").with_limit(5), &db.now());
    assert_eq!(first.results.len(), 5);
    assert!(first.has_more);

    let last = search.search_page_at(
        &SearchQuery::new(1, "budget").with_limit(5).with_offset(10),
        &db.now(),
    );
    assert_eq!(last.results.len(), 2);
    assert!(!last.has_more);

    let first_ids: Vec<_> = first.results.iter().map(|r| r.memory.id.clone()).collect();
    assert!(last.results.iter().all(|r| !first_ids.contains(&r.memory.id)));
}

#[test]
fn test_delete_is_owner_scoped_and_leaves_index() {
    let db = TestDatabaseManager::new_temp();
    let memory = db.save(1, "Secret recipe for dumplings");

    let err = db.storage.delete(&memory.id, 2).unwrap_err();
    assert!(matches!(err, StorageError::Unauthorized { .. }));
    assert_eq!(db.count(1), 1);

    db.storage.delete(&memory.id, 1).unwrap();
    assert_eq!(db.count(1), 0);

    let search = CascadeSearch::new(db.storage.clone());
    assert!(search.search_at(&SearchQuery::new(1, "dumplings"), &db.now()).is_empty());
}

#[test]
fn test_memories_survive_reopen() {
    let db = TestDatabaseManager::new_temp();
    let memory = db.save(5, "Remember the anniversary #family");

    let reopened = db.reopen();
    let stored = reopened.get(&memory.id).unwrap().unwrap();
    assert_eq!(stored, memory);
}

// ============================================================================
// REVIEW
// ============================================================================

#[tokio::test]
async fn test_due_memory_is_delivered_and_marked() {
    let db = TestDatabaseManager::new_temp();
    let due = db.save_aged(1, "Call the plumber", Duration::days(2));
    let fresh = db.save_aged(1, "Brand new thought", Duration::hours(1));

    let messenger = Arc::new(RecordingMessenger::new());
    let dispatcher = ReviewDispatcher::new(db.storage.clone(), messenger.clone(), ReviewCalculator::new())
        .with_config(instant_dispatch());

    let report = dispatcher.run_once(db.now()).await;
    assert_eq!(report.owners, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(messenger.reviewed_ids(), vec![due.id.clone()]);

    let stored = db.fetch(&due.id);
    assert_eq!(stored.review_count, 1);
    assert_eq!(stored.last_reviewed_at, Some(db.now()));
    assert_eq!(db.fetch(&fresh.id).review_count, 0);

    // Sessions go to the owner's channel
    let sent = messenger.sent();
    let (channel, first) = &sent[0];
    assert_eq!(*channel, 10);
    assert!(matches!(first, Delivery::SessionStarted { owner_id: 1, due: 1 }));

    // Nothing is due again straight away
    let again = dispatcher.run_once(db.now()).await;
    assert_eq!(again.delivered, 0);

    // Both come back a few days later
    let later = dispatcher.run_once(db.now() + Duration::days(4)).await;
    assert_eq!(later.delivered, 2);
    assert_eq!(db.fetch(&due.id).review_count, 2);
}

#[tokio::test]
async fn test_failed_delivery_keeps_memory_due() {
    let db = TestDatabaseManager::new_temp();
    let memory = db.save_aged(2, "Pay rent", Duration::days(3));

    let messenger = Arc::new(RecordingMessenger::new().with_unreachable(20));
    let calculator = ReviewCalculator::new();
    let dispatcher = ReviewDispatcher::new(db.storage.clone(), messenger.clone(), calculator.clone())
        .with_config(instant_dispatch());

    let report = dispatcher.run_once(db.now()).await;
    assert_eq!(report.delivered, 0);
    assert_eq!(report.failed, 1);

    assert_eq!(db.fetch(&memory.id).review_count, 0);
    let still_due = db.storage.due_for_review(&calculator, db.now(), 10).unwrap();
    assert!(still_due.iter().any(|m| m.id == memory.id));
}

#[tokio::test]
async fn test_session_size_defers_the_rest() {
    let db = TestDatabaseManager::new_temp();
    for i in 0..7 {
        db.save_aged(3, &format!("Backlog item {i}"), Duration::days(5 + i));
    }

    let messenger = Arc::new(RecordingMessenger::new());
    let dispatcher = ReviewDispatcher::new(db.storage.clone(), messenger.clone(), ReviewCalculator::new())
        .with_config(instant_dispatch());

    let report = dispatcher.run_once(db.now()).await;
    assert_eq!(report.delivered, 5);
    assert_eq!(report.deferred, 2);

    let sent = messenger.sent();
    assert!(sent.iter().any(|(_, d)| matches!(d, Delivery::Remaining { owner_id: 3, count: 2 })));
    assert!(matches!(
        sent.last(),
        Some((30, Delivery::SessionFinished { owner_id: 3, delivered: 5 }))
    ));

    // Longest waiting first
    let reviewed = messenger.reviewed_ids();
    let oldest = db.storage.recent(3, 10).unwrap().pop().unwrap();
    assert_eq!(reviewed[0], oldest.id);
}

#[tokio::test]
async fn test_console_session_transcript() {
    let db = TestDatabaseManager::new_temp();
    db.save_aged(4, "Book the vet appointment", Duration::days(2));

    let console = Arc::new(ConsoleMessenger::new(Vec::new()));
    let dispatcher = ReviewDispatcher::new(db.storage.clone(), console.clone(), ReviewCalculator::new())
        .with_config(instant_dispatch());
    let report = dispatcher.run_once(db.now()).await;
    drop(dispatcher);

    assert_eq!(report.delivered, 1);
    let transcript = Arc::try_unwrap(console).ok().unwrap().into_inner();
    let transcript = String::from_utf8(transcript).unwrap();
    assert!(transcript.contains("[channel 40]"));
    assert!(transcript.contains("Book the vet appointment"));
    assert!(transcript.contains("Session complete: 1 reviewed"));
}
