//! Complete match lifecycle integration tests
//!
//! These tests validate the lifecycle state machine, participant
//! authorization, rating settlement, and recovery after storage failures.

use cube_arena::config::{MatchSettings, RatingSettings};
use cube_arena::error::ArenaError;
use cube_arena::matches::{MatchController, MatchStorage, MockMatchStorage};
use cube_arena::rating::EloCalculator;
use cube_arena::registry::ConnectionRegistry;
use cube_arena::rooms::RoomMultiplexer;
use cube_arena::types::{MatchStatus, PlayerProfile};
use std::sync::Arc;
use std::time::Duration;

// Import test fixtures
use crate::fixtures::{create_test_system, seed_player};

/// System built over the mock storage, for failure injection
async fn create_flaky_system() -> (MatchController, Arc<MockMatchStorage>) {
    let storage = Arc::new(MockMatchStorage::new());
    let calculator = Arc::new(
        EloCalculator::new(RatingSettings::default()).expect("default rating settings are valid"),
    );
    let registry = Arc::new(ConnectionRegistry::new(Duration::from_millis(500)));
    let rooms = Arc::new(RoomMultiplexer::new(registry));

    let controller = MatchController::new(
        storage.clone(),
        calculator,
        rooms,
        MatchSettings::default(),
    );

    (controller, storage)
}

#[tokio::test]
async fn test_start_requires_waiting_state() {
    let (controller, storage, _rooms) = create_test_system().await;
    seed_player(&storage, 1, "alice", 1500).await;
    seed_player(&storage, 2, "bob", 1500).await;

    let duel = controller.create_match(1, Some(2)).await.unwrap();

    // Submitting before play begins is rejected
    let err = controller
        .submit_result(&duel.match_id, 1, 9_000)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ArenaError>(),
        Some(ArenaError::InvalidTransition { .. })
    ));

    controller.start_match(&duel.match_id, 1).await.unwrap();

    // Starting twice is rejected
    let err = controller.start_match(&duel.match_id, 2).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ArenaError>(),
        Some(ArenaError::InvalidTransition { .. })
    ));

    println!("✅ Start requires waiting state test passed");
}

#[tokio::test]
async fn test_only_participants_operate_on_the_match() {
    let (controller, storage, _rooms) = create_test_system().await;
    seed_player(&storage, 1, "alice", 1500).await;
    seed_player(&storage, 2, "bob", 1500).await;
    seed_player(&storage, 3, "carol", 1500).await;

    let duel = controller.create_match(1, Some(2)).await.unwrap();

    let err = controller.start_match(&duel.match_id, 3).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ArenaError>(),
        Some(ArenaError::NotParticipant {
            user_id: 3,
            ..
        })
    ));

    controller.start_match(&duel.match_id, 1).await.unwrap();

    let err = controller
        .submit_result(&duel.match_id, 3, 9_000)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ArenaError>(),
        Some(ArenaError::NotParticipant { .. })
    ));

    // Reading is open to anyone, spectators included
    let fetched = controller.get_match(&duel.match_id).await.unwrap();
    assert_eq!(fetched.match_id, duel.match_id);

    println!("✅ Only participants operate test passed");
}

#[tokio::test]
async fn test_duplicate_submission_rejected() {
    let (controller, storage, _rooms) = create_test_system().await;
    seed_player(&storage, 1, "alice", 1500).await;
    seed_player(&storage, 2, "bob", 1500).await;

    let duel = controller.create_match(1, Some(2)).await.unwrap();
    controller.start_match(&duel.match_id, 1).await.unwrap();
    controller
        .submit_result(&duel.match_id, 1, 9_000)
        .await
        .unwrap();

    let err = controller
        .submit_result(&duel.match_id, 1, 8_000)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ArenaError>(),
        Some(ArenaError::DuplicateSubmission {
            user_id: 1,
            ..
        })
    ));

    // The stored time is the first one
    let fetched = controller.get_match(&duel.match_id).await.unwrap();
    assert_eq!(fetched.player1_time_ms, Some(9_000));

    println!("✅ Duplicate submission rejected test passed");
}

#[tokio::test]
async fn test_terminal_matches_are_immutable() {
    let (controller, storage, _rooms) = create_test_system().await;
    seed_player(&storage, 1, "alice", 1500).await;
    seed_player(&storage, 2, "bob", 1500).await;

    // Complete one match fully
    let completed = controller.create_match(1, Some(2)).await.unwrap();
    controller.start_match(&completed.match_id, 1).await.unwrap();
    controller
        .submit_result(&completed.match_id, 1, 9_000)
        .await
        .unwrap();
    controller
        .submit_result(&completed.match_id, 2, 9_500)
        .await
        .unwrap();

    for result in [
        controller.start_match(&completed.match_id, 1).await,
        controller.submit_result(&completed.match_id, 1, 7_000).await,
        controller.cancel_match(&completed.match_id).await,
    ] {
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArenaError>(),
            Some(ArenaError::InvalidTransition { .. })
        ));
    }

    // Cancelled matches are just as frozen
    let cancelled = controller.create_match(1, Some(2)).await.unwrap();
    controller.cancel_match(&cancelled.match_id).await.unwrap();

    let err = controller
        .start_match(&cancelled.match_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ArenaError>(),
        Some(ArenaError::InvalidTransition { .. })
    ));
    let err = controller.cancel_match(&cancelled.match_id).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ArenaError>(),
        Some(ArenaError::InvalidTransition { .. })
    ));

    println!("✅ Terminal matches are immutable test passed");
}

#[tokio::test]
async fn test_cancel_skips_rating_settlement() {
    let (controller, storage, _rooms) = create_test_system().await;
    seed_player(&storage, 1, "alice", 1500).await;
    seed_player(&storage, 2, "bob", 1500).await;

    // Cancel mid-play, with one time already in
    let duel = controller.create_match(1, Some(2)).await.unwrap();
    controller.start_match(&duel.match_id, 1).await.unwrap();
    controller
        .submit_result(&duel.match_id, 1, 9_000)
        .await
        .unwrap();

    let cancelled = controller.cancel_match(&duel.match_id).await.unwrap();
    assert_eq!(cancelled.status, MatchStatus::Cancelled);
    assert!(cancelled.winner_id.is_none());

    // No ratings or counters moved
    let alice = storage.fetch_profile(1).await.unwrap().unwrap();
    let bob = storage.fetch_profile(2).await.unwrap().unwrap();
    assert_eq!(alice.rating, 1500);
    assert_eq!(bob.rating, 1500);
    assert_eq!(alice.games_played(), 0);
    assert_eq!(bob.games_played(), 0);

    println!("✅ Cancel skips rating settlement test passed");
}

#[tokio::test]
async fn test_settlement_applies_tiered_k_factors() {
    let (controller, storage, _rooms) = create_test_system().await;
    seed_player(&storage, 1, "upstart", 1550).await;
    seed_player(&storage, 2, "veteran", 2100).await;

    let duel = controller.create_match(1, Some(2)).await.unwrap();
    controller.start_match(&duel.match_id, 1).await.unwrap();
    controller
        .submit_result(&duel.match_id, 2, 11_000)
        .await
        .unwrap();
    let duel = controller
        .submit_result(&duel.match_id, 1, 10_200)
        .await
        .unwrap();

    assert_eq!(duel.winner_id, Some(1));

    // Upset win: the winner moves on the novice K, the loser on the
    // experienced K
    let upstart = storage.fetch_profile(1).await.unwrap().unwrap();
    let veteran = storage.fetch_profile(2).await.unwrap().unwrap();
    assert_eq!(upstart.rating, 1580);
    assert_eq!(veteran.rating, 2084);

    // Each profile folded in its own solve
    assert_eq!(upstart.best_time_ms, Some(10_200));
    assert_eq!(veteran.best_time_ms, Some(11_000));
    assert_eq!(upstart.average_time_secs, Some(10.2));
    assert_eq!(veteran.average_time_secs, Some(11.0));

    println!("✅ Settlement applies tiered K factors test passed");
}

#[tokio::test]
async fn test_settlement_failure_leaves_match_retryable() {
    let (controller, storage) = create_flaky_system().await;
    storage
        .preset_profile(PlayerProfile::new(1, "alice", 1500))
        .await;
    storage
        .preset_profile(PlayerProfile::new(2, "bob", 1500))
        .await;

    let duel = controller.create_match(1, Some(2)).await.unwrap();
    controller.start_match(&duel.match_id, 1).await.unwrap();
    controller
        .submit_result(&duel.match_id, 1, 9_000)
        .await
        .unwrap();

    // The settling submission fails at the storage layer
    storage.set_fail_complete(true);
    let err = controller
        .submit_result(&duel.match_id, 2, 9_500)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ArenaError>(),
        Some(ArenaError::StorageError { .. })
    ));

    // The match stayed active with only the first time stored
    let fetched = controller.get_match(&duel.match_id).await.unwrap();
    assert_eq!(fetched.status, MatchStatus::Active);
    assert_eq!(fetched.player1_time_ms, Some(9_000));
    assert!(fetched.player2_time_ms.is_none());

    // Retrying the same submission settles the match
    storage.set_fail_complete(false);
    let settled = controller
        .submit_result(&duel.match_id, 2, 9_500)
        .await
        .unwrap();
    assert_eq!(settled.status, MatchStatus::Completed);
    assert_eq!(settled.winner_id, Some(1));
    assert_eq!(storage.get_complete_calls().len(), 2);

    println!("✅ Settlement failure leaves match retryable test passed");
}

#[tokio::test]
async fn test_match_listing_filters() {
    let (controller, storage, _rooms) = create_test_system().await;
    seed_player(&storage, 1, "alice", 1500).await;
    seed_player(&storage, 2, "bob", 1500).await;
    seed_player(&storage, 3, "carol", 1500).await;

    let first = controller.create_match(1, Some(2)).await.unwrap();
    let second = controller.create_match(1, Some(3)).await.unwrap();
    let unrelated = controller.create_match(2, Some(3)).await.unwrap();

    controller.start_match(&second.match_id, 1).await.unwrap();
    controller
        .submit_result(&second.match_id, 1, 9_000)
        .await
        .unwrap();
    controller
        .submit_result(&second.match_id, 3, 9_500)
        .await
        .unwrap();

    // Unfiltered listing sees both of Alice's matches but not the third
    let all = controller.list_for_user(1, None, 20).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|duel| duel.match_id != unrelated.match_id));

    // Status filters narrow the listing
    let waiting = controller
        .list_for_user(1, Some(MatchStatus::Waiting), 20)
        .await
        .unwrap();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].match_id, first.match_id);

    let completed = controller
        .list_for_user(1, Some(MatchStatus::Completed), 20)
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].match_id, second.match_id);

    // The limit caps the result
    let limited = controller.list_for_user(1, None, 1).await.unwrap();
    assert_eq!(limited.len(), 1);

    println!("✅ Match listing filters test passed");
}
