//! Stress tests driving the controller and the room layer concurrently.
//!
//! These run against the in-memory storage backend, so the timings below
//! measure contention inside the service itself rather than a database.

use std::time::{Duration, Instant};

use chrono::Utc;
use cube_arena::matches::MatchStorage;
use cube_arena::types::{MatchStatus, ServerEvent};

use crate::fixtures::{connect_recorder, create_test_system, seed_player};

#[tokio::test]
async fn test_concurrent_duel_settlements() {
    let (controller, storage, _rooms) = create_test_system().await;

    let concurrent_matches: i64 = 50;
    for i in 0..concurrent_matches {
        seed_player(&storage, i * 2 + 1, &format!("challenger{}", i), 1500).await;
        seed_player(&storage, i * 2 + 2, &format!("opponent{}", i), 1500).await;
    }

    println!("🚀 Settling {} duels concurrently", concurrent_matches);
    let start_time = Instant::now();

    let handles: Vec<_> = (0..concurrent_matches)
        .map(|i| {
            let controller = controller.clone();
            tokio::spawn(async move {
                let challenger = i * 2 + 1;
                let opponent = i * 2 + 2;

                let duel = controller.create_match(challenger, Some(opponent)).await?;
                controller.start_match(&duel.match_id, challenger).await?;

                // Both results land at once; the challenger is always faster
                let (first, second) = tokio::join!(
                    controller.submit_result(&duel.match_id, challenger, 9_000 + i),
                    controller.submit_result(&duel.match_id, opponent, 12_000 + i),
                );
                first?;
                second?;
                anyhow::Ok(duel.match_id)
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let duration = start_time.elapsed();

    let mut settled = 0;
    for result in results {
        match result {
            Ok(Ok(match_id)) => {
                let duel = storage
                    .fetch_match(&match_id)
                    .await
                    .unwrap()
                    .expect("settled match should still be stored");
                assert_eq!(duel.status, MatchStatus::Completed);
                assert!(!duel.is_draw);
                settled += 1;
            }
            Ok(Err(e)) => panic!("Duel flow failed: {}", e),
            Err(e) => panic!("Duel task panicked: {}", e),
        }
    }
    assert_eq!(settled, concurrent_matches);

    let stats = controller.get_stats();
    assert_eq!(stats.matches_created, concurrent_matches as u64);
    assert_eq!(stats.matches_completed, concurrent_matches as u64);
    assert_eq!(stats.draws_recorded, 0);

    // Each pairing was an even 1500 duel the challenger won
    let sample = storage.fetch_profile(1).await.unwrap().unwrap();
    assert_eq!(sample.rating, 1516);
    assert_eq!(sample.wins, 1);

    assert!(
        duration < Duration::from_secs(10),
        "Settlements took too long: {:?}",
        duration
    );

    println!(
        "✅ Concurrent settlement test passed - {} duels in {:?} - Throughput: {:.1} settlements/sec",
        concurrent_matches,
        duration,
        concurrent_matches as f64 / duration.as_secs_f64()
    );
}

#[tokio::test]
async fn test_concurrent_submissions_single_match() {
    let (controller, storage, _rooms) = create_test_system().await;

    seed_player(&storage, 1, "alice", 1500).await;
    seed_player(&storage, 2, "bob", 1500).await;

    // Repeat the race so both interleavings get a chance to show up
    let rounds: u32 = 20;
    let start_time = Instant::now();

    for round in 0..rounds {
        let duel = controller.create_match(1, Some(2)).await.unwrap();
        controller.start_match(&duel.match_id, 1).await.unwrap();

        let fast = tokio::spawn({
            let controller = controller.clone();
            let match_id = duel.match_id.clone();
            async move { controller.submit_result(&match_id, 1, 8_000).await }
        });
        let slow = tokio::spawn({
            let controller = controller.clone();
            let match_id = duel.match_id.clone();
            async move { controller.submit_result(&match_id, 2, 9_500).await }
        });

        let (fast, slow) = tokio::join!(fast, slow);
        fast.unwrap().unwrap();
        slow.unwrap().unwrap();

        let settled = storage
            .fetch_match(&duel.match_id)
            .await
            .unwrap()
            .expect("raced match should still be stored");
        assert_eq!(settled.status, MatchStatus::Completed);
        assert_eq!(settled.winner_id, Some(1));
        assert_eq!(settled.player1_time_ms, Some(8_000));
        assert_eq!(settled.player2_time_ms, Some(9_500));

        // Exactly one settlement per round, never zero or two
        let winner = storage.fetch_profile(1).await.unwrap().unwrap();
        assert_eq!(winner.wins, round + 1);
        assert_eq!(winner.games_played(), round + 1);
    }

    let duration = start_time.elapsed();
    let stats = controller.get_stats();
    assert_eq!(stats.matches_completed, rounds as u64);

    println!(
        "✅ Single-match race test passed - {} raced settlements in {:?}",
        rounds, duration
    );
}

#[tokio::test]
async fn test_broadcast_fanout_under_load() {
    let (_controller, _storage, rooms) = create_test_system().await;

    let member_count: i64 = 100;
    let mut sinks = Vec::new();
    for user_id in 1..=member_count {
        let (_connection_id, sink) = connect_recorder(&rooms, user_id).await;
        assert!(rooms.join(user_id, "duel-load").await);
        sinks.push(sink);
    }

    let broadcast_rounds = 50usize;
    println!(
        "🚀 Broadcasting {} rounds to {} members",
        broadcast_rounds, member_count
    );
    let start_time = Instant::now();

    for round in 0..broadcast_rounds {
        let delivered = rooms
            .broadcast(
                "duel-load",
                ServerEvent::Chat {
                    match_id: "duel-load".to_string(),
                    sender_id: 1,
                    sender_username: "alice".to_string(),
                    content: format!("round {}", round),
                    timestamp: Utc::now(),
                },
                None,
            )
            .await;
        assert_eq!(delivered, member_count as usize);
    }

    let duration = start_time.elapsed();

    for sink in &sinks {
        assert_eq!(sink.event_count(), broadcast_rounds);
    }

    let deliveries = member_count as usize * broadcast_rounds;
    assert!(
        duration < Duration::from_secs(5),
        "Fan-out took too long: {:?}",
        duration
    );

    println!(
        "✅ Fan-out test passed - {} deliveries in {:?} - Throughput: {:.1} deliveries/sec",
        deliveries,
        duration,
        deliveries as f64 / duration.as_secs_f64()
    );
}
