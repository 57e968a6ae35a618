//! Performance benchmarks for rating calculations

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cube_arena::config::RatingSettings;
use cube_arena::matches::{InMemoryMatchStorage, MatchController, MatchStorage};
use cube_arena::rating::{EloCalculator, RatingCalculator};
use cube_arena::registry::ConnectionRegistry;
use cube_arena::rooms::RoomMultiplexer;
use cube_arena::types::PlayerProfile;
use std::sync::Arc;
use std::time::Duration;

fn create_bench_system() -> (MatchController, Arc<InMemoryMatchStorage>) {
    let storage = Arc::new(InMemoryMatchStorage::new());
    let calculator =
        Arc::new(EloCalculator::new(RatingSettings::default()).expect("valid default settings"));
    let registry = Arc::new(ConnectionRegistry::new(Duration::from_secs(5)));
    let rooms = Arc::new(RoomMultiplexer::new(registry));

    let controller = MatchController::new(
        storage.clone(),
        calculator,
        rooms,
        cube_arena::config::MatchSettings::default(),
    );

    (controller, storage)
}

fn bench_rating_calculations(c: &mut Criterion) {
    let calculator = EloCalculator::new(RatingSettings::default()).unwrap();

    // Pairings across the K-factor tiers
    let pairings = vec![
        (1500, 1400),
        (1900, 1950),
        (2200, 2100),
        (1000, 2400),
    ];

    c.bench_function("rating_calculation_duel", |b| {
        b.iter(|| {
            for (winner, loser) in &pairings {
                black_box(calculator.rate_duel(*winner, *loser, 1.0, 0.0)).unwrap();
            }
        })
    });

    c.bench_function("rating_calculation_draw", |b| {
        b.iter(|| black_box(calculator.rate_duel(1500, 1700, 0.5, 0.5)).unwrap())
    });
}

fn bench_single_match_creation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("single_match_creation", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (controller, storage) = create_bench_system();
                storage
                    .upsert_profile(PlayerProfile::new(1, "bench_challenger", 1500))
                    .await
                    .unwrap();
                storage
                    .upsert_profile(PlayerProfile::new(2, "bench_opponent", 1500))
                    .await
                    .unwrap();

                black_box(controller.create_match(1, Some(2)).await)
            })
        })
    });
}

fn bench_controller_statistics(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("controller_statistics", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (controller, storage) = create_bench_system();

                // Add some load first
                for i in 0..5i64 {
                    let challenger = i * 2 + 1;
                    let opponent = i * 2 + 2;
                    storage
                        .upsert_profile(PlayerProfile::new(
                            challenger,
                            format!("challenger_{}", i),
                            1500 + (i as i32 * 10),
                        ))
                        .await
                        .unwrap();
                    storage
                        .upsert_profile(PlayerProfile::new(
                            opponent,
                            format!("opponent_{}", i),
                            1500,
                        ))
                        .await
                        .unwrap();
                    let _ = controller.create_match(challenger, Some(opponent)).await;
                }

                black_box(controller.get_stats())
            })
        })
    });
}

criterion_group!(
    benches,
    bench_rating_calculations,
    bench_single_match_creation,
    bench_controller_statistics
);
criterion_main!(benches);
