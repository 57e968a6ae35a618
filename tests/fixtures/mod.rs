//! Test fixtures and shared system builders for integration testing

use cube_arena::config::{MatchSettings, RatingSettings};
use cube_arena::matches::{InMemoryMatchStorage, MatchController, MatchStorage};
use cube_arena::rating::EloCalculator;
use cube_arena::registry::{ConnectionRegistry, RecordingEventSink};
use cube_arena::rooms::RoomMultiplexer;
use cube_arena::types::{ConnectionId, PlayerProfile, ServerEvent, UserId};
use std::sync::Arc;
use std::time::Duration;

/// Integration test setup that creates a complete in-memory system,
/// wired the same way the service wires it
pub async fn create_test_system() -> (
    MatchController,
    Arc<InMemoryMatchStorage>,
    Arc<RoomMultiplexer>,
) {
    let storage = Arc::new(InMemoryMatchStorage::new());
    let calculator = Arc::new(
        EloCalculator::new(RatingSettings::default()).expect("default rating settings are valid"),
    );
    let registry = Arc::new(ConnectionRegistry::new(Duration::from_millis(500)));
    let rooms = Arc::new(RoomMultiplexer::new(registry));

    let controller = MatchController::new(
        storage.clone(),
        calculator,
        rooms.clone(),
        MatchSettings::default(),
    );

    (controller, storage, rooms)
}

/// Seed a profile so the user exists for opponent checks and settlements
pub async fn seed_player(
    storage: &InMemoryMatchStorage,
    user_id: UserId,
    username: &str,
    rating: i32,
) {
    storage
        .upsert_profile(PlayerProfile::new(user_id, username, rating))
        .await
        .expect("seeding a profile should succeed");
}

/// Register a connection backed by a recording sink, so tests can observe
/// exactly what the service pushed toward that user
pub async fn connect_recorder(
    rooms: &RoomMultiplexer,
    user_id: UserId,
) -> (ConnectionId, Arc<RecordingEventSink>) {
    let sink = Arc::new(RecordingEventSink::new());
    let connection_id = rooms
        .connect(user_id, format!("user{}", user_id), sink.clone())
        .await;
    (connection_id, sink)
}

/// Count captured events of a specific wire kind
pub fn count_events_of_kind(events: &[ServerEvent], kind: &str) -> usize {
    events.iter().filter(|event| event.kind() == kind).count()
}
