//! Room membership and fan-out
//!
//! Rooms are keyed by match ID and exist only while occupied: the first
//! join creates a room and the last departure deletes it. Joining is not
//! limited to participants, so spectators can watch a match's events.
//!
//! All membership changes for one user run under that user's lock. A join
//! racing the same user's disconnect therefore lands either entirely
//! before the teardown (and is purged by it) or entirely after it (and
//! finds the connection gone), never in between.

use crate::registry::{ConnectionRegistry, EventSink};
use crate::types::{ConnectionId, DeliveryResult, MatchId, ServerEvent, UserId};
use crate::utils::KeyedLocks;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Statistics about room activity
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoomStats {
    pub total_joins: u64,
    pub total_leaves: u64,
    pub total_broadcasts: u64,
}

/// Per-match rooms layered over the connection registry
pub struct RoomMultiplexer {
    registry: Arc<ConnectionRegistry>,
    rooms: DashMap<MatchId, HashSet<UserId>>,
    memberships: DashMap<UserId, HashSet<MatchId>>,
    user_locks: KeyedLocks<UserId>,
    stats: Arc<RwLock<RoomStats>>,
}

impl RoomMultiplexer {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            rooms: DashMap::new(),
            memberships: DashMap::new(),
            user_locks: KeyedLocks::new(),
            stats: Arc::new(RwLock::new(RoomStats::default())),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Register a user's connection, superseding any previous one
    pub async fn connect(
        &self,
        user_id: UserId,
        username: String,
        sink: Arc<dyn EventSink>,
    ) -> ConnectionId {
        let _guard = self.user_locks.acquire(user_id).await;
        self.registry.register(user_id, username, sink)
    }

    /// Tear down a connection if it is still the user's current one.
    ///
    /// Returns true when this call removed the live connection, in which
    /// case all of the user's room memberships are purged as well. A
    /// superseded socket task calling in with its stale ID changes nothing.
    pub async fn disconnect(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let _guard = self.user_locks.acquire(user_id).await;

        if !self.registry.unregister_if(user_id, connection_id) {
            debug!(
                "Stale disconnect for user {} (connection {}), ignoring",
                user_id, connection_id
            );
            return false;
        }

        self.purge_memberships(user_id);
        true
    }

    /// Unconditionally drop a user's connection and memberships
    pub async fn force_disconnect(&self, user_id: UserId) -> bool {
        let _guard = self.user_locks.acquire(user_id).await;

        let had_connection = self.registry.unregister(user_id);
        self.purge_memberships(user_id);
        had_connection
    }

    /// Add a connected user to a match room, creating the room on first join.
    ///
    /// Returns false when the user has no live connection.
    pub async fn join(&self, user_id: UserId, match_id: &str) -> bool {
        let _guard = self.user_locks.acquire(user_id).await;

        if !self.registry.is_connected(user_id) {
            debug!(
                "User {} has no live connection, not joining room {}",
                user_id, match_id
            );
            return false;
        }

        self.rooms
            .entry(match_id.to_string())
            .or_default()
            .insert(user_id);
        self.memberships
            .entry(user_id)
            .or_default()
            .insert(match_id.to_string());

        if let Ok(mut stats) = self.stats.write() {
            stats.total_joins += 1;
        }

        debug!("User {} joined room {}", user_id, match_id);
        true
    }

    /// Remove a user from a match room, deleting the room if it empties
    pub async fn leave(&self, user_id: UserId, match_id: &str) {
        let _guard = self.user_locks.acquire(user_id).await;

        self.remove_member(match_id, user_id);

        let mut membership_empty = false;
        if let Some(mut rooms) = self.memberships.get_mut(&user_id) {
            rooms.remove(match_id);
            membership_empty = rooms.is_empty();
        }
        if membership_empty {
            self.memberships.remove_if(&user_id, |_, rooms| rooms.is_empty());
        }

        if let Ok(mut stats) = self.stats.write() {
            stats.total_leaves += 1;
        }

        debug!("User {} left room {}", user_id, match_id);
    }

    /// Push an event to every room member except `exclude`.
    ///
    /// Returns how many members the event was delivered to. Drops are
    /// logged by the registry and do not interrupt the fan-out.
    pub async fn broadcast(
        &self,
        match_id: &str,
        event: ServerEvent,
        exclude: Option<UserId>,
    ) -> usize {
        // Snapshot membership so no map guard is held while sending
        let members: Vec<UserId> = match self.rooms.get(match_id) {
            Some(members) => members.iter().copied().collect(),
            None => return 0,
        };

        if let Ok(mut stats) = self.stats.write() {
            stats.total_broadcasts += 1;
        }

        let mut delivered = 0;
        for member in members {
            if Some(member) == exclude {
                continue;
            }
            if self.registry.send_to(member, event.clone()).await == DeliveryResult::Delivered {
                delivered += 1;
            }
        }

        delivered
    }

    /// Current members of a room
    pub fn members(&self, match_id: &str) -> Vec<UserId> {
        self.rooms
            .get(match_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Rooms the user currently belongs to
    pub fn rooms_of(&self, user_id: UserId) -> Vec<MatchId> {
        self.memberships
            .get(&user_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Get current room statistics
    pub fn get_stats(&self) -> RoomStats {
        self.stats
            .read()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    /// Drop per-user lock entries that no task currently holds
    pub fn prune_locks(&self) {
        self.user_locks.prune();
    }

    fn purge_memberships(&self, user_id: UserId) {
        let rooms: Vec<MatchId> = match self.memberships.remove(&user_id) {
            Some((_, rooms)) => rooms.into_iter().collect(),
            None => return,
        };

        for match_id in rooms {
            self.remove_member(&match_id, user_id);
        }

        debug!("Purged room memberships for user {}", user_id);
    }

    fn remove_member(&self, match_id: &str, user_id: UserId) {
        let mut room_empty = false;
        if let Some(mut members) = self.rooms.get_mut(match_id) {
            members.remove(&user_id);
            room_empty = members.is_empty();
        }
        if room_empty {
            // Re-checked under the shard lock in case someone joined meanwhile
            self.rooms.remove_if(match_id, |_, members| members.is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RecordingEventSink;
    use std::time::Duration;

    fn test_multiplexer() -> RoomMultiplexer {
        RoomMultiplexer::new(Arc::new(ConnectionRegistry::new(Duration::from_secs(1))))
    }

    async fn connect_user(
        rooms: &RoomMultiplexer,
        user_id: UserId,
    ) -> (ConnectionId, Arc<RecordingEventSink>) {
        let sink = Arc::new(RecordingEventSink::new());
        let connection_id = rooms
            .connect(user_id, format!("user{}", user_id), sink.clone())
            .await;
        (connection_id, sink)
    }

    fn chat_event(match_id: &str) -> ServerEvent {
        ServerEvent::Chat {
            match_id: match_id.to_string(),
            sender_id: 99,
            sender_username: "commentator".to_string(),
            content: "nice solve".to_string(),
            timestamp: crate::utils::current_timestamp(),
        }
    }

    #[tokio::test]
    async fn test_join_creates_room_and_reverse_mapping() {
        let rooms = test_multiplexer();
        let _ = connect_user(&rooms, 1).await;

        assert!(rooms.join(1, "m1").await);
        assert_eq!(rooms.room_count(), 1);
        assert_eq!(rooms.members("m1"), vec![1]);
        assert_eq!(rooms.rooms_of(1), vec!["m1".to_string()]);

        // Joining again is idempotent
        assert!(rooms.join(1, "m1").await);
        assert_eq!(rooms.members("m1").len(), 1);
    }

    #[tokio::test]
    async fn test_join_requires_live_connection() {
        let rooms = test_multiplexer();

        assert!(!rooms.join(1, "m1").await);
        assert_eq!(rooms.room_count(), 0);
        assert!(rooms.rooms_of(1).is_empty());
    }

    #[tokio::test]
    async fn test_room_deleted_when_last_member_leaves() {
        let rooms = test_multiplexer();
        let _ = connect_user(&rooms, 1).await;
        let _ = connect_user(&rooms, 2).await;

        rooms.join(1, "m1").await;
        rooms.join(2, "m1").await;

        rooms.leave(1, "m1").await;
        assert_eq!(rooms.room_count(), 1);
        assert_eq!(rooms.members("m1"), vec![2]);

        rooms.leave(2, "m1").await;
        assert_eq!(rooms.room_count(), 0);
        assert!(rooms.members("m1").is_empty());
    }

    #[tokio::test]
    async fn test_leave_without_membership_is_a_noop() {
        let rooms = test_multiplexer();
        let _ = connect_user(&rooms, 1).await;
        let _ = connect_user(&rooms, 2).await;

        rooms.join(1, "m1").await;

        // Leaving a room the user never joined changes nothing
        rooms.leave(2, "m1").await;
        assert_eq!(rooms.members("m1"), vec![1]);

        // Leaving a room that does not exist changes nothing
        rooms.leave(1, "missing").await;
        assert_eq!(rooms.room_count(), 1);
        assert_eq!(rooms.rooms_of(1), vec!["m1".to_string()]);
    }

    #[tokio::test]
    async fn test_disconnect_purges_all_memberships() {
        let rooms = test_multiplexer();
        let (conn1, _) = connect_user(&rooms, 1).await;
        let _ = connect_user(&rooms, 2).await;

        rooms.join(1, "m1").await;
        rooms.join(1, "m2").await;
        rooms.join(2, "m1").await;

        assert!(rooms.disconnect(1, conn1).await);

        // User 1 is gone from every room, user 2 is untouched
        assert!(rooms.rooms_of(1).is_empty());
        assert_eq!(rooms.members("m1"), vec![2]);
        // Room m2 emptied and was deleted
        assert_eq!(rooms.room_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_disconnect_is_ignored() {
        let rooms = test_multiplexer();
        let (old_conn, _) = connect_user(&rooms, 1).await;

        // Reconnect supersedes, then the old socket task tears down late
        let (new_conn, _) = connect_user(&rooms, 1).await;
        rooms.join(1, "m1").await;

        assert!(!rooms.disconnect(1, old_conn).await);

        // The new connection and its membership survive
        assert!(rooms.registry().is_connected(1));
        assert_eq!(rooms.members("m1"), vec![1]);

        assert!(rooms.disconnect(1, new_conn).await);
        assert!(rooms.members("m1").is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        let rooms = test_multiplexer();
        let (_, sink1) = connect_user(&rooms, 1).await;
        let (_, sink2) = connect_user(&rooms, 2).await;
        let (_, sink3) = connect_user(&rooms, 3).await;

        rooms.join(1, "m1").await;
        rooms.join(2, "m1").await;
        // User 3 is connected but not in the room

        let delivered = rooms.broadcast("m1", chat_event("m1"), Some(1)).await;
        assert_eq!(delivered, 1);
        assert_eq!(sink1.event_count(), 0);
        assert_eq!(sink2.event_count(), 1);
        assert_eq!(sink3.event_count(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_without_exclusion_reaches_everyone() {
        let rooms = test_multiplexer();
        let (_, sink1) = connect_user(&rooms, 1).await;
        let (_, sink2) = connect_user(&rooms, 2).await;

        rooms.join(1, "m1").await;
        rooms.join(2, "m1").await;

        let delivered = rooms.broadcast("m1", chat_event("m1"), None).await;
        assert_eq!(delivered, 2);
        assert_eq!(sink1.event_count(), 1);
        assert_eq!(sink2.event_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_to_unknown_room() {
        let rooms = test_multiplexer();
        assert_eq!(rooms.broadcast("missing", chat_event("missing"), None).await, 0);
    }

    #[tokio::test]
    async fn test_force_disconnect() {
        let rooms = test_multiplexer();
        let _ = connect_user(&rooms, 1).await;
        rooms.join(1, "m1").await;

        assert!(rooms.force_disconnect(1).await);
        assert!(!rooms.registry().is_connected(1));
        assert!(rooms.rooms_of(1).is_empty());
        assert!(!rooms.force_disconnect(1).await);
    }
}
