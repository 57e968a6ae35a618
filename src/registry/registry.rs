//! Connection registry tracking each user's live connection
//!
//! At most one connection is live per user. Registering a new connection
//! supersedes the previous one without ever waiting on its transport: the
//! old handle is simply dropped, which closes the superseded writer's
//! channel and lets its socket task wind down on its own.

use crate::registry::connection::{ConnectionHandle, EventSink};
use crate::types::{ConnectionId, DeliveryResult, ServerEvent, UserId};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

/// Statistics about registry activity
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryStats {
    pub total_registered: u64,
    pub total_superseded: u64,
    pub events_delivered: u64,
    pub events_dropped: u64,
}

/// Registry of live connections, keyed by user
pub struct ConnectionRegistry {
    connections: DashMap<UserId, ConnectionHandle>,
    send_timeout: Duration,
    stats: Arc<RwLock<RegistryStats>>,
}

impl ConnectionRegistry {
    /// Create a new registry with the given per-destination send timeout
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            connections: DashMap::new(),
            send_timeout,
            stats: Arc::new(RwLock::new(RegistryStats::default())),
        }
    }

    /// Register a user's connection, superseding any previous one.
    ///
    /// Returns the ID assigned to the new connection.
    pub fn register(
        &self,
        user_id: UserId,
        username: String,
        sink: Arc<dyn EventSink>,
    ) -> ConnectionId {
        let connection_id = crate::utils::generate_connection_id();
        let handle = ConnectionHandle::new(connection_id, user_id, username, sink);

        if let Some(previous) = self.connections.insert(user_id, handle) {
            debug!(
                "Connection {} for user {} superseded by {}",
                previous.connection_id, user_id, connection_id
            );
            if let Ok(mut stats) = self.stats.write() {
                stats.total_superseded += 1;
            }
        }

        if let Ok(mut stats) = self.stats.write() {
            stats.total_registered += 1;
        }

        connection_id
    }

    /// Remove a user's connection whatever it currently is
    pub fn unregister(&self, user_id: UserId) -> bool {
        self.connections.remove(&user_id).is_some()
    }

    /// Remove a user's connection only if it is still `connection_id`.
    ///
    /// A socket task tearing down after being superseded must not remove
    /// the connection that replaced it.
    pub fn unregister_if(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        self.connections
            .remove_if(&user_id, |_, handle| handle.connection_id == connection_id)
            .is_some()
    }

    pub fn is_connected(&self, user_id: UserId) -> bool {
        self.connections.contains_key(&user_id)
    }

    /// ID of the user's current connection, if any
    pub fn current_connection_id(&self, user_id: UserId) -> Option<ConnectionId> {
        self.connections
            .get(&user_id)
            .map(|handle| handle.connection_id)
    }

    /// Username recorded when the user's current connection registered
    pub fn username(&self, user_id: UserId) -> Option<String> {
        self.connections
            .get(&user_id)
            .map(|handle| handle.username.clone())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Best-effort push of one event to a user's live connection.
    ///
    /// Sends that fail or outlast the send timeout count as dropped; drops
    /// are logged and never surface to callers as failures.
    pub async fn send_to(&self, user_id: UserId, event: ServerEvent) -> DeliveryResult {
        let sink = {
            match self.connections.get(&user_id) {
                Some(handle) => handle.event_sink(),
                None => {
                    debug!("No live connection for user {}, dropping event", user_id);
                    self.record_drop();
                    return DeliveryResult::Dropped;
                }
            }
        };

        // Map guard released above, so a slow destination cannot stall others
        match tokio::time::timeout(self.send_timeout, sink.push(event)).await {
            Ok(Ok(())) => {
                if let Ok(mut stats) = self.stats.write() {
                    stats.events_delivered += 1;
                }
                DeliveryResult::Delivered
            }
            Ok(Err(e)) => {
                debug!("Dropping event for user {}: {}", user_id, e);
                self.record_drop();
                DeliveryResult::Dropped
            }
            Err(_) => {
                debug!(
                    "Send to user {} exceeded {:?}, dropping event",
                    user_id, self.send_timeout
                );
                self.record_drop();
                DeliveryResult::Dropped
            }
        }
    }

    /// Get current registry statistics
    pub fn get_stats(&self) -> RegistryStats {
        self.stats
            .read()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    fn record_drop(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.events_dropped += 1;
        }
    }
}
