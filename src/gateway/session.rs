//! Dispatch of inbound client events to the room layer
//!
//! Events with an empty match id are ignored. A join is acknowledged to the
//! sender only; chat is relayed to the rest of the room with the sender's
//! display name and a server-side timestamp.

use crate::metrics::MetricsCollector;
use crate::rooms::RoomMultiplexer;
use crate::types::{ClientEvent, ServerEvent, UserId};
use crate::utils::current_timestamp;
use std::sync::Arc;
use tracing::debug;

/// Routes client events from a live connection to room operations
pub struct SessionRouter {
    rooms: Arc<RoomMultiplexer>,
    metrics_collector: Arc<MetricsCollector>,
}

impl SessionRouter {
    /// Create a new session router
    pub fn new(rooms: Arc<RoomMultiplexer>, metrics_collector: Arc<MetricsCollector>) -> Self {
        Self {
            rooms,
            metrics_collector,
        }
    }

    /// Handle a single decoded client event
    pub async fn dispatch(&self, user_id: UserId, username: &str, event: ClientEvent) {
        self.metrics_collector.record_client_event(event.kind());

        match event {
            ClientEvent::JoinMatch { match_id } => self.handle_join(user_id, &match_id).await,
            ClientEvent::LeaveMatch { match_id } => self.handle_leave(user_id, &match_id).await,
            ClientEvent::Chat { match_id, content } => {
                self.handle_chat(user_id, username, &match_id, content).await
            }
        }
    }

    async fn handle_join(&self, user_id: UserId, match_id: &str) {
        if match_id.is_empty() {
            debug!("Ignoring join with empty match id from user {}", user_id);
            return;
        }

        if !self.rooms.join(user_id, match_id).await {
            return;
        }

        let reply = ServerEvent::JoinedMatch {
            match_id: match_id.to_string(),
        };
        self.rooms.registry().send_to(user_id, reply).await;
    }

    async fn handle_leave(&self, user_id: UserId, match_id: &str) {
        if match_id.is_empty() {
            debug!("Ignoring leave with empty match id from user {}", user_id);
            return;
        }

        self.rooms.leave(user_id, match_id).await;
    }

    async fn handle_chat(&self, user_id: UserId, username: &str, match_id: &str, content: String) {
        if match_id.is_empty() {
            debug!("Ignoring chat with empty match id from user {}", user_id);
            return;
        }

        let event = ServerEvent::Chat {
            match_id: match_id.to_string(),
            sender_id: user_id,
            sender_username: username.to_string(),
            content,
            timestamp: current_timestamp(),
        };
        self.rooms.broadcast(match_id, event, Some(user_id)).await;
    }
}
