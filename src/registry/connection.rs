//! Event sink abstraction for registered connections
//!
//! The registry never touches a transport directly. Each connection hands
//! in a sink, and the socket task on the other side owns the actual writer.

use crate::error::{ArenaError, Result};
use crate::types::{ConnectionId, ServerEvent, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Trait for pushing server events toward one connection
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Push one event toward the destination
    async fn push(&self, event: ServerEvent) -> Result<()>;
}

/// A user's live connection as the registry sees it
#[derive(Clone)]
pub struct ConnectionHandle {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub username: String,
    pub connected_at: DateTime<Utc>,
    sink: Arc<dyn EventSink>,
}

impl ConnectionHandle {
    pub fn new(
        connection_id: ConnectionId,
        user_id: UserId,
        username: String,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            connection_id,
            user_id,
            username,
            connected_at: crate::utils::current_timestamp(),
            sink,
        }
    }

    /// Clone out the sink so events can be pushed without holding map guards
    pub fn event_sink(&self) -> Arc<dyn EventSink> {
        Arc::clone(&self.sink)
    }
}

/// Sink backed by a bounded channel to the connection's writer task.
///
/// When the writer task goes away the channel closes and pushes fail,
/// which the registry records as drops.
pub struct ChannelEventSink {
    sender: mpsc::Sender<ServerEvent>,
}

impl ChannelEventSink {
    pub fn new(sender: mpsc::Sender<ServerEvent>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn push(&self, event: ServerEvent) -> Result<()> {
        self.sender
            .send(event)
            .await
            .map_err(|_| ArenaError::InternalError {
                message: "Connection writer is gone".to_string(),
            })?;
        Ok(())
    }
}

/// Event sink that records pushed events for testing
#[derive(Default)]
pub struct RecordingEventSink {
    events: std::sync::Mutex<Vec<ServerEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all events pushed so far
    pub fn events(&self) -> Vec<ServerEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    /// Clear recorded events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn push(&self, event: ServerEvent) -> Result<()> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
        Ok(())
    }
}

/// Event sink whose pushes never complete, for exercising send timeouts
#[derive(Default)]
pub struct StalledEventSink;

impl StalledEventSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventSink for StalledEventSink {
    async fn push(&self, _event: ServerEvent) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = ChannelEventSink::new(tx);

        sink.push(ServerEvent::JoinedMatch {
            match_id: "m1".to_string(),
        })
        .await
        .unwrap();
        sink.push(ServerEvent::JoinedMatch {
            match_id: "m2".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(
            rx.recv().await,
            Some(ServerEvent::JoinedMatch {
                match_id: "m1".to_string()
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(ServerEvent::JoinedMatch {
                match_id: "m2".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_channel_sink_fails_after_receiver_drop() {
        let (tx, rx) = mpsc::channel(8);
        let sink = ChannelEventSink::new(tx);
        drop(rx);

        let result = sink
            .push(ServerEvent::JoinedMatch {
                match_id: "m1".to_string(),
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_recording_sink() {
        let sink = RecordingEventSink::new();

        sink.push(ServerEvent::JoinedMatch {
            match_id: "m1".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(sink.event_count(), 1);
        sink.clear();
        assert_eq!(sink.event_count(), 0);
    }
}
