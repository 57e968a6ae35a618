//! Live connection tracking
//!
//! This module keeps the authoritative map from users to their single live
//! connection and pushes events to them on a best-effort basis.

pub mod connection;
pub mod registry;

// Re-export commonly used types
pub use connection::{
    ChannelEventSink, ConnectionHandle, EventSink, RecordingEventSink, StalledEventSink,
};
pub use registry::{ConnectionRegistry, RegistryStats};
