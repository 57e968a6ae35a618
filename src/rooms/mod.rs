//! Match rooms layered over the connection registry

pub mod multiplexer;

// Re-export commonly used types
pub use multiplexer::{RoomMultiplexer, RoomStats};
