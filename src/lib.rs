//! Cube Arena - Match coordination service for speedcubing duels
//!
//! This crate provides realtime head-to-head match coordination with
//! Elo ratings, WebSocket match rooms, and an HTTP control plane.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod matches;
pub mod metrics;
pub mod rating;
pub mod registry;
pub mod rooms;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{ArenaError, Result};
pub use types::*;

// Re-export key components
pub use gateway::{build_router, GatewayState};
pub use matches::{MatchController, MatchStorage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
