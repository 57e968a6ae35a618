//! Match coordination functionality
//!
//! This module contains the match lifecycle controller, scramble generation,
//! and the storage interface for matches and player profiles.

pub mod controller;
pub mod scramble;
pub mod storage;

// Re-export commonly used types
pub use controller::{ControllerStats, MatchController};
pub use scramble::generate_scramble;
pub use storage::{InMemoryMatchStorage, MatchStorage, MockMatchStorage};
