//! Rating system for head-to-head duels
//!
//! This module provides the tiered-K Elo calculation applied when a match
//! completes, and the outcome statistics bookkeeping that goes with it.

pub mod calculator;
pub mod elo;
pub mod stats;

// Re-export commonly used types
pub use calculator::{MockRatingCalculator, RatingCalculator, RatingUpdate};
pub use elo::EloCalculator;
pub use stats::{apply_solve, DuelOutcome};
