//! Error types for the match coordination service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

use crate::types::UserId;

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific match coordination scenarios
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("Match not found: {match_id}")]
    MatchNotFound { match_id: String },

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: UserId },

    #[error("User {user_id} is not a participant in match {match_id}")]
    NotParticipant { user_id: UserId, match_id: String },

    #[error("Invalid transition for match {match_id}: {reason}")]
    InvalidTransition { match_id: String, reason: String },

    #[error("User {user_id} already submitted a result for match {match_id}")]
    DuplicateSubmission { match_id: String, user_id: UserId },

    #[error("No available opponents found")]
    NoOpponentAvailable,

    #[error("Invalid opponent: {reason}")]
    InvalidOpponent { reason: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Storage operation failed: {message}")]
    StorageError { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
