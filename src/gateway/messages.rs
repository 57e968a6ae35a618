//! Request and response bodies for the control-plane API

use crate::types::UserId;
use serde::{Deserialize, Serialize};

/// Body for creating a match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateMatchRequest {
    /// Specific opponent, or absent to draft a random online player
    #[serde(default)]
    pub opponent_id: Option<UserId>,
}

/// Body for submitting a solve time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResultRequest {
    pub solve_time_ms: i64,
}

/// Query parameters for listing matches
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchListQuery {
    /// Optional status filter (waiting, active, completed, cancelled)
    #[serde(default)]
    pub status: Option<String>,
    /// Maximum number of matches to return
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Error body returned by every failing API route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
