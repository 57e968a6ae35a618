//! Common types used throughout the match coordination service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for users (issued by the external authentication service)
pub type UserId = i64;

/// Opaque match identifier token (not a database primary key)
pub type MatchId = String;

/// Unique identifier for a single registered connection
pub type ConnectionId = Uuid;

/// Lifecycle status of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Waiting,
    Active,
    Completed,
    Cancelled,
}

impl MatchStatus {
    /// Parse a status name as it appears on the wire ("waiting", "active", ...)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(MatchStatus::Waiting),
            "active" => Some(MatchStatus::Active),
            "completed" => Some(MatchStatus::Completed),
            "cancelled" => Some(MatchStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether the match can never change status again
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Cancelled)
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStatus::Waiting => write!(f, "waiting"),
            MatchStatus::Active => write!(f, "active"),
            MatchStatus::Completed => write!(f, "completed"),
            MatchStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A head-to-head match between two participants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub match_id: MatchId,
    pub player1_id: UserId,
    pub player2_id: UserId,
    pub scramble: String,
    pub status: MatchStatus,
    pub player1_time_ms: Option<i64>,
    pub player2_time_ms: Option<i64>,
    pub winner_id: Option<UserId>,
    pub is_draw: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Create a match in the `waiting` state
    pub fn new(match_id: MatchId, player1_id: UserId, player2_id: UserId, scramble: String) -> Self {
        Self {
            match_id,
            player1_id,
            player2_id,
            scramble,
            status: MatchStatus::Waiting,
            player1_time_ms: None,
            player2_time_ms: None,
            winner_id: None,
            is_draw: false,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        user_id == self.player1_id || user_id == self.player2_id
    }

    /// The other participant, if `user_id` is one of the two
    pub fn opponent_of(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.player1_id {
            Some(self.player2_id)
        } else if user_id == self.player2_id {
            Some(self.player1_id)
        } else {
            None
        }
    }

    /// The submitted time slot for a participant
    pub fn time_for(&self, user_id: UserId) -> Option<i64> {
        if user_id == self.player1_id {
            self.player1_time_ms
        } else if user_id == self.player2_id {
            self.player2_time_ms
        } else {
            None
        }
    }

    /// Record a participant's solve time. Caller must have verified the slot is empty.
    pub fn record_time(&mut self, user_id: UserId, solve_time_ms: i64) {
        if user_id == self.player1_id {
            self.player1_time_ms = Some(solve_time_ms);
        } else if user_id == self.player2_id {
            self.player2_time_ms = Some(solve_time_ms);
        }
    }

    pub fn both_times_submitted(&self) -> bool {
        self.player1_time_ms.is_some() && self.player2_time_ms.is_some()
    }
}

/// Per-user rating snapshot and cumulative outcome statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub user_id: UserId,
    pub username: String,
    pub rating: i32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// Fastest completed solve in milliseconds
    pub best_time_ms: Option<i64>,
    /// Running average solve time in seconds
    pub average_time_secs: Option<f64>,
    pub is_online: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerProfile {
    pub fn new(user_id: UserId, username: impl Into<String>, rating: i32) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            username: username.into(),
            rating,
            wins: 0,
            losses: 0,
            draws: 0,
            best_time_ms: None,
            average_time_secs: None,
            is_online: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn games_played(&self) -> u32 {
        self.wins + self.losses + self.draws
    }
}

/// Outcome of a best-effort event push to a single destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryResult {
    Delivered,
    Dropped,
}

impl DeliveryResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryResult::Delivered)
    }
}

/// Events a client may send over its connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinMatch { match_id: MatchId },
    LeaveMatch { match_id: MatchId },
    Chat { match_id: MatchId, content: String },
}

impl ClientEvent {
    /// Event name as it appears on the wire, for logging and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::JoinMatch { .. } => "join_match",
            ClientEvent::LeaveMatch { .. } => "leave_match",
            ClientEvent::Chat { .. } => "chat",
        }
    }
}

/// Events the service pushes to connected clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    JoinedMatch {
        match_id: MatchId,
    },
    Chat {
        match_id: MatchId,
        sender_id: UserId,
        sender_username: String,
        content: String,
        timestamp: DateTime<Utc>,
    },
    MatchFinished {
        #[serde(flatten)]
        payload: Match,
    },
}

impl ServerEvent {
    /// Event name as it appears on the wire, for logging and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::JoinedMatch { .. } => "joined_match",
            ServerEvent::Chat { .. } => "chat",
            ServerEvent::MatchFinished { .. } => "match_finished",
        }
    }
}
