//! Match lifecycle coordination
//!
//! This module implements the core match lifecycle: creation with opponent
//! resolution, the waiting to active transition, result submission with
//! settlement, and administrative cancellation.
//!
//! Result submission is serialized per match id, so two concurrent
//! submissions for the same match produce exactly one completed transition
//! and exactly one rating calculation.

use crate::config::MatchSettings;
use crate::error::{ArenaError, Result};
use crate::matches::scramble::generate_scramble;
use crate::matches::storage::MatchStorage;
use crate::metrics::MetricsCollector;
use crate::rating::{apply_solve, DuelOutcome, RatingCalculator};
use crate::rooms::RoomMultiplexer;
use crate::types::{Match, MatchId, MatchStatus, PlayerProfile, ServerEvent, UserId};
use crate::utils::{current_timestamp, generate_match_id, KeyedLocks};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Statistics about match lifecycle operations
#[derive(Debug, Clone, Default, Serialize)]
pub struct ControllerStats {
    /// Total matches created
    pub matches_created: u64,
    /// Total matches moved into play
    pub matches_started: u64,
    /// Total matches completed
    pub matches_completed: u64,
    /// Total matches cancelled
    pub matches_cancelled: u64,
    /// Completed matches that ended in a draw
    pub draws_recorded: u64,
}

/// Central coordinator for the match lifecycle
#[derive(Clone)]
pub struct MatchController {
    storage: Arc<dyn MatchStorage>,
    calculator: Arc<dyn RatingCalculator>,
    rooms: Arc<RoomMultiplexer>,
    settings: MatchSettings,
    match_locks: Arc<KeyedLocks<MatchId>>,
    stats: Arc<RwLock<ControllerStats>>,
    metrics_collector: Arc<MetricsCollector>,
}

impl MatchController {
    /// Create a new match controller
    pub fn new(
        storage: Arc<dyn MatchStorage>,
        calculator: Arc<dyn RatingCalculator>,
        rooms: Arc<RoomMultiplexer>,
        settings: MatchSettings,
    ) -> Self {
        let metrics_collector = Arc::new(MetricsCollector::new().unwrap_or_else(|e| {
            warn!("Failed to create metrics collector: {}, using default", e);
            MetricsCollector::default()
        }));

        Self::with_metrics(storage, calculator, rooms, settings, metrics_collector)
    }

    /// Create a new match controller with a shared metrics collector
    pub fn with_metrics(
        storage: Arc<dyn MatchStorage>,
        calculator: Arc<dyn RatingCalculator>,
        rooms: Arc<RoomMultiplexer>,
        settings: MatchSettings,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            storage,
            calculator,
            rooms,
            settings,
            match_locks: Arc::new(KeyedLocks::new()),
            stats: Arc::new(RwLock::new(ControllerStats::default())),
            metrics_collector,
        }
    }

    /// Create a new match in the `waiting` state.
    ///
    /// With a specified opponent the opponent must exist and differ from the
    /// requester. Without one, a random online player is drafted.
    ///
    /// # Arguments
    /// * `requester` - User asking for the match
    /// * `opponent` - Specific opponent, or None to draft a random online player
    ///
    /// # Returns
    /// * `Result<Match>` - The created match or an error
    pub async fn create_match(&self, requester: UserId, opponent: Option<UserId>) -> Result<Match> {
        let opponent_id = match opponent {
            Some(opponent_id) => {
                if opponent_id == requester {
                    return Err(ArenaError::InvalidOpponent {
                        reason: "Cannot play against yourself".to_string(),
                    }
                    .into());
                }

                if self.storage.fetch_profile(opponent_id).await?.is_none() {
                    return Err(ArenaError::UserNotFound {
                        user_id: opponent_id,
                    }
                    .into());
                }

                opponent_id
            }
            None => self
                .storage
                .random_online_opponent(requester)
                .await?
                .ok_or(ArenaError::NoOpponentAvailable)?,
        };

        let duel = Match::new(
            generate_match_id(),
            requester,
            opponent_id,
            generate_scramble(self.settings.scramble_length),
        );

        self.storage.insert_match(duel.clone()).await?;

        {
            let mut stats = self.stats.write().map_err(|_| ArenaError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;
            stats.matches_created += 1;
        }
        self.metrics_collector.record_match_created();

        info!(
            "Created match {} between {} and {}",
            duel.match_id, requester, opponent_id
        );

        Ok(duel)
    }

    /// Move a match from `waiting` into play.
    ///
    /// Only a participant may start a match, and only from the `waiting`
    /// state.
    pub async fn start_match(&self, match_id: &str, caller: UserId) -> Result<Match> {
        let _guard = self.match_locks.acquire(match_id.to_string()).await;

        let mut duel = self.fetch_or_not_found(match_id).await?;

        if !duel.is_participant(caller) {
            return Err(ArenaError::NotParticipant {
                user_id: caller,
                match_id: match_id.to_string(),
            }
            .into());
        }

        if duel.status != MatchStatus::Waiting {
            return Err(ArenaError::InvalidTransition {
                match_id: match_id.to_string(),
                reason: format!("Cannot start a match that is {}", duel.status),
            }
            .into());
        }

        duel.status = MatchStatus::Active;
        duel.started_at = Some(current_timestamp());
        self.storage.update_match(duel.clone()).await?;

        {
            let mut stats = self.stats.write().map_err(|_| ArenaError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;
            stats.matches_started += 1;
        }
        self.metrics_collector.record_match_started();

        info!("Match {} started by user {}", match_id, caller);

        Ok(duel)
    }

    /// Record one participant's solve time, settling the match when both
    /// times are in.
    ///
    /// The first submission is stored and the match stays `active`. The
    /// second triggers settlement: the faster participant wins, equal times
    /// draw, ratings are recalculated once, both profiles fold in their own
    /// solve, and everything is stored as one unit. Room members are notified
    /// after the match lock is released.
    pub async fn submit_result(
        &self,
        match_id: &str,
        user_id: UserId,
        solve_time_ms: i64,
    ) -> Result<Match> {
        let timer = self.metrics_collector.start_timer();
        let guard = self.match_locks.acquire(match_id.to_string()).await;

        let mut duel = self.fetch_or_not_found(match_id).await?;

        if !duel.is_participant(user_id) {
            return Err(ArenaError::NotParticipant {
                user_id,
                match_id: match_id.to_string(),
            }
            .into());
        }

        if duel.status != MatchStatus::Active {
            return Err(ArenaError::InvalidTransition {
                match_id: match_id.to_string(),
                reason: format!("Cannot submit a result while the match is {}", duel.status),
            }
            .into());
        }

        if duel.time_for(user_id).is_some() {
            return Err(ArenaError::DuplicateSubmission {
                match_id: match_id.to_string(),
                user_id,
            }
            .into());
        }

        duel.record_time(user_id, solve_time_ms);

        if !duel.both_times_submitted() {
            self.storage.update_match(duel.clone()).await?;
            self.metrics_collector.record_submission(timer.stop());

            debug!(
                "Recorded time {}ms for user {} in match {}, waiting for opponent",
                solve_time_ms, user_id, match_id
            );

            return Ok(duel);
        }

        let (player1_time, player2_time) = match (duel.player1_time_ms, duel.player2_time_ms) {
            (Some(t1), Some(t2)) => (t1, t2),
            _ => {
                return Err(ArenaError::InternalError {
                    message: format!("Match {} settled without both times", match_id),
                }
                .into())
            }
        };

        let player1_outcome = if player1_time < player2_time {
            DuelOutcome::Win
        } else if player2_time < player1_time {
            DuelOutcome::Loss
        } else {
            DuelOutcome::Draw
        };

        duel.status = MatchStatus::Completed;
        duel.completed_at = Some(current_timestamp());
        duel.is_draw = player1_outcome == DuelOutcome::Draw;
        duel.winner_id = match player1_outcome {
            DuelOutcome::Win => Some(duel.player1_id),
            DuelOutcome::Loss => Some(duel.player2_id),
            DuelOutcome::Draw => None,
        };

        let mut player1 = self.profile_or_default(duel.player1_id).await?;
        let mut player2 = self.profile_or_default(duel.player2_id).await?;

        let rating_timer = self.metrics_collector.start_timer();
        let update = self.calculator.rate_duel(
            player1.rating,
            player2.rating,
            player1_outcome.score(),
            player1_outcome.opposite().score(),
        )?;
        self.metrics_collector
            .record_rating_calculation(rating_timer.stop());

        player1.rating = update.player1_rating;
        player2.rating = update.player2_rating;
        apply_solve(&mut player1, player1_time, player1_outcome);
        apply_solve(&mut player2, player2_time, player1_outcome.opposite());

        // If this fails the match stays active with one time stored, so the
        // second submission can be retried.
        self.storage
            .complete_match(duel.clone(), player1, player2)
            .await?;

        {
            let mut stats = self.stats.write().map_err(|_| ArenaError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;
            stats.matches_completed += 1;
            if duel.is_draw {
                stats.draws_recorded += 1;
            }
        }
        self.metrics_collector.record_match_completed(duel.is_draw);
        self.metrics_collector.record_solve_time(player1_time);
        self.metrics_collector.record_solve_time(player2_time);
        self.metrics_collector.record_submission(timer.stop());

        match duel.winner_id {
            Some(winner_id) => info!(
                "Match {} completed, winner {} ({}ms vs {}ms)",
                match_id, winner_id, player1_time, player2_time
            ),
            None => info!("Match {} completed in a draw at {}ms", match_id, player1_time),
        }

        let event = ServerEvent::MatchFinished {
            payload: duel.clone(),
        };

        // Notify outside the match lock so slow destinations cannot stall
        // the next submission.
        drop(guard);
        self.rooms.broadcast(match_id, event, None).await;

        Ok(duel)
    }

    /// Cancel a match that has not finished.
    ///
    /// This is the administrative escape hatch; completed and cancelled
    /// matches are immutable.
    pub async fn cancel_match(&self, match_id: &str) -> Result<Match> {
        let _guard = self.match_locks.acquire(match_id.to_string()).await;

        let mut duel = self.fetch_or_not_found(match_id).await?;

        if duel.status.is_terminal() {
            return Err(ArenaError::InvalidTransition {
                match_id: match_id.to_string(),
                reason: format!("Cannot cancel a match that is {}", duel.status),
            }
            .into());
        }

        duel.status = MatchStatus::Cancelled;
        self.storage.update_match(duel.clone()).await?;

        {
            let mut stats = self.stats.write().map_err(|_| ArenaError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?;
            stats.matches_cancelled += 1;
        }
        self.metrics_collector.record_match_cancelled();

        info!("Match {} cancelled", match_id);

        Ok(duel)
    }

    /// Fetch a match by id
    pub async fn get_match(&self, match_id: &str) -> Result<Match> {
        self.fetch_or_not_found(match_id).await
    }

    /// List a user's matches, newest first
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        status: Option<MatchStatus>,
        limit: usize,
    ) -> Result<Vec<Match>> {
        self.storage.matches_for_user(user_id, status, limit).await
    }

    /// Fetch a player's profile, or a fresh one at the initial rating
    pub async fn profile_or_default(&self, user_id: UserId) -> Result<PlayerProfile> {
        match self.storage.fetch_profile(user_id).await? {
            Some(profile) => Ok(profile),
            None => Ok(PlayerProfile::new(
                user_id,
                format!("User{}", user_id),
                self.calculator.initial_rating(),
            )),
        }
    }

    /// Drop per-match locks that no operation is holding
    pub fn prune_locks(&self) {
        self.match_locks.prune();
    }

    /// Get current controller statistics
    pub fn get_stats(&self) -> ControllerStats {
        self.stats
            .read()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    async fn fetch_or_not_found(&self, match_id: &str) -> Result<Match> {
        self.storage
            .fetch_match(match_id)
            .await?
            .ok_or_else(|| {
                ArenaError::MatchNotFound {
                    match_id: match_id.to_string(),
                }
                .into()
            })
    }
}
