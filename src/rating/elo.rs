//! Tiered-K Elo rating implementation
//!
//! This module provides the concrete rating calculator used for duels.
//! K factors shrink as a player's rating grows, so established ratings
//! move more slowly than fresh ones.

use crate::config::RatingSettings;
use crate::error::ArenaError;
use crate::rating::calculator::{RatingCalculator, RatingUpdate};

/// Elo rating calculator with rating-tiered K factors
#[derive(Debug, Clone)]
pub struct EloCalculator {
    settings: RatingSettings,
}

impl EloCalculator {
    /// Create a new Elo calculator
    pub fn new(settings: RatingSettings) -> crate::error::Result<Self> {
        settings.validate()?;

        Ok(Self { settings })
    }

    /// Probability that a player at `rating` beats one at `opponent_rating`
    pub fn expected_score(&self, rating: i32, opponent_rating: i32) -> f64 {
        1.0 / (1.0 + 10f64.powf((opponent_rating - rating) as f64 / 400.0))
    }

    /// K factor for a player entering a duel at `rating`
    pub fn k_factor(&self, rating: i32) -> i32 {
        if rating < self.settings.intermediate_threshold {
            self.settings.k_novice
        } else if rating < self.settings.experienced_threshold {
            self.settings.k_intermediate
        } else {
            self.settings.k_experienced
        }
    }

    fn apply(&self, rating: i32, score: f64, expected: f64) -> i32 {
        let k = self.k_factor(rating) as f64;
        // The cast truncates toward zero; ratings are floored at zero
        let new_rating = (rating as f64 + k * (score - expected)) as i32;
        new_rating.max(0)
    }
}

impl Default for EloCalculator {
    fn default() -> Self {
        Self {
            settings: RatingSettings::default(),
        }
    }
}

fn is_valid_score(score: f64) -> bool {
    score == 0.0 || score == 0.5 || score == 1.0
}

impl RatingCalculator for EloCalculator {
    fn rate_duel(
        &self,
        player1_rating: i32,
        player2_rating: i32,
        player1_score: f64,
        player2_score: f64,
    ) -> crate::error::Result<RatingUpdate> {
        if !is_valid_score(player1_score)
            || !is_valid_score(player2_score)
            || player1_score + player2_score != 1.0
        {
            return Err(ArenaError::InternalError {
                message: format!(
                    "Invalid duel scores: {} and {}",
                    player1_score, player2_score
                ),
            }
            .into());
        }

        // Both updates use the ratings going into the duel
        let expected1 = self.expected_score(player1_rating, player2_rating);
        let expected2 = self.expected_score(player2_rating, player1_rating);

        Ok(RatingUpdate {
            player1_rating: self.apply(player1_rating, player1_score, expected1),
            player2_rating: self.apply(player2_rating, player2_score, expected2),
        })
    }

    fn initial_rating(&self) -> i32 {
        self.settings.initial_rating
    }
}
