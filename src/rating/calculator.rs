//! Rating calculator trait and implementations
//!
//! This module defines the interface for duel rating calculations so the
//! match lifecycle can be tested against a deterministic stand-in.

use serde::{Deserialize, Serialize};

/// New ratings for both participants after a completed duel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub player1_rating: i32,
    pub player2_rating: i32,
}

/// Trait for calculating rating changes after a head-to-head duel
pub trait RatingCalculator: Send + Sync {
    /// Calculate new ratings for both participants of a finished duel
    ///
    /// # Arguments
    /// * `player1_rating` / `player2_rating` - Ratings going into the duel
    /// * `player1_score` / `player2_score` - 1.0 for a win, 0.5 for a draw, 0.0 for a loss
    ///
    /// # Returns
    /// The new rating for each participant
    fn rate_duel(
        &self,
        player1_rating: i32,
        player2_rating: i32,
        player1_score: f64,
        player2_score: f64,
    ) -> crate::error::Result<RatingUpdate>;

    /// Get the initial rating for new players
    fn initial_rating(&self) -> i32;
}

/// Mock rating calculator for testing
#[derive(Debug, Default)]
pub struct MockRatingCalculator {
    rate_calls: std::sync::Mutex<Vec<(i32, i32, f64, f64)>>,
    fixed_result: std::sync::RwLock<Option<RatingUpdate>>,
    initial_rating: i32,
}

impl MockRatingCalculator {
    pub fn new() -> Self {
        Self {
            rate_calls: std::sync::Mutex::new(Vec::new()),
            fixed_result: std::sync::RwLock::new(None),
            initial_rating: 1000,
        }
    }

    /// Set a fixed result to return for all calculations
    pub fn set_fixed_result(&self, result: RatingUpdate) {
        if let Ok(mut fixed) = self.fixed_result.write() {
            *fixed = Some(result);
        }
    }

    /// Get all rate_duel calls made (for testing)
    pub fn get_rate_calls(&self) -> Vec<(i32, i32, f64, f64)> {
        self.rate_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.rate_calls.lock() {
            calls.clear();
        }
    }
}

impl RatingCalculator for MockRatingCalculator {
    fn rate_duel(
        &self,
        player1_rating: i32,
        player2_rating: i32,
        player1_score: f64,
        player2_score: f64,
    ) -> crate::error::Result<RatingUpdate> {
        // Record the call
        if let Ok(mut calls) = self.rate_calls.lock() {
            calls.push((player1_rating, player2_rating, player1_score, player2_score));
        }

        // Return fixed result if set, otherwise leave ratings unchanged
        if let Ok(fixed) = self.fixed_result.read() {
            if let Some(result) = fixed.as_ref() {
                return Ok(*result);
            }
        }

        Ok(RatingUpdate {
            player1_rating,
            player2_rating,
        })
    }

    fn initial_rating(&self) -> i32 {
        self.initial_rating
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_calculator_records_calls() {
        let calculator = MockRatingCalculator::new();

        let result = calculator.rate_duel(1500, 1400, 1.0, 0.0).unwrap();
        assert_eq!(result.player1_rating, 1500);
        assert_eq!(result.player2_rating, 1400);

        let calls = calculator.get_rate_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (1500, 1400, 1.0, 0.0));

        calculator.clear_calls();
        assert!(calculator.get_rate_calls().is_empty());
    }

    #[test]
    fn test_mock_calculator_fixed_result() {
        let calculator = MockRatingCalculator::new();
        calculator.set_fixed_result(RatingUpdate {
            player1_rating: 1516,
            player2_rating: 1484,
        });

        let result = calculator.rate_duel(1500, 1500, 1.0, 0.0).unwrap();
        assert_eq!(result.player1_rating, 1516);
        assert_eq!(result.player2_rating, 1484);
    }

    #[test]
    fn test_mock_initial_rating() {
        let calculator = MockRatingCalculator::new();
        assert_eq!(calculator.initial_rating(), 1000);
    }
}
