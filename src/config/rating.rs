//! Rating system configuration

use serde::{Deserialize, Serialize};

/// Settings for the tiered-K Elo calculator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingSettings {
    /// Rating granted to players without a stored profile
    pub initial_rating: i32,
    /// Ratings below this use the novice K factor
    pub intermediate_threshold: i32,
    /// Ratings at or above the intermediate threshold but below this use
    /// the intermediate K factor
    pub experienced_threshold: i32,
    /// K factor below the intermediate threshold
    pub k_novice: i32,
    /// K factor between the thresholds
    pub k_intermediate: i32,
    /// K factor at or above the experienced threshold
    pub k_experienced: i32,
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            initial_rating: 1000,
            intermediate_threshold: 1600,
            experienced_threshold: 2000,
            k_novice: 32,
            k_intermediate: 24,
            k_experienced: 16,
        }
    }
}

impl RatingSettings {
    /// Validate configuration parameters
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.initial_rating < 0 {
            return Err(crate::error::ArenaError::ConfigurationError {
                message: "Initial rating cannot be negative".to_string(),
            }
            .into());
        }

        if self.intermediate_threshold >= self.experienced_threshold {
            return Err(crate::error::ArenaError::ConfigurationError {
                message: "Rating thresholds must be strictly increasing".to_string(),
            }
            .into());
        }

        if self.k_novice <= 0 || self.k_intermediate <= 0 || self.k_experienced <= 0 {
            return Err(crate::error::ArenaError::ConfigurationError {
                message: "K factors must be positive".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
