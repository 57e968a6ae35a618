//! Outcome statistics folded into player profiles after a duel

use crate::types::PlayerProfile;
use crate::utils::current_timestamp;

/// How a completed duel ended for one participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelOutcome {
    Win,
    Loss,
    Draw,
}

impl DuelOutcome {
    /// Score contribution for rating purposes
    pub fn score(&self) -> f64 {
        match self {
            DuelOutcome::Win => 1.0,
            DuelOutcome::Loss => 0.0,
            DuelOutcome::Draw => 0.5,
        }
    }

    /// The same duel seen from the other side
    pub fn opposite(&self) -> Self {
        match self {
            DuelOutcome::Win => DuelOutcome::Loss,
            DuelOutcome::Loss => DuelOutcome::Win,
            DuelOutcome::Draw => DuelOutcome::Draw,
        }
    }
}

/// Fold one completed solve into a profile's cumulative statistics.
///
/// Exactly one outcome counter is incremented. The best time keeps the
/// minimum across all solves, and the running average folds the new solve
/// in at half weight.
pub fn apply_solve(profile: &mut PlayerProfile, solve_time_ms: i64, outcome: DuelOutcome) {
    match outcome {
        DuelOutcome::Win => profile.wins += 1,
        DuelOutcome::Loss => profile.losses += 1,
        DuelOutcome::Draw => profile.draws += 1,
    }

    match profile.best_time_ms {
        Some(best) if best <= solve_time_ms => {}
        _ => profile.best_time_ms = Some(solve_time_ms),
    }

    let solve_time_secs = solve_time_ms as f64 / 1000.0;
    profile.average_time_secs = Some(match profile.average_time_secs {
        Some(average) => (average + solve_time_secs) / 2.0,
        None => solve_time_secs,
    });

    profile.updated_at = current_timestamp();
}
