//! Scoring of finished games.

use crate::game::GameResult;

const BASE_POINTS: f64 = 100.0;
const MAX_TIME_BONUS: f64 = 50.0;
const FULL_BONUS_SECS: f64 = 60.0;
const POINTS_PER_STUMPED_SOLVER: f64 = 20.0;

/// Computes the score of a finished game.
///
/// A loss scores 0. A win scores the difficulty-weighted base, a time bonus
/// that is full up to one minute and decays as `50 * 60 / duration` after,
/// and 20 points per solver that was not correct, rounded down.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use stump_orchestrator::{score, Difficulty, GameResult};
///
/// let result = GameResult {
///     player_wins: true,
///     correct_count: 1,
///     total_solvers: 3,
///     difficulty: Difficulty::Hard,
///     duration_secs: 45.0,
///     rounds_played: 2,
///     timestamp: Utc::now(),
///     display_name: "Ada".to_string(),
/// };
/// assert_eq!(score(&result), 290);
/// ```
#[must_use]
pub fn score(result: &GameResult) -> u32 {
    if !result.player_wins {
        return 0;
    }

    let time_bonus = if result.duration_secs <= FULL_BONUS_SECS {
        MAX_TIME_BONUS
    } else {
        MAX_TIME_BONUS * (FULL_BONUS_SECS / result.duration_secs)
    };
    let stumped = result.total_solvers.saturating_sub(result.correct_count);
    let stump_bonus = POINTS_PER_STUMPED_SOLVER * stumped as f64;

    let total = BASE_POINTS * result.difficulty.multiplier() + time_bonus + stump_bonus;
    // Non-negative and far below u32::MAX; the cast floors.
    total as u32
}
