//! Aggregate game statistics.
//!
//! Averages and rates are always recomputed from running totals, never
//! updated incrementally, so they cannot drift over many games.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{load_record, write_record, Result};

// ============================================================================
// Record inputs
// ============================================================================

/// The parts of a finished game that feed the overall counters.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSummary {
    /// Whether the human stumped some, but not all, solvers.
    pub player_wins: bool,
    /// Difficulty tag as submitted (unrecognized tags are counted as-is).
    pub difficulty: String,
    /// Wall-clock length of the game in seconds.
    pub duration_secs: f64,
}

/// One solver's participation in a finished game.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverRecord {
    /// Solver display name, used as the aggregation key.
    pub name: String,
    /// Provider label of the solver.
    pub provider: String,
    /// Whether the solver ended the game correct.
    pub correct: bool,
    /// The solver's last response time in seconds.
    pub response_time: f64,
    /// Guess count at the moment the solver first became correct (0 if never).
    pub guesses_to_correct: u32,
}

// ============================================================================
// Stats
// ============================================================================

/// Per-solver aggregate across all finished games.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverStats {
    /// Solver display name.
    pub name: String,
    /// Provider label.
    pub provider: String,
    /// Number of finished games the solver took part in.
    pub games_played: u64,
    /// Number of those games the solver answered correctly.
    pub times_correct: u64,
    /// `100 * times_correct / games_played`.
    pub accuracy: f64,
    /// `total_response_time / games_played`.
    pub avg_response_time: f64,
    /// Running sum of response times.
    pub total_response_time: f64,
    /// `total_guesses_to_correct / times_correct`.
    pub avg_guesses_to_correct: f64,
    /// Running sum of guesses-to-correct over correct games.
    pub total_guesses_to_correct: u64,
}

/// Process-wide aggregate statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    /// Number of finished games.
    pub total_games: u64,
    /// Games the human won.
    pub wins: u64,
    /// Games the human lost.
    pub losses: u64,
    /// `100 * wins / total_games`.
    pub win_rate: f64,
    /// Finished games per difficulty tag.
    pub by_difficulty: BTreeMap<String, u64>,
    /// `total_duration / total_games`.
    pub average_duration: f64,
    /// Running sum of game durations in seconds.
    pub total_duration: f64,
    /// Aggregates keyed by solver name.
    #[serde(alias = "byModel")]
    pub by_solver: BTreeMap<String, SolverStats>,
}

impl Stats {
    /// Folds one finished game into the overall counters.
    #[allow(clippy::cast_precision_loss)]
    pub fn apply_game(&mut self, summary: &GameSummary) {
        self.total_games += 1;
        if summary.player_wins {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        *self
            .by_difficulty
            .entry(summary.difficulty.clone())
            .or_insert(0) += 1;
        self.total_duration += summary.duration_secs;

        self.win_rate = self.wins as f64 / self.total_games as f64 * 100.0;
        self.average_duration = self.total_duration / self.total_games as f64;
    }

    /// Folds one solver's game into its per-solver aggregate.
    #[allow(clippy::cast_precision_loss)]
    pub fn apply_solver(&mut self, record: &SolverRecord) {
        let entry = self
            .by_solver
            .entry(record.name.clone())
            .or_insert_with(|| SolverStats {
                name: record.name.clone(),
                provider: record.provider.clone(),
                ..SolverStats::default()
            });

        entry.games_played += 1;
        if record.correct {
            entry.times_correct += 1;
            entry.total_guesses_to_correct += u64::from(record.guesses_to_correct);
        }
        entry.total_response_time += record.response_time;

        entry.accuracy = entry.times_correct as f64 / entry.games_played as f64 * 100.0;
        entry.avg_response_time = entry.total_response_time / entry.games_played as f64;
        if entry.times_correct > 0 {
            entry.avg_guesses_to_correct =
                entry.total_guesses_to_correct as f64 / entry.times_correct as f64;
        }
    }
}

// ============================================================================
// StatsStore
// ============================================================================

/// Shared, durable owner of the [`Stats`] aggregate.
///
/// Every mutation takes the write lock, applies the change, and persists the
/// whole record before releasing it, so concurrent sessions never lose an
/// update and readers never see a half-applied one.
#[derive(Debug)]
pub struct StatsStore {
    path: Option<PathBuf>,
    stats: RwLock<Stats>,
}

impl StatsStore {
    /// Opens the store backed by `path`, loading any existing record.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let stats: Stats = load_record(&path)?.unwrap_or_default();
        info!(
            path = %path.display(),
            total_games = stats.total_games,
            "Loaded stats"
        );
        Ok(Self {
            path: Some(path),
            stats: RwLock::new(stats),
        })
    }

    /// Creates a store that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            stats: RwLock::new(Stats::default()),
        }
    }

    /// Returns the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Records one finished game and persists the aggregate.
    pub fn record(&self, summary: &GameSummary) {
        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        stats.apply_game(summary);
        debug!(
            total_games = stats.total_games,
            wins = stats.wins,
            win_rate = stats.win_rate,
            "Recorded game"
        );
        self.persist(&stats);
    }

    /// Records a finished game together with every solver that played it,
    /// under one lock and with one write to disk.
    pub fn record_game(&self, summary: &GameSummary, solvers: &[SolverRecord]) {
        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        stats.apply_game(summary);
        for record in solvers {
            stats.apply_solver(record);
        }
        debug!(
            total_games = stats.total_games,
            wins = stats.wins,
            solvers = solvers.len(),
            "Recorded game"
        );
        self.persist(&stats);
    }

    /// Returns a consistent point-in-time copy of the aggregate.
    #[must_use]
    pub fn snapshot(&self) -> Stats {
        self.stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn persist(&self, stats: &Stats) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = write_record(path, stats) {
            warn!(path = %path.display(), error = %e, "Failed to persist stats");
        }
    }
}
