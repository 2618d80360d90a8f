//! Bounded leaderboard of finished games.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{load_record, write_record, Result};

/// Number of entries kept when no capacity is given.
pub const DEFAULT_CAPACITY: usize = 100;

/// Snapshot of one solver's part in a finished game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverDetail {
    /// Solver display name.
    pub name: String,
    /// Provider label.
    pub provider: String,
    /// Whether the solver ended the game correct.
    pub correct: bool,
    /// Last response time in seconds.
    pub response_time: f64,
    /// Last non-empty guess, or empty if the solver never answered.
    pub final_guess: String,
}

/// An immutable record of one finished game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// The riddle text.
    pub riddle: String,
    /// Difficulty tag as submitted.
    pub difficulty: String,
    /// Name shown for the human who wrote the riddle.
    #[serde(alias = "username")]
    pub display_name: String,
    /// Whether the human won.
    pub player_won: bool,
    /// Solvers that answered correctly.
    pub correct_count: usize,
    /// Solvers that took part.
    #[serde(alias = "totalModels")]
    pub total_solvers: usize,
    /// Game length in seconds.
    pub duration: f64,
    /// When the game finished.
    pub timestamp: DateTime<Utc>,
    /// Final score (0 for a loss).
    pub score: u32,
    /// Per-solver detail, in selection order.
    #[serde(alias = "models", default)]
    pub solvers: Vec<SolverDetail>,
}

/// Shared, durable owner of the ranked leaderboard.
///
/// Entries are kept sorted by score, highest first; equal scores keep their
/// insertion order. The list never grows past its capacity.
#[derive(Debug)]
pub struct LeaderboardStore {
    path: Option<PathBuf>,
    capacity: usize,
    entries: RwLock<Vec<LeaderboardEntry>>,
}

impl LeaderboardStore {
    /// Opens the store backed by `path`, loading any existing record.
    ///
    /// A loaded record is re-sorted and truncated to `capacity`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let path = path.into();
        let mut entries: Vec<LeaderboardEntry> = load_record(&path)?.unwrap_or_default();
        rank(&mut entries, capacity);
        info!(path = %path.display(), entries = entries.len(), "Loaded leaderboard");
        Ok(Self {
            path: Some(path),
            capacity,
            entries: RwLock::new(entries),
        })
    }

    /// Creates a store that is never written to disk.
    #[must_use]
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            path: None,
            capacity,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Returns the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the maximum number of entries kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts an entry, re-ranks, truncates, and persists.
    ///
    /// Returns the entry's 1-based rank, or `None` if it fell off the board.
    pub fn insert(&self, entry: LeaderboardEntry) -> Option<usize> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let score = entry.score;

        // Entries are already ranked, and the stable sort keeps the new entry
        // behind every existing entry with an equal score.
        let position = entries.iter().filter(|e| e.score >= score).count();
        entries.push(entry);
        rank(&mut entries, self.capacity);
        let position = (position < self.capacity).then_some(position + 1);
        debug!(score, rank = ?position, entries = entries.len(), "Inserted leaderboard entry");

        if let Some(path) = &self.path {
            if let Err(e) = write_record(path, &*entries) {
                warn!(path = %path.display(), error = %e, "Failed to persist leaderboard");
            }
        }
        position
    }

    /// Returns an ordered copy of the current entries.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LeaderboardEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no game has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stable sort by descending score, then keep the first `capacity` entries.
fn rank(entries: &mut Vec<LeaderboardEntry>, capacity: usize) {
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries.truncate(capacity);
}
