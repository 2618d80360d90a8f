//! Stump Ledger
//!
//! Durable, process-wide aggregates shared by every game session: the overall
//! win/loss statistics and the bounded top-N leaderboard.
//!
//! # Types
//!
//! - [`StatsStore`] - Serialized aggregate counters, overall and per solver
//! - [`LeaderboardStore`] - Serialized, bounded list of finished games ordered by score
//! - [`GameSummary`] / [`SolverRecord`] - Inputs recorded after each finalized game
//! - [`LeaderboardEntry`] - Immutable fact describing one finished game
//!
//! Both stores guard their state with a single lock, apply every mutation
//! inside one critical section, and write the whole record back to disk before
//! releasing the lock. A failed write is logged and never rolls back the
//! in-memory update.
//!
//! # Example
//!
//! ```rust
//! use stump_ledger::{GameSummary, StatsStore};
//!
//! let stats = StatsStore::in_memory();
//! stats.record(&GameSummary {
//!     player_wins: true,
//!     difficulty: "hard".to_string(),
//!     duration_secs: 42.0,
//! });
//!
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.total_games, 1);
//! assert!((snapshot.win_rate - 100.0).abs() < f64::EPSILON);
//! ```

mod leaderboard;
mod stats;

pub use leaderboard::{LeaderboardEntry, LeaderboardStore, SolverDetail, DEFAULT_CAPACITY};
pub use stats::{GameSummary, SolverRecord, SolverStats, Stats, StatsStore};

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while loading or persisting ledger records.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Failed to read or write a record file.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The record file involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A record file exists but does not contain the expected JSON.
    #[error("corrupted record '{path}': {source}\n\nSuggestion: Remove the file to start fresh, or restore it from a backup")]
    Corrupted {
        /// The record file involved.
        path: PathBuf,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// Failed to serialize a record.
    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

// ============================================================================
// Persistence helpers
// ============================================================================

/// Reads a JSON record, returning `None` when the file does not exist.
pub(crate) fn load_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LedgerError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| LedgerError::Corrupted {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes a JSON record through a sibling temp file and a rename, so readers
/// of the file never see a half-written record.
pub(crate) fn write_record<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let io_err = |source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json).map_err(io_err)?;
    fs::rename(&tmp_path, path).map_err(io_err)?;
    Ok(())
}
