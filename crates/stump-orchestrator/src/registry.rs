//! Registry of in-flight games, keyed by connection.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::game::GameState;

/// Identifier of one transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Maps live connections to the game they are playing.
///
/// A connection holds at most one game. Entries are removed when the game is
/// finalized or the connection goes away.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    next_id: AtomicU64,
    games: RwLock<HashMap<SessionId, Arc<Mutex<GameState>>>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an identifier for a new connection.
    pub fn allocate_id(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Registers the game played by `id`.
    ///
    /// Returns `false` and leaves the registry unchanged if `id` already has a
    /// game in flight.
    pub fn insert(&self, id: SessionId, game: Arc<Mutex<GameState>>) -> bool {
        let mut games = self.games.write().unwrap_or_else(PoisonError::into_inner);
        if games.contains_key(&id) {
            return false;
        }
        games.insert(id, game);
        true
    }

    /// Returns `true` if `id` has a game in flight.
    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.games
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Releases the game played by `id`, returning it if there was one.
    pub fn remove(&self, id: SessionId) -> Option<Arc<Mutex<GameState>>> {
        self.games
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    /// Number of games in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.games.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no game is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
