//! Session events streamed to the submitter while a game is played.
//!
//! Every event is serialized as a JSON object with `event` and `payload`
//! fields.
//!
//! # Event Types
//!
//! - `session_start` - The solvers selected for this game
//! - `round_start` - A new round begins
//! - `chunk` - Partial text streamed by one solver
//! - `result` - One solver's guess was evaluated (successful attempts only)
//! - `round_summary` - Counts, flags and solver snapshot after the barrier
//! - `terminal` - The game is over and has been recorded
//! - `error` - A submission was rejected

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::game::{GameOutcome, SolverInfo, SolverState};

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload for the `session_start` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStartPayload {
    /// The solvers selected for this game, in selection order.
    pub solvers: Vec<SolverInfo>,
}

/// Payload for the `round_start` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStartPayload {
    /// 0-based round index.
    pub round: u32,
}

/// Payload for the `chunk` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Solver that produced the text.
    pub solver: String,
    /// Partial text, in generation order.
    pub content: String,
}

/// Payload for the `result` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPayload {
    /// Solver whose guess was evaluated.
    pub solver: String,
    /// Whether the guess matched.
    pub correct: bool,
}

/// Payload for the `round_summary` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummaryPayload {
    /// 0-based index of the round just evaluated.
    pub round: u32,
    /// Outcome after this round.
    #[serde(flatten)]
    pub outcome: GameOutcome,
    /// Solver snapshot keyed by name.
    pub solvers: BTreeMap<String, SolverState>,
    /// Whether this was the final round.
    pub game_over: bool,
    /// The next round index, absent when the game is over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_round: Option<u32>,
}

/// Payload for the `terminal` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalPayload {
    /// Whether the human won.
    pub player_wins: bool,
    /// Final score.
    pub score: u32,
    /// Game length in seconds.
    pub duration: f64,
    /// Solvers that answered correctly.
    pub correct_count: usize,
    /// Solvers taking part.
    pub total_solvers: usize,
    /// Number of rounds played.
    pub rounds_played: u32,
    /// Final solver snapshot keyed by name.
    pub solvers: BTreeMap<String, SolverState>,
    /// Outcome message.
    pub message: String,
}

/// Payload for the `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable error message.
    pub message: String,
}

// ============================================================================
// Event Enum
// ============================================================================

/// Events emitted over the lifetime of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Solvers have been selected.
    SessionStart(SessionStartPayload),
    /// A round begins.
    RoundStart(RoundStartPayload),
    /// A solver streamed partial text.
    Chunk(ChunkPayload),
    /// A solver's guess was evaluated.
    Result(ResultPayload),
    /// Every worker of a round has returned.
    RoundSummary(RoundSummaryPayload),
    /// The game has been scored and recorded.
    Terminal(TerminalPayload),
    /// A submission was rejected.
    Error(ErrorPayload),
}

impl SessionEvent {
    /// Creates a `SessionStart` event.
    #[must_use]
    pub const fn session_start(solvers: Vec<SolverInfo>) -> Self {
        Self::SessionStart(SessionStartPayload { solvers })
    }

    /// Creates a `RoundStart` event.
    #[must_use]
    pub const fn round_start(round: u32) -> Self {
        Self::RoundStart(RoundStartPayload { round })
    }

    /// Creates a `Chunk` event.
    #[must_use]
    pub fn chunk(solver: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Chunk(ChunkPayload {
            solver: solver.into(),
            content: content.into(),
        })
    }

    /// Creates a `Result` event.
    #[must_use]
    pub fn result(solver: impl Into<String>, correct: bool) -> Self {
        Self::Result(ResultPayload {
            solver: solver.into(),
            correct,
        })
    }

    /// Creates an `Error` event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }

    /// Returns the event name as a string.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::SessionStart(_) => "session_start",
            Self::RoundStart(_) => "round_start",
            Self::Chunk(_) => "chunk",
            Self::Result(_) => "result",
            Self::RoundSummary(_) => "round_summary",
            Self::Terminal(_) => "terminal",
            Self::Error(_) => "error",
        }
    }

    /// Returns `true` for the last event of a finished game.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

// ============================================================================
// Event Sink
// ============================================================================

/// Sending half of a session's event stream.
///
/// Events from one sender arrive in the order they were sent. Sending to a
/// stream whose receiver is gone is a no-op.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    /// Creates a sink and the receiver that drains it.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Sends an event. Returns `false` if nobody is listening any more.
    pub fn send(&self, event: SessionEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    /// Returns `true` once the receiver has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
