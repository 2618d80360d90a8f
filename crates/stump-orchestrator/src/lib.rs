//! Stump Orchestrator
//!
//! Plays "Stump the AI": a riddle is put to several AI solvers at once, round
//! after round with one more clue each time, and the human wins only if some,
//! but not all, of them answer correctly.
//!
//! # Modules
//!
//! - [`orchestrator`] - The round loop with its parallel fan-out and barrier
//! - [`game`] - Per-session game state and the derived outcome
//! - [`matcher`] / [`score`] - Answer comparison and scoring
//! - [`solver`] - The boundary every AI backend implements
//! - [`registry`] - In-flight games keyed by connection
//! - [`api`] / [`websocket`] - HTTP and WebSocket surface

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod matcher;
pub mod orchestrator;
pub mod registry;
pub mod score;
pub mod solver;
pub mod websocket;

pub use api::{create_router, AppState, StatusResponse};
pub use config::{
    Config, PacingConfig, Provider, SolverConfig, CONFIG_FILE_NAME, MAX_SOLVERS_PER_GAME,
    MAX_SOLVER_TIMEOUT_SECS,
};
pub use error::{Result, StumpError};
pub use events::{EventSink, RoundSummaryPayload, SessionEvent, TerminalPayload};
pub use game::{
    Difficulty, GameOutcome, GameResult, GameState, RiddleSubmission, SolverInfo, SolverState,
    ANONYMOUS,
};
pub use matcher::matches;
pub use orchestrator::{Game, GameHandle, GameReport, OrchestratorSettings, RoundOrchestrator};
pub use registry::{SessionId, SessionRegistry};
pub use score::score;
pub use solver::{dispatch, Attempt, ChunkSink, Solver, SolverError};
