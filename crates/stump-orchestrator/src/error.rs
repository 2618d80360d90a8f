//! Error types for the Stump orchestrator.
//!
//! Solver failures are deliberately absent: a timeout, transport error or empty
//! response is a [`SolverError`](crate::SolverError) that the round loop turns
//! into a silent "no guess" and never surfaces here.

use std::path::PathBuf;

/// A specialized `Result` type for orchestrator operations.
pub type Result<T> = std::result::Result<T, StumpError>;

/// Errors that can occur while configuring the server or starting a game.
#[derive(Debug, thiserror::Error)]
pub enum StumpError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON (or an unknown solver provider) in the configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your config.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Submission Errors
    // ========================================================================
    /// A riddle submission was rejected before any session started.
    #[error("Invalid submission: {field} {message}")]
    InvalidSubmission {
        /// The offending field (e.g. `riddle`, `answer`, `clues`).
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// A riddle was submitted while this connection's game is still running.
    #[error("A game is already in progress for this session")]
    GameInProgress,

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// Failed to open a durable store.
    #[error("Failed to open durable store: {0}")]
    Ledger(#[from] stump_ledger::LedgerError),

    // ========================================================================
    // General Errors
    // ========================================================================
    /// General I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StumpError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `InvalidSubmission` error.
    #[must_use]
    pub fn invalid_submission(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidSubmission {
            field,
            message: message.into(),
        }
    }

    /// Returns `true` if this error must stop the server from starting.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseError { .. } | Self::ConfigValidationError { .. } | Self::Ledger(_)
        )
    }

    /// Returns `true` if this error rejects a single submission and should be
    /// reported back to the submitter.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidSubmission { .. } | Self::GameInProgress | Self::Json(_)
        )
    }
}
