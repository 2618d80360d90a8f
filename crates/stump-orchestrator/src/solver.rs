//! The solver boundary: one normalized streaming capability per AI backend.
//!
//! Provider-specific request and response handling lives outside this crate,
//! behind the [`Solver`] trait. The round loop only ever calls [`dispatch`],
//! which bounds a call with a deadline and folds every failure into an
//! [`Attempt`] without a guess.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::events::{EventSink, SessionEvent};

/// Ways a single solver call can fail.
///
/// None of these ever leave the round loop; they only mean "no guess".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    /// The call did not finish before its deadline.
    #[error("solver timed out after {secs}s")]
    Timeout {
        /// The deadline that expired.
        secs: u64,
    },

    /// The request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The backend answered without any text.
    #[error("empty response")]
    EmptyResponse,

    /// The backend's response could not be parsed.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The solver panicked mid-call.
    #[error("solver panicked")]
    Panicked,
}

impl SolverError {
    /// Creates a `Transport` error from any displayable error.
    #[must_use]
    pub fn transport(err: impl fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    /// Creates a `Malformed` error from any displayable error.
    #[must_use]
    pub fn malformed(err: impl fmt::Display) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// An AI backend that answers a prompt with streamed text.
#[async_trait]
pub trait Solver: Send + Sync + fmt::Debug {
    /// Display name, unique across the roster.
    fn name(&self) -> &str;

    /// Provider label.
    fn provider(&self) -> &str;

    /// Sends `prompt` and returns the full response text.
    ///
    /// Partial text should be forwarded to `chunks` as it arrives, in
    /// generation order.
    async fn stream(&self, prompt: &str, chunks: &ChunkSink) -> Result<String, SolverError>;
}

/// Forwards one solver's partial text to its session as `chunk` events.
#[derive(Debug, Clone)]
pub struct ChunkSink {
    solver: String,
    events: EventSink,
}

impl ChunkSink {
    /// Creates a sink that tags every chunk with `solver`.
    #[must_use]
    pub fn new(solver: impl Into<String>, events: EventSink) -> Self {
        Self {
            solver: solver.into(),
            events,
        }
    }

    /// Emits a chunk. Empty text is dropped.
    pub fn send(&self, content: &str) {
        if !content.is_empty() {
            self.events
                .send(SessionEvent::chunk(self.solver.as_str(), content));
        }
    }
}

/// What one dispatched solver call produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    /// Full response text; empty on failure.
    pub text: String,
    /// Wall-clock seconds spent on the call.
    pub elapsed_secs: f64,
    /// Why the call produced no guess, if it failed.
    pub error: Option<SolverError>,
}

impl Attempt {
    /// Returns the guess, or `None` for a failed or blank attempt.
    #[must_use]
    pub fn guess(&self) -> Option<&str> {
        if self.error.is_some() {
            return None;
        }
        Some(self.text.trim()).filter(|t| !t.is_empty())
    }

    /// An attempt that produced nothing, e.g. a worker that panicked.
    #[must_use]
    pub const fn failed(error: SolverError, elapsed_secs: f64) -> Self {
        Self {
            text: String::new(),
            elapsed_secs,
            error: Some(error),
        }
    }
}

/// Calls `solver` once, bounded by `deadline`.
///
/// Never fails: timeouts, backend errors, panics and blank responses come
/// back as an [`Attempt`] carrying the error.
pub async fn dispatch(
    solver: &dyn Solver,
    prompt: &str,
    deadline: Duration,
    events: &EventSink,
) -> Attempt {
    let chunks = ChunkSink::new(solver.name(), events.clone());
    let started = Instant::now();
    let call = AssertUnwindSafe(solver.stream(prompt, &chunks)).catch_unwind();
    let outcome = tokio::time::timeout(deadline, call).await;
    let elapsed_secs = started.elapsed().as_secs_f64();

    let result = match outcome {
        Ok(Ok(Ok(text))) if text.trim().is_empty() => Err(SolverError::EmptyResponse),
        Ok(Ok(result)) => result,
        Ok(Err(_)) => {
            warn!(solver = solver.name(), "Solver panicked during call");
            Err(SolverError::Panicked)
        }
        Err(_) => Err(SolverError::Timeout {
            secs: deadline.as_secs(),
        }),
    };

    match result {
        Ok(text) => Attempt {
            text,
            elapsed_secs,
            error: None,
        },
        Err(error) => {
            debug!(solver = solver.name(), error = %error, elapsed_secs, "Solver produced no guess");
            Attempt::failed(error, elapsed_secs)
        }
    }
}
