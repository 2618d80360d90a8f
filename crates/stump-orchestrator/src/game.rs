//! Game state types for one riddle session.
//!
//! This module defines the inbound riddle submission, the per-session
//! [`GameState`] with its per-solver [`SolverState`] map, and the derived
//! [`GameOutcome`] used to decide when a game ends.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StumpError};
use crate::matcher::matches;

/// Display name used when a submission does not carry one.
pub const ANONYMOUS: &str = "Anonymous";

// ============================================================================
// Difficulty
// ============================================================================

/// Difficulty tag of a riddle, kept verbatim.
///
/// Only the exact tags `easy`, `medium` and `hard` are recognised; anything
/// else (including an empty tag) scores with a multiplier of 1.0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Difficulty {
    /// `easy`
    Easy,
    /// `medium`
    Medium,
    /// `hard`
    Hard,
    /// Any other tag.
    Other(String),
}

impl Difficulty {
    /// Returns the scoring multiplier for this difficulty.
    #[must_use]
    pub const fn multiplier(&self) -> f64 {
        match self {
            Self::Easy | Self::Other(_) => 1.0,
            Self::Medium => 1.5,
            Self::Hard => 2.0,
        }
    }

    /// Returns the tag as submitted.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Other(tag) => tag,
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for Difficulty {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "easy" => Self::Easy,
            "medium" => Self::Medium,
            "hard" => Self::Hard,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for Difficulty {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<Difficulty> for String {
    fn from(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RiddleSubmission
// ============================================================================

/// The one inbound command that starts a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiddleSubmission {
    /// The riddle text.
    pub riddle: String,
    /// The canonical answer.
    pub answer: String,
    /// Clues revealed one per round after the first.
    #[serde(default)]
    pub clues: Vec<String>,
    /// Difficulty tag.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Name shown on the leaderboard.
    #[serde(default, alias = "username")]
    pub display_name: String,
}

impl RiddleSubmission {
    /// Trims every field, drops blank clues, and defaults the display name.
    ///
    /// # Errors
    ///
    /// Returns `StumpError::InvalidSubmission` if the riddle or answer is
    /// blank, or if no non-blank clue remains.
    pub fn validate(self) -> Result<Self> {
        let riddle = self.riddle.trim().to_string();
        if riddle.is_empty() {
            return Err(StumpError::invalid_submission("riddle", "must not be empty"));
        }

        let answer = self.answer.trim().to_string();
        if answer.is_empty() {
            return Err(StumpError::invalid_submission("answer", "must not be empty"));
        }

        let clues: Vec<String> = self
            .clues
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        if clues.is_empty() {
            return Err(StumpError::invalid_submission(
                "clues",
                "must contain at least one clue",
            ));
        }

        let display_name = match self.display_name.trim() {
            "" => ANONYMOUS.to_string(),
            name => name.to_string(),
        };

        Ok(Self {
            riddle,
            answer,
            clues,
            difficulty: self.difficulty,
            display_name,
        })
    }
}

// ============================================================================
// SolverState
// ============================================================================

/// Name and provider label of a selected solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverInfo {
    /// Solver display name.
    pub name: String,
    /// Provider label.
    pub provider: String,
}

/// Per-solver progress within one game.
///
/// The three histories only grow together, one entry per non-empty guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverState {
    /// Solver display name.
    pub name: String,
    /// Provider label.
    pub provider: String,
    /// Whether the solver has answered correctly. Never reset once set.
    pub correct: bool,
    /// 1-based round of the first correct answer, 0 until then.
    pub round: u32,
    /// Last guess, empty if the last attempt produced nothing.
    pub guess: String,
    /// Seconds taken by the last attempt.
    pub response_time: f64,
    /// Number of attempts dispatched, failed ones included.
    pub guess_count: u32,
    /// `guess_count` at the moment the solver first became correct.
    pub guesses_to_correct: u32,
    all_guesses: Vec<String>,
    guess_results: Vec<bool>,
    response_times: Vec<f64>,
}

impl SolverState {
    /// Creates a fresh state for a selected solver.
    #[must_use]
    pub fn new(info: &SolverInfo) -> Self {
        Self {
            name: info.name.clone(),
            provider: info.provider.clone(),
            correct: false,
            round: 0,
            guess: String::new(),
            response_time: 0.0,
            guess_count: 0,
            guesses_to_correct: 0,
            all_guesses: Vec::new(),
            guess_results: Vec::new(),
            response_times: Vec::new(),
        }
    }

    /// Records one dispatched attempt.
    ///
    /// `guess` is `None` for a failed attempt. Blank text counts as no guess.
    /// Returns whether the guess matched, or `None` when there was no guess.
    pub fn record_attempt(
        &mut self,
        guess: Option<&str>,
        response_time: f64,
        canonical: &str,
        round_number: u32,
    ) -> Option<bool> {
        self.guess_count += 1;
        self.response_time = response_time;

        let Some(guess) = guess.map(str::trim).filter(|g| !g.is_empty()) else {
            self.guess.clear();
            return None;
        };

        let is_correct = matches(guess, canonical);
        self.guess = guess.to_string();
        self.all_guesses.push(guess.to_string());
        self.guess_results.push(is_correct);
        self.response_times.push(response_time);

        if is_correct && !self.correct {
            self.correct = true;
            self.round = round_number;
            self.guesses_to_correct = self.guess_count;
        }
        Some(is_correct)
    }

    /// Every non-empty guess, in order.
    #[must_use]
    pub fn all_guesses(&self) -> &[String] {
        &self.all_guesses
    }

    /// Whether each guess in [`all_guesses`](Self::all_guesses) matched.
    #[must_use]
    pub fn guess_results(&self) -> &[bool] {
        &self.guess_results
    }

    /// Response time of each guess in [`all_guesses`](Self::all_guesses).
    #[must_use]
    pub fn response_times(&self) -> &[f64] {
        &self.response_times
    }

    /// Previous guesses that did not match.
    pub fn incorrect_guesses(&self) -> impl Iterator<Item = &str> {
        self.all_guesses
            .iter()
            .zip(&self.guess_results)
            .filter(|(_, correct)| !**correct)
            .map(|(guess, _)| guess.as_str())
    }

    /// Last non-empty guess, or empty if the solver never answered.
    #[must_use]
    pub fn final_guess(&self) -> &str {
        self.all_guesses.last().map_or("", String::as_str)
    }
}

// ============================================================================
// GameState
// ============================================================================

/// The in-flight state of one riddle session.
#[derive(Debug, Clone)]
pub struct GameState {
    /// The riddle text.
    pub riddle: String,
    /// The canonical answer.
    pub answer: String,
    /// Non-empty clue sequence.
    pub clues: Vec<String>,
    /// Difficulty tag.
    pub difficulty: Difficulty,
    /// 0-based index of the round being played.
    pub current_round: u32,
    /// When the game started.
    pub started_at: DateTime<Utc>,
    /// Name shown on the leaderboard.
    pub display_name: String,
    /// Solvers chosen for this game, in selection order.
    pub selected: Vec<SolverInfo>,
    /// Progress keyed by solver name.
    pub solvers: BTreeMap<String, SolverState>,
}

impl GameState {
    /// Creates the state for a validated submission and its selected solvers.
    #[must_use]
    pub fn new(submission: RiddleSubmission, selected: Vec<SolverInfo>) -> Self {
        let solvers = selected
            .iter()
            .map(|info| (info.name.clone(), SolverState::new(info)))
            .collect();

        Self {
            riddle: submission.riddle,
            answer: submission.answer,
            clues: submission.clues,
            difficulty: submission.difficulty,
            current_round: 0,
            started_at: Utc::now(),
            display_name: submission.display_name,
            selected,
            solvers,
        }
    }

    /// Builds the prompt for `solver` in the current round.
    ///
    /// Clues revealed so far are appended after round 0, followed by this
    /// solver's own incorrect guesses. Other solvers' guesses never leak in.
    #[must_use]
    pub fn build_prompt(&self, solver: &str) -> String {
        let mut prompt = format!(
            "Answer this riddle with just the answer (one or two words maximum):\n\n{}",
            self.riddle
        );

        if self.current_round > 0 {
            let revealed = (self.current_round as usize).min(self.clues.len());
            prompt.push_str("\n\nClues:\n");
            prompt.push_str(&self.clues[..revealed].join("\n"));
            prompt.push_str("\n\nProvide only the answer.");
        }

        if let Some(state) = self.solvers.get(solver) {
            let previous: Vec<&str> = state.incorrect_guesses().collect();
            if !previous.is_empty() {
                prompt.push_str("\n\nDo not repeat these previous incorrect guesses: ");
                prompt.push_str(&previous.join(", "));
            }
        }
        prompt
    }

    /// Names of selected solvers that have not yet answered correctly.
    #[must_use]
    pub fn pending_solvers(&self) -> Vec<String> {
        self.selected
            .iter()
            .filter(|info| self.solvers.get(&info.name).is_some_and(|s| !s.correct))
            .map(|info| info.name.clone())
            .collect()
    }

    /// Records an attempt for `solver` in the current round.
    ///
    /// Returns `None` for an unknown solver or an empty attempt.
    pub fn record_attempt(
        &mut self,
        solver: &str,
        guess: Option<&str>,
        response_time: f64,
    ) -> Option<bool> {
        let round_number = self.current_round + 1;
        let state = self.solvers.get_mut(solver)?;
        state.record_attempt(guess, response_time, &self.answer, round_number)
    }

    /// Evaluates the game as it stands.
    #[must_use]
    pub fn outcome(&self) -> GameOutcome {
        GameOutcome::evaluate(self.solvers.values(), self.current_round, self.clues.len())
    }

    /// Builds the result of a finished game.
    #[must_use]
    pub fn result(&self, finished_at: DateTime<Utc>) -> GameResult {
        let outcome = self.outcome();
        let duration_secs = (finished_at - self.started_at)
            .to_std()
            .map_or(0.0, |d| d.as_secs_f64());

        GameResult {
            player_wins: outcome.player_wins,
            correct_count: outcome.correct_count,
            total_solvers: outcome.total_solvers,
            difficulty: self.difficulty.clone(),
            duration_secs,
            rounds_played: self.current_round + 1,
            timestamp: finished_at,
            display_name: self.display_name.clone(),
        }
    }
}

// ============================================================================
// GameOutcome
// ============================================================================

/// Derived view of a game, recomputed after every round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOutcome {
    /// Solvers that answered correctly.
    pub correct_count: usize,
    /// Solvers taking part.
    pub total_solvers: usize,
    /// Every solver answered correctly.
    pub all_correct: bool,
    /// At least one, but not every, solver answered correctly.
    pub some_correct: bool,
    /// The round just evaluated revealed every clue.
    pub clues_exhausted: bool,
    /// The human stumped some, but not all, solvers.
    pub player_wins: bool,
}

impl GameOutcome {
    /// Computes the outcome from the solver states and round position.
    pub fn evaluate<'a>(
        solvers: impl IntoIterator<Item = &'a SolverState>,
        current_round: u32,
        clue_count: usize,
    ) -> Self {
        let (correct_count, total_solvers) = solvers
            .into_iter()
            .fold((0, 0), |(correct, total), s| (correct + usize::from(s.correct), total + 1));

        let all_correct = total_solvers > 0 && correct_count == total_solvers;
        let some_correct = correct_count > 0 && correct_count < total_solvers;

        Self {
            correct_count,
            total_solvers,
            all_correct,
            some_correct,
            clues_exhausted: current_round as usize >= clue_count,
            player_wins: some_correct && !all_correct,
        }
    }

    /// Returns `true` once the game must end.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.all_correct || self.clues_exhausted
    }

    /// Returns the message shown when the game ends.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        if self.player_wins {
            "You win! Some AI solvers guessed correctly, but not all."
        } else if self.all_correct {
            "AI wins! Every solver guessed correctly."
        } else {
            "AI wins! No solver guessed correctly within the clues."
        }
    }
}

// ============================================================================
// GameResult
// ============================================================================

/// Summary of a finished game, the input to scoring and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    /// Whether the human won.
    pub player_wins: bool,
    /// Solvers that answered correctly.
    pub correct_count: usize,
    /// Solvers taking part.
    pub total_solvers: usize,
    /// Difficulty tag.
    pub difficulty: Difficulty,
    /// Game length in seconds.
    pub duration_secs: f64,
    /// Number of rounds played.
    pub rounds_played: u32,
    /// When the game finished.
    pub timestamp: DateTime<Utc>,
    /// Name shown on the leaderboard.
    pub display_name: String,
}
