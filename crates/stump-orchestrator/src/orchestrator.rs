//! The round loop: fan a riddle out to the selected solvers, wait for all of
//! them, decide whether the game is over, and record the finished game.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::seq::IndexedRandom;
use rand::Rng;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, instrument, warn};

use stump_ledger::{GameSummary, LeaderboardEntry, LeaderboardStore, SolverDetail, SolverRecord, StatsStore};

use crate::config::{Config, PacingConfig, MAX_SOLVERS_PER_GAME, MAX_SOLVER_TIMEOUT_SECS};
use crate::error::{Result, StumpError};
use crate::events::{EventSink, RoundSummaryPayload, SessionEvent, TerminalPayload};
use crate::game::{GameResult, GameState, RiddleSubmission, SolverInfo, SolverState};
use crate::registry::{SessionId, SessionRegistry};
use crate::score::score;
use crate::solver::{dispatch, Solver};

/// Tunables of the round loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Deadline for one solver call.
    pub solver_timeout: Duration,
    /// How many solvers are drawn for each game.
    pub max_solvers: usize,
    /// Presentation-only pauses.
    pub pacing: PacingConfig,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl OrchestratorSettings {
    /// Takes the round-loop settings from a loaded configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            solver_timeout: config.solver_timeout(),
            max_solvers: config.max_solvers,
            pacing: config.pacing,
        }
    }
}

/// A started game: its state plus the solvers selected for it.
#[derive(Debug, Clone)]
pub struct Game {
    /// The session playing this game.
    pub id: SessionId,
    /// Shared with the registry and the round's workers.
    pub state: Arc<Mutex<GameState>>,
    solvers: Vec<Arc<dyn Solver>>,
}

/// A game running on its own task.
#[derive(Debug)]
pub struct GameHandle {
    /// The session playing this game.
    pub id: SessionId,
    /// Events of this game, ending with `terminal`.
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    /// Resolves to the report once the game is recorded.
    pub task: JoinHandle<GameReport>,
}

/// What a finished game produced.
#[derive(Debug, Clone, PartialEq)]
pub struct GameReport {
    /// The session that played the game.
    pub id: SessionId,
    /// Outcome facts fed to scoring and persistence.
    pub result: GameResult,
    /// Final score.
    pub score: u32,
    /// 1-based leaderboard rank, `None` if the entry did not make the board.
    pub rank: Option<usize>,
    /// Outcome message.
    pub message: String,
    /// Final solver snapshot keyed by name.
    pub solvers: BTreeMap<String, SolverState>,
}

/// Drives games from submission to the recorded result.
#[derive(Debug)]
pub struct RoundOrchestrator {
    solvers: Vec<Arc<dyn Solver>>,
    stats: Arc<StatsStore>,
    leaderboard: Arc<LeaderboardStore>,
    registry: Arc<SessionRegistry>,
    settings: OrchestratorSettings,
}

impl RoundOrchestrator {
    /// Creates an orchestrator over the configured solvers and shared stores.
    ///
    /// # Errors
    ///
    /// Returns `StumpError::ConfigValidationError` if `solvers` is empty, or
    /// if `settings` asks for more than three solvers per game or a deadline
    /// over a minute.
    pub fn new(
        solvers: Vec<Arc<dyn Solver>>,
        stats: Arc<StatsStore>,
        leaderboard: Arc<LeaderboardStore>,
        registry: Arc<SessionRegistry>,
        settings: OrchestratorSettings,
    ) -> Result<Self> {
        if solvers.is_empty() {
            return Err(StumpError::config_validation(
                "no solvers available",
                "Configure at least one solver in your config.json",
            ));
        }

        if settings.max_solvers == 0 || settings.max_solvers > MAX_SOLVERS_PER_GAME {
            return Err(StumpError::config_validation(
                format!(
                    "solvers per game must be between 1 and {MAX_SOLVERS_PER_GAME}, got {}",
                    settings.max_solvers
                ),
                "Set maxSolvers to 3 or less in your config.json",
            ));
        }
        if settings.solver_timeout > Duration::from_secs(MAX_SOLVER_TIMEOUT_SECS) {
            return Err(StumpError::config_validation(
                format!("solver timeout must be at most {MAX_SOLVER_TIMEOUT_SECS}s"),
                "Lower solverTimeoutSecs in your config.json",
            ));
        }

        Ok(Self {
            solvers,
            stats,
            leaderboard,
            registry,
            settings,
        })
    }

    /// The shared session registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The settings this orchestrator runs with.
    #[must_use]
    pub const fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Picks the solvers for one game.
    ///
    /// With more solvers configured than `max_solvers`, draws that many
    /// uniformly at random without replacement; otherwise takes them all.
    pub fn select_solvers<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Arc<dyn Solver>> {
        if self.solvers.len() <= self.settings.max_solvers {
            return self.solvers.clone();
        }
        self.solvers
            .choose_multiple(rng, self.settings.max_solvers)
            .cloned()
            .collect()
    }

    /// Validates a submission and registers a new game for `id`.
    ///
    /// # Errors
    ///
    /// Returns `StumpError::InvalidSubmission` for a bad submission, or
    /// `StumpError::GameInProgress` if `id` is already playing.
    pub fn start(&self, id: SessionId, submission: RiddleSubmission) -> Result<Game> {
        let submission = submission.validate()?;
        if self.registry.contains(id) {
            return Err(StumpError::GameInProgress);
        }

        let solvers = self.select_solvers(&mut rand::rng());
        let selected = solvers
            .iter()
            .map(|s| SolverInfo {
                name: s.name().to_string(),
                provider: s.provider().to_string(),
            })
            .collect();
        let state = Arc::new(Mutex::new(GameState::new(submission, selected)));

        if !self.registry.insert(id, Arc::clone(&state)) {
            return Err(StumpError::GameInProgress);
        }
        info!(session = %id, solvers = solvers.len(), "Game started");

        Ok(Game { id, state, solvers })
    }

    /// Starts a game for `id` and plays it on its own task.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    pub fn submit(self: &Arc<Self>, id: SessionId, submission: RiddleSubmission) -> Result<GameHandle> {
        let game = self.start(id, submission)?;
        let (sink, events) = EventSink::channel();
        let orchestrator = Arc::clone(self);
        let task = tokio::spawn(async move { orchestrator.run(&game, &sink).await });

        Ok(GameHandle { id, events, task })
    }

    /// Stops a running game without recording it.
    pub fn abandon(&self, handle: &GameHandle) {
        handle.task.abort();
        if self.registry.remove(handle.id).is_some() {
            info!(session = %handle.id, "Game abandoned");
        }
    }

    /// Plays `game` round by round until it ends, then records it.
    #[instrument(skip_all, fields(session = %game.id))]
    pub async fn run(&self, game: &Game, events: &EventSink) -> GameReport {
        let selected = game.state.lock().await.selected.clone();
        events.send(SessionEvent::session_start(selected));

        loop {
            let round = game.state.lock().await.current_round;
            events.send(SessionEvent::round_start(round));

            self.play_round(game, events).await;

            let (outcome, solvers) = {
                let state = game.state.lock().await;
                (state.outcome(), state.solvers.clone())
            };
            let game_over = outcome.is_terminal();
            debug!(
                round,
                correct = outcome.correct_count,
                total = outcome.total_solvers,
                all_correct = outcome.all_correct,
                clues_exhausted = outcome.clues_exhausted,
                game_over,
                "Round evaluated"
            );

            events.send(SessionEvent::RoundSummary(RoundSummaryPayload {
                round,
                outcome,
                solvers,
                game_over,
                next_round: (!game_over).then_some(round + 1),
            }));

            if game_over {
                break;
            }
            pause(self.settings.pacing.round_pause()).await;
            game.state.lock().await.current_round += 1;
        }

        pause(self.settings.pacing.finish_pause()).await;
        let state = game.state.lock().await;
        self.finalize(game.id, &state, events)
    }

    /// Dispatches one worker per solver that is not yet correct and waits for
    /// every one of them.
    async fn play_round(&self, game: &Game, events: &EventSink) {
        let prompts: Vec<(Arc<dyn Solver>, String)> = {
            let state = game.state.lock().await;
            let pending = state.pending_solvers();
            game.solvers
                .iter()
                .filter(|s| pending.iter().any(|name| name == s.name()))
                .map(|s| (Arc::clone(s), state.build_prompt(s.name())))
                .collect()
        };

        let mut workers = JoinSet::new();
        for (solver, prompt) in prompts {
            let state = Arc::clone(&game.state);
            let events = events.clone();
            let deadline = self.settings.solver_timeout;

            workers.spawn(async move {
                let attempt = dispatch(solver.as_ref(), &prompt, deadline, &events).await;
                let correct = state.lock().await.record_attempt(
                    solver.name(),
                    attempt.guess(),
                    attempt.elapsed_secs,
                );
                if let Some(correct) = correct {
                    events.send(SessionEvent::result(solver.name(), correct));
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Solver worker did not complete");
            }
        }
    }

    /// Scores the game, updates both shared stores, emits `terminal`, and
    /// releases the session.
    ///
    /// Runs without suspending, so an aborted game is either fully recorded
    /// or not recorded at all.
    fn finalize(&self, id: SessionId, state: &GameState, events: &EventSink) -> GameReport {
        let outcome = state.outcome();
        let result = state.result(Utc::now());
        let score = score(&result);
        let message = outcome.message().to_string();

        let mut records = Vec::with_capacity(state.selected.len());
        let mut details = Vec::with_capacity(state.selected.len());
        for solver in state.selected.iter().filter_map(|info| state.solvers.get(&info.name)) {
            records.push(SolverRecord {
                name: solver.name.clone(),
                provider: solver.provider.clone(),
                correct: solver.correct,
                response_time: solver.response_time,
                guesses_to_correct: solver.guesses_to_correct,
            });
            details.push(SolverDetail {
                name: solver.name.clone(),
                provider: solver.provider.clone(),
                correct: solver.correct,
                response_time: solver.response_time,
                final_guess: solver.final_guess().to_string(),
            });
        }
        self.stats.record_game(
            &GameSummary {
                player_wins: result.player_wins,
                difficulty: result.difficulty.to_string(),
                duration_secs: result.duration_secs,
            },
            &records,
        );

        let rank = self.leaderboard.insert(LeaderboardEntry {
            riddle: state.riddle.clone(),
            difficulty: result.difficulty.to_string(),
            display_name: result.display_name.clone(),
            player_won: result.player_wins,
            correct_count: result.correct_count,
            total_solvers: result.total_solvers,
            duration: result.duration_secs,
            timestamp: result.timestamp,
            score,
            solvers: details,
        });

        events.send(SessionEvent::Terminal(TerminalPayload {
            player_wins: result.player_wins,
            score,
            duration: result.duration_secs,
            correct_count: result.correct_count,
            total_solvers: result.total_solvers,
            rounds_played: result.rounds_played,
            solvers: state.solvers.clone(),
            message: message.clone(),
        }));
        self.registry.remove(id);

        info!(
            player_wins = result.player_wins,
            correct = result.correct_count,
            total = result.total_solvers,
            rounds = result.rounds_played,
            score,
            rank = ?rank,
            "Game finished"
        );

        GameReport {
            id,
            result,
            score,
            rank,
            message,
            solvers: state.solvers.clone(),
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
