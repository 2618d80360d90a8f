//! Integration tests for whole games played through the orchestrator.
//!
//! These tests drive games with scripted solvers against file-backed stores
//! and check what a finished game leaves behind on disk.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stump_ledger::{LeaderboardStore, StatsStore};
use stump_orchestrator::{
    score, ChunkSink, Difficulty, GameReport, OrchestratorSettings, PacingConfig,
    RiddleSubmission, RoundOrchestrator, SessionEvent, SessionRegistry, Solver, SolverError,
};

// ============================================================================
// Helpers
// ============================================================================

static DIR_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Returns a fresh, empty data directory under the system temp dir.
fn data_dir(label: &str) -> PathBuf {
    let n = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("stump-it-{}-{label}-{n}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("Failed to create data dir");
    dir
}

/// Replies with the next guess in its script, repeating the last one.
#[derive(Debug)]
struct ScriptedSolver {
    name: String,
    guesses: Vec<&'static str>,
    delay: Duration,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedSolver {
    fn new(name: &str, guesses: &[&'static str]) -> Arc<Self> {
        Self::delayed(name, guesses, Duration::ZERO)
    }

    fn delayed(name: &str, guesses: &[&'static str], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            guesses: guesses.to_vec(),
            delay,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Solver for ScriptedSolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, prompt: &str, chunks: &ChunkSink) -> Result<String, SolverError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let guess = self.guesses[call.min(self.guesses.len() - 1)];
        chunks.send(guess);
        Ok(guess.to_string())
    }
}

fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
        solver_timeout: Duration::from_secs(5),
        max_solvers: 3,
        pacing: PacingConfig::none(),
    }
}

fn orchestrator(
    solvers: &[Arc<ScriptedSolver>],
    stats: Arc<StatsStore>,
    leaderboard: Arc<LeaderboardStore>,
) -> Arc<RoundOrchestrator> {
    let solvers = solvers
        .iter()
        .map(|s| Arc::clone(s) as Arc<dyn Solver>)
        .collect();
    Arc::new(
        RoundOrchestrator::new(
            solvers,
            stats,
            leaderboard,
            Arc::new(SessionRegistry::new()),
            settings(),
        )
        .expect("Failed to create orchestrator"),
    )
}

fn submission(difficulty: Difficulty) -> RiddleSubmission {
    RiddleSubmission {
        riddle: "The more you take, the more you leave behind. What am I?".to_string(),
        answer: "footsteps".to_string(),
        clues: vec!["You make them when you walk".to_string()],
        difficulty,
        display_name: "Grace".to_string(),
    }
}

/// Plays one game to completion and drains its events.
async fn play(
    orchestrator: &Arc<RoundOrchestrator>,
    submission: RiddleSubmission,
) -> (GameReport, Vec<SessionEvent>) {
    let id = orchestrator.registry().allocate_id();
    let mut handle = orchestrator
        .submit(id, submission)
        .expect("Submission rejected");
    let report = tokio::time::timeout(Duration::from_secs(10), &mut handle.task)
        .await
        .expect("Game did not finish")
        .expect("Game task failed");

    let mut events = Vec::new();
    while let Ok(event) = handle.events.try_recv() {
        events.push(event);
    }
    (report, events)
}

// ============================================================================
// Persistence Tests
// ============================================================================

/// A won game is scored and written to both records on disk.
#[tokio::test]
async fn test_won_game_is_persisted() {
    let dir = data_dir("won");
    let stats = Arc::new(StatsStore::open(dir.join("stats.json")).unwrap());
    let leaderboard = Arc::new(LeaderboardStore::open(dir.join("leaderboard.json"), 10).unwrap());

    let solvers = [
        ScriptedSolver::new("alpha", &["Footsteps."]),
        ScriptedSolver::new("beta", &["a shadow"]),
    ];
    let orchestrator = orchestrator(&solvers, Arc::clone(&stats), Arc::clone(&leaderboard));

    let (report, _) = play(&orchestrator, submission(Difficulty::Hard)).await;
    assert!(report.result.player_wins);
    assert_eq!(report.result.correct_count, 1);
    assert_eq!(report.result.total_solvers, 2);
    assert_eq!(report.result.rounds_played, 2);
    assert_eq!(report.score, score(&report.result));
    assert!(report.score > 0);
    assert_eq!(report.rank, Some(1));

    // Reopen from disk, as a restarted server would.
    let stats = StatsStore::open(dir.join("stats.json")).unwrap().snapshot();
    assert_eq!(stats.total_games, 1);
    assert_eq!(stats.wins, 1);
    assert_eq!(stats.losses, 0);
    assert_eq!(stats.by_difficulty.get("hard"), Some(&1));
    assert_eq!(stats.by_solver["alpha"].times_correct, 1);
    assert_eq!(stats.by_solver["beta"].times_correct, 0);
    assert_eq!(stats.by_solver["beta"].games_played, 1);

    let entries = LeaderboardStore::open(dir.join("leaderboard.json"), 10)
        .unwrap()
        .snapshot();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].display_name, "Grace");
    assert_eq!(entries[0].score, report.score);
    assert!(entries[0].player_won);
    let names: Vec<&str> = entries[0].solvers.iter().map(|s| s.name.as_str()).collect();
    assert!(names.contains(&"alpha") && names.contains(&"beta"));
}

/// A lost game still counts in the stats and lands on the board with no score.
#[tokio::test]
async fn test_lost_game_is_persisted_with_zero_score() {
    let dir = data_dir("lost");
    let stats = Arc::new(StatsStore::open(dir.join("stats.json")).unwrap());
    let leaderboard = Arc::new(LeaderboardStore::open(dir.join("leaderboard.json"), 10).unwrap());

    let solvers = [
        ScriptedSolver::new("alpha", &["footsteps"]),
        ScriptedSolver::new("beta", &["FOOTSTEPS!"]),
    ];
    let orchestrator = orchestrator(&solvers, Arc::clone(&stats), Arc::clone(&leaderboard));

    let (report, _) = play(&orchestrator, submission(Difficulty::Easy)).await;
    assert!(!report.result.player_wins);
    assert_eq!(report.score, 0);
    assert_eq!(report.message, "AI wins! Every solver guessed correctly.");

    let stats = StatsStore::open(dir.join("stats.json")).unwrap().snapshot();
    assert_eq!(stats.total_games, 1);
    assert_eq!(stats.losses, 1);
    assert_eq!(
        LeaderboardStore::open(dir.join("leaderboard.json"), 10)
            .unwrap()
            .len(),
        1
    );
}

// ============================================================================
// Round Tests
// ============================================================================

/// Each round adds one clue, and correct solvers are not asked again.
#[tokio::test]
async fn test_clues_are_revealed_round_by_round() {
    let stats = Arc::new(StatsStore::in_memory());
    let leaderboard = Arc::new(LeaderboardStore::in_memory(10));
    let early = ScriptedSolver::new("early", &["footsteps"]);
    let late = ScriptedSolver::new("late", &["a river", "footprints", "footsteps"]);
    let orchestrator = orchestrator(
        &[Arc::clone(&early), Arc::clone(&late)],
        stats,
        leaderboard,
    );

    let mut sub = submission(Difficulty::Medium);
    sub.clues.push("They can be heard in an empty hall".to_string());

    let (report, events) = play(&orchestrator, sub).await;
    assert_eq!(early.prompts().len(), 1);
    let prompts = late.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(!prompts[0].contains("You make them when you walk"));
    assert!(prompts[1].contains("You make them when you walk"));
    assert!(prompts[2].contains("They can be heard in an empty hall"));

    // Both correct by the final round.
    assert!(!report.result.player_wins);
    assert_eq!(report.result.rounds_played, 3);
    assert_eq!(report.solvers["late"].guesses_to_correct, 3);

    let summaries = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::RoundSummary(_)))
        .count();
    assert_eq!(summaries, 3);
    assert!(matches!(events.last(), Some(SessionEvent::Terminal(_))));
}

// ============================================================================
// Concurrency Tests
// ============================================================================

/// Games on different sessions run side by side over shared stores.
#[tokio::test]
async fn test_concurrent_sessions_share_the_stores() {
    let dir = data_dir("concurrent");
    let stats = Arc::new(StatsStore::open(dir.join("stats.json")).unwrap());
    let leaderboard = Arc::new(LeaderboardStore::open(dir.join("leaderboard.json"), 3).unwrap());

    let solvers = [
        ScriptedSolver::delayed("alpha", &["footsteps"], Duration::from_millis(20)),
        ScriptedSolver::delayed("beta", &["an echo"], Duration::from_millis(20)),
    ];
    let orchestrator = orchestrator(&solvers, Arc::clone(&stats), Arc::clone(&leaderboard));

    let games: Vec<_> = (0..6)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { play(&orchestrator, submission(Difficulty::Hard)).await })
        })
        .collect();

    let mut ids = Vec::new();
    for game in games {
        let (report, _) = game.await.unwrap();
        assert!(report.result.player_wins);
        ids.push(report.id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 6);

    assert!(orchestrator.registry().is_empty());
    assert_eq!(stats.snapshot().total_games, 6);
    assert_eq!(stats.snapshot().by_solver["alpha"].games_played, 6);

    // The board is capped, on disk as well as in memory.
    assert_eq!(leaderboard.len(), 3);
    let on_disk = LeaderboardStore::open(dir.join("leaderboard.json"), 3).unwrap();
    assert_eq!(on_disk.len(), 3);
}
