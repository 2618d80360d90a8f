//! Integration tests for WebSocket game sessions.
//!
//! These tests run the real router on an ephemeral port and play games over
//! WebSocket connections, checking the event stream a browser would see and
//! what each session leaves in the shared stores.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::SinkExt;
use futures::StreamExt;
use serde_json::{json, Value};
use stump_ledger::{LeaderboardStore, StatsStore};
use stump_orchestrator::{
    create_router, AppState, ChunkSink, Config, OrchestratorSettings, PacingConfig,
    RoundOrchestrator, SessionRegistry, Solver, SolverError,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tungstenite::Message;

/// Helper type for WebSocket client
type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Answers every prompt with the same guess after a fixed delay.
#[derive(Debug)]
struct SteadySolver {
    name: &'static str,
    guess: &'static str,
    delay: Duration,
}

#[async_trait]
impl Solver for SteadySolver {
    fn name(&self) -> &str {
        self.name
    }

    fn provider(&self) -> &str {
        "steady"
    }

    async fn stream(&self, _prompt: &str, chunks: &ChunkSink) -> Result<String, SolverError> {
        tokio::time::sleep(self.delay).await;
        chunks.send(self.guess);
        Ok(self.guess.to_string())
    }
}

/// A running test server and the shared state behind it.
struct TestServer {
    ws_url: String,
    http_url: String,
    orchestrator: Arc<RoundOrchestrator>,
    stats: Arc<StatsStore>,
    leaderboard: Arc<LeaderboardStore>,
}

/// Spawns a server whose two solvers answer "piano" and "organ".
async fn spawn_test_server(delay: Duration) -> TestServer {
    let solvers: Vec<Arc<dyn Solver>> = vec![
        Arc::new(SteadySolver {
            name: "alpha",
            guess: "A piano",
            delay,
        }),
        Arc::new(SteadySolver {
            name: "beta",
            guess: "An organ",
            delay,
        }),
    ];
    let config = Config::default();
    let stats = Arc::new(StatsStore::in_memory());
    let leaderboard = Arc::new(LeaderboardStore::in_memory(config.leaderboard_capacity));
    let orchestrator = Arc::new(
        RoundOrchestrator::new(
            solvers,
            Arc::clone(&stats),
            Arc::clone(&leaderboard),
            Arc::new(SessionRegistry::new()),
            OrchestratorSettings {
                solver_timeout: Duration::from_secs(60),
                max_solvers: 3,
                pacing: PacingConfig::none(),
            },
        )
        .expect("Failed to create orchestrator"),
    );

    let router = create_router(AppState::new(
        config,
        Arc::clone(&orchestrator),
        Arc::clone(&stats),
        Arc::clone(&leaderboard),
    ));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    TestServer {
        ws_url: format!("ws://{addr}/ws"),
        http_url: format!("http://{addr}"),
        orchestrator,
        stats,
        leaderboard,
    }
}

/// Connects a WebSocket client to the given URL.
async fn connect_client(url: &str) -> WsClient {
    let (ws_stream, _) = connect_async(url)
        .await
        .expect("Failed to connect to WebSocket");
    ws_stream
}

async fn send_json(client: &mut WsClient, value: &Value) {
    client
        .send(Message::Text(value.to_string()))
        .await
        .expect("Failed to send message");
}

fn riddle() -> Value {
    json!({
        "riddle": "What has keys but can't open locks?",
        "answer": "piano",
        "clues": ["It makes music"],
        "difficulty": "hard",
        "displayName": "Ada"
    })
}

/// Receives the next text message as JSON.
/// Automatically handles ping frames by responding with pong.
async fn receive_event(client: &mut WsClient) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timeout waiting for message")
            .expect("Stream ended")
            .expect("WebSocket error");

        match msg {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("Failed to parse event");
            }
            Message::Ping(data) => {
                client
                    .send(Message::Pong(data))
                    .await
                    .expect("Failed to send pong");
            }
            Message::Pong(_) => {}
            other => panic!("Expected text message, got: {other:?}"),
        }
    }
}

/// Receives events up to and including `terminal`.
async fn receive_game(client: &mut WsClient) -> Vec<Value> {
    let mut events = Vec::new();
    loop {
        let event = receive_event(client).await;
        let done = event["event"] == "terminal";
        events.push(event);
        if done {
            return events;
        }
    }
}

fn event_names(events: &[Value]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| e["event"].as_str())
        .filter(|name| *name != "chunk")
        .collect()
}

/// Polls until no game is registered, or fails after two seconds.
async fn wait_for_idle(orchestrator: &RoundOrchestrator) {
    for _ in 0..40 {
        if orchestrator.registry().is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("Session was never released");
}

// ============================================================================
// Game Flow Tests
// ============================================================================

/// A submitted riddle is played to the end over the socket.
#[tokio::test]
async fn test_game_events_arrive_in_order() {
    let server = spawn_test_server(Duration::ZERO).await;
    let mut client = connect_client(&server.ws_url).await;

    send_json(&mut client, &riddle()).await;
    let events = receive_game(&mut client).await;

    assert_eq!(
        event_names(&events),
        vec![
            "session_start",
            "round_start",
            "result",
            "result",
            "round_summary",
            "round_start",
            "result",
            "round_summary",
            "terminal",
        ]
    );

    let selected = events[0]["payload"]["solvers"].as_array().unwrap();
    assert_eq!(selected.len(), 2);

    let first_summary = events.iter().find(|e| e["event"] == "round_summary").unwrap();
    assert_eq!(first_summary["payload"]["round"], 0);
    assert_eq!(first_summary["payload"]["gameOver"], false);
    assert_eq!(first_summary["payload"]["nextRound"], 1);
    assert_eq!(first_summary["payload"]["correctCount"], 1);

    let terminal = &events.last().unwrap()["payload"];
    assert_eq!(terminal["playerWins"], true);
    assert_eq!(terminal["roundsPlayed"], 2);
    assert_eq!(terminal["correctCount"], 1);
    assert_eq!(terminal["totalSolvers"], 2);
    assert!(terminal["score"].as_u64().unwrap() > 0);
    assert_eq!(
        terminal["message"],
        "You win! Some AI solvers guessed correctly, but not all."
    );

    wait_for_idle(&server.orchestrator).await;
    assert_eq!(server.leaderboard.len(), 1);
    assert_eq!(server.stats.snapshot().total_games, 1);
}

/// Chunks carry the solver name and arrive before that solver's result.
#[tokio::test]
async fn test_chunks_precede_results() {
    let server = spawn_test_server(Duration::ZERO).await;
    let mut client = connect_client(&server.ws_url).await;

    send_json(&mut client, &riddle()).await;
    let events = receive_game(&mut client).await;

    let chunk = events
        .iter()
        .position(|e| e["event"] == "chunk" && e["payload"]["solver"] == "alpha")
        .expect("No chunk from alpha");
    let result = events
        .iter()
        .position(|e| e["event"] == "result" && e["payload"]["solver"] == "alpha")
        .expect("No result for alpha");
    assert!(chunk < result);
    assert_eq!(events[chunk]["payload"]["content"], "A piano");
    assert_eq!(events[result]["payload"]["correct"], true);
}

/// The same connection may play again once a game has finished.
#[tokio::test]
async fn test_connection_plays_consecutive_games() {
    let server = spawn_test_server(Duration::ZERO).await;
    let mut client = connect_client(&server.ws_url).await;

    send_json(&mut client, &riddle()).await;
    receive_game(&mut client).await;
    send_json(&mut client, &riddle()).await;
    let events = receive_game(&mut client).await;

    assert_eq!(events[0]["event"], "session_start");
    wait_for_idle(&server.orchestrator).await;
    assert_eq!(server.leaderboard.len(), 2);
}

/// Sessions on different connections do not interfere.
#[tokio::test]
async fn test_concurrent_connections() {
    let server = spawn_test_server(Duration::from_millis(50)).await;

    let mut clients = Vec::new();
    for _ in 0..4 {
        let mut client = connect_client(&server.ws_url).await;
        send_json(&mut client, &riddle()).await;
        clients.push(client);
    }

    for client in &mut clients {
        let events = receive_game(client).await;
        assert_eq!(events.last().unwrap()["payload"]["playerWins"], true);
    }

    wait_for_idle(&server.orchestrator).await;
    assert_eq!(server.leaderboard.len(), 4);
    assert_eq!(server.stats.snapshot().total_games, 4);
}

// ============================================================================
// Rejection Tests
// ============================================================================

/// Bad submissions get an error event and leave the connection usable.
#[tokio::test]
async fn test_invalid_submission_gets_error_event() {
    let server = spawn_test_server(Duration::ZERO).await;
    let mut client = connect_client(&server.ws_url).await;

    send_json(&mut client, &json!({"riddle": "  ", "answer": "piano", "clues": ["c"]})).await;
    let event = receive_event(&mut client).await;
    assert_eq!(event["event"], "error");
    assert!(event["payload"]["message"].as_str().unwrap().contains("riddle"));

    send_json(&mut client, &json!({"riddle": "r", "answer": "piano", "clues": []})).await;
    let event = receive_event(&mut client).await;
    assert_eq!(event["event"], "error");
    assert!(event["payload"]["message"].as_str().unwrap().contains("clue"));

    client
        .send(Message::Text("not json".to_string()))
        .await
        .expect("Failed to send message");
    let event = receive_event(&mut client).await;
    assert_eq!(event["event"], "error");

    assert!(server.orchestrator.registry().is_empty());

    send_json(&mut client, &riddle()).await;
    let events = receive_game(&mut client).await;
    assert_eq!(events[0]["event"], "session_start");
}

/// A second submission while a game is running is refused.
#[tokio::test]
async fn test_submission_during_game_is_rejected() {
    let server = spawn_test_server(Duration::from_millis(300)).await;
    let mut client = connect_client(&server.ws_url).await;

    send_json(&mut client, &riddle()).await;
    send_json(&mut client, &riddle()).await;
    let events = receive_game(&mut client).await;

    let errors: Vec<&Value> = events.iter().filter(|e| e["event"] == "error").collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0]["payload"]["message"],
        "A game is already in progress for this session"
    );
    let starts = events.iter().filter(|e| e["event"] == "session_start").count();
    assert_eq!(starts, 1);

    wait_for_idle(&server.orchestrator).await;
    assert_eq!(server.leaderboard.len(), 1);
}

/// Closing the socket mid-game abandons the game without recording it.
#[tokio::test]
async fn test_disconnect_mid_game_is_not_recorded() {
    let server = spawn_test_server(Duration::from_secs(30)).await;
    let mut client = connect_client(&server.ws_url).await;

    send_json(&mut client, &riddle()).await;
    assert_eq!(receive_event(&mut client).await["event"], "session_start");
    assert_eq!(receive_event(&mut client).await["event"], "round_start");
    assert_eq!(server.orchestrator.registry().len(), 1);

    client.close(None).await.expect("Failed to close");
    drop(client);

    wait_for_idle(&server.orchestrator).await;
    assert!(server.leaderboard.is_empty());
    assert_eq!(server.stats.snapshot().total_games, 0);
}

// ============================================================================
// HTTP Tests
// ============================================================================

/// The status endpoint reports sessions in flight.
#[tokio::test]
async fn test_status_reports_active_sessions() {
    let server = spawn_test_server(Duration::from_secs(30)).await;
    let status_url = format!("{}/api/status", server.http_url);

    let status: Value = reqwest::get(&status_url).await.unwrap().json().await.unwrap();
    assert_eq!(status["activeSessions"], 0);
    assert_eq!(status["configuredSolvers"], 3);
    assert_eq!(status["maxSolvers"], 3);

    let mut client = connect_client(&server.ws_url).await;
    send_json(&mut client, &riddle()).await;
    assert_eq!(receive_event(&mut client).await["event"], "session_start");

    let status: Value = reqwest::get(&status_url).await.unwrap().json().await.unwrap();
    assert_eq!(status["activeSessions"], 1);
}

/// Finished games show up on the leaderboard and stats endpoints.
#[tokio::test]
async fn test_leaderboard_and_stats_endpoints() {
    let server = spawn_test_server(Duration::ZERO).await;
    let mut client = connect_client(&server.ws_url).await;
    send_json(&mut client, &riddle()).await;
    receive_game(&mut client).await;
    wait_for_idle(&server.orchestrator).await;

    let board: Value = reqwest::get(format!("{}/api/leaderboard", server.http_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entries = board.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["displayName"], "Ada");
    assert_eq!(entries[0]["playerWon"], true);

    let stats: Value = reqwest::get(format!("{}/api/stats", server.http_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["totalGames"], 1);
    assert_eq!(stats["wins"], 1);

    let solvers: Value = reqwest::get(format!("{}/api/solvers", server.http_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    for solver in solvers.as_array().unwrap() {
        assert!(solver.get("apiKey").is_none());
    }
}
