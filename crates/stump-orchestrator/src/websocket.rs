//! WebSocket game sessions.
//!
//! Each connection is one session. The client sends a riddle submission as a
//! JSON text message; the server answers with the game's [`SessionEvent`]s,
//! ending with `terminal`. Once a game has finished, the same connection may
//! submit another riddle. Closing the connection mid-game abandons the game
//! without recording it.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::api::AppState;
use crate::error::StumpError;
use crate::events::SessionEvent;
use crate::game::RiddleSubmission;
use crate::orchestrator::GameHandle;
use crate::registry::SessionId;

/// Interval between heartbeat pings.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum number of missed pong responses before disconnecting.
const MAX_MISSED_PONGS: u8 = 3;

/// WebSocket upgrade handler.
///
/// Called when a client connects to `/ws`. Upgrades the HTTP connection
/// to a WebSocket and plays games over it.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("New WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles a single WebSocket connection.
///
/// - Accepts riddle submissions, one game at a time
/// - Forwards the running game's events to the client
/// - Sends heartbeat pings every 30 seconds
/// - Closes connection after 3 missed pongs
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let orchestrator = Arc::clone(&state.orchestrator);
    let id = orchestrator.registry().allocate_id();
    let (mut sender, mut receiver) = socket.split();
    info!(session = %id, "WebSocket client connected");

    let mut game: Option<GameHandle> = None;
    let mut heartbeat_interval = interval(HEARTBEAT_INTERVAL);
    let mut missed_pongs = 0u8;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if game.is_some() {
                            let event = SessionEvent::error(StumpError::GameInProgress.to_string());
                            if !send_event(&mut sender, &event).await {
                                break;
                            }
                            continue;
                        }

                        match start_game(&state, id, &text) {
                            Ok(handle) => game = Some(handle),
                            Err(e) => {
                                if e.is_rejection() {
                                    debug!(session = %id, error = %e, "Rejected submission");
                                } else {
                                    warn!(session = %id, error = %e, "Failed to start game");
                                }
                                if !send_event(&mut sender, &SessionEvent::error(e.to_string())).await {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        missed_pongs = 0;
                        debug!("Received pong from client");
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!(session = %id, "Client requested close");
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!("Ignoring binary message from client");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            debug!("Failed to send pong, client disconnected");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }

            event = next_event(&mut game) => {
                match event {
                    Some(event) => {
                        let terminal = event.is_terminal();
                        if !send_event(&mut sender, &event).await {
                            break;
                        }
                        if terminal {
                            finish_game(&mut game).await;
                        }
                    }
                    None => {
                        // The game task ended without a terminal event.
                        finish_game(&mut game).await;
                        let event = SessionEvent::error("The game ended unexpectedly");
                        if !send_event(&mut sender, &event).await {
                            break;
                        }
                    }
                }
            }

            _ = heartbeat_interval.tick() => {
                if sender.send(Message::Ping(vec![])).await.is_err() {
                    debug!("Failed to send ping, client disconnected");
                    break;
                }
                missed_pongs += 1;
                if missed_pongs >= MAX_MISSED_PONGS {
                    info!("Client missed {} pongs, closing connection", MAX_MISSED_PONGS);
                    break;
                }
            }
        }
    }

    if let Some(handle) = game.take() {
        orchestrator.abandon(&handle);
    }
    info!(session = %id, "WebSocket client disconnected");
}

/// Parses a submission and starts its game.
fn start_game(state: &AppState, id: SessionId, text: &str) -> crate::Result<GameHandle> {
    let submission: RiddleSubmission = serde_json::from_str(text)?;
    state.orchestrator.submit(id, submission)
}

/// Waits for the running game's next event; never resolves when idle.
async fn next_event(game: &mut Option<GameHandle>) -> Option<SessionEvent> {
    match game {
        Some(handle) => handle.events.recv().await,
        None => std::future::pending().await,
    }
}

/// Waits for a finished game's task so its session is released before the
/// next submission is accepted.
async fn finish_game(game: &mut Option<GameHandle>) {
    let Some(handle) = game.take() else {
        return;
    };
    match handle.task.await {
        Ok(report) => debug!(session = %report.id, score = report.score, "Game recorded"),
        Err(e) => warn!(session = %handle.id, error = %e, "Game task failed"),
    }
}

/// Serializes and sends one event. Returns `false` once the client is gone.
async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &SessionEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize {} event: {}", event.event_name(), e);
            return true;
        }
    };

    if sender.send(Message::Text(json)).await.is_err() {
        debug!("Failed to send event, client disconnected");
        return false;
    }
    true
}
