//! HTTP API endpoints for the Stump game server.
//!
//! # Endpoints
//!
//! - `GET /ws` - Upgrade to a WebSocket game session
//! - `GET /api/solvers` - Configured solvers (credentials omitted)
//! - `GET /api/stats` - Aggregate win/loss statistics
//! - `GET /api/leaderboard` - Finished games ordered by score
//! - `GET /api/status` - Active sessions and roster size
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use stump_ledger::{LeaderboardStore, StatsStore};
//! use stump_orchestrator::{create_router, AppState, Config, OrchestratorSettings, RoundOrchestrator, SessionRegistry, Solver};
//!
//! # async fn example(solvers: Vec<Arc<dyn Solver>>) {
//! let config = Config::default();
//! let stats = Arc::new(StatsStore::in_memory());
//! let leaderboard = Arc::new(LeaderboardStore::in_memory(config.leaderboard_capacity));
//! let orchestrator = RoundOrchestrator::new(
//!     solvers,
//!     Arc::clone(&stats),
//!     Arc::clone(&leaderboard),
//!     Arc::new(SessionRegistry::new()),
//!     OrchestratorSettings::from_config(&config),
//! )
//! .unwrap();
//!
//! let state = AppState::new(config, Arc::new(orchestrator), stats, leaderboard);
//! let router = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use stump_ledger::{LeaderboardEntry, LeaderboardStore, Stats, StatsStore};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

use crate::config::{Config, SolverConfig};
use crate::orchestrator::RoundOrchestrator;
use crate::websocket::ws_handler;

// ============================================================================
// Response Types
// ============================================================================

/// Response body for the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Games currently in flight.
    pub active_sessions: usize,
    /// Solvers in the configured roster.
    pub configured_solvers: usize,
    /// Solvers drawn for each game.
    pub max_solvers: usize,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Plays submitted riddles.
    pub orchestrator: Arc<RoundOrchestrator>,
    /// Aggregate statistics shared by every session.
    pub stats: Arc<StatsStore>,
    /// Leaderboard shared by every session.
    pub leaderboard: Arc<LeaderboardStore>,
}

impl AppState {
    /// Creates a new `AppState`.
    #[must_use]
    pub const fn new(
        config: Config,
        orchestrator: Arc<RoundOrchestrator>,
        stats: Arc<StatsStore>,
        leaderboard: Arc<LeaderboardStore>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            stats,
            leaderboard,
        }
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with the WebSocket route and all API endpoints.
///
/// CORS allows any origin, and every request is traced.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/solvers", get(handle_solvers))
        .route("/stats", get(handle_stats))
        .route("/leaderboard", get(handle_leaderboard))
        .route("/status", get(handle_status));

    Router::new()
        .route("/ws", get(ws_handler))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `GET /api/solvers`.
async fn handle_solvers(State(state): State<Arc<AppState>>) -> Json<Vec<SolverConfig>> {
    Json(state.config.solvers.clone())
}

/// Handler for `GET /api/stats`.
async fn handle_stats(State(state): State<Arc<AppState>>) -> Json<Stats> {
    Json(state.stats.snapshot())
}

/// Handler for `GET /api/leaderboard`.
async fn handle_leaderboard(State(state): State<Arc<AppState>>) -> Json<Vec<LeaderboardEntry>> {
    let entries = state.leaderboard.snapshot();
    debug!(entries = entries.len(), "Serving leaderboard");
    Json(entries)
}

/// Handler for `GET /api/status`.
async fn handle_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        active_sessions: state.orchestrator.registry().len(),
        configured_solvers: state.config.solvers.len(),
        max_solvers: state.orchestrator.settings().max_solvers,
    })
}

// ============================================================================
// Tests
// ============================================================================
