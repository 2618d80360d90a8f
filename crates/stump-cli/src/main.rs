//! Stump CLI
//!
//! Main entry point for serving "Stump the AI" games.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use stump_ledger::{LeaderboardStore, StatsStore};
use stump_orchestrator::{
    create_router, AppState, Config, OrchestratorSettings, RoundOrchestrator, SessionRegistry,
};
use stump_solvers::build_solvers;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Default port for the HTTP and WebSocket server.
const DEFAULT_PORT: u16 = 8080;

/// Data directory used when neither `--data-dir` nor `DATA_DIR` is set.
const DEFAULT_DATA_DIR: &str = "./data/";

/// Stats record file name inside the data directory.
const STATS_FILE: &str = "stats.json";

/// Leaderboard record file name inside the data directory.
const LEADERBOARD_FILE: &str = "leaderboard.json";

/// Stump the AI - Riddle Contest Server
///
/// Puts human-written riddles to several AI solvers at once. The human wins
/// by stumping some, but not all, of them.
#[derive(Parser, Debug)]
#[command(name = "stump")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: config.json in the data directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding config.json, stats.json and leaderboard.json
    /// (default: $DATA_DIR, then ./data/)
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Port for the HTTP and WebSocket server
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Stump starting");
    tracing::debug!(config = ?args.config, data_dir = ?args.data_dir, "Arguments");

    match run_server(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Loads everything the server needs, then serves until Ctrl+C.
async fn run_server(args: Args) -> anyhow::Result<()> {
    let data_dir = resolve_data_dir(args.data_dir, std::env::var("DATA_DIR").ok());

    let mut config = load_config(args.config.as_deref(), &data_dir)?;
    config.apply_env_overrides(|var| std::env::var(var).ok());
    print_config(&config, &data_dir);

    let stats = StatsStore::open(data_dir.join(STATS_FILE))
        .map_err(|e| anyhow::anyhow!("Failed to open stats: {e}"))?;
    let leaderboard = LeaderboardStore::open(data_dir.join(LEADERBOARD_FILE), config.leaderboard_capacity)
        .map_err(|e| anyhow::anyhow!("Failed to open leaderboard: {e}"))?;
    print_stores(&stats, &leaderboard);
    let stats = Arc::new(stats);
    let leaderboard = Arc::new(leaderboard);

    let client = reqwest::Client::new();
    let solvers = build_solvers(&config.solvers, &client);
    let orchestrator = RoundOrchestrator::new(
        solvers,
        Arc::clone(&stats),
        Arc::clone(&leaderboard),
        Arc::new(SessionRegistry::new()),
        OrchestratorSettings::from_config(&config),
    )?;

    let router = create_router(AppState::new(
        config,
        Arc::new(orchestrator),
        stats,
        leaderboard,
    ));

    let addr: SocketAddr = ([0, 0, 0, 0], args.port).into();
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    println!();
    println!("Server running on http://{addr}");
    println!("  WebSocket: ws://{addr}/ws");
    println!("Press Ctrl+C to stop");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("Server stopped");
    Ok(())
}

/// Resolves once Ctrl+C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down");
}

/// Picks the data directory: `--data-dir`, then `DATA_DIR`, then `./data/`.
fn resolve_data_dir(arg: Option<PathBuf>, env: Option<String>) -> PathBuf {
    arg.or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Loads configuration from the specified path or the data directory.
fn load_config(config_path: Option<&Path>, data_dir: &Path) -> anyhow::Result<Config> {
    match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load_from_dir(data_dir).map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Prints the loaded configuration.
fn print_config(config: &Config, data_dir: &Path) {
    println!("Configuration loaded:");
    println!("  Data directory: {}", data_dir.display());
    println!("  Solvers: {}", config.solvers.len());
    for solver in &config.solvers {
        let key = if solver.api_key.is_some() { "key set" } else { "no key" };
        println!("    - {} ({} / {}, {key})", solver.name, solver.provider, solver.model);
    }
    println!("  Solvers per game: {}", config.max_solvers);
    println!("  Solver timeout: {}s", config.solver_timeout_secs);
    println!("  Leaderboard size: {}", config.leaderboard_capacity);
}

/// Prints where the durable records live and what they hold.
fn print_stores(stats: &StatsStore, leaderboard: &LeaderboardStore) {
    let snapshot = stats.snapshot();
    if let Some(path) = stats.path() {
        println!("  Stats: {} ({} games)", path.display(), snapshot.total_games);
    }
    if let Some(path) = leaderboard.path() {
        println!(
            "  Leaderboard: {} ({}/{} entries)",
            path.display(),
            leaderboard.len(),
            leaderboard.capacity()
        );
    }
}
