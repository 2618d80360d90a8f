//! Configuration types for the Stump orchestrator.
//!
//! This module provides the solver roster, per-call deadline, selection size
//! and presentation pacing used by every game session.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StumpError};

/// The default config file name, looked up inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Most solvers a single game may put a riddle to.
pub const MAX_SOLVERS_PER_GAME: usize = 3;

/// Longest deadline a solver call may be given, in seconds.
///
/// Shorter deadlines are allowed for local models and tests.
pub const MAX_SOLVER_TIMEOUT_SECS: u64 = 60;

/// Default deadline for one solver call, in seconds.
const fn default_solver_timeout() -> u64 {
    60
}

/// Default number of solvers put to each riddle.
const fn default_max_solvers() -> usize {
    3
}

/// Default number of leaderboard entries kept.
const fn default_leaderboard_capacity() -> usize {
    stump_ledger::DEFAULT_CAPACITY
}

/// Default pause between a round summary and the next round.
const fn default_round_pause() -> u64 {
    1500
}

/// Default pause between the final round summary and the terminal event.
const fn default_finish_pause() -> u64 {
    2000
}

fn default_solvers() -> Vec<SolverConfig> {
    [
        ("Llama 2", "llama2"),
        ("Mistral", "mistral"),
        ("CodeLlama", "codellama"),
    ]
    .into_iter()
    .map(|(name, model)| SolverConfig {
        name: name.to_string(),
        provider: Provider::Ollama,
        model: model.to_string(),
        api_key: None,
        endpoint: Some("http://localhost:11434".to_string()),
    })
    .collect()
}

/// Main configuration for the game server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Every solver that may be selected for a game.
    #[serde(default = "default_solvers", alias = "models")]
    pub solvers: Vec<SolverConfig>,

    /// Deadline for one solver call, in seconds.
    #[serde(default = "default_solver_timeout")]
    pub solver_timeout_secs: u64,

    /// How many solvers are drawn for each game.
    #[serde(default = "default_max_solvers")]
    pub max_solvers: usize,

    /// How many finished games the leaderboard keeps.
    #[serde(default = "default_leaderboard_capacity")]
    pub leaderboard_capacity: usize,

    /// Presentation-only delays.
    #[serde(default)]
    pub pacing: PacingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solvers: default_solvers(),
            solver_timeout_secs: default_solver_timeout(),
            max_solvers: default_max_solvers(),
            leaderboard_capacity: default_leaderboard_capacity(),
            pacing: PacingConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `config.json` in the given data directory.
    ///
    /// If the file does not exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON, an
    /// unknown provider, or values that fail validation.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `StumpError::ConfigParseError` if the file exists but contains
    /// invalid JSON or an unknown provider.
    ///
    /// Returns `StumpError::ConfigValidationError` if the configuration values
    /// are invalid (e.g. no solvers, duplicate names, zero timeout).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(StumpError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| StumpError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `StumpError::ConfigValidationError` if any validation check fails.
    pub fn validate(&self) -> Result<()> {
        if self.solvers.is_empty() {
            return Err(StumpError::config_validation(
                "solvers must contain at least one solver",
                "Add a solver entry with a name, provider and model to your config.json",
            ));
        }

        let mut seen = HashSet::new();
        for solver in &self.solvers {
            if solver.name.trim().is_empty() {
                return Err(StumpError::config_validation(
                    "solver names must not be empty",
                    "Give every solver a unique display name in your config.json",
                ));
            }
            if !seen.insert(solver.name.as_str()) {
                return Err(StumpError::config_validation(
                    format!("duplicate solver name '{}'", solver.name),
                    "Give every solver a unique display name in your config.json",
                ));
            }
        }

        if self.solver_timeout_secs == 0 {
            return Err(StumpError::config_validation(
                "solverTimeoutSecs must be greater than 0",
                "Set solverTimeoutSecs to at least 1 second in your config.json",
            ));
        }

        if self.solver_timeout_secs > MAX_SOLVER_TIMEOUT_SECS {
            return Err(StumpError::config_validation(
                format!(
                    "solverTimeoutSecs must be at most {MAX_SOLVER_TIMEOUT_SECS}, got {}",
                    self.solver_timeout_secs
                ),
                "Lower solverTimeoutSecs in your config.json",
            ));
        }

        if self.max_solvers == 0 {
            return Err(StumpError::config_validation(
                "maxSolvers must be greater than 0",
                "Set maxSolvers to at least 1 in your config.json",
            ));
        }

        if self.max_solvers > MAX_SOLVERS_PER_GAME {
            return Err(StumpError::config_validation(
                format!(
                    "maxSolvers must be at most {MAX_SOLVERS_PER_GAME}, got {}",
                    self.max_solvers
                ),
                "Set maxSolvers to 3 or less in your config.json",
            ));
        }

        if self.leaderboard_capacity == 0 {
            return Err(StumpError::config_validation(
                "leaderboardCapacity must be greater than 0",
                "Set leaderboardCapacity to at least 1 in your config.json",
            ));
        }

        Ok(())
    }

    /// Replaces each solver's API key with `<PROVIDER>_API_KEY` when `lookup`
    /// returns a non-empty value for it.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for solver in &mut self.solvers {
            if let Some(key) = lookup(solver.provider.api_key_var()).filter(|k| !k.is_empty()) {
                solver.api_key = Some(key);
            }
        }
    }

    /// Returns the per-call solver deadline.
    #[must_use]
    pub const fn solver_timeout(&self) -> Duration {
        Duration::from_secs(self.solver_timeout_secs)
    }
}

/// Supported solver backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// `OpenAI` chat completions.
    OpenAi,
    /// Anthropic messages.
    Anthropic,
    /// Google Gemini.
    Google,
    /// A local Ollama server.
    Ollama,
    /// Hugging Face inference API.
    HuggingFace,
}

impl Provider {
    /// Parses a string into a `Provider`, case-insensitively.
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "anthropic" => Some(Self::Anthropic),
            "google" => Some(Self::Google),
            "ollama" => Some(Self::Ollama),
            "huggingface" => Some(Self::HuggingFace),
            _ => None,
        }
    }

    /// Returns the provider label used in config, stats and events.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Ollama => "ollama",
            Self::HuggingFace => "huggingface",
        }
    }

    /// Returns the environment variable that overrides this provider's key.
    #[must_use]
    pub const fn api_key_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Google => "GOOGLE_API_KEY",
            Self::Ollama => "OLLAMA_API_KEY",
            Self::HuggingFace => "HUGGINGFACE_API_KEY",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Provider {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid solver provider '{s}': expected one of 'openai', 'anthropic', 'google', 'ollama', 'huggingface'"
            ))
        })
    }
}

impl Serialize for Provider {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// One configured solver backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverConfig {
    /// Display name, unique across the roster.
    pub name: String,
    /// Which backend protocol to speak.
    pub provider: Provider,
    /// Provider-side model identifier.
    pub model: String,
    /// Credential; never serialized back out.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Optional URL override for the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Presentation-only delays, in milliseconds. Zero disables a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacingConfig {
    /// Pause after a non-final round summary, before the next round starts.
    #[serde(default = "default_round_pause")]
    pub round_pause_ms: u64,

    /// Pause after the final round summary, before the game is finalized.
    #[serde(default = "default_finish_pause")]
    pub finish_pause_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            round_pause_ms: default_round_pause(),
            finish_pause_ms: default_finish_pause(),
        }
    }
}

impl PacingConfig {
    /// No pauses at all.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            round_pause_ms: 0,
            finish_pause_ms: 0,
        }
    }

    /// Returns the pause between rounds.
    #[must_use]
    pub const fn round_pause(&self) -> Duration {
        Duration::from_millis(self.round_pause_ms)
    }

    /// Returns the pause before finalization.
    #[must_use]
    pub const fn finish_pause(&self) -> Duration {
        Duration::from_millis(self.finish_pause_ms)
    }
}
