//! Stump Solvers
//!
//! HTTP adapters that implement the orchestrator's [`Solver`] trait for each
//! supported backend. Every configured solver becomes one [`HttpSolver`]; all
//! of them share a single `reqwest::Client`.
//!
//! | provider | request | response |
//! |---|---|---|
//! | `openai` | chat completions, `stream: true` | SSE `data:` lines until `[DONE]` |
//! | `anthropic` | messages, `stream: true` | SSE `content_block_delta` events |
//! | `google` | `generateContent` | one JSON body |
//! | `ollama` | `/api/generate`, `stream: true` | NDJSON lines until `done` |
//! | `huggingface` | inference API | one JSON array |
//!
//! Deadlines are enforced by the orchestrator, not here.

mod anthropic;
mod gemini;
mod huggingface;
mod ollama;
mod openai;
mod stream;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use stump_orchestrator::{ChunkSink, Provider, Solver, SolverConfig, SolverError};

/// A solver backed by a remote model over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSolver {
    name: String,
    provider: Provider,
    model: String,
    api_key: Option<String>,
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl HttpSolver {
    /// Creates a solver for one configured backend.
    #[must_use]
    pub fn new(config: &SolverConfig, client: reqwest::Client) -> Self {
        Self {
            name: config.name.clone(),
            provider: config.provider,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.clone(),
            client,
        }
    }

    /// The provider-side model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The configured URL override, if any.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// The API key, or an empty string when none is configured.
    fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }
}

#[async_trait]
impl Solver for HttpSolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider(&self) -> &str {
        self.provider.as_str()
    }

    #[instrument(skip(self, prompt, chunks), fields(solver = %self.name, provider = %self.provider))]
    async fn stream(&self, prompt: &str, chunks: &ChunkSink) -> Result<String, SolverError> {
        debug!(prompt_len = prompt.len(), "Calling solver backend");
        let text = match self.provider {
            Provider::OpenAi => openai::stream(self, prompt, chunks).await,
            Provider::Anthropic => anthropic::stream(self, prompt, chunks).await,
            Provider::Google => gemini::generate(self, prompt, chunks).await,
            Provider::Ollama => ollama::stream(self, prompt, chunks).await,
            Provider::HuggingFace => huggingface::generate(self, prompt, chunks).await,
        }?;
        debug!(response_len = text.len(), "Solver backend answered");
        Ok(text)
    }
}

/// Builds one solver per configured backend, sharing `client`.
#[must_use]
pub fn build_solvers(configs: &[SolverConfig], client: &reqwest::Client) -> Vec<Arc<dyn Solver>> {
    configs
        .iter()
        .map(|config| Arc::new(HttpSolver::new(config, client.clone())) as Arc<dyn Solver>)
        .collect()
}
