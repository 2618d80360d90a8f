//! Hugging Face inference API, answered in one response body.

use serde::Deserialize;
use serde_json::json;
use stump_orchestrator::{ChunkSink, SolverError};

use crate::stream::send;
use crate::HttpSolver;

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/models";

#[derive(Debug, Deserialize)]
struct Generation {
    #[serde(default)]
    generated_text: String,
}

/// Takes the first generation, drops the echoed prompt, and trims the rest.
fn parse_body(body: &str, prompt: &str) -> Result<String, SolverError> {
    let generations: Vec<Generation> = serde_json::from_str(body).map_err(SolverError::malformed)?;
    let first = generations
        .into_iter()
        .next()
        .ok_or(SolverError::EmptyResponse)?;

    let text = first
        .generated_text
        .strip_prefix(prompt)
        .unwrap_or(&first.generated_text);
    Ok(text.trim().to_string())
}

pub(crate) async fn generate(
    solver: &HttpSolver,
    prompt: &str,
    chunks: &ChunkSink,
) -> Result<String, SolverError> {
    let url = solver
        .endpoint()
        .map_or_else(|| format!("{DEFAULT_BASE_URL}/{}", solver.model()), str::to_string);
    let body = json!({
        "inputs": prompt,
        "parameters": {"max_new_tokens": 100, "temperature": 0.7},
        "options": {"use_cache": false, "wait_for_model": true},
    });

    let response = send(
        solver
            .client
            .post(url)
            .bearer_auth(solver.api_key())
            .json(&body),
    )
    .await?;
    let body = response.text().await.map_err(SolverError::transport)?;

    let text = parse_body(&body, prompt)?;
    chunks.send(&text);
    Ok(text)
}
