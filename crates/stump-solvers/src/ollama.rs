//! Ollama `/api/generate`, streamed as newline-delimited JSON.

use serde::Deserialize;
use serde_json::json;
use stump_orchestrator::{ChunkSink, SolverError};

use crate::stream::{for_each_line, send, Flow};
use crate::HttpSolver;

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

#[derive(Debug, PartialEq, Eq, Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

fn parse_line(line: &str) -> Result<Option<GenerateLine>, SolverError> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(SolverError::malformed)
}

pub(crate) async fn stream(
    solver: &HttpSolver,
    prompt: &str,
    chunks: &ChunkSink,
) -> Result<String, SolverError> {
    let endpoint = solver.endpoint().unwrap_or(DEFAULT_ENDPOINT);
    let url = format!("{}/api/generate", endpoint.trim_end_matches('/'));
    let body = json!({
        "model": solver.model(),
        "prompt": prompt,
        "stream": true,
    });

    let response = send(solver.client.post(url).json(&body)).await?;

    let mut text = String::new();
    for_each_line(response, |line| {
        let Some(line) = parse_line(line)? else {
            return Ok(Flow::Continue);
        };
        chunks.send(&line.response);
        text.push_str(&line.response);
        Ok(if line.done { Flow::Stop } else { Flow::Continue })
    })
    .await?;
    Ok(text)
}
