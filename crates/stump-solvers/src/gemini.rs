//! Google Gemini `generateContent`, answered in one response body.

use serde::Deserialize;
use serde_json::json;
use stump_orchestrator::{ChunkSink, SolverError};

use crate::stream::send;
use crate::HttpSolver;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

fn request_url(base: &str, model: &str) -> String {
    format!(
        "{}/v1/models/{model}:generateContent",
        base.trim_end_matches('/')
    )
}

fn parse_body(body: &str) -> Result<String, SolverError> {
    let response: GenerateResponse = serde_json::from_str(body).map_err(SolverError::malformed)?;
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or(SolverError::EmptyResponse)
}

pub(crate) async fn generate(
    solver: &HttpSolver,
    prompt: &str,
    chunks: &ChunkSink,
) -> Result<String, SolverError> {
    let url = request_url(solver.endpoint().unwrap_or(DEFAULT_BASE_URL), solver.model());
    let body = json!({
        "contents": [{"parts": [{"text": prompt}]}],
    });

    let response = send(
        solver
            .client
            .post(url)
            .query(&[("key", solver.api_key())])
            .json(&body),
    )
    .await?;
    let body = response.text().await.map_err(SolverError::transport)?;

    let text = parse_body(&body)?;
    chunks.send(&text);
    Ok(text)
}
