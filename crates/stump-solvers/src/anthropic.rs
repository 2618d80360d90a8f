//! Anthropic messages API, streamed as server-sent events.

use serde::Deserialize;
use serde_json::json;
use stump_orchestrator::{ChunkSink, SolverError};

use crate::stream::{for_each_line, send, sse_data, Flow};
use crate::HttpSolver;

const DEFAULT_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: Delta },
    MessageStop,
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

fn parse_line(line: &str) -> Result<Option<StreamEvent>, SolverError> {
    let Some(data) = sse_data(line) else {
        return Ok(None);
    };
    serde_json::from_str(data)
        .map(Some)
        .map_err(SolverError::malformed)
}

pub(crate) async fn stream(
    solver: &HttpSolver,
    prompt: &str,
    chunks: &ChunkSink,
) -> Result<String, SolverError> {
    let url = solver.endpoint().unwrap_or(DEFAULT_URL);
    let body = json!({
        "model": solver.model(),
        "max_tokens": MAX_TOKENS,
        "messages": [{"role": "user", "content": prompt}],
        "stream": true,
    });

    let response = send(
        solver
            .client
            .post(url)
            .header("x-api-key", solver.api_key())
            .header("anthropic-version", API_VERSION)
            .json(&body),
    )
    .await?;

    let mut text = String::new();
    for_each_line(response, |line| {
        match parse_line(line)? {
            Some(StreamEvent::ContentBlockDelta {
                delta: Delta::TextDelta { text: content },
            }) => {
                chunks.send(&content);
                text.push_str(&content);
            }
            Some(StreamEvent::MessageStop) => return Ok(Flow::Stop),
            Some(StreamEvent::Error { error }) => {
                return Err(SolverError::Transport(error.message));
            }
            _ => {}
        }
        Ok(Flow::Continue)
    })
    .await?;
    Ok(text)
}
