//! `OpenAI` chat completions, streamed as server-sent events.

use serde::Deserialize;
use serde_json::json;
use stump_orchestrator::{ChunkSink, SolverError};
use tracing::debug;

use crate::stream::{for_each_line, send, sse_data, Flow};
use crate::HttpSolver;

const DEFAULT_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// One parsed SSE line.
#[derive(Debug, PartialEq, Eq)]
enum Event {
    Text(String),
    Done,
    Ignored,
}

fn parse_line(line: &str) -> Event {
    let Some(data) = sse_data(line) else {
        return Event::Ignored;
    };
    if data == "[DONE]" {
        return Event::Done;
    }

    match serde_json::from_str::<ChatChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .map_or(Event::Ignored, Event::Text),
        Err(e) => {
            debug!(error = %e, "Skipping unparsable stream line");
            Event::Ignored
        }
    }
}

pub(crate) async fn stream(
    solver: &HttpSolver,
    prompt: &str,
    chunks: &ChunkSink,
) -> Result<String, SolverError> {
    let url = solver.endpoint().unwrap_or(DEFAULT_URL);
    let body = json!({
        "model": solver.model(),
        "messages": [{"role": "user", "content": prompt}],
        "stream": true,
    });

    let response = send(
        solver
            .client
            .post(url)
            .bearer_auth(solver.api_key())
            .json(&body),
    )
    .await?;

    let mut text = String::new();
    for_each_line(response, |line| {
        Ok(match parse_line(line) {
            Event::Text(content) => {
                chunks.send(&content);
                text.push_str(&content);
                Flow::Continue
            }
            Event::Done => Flow::Stop,
            Event::Ignored => Flow::Continue,
        })
    })
    .await?;
    Ok(text)
}
