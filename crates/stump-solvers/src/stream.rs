//! Shared plumbing for reading backend responses.

use stump_orchestrator::SolverError;
use tracing::warn;

/// Splits a byte stream into lines, holding back any trailing partial line.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Appends `bytes` and returns every line completed by them, without the
    /// line terminator.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..pos]);
            lines.push(line.trim_end_matches('\r').to_string());
        }
        lines
    }

    /// Returns the unterminated remainder, if it holds anything.
    pub(crate) fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        (!rest.is_empty()).then_some(rest)
    }
}

/// What to do after handling one line of a streamed response.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

/// Feeds every line of `response` to `on_line` until it asks to stop or the
/// body ends.
pub(crate) async fn for_each_line<F>(mut response: reqwest::Response, mut on_line: F) -> Result<(), SolverError>
where
    F: FnMut(&str) -> Result<Flow, SolverError>,
{
    let mut buffer = LineBuffer::default();
    while let Some(bytes) = response.chunk().await.map_err(SolverError::transport)? {
        for line in buffer.push(&bytes) {
            if on_line(&line)? == Flow::Stop {
                return Ok(());
            }
        }
    }

    if let Some(line) = buffer.finish() {
        on_line(&line)?;
    }
    Ok(())
}

/// Returns the payload of an SSE `data:` line.
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Sends the request and turns a non-success status into an error.
pub(crate) async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response, SolverError> {
    let response = request.send().await.map_err(SolverError::transport)?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), body = %body, "Solver backend returned an error status");
    Err(SolverError::Status {
        status: status.as_u16(),
        body,
    })
}
