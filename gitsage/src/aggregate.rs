//! Buffer a streamed chat answer into one text blob.

use gitsage_ollama::{CancellationToken, ChatStream, OllamaError, ResponseUnit, StreamEvent};

/// Why a streamed answer could not be turned into text.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The transport failed before or during the stream.
    #[error("generation failed: {0}")]
    Transport(OllamaError),
    /// The stream finished cleanly but carried only whitespace.
    #[error("model returned an empty response")]
    EmptyOutput,
    /// The caller's token fired, or the producer reported cancellation.
    #[error("cancelled")]
    Cancelled,
}

impl From<OllamaError> for GenerateError {
    fn from(err: OllamaError) -> Self {
        match err {
            OllamaError::Cancelled => Self::Cancelled,
            other => Self::Transport(other),
        }
    }
}

/// Drain `stream` and return the trimmed concatenation of every fragment.
pub async fn collect_response(
    stream: ChatStream,
    cancel: &CancellationToken,
) -> Result<String, GenerateError> {
    collect_response_with(stream, cancel, |_| {}).await
}

/// Like [`collect_response`], calling `on_unit` once per delivered unit
/// before its text is appended.
///
/// Fragments are joined exactly as received; only the final blob is trimmed.
pub async fn collect_response_with<F>(
    mut stream: ChatStream,
    cancel: &CancellationToken,
    mut on_unit: F,
) -> Result<String, GenerateError>
where
    F: FnMut(&ResponseUnit),
{
    let mut text = String::new();
    let mut units = 0usize;

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerateError::Cancelled),
            event = stream.next_event() => event,
        };
        match event {
            StreamEvent::Unit(unit) => {
                on_unit(&unit);
                text.push_str(unit.text());
                units += 1;
            }
            StreamEvent::Failed(err) => return Err(err.into()),
            StreamEvent::End => break,
        }
    }

    tracing::debug!(units, bytes = text.len(), "stream complete");
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GenerateError::EmptyOutput);
    }
    Ok(trimmed.to_string())
}
