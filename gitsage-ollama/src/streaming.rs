//! NDJSON streaming for the Ollama Chat API.
//!
//! Ollama answers a streaming `/api/chat` request with one JSON object per line:
//! ```text
//! {"model":"llama3:8b","message":{"role":"assistant","content":"1. [HIGH]"},"done":false}
//! {"model":"llama3:8b","message":{"role":"assistant","content":" Check errors"},"done":false}
//! {"model":"llama3:8b","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","eval_count":10}
//! ```
//!
//! A producer task decodes those lines and hands each [`ResponseUnit`] to the
//! consumer through a [`ChatStream`]: a bounded unit queue plus a single-slot
//! error path. Exactly one terminal event is observed per stream: either the
//! queue closes with no error, or an error is signalled and no further units
//! are delivered.

use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::OllamaError;
use crate::types::ResponseUnit;

/// Depth of the unit queue between the producer task and the consumer.
pub const UNIT_BUFFER: usize = 10;

/// What the consumer observes next on a [`ChatStream`].
#[derive(Debug)]
pub enum StreamEvent {
    /// The next decoded unit, in wire order.
    Unit(ResponseUnit),
    /// The stream failed. No more units follow.
    Failed(OllamaError),
    /// The stream finished cleanly. Returned again on every later call.
    End,
}

/// Consumer side of one streaming chat exchange.
///
/// Owned exclusively by the caller of [`crate::Ollama::chat`]; two calls never
/// share a stream.
pub struct ChatStream {
    units: mpsc::Receiver<ResponseUnit>,
    error: Option<oneshot::Receiver<OllamaError>>,
    finished: bool,
}

enum Polled {
    Error(Result<OllamaError, oneshot::error::RecvError>),
    Unit(Option<ResponseUnit>),
}

impl ChatStream {
    /// Assemble a stream from a unit queue and an error slot.
    ///
    /// The producer must settle `error` (send or drop it) before dropping the
    /// sender of `units`.
    pub fn from_parts(
        units: mpsc::Receiver<ResponseUnit>,
        error: oneshot::Receiver<OllamaError>,
    ) -> Self {
        Self {
            units,
            error: Some(error),
            finished: false,
        }
    }

    /// Wait for the next unit or the terminal event.
    ///
    /// A signalled error wins over units still buffered in the queue, so
    /// once [`StreamEvent::Failed`] is returned nothing else is delivered.
    pub async fn next_event(&mut self) -> StreamEvent {
        loop {
            if self.finished {
                return StreamEvent::End;
            }

            let polled = match self.error.as_mut() {
                Some(error) => tokio::select! {
                    biased;
                    result = error => Polled::Error(result),
                    unit = self.units.recv() => Polled::Unit(unit),
                },
                None => Polled::Unit(self.units.recv().await),
            };

            match polled {
                Polled::Error(Ok(err)) => {
                    self.finished = true;
                    return StreamEvent::Failed(err);
                }
                // Producer exited without an error; drain what is left.
                Polled::Error(Err(_)) => self.error = None,
                Polled::Unit(Some(unit)) => return StreamEvent::Unit(unit),
                Polled::Unit(None) => {
                    self.finished = true;
                    // The error slot is settled before the producer drops the queue.
                    if let Some(error) = self.error.take() {
                        if let Ok(err) = error.await {
                            return StreamEvent::Failed(err);
                        }
                    }
                    return StreamEvent::End;
                }
            }
        }
    }
}

/// Create the delivery channel pair for one exchange.
pub(crate) fn delivery_channel() -> (Delivery, ChatStream) {
    let (unit_tx, unit_rx) = mpsc::channel(UNIT_BUFFER);
    let (error_tx, error_rx) = oneshot::channel();
    (
        Delivery {
            units: unit_tx,
            error: error_tx,
        },
        ChatStream::from_parts(unit_rx, error_rx),
    )
}

/// Producer side of the delivery channel.
pub(crate) struct Delivery {
    units: mpsc::Sender<ResponseUnit>,
    error: oneshot::Sender<OllamaError>,
}

impl Delivery {
    /// Hand one unit to the consumer, giving up as soon as `cancel` fires.
    ///
    /// A consumer that dropped its receiver counts as a cancellation.
    pub(crate) async fn send(
        &self,
        unit: ResponseUnit,
        cancel: &CancellationToken,
    ) -> Result<(), OllamaError> {
        if cancel.is_cancelled() {
            return Err(OllamaError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OllamaError::Cancelled),
            sent = self.units.send(unit) => sent.map_err(|_| OllamaError::Cancelled),
        }
    }

    /// Settle the exchange. The error (if any) is signalled before the unit
    /// queue closes.
    pub(crate) fn finish(self, result: Result<(), OllamaError>) {
        let Self { units, error } = self;
        if let Err(err) = result {
            tracing::debug!(error = %err, "ollama stream failed");
            let _ = error.send(err);
        }
        drop(units);
    }
}

/// Incremental splitter turning body chunks into [`ResponseUnit`]s.
///
/// Bytes are buffered until a `\n` arrives, so lines and multi-byte characters
/// may be split across chunks.
#[derive(Debug, Default)]
pub(crate) struct NdjsonDecoder {
    buf: Vec<u8>,
}

impl NdjsonDecoder {
    /// Append a body chunk.
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Decode the next complete, non-blank line, if one is buffered.
    pub(crate) fn next_unit(&mut self) -> Result<Option<ResponseUnit>, OllamaError> {
        while let Some(newline) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=newline).collect();
            if let Some(unit) = decode_line(&line[..newline])? {
                return Ok(Some(unit));
            }
        }
        Ok(None)
    }

    /// Decode whatever is left once the body has ended.
    pub(crate) fn finish(&mut self) -> Result<Option<ResponseUnit>, OllamaError> {
        let rest = std::mem::take(&mut self.buf);
        decode_line(&rest)
    }
}

fn decode_line(line: &[u8]) -> Result<Option<ResponseUnit>, OllamaError> {
    let text = std::str::from_utf8(line)
        .map_err(|e| OllamaError::Decode(format!("invalid UTF-8 in response line: {e}")))?;
    let text = text.trim_end_matches('\r');
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| OllamaError::Decode(format!("{e} in line {text:?}")))
}

/// Read a successful response body to the final unit, delivering every unit in order.
pub(crate) async fn pump_body(
    response: reqwest::Response,
    delivery: &Delivery,
    cancel: &CancellationToken,
    timeout: std::time::Duration,
) -> Result<(), OllamaError> {
    let mut body = std::pin::pin!(response.bytes_stream());
    let mut decoder = NdjsonDecoder::default();
    let mut delivered = 0usize;

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(OllamaError::Cancelled),
            chunk = body.next() => chunk,
        };

        let at_eof = match chunk {
            Some(Ok(bytes)) => {
                decoder.push(&bytes);
                false
            }
            Some(Err(e)) if e.is_timeout() => return Err(OllamaError::Timeout(timeout)),
            Some(Err(e)) => {
                return Err(OllamaError::StreamInterrupted(format!(
                    "stream read error after {delivered} units: {e}"
                )));
            }
            None => true,
        };

        loop {
            let unit = if at_eof {
                decoder.finish()?
            } else {
                decoder.next_unit()?
            };
            let Some(unit) = unit else { break };
            let done = unit.done;
            delivery.send(unit, cancel).await?;
            delivered += 1;
            if done {
                tracing::debug!(units = delivered, "ollama stream complete");
                return Ok(());
            }
            if at_eof {
                break;
            }
        }

        if at_eof {
            return Err(OllamaError::StreamInterrupted(format!(
                "connection closed after {delivered} units without a final unit"
            )));
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
