#![deny(missing_docs)]
//! Streaming client for a local Ollama server.
//!
//! Talks to Ollama's `/api/chat` endpoint with `stream: true` and hands the
//! newline-delimited JSON response to the caller one [`ResponseUnit`] at a
//! time through a [`ChatStream`].
//!
//! # Features
//!
//! - Liveness check against `/api/tags` with a short timeout
//! - Retry with exponential backoff (1s, 2s, 4s) for connection failures and
//!   5xx answers to the initial request, never mid-stream
//! - Bounded in-order delivery with a separate single-shot error path
//! - Cooperative cancellation through a [`CancellationToken`]

pub mod client;
pub mod error;
pub mod retry;
pub mod streaming;
pub mod types;

pub use client::Ollama;
pub use error::OllamaError;
pub use retry::RetryPolicy;
pub use streaming::{ChatStream, StreamEvent, UNIT_BUFFER};
pub use types::{ChatMessage, ChatOptions, ChatRequest, ResponseUnit, Role};

// Re-exported so callers can build tokens without naming tokio-util themselves.
pub use tokio_util::sync::CancellationToken;
