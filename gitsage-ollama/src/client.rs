//! Ollama API client struct and builder.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{OllamaError, map_http_status, map_reqwest_error};
use crate::retry::{RetryPolicy, retry_request};
use crate::streaming::{ChatStream, delivery_channel, pump_body};
use crate::types::ChatRequest;

/// Default Ollama API base URL.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Default model used by [`Ollama::request`].
const DEFAULT_MODEL: &str = "llama3:8b";

/// Ceiling on a whole streamed exchange.
const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Timeout of the liveness check.
const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the Ollama Chat API.
///
/// Cloning is cheap; clones share the underlying connection pool.
///
/// # Example
///
/// ```no_run
/// use gitsage_ollama::{ChatMessage, Ollama, StreamEvent};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn demo() -> Result<(), gitsage_ollama::OllamaError> {
/// let client = Ollama::new().base_url("http://localhost:11434");
/// let cancel = CancellationToken::new();
/// client.ping(&cancel).await?;
///
/// let request = client.request(vec![ChatMessage::user("Say hi")], 0.3);
/// let mut stream = client.chat(request, cancel);
/// while let StreamEvent::Unit(unit) = stream.next_event().await {
///     print!("{}", unit.text());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Ollama {
    /// API base URL without a trailing slash.
    pub(crate) base_url: String,
    /// Model used by [`Ollama::request`].
    pub(crate) model: String,
    /// Ceiling on one streamed chat exchange.
    pub(crate) stream_timeout: Duration,
    /// Timeout of [`Ollama::ping`].
    pub(crate) ping_timeout: Duration,
    /// Retry policy for the initial chat request.
    pub(crate) retry: RetryPolicy,
    /// Shared HTTP client.
    pub(crate) client: reqwest::Client,
}

impl Ollama {
    /// Create a client pointed at `http://127.0.0.1:11434`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            retry: RetryPolicy::default(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the API base URL. A trailing `/` is dropped.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the model used by [`Ollama::request`].
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the ceiling on a whole streamed exchange.
    #[must_use]
    pub fn stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Override the liveness check timeout.
    #[must_use]
    pub fn ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    /// Override the retry policy of the initial chat request.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// The configured base URL.
    pub fn address(&self) -> &str {
        &self.base_url
    }

    /// Build a streaming request for the configured model.
    pub fn request(&self, messages: Vec<crate::ChatMessage>, temperature: f32) -> ChatRequest {
        ChatRequest::new(self.model.clone(), messages, temperature)
    }

    pub(crate) fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    pub(crate) fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }

    /// Check that the server is up by listing its models.
    ///
    /// Uses the short ping timeout. Call this before [`Ollama::chat`] and
    /// abort on failure.
    pub async fn ping(&self, cancel: &CancellationToken) -> Result<(), OllamaError> {
        let url = self.tags_url();
        tracing::debug!(url = %url, "pinging ollama");

        let request = self.client.get(&url).timeout(self.ping_timeout);
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(OllamaError::Cancelled),
            sent = request.send() => sent,
        };
        let response = sent.map_err(|e| map_reqwest_error(e, &url, self.ping_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_status(status, &body));
        }
        Ok(())
    }

    /// Start a streaming chat exchange.
    ///
    /// Spawns one producer task on the current Tokio runtime and returns the
    /// consumer side immediately. Connection failures and 5xx answers to the
    /// initial request are retried per the [`RetryPolicy`]; once lines start
    /// arriving any failure is terminal. The stream timeout bounds the whole
    /// exchange, retries included. Cancelling `cancel` stops the
    /// producer at its next read, delivery, or backoff sleep.
    pub fn chat(&self, mut request: ChatRequest, cancel: CancellationToken) -> ChatStream {
        request.stream = true;

        let url = self.chat_url();
        let http_client = self.client.clone();
        let policy = self.retry;
        let timeout = self.stream_timeout;
        let (delivery, stream) = delivery_channel();

        tokio::spawn(async move {
            tracing::debug!(url = %url, model = %request.model, "sending streaming chat request to ollama");
            // One deadline covers every attempt, the backoff sleeps and the body.
            let deadline = tokio::time::Instant::now() + timeout;

            let send = retry_request(policy, &cancel, |attempt| {
                let http_request = http_client
                    .post(&url)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .timeout(timeout)
                    .json(&request);
                let url = url.clone();
                async move {
                    tracing::trace!(attempt, "chat request attempt");
                    let response = http_request
                        .send()
                        .await
                        .map_err(|e| map_reqwest_error(e, &url, timeout))?;
                    let status = response.status();
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(map_http_status(status, &body));
                    }
                    Ok(response)
                }
            });

            let exchange = async {
                let response = send.await?;
                pump_body(response, &delivery, &cancel, timeout).await
            };
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(OllamaError::Cancelled),
                outcome = tokio::time::timeout_at(deadline, exchange) => {
                    outcome.unwrap_or(Err(OllamaError::Timeout(timeout)))
                }
            };

            delivery.finish(result);
        });

        stream
    }
}

impl Default for Ollama {
    fn default() -> Self {
        Self::new()
    }
}
