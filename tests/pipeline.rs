//! Workspace-level tests of the full interpretation pipeline:
//! stream -> aggregate -> parse -> filter -> limit.
//!
//! The mock-server tests run by default. The live test needs a local Ollama
//! with the default model pulled:
//! ```bash
//! cargo test --test pipeline -- --ignored
//! ```

use std::time::Duration;

use gitsage::{GenerateError, collect_response};
use gitsage_ollama::{CancellationToken, ChatMessage, Ollama, OllamaError, RetryPolicy};
use gitsage_suggest::{Severity, filter_by_severity, limit, parse_suggestions};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn line(text: &str, done: bool) -> String {
    let value = json!({
        "model": "test-model",
        "message": {"role": "assistant", "content": text},
        "done": done,
    });
    format!("{value}\n")
}

async fn serve(body: String) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

async fn generate(server: &MockServer) -> Result<String, GenerateError> {
    let client = Ollama::new()
        .base_url(server.uri())
        .model("test-model")
        .retry_policy(RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        });
    let cancel = CancellationToken::new();
    let request = client.request(vec![ChatMessage::user("review this")], 0.3);
    let stream = client.chat(request, cancel.clone());
    tokio::time::timeout(Duration::from_secs(10), collect_response(stream, &cancel))
        .await
        .expect("pipeline should settle")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Mock server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn structured_answer_split_across_units() {
    let body = [
        line("1. [HIGH] Add error", false),
        line(" handling\n   The divide function", false),
        line(" should check zero.\n\n2. [MEDIUM] Use range loop\n", false),
        line("   Replace the loop.", false),
        line("", true),
    ]
    .concat();
    let server = serve(body).await;

    let text = generate(&server).await.unwrap();
    let suggestions = parse_suggestions(&text);

    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0].severity, Severity::High);
    assert_eq!(suggestions[0].title, "Add error handling");
    assert_eq!(
        suggestions[0].description,
        "The divide function should check zero."
    );
    assert_eq!(suggestions[1].severity, Severity::Medium);
    assert_eq!(suggestions[1].title, "Use range loop");
    assert_eq!(suggestions[1].description, "Replace the loop.");
}

#[tokio::test]
async fn unstructured_answer_uses_fallback_then_filters() {
    let body = [
        line("[HIGH] Critical issue\n", false),
        line("[LOW] Style nit\nsome context", false),
        line("", true),
    ]
    .concat();
    let server = serve(body).await;

    let text = generate(&server).await.unwrap();
    let suggestions = parse_suggestions(&text);
    let severities: Vec<&str> = suggestions.iter().map(|s| s.severity.as_str()).collect();
    assert_eq!(severities, vec!["HIGH", "LOW", "MEDIUM"]);

    let kept = limit(filter_by_severity(suggestions.clone(), "all"), 2);
    assert_eq!(kept, suggestions[..2].to_vec());
    let high = filter_by_severity(suggestions, "high");
    assert_eq!(high.len(), 1);
    assert_eq!(high[0].title, "Critical issue");
}

#[tokio::test]
async fn connection_closed_before_done_is_not_success() {
    let body = [line("1. [HIGH] Half", false), line(" an answer", false)].concat();
    let server = serve(body).await;

    let err = generate(&server).await.unwrap_err();
    assert!(
        matches!(
            err,
            GenerateError::Transport(OllamaError::StreamInterrupted(_))
        ),
        "got {err:?}"
    );
}

#[tokio::test]
async fn whitespace_answer_is_empty_output() {
    let server = serve([line(" \n ", false), line("", true)].concat()).await;
    let err = generate(&server).await.unwrap_err();
    assert!(matches!(err, GenerateError::EmptyOutput));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Live server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
#[ignore]
async fn live_ollama_review() {
    let client = Ollama::new();
    let cancel = CancellationToken::new();
    client.ping(&cancel).await.expect("ollama should be running");

    let request = client.request(
        vec![
            ChatMessage::system(
                "Answer as a numbered list of lines like `1. [HIGH] Title`. No preamble.",
            ),
            ChatMessage::user("Review: fn divide(a: i32, b: i32) -> i32 { a / b }"),
        ],
        0.0,
    );
    let text = collect_response(client.chat(request, cancel.clone()), &cancel)
        .await
        .expect("generation should succeed");
    assert!(!parse_suggestions(&text).is_empty());
}
