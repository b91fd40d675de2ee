//! End-to-end generation tests against mock upstream providers.

mod common;

use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use merdi::ai::{Endpoints, GenerateError, GenerationService};
use merdi::config::Settings;

use common::{dead_url, spawn_server};

/// Routes every provider path to the same handler set and records the last
/// request (headers + body) for wire-contract assertions.
#[derive(Clone, Default)]
struct Recorded {
    headers: Arc<Mutex<Option<Vec<(String, String)>>>>,
    body: Arc<Mutex<Option<Value>>>,
}

impl Recorded {
    fn capture(&self, headers: &HeaderMap, body: &Value) {
        let flat = headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        *self.headers.lock().unwrap() = Some(flat);
        *self.body.lock().unwrap() = Some(body.clone());
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .lock()
            .unwrap()
            .as_ref()?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn body(&self) -> Value {
        self.body.lock().unwrap().clone().unwrap()
    }
}

fn chat_router(recorded: Recorded, reply: Value) -> Router {
    Router::new().route(
        "/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let recorded = recorded.clone();
            let reply = reply.clone();
            async move {
                recorded.capture(&headers, &body);
                Json(reply)
            }
        }),
    )
}

fn endpoints(base: &str) -> Endpoints {
    Endpoints {
        openai: format!("{base}/chat/completions"),
        anthropic: format!("{base}/messages"),
        openrouter: format!("{base}/chat/completions"),
    }
}

#[tokio::test]
async fn openrouter_reply_is_sanitized_end_to_end() {
    // The reply is fenced and separator-wrapped; the service must hand back
    // clean Mermaid.
    let reply = json!({
        "choices": [{"message": {"content": "```mermaid\n---\nsequenceDiagram\nAlice->>Bob: Hi\n---\n```"}}]
    });
    let recorded = Recorded::default();
    let base = spawn_server(chat_router(recorded.clone(), reply)).await;

    let service = GenerationService::with_endpoints(endpoints(&base));
    let settings = Settings::new("openai/gpt-4o", "sk-or-v1-xyz");
    let source = service
        .generate(Some(&settings), "two people greeting")
        .await
        .unwrap();

    assert_eq!(source, "sequenceDiagram\nAlice->>Bob: Hi");

    // Prefix wins over the "gpt" substring: the aggregator headers prove the
    // request went through the OpenRouter protocol.
    assert_eq!(
        recorded.header("authorization").unwrap(),
        "Bearer sk-or-v1-xyz"
    );
    assert_eq!(recorded.header("x-title").unwrap(), "Merdi");
    assert!(recorded.header("http-referer").is_some());

    let body = recorded.body();
    assert_eq!(body["model"], "openai/gpt-4o");
    assert_eq!(body["max_tokens"], 1000);
    assert_eq!(body["temperature"], 0.3);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "two people greeting");
}

#[tokio::test]
async fn openai_wire_contract_is_reproduced() {
    let reply = json!({"choices": [{"message": {"content": "graph TD\nA-->B"}}]});
    let recorded = Recorded::default();
    let base = spawn_server(chat_router(recorded.clone(), reply)).await;

    let service = GenerationService::with_endpoints(endpoints(&base));
    // Direct key + "gpt" in the name routes to the OpenAI protocol.
    let settings = Settings::new("gpt-4o", "sk-direct");
    let source = service.generate(Some(&settings), "a flow").await.unwrap();

    assert_eq!(source, "graph TD\nA-->B");
    assert_eq!(recorded.header("authorization").unwrap(), "Bearer sk-direct");
    // No aggregator attribution on the direct protocol.
    assert!(recorded.header("x-title").is_none());

    let body = recorded.body();
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    assert_eq!(body["max_tokens"], 1000);
    assert_eq!(body["temperature"], 0.3);
}

#[tokio::test]
async fn anthropic_wire_contract_is_reproduced() {
    let recorded = Recorded::default();
    let reply = json!({"content": [{"type": "text", "text": "```mermaid\ngraph TD\nA-->B\n```"}]});
    let router = Router::new().route(
        "/messages",
        post({
            let recorded = recorded.clone();
            move |headers: HeaderMap, Json(body): Json<Value>| {
                let recorded = recorded.clone();
                let reply = reply.clone();
                async move {
                    recorded.capture(&headers, &body);
                    Json(reply)
                }
            }
        }),
    );
    let base = spawn_server(router).await;

    let service = GenerationService::with_endpoints(endpoints(&base));
    let settings = Settings::new("claude-3-5-sonnet-20241022", "sk-ant-key");
    let source = service.generate(Some(&settings), "a flow").await.unwrap();

    assert_eq!(source, "graph TD\nA-->B");

    // API-key header plus the fixed protocol version; no bearer scheme.
    assert_eq!(recorded.header("x-api-key").unwrap(), "sk-ant-key");
    assert_eq!(recorded.header("anthropic-version").unwrap(), "2023-06-01");
    assert!(recorded.header("authorization").is_none());

    // Single user message with the instructions folded in.
    let body = recorded.body();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
    let content = messages[0]["content"].as_str().unwrap();
    assert!(content.contains("User request: a flow"));
    assert_eq!(body["max_tokens"], 1000);
    assert!(body.get("temperature").is_none());
}

#[tokio::test]
async fn upstream_error_carries_status_and_body_verbatim() {
    let router = Router::new().route(
        "/chat/completions",
        post(|| async { (StatusCode::UNAUTHORIZED, "invalid key") }),
    );
    let base = spawn_server(router).await;

    let service = GenerationService::with_endpoints(endpoints(&base));
    let settings = Settings::new("openai/gpt-4o", "sk-or-v1-bad");
    let err = service
        .generate(Some(&settings), "anything")
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::Api { status: 401, .. }));
    assert_eq!(err.to_string(), "API Error (401): invalid key");
}

#[tokio::test]
async fn empty_reply_is_a_content_error_not_a_transport_error() {
    let reply = json!({"choices": []});
    let base = spawn_server(chat_router(Recorded::default(), reply)).await;

    let service = GenerationService::with_endpoints(endpoints(&base));
    let settings = Settings::new("openai/gpt-4o", "sk-or-v1-xyz");
    let err = service
        .generate(Some(&settings), "anything")
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::EmptyResponse));
    assert_eq!(err.to_string(), "No diagram code received from the API");
}

#[tokio::test]
async fn implausibly_short_reply_is_a_content_error() {
    let reply = json!({"choices": [{"message": {"content": "```mermaid\nok\n```"}}]});
    let base = spawn_server(chat_router(Recorded::default(), reply)).await;

    let service = GenerationService::with_endpoints(endpoints(&base));
    let settings = Settings::new("openai/gpt-4o", "sk-or-v1-xyz");
    let err = service
        .generate(Some(&settings), "anything")
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::InvalidDiagram));
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_error() {
    let base = dead_url().await;

    let service = GenerationService::with_endpoints(endpoints(&base));
    let settings = Settings::new("openai/gpt-4o", "sk-or-v1-xyz");
    let err = service
        .generate(Some(&settings), "anything")
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::Network(_)));
    assert!(err.to_string().starts_with("Network error: "));
}

#[tokio::test]
async fn absent_settings_never_reach_the_network() {
    // The endpoints are unroutable: any attempted request would fail with a
    // transport error rather than the configuration error asserted here.
    let service = GenerationService::with_endpoints(endpoints("http://127.0.0.1:1"));

    let err = service.generate(None, "a user flow").await.unwrap_err();
    assert!(matches!(err, GenerateError::NotConfigured));

    let incomplete = Settings::new("openai/gpt-4o", "");
    let err = service
        .generate(Some(&incomplete), "a user flow")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::NotConfigured));
}
