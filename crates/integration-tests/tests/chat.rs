//! Chat route with a scripted model.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};

use searchgate_integration_tests::{Backend, TestContext};
use searchgate_server::llm::{ChatError, ChatMessage, ChatModel, ChatRole};

/// Echoes the last message and records what it was sent.
#[derive(Default)]
struct EchoModel {
    seen: Mutex<Vec<ChatMessage>>,
}

#[async_trait]
impl ChatModel for EchoModel {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, ChatError> {
        let reply = messages
            .last()
            .map(|m| format!("echo: {}", m.content))
            .ok_or(ChatError::EmptyResponse)?;
        self.seen.lock().expect("lock").extend(messages);
        Ok(reply)
    }
}

struct FailingModel;

#[async_trait]
impl ChatModel for FailingModel {
    async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<String, ChatError> {
        Err(ChatError::RateLimited(30))
    }
}

#[tokio::test]
async fn test_chat_returns_model_reply() {
    let model = Arc::new(EchoModel::default());
    let chat: Arc<dyn ChatModel> = model.clone();
    let ctx = TestContext::start_with(Backend::Memory, Some(chat)).await;

    let resp = ctx
        .client
        .post(ctx.url("/chat"))
        .json(&json!({
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "hello"}
            ]
        }))
        .send()
        .await
        .expect("Failed to chat");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.json::<Value>().await.expect("body"),
        json!({"message": "echo: hello"})
    );

    let seen = model.seen.lock().expect("lock");
    assert_eq!(seen.len(), 2);
    assert_eq!(seen.first().map(|m| m.role), Some(ChatRole::System));
}

#[tokio::test]
async fn test_chat_unconfigured() {
    let ctx = TestContext::start().await;

    let resp = ctx
        .client
        .post(ctx.url("/chat"))
        .json(&json!({"messages": [{"role": "user", "content": "hello"}]}))
        .send()
        .await
        .expect("Failed to chat");

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        resp.json::<Value>().await.expect("body"),
        json!({"detail": "OpenAI client is not configured."})
    );
}

#[tokio::test]
async fn test_chat_empty_messages_is_bad_request() {
    let chat: Arc<dyn ChatModel> = Arc::new(EchoModel::default());
    let ctx = TestContext::start_with(Backend::Memory, Some(chat)).await;

    let resp = ctx
        .client
        .post(ctx.url("/chat"))
        .json(&json!({"messages": []}))
        .send()
        .await
        .expect("Failed to chat");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_upstream_failure_is_server_error() {
    let chat: Arc<dyn ChatModel> = Arc::new(FailingModel);
    let ctx = TestContext::start_with(Backend::Memory, Some(chat)).await;

    let resp = ctx
        .client
        .post(ctx.url("/chat"))
        .json(&json!({"messages": [{"role": "user", "content": "hello"}]}))
        .send()
        .await
        .expect("Failed to chat");

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
