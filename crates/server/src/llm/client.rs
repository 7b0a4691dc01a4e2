//! Chat completion client for an Azure `OpenAI` deployment.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::ChatConfig;

use super::ChatModel;
use super::error::{ApiErrorResponse, ChatError};
use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

/// Chat completion client.
///
/// Sends the conversation to a single deployment and returns the content
/// of the first choice.
#[derive(Clone)]
pub struct ChatCompletionClient {
    inner: Arc<ChatCompletionClientInner>,
}

struct ChatCompletionClientInner {
    client: reqwest::Client,
    url: String,
    api_version: String,
    deployment: String,
}

impl ChatCompletionClient {
    /// Create a new chat client.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidConfig`] if the API key contains invalid
    /// header characters or the HTTP client cannot be built.
    pub fn new(config: &ChatConfig, timeout: Duration) -> Result<Self, ChatError> {
        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| ChatError::InvalidConfig("API key is not a valid header value".to_string()))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("api-key", api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        let url = format!(
            "{}/openai/deployments/{}/chat/completions",
            config.endpoint.as_str().trim_end_matches('/'),
            urlencoding::encode(&config.deployment)
        );

        Ok(Self {
            inner: Arc::new(ChatCompletionClientInner {
                client,
                url,
                api_version: config.api_version.clone(),
                deployment: config.deployment.clone(),
            }),
        })
    }

    /// Handle an error status code.
    async fn handle_error_status(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ChatError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return ChatError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return ChatError::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => ChatError::Api {
                    code: api_error
                        .error
                        .code
                        .unwrap_or_else(|| status.as_u16().to_string()),
                    message: api_error.error.message,
                },
                Err(_) => ChatError::Api {
                    code: status.as_u16().to_string(),
                    message: body,
                },
            },
            Err(e) => ChatError::Http(e),
        }
    }
}

#[async_trait]
impl ChatModel for ChatCompletionClient {
    #[instrument(skip(self, messages), fields(deployment = %self.inner.deployment, turns = messages.len()))]
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, ChatError> {
        let response = self
            .inner
            .client
            .post(&self.inner.url)
            .query(&[("api-version", &self.inner.api_version)])
            .json(&ChatCompletionRequest {
                messages: &messages,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_error_status(status, response).await);
        }

        let body = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| ChatError::Parse(format!("Failed to parse response: {e}")))?;

        parsed.into_content().ok_or(ChatError::EmptyResponse)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use url::Url;

    fn config() -> ChatConfig {
        ChatConfig {
            endpoint: Url::parse("https://contoso.openai.azure.com/").unwrap(),
            api_key: SecretString::from("0123456789abcdef0123456789abcdef"),
            deployment: "gpt-4o".to_string(),
            api_version: "2024-06-01".to_string(),
        }
    }

    #[test]
    fn test_completion_url() {
        let client = ChatCompletionClient::new(&config(), Duration::from_secs(5)).unwrap();

        assert_eq!(
            client.inner.url,
            "https://contoso.openai.azure.com/openai/deployments/gpt-4o/chat/completions"
        );
    }

    #[test]
    fn test_rejects_unprintable_api_key() {
        let mut config = config();
        config.api_key = SecretString::from("bad\r\nkey");

        let result = ChatCompletionClient::new(&config, Duration::from_secs(5));

        assert!(matches!(result, Err(ChatError::InvalidConfig(_))));
    }

    #[test]
    fn test_chat_client_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<ChatCompletionClient>();
    }

    #[test]
    fn test_chat_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChatCompletionClient>();
    }
}
