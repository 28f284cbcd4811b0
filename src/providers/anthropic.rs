use crate::error::ProviderError;
use crate::providers::traits::{CompletionProvider, CompletionRequest};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

pub struct AnthropicProvider {
    /// Pre-computed auth header: `("x-api-key", "<key>")`.
    cached_auth: Option<(&'static str, String)>,
    cached_messages_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    content: Vec<ResponseContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Unsupported,
}

impl AnthropicProvider {
    pub fn new(api_key: Option<&str>) -> Self {
        Self::with_base_url(api_key, None)
    }

    pub fn with_base_url(api_key: Option<&str>, base_url: Option<&str>) -> Self {
        let base = base_url
            .map_or("https://api.anthropic.com", |u| u.trim_end_matches('/'))
            .to_string();
        let cached_messages_url = format!("{base}/v1/messages");
        let cached_auth = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| ("x-api-key", k.to_string()));
        Self {
            cached_auth,
            cached_messages_url,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .pool_max_idle_per_host(10)
                .pool_idle_timeout(std::time::Duration::from_secs(90))
                .tcp_keepalive(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn build_request(request: &CompletionRequest, model: &str) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            max_tokens: request.max_tokens,
            system: request.system.clone(),
            messages: vec![Message {
                role: "user",
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
        }
    }

    fn extract_text(chat_response: &ChatResponse) -> anyhow::Result<String> {
        let text = chat_response
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text.as_str()),
                ResponseContentBlock::Unsupported => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            anyhow::bail!("No response from Anthropic");
        }
        Ok(text)
    }

    async fn call_api(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        let (auth_name, auth_value) =
            self.cached_auth
                .as_ref()
                .ok_or_else(|| ProviderError::MissingCredentials {
                    provider: "Anthropic".to_string(),
                })?;

        let response = self
            .client
            .post(&self.cached_messages_url)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .header(*auth_name, auth_value)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(super::api_error("Anthropic", response).await);
        }

        response.json().await.map_err(anyhow::Error::msg)
    }
}

/// Model-aware wrapper: the trait carries no model parameter, so the
/// configured model is bound at construction time.
pub struct BoundAnthropicProvider {
    inner: AnthropicProvider,
    model: String,
}

impl BoundAnthropicProvider {
    pub fn new(api_key: Option<&str>, base_url: Option<&str>, model: impl Into<String>) -> Self {
        Self {
            inner: AnthropicProvider::with_base_url(api_key, base_url),
            model: model.into(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.inner.cached_auth.is_some()
    }
}

impl CompletionProvider for BoundAnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn complete(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        Box::pin(async move {
            let chat_request = AnthropicProvider::build_request(&request, &self.model);
            let chat_response = self.inner.call_api(&chat_request).await?;
            AnthropicProvider::extract_text(&chat_response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_with_key() {
        let p = AnthropicProvider::new(Some("sk-ant-test123"));
        assert!(p.cached_auth.is_some());
        let (name, value) = p.cached_auth.as_ref().unwrap();
        assert_eq!(*name, "x-api-key");
        assert_eq!(value, "sk-ant-test123");
        assert_eq!(
            p.cached_messages_url,
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[test]
    fn creates_without_key() {
        let p = AnthropicProvider::new(None);
        assert!(p.cached_auth.is_none());
    }

    #[test]
    fn creates_with_empty_key() {
        let p = AnthropicProvider::new(Some(""));
        assert!(p.cached_auth.is_none());
    }

    #[test]
    fn creates_with_whitespace_key() {
        let p = AnthropicProvider::new(Some("  sk-ant-test123  "));
        let (_, value) = p.cached_auth.as_ref().unwrap();
        assert_eq!(value, "sk-ant-test123");
    }

    #[test]
    fn custom_base_url_trims_trailing_slash() {
        let p = AnthropicProvider::with_base_url(None, Some("https://api.example.com/"));
        assert_eq!(p.cached_messages_url, "https://api.example.com/v1/messages");
    }

    #[tokio::test]
    async fn complete_fails_without_key() {
        let p = BoundAnthropicProvider::new(None, None, "claude-3-5-sonnet-latest");
        assert!(!p.has_credentials());
        let result = p.complete(CompletionRequest::new("hello")).await;
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(
            err.contains("credentials not set"),
            "Expected key error, got: {err}"
        );
    }

    #[test]
    fn chat_request_serializes_without_system() {
        let req = AnthropicProvider::build_request(
            &CompletionRequest::new("hello").with_temperature(0.7),
            "claude-3-5-sonnet-latest",
        );
        let json = serde_json::to_string(&req).unwrap();
        assert!(
            !json.contains("system"),
            "system field should be skipped when None"
        );
        assert!(json.contains("claude-3-5-sonnet-latest"));
        assert!(json.contains("hello"));
    }

    #[test]
    fn chat_request_serializes_with_system() {
        let req = AnthropicProvider::build_request(
            &CompletionRequest::new("hello").with_system("You are a judge"),
            "claude-3-5-sonnet-latest",
        );
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"system\":\"You are a judge\""));
    }

    #[test]
    fn chat_request_carries_max_tokens() {
        let req = AnthropicProvider::build_request(
            &CompletionRequest::new("x").with_max_tokens(500),
            "m",
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["max_tokens"], 500);
    }

    #[test]
    fn chat_response_deserializes() {
        let json = r#"{"content":[{"type":"text","text":"Hello there!"}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            AnthropicProvider::extract_text(&resp).unwrap(),
            "Hello there!"
        );
    }

    #[test]
    fn chat_response_joins_multiple_text_blocks() {
        let json =
            r#"{"content":[{"type":"text","text":"First"},{"type":"text","text":"Second"}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            AnthropicProvider::extract_text(&resp).unwrap(),
            "First\nSecond"
        );
    }

    #[test]
    fn chat_response_empty_content_is_error() {
        let json = r#"{"content":[]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(AnthropicProvider::extract_text(&resp).is_err());
    }

    #[test]
    fn chat_response_skips_unknown_block_types() {
        let json = r#"{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"ok"}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(AnthropicProvider::extract_text(&resp).unwrap(), "ok");
    }
}
