pub mod anthropic;
pub mod traits;

pub use anthropic::BoundAnthropicProvider;
pub use traits::{CompletionProvider, CompletionRequest};

use crate::config::Config;
use crate::error::ProviderError;
use std::sync::Arc;

const MAX_API_ERROR_CHARS: usize = 200;

/// Build an error for a non-success provider response, with the body
/// truncated so oversized upstream payloads never flood logs.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    let trimmed: String = body.chars().take(MAX_API_ERROR_CHARS).collect();
    ProviderError::Request {
        provider: provider.to_string(),
        message: format!("API error ({status}): {trimmed}"),
    }
    .into()
}

/// Create the completion provider from config. Credentials may legitimately
/// be absent at startup; each unit of work reports the missing-credential
/// failure when it actually tries to call out.
pub fn create_provider(config: &Config) -> Arc<dyn CompletionProvider> {
    let api_key = config.provider.resolve_api_key();
    Arc::new(BoundAnthropicProvider::new(
        api_key.as_deref(),
        config.provider.base_url.as_deref(),
        config.provider.model.clone(),
    ))
}
