//! OpenAI-compatible chat completions client (OpenAI, OpenRouter)

use async_trait::async_trait;
use serde_json::Value;

use super::{LlmClient, LlmResponse, check_status, sse_events, wants_stream};
use crate::error::ProviderError;
use crate::types::Provider;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Minimal `POST /chat/completions` client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new(api_key).with_base_url(OPENROUTER_BASE_URL)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    /// OpenRouter is recognized by its base URL
    fn provider(&self) -> Provider {
        if self.base_url.contains("openrouter") {
            Provider::OpenRouter
        } else {
            Provider::OpenAi
        }
    }

    async fn create(&self, request: Value) -> Result<LlmResponse, ProviderError> {
        let provider = self.provider();
        let streaming = wants_stream(&request);

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(provider, response).await?;

        if streaming {
            return Ok(LlmResponse::Stream(sse_events(provider, response)));
        }
        let body = response.bytes().await?;
        Ok(LlmResponse::Complete(serde_json::from_slice(&body)?))
    }
}
