//! Anthropic Messages API client

use async_trait::async_trait;
use serde_json::Value;

use super::{LlmClient, LlmResponse, check_status, sse_events, wants_stream};
use crate::error::ProviderError;
use crate::types::Provider;

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Minimal `POST /messages` client
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn create(&self, request: Value) -> Result<LlmResponse, ProviderError> {
        let streaming = wants_stream(&request);

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;
        let response = check_status(Provider::Anthropic, response).await?;

        if streaming {
            return Ok(LlmResponse::Stream(sse_events(Provider::Anthropic, response)));
        }
        let body = response.bytes().await?;
        Ok(LlmResponse::Complete(serde_json::from_slice(&body)?))
    }
}
