//! Trace delivery to the collection service

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::Trace;

const BATCH_PATH: &str = "/v1/traces/batch";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends a batch of traces
///
/// Implementations never surface failures to the caller; a failed batch is
/// logged and dropped.
#[async_trait]
pub trait TraceTransport: Send + Sync {
    async fn send(&self, traces: &[Trace]);
}

/// HTTP transport posting JSON batches with a bearer API key
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(api_url: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            client,
            endpoint: format!("{}{}", api_url.trim_end_matches('/'), BATCH_PATH),
            api_key: api_key.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn try_send(&self, traces: &[Trace]) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(traces)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TraceTransport for HttpTransport {
    async fn send(&self, traces: &[Trace]) {
        if traces.is_empty() {
            return;
        }
        match self.try_send(traces).await {
            Ok(()) => tracing::debug!(count = traces.len(), "Sent traces"),
            Err(e) => tracing::error!(error = %e, count = traces.len(), "Pulse SDK: dropping trace batch"),
        }
    }
}
