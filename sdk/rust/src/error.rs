//! SDK error types

use thiserror::Error;

use crate::types::Provider;

/// Invalid SDK configuration, reported by `Pulse::init` before anything is instrumented
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Pulse SDK: apiKey is required")]
    MissingApiKey,

    #[error("Pulse SDK: apiKey must start with \"{0}\"")]
    InvalidApiKey(&'static str),

    #[error("Pulse SDK: batchSize must be between 1 and {max} (got {value})")]
    BatchSize { value: usize, max: usize },

    #[error("Pulse SDK: flushInterval must be at least {min_ms}ms (got {value_ms}ms)")]
    FlushInterval { value_ms: u64, min_ms: u64 },

    #[error("Pulse SDK: invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Failure of the wrapped provider call
///
/// Captured into an error trace, then handed back to the caller untouched.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: Provider,
        status: u16,
        message: String,
    },

    #[error("Failed to decode provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),
}

impl ProviderError {
    /// Short error class name recorded in the trace
    pub fn name(&self) -> &'static str {
        match self {
            Self::Http(_) => "HttpError",
            Self::Api { .. } => "ApiError",
            Self::Decode(_) => "DecodeError",
            Self::Stream(_) => "StreamError",
        }
    }

    /// HTTP status reported by the provider, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Delivery failure to the collection service (logged, never surfaced)
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("network error sending traces: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to send traces ({status}): {body}")]
    Status { status: u16, body: String },
}
