//! # Pulse
//!
//! Captures OpenAI, Anthropic and OpenRouter calls as traces and ships them
//! in batches to a Pulse collection service.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pulse::{AnthropicClient, ObserveOptions, Pulse, PulseConfig};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pulse = Pulse::init(PulseConfig::new("pulse_sk_..."))?;
//! pulse.install_signal_handlers();
//!
//! let client = pulse.observe(AnthropicClient::new("sk-ant-..."), ObserveOptions::default());
//! let response = client
//!     .create(json!({
//!         "model": "claude-3-5-sonnet-20241022",
//!         "max_tokens": 256,
//!         "messages": [{"role": "user", "content": "Hello"}]
//!     }))
//!     .await?;
//! # let _ = response;
//!
//! pulse.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! Tracing never changes what the wrapped client returns. Delivery failures
//! are logged and the affected batch is dropped.

pub mod buffer;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pricing;
pub mod providers;
pub mod stream;
pub mod trace;
pub mod transport;
pub mod types;

use std::sync::Arc;

pub use buffer::TraceBuffer;
pub use config::{PulseConfig, ResolvedConfig};
pub use error::{ConfigError, ProviderError, TransportError};
pub use providers::{AnthropicClient, LlmClient, LlmResponse, Observed, OpenAiClient};
pub use stream::EventStream;
pub use transport::{HttpTransport, TraceTransport};
pub use types::{NormalizedResponse, ObserveOptions, Provider, Trace, TraceError, TraceStatus};

/// Handle to an initialized SDK instance
///
/// Cheap to clone; all clones share one buffer.
#[derive(Clone)]
pub struct Pulse {
    buffer: Arc<TraceBuffer>,
}

impl Pulse {
    /// Validate config and start the periodic flush
    ///
    /// Must be called from within a Tokio runtime for the flush timer to run.
    pub fn init(config: PulseConfig) -> Result<Self, ConfigError> {
        let config = config.resolve()?;
        let transport = Arc::new(HttpTransport::new(&config.api_url, &config.api_key));
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: ResolvedConfig, transport: Arc<dyn TraceTransport>) -> Self {
        let buffer = TraceBuffer::new(config, transport);
        if buffer.is_enabled() {
            buffer.start_flush_interval();
        } else {
            tracing::info!("Pulse SDK: disabled, calls will not be traced");
        }
        Self { buffer }
    }

    /// Wrap a provider client so every call is traced
    pub fn observe<C: LlmClient>(&self, client: C, options: ObserveOptions) -> Observed<C> {
        Observed::new(client, self.buffer.clone(), options)
    }

    pub fn buffer(&self) -> &Arc<TraceBuffer> {
        &self.buffer
    }

    pub async fn flush(&self) {
        self.buffer.flush().await;
    }

    /// Final flush; safe to call more than once
    pub async fn shutdown(&self) {
        self.buffer.shutdown().await;
    }

    /// Flush and exit on SIGINT / SIGTERM
    pub fn install_signal_handlers(&self) {
        let buffer = self.buffer.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            buffer.shutdown().await;
            std::process::exit(0);
        });
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "Pulse SDK: failed to install SIGTERM handler");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Pulse SDK: failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Pulse SDK: failed to listen for Ctrl+C");
                sigterm.recv().await;
            }
            tracing::info!("Pulse SDK: SIGINT received");
        }
        _ = sigterm.recv() => {
            tracing::info!("Pulse SDK: SIGTERM received");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Pulse SDK: failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
