//! SDK configuration

use std::time::Duration;

use crate::error::ConfigError;

pub const API_KEY_PREFIX: &str = "pulse_sk_";
pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const MAX_BATCH_SIZE: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(5000);
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1000);

pub const ENV_API_KEY: &str = "PULSE_API_KEY";
pub const ENV_API_URL: &str = "PULSE_API_URL";
pub const ENV_BATCH_SIZE: &str = "PULSE_BATCH_SIZE";
pub const ENV_FLUSH_INTERVAL_MS: &str = "PULSE_FLUSH_INTERVAL_MS";
pub const ENV_ENABLED: &str = "PULSE_ENABLED";

/// User-supplied configuration; unset fields take defaults on [`PulseConfig::resolve`]
#[derive(Debug, Clone, Default)]
pub struct PulseConfig {
    pub api_key: String,
    pub api_url: Option<String>,
    pub batch_size: Option<usize>,
    pub flush_interval: Option<Duration>,
    pub enabled: Option<bool>,
}

/// Validated configuration with every field populated
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub api_key: String,
    pub api_url: String,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub enabled: bool,
}

impl PulseConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Build a config from `PULSE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new(lookup(ENV_API_KEY).unwrap_or_default());
        config.api_url = lookup(ENV_API_URL).filter(|s| !s.is_empty());

        if let Some(raw) = lookup(ENV_BATCH_SIZE) {
            let size = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_BATCH_SIZE,
                value: raw.clone(),
            })?;
            config.batch_size = Some(size);
        }

        if let Some(raw) = lookup(ENV_FLUSH_INTERVAL_MS) {
            let ms: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_FLUSH_INTERVAL_MS,
                value: raw.clone(),
            })?;
            config.flush_interval = Some(Duration::from_millis(ms));
        }

        if let Some(raw) = lookup(ENV_ENABLED) {
            let enabled = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        name: ENV_ENABLED,
                        value: raw,
                    });
                }
            };
            config.enabled = Some(enabled);
        }

        Ok(config)
    }

    /// Validate and fill in defaults
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !self.api_key.starts_with(API_KEY_PREFIX) {
            return Err(ConfigError::InvalidApiKey(API_KEY_PREFIX));
        }

        let batch_size = self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if !(1..=MAX_BATCH_SIZE).contains(&batch_size) {
            return Err(ConfigError::BatchSize {
                value: batch_size,
                max: MAX_BATCH_SIZE,
            });
        }

        let flush_interval = self.flush_interval.unwrap_or(DEFAULT_FLUSH_INTERVAL);
        if flush_interval < MIN_FLUSH_INTERVAL {
            return Err(ConfigError::FlushInterval {
                value_ms: flush_interval.as_millis() as u64,
                min_ms: MIN_FLUSH_INTERVAL.as_millis() as u64,
            });
        }

        let api_url = self
            .api_url
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(ResolvedConfig {
            api_key: self.api_key,
            api_url,
            batch_size,
            flush_interval,
            enabled: self.enabled.unwrap_or(true),
        })
    }
}
