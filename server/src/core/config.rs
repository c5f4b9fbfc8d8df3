use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::cli::CliConfig;
use super::constants::{
    CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TOP_MODELS_LIMIT, SQLITE_DB_FILENAME,
};
use super::storage::AppStorage;
use crate::utils::file::expand_path;

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Database configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    pub path: Option<String>,
}

/// Analytics configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AnalyticsFileConfig {
    pub top_models_limit: Option<u32>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub database: Option<DatabaseFileConfig>,
    pub analytics: Option<AnalyticsFileConfig>,
    pub data_dir: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                current.host = server.host;
            }
            if server.port.is_some() {
                current.port = server.port;
            }
        }

        if let Some(database) = other.database {
            let current = self.database.get_or_insert_with(DatabaseFileConfig::default);
            if database.path.is_some() {
                current.path = database.path;
            }
        }

        if let Some(analytics) = other.analytics {
            let current = self
                .analytics
                .get_or_insert_with(AnalyticsFileConfig::default);
            if analytics.top_models_limit.is_some() {
                current.top_models_limit = analytics.top_models_limit;
            }
        }

        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite file; `None` means `<data_dir>/pulse.db`
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub top_models_limit: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub analytics: AnalyticsConfig,
    pub data_dir: Option<String>,
}

impl AppConfig {
    /// Load configuration: defaults -> config file -> CLI/env
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();

        let config_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = config_path {
            let loaded = FileConfig::load_from_file(&path)?;
            loaded.warn_unknown_fields();
            file_config.merge(loaded);
            tracing::debug!(path = %path.display(), "Config file loaded");
        }

        let config = Self::from_layers(cli, file_config);
        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            database_path = ?config.database.path,
            top_models_limit = config.analytics.top_models_limit,
            "Configuration loaded"
        );

        Ok(config)
    }

    fn from_layers(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_server = file_config.server.unwrap_or_default();
        let file_database = file_config.database.unwrap_or_default();
        let file_analytics = file_config.analytics.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                path: file_database.path.map(|p| expand_path(&p)),
            },
            analytics: AnalyticsConfig {
                top_models_limit: file_analytics
                    .top_models_limit
                    .unwrap_or(DEFAULT_TOP_MODELS_LIMIT),
            },
            data_dir: cli.data_dir.clone().or(file_config.data_dir),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }
        if self.analytics.top_models_limit == 0 {
            anyhow::bail!("Configuration error: analytics.top_models_limit must be greater than 0");
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn for_test() -> Self {
        Self::from_layers(&CliConfig::default(), FileConfig::default())
    }

    /// Database file, defaulting to the data directory
    pub fn database_path(&self, storage: &AppStorage) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| storage.data_path(SQLITE_DB_FILENAME))
    }
}
