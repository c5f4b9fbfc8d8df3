// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "Pulse";

/// Application name in lowercase (for paths, identifiers and the log filter)
pub const APP_NAME_LOWER: &str = "pulse";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".pulse";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "pulse.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "PULSE_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "PULSE_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "PULSE_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "PULSE_LOG";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 3000;

/// Timeout for background tasks during shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "PULSE_DATA_DIR";

// =============================================================================
// SQLite
// =============================================================================

/// SQLite database filename inside the data directory
pub const SQLITE_DB_FILENAME: &str = "pulse.db";

pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// Page cache size (negative = KiB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

/// Pages between automatic WAL checkpoints
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";

/// Interval of the background WAL checkpoint task
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 300;

// =============================================================================
// API
// =============================================================================

/// Request body limit for ingestion (10 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Maximum traces per ingestion batch
pub const MAX_BATCH_SIZE: usize = 100;

/// Prefix of project API keys
pub const API_KEY_PREFIX: &str = "pulse_sk_";

/// Default page size for trace listing
pub const DEFAULT_TRACE_LIMIT: u32 = 100;

/// Largest page size for trace listing
pub const MAX_TRACE_LIMIT: u32 = 1000;

/// Max length of the provider string on traces and filters
pub const MAX_PROVIDER_LENGTH: u64 = 50;

/// Upper bound for token counts and latency on ingested traces (32-bit column range)
pub const MAX_TRACE_COUNTER: u64 = 2_147_483_647;

// =============================================================================
// Analytics
// =============================================================================

/// Default number of rows in `topModels`
pub const DEFAULT_TOP_MODELS_LIMIT: u32 = 5;

/// Epoch values at or above this are treated as milliseconds
pub const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;
