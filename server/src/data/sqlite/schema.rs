//! SQLite schema definitions
//!
//! Timestamps are INTEGER milliseconds since the Unix epoch. JSON payloads
//! are stored as TEXT.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success INTEGER NOT NULL DEFAULT 1
);

-- =============================================================================
-- 1. Projects
-- =============================================================================
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK(length(name) >= 1 AND length(name) <= 100),
    created_at INTEGER NOT NULL
);

-- =============================================================================
-- 2. API Keys (SHA-256 hex of the plaintext key)
-- =============================================================================
CREATE TABLE IF NOT EXISTS api_keys (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    key_hash TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_api_keys_project ON api_keys(project_id);

-- =============================================================================
-- 3. Sessions
-- =============================================================================
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT NOT NULL,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    metadata TEXT,
    PRIMARY KEY (project_id, id)
);

-- =============================================================================
-- 4. Traces
-- =============================================================================
CREATE TABLE IF NOT EXISTS traces (
    trace_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    session_id TEXT,
    timestamp INTEGER NOT NULL,
    provider TEXT NOT NULL,
    model_requested TEXT NOT NULL,
    model_used TEXT,
    provider_request_id TEXT,
    request_body TEXT NOT NULL,
    response_body TEXT,
    input_tokens INTEGER CHECK(input_tokens IS NULL OR input_tokens >= 0),
    output_tokens INTEGER CHECK(output_tokens IS NULL OR output_tokens >= 0),
    output_text TEXT,
    finish_reason TEXT,
    status TEXT NOT NULL CHECK(status IN ('success', 'error')),
    error TEXT,
    cost_cents REAL CHECK(cost_cents IS NULL OR cost_cents >= 0),
    latency_ms INTEGER NOT NULL CHECK(latency_ms >= 0),
    metadata TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_traces_project_timestamp ON traces(project_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_traces_project_session ON traces(project_id, session_id);
CREATE INDEX IF NOT EXISTS idx_traces_project_provider ON traces(project_id, provider);
CREATE INDEX IF NOT EXISTS idx_traces_project_model ON traces(project_id, model_requested);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_declares_core_tables() {
        for table in ["schema_version", "projects", "api_keys", "sessions", "traces"] {
            assert!(
                SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
                "missing table {table}"
            );
        }
    }
}
