//! Error type for the data layer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    #[error("Migration {version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored JSON column could not be decoded
    #[error("Corrupt row: {0}")]
    Decode(String),

    /// Duplicate key (e.g. a trace id that already exists)
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<crate::data::sqlite::SqliteError> for DataError {
    fn from(e: crate::data::sqlite::SqliteError) -> Self {
        use crate::data::sqlite::SqliteError;
        match e {
            SqliteError::Database(e) => Self::Sqlite(e),
            SqliteError::MigrationFailed {
                version,
                name,
                error,
            } => Self::MigrationFailed {
                version,
                name,
                error,
            },
            SqliteError::Io(e) => Self::Io(e),
            SqliteError::Json(e) => Self::Decode(e.to_string()),
            SqliteError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::SqliteError;

    #[test]
    fn test_conflict_passes_through() {
        let err: DataError = SqliteError::Conflict("trace abc already exists".into()).into();
        assert!(matches!(err, DataError::Conflict(ref m) if m == "trace abc already exists"));
        assert_eq!(err.to_string(), "Conflict: trace abc already exists");
    }

    #[test]
    fn test_migration_failed_display() {
        let err: DataError = SqliteError::MigrationFailed {
            version: 2,
            name: "add_index".into(),
            error: "syntax error".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Migration 2 (add_index) failed: syntax error");
    }
}
