//! Project and API key repository for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::ProjectRow;

/// Create a project together with its first API key hash
pub async fn create_project(
    pool: &SqlitePool,
    name: &str,
    key_hash: &str,
) -> Result<ProjectRow, SqliteError> {
    let id = uuid::Uuid::new_v4().to_string();
    let key_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp_millis();

    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO projects (id, name, created_at) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(name)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO api_keys (id, project_id, key_hash, created_at) VALUES (?, ?, ?, ?)")
        .bind(&key_id)
        .bind(&id)
        .bind(key_hash)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| SqliteError::conflict_on_unique(e, || "API key already exists".into()))?;

    tx.commit().await?;

    tracing::debug!(project_id = %id, "Created project");

    Ok(ProjectRow {
        id,
        name: name.to_string(),
        created_at: now,
    })
}

/// Look up the project owning an API key hash
pub async fn project_id_for_key_hash(
    pool: &SqlitePool,
    key_hash: &str,
) -> Result<Option<String>, SqliteError> {
    let project_id: Option<String> =
        sqlx::query_scalar("SELECT project_id FROM api_keys WHERE key_hash = ?")
            .bind(key_hash)
            .fetch_optional(pool)
            .await?;
    Ok(project_id)
}
