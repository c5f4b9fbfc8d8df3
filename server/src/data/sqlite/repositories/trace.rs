//! Trace and session repository for SQLite operations
//!
//! JSON columns are stored as TEXT and decoded on read. `timestamp` is
//! stored as epoch milliseconds.

use pulse::TraceStatus;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::data::sqlite::SqliteError;
use crate::data::types::{ListTracesParams, TraceRow};
use crate::utils::time::millis_to_datetime;

const TRACE_COLUMNS: &str = "trace_id, project_id, session_id, timestamp, provider, model_requested, \
     model_used, provider_request_id, request_body, response_body, input_tokens, output_tokens, \
     output_text, finish_reason, status, error, cost_cents, latency_ms, metadata";

/// Create missing sessions and insert traces atomically
pub async fn insert_batch(
    pool: &SqlitePool,
    project_id: &str,
    session_ids: &[String],
    traces: &[TraceRow],
) -> Result<(), SqliteError> {
    let now = chrono::Utc::now().timestamp_millis();
    let mut tx = pool.begin().await?;

    for session_id in session_ids {
        sqlx::query(
            r#"INSERT INTO sessions (id, project_id, created_at) VALUES (?, ?, ?)
               ON CONFLICT(project_id, id) DO NOTHING"#,
        )
        .bind(session_id)
        .bind(project_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    for trace in traces {
        let request_body = serde_json::to_string(&trace.request_body)?;
        let response_body = to_json_text(trace.response_body.as_ref())?;
        let error = to_json_text(trace.error.as_ref())?;
        let metadata = to_json_text(trace.metadata.as_ref())?;

        sqlx::query(
            r#"INSERT INTO traces (
                   trace_id, project_id, session_id, timestamp, provider, model_requested,
                   model_used, provider_request_id, request_body, response_body,
                   input_tokens, output_tokens, output_text, finish_reason, status, error,
                   cost_cents, latency_ms, metadata, created_at
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&trace.trace_id)
        .bind(project_id)
        .bind(&trace.session_id)
        .bind(trace.timestamp.timestamp_millis())
        .bind(&trace.provider)
        .bind(&trace.model_requested)
        .bind(&trace.model_used)
        .bind(&trace.provider_request_id)
        .bind(request_body)
        .bind(response_body)
        .bind(trace.input_tokens)
        .bind(trace.output_tokens)
        .bind(&trace.output_text)
        .bind(&trace.finish_reason)
        .bind(trace.status.as_str())
        .bind(error)
        .bind(trace.cost_cents)
        .bind(trace.latency_ms)
        .bind(metadata)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            SqliteError::conflict_on_unique(e, || {
                format!("Trace {} already exists", trace.trace_id)
            })
        })?;
    }

    tx.commit().await?;

    tracing::debug!(
        project_id,
        sessions = session_ids.len(),
        traces = traces.len(),
        "Inserted trace batch"
    );
    Ok(())
}

/// Filtered page of traces (newest first) and the total matching count
pub async fn list_traces(
    pool: &SqlitePool,
    params: &ListTracesParams,
) -> Result<(Vec<TraceRow>, u64), SqliteError> {
    let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM traces");
    push_filters(&mut count_query, params);
    let total: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

    let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {TRACE_COLUMNS} FROM traces"));
    push_filters(&mut query, params);
    query
        .push(" ORDER BY timestamp DESC, trace_id DESC LIMIT ")
        .push_bind(i64::from(params.limit))
        .push(" OFFSET ")
        .push_bind(i64::from(params.offset));

    let rows = query.build().fetch_all(pool).await?;
    let traces = rows
        .iter()
        .map(decode_trace)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((traces, total.max(0) as u64))
}

/// Single trace by id, scoped to the project
pub async fn get_trace(
    pool: &SqlitePool,
    project_id: &str,
    trace_id: &str,
) -> Result<Option<TraceRow>, SqliteError> {
    let row = sqlx::query(&format!(
        "SELECT {TRACE_COLUMNS} FROM traces WHERE project_id = ? AND trace_id = ?"
    ))
    .bind(project_id)
    .bind(trace_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(decode_trace).transpose()
}

/// Every trace of a session in chronological order
pub async fn session_traces(
    pool: &SqlitePool,
    project_id: &str,
    session_id: &str,
) -> Result<Vec<TraceRow>, SqliteError> {
    let rows = sqlx::query(&format!(
        "SELECT {TRACE_COLUMNS} FROM traces WHERE project_id = ? AND session_id = ? \
         ORDER BY timestamp ASC, trace_id ASC"
    ))
    .bind(project_id)
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(decode_trace).collect()
}

fn push_filters<'a>(query: &mut QueryBuilder<'a, Sqlite>, params: &'a ListTracesParams) {
    query
        .push(" WHERE project_id = ")
        .push_bind(params.project_id.as_str());

    if let Some(session_id) = &params.session_id {
        query.push(" AND session_id = ").push_bind(session_id.as_str());
    }
    if let Some(provider) = &params.provider {
        query.push(" AND provider = ").push_bind(provider.as_str());
    }
    if let Some(model) = &params.model {
        query.push(" AND model_requested = ").push_bind(model.as_str());
    }
    if let Some(status) = params.status {
        query.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(from) = params.date_from {
        query.push(" AND timestamp >= ").push_bind(from.timestamp_millis());
    }
    if let Some(to) = params.date_to {
        query.push(" AND timestamp <= ").push_bind(to.timestamp_millis());
    }
}

fn to_json_text(value: Option<&Value>) -> Result<Option<String>, serde_json::Error> {
    value.map(serde_json::to_string).transpose()
}

fn from_json_text(text: Option<String>) -> Result<Option<Value>, serde_json::Error> {
    text.as_deref().map(serde_json::from_str).transpose()
}

fn decode_trace(row: &SqliteRow) -> Result<TraceRow, SqliteError> {
    let status: String = row.try_get("status")?;
    let status = TraceStatus::parse(&status).ok_or_else(|| {
        SqliteError::Database(sqlx::Error::Decode(
            format!("invalid trace status '{}'", status).into(),
        ))
    })?;

    let timestamp = millis_to_datetime(row.try_get("timestamp")?);

    let request_body: String = row.try_get("request_body")?;

    Ok(TraceRow {
        trace_id: row.try_get("trace_id")?,
        project_id: row.try_get("project_id")?,
        session_id: row.try_get("session_id")?,
        timestamp,
        provider: row.try_get("provider")?,
        model_requested: row.try_get("model_requested")?,
        model_used: row.try_get("model_used")?,
        provider_request_id: row.try_get("provider_request_id")?,
        request_body: serde_json::from_str(&request_body)?,
        response_body: from_json_text(row.try_get("response_body")?)?,
        input_tokens: row.try_get("input_tokens")?,
        output_tokens: row.try_get("output_tokens")?,
        output_text: row.try_get("output_text")?,
        finish_reason: row.try_get("finish_reason")?,
        status,
        error: from_json_text(row.try_get("error")?)?,
        cost_cents: row.try_get("cost_cents")?,
        latency_ms: row.try_get("latency_ms")?,
        metadata: from_json_text(row.try_get("metadata")?)?,
    })
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::fixtures::trace_row;
    use super::*;
    use crate::data::sqlite::testing::service_with_project;

    #[tokio::test]
    async fn test_insert_and_get_roundtrip() {
        let (_dir, service, project_id) = service_with_project().await;
        let mut trace = trace_row(&project_id, 0);
        trace.metadata = Some(json!({"feature": "chat"}));

        insert_batch(service.pool(), &project_id, &[], std::slice::from_ref(&trace))
            .await
            .unwrap();

        let stored = get_trace(service.pool(), &project_id, &trace.trace_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, trace);
    }

    #[tokio::test]
    async fn test_get_trace_is_project_scoped() {
        let (_dir, service, project_id) = service_with_project().await;
        let trace = trace_row(&project_id, 0);
        insert_batch(service.pool(), &project_id, &[], std::slice::from_ref(&trace))
            .await
            .unwrap();

        let other = get_trace(service.pool(), "other-project", &trace.trace_id)
            .await
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_trace_rolls_back_batch() {
        let (_dir, service, project_id) = service_with_project().await;
        let existing = trace_row(&project_id, 0);
        insert_batch(service.pool(), &project_id, &[], std::slice::from_ref(&existing))
            .await
            .unwrap();

        let fresh = trace_row(&project_id, 1);
        let err = insert_batch(service.pool(), &project_id, &[], &[fresh.clone(), existing])
            .await
            .unwrap_err();
        assert!(matches!(err, SqliteError::Conflict(_)));

        let missing = get_trace(service.pool(), &project_id, &fresh.trace_id)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_pagination() {
        let (_dir, service, project_id) = service_with_project().await;
        let mut traces: Vec<TraceRow> = (0..5).map(|i| trace_row(&project_id, i)).collect();
        traces[4].provider = "anthropic".into();
        traces[3].status = TraceStatus::Error;
        insert_batch(service.pool(), &project_id, &[], &traces)
            .await
            .unwrap();

        let (page, total) = list_traces(service.pool(), &ListTracesParams::new(&project_id, 2, 0))
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].trace_id, traces[4].trace_id);
        assert_eq!(page[1].trace_id, traces[3].trace_id);

        let mut params = ListTracesParams::new(&project_id, 10, 0);
        params.provider = Some("openai".into());
        params.status = Some(TraceStatus::Success);
        let (page, total) = list_traces(service.pool(), &params).await.unwrap();
        assert_eq!(total, 3);
        assert!(page.iter().all(|t| t.provider == "openai"));

        let mut params = ListTracesParams::new(&project_id, 10, 0);
        params.date_from = Some(traces[1].timestamp);
        params.date_to = Some(traces[2].timestamp);
        let (_, total) = list_traces(service.pool(), &params).await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_session_upsert_and_traces() {
        let (_dir, service, project_id) = service_with_project().await;
        let session_id = uuid::Uuid::new_v4().to_string();
        let mut first = trace_row(&project_id, 10);
        first.session_id = Some(session_id.clone());
        let mut second = trace_row(&project_id, 5);
        second.session_id = Some(session_id.clone());

        let sessions = [session_id.clone()];
        insert_batch(service.pool(), &project_id, &sessions, &[first.clone()])
            .await
            .unwrap();
        let created_at: i64 =
            sqlx::query_scalar("SELECT created_at FROM sessions WHERE project_id = ? AND id = ?")
                .bind(&project_id)
                .bind(&session_id)
                .fetch_one(service.pool())
                .await
                .unwrap();

        insert_batch(service.pool(), &project_id, &sessions, &[second.clone()])
            .await
            .unwrap();

        let rows: Vec<i64> =
            sqlx::query_scalar("SELECT created_at FROM sessions WHERE project_id = ? AND id = ?")
                .bind(&project_id)
                .bind(&session_id)
                .fetch_all(service.pool())
                .await
                .unwrap();
        assert_eq!(rows, vec![created_at]);

        let traces = session_traces(service.pool(), &project_id, &session_id)
            .await
            .unwrap();
        let ids: Vec<_> = traces.iter().map(|t| t.trace_id.as_str()).collect();
        assert_eq!(ids, [second.trace_id.as_str(), first.trace_id.as_str()]);
    }
}
