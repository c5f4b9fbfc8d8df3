//! Analytics aggregate queries for SQLite
//!
//! All queries are scoped to a project and an inclusive timestamp range.
//! Sums are wrapped in COALESCE so empty ranges decode as zero. Token sums
//! use TOTAL so oversized stored counters cannot raise an integer overflow.

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::{
    AnalyticsTotals, CostByProvider, CostDataPoint, DateRange, GroupBy, StatsByModel,
};

const RANGE_FILTER: &str = "WHERE project_id = ? AND timestamp >= ? AND timestamp <= ?";

fn range_bounds(range: DateRange) -> (i64, i64) {
    (range.from.timestamp_millis(), range.to.timestamp_millis())
}

fn non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

/// Scalar aggregates: cost, counts, tokens, latency, errors
pub async fn totals(
    pool: &SqlitePool,
    project_id: &str,
    range: DateRange,
) -> Result<AnalyticsTotals, SqliteError> {
    let (from, to) = range_bounds(range);
    let (total_cost, requests, sessions, input, output, avg_latency, errors): (
        f64,
        i64,
        i64,
        i64,
        i64,
        f64,
        i64,
    ) = sqlx::query_as(&format!(
        r#"SELECT
               CAST(COALESCE(SUM(cost_cents), 0) AS REAL),
               COUNT(*),
               COUNT(DISTINCT session_id),
               CAST(TOTAL(input_tokens) AS INTEGER),
               CAST(TOTAL(output_tokens) AS INTEGER),
               CAST(COALESCE(AVG(latency_ms), 0) AS REAL),
               COALESCE(SUM(CASE WHEN status = 'error' THEN 1 ELSE 0 END), 0)
           FROM traces {RANGE_FILTER}"#
    ))
    .bind(project_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(AnalyticsTotals {
        total_cost,
        total_requests: non_negative(requests),
        total_sessions: non_negative(sessions),
        input_tokens: non_negative(input),
        output_tokens: non_negative(output),
        avg_latency,
        error_count: non_negative(errors),
    })
}

/// Cost series grouped by time bucket (per provider), model or provider
pub async fn cost_over_time(
    pool: &SqlitePool,
    project_id: &str,
    range: DateRange,
    group_by: GroupBy,
) -> Result<Vec<CostDataPoint>, SqliteError> {
    let (from, to) = range_bounds(range);

    let time_format = match group_by {
        GroupBy::Day => Some("%Y-%m-%dT00:00:00Z"),
        GroupBy::Hour => Some("%Y-%m-%dT%H:00:00Z"),
        GroupBy::Model | GroupBy::Provider => None,
    };

    if let Some(format) = time_format {
        let rows: Vec<(String, String, f64)> = sqlx::query_as(&format!(
            r#"SELECT
                   strftime(?, timestamp / 1000, 'unixepoch') AS period,
                   provider,
                   CAST(COALESCE(SUM(cost_cents), 0) AS REAL)
               FROM traces {RANGE_FILTER}
               GROUP BY period, provider
               ORDER BY period ASC, provider ASC"#
        ))
        .bind(format)
        .bind(project_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        return Ok(rows
            .into_iter()
            .map(|(period, provider, cost_cents)| CostDataPoint {
                period,
                cost_cents,
                provider: Some(provider),
            })
            .collect());
    }

    let column = if group_by == GroupBy::Model {
        "model_requested"
    } else {
        "provider"
    };
    let rows: Vec<(String, f64)> = sqlx::query_as(&format!(
        r#"SELECT {column} AS period, CAST(COALESCE(SUM(cost_cents), 0) AS REAL)
           FROM traces {RANGE_FILTER}
           GROUP BY {column}
           ORDER BY period ASC"#
    ))
    .bind(project_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(period, cost_cents)| CostDataPoint {
            period,
            cost_cents,
            provider: None,
        })
        .collect())
}

/// Cost and request count per provider, most expensive first
pub async fn cost_by_provider(
    pool: &SqlitePool,
    project_id: &str,
    range: DateRange,
) -> Result<Vec<CostByProvider>, SqliteError> {
    let (from, to) = range_bounds(range);
    let rows: Vec<(String, f64, i64)> = sqlx::query_as(&format!(
        r#"SELECT provider, CAST(COALESCE(SUM(cost_cents), 0) AS REAL) AS cost, COUNT(*)
           FROM traces {RANGE_FILTER}
           GROUP BY provider
           ORDER BY cost DESC, provider ASC"#
    ))
    .bind(project_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(provider, cost_cents, requests)| CostByProvider {
            provider,
            cost_cents,
            requests: non_negative(requests),
        })
        .collect())
}

/// Per (provider, model) stats ordered by request count
pub async fn top_models(
    pool: &SqlitePool,
    project_id: &str,
    range: DateRange,
    limit: u32,
) -> Result<Vec<StatsByModel>, SqliteError> {
    let (from, to) = range_bounds(range);
    #[allow(clippy::type_complexity)]
    let rows: Vec<(String, String, i64, f64, f64, i64, i64)> = sqlx::query_as(&format!(
        r#"SELECT
               provider,
               model_requested,
               COUNT(*) AS requests,
               CAST(COALESCE(SUM(cost_cents), 0) AS REAL),
               CAST(COALESCE(AVG(latency_ms), 0) AS REAL),
               CAST(TOTAL(input_tokens) + TOTAL(output_tokens) AS INTEGER),
               COALESCE(SUM(CASE WHEN status = 'error' THEN 1 ELSE 0 END), 0)
           FROM traces {RANGE_FILTER}
           GROUP BY provider, model_requested
           ORDER BY requests DESC, provider ASC, model_requested ASC
           LIMIT ?"#
    ))
    .bind(project_id)
    .bind(from)
    .bind(to)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(provider, model, requests, cost_cents, avg_latency, tokens, errors)| {
                let error_rate = if requests > 0 {
                    errors as f64 / requests as f64 * 100.0
                } else {
                    0.0
                };
                StatsByModel {
                    provider,
                    model,
                    requests: non_negative(requests),
                    cost_cents,
                    avg_latency,
                    total_tokens: non_negative(tokens),
                    error_rate,
                }
            },
        )
        .collect())
}

/// Latency values in range, ascending
pub async fn latency_values(
    pool: &SqlitePool,
    project_id: &str,
    range: DateRange,
) -> Result<Vec<i64>, SqliteError> {
    let (from, to) = range_bounds(range);
    let values: Vec<i64> = sqlx::query_scalar(&format!(
        "SELECT latency_ms FROM traces {RANGE_FILTER} ORDER BY latency_ms ASC"
    ))
    .bind(project_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pulse::TraceStatus;

    use super::*;
    use crate::data::sqlite::repositories::trace::fixtures::trace_row;
    use crate::data::sqlite::repositories::trace::insert_batch;
    use crate::data::sqlite::SqliteService;
    use crate::data::sqlite::testing::service_with_project;
    use crate::data::types::TraceRow;
    use std::sync::Arc;

    fn january() -> DateRange {
        DateRange {
            from: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap(),
        }
    }

    fn sample(project_id: &str) -> Vec<TraceRow> {
        let mut a = trace_row(project_id, 0);
        a.session_id = Some("s1".into());
        a.cost_cents = Some(1.0);
        a.latency_ms = 100;

        let mut b = trace_row(project_id, 3600);
        b.session_id = Some("s1".into());
        b.cost_cents = Some(2.0);
        b.latency_ms = 300;

        let mut c = trace_row(project_id, 86_400);
        c.provider = "anthropic".into();
        c.model_requested = "claude-3-5-haiku-latest".into();
        c.session_id = Some("s2".into());
        c.cost_cents = Some(5.0);
        c.latency_ms = 500;
        c.status = TraceStatus::Error;
        c.response_body = None;
        c.input_tokens = Some(10);
        c.output_tokens = None;

        vec![a, b, c]
    }

    async fn seeded() -> (tempfile::TempDir, Arc<SqliteService>, String) {
        let (dir, service, project_id) = service_with_project().await;
        insert_batch(service.pool(), &project_id, &[], &sample(&project_id))
            .await
            .unwrap();
        (dir, service, project_id)
    }

    #[tokio::test]
    async fn test_totals() {
        let (_dir, service, project_id) = seeded().await;
        let totals = totals(service.pool(), &project_id, january()).await.unwrap();

        assert_eq!(totals.total_cost, 8.0);
        assert_eq!(totals.total_requests, 3);
        assert_eq!(totals.total_sessions, 2);
        assert_eq!(totals.input_tokens, 210);
        assert_eq!(totals.output_tokens, 100);
        assert_eq!(totals.avg_latency, 300.0);
        assert_eq!(totals.error_count, 1);
    }

    #[tokio::test]
    async fn test_totals_empty_range_is_zero() {
        let (_dir, service, project_id) = seeded().await;
        let range = DateRange {
            from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        };
        let totals = totals(service.pool(), &project_id, range).await.unwrap();
        assert_eq!(totals, AnalyticsTotals::default());
    }

    #[tokio::test]
    async fn test_token_sums_do_not_overflow() {
        let (_dir, service, project_id) = service_with_project().await;
        let mut huge = trace_row(&project_id, 0);
        huge.input_tokens = Some(i64::MAX);
        huge.output_tokens = Some(i64::MAX);
        let normal = trace_row(&project_id, 60);
        insert_batch(service.pool(), &project_id, &[], &[huge, normal])
            .await
            .unwrap();

        let totals = totals(service.pool(), &project_id, january()).await.unwrap();
        assert_eq!(totals.total_requests, 2);
        assert!(totals.input_tokens >= i64::MAX as u64 / 2);

        let models = top_models(service.pool(), &project_id, january(), 5)
            .await
            .unwrap();
        assert_eq!(models[0].requests, 2);
    }

    #[tokio::test]
    async fn test_range_is_inclusive() {
        let (_dir, service, project_id) = seeded().await;
        let at = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        let range = DateRange { from: at, to: at };
        let totals = totals(service.pool(), &project_id, range).await.unwrap();
        assert_eq!(totals.total_requests, 1);
    }

    #[tokio::test]
    async fn test_cost_over_time_by_day_and_hour() {
        let (_dir, service, project_id) = seeded().await;

        let days = cost_over_time(service.pool(), &project_id, january(), GroupBy::Day)
            .await
            .unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].period, "2025-01-15T00:00:00Z");
        assert_eq!(days[0].provider.as_deref(), Some("openai"));
        assert_eq!(days[0].cost_cents, 3.0);
        assert_eq!(days[1].period, "2025-01-16T00:00:00Z");
        assert_eq!(days[1].provider.as_deref(), Some("anthropic"));

        let hours = cost_over_time(service.pool(), &project_id, january(), GroupBy::Hour)
            .await
            .unwrap();
        let periods: Vec<_> = hours.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(
            periods,
            [
                "2025-01-15T10:00:00Z",
                "2025-01-15T11:00:00Z",
                "2025-01-16T10:00:00Z"
            ]
        );
    }

    #[tokio::test]
    async fn test_cost_over_time_by_model() {
        let (_dir, service, project_id) = seeded().await;
        let points = cost_over_time(service.pool(), &project_id, january(), GroupBy::Model)
            .await
            .unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].period, "claude-3-5-haiku-latest");
        assert_eq!(points[1].period, "gpt-4o");
        assert_eq!(points[1].cost_cents, 3.0);
        assert!(points.iter().all(|p| p.provider.is_none()));
    }

    #[tokio::test]
    async fn test_cost_by_provider_orders_by_cost() {
        let (_dir, service, project_id) = seeded().await;
        let providers = cost_by_provider(service.pool(), &project_id, january())
            .await
            .unwrap();
        assert_eq!(providers[0].provider, "anthropic");
        assert_eq!(providers[0].requests, 1);
        assert_eq!(providers[1].provider, "openai");
        assert_eq!(providers[1].cost_cents, 3.0);
    }

    #[tokio::test]
    async fn test_top_models() {
        let (_dir, service, project_id) = seeded().await;
        let models = top_models(service.pool(), &project_id, january(), 5)
            .await
            .unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].model, "gpt-4o");
        assert_eq!(models[0].requests, 2);
        assert_eq!(models[0].avg_latency, 200.0);
        assert_eq!(models[0].total_tokens, 300);
        assert_eq!(models[0].error_rate, 0.0);
        assert_eq!(models[1].error_rate, 100.0);
        assert_eq!(models[1].total_tokens, 10);

        let limited = top_models(service.pool(), &project_id, january(), 1)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_latency_values_sorted() {
        let (_dir, service, project_id) = seeded().await;
        let values = latency_values(service.pool(), &project_id, january())
            .await
            .unwrap();
        assert_eq!(values, [100, 300, 500]);
    }
}
