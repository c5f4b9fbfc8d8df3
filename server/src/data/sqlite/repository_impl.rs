//! Repository trait implementations for SQLite
//!
//! Implements the data traits for `Arc<SqliteService>` by delegating to the
//! free functions in `repositories`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::traits::{AnalyticsRepository, ProjectRepository, TraceRepository};
use crate::data::types::{
    AnalyticsTotals, CostByProvider, CostDataPoint, DateRange, GroupBy, ListTracesParams,
    ProjectRow, StatsByModel, TraceRow,
};

use super::SqliteService;
use super::repositories::{analytics, project, trace};

#[async_trait]
impl ProjectRepository for Arc<SqliteService> {
    async fn create_project(&self, name: &str, key_hash: &str) -> Result<ProjectRow, DataError> {
        project::create_project(self.pool(), name, key_hash)
            .await
            .map_err(Into::into)
    }

    async fn project_id_for_key_hash(&self, key_hash: &str) -> Result<Option<String>, DataError> {
        project::project_id_for_key_hash(self.pool(), key_hash)
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl TraceRepository for Arc<SqliteService> {
    async fn insert_batch(
        &self,
        project_id: &str,
        session_ids: &[String],
        traces: &[TraceRow],
    ) -> Result<(), DataError> {
        trace::insert_batch(self.pool(), project_id, session_ids, traces)
            .await
            .map_err(Into::into)
    }

    async fn list_traces(
        &self,
        params: &ListTracesParams,
    ) -> Result<(Vec<TraceRow>, u64), DataError> {
        trace::list_traces(self.pool(), params)
            .await
            .map_err(Into::into)
    }

    async fn get_trace(
        &self,
        project_id: &str,
        trace_id: &str,
    ) -> Result<Option<TraceRow>, DataError> {
        trace::get_trace(self.pool(), project_id, trace_id)
            .await
            .map_err(Into::into)
    }

    async fn session_traces(
        &self,
        project_id: &str,
        session_id: &str,
    ) -> Result<Vec<TraceRow>, DataError> {
        trace::session_traces(self.pool(), project_id, session_id)
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl AnalyticsRepository for Arc<SqliteService> {
    async fn totals(
        &self,
        project_id: &str,
        range: DateRange,
    ) -> Result<AnalyticsTotals, DataError> {
        analytics::totals(self.pool(), project_id, range)
            .await
            .map_err(Into::into)
    }

    async fn cost_over_time(
        &self,
        project_id: &str,
        range: DateRange,
        group_by: GroupBy,
    ) -> Result<Vec<CostDataPoint>, DataError> {
        analytics::cost_over_time(self.pool(), project_id, range, group_by)
            .await
            .map_err(Into::into)
    }

    async fn cost_by_provider(
        &self,
        project_id: &str,
        range: DateRange,
    ) -> Result<Vec<CostByProvider>, DataError> {
        analytics::cost_by_provider(self.pool(), project_id, range)
            .await
            .map_err(Into::into)
    }

    async fn top_models(
        &self,
        project_id: &str,
        range: DateRange,
        limit: u32,
    ) -> Result<Vec<StatsByModel>, DataError> {
        analytics::top_models(self.pool(), project_id, range, limit)
            .await
            .map_err(Into::into)
    }

    async fn latency_values(
        &self,
        project_id: &str,
        range: DateRange,
    ) -> Result<Vec<i64>, DataError> {
        analytics::latency_values(self.pool(), project_id, range)
            .await
            .map_err(Into::into)
    }
}
