//! Repository traits
//!
//! Domain services depend on these traits rather than on SQLite directly.

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::types::{
    AnalyticsTotals, CostByProvider, CostDataPoint, DateRange, GroupBy, ListTracesParams,
    ProjectRow, StatsByModel, TraceRow,
};

// ============================================================================
// Project Repository
// ============================================================================

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Create a project and store the hash of its first API key
    async fn create_project(&self, name: &str, key_hash: &str) -> Result<ProjectRow, DataError>;

    /// Resolve an API key hash to its project id
    async fn project_id_for_key_hash(&self, key_hash: &str) -> Result<Option<String>, DataError>;
}

// ============================================================================
// Trace Repository
// ============================================================================

#[async_trait]
pub trait TraceRepository: Send + Sync {
    /// Upsert sessions and insert traces in one transaction
    ///
    /// A trace id that already exists fails the whole batch with
    /// [`DataError::Conflict`].
    async fn insert_batch(
        &self,
        project_id: &str,
        session_ids: &[String],
        traces: &[TraceRow],
    ) -> Result<(), DataError>;

    /// Filtered page of traces, newest first, with the unpaginated total
    async fn list_traces(&self, params: &ListTracesParams)
    -> Result<(Vec<TraceRow>, u64), DataError>;

    async fn get_trace(
        &self,
        project_id: &str,
        trace_id: &str,
    ) -> Result<Option<TraceRow>, DataError>;

    /// All traces of a session, oldest first
    async fn session_traces(
        &self,
        project_id: &str,
        session_id: &str,
    ) -> Result<Vec<TraceRow>, DataError>;
}

// ============================================================================
// Analytics Repository
// ============================================================================

#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn totals(&self, project_id: &str, range: DateRange)
    -> Result<AnalyticsTotals, DataError>;

    async fn cost_over_time(
        &self,
        project_id: &str,
        range: DateRange,
        group_by: GroupBy,
    ) -> Result<Vec<CostDataPoint>, DataError>;

    /// Cost and request count per provider, most expensive first
    async fn cost_by_provider(
        &self,
        project_id: &str,
        range: DateRange,
    ) -> Result<Vec<CostByProvider>, DataError>;

    /// Per (provider, model) stats, busiest first
    async fn top_models(
        &self,
        project_id: &str,
        range: DateRange,
        limit: u32,
    ) -> Result<Vec<StatsByModel>, DataError>;

    /// Raw latency values in the range, ascending
    async fn latency_values(&self, project_id: &str, range: DateRange)
    -> Result<Vec<i64>, DataError>;
}
