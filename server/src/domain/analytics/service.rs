//! Analytics aggregation
//!
//! Sub-aggregates are queried concurrently, then combined into one
//! [`AnalyticsResult`] with derived ratios.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use super::latency::{self, LatencyBucket, LatencyPercentiles};
use crate::data::error::DataError;
use crate::data::traits::AnalyticsRepository;
use crate::data::types::{
    AnalyticsTotals, CostByProvider, CostDataPoint, DateRange, GroupBy, StatsByModel,
};

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("date_from must not be after date_to")]
    InvalidRange,

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Parameters of one analytics request
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsQuery {
    pub range: DateRange,
    pub group_by: GroupBy,
    pub include_latency: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenTotals {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}

/// Ratios derived from the base aggregates. Zero denominators yield 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedMetrics {
    pub cost_per_request: f64,
    pub tokens_per_request: f64,
    pub cost_per_1k_tokens: f64,
    pub traces_per_session: f64,
    pub avg_input_tokens: f64,
    pub avg_output_tokens: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResult {
    pub total_cost: f64,
    pub total_requests: u64,
    pub total_sessions: u64,
    pub total_tokens: TokenTotals,
    pub avg_latency: f64,
    pub error_rate: f64,
    pub cost_over_time: Vec<CostDataPoint>,
    pub cost_by_provider: Vec<CostByProvider>,
    pub top_models: Vec<StatsByModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_distribution: Option<Vec<LatencyBucket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_percentiles: Option<LatencyPercentiles>,
    pub computed: ComputedMetrics,
}

fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn compute_metrics(totals: &AnalyticsTotals) -> ComputedMetrics {
    let requests = totals.total_requests as f64;
    let input = totals.input_tokens as f64;
    let output = totals.output_tokens as f64;
    let tokens = input + output;

    ComputedMetrics {
        cost_per_request: safe_divide(totals.total_cost, requests),
        tokens_per_request: safe_divide(tokens, requests),
        cost_per_1k_tokens: safe_divide(totals.total_cost, tokens) * 1000.0,
        traces_per_session: safe_divide(requests, totals.total_sessions as f64),
        avg_input_tokens: safe_divide(input, requests),
        avg_output_tokens: safe_divide(output, requests),
    }
}

#[derive(Clone)]
pub struct AnalyticsService {
    repo: Arc<dyn AnalyticsRepository>,
    top_models_limit: u32,
}

impl AnalyticsService {
    pub fn new(repo: Arc<dyn AnalyticsRepository>, top_models_limit: u32) -> Self {
        Self {
            repo,
            top_models_limit,
        }
    }

    pub async fn analyze(
        &self,
        project_id: &str,
        query: AnalyticsQuery,
    ) -> Result<AnalyticsResult, AnalyticsError> {
        let range = query.range;
        if range.from > range.to {
            return Err(AnalyticsError::InvalidRange);
        }

        let latency_values = async {
            if query.include_latency {
                self.repo.latency_values(project_id, range).await.map(Some)
            } else {
                Ok(None)
            }
        };

        let (totals, cost_over_time, cost_by_provider, top_models, latency_values) = tokio::try_join!(
            self.repo.totals(project_id, range),
            self.repo.cost_over_time(project_id, range, query.group_by),
            self.repo.cost_by_provider(project_id, range),
            self.repo.top_models(project_id, range, self.top_models_limit),
            latency_values,
        )?;

        let input = totals.input_tokens;
        let output = totals.output_tokens;
        let error_rate = safe_divide(
            totals.error_count as f64 * 100.0,
            totals.total_requests as f64,
        );

        tracing::debug!(
            project_id,
            requests = totals.total_requests,
            group_by = %query.group_by,
            "Computed analytics"
        );

        Ok(AnalyticsResult {
            total_cost: totals.total_cost,
            total_requests: totals.total_requests,
            total_sessions: totals.total_sessions,
            total_tokens: TokenTotals {
                input,
                output,
                total: input.saturating_add(output),
            },
            avg_latency: totals.avg_latency,
            error_rate,
            cost_over_time,
            cost_by_provider,
            top_models,
            latency_distribution: latency_values.as_deref().map(latency::distribution),
            latency_percentiles: latency_values.as_deref().map(latency::percentiles),
            computed: compute_metrics(&totals),
        })
    }
}
