//! Trace ingestion and query service

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::validate::{ValidationDetail, parse_batch};
use crate::data::error::DataError;
use crate::data::traits::TraceRepository;
use crate::data::types::{ListTracesParams, TraceRow};

#[derive(Error, Debug)]
pub enum TraceServiceError {
    #[error("Validation failed")]
    Validation(Vec<ValidationDetail>),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Outcome of a successful batch ingest
#[derive(Debug, Serialize)]
pub struct IngestResult {
    pub count: usize,
    pub traces: Vec<TraceRow>,
}

/// A page of traces plus the unpaginated total
#[derive(Debug, Serialize)]
pub struct TraceList {
    pub traces: Vec<TraceRow>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTraces {
    pub session_id: String,
    pub traces: Vec<TraceRow>,
}

#[derive(Clone)]
pub struct TraceService {
    repo: Arc<dyn TraceRepository>,
}

impl TraceService {
    pub fn new(repo: Arc<dyn TraceRepository>) -> Self {
        Self { repo }
    }

    /// Validate, then persist a batch for `project_id`
    ///
    /// Sessions referenced by the batch are created first. The batch is
    /// applied atomically.
    pub async fn ingest(
        &self,
        project_id: &str,
        raw: Value,
    ) -> Result<IngestResult, TraceServiceError> {
        let traces = parse_batch(project_id, raw).map_err(TraceServiceError::Validation)?;

        let mut seen = HashSet::new();
        let sessions: Vec<String> = traces
            .iter()
            .filter_map(|t| t.session_id.as_deref())
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect();

        self.repo
            .insert_batch(project_id, &sessions, &traces)
            .await?;

        tracing::debug!(
            project_id,
            count = traces.len(),
            sessions = sessions.len(),
            "Ingested traces"
        );

        Ok(IngestResult {
            count: traces.len(),
            traces,
        })
    }

    pub async fn query(&self, params: ListTracesParams) -> Result<TraceList, DataError> {
        let (traces, total) = self.repo.list_traces(&params).await?;
        Ok(TraceList {
            traces,
            total,
            limit: params.limit,
            offset: params.offset,
        })
    }

    pub async fn get(&self, project_id: &str, trace_id: &str) -> Result<Option<TraceRow>, DataError> {
        self.repo.get_trace(project_id, trace_id).await
    }

    /// Traces of a session, oldest first. `None` when the session has no traces.
    pub async fn session_traces(
        &self,
        project_id: &str,
        session_id: &str,
    ) -> Result<Option<SessionTraces>, DataError> {
        let traces = self.repo.session_traces(project_id, session_id).await?;
        if traces.is_empty() {
            return Ok(None);
        }
        Ok(Some(SessionTraces {
            session_id: session_id.to_string(),
            traces,
        }))
    }
}
