//! Trace ingestion and queries
//!
//! - `validate` - Inbound batch schema checks
//! - `service` - Ingest, list, lookup and session listing

mod service;
mod validate;

pub use service::{IngestResult, SessionTraces, TraceList, TraceService, TraceServiceError};
pub use validate::{ValidationDetail, validate_timestamp, validate_uuid};
