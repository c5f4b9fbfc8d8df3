//! Domain logic for trace ingestion and analytics
//!
//! - `traces` - Batch validation, ingestion and trace/session queries
//! - `analytics` - Cost, latency and error aggregation

pub mod analytics;
pub mod traces;

pub use analytics::{AnalyticsError, AnalyticsQuery, AnalyticsResult, AnalyticsService};
pub use traces::{
    IngestResult, SessionTraces, TraceList, TraceService, TraceServiceError, ValidationDetail,
};
