//! Analytics aggregation engine
//!
//! - `service` - Concurrent sub-aggregates combined into one result
//! - `latency` - Fixed-bucket distribution and interpolated percentiles

mod latency;
mod service;

pub use latency::{LatencyBucket, LatencyPercentiles};
pub use service::{
    AnalyticsError, AnalyticsQuery, AnalyticsResult, AnalyticsService, ComputedMetrics,
    TokenTotals,
};
