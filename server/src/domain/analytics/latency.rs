//! Latency distribution and percentiles
//!
//! Both work on latency values sorted ascending.

use serde::Serialize;

/// Bucket bounds in ms, lower inclusive. The last bucket is open-ended.
const BUCKETS: &[(i64, Option<i64>, &str)] = &[
    (0, Some(200), "0-200"),
    (200, Some(400), "200-400"),
    (400, Some(600), "400-600"),
    (600, Some(800), "600-800"),
    (800, Some(1000), "800-1000"),
    (1000, Some(1500), "1000-1500"),
    (1500, Some(2000), "1500-2000"),
    (2000, None, "2000+"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatencyBucket {
    pub bucket: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencyPercentiles {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Count values per fixed bucket. Every bucket is emitted, empty ones with 0.
pub fn distribution(values: &[i64]) -> Vec<LatencyBucket> {
    BUCKETS
        .iter()
        .map(|&(lower, upper, bucket)| {
            let count = values
                .iter()
                .filter(|&&v| v >= lower && upper.is_none_or(|u| v < u))
                .count() as u64;
            LatencyBucket { bucket, count }
        })
        .collect()
}

/// Continuous percentile with linear interpolation between closest ranks
pub fn percentile(sorted: &[i64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0] as f64,
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] as f64 + (sorted[upper] - sorted[lower]) as f64 * weight
        }
    }
}

pub fn percentiles(sorted: &[i64]) -> LatencyPercentiles {
    LatencyPercentiles {
        p50: percentile(sorted, 0.50),
        p95: percentile(sorted, 0.95),
        p99: percentile(sorted, 0.99),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_emits_all_buckets() {
        let buckets = distribution(&[]);
        assert_eq!(buckets.len(), 8);
        assert!(buckets.iter().all(|b| b.count == 0));
        assert_eq!(buckets[7].bucket, "2000+");
    }

    #[test]
    fn test_distribution_lower_bound_inclusive() {
        let buckets = distribution(&[0, 199, 200, 1000, 1999, 2000, 50_000]);
        let counts: Vec<u64> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, [2, 1, 0, 0, 0, 1, 1, 2]);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [100, 200, 300, 400];
        assert_eq!(percentile(&values, 0.5), 250.0);
        assert_eq!(percentile(&values, 0.0), 100.0);
        assert_eq!(percentile(&values, 1.0), 400.0);

        let hundred: Vec<i64> = (1..=100).collect();
        let p = percentiles(&hundred);
        assert!((p.p95 - 95.05).abs() < 1e-9);
        assert!((p.p99 - 99.01).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_small_inputs() {
        assert_eq!(percentiles(&[]), LatencyPercentiles::default());
        assert_eq!(percentile(&[42], 0.99), 42.0);
    }
}
