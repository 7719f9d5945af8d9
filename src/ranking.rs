//! Leaderboard computations over a snapshot of metric records.
//!
//! Ordering is total: metric value descending, then `user_github` ascending,
//! then `email` ascending, so equal scores always come back in the same order.
//! Counters are finite by construction, so `f64::total_cmp` agrees with the
//! numeric order.

use std::cmp::Ordering;

use crate::contracts::{CombinedRankEntry, Metric, MetricRecord, RankEntry, UserRank};

/// Fixed page size of the `/rank-<metric>` endpoints.
pub const LEADERBOARD_SIZE: usize = 10;

fn by_metric_desc(metric: Metric, a: &MetricRecord, b: &MetricRecord) -> Ordering {
    metric
        .value_of(b)
        .total_cmp(&metric.value_of(a))
        .then_with(|| a.user_github.cmp(&b.user_github))
        .then_with(|| a.email.cmp(&b.email))
}

/// Returns the `limit` highest records for `metric`, projected to
/// `{user_github, value}`.
pub fn top_n(records: &[MetricRecord], metric: Metric, limit: usize) -> Vec<RankEntry> {
    let mut sorted: Vec<&MetricRecord> = records.iter().collect();
    sorted.sort_by(|a, b| by_metric_desc(metric, a, b));

    sorted
        .into_iter()
        .take(limit)
        .map(|r| RankEntry {
            user_github: r.user_github.clone(),
            metric,
            value: metric.value_of(r),
        })
        .collect()
}

/// Competition rank of a value: one more than the number of records that
/// score strictly higher.
pub fn competition_rank(records: &[MetricRecord], metric: Metric, value: f64) -> u64 {
    let higher = records
        .iter()
        .filter(|r| metric.value_of(r) > value)
        .count();
    higher as u64 + 1
}

/// Ranks every record owned by `user_github`.
///
/// A user may have submitted under several emails, so more than one entry can
/// come back; they are ordered best first. Unknown users yield an empty list.
pub fn user_rank(records: &[MetricRecord], metric: Metric, user_github: &str) -> Vec<UserRank> {
    let mut owned: Vec<&MetricRecord> = records
        .iter()
        .filter(|r| r.user_github == user_github)
        .collect();
    owned.sort_by(|a, b| by_metric_desc(metric, a, b));

    owned
        .into_iter()
        .map(|r| {
            let value = metric.value_of(r);
            UserRank {
                user_github: r.user_github.clone(),
                metric,
                rank: competition_rank(records, metric, value),
                value,
            }
        })
        .collect()
}

/// All records sorted by clicks, then distance, both descending.
pub fn combined(records: &[MetricRecord]) -> Vec<CombinedRankEntry> {
    let mut sorted: Vec<&MetricRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        b.quant_clicks
            .total_cmp(&a.quant_clicks)
            .then_with(|| b.quant_dist.total_cmp(&a.quant_dist))
            .then_with(|| a.user_github.cmp(&b.user_github))
    });

    sorted
        .into_iter()
        .map(|r| CombinedRankEntry {
            user_github: r.user_github.clone(),
            quant_clicks: r.quant_clicks,
            quant_dist: r.quant_dist,
        })
        .collect()
}
