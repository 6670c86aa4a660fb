use crate::resolver::ResolvedMetric;
use std::cmp::Ordering;

/// Orders metrics by TVL, highest first. The sort is stable: chains with equal TVL
/// keep their registry order.
pub fn rank_by_tvl(metrics: &mut [ResolvedMetric]) {
    metrics.sort_by(|a, b| b.tvl.partial_cmp(&a.tvl).unwrap_or(Ordering::Equal));
}
