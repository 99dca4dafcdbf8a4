//! Adaptive factor selection from one bar's clusters.

use tracing::debug;

use crate::clustering::ClusterSet;
use crate::config::TargetCluster;

/// Lower bound on a member's weight.
const MIN_WEIGHT: f64 = 1e-9;
/// Added to |performance| so all-zero clusters still weight evenly.
const WEIGHT_OFFSET: f64 = 1e-6;

/// Outcome of selecting a factor for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub factor: f64,
    /// Index of the chosen cluster in the centroid-sorted list.
    pub cluster_index: usize,
    /// Mean performance of the chosen cluster, normalised by the EMA of |Δclose|.
    pub performance_metric: f64,
}

/// Median of an ascending candidate list (lower median for even lengths).
pub fn median_candidate(factors: &[f64]) -> f64 {
    if factors.is_empty() {
        return f64::NAN;
    }
    factors[(factors.len() - 1) / 2]
}

/// Pick the target cluster and blend its members into one multiplier.
///
/// Members are weighted by `max(MIN_WEIGHT, |P| + WEIGHT_OFFSET)`. An empty
/// target cluster (or a zero total weight) falls back to the median
/// candidate with a zero performance metric.
pub fn select_factor(
    clusters: &ClusterSet,
    target: TargetCluster,
    factors: &[f64],
    scores: &[f64],
    normaliser: f64,
) -> Selection {
    let cluster_index = target.index(clusters.len());
    let members: &[usize] = clusters
        .clusters
        .get(cluster_index)
        .map(|c| c.members.as_slice())
        .unwrap_or(&[]);

    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    let mut perf_sum = 0.0;
    for &m in members {
        let w = (scores[m].abs() + WEIGHT_OFFSET).max(MIN_WEIGHT);
        weighted += w * factors[m];
        total_weight += w;
        perf_sum += scores[m];
    }

    if members.is_empty() || total_weight <= 0.0 {
        debug!(cluster_index, "target cluster has no weight, using median candidate");
        return Selection {
            factor: median_candidate(factors),
            cluster_index,
            performance_metric: 0.0,
        };
    }

    let mean_perf = perf_sum / members.len() as f64;
    let performance_metric = if normaliser > 0.0 {
        mean_perf / normaliser
    } else {
        0.0
    };

    Selection {
        factor: weighted / total_weight,
        cluster_index,
        performance_metric,
    }
}
