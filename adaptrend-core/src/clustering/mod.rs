//! Clustering of per-candidate performance scores.
//!
//! The engine clusters the score vector of every bar independently. The
//! algorithm sits behind `ClusteringStrategy` so an online or incremental
//! method can replace k-means without touching the selector or assembler.
//!
//! # Ordering contract
//! Every `ClusterSet` lists its clusters ascending by centroid: index 0 holds
//! the worst performers, index `k - 1` the best. Consumers index into the
//! list by rank, so implementations must sort before returning.

pub mod kmeans;

pub use kmeans::KMeans;

use serde::{Deserialize, Serialize};

/// One group of candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub centroid: f64,
    /// Candidate indices, ascending. May be empty.
    pub members: Vec<usize>,
}

/// Partition of one bar's scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSet {
    /// Sorted ascending by centroid.
    pub clusters: Vec<Cluster>,
    /// Sum of squared distances from each score to its cluster centroid.
    pub inertia: f64,
    /// Lloyd iterations performed by the kept run.
    pub iterations: usize,
    /// Index of the kept restart.
    pub run: usize,
}

impl ClusterSet {
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn centroids(&self) -> Vec<f64> {
        self.clusters.iter().map(|c| c.centroid).collect()
    }

    /// True when centroids are non-decreasing.
    pub fn is_sorted(&self) -> bool {
        self.clusters
            .windows(2)
            .all(|w| w[0].centroid <= w[1].centroid)
    }
}

/// Strategy interface for partitioning one bar's score vector.
///
/// `bar_index` lets implementations derive deterministic per-bar randomness;
/// the result must depend only on `(scores, k, bar_index)` and the
/// strategy's own configuration.
pub trait ClusteringStrategy: Send + Sync {
    /// Human-readable name (e.g., "kmeans").
    fn name(&self) -> &str;

    /// Partition `scores` into at most `k` clusters, sorted ascending by centroid.
    fn cluster(&self, scores: &[f64], k: usize, bar_index: usize) -> ClusterSet;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_set_sortedness() {
        let set = ClusterSet {
            clusters: vec![
                Cluster {
                    centroid: -1.0,
                    members: vec![0],
                },
                Cluster {
                    centroid: 2.0,
                    members: vec![1, 2],
                },
            ],
            inertia: 0.5,
            iterations: 3,
            run: 0,
        };
        assert!(set.is_sorted());
        assert_eq!(set.centroids(), vec![-1.0, 2.0]);
        assert_eq!(set.len(), 2);
    }
}
