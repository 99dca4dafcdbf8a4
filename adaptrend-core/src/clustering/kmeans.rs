//! One-dimensional k-means with deterministic restarts.
//!
//! Run 0 starts from evenly spaced quantiles of the sorted scores (for k = 3:
//! the 25th, 50th and 75th percentiles) or from caller-supplied centroids.
//! Runs 1.. start from `k` distinct scores drawn with a per-(bar, run) seeded
//! RNG. The run with the lowest inertia wins; ties keep the earlier run.
//!
//! Lloyd step: nearest centroid (ties → lowest index), member means, empty
//! clusters keep their centroid, stop once no centroid moves more than
//! `CONVERGENCE_EPSILON`.

use rand::seq::index::sample;
use tracing::debug;

use super::{Cluster, ClusterSet, ClusteringStrategy};
use crate::rng::SeedHierarchy;

const CONVERGENCE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct KMeans {
    max_iterations: usize,
    num_runs: usize,
    seeds: SeedHierarchy,
    initial_centroids: Option<Vec<f64>>,
}

impl KMeans {
    pub fn new(max_iterations: usize, num_runs: usize, master_seed: u64) -> Self {
        assert!(max_iterations >= 1, "k-means needs at least one iteration");
        assert!(num_runs >= 1, "k-means needs at least one run");
        Self {
            max_iterations,
            num_runs,
            seeds: SeedHierarchy::new(master_seed),
            initial_centroids: None,
        }
    }

    /// Start run 0 from these centroids instead of quantiles.
    ///
    /// Ignored for any call whose `k` differs from `centroids.len()`.
    pub fn with_initial_centroids(mut self, centroids: Vec<f64>) -> Self {
        self.initial_centroids = Some(centroids);
        self
    }

    pub fn num_runs(&self) -> usize {
        self.num_runs
    }

    /// Every restart's result, in run order. The kept result is the first
    /// one with minimal inertia.
    pub fn all_runs(&self, scores: &[f64], k: usize, bar_index: usize) -> Vec<ClusterSet> {
        if scores.len() < k || k == 0 {
            return vec![singletons(scores)];
        }
        (0..self.num_runs)
            .map(|run| {
                let init = self.initial_centroids_for(scores, k, bar_index, run);
                lloyd(scores, init, self.max_iterations, run)
            })
            .collect()
    }

    fn initial_centroids_for(&self, scores: &[f64], k: usize, bar_index: usize, run: usize) -> Vec<f64> {
        if run == 0 {
            match &self.initial_centroids {
                Some(seeds) if seeds.len() == k => return seeds.clone(),
                Some(seeds) => debug!(
                    supplied = seeds.len(),
                    k, "initial centroid count mismatch, using quantiles"
                ),
                None => {}
            }
            return quantile_centroids(scores, k);
        }
        let mut rng = self.seeds.rng_for(bar_index as u64, run as u64);
        sample(&mut rng, scores.len(), k)
            .into_iter()
            .map(|i| scores[i])
            .collect()
    }
}

impl ClusteringStrategy for KMeans {
    fn name(&self) -> &str {
        "kmeans"
    }

    fn cluster(&self, scores: &[f64], k: usize, bar_index: usize) -> ClusterSet {
        let mut best: Option<ClusterSet> = None;
        for candidate in self.all_runs(scores, k, bar_index) {
            match &best {
                Some(b) if candidate.inertia >= b.inertia => {}
                _ => best = Some(candidate),
            }
        }
        best.unwrap_or_else(|| singletons(scores))
    }
}

/// Evenly spaced quantiles of the sorted data, linearly interpolated.
pub fn quantile_centroids(scores: &[f64], k: usize) -> Vec<f64> {
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    let last = sorted.len().saturating_sub(1) as f64;

    (1..=k)
        .map(|j| {
            let pos = j as f64 / (k + 1) as f64 * last;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        })
        .collect()
}

/// Degenerate partition: one cluster per point.
fn singletons(scores: &[f64]) -> ClusterSet {
    let mut clusters: Vec<Cluster> = scores
        .iter()
        .enumerate()
        .map(|(i, &s)| Cluster {
            centroid: s,
            members: vec![i],
        })
        .collect();
    clusters.sort_by(|a, b| a.centroid.total_cmp(&b.centroid));
    ClusterSet {
        clusters,
        inertia: 0.0,
        iterations: 0,
        run: 0,
    }
}

fn nearest(centroids: &[f64], x: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, &centroid) in centroids.iter().enumerate() {
        let dist = (x - centroid).abs();
        if dist < best_dist {
            best = c;
            best_dist = dist;
        }
    }
    best
}

fn lloyd(scores: &[f64], mut centroids: Vec<f64>, max_iterations: usize, run: usize) -> ClusterSet {
    let k = centroids.len();
    let mut iterations = 0;

    for _ in 0..max_iterations {
        iterations += 1;
        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for &x in scores {
            let c = nearest(&centroids, x);
            sums[c] += x;
            counts[c] += 1;
        }

        let mut moved = false;
        for c in 0..k {
            if counts[c] == 0 {
                continue;
            }
            let updated = sums[c] / counts[c] as f64;
            if (updated - centroids[c]).abs() > CONVERGENCE_EPSILON {
                moved = true;
            }
            centroids[c] = updated;
        }

        if !moved {
            break;
        }
    }

    let mut members = vec![Vec::new(); k];
    let mut inertia = 0.0;
    for (i, &x) in scores.iter().enumerate() {
        let c = nearest(&centroids, x);
        members[c].push(i);
        inertia += (x - centroids[c]).powi(2);
    }

    let mut clusters: Vec<Cluster> = centroids
        .into_iter()
        .zip(members)
        .map(|(centroid, members)| Cluster { centroid, members })
        .collect();
    clusters.sort_by(|a, b| a.centroid.total_cmp(&b.centroid));

    ClusterSet {
        clusters,
        inertia,
        iterations,
        run,
    }
}
