//! Local k-means over one worker's slice of the data.
//!
//! Everything here runs inside a single worker's memory. The distributed
//! layer treats the local result as a heuristic: only the per-cluster sums
//! it feeds into the aggregation round survive, and membership is decided
//! afresh during the final reassignment.

use rand::distributions::Uniform;
use rand::Rng;
use rayon::prelude::*;

use crate::cluster::{Cluster, ClusterList};
use crate::error::{Error, Result};
use crate::point::{distance, Point};

/// Default bound on assign/recenter rounds before giving up on convergence.
pub const DEFAULT_MAX_ITERS: usize = 50;

/// Iterated assign/recenter clustering of a point slice.
pub struct LocalKMeans {
    /// Number of clusters to fit.
    pub k: usize,
    /// Iteration cap; the engine stops here even without convergence.
    pub max_iters: usize,
}

/// Outcome of a local run, including which termination path was taken.
pub struct LocalFit {
    pub clusters: ClusterList,
    pub centroids: Vec<Point>,
    pub iterations: usize,
    pub converged: bool,
}

impl LocalKMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iters: DEFAULT_MAX_ITERS,
        }
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Fits `k` clusters to `points`, drawing initial centroids from `rng`.
    ///
    /// Centroids start uniformly distributed over the unit square and need
    /// not coincide with input points. Iteration stops once every centroid
    /// reproduces itself exactly or the cap is reached. An empty input
    /// yields `k` empty clusters.
    pub fn fit<R: Rng>(&self, points: &[Point], rng: &mut R) -> Result<LocalFit> {
        if self.k == 0 {
            return Err(Error::InvalidClusterCount);
        }

        let unit = Uniform::new(0.0f32, 1.0);
        let mut centroids: Vec<Point> = (0..self.k)
            .map(|_| Point::new(rng.sample(unit), rng.sample(unit)))
            .collect();

        // All points start in cluster 0; the first assign pass moves them
        // to their nearest initial centroid.
        let mut clusters: ClusterList = vec![Cluster::new(); self.k];
        clusters[0] = points.to_vec();

        let mut iterations = 0;
        let mut converged = false;
        while !converged && iterations < self.max_iters {
            clusters = reassign(clusters, &centroids);
            converged = recenter(&clusters, &mut centroids);
            iterations += 1;
        }

        Ok(LocalFit {
            clusters,
            centroids,
            iterations,
            converged,
        })
    }
}

/// Index of the centroid nearest to `point`.
///
/// Centroids are scanned in index order and only a strictly smaller
/// distance replaces the current best, so exact ties resolve to the
/// lowest index.
pub fn nearest_centroid(point: Point, centroids: &[Point]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (i, &centroid) in centroids.iter().enumerate() {
        let dist = distance(point, centroid);
        if dist < best_distance {
            best = i;
            best_distance = dist;
        }
    }
    best
}

/// Rebuilds the cluster list by moving every point to its nearest
/// centroid. Prior membership is discarded; only raw coordinates matter.
pub fn reassign(clusters: ClusterList, centroids: &[Point]) -> ClusterList {
    let points: Vec<Point> = clusters.into_iter().flatten().collect();
    let labels: Vec<usize> = points
        .par_iter()
        .map(|&point| nearest_centroid(point, centroids))
        .collect();

    let mut result: ClusterList = vec![Cluster::new(); centroids.len()];
    for (point, label) in points.into_iter().zip(labels) {
        result[label].push(point);
    }
    result
}

/// Recomputes each centroid as the arithmetic mean of its members.
///
/// Clusters with no members keep their previous centroid and trivially
/// count as unchanged. Returns true when every recomputed centroid is
/// bit-for-bit equal to its previous value; convergence is exact `f32`
/// equality, not an epsilon test.
pub fn recenter(clusters: &[Cluster], centroids: &mut [Point]) -> bool {
    let mut converged = true;
    for (cluster, centroid) in clusters.iter().zip(centroids.iter_mut()) {
        if cluster.is_empty() {
            continue;
        }

        let mut avg = Point::default();
        for point in cluster {
            avg.x += point.x;
            avg.y += point.y;
        }
        let size = cluster.len() as f32;
        avg.x /= size;
        avg.y /= size;

        if avg != *centroid {
            converged = false;
        }
        *centroid = avg;
    }
    converged
}
