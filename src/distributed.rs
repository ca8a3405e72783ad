//! Reconciliation of per-worker clusterings into one global result.
//!
//! Each worker clusters its own partition independently, then the group
//! runs a single aggregation round: per-cluster coordinate sums and
//! member counts reduce to the coordinator, the coordinator averages
//! them, and the resulting global centroids broadcast back out. A final
//! reassignment against those frozen centroids produces each worker's
//! share of the global clustering.

use rand::Rng;
use tracing::debug;

use crate::cluster::ClusterList;
use crate::comm::Communicator;
use crate::engine::{reassign, LocalKMeans};
use crate::error::{Error, Result};
use crate::partition::partition_range;
use crate::point::Point;

/// Rank that materializes the reduced totals and sources the broadcast.
pub const COORDINATOR: usize = 0;

/// Merges every worker's per-cluster sums and counts into a single
/// authoritative centroid set, identical on every worker afterwards.
///
/// Workers exchange coordinate sums and member counts rather than local
/// averages: an average of per-worker averages is not the global mean
/// when partitions differ in size. Cluster indices with no members on
/// any worker keep the zero value left by the reduction. This is the
/// group's only rendezvous; no worker returns until all have contributed.
pub fn aggregate<C>(local: &ClusterList, comm: &mut C, root: usize) -> Result<Vec<Point>>
where
    C: Communicator + ?Sized,
{
    let k = local.len();
    let mut sums = vec![0.0f32; k * 2];
    let mut counts = vec![0u64; k];
    for (i, cluster) in local.iter().enumerate() {
        for point in cluster {
            sums[i * 2] += point.x;
            sums[i * 2 + 1] += point.y;
        }
        counts[i] = cluster.len() as u64;
    }

    let reduced_sums = comm.reduce_sum_f32(&sums, root)?;
    let reduced_counts = comm.reduce_sum_u64(&counts, root)?;

    let flat = if comm.rank() == root {
        let mut sums = reduced_sums.ok_or(Error::CollectiveMismatch("aggregate"))?;
        let counts = reduced_counts.ok_or(Error::CollectiveMismatch("aggregate"))?;
        for (i, &count) in counts.iter().enumerate() {
            if count > 0 {
                sums[i * 2] /= count as f32;
                sums[i * 2 + 1] /= count as f32;
            }
        }
        comm.broadcast_f32(Some(sums), root)?
    } else {
        comm.broadcast_f32(None, root)?
    };

    Ok(flat
        .chunks_exact(2)
        .map(|xy| Point::new(xy[0], xy[1]))
        .collect())
}

/// Per-worker entry point for one distributed clustering pass.
///
/// Every worker calls this with the identical full point sequence; the
/// partitioner decides which contiguous slice this rank owns. The local
/// fit only feeds the aggregation round — membership is decided afresh
/// by the final reassignment against the global centroids, which are
/// never recentered again. The union of all workers' returned lists,
/// taken index-wise, is the complete clustering.
pub fn distributed_k_means<C, R>(
    points: &[Point],
    engine: &LocalKMeans,
    comm: &mut C,
    rng: &mut R,
) -> Result<ClusterList>
where
    C: Communicator + ?Sized,
    R: Rng,
{
    let local = &points[partition_range(points.len(), comm.size(), comm.rank())];

    let fit = engine.fit(local, rng)?;
    debug!(
        rank = comm.rank(),
        points = local.len(),
        iterations = fit.iterations,
        converged = fit.converged,
        "local clustering finished"
    );

    let centroids = aggregate(&fit.clusters, comm, COORDINATOR)?;

    Ok(reassign(fit.clusters, &centroids))
}
