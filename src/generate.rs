//! Synthetic point-cloud generation for demo and test input.

use std::f32::consts::TAU;

use rand::distributions::Uniform;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::cluster::{Cluster, ClusterList};
use crate::error::{Error, Result};
use crate::point::Point;

/// Generates `count` points scattered around `center` with a normal
/// radial spread of `spread`.
pub fn generate_cluster<R: Rng>(
    center: Point,
    count: usize,
    spread: f32,
    rng: &mut R,
) -> Result<Cluster> {
    let angle = Uniform::new(0.0f32, TAU);
    let radial = Normal::new(0.0f32, spread).map_err(|_| Error::InvalidSpread)?;

    let mut result = Cluster::with_capacity(count);
    for _ in 0..count {
        let theta = rng.sample(angle);
        let r = radial.sample(rng);
        result.push(Point::new(
            center.x + theta.cos() * r,
            center.y + theta.sin() * r,
        ));
    }
    Ok(result)
}

/// Generates `cluster_count` clusters inside the given bounds, each with
/// `points_per_cluster` members. Centers are uniform within the bounds
/// and spreads shrink as the cluster count grows, so neighboring
/// clusters stay distinguishable.
pub fn generate_cluster_list<R: Rng>(
    lower: Point,
    upper: Point,
    cluster_count: usize,
    points_per_cluster: usize,
    rng: &mut R,
) -> Result<ClusterList> {
    let width = upper.x - lower.x;
    let height = upper.y - lower.y;
    let area = width * height;

    let mut result = ClusterList::with_capacity(cluster_count);
    for _ in 0..cluster_count {
        let center = Point::new(
            lower.x + rng.gen::<f32>() * width,
            lower.y + rng.gen::<f32>() * height,
        );
        let spread = (rng.gen::<f32>() * 0.7 + 0.3) * area.sqrt() / cluster_count as f32 / 4.0;
        result.push(generate_cluster(center, points_per_cluster, spread, rng)?);
    }
    Ok(result)
}

/// Flattens a cluster list into a single shuffled point sequence.
pub fn collapse_cluster_list<R: Rng>(list: ClusterList, rng: &mut R) -> Cluster {
    let mut result: Cluster = list.into_iter().flatten().collect();
    result.shuffle(rng);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn generates_the_requested_point_counts() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let list = generate_cluster_list(
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            4,
            25,
            &mut rng,
        )
        .unwrap();
        assert_eq!(list.len(), 4);
        assert!(list.iter().all(|cluster| cluster.len() == 25));
    }

    #[test]
    fn zero_spread_pins_points_to_the_center() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let center = Point::new(0.4, 0.6);
        let cluster = generate_cluster(center, 8, 0.0, &mut rng).unwrap();
        assert!(cluster.iter().all(|&point| point == center));
    }

    #[test]
    fn negative_spread_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let result = generate_cluster(Point::new(0.0, 0.0), 1, -0.1, &mut rng);
        assert!(matches!(result, Err(Error::InvalidSpread)));
    }

    #[test]
    fn collapse_preserves_the_point_multiset() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let list = generate_cluster_list(
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            3,
            10,
            &mut rng,
        )
        .unwrap();

        let mut expected: Cluster = list.iter().flatten().copied().collect();
        let mut collapsed = collapse_cluster_list(list, &mut rng);

        let key = |point: &Point| (point.x.to_bits(), point.y.to_bits());
        expected.sort_by_key(key);
        collapsed.sort_by_key(key);
        assert_eq!(collapsed, expected);
    }
}
