//! Multi-worker tests for the aggregation round and the full pipeline.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use dkmeans::{
    aggregate, collapse_cluster_list, distributed_k_means, generate_cluster_list,
    merge_cluster_lists, reassign, ClusterList, Communicator, LocalKMeans, Point, ProcessGroup,
    COORDINATOR,
};

fn p(x: f32, y: f32) -> Point {
    Point::new(x, y)
}

fn sort_key(point: &Point) -> (u32, u32) {
    (point.x.to_bits(), point.y.to_bits())
}

#[test]
fn aggregation_matches_the_combined_mean() {
    // Deliberately uneven memberships across three workers.
    let locals: Vec<ClusterList> = vec![
        vec![vec![p(0.0, 0.0), p(1.0, 0.0)], vec![p(4.0, 4.0)]],
        vec![vec![p(2.0, 2.0)], vec![]],
        vec![vec![], vec![p(6.0, 2.0), p(8.0, 6.0), p(10.0, 0.0)]],
    ];

    let group = ProcessGroup::new(3).unwrap();
    let results = group
        .run(|mut comm| {
            let local = locals[comm.rank()].clone();
            aggregate(&local, &mut comm, COORDINATOR)
        })
        .unwrap();

    // Cluster 0 holds (0,0),(1,0),(2,2); cluster 1 holds (4,4),(6,2),(8,6),(10,0).
    for centroids in &results {
        assert_eq!(centroids.len(), 2);
        assert!((centroids[0].x - 1.0).abs() < 1e-6);
        assert!((centroids[0].y - 2.0 / 3.0).abs() < 1e-6);
        assert!((centroids[1].x - 7.0).abs() < 1e-6);
        assert!((centroids[1].y - 3.0).abs() < 1e-6);
    }

    // Every worker holds the identical centroid set after the broadcast.
    assert_eq!(results[0], results[1]);
    assert_eq!(results[1], results[2]);
}

#[test]
fn distributed_aggregation_equals_single_process_aggregation() {
    // Integer-valued coordinates keep every f32 sum exact, so the two
    // paths must agree bit for bit despite different addition orders.
    let locals: Vec<ClusterList> = vec![
        vec![vec![p(0.0, 0.0), p(1.0, 0.0)], vec![p(4.0, 4.0)]],
        vec![vec![p(2.0, 2.0)], vec![]],
        vec![vec![], vec![p(6.0, 2.0), p(8.0, 6.0), p(10.0, 0.0)]],
    ];
    let combined = merge_cluster_lists(locals.clone());

    let single = ProcessGroup::new(1)
        .unwrap()
        .run(|mut comm| aggregate(&combined, &mut comm, COORDINATOR))
        .unwrap();
    let multi = ProcessGroup::new(3)
        .unwrap()
        .run(|mut comm| {
            let local = locals[comm.rank()].clone();
            aggregate(&local, &mut comm, COORDINATOR)
        })
        .unwrap();

    for centroids in &multi {
        assert_eq!(centroids, &single[0]);
    }
}

#[test]
fn globally_empty_clusters_survive_aggregation() {
    let locals: Vec<ClusterList> = vec![
        vec![vec![p(1.0, 1.0)], vec![]],
        vec![vec![p(3.0, 3.0)], vec![]],
    ];

    let group = ProcessGroup::new(2).unwrap();
    let results = group
        .run(|mut comm| {
            let local = locals[comm.rank()].clone();
            aggregate(&local, &mut comm, COORDINATOR)
        })
        .unwrap();

    for centroids in &results {
        assert_eq!(centroids[0], p(2.0, 2.0));
        // No members anywhere: the slot keeps the reduction's zero value.
        assert_eq!(centroids[1], p(0.0, 0.0));
    }
}

#[test]
fn single_worker_pipeline_matches_the_local_computation() {
    let points: Vec<Point> = (0..30)
        .map(|i| p((i % 6) as f32 * 0.2, (i / 6) as f32 * 0.15))
        .collect();
    let engine = LocalKMeans::new(3);

    let group = ProcessGroup::new(1).unwrap();
    let mut results = group
        .run(|mut comm| {
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            distributed_k_means(&points, &engine, &mut comm, &mut rng)
        })
        .unwrap();
    let distributed = results.remove(0);

    // Same seed, computed by hand: local fit, sum-then-divide with the
    // zero-count guard, one reassignment.
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let fit = engine.fit(&points, &mut rng).unwrap();
    let mut centroids = vec![Point::default(); 3];
    for (i, cluster) in fit.clusters.iter().enumerate() {
        if cluster.is_empty() {
            continue;
        }
        let mut sum = Point::default();
        for point in cluster {
            sum.x += point.x;
            sum.y += point.y;
        }
        let count = cluster.len() as f32;
        centroids[i] = p(sum.x / count, sum.y / count);
    }
    let expected = reassign(fit.clusters, &centroids);

    assert_eq!(distributed, expected);
}

#[test]
fn multi_worker_union_preserves_every_point() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let list = generate_cluster_list(p(0.0, 0.0), p(1.0, 1.0), 4, 25, &mut rng).unwrap();
    let points = collapse_cluster_list(list, &mut rng);
    let engine = LocalKMeans::new(4);

    // 100 points over 3 workers: slices of 34, 33 and 33.
    let group = ProcessGroup::new(3).unwrap();
    let results = group
        .run(|mut comm| {
            let mut rng = ChaCha8Rng::seed_from_u64(100 + comm.rank() as u64);
            distributed_k_means(&points, &engine, &mut comm, &mut rng)
        })
        .unwrap();

    let merged = merge_cluster_lists(results);
    let mut combined: Vec<Point> = merged.into_iter().flatten().collect();
    let mut original = points.clone();
    combined.sort_by_key(sort_key);
    original.sort_by_key(sort_key);
    assert_eq!(combined, original);
}

#[test]
fn well_separated_pairs_stay_together_across_workers() {
    let points = vec![p(0.0, 0.0), p(0.1, 0.1), p(10.0, 10.0), p(10.1, 9.9)];
    let engine = LocalKMeans::new(2);

    let group = ProcessGroup::new(2).unwrap();
    let results = group
        .run(|mut comm| {
            let mut rng = ChaCha8Rng::seed_from_u64(21 + comm.rank() as u64);
            distributed_k_means(&points, &engine, &mut comm, &mut rng)
        })
        .unwrap();

    let merged = merge_cluster_lists(results);
    assert_eq!(merged.iter().map(Vec::len).sum::<usize>(), 4);

    let near = [p(0.0, 0.0), p(0.1, 0.1)];
    let far = [p(10.0, 10.0), p(10.1, 9.9)];
    for cluster in merged.iter().filter(|cluster| !cluster.is_empty()) {
        let all_near = cluster.iter().all(|point| near.contains(point));
        let all_far = cluster.iter().all(|point| far.contains(point));
        assert!(all_near || all_far, "a cluster mixes the two pairs");
    }
}

#[test]
fn reassignment_against_global_centroids_is_idempotent() {
    let centroids = vec![p(0.0, 0.0), p(5.0, 5.0)];
    let clusters = vec![
        vec![p(4.9, 5.2), p(0.3, 0.1), p(6.0, 4.0)],
        vec![p(0.2, 0.2), p(5.5, 5.5)],
    ];

    let once = reassign(clusters, &centroids);
    let twice = reassign(once.clone(), &centroids);
    assert_eq!(once, twice);
}
