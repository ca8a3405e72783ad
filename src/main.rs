use std::num::NonZeroUsize;
use std::process::exit;
use std::thread;
use std::time::Instant;

use anyhow::bail;
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dkmeans::{
    collapse_cluster_list, display_clusters, distributed_k_means, generate_cluster_list,
    merge_cluster_lists, Communicator, LocalKMeans, Point, ProcessGroup,
};

/// Canvas scale used for `--display` renders.
const DISPLAY_SCALE: f32 = 40.0;

/// Distributed k-means over a synthetic 2D point cloud.
#[derive(Parser, Debug)]
#[command(name = "dkmeans")]
struct Cli {
    /// Number of clusters to generate and to fit.
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    clusters: u64,

    /// Number of points generated per cluster.
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    points: u64,

    /// Worker count; normally supplied by the surrounding runtime.
    #[arg(long, env = "DKMEANS_WORKERS")]
    workers: Option<usize>,

    /// Base RNG seed; per-worker seeds derive from it.
    #[arg(long, env = "DKMEANS_SEED")]
    seed: Option<u64>,

    /// Render the generated input and the clustered result.
    #[arg(long)]
    display: bool,
}

fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            exit(if err.use_stderr() { 1 } else { 0 });
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = parse_cli();

    // Keep stdout clean for the timing figure.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let workers = match cli.workers {
        Some(0) => bail!("worker count must be at least 1"),
        Some(workers) => workers,
        None => thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1),
    };
    let seed = cli.seed.unwrap_or_else(rand::random);
    let k = cli.clusters as usize;
    let points_per_cluster = cli.points as usize;

    info!(k, points_per_cluster, workers, seed, "generating input");
    let lower = Point::new(0.0, 0.0);
    let upper = Point::new(1.0, 1.0);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let generated = generate_cluster_list(lower, upper, k, points_per_cluster, &mut rng)?;
    if cli.display {
        display_clusters(&generated, lower, upper, DISPLAY_SCALE, true);
    }
    let points = collapse_cluster_list(generated, &mut rng);

    let engine = LocalKMeans::new(k);
    let group = ProcessGroup::new(workers)?;
    let results = group.run(|mut comm| {
        // Rank-distinct streams, none equal to the generator's.
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(comm.rank() as u64 + 1));
        comm.barrier()?;
        let started = Instant::now();
        let clusters = distributed_k_means(&points, &engine, &mut comm, &mut rng)?;
        comm.barrier()?;
        Ok((clusters, started.elapsed()))
    })?;

    if let Some((_, elapsed)) = results.first() {
        println!("{:.4}", elapsed.as_secs_f64());
    }

    if cli.display {
        let merged = merge_cluster_lists(results.into_iter().map(|(clusters, _)| clusters));
        display_clusters(&merged, lower, upper, DISPLAY_SCALE, true);
    }

    Ok(())
}
