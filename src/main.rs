use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use wedge_sssp::{osm, parallel, serial, Graph, Solution, SolveConfig, VertexId};

#[derive(Parser, Debug)]
#[command(name = "osm")]
#[command(about = "Build a graph from an OSM .pbf and run an SSP algorithm from a source node id.", long_about = None)]
struct Cli {
    /// Path to the .osm.pbf file
    #[arg(short, long)]
    pbf: PathBuf,

    /// Source node id to run SSP from
    #[arg(short, long)]
    source: i64,

    #[arg(short, long, value_enum, default_value_t = SspAlgorithm::Parallel)]
    algorithm: SspAlgorithm,

    /// Number of wedges (worker threads) for the parallel algorithm
    #[arg(short, long, default_value_t = 4)]
    wedges: usize,

    /// Meters a wedge may run ahead of its slower neighbor
    #[arg(short, long, default_value_t = 0.0)]
    elasticity: f64,

    /// Abort the parallel solve after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Output CSV (vertex, name, distance_m). If omitted, prints a summary to stdout.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Include unreachable nodes in output with infinite distance
    #[arg(long, default_value_t = false)]
    include_unreachable: bool,

    /// Only include 'highway' ways (recommended). If false, attempts to include all linear ways.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    only_highways: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SspAlgorithm {
    Parallel,
    Serial,
}

impl SspAlgorithm {
    fn run(&self, graph: &Graph, start: VertexId, config: &SolveConfig) -> Result<Solution> {
        match self {
            SspAlgorithm::Parallel => Ok(parallel::shortest_paths(graph, start, config)?.solution),
            SspAlgorithm::Serial => Ok(serial::shortest_paths(graph, start)?),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = SolveConfig::new(cli.wedges, cli.elasticity);
    if let Some(ms) = cli.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }
    config.validate()?;

    let graph = osm::load(&cli.pbf, cli.only_highways)
        .with_context(|| format!("loading {}", cli.pbf.display()))?;
    println!(
        "Graph: {} nodes, {} directed edges",
        graph.vertex_count(),
        graph.edge_count()
    );

    let src_idx = graph
        .resolve(&osm::vertex_name(cli.source))
        .with_context(|| format!("source node {} is not on a routable way", cli.source))?;

    let now = Instant::now();
    let solution = cli.algorithm.run(&graph, src_idx, &config)?;
    println!("{} s", now.elapsed().as_secs_f64());

    if let Some(out_path) = cli.out {
        let file = File::create(&out_path)
            .with_context(|| format!("creating CSV {}", out_path.display()))?;
        let rows = solution.write_csv(&graph, file, cli.include_unreachable)?;
        println!("Wrote distances for {} nodes to {}", rows, out_path.display());
    } else {
        println!("Nodes: {}", graph.vertex_count());
        println!("Reachable from {}: {}", cli.source, solution.len());
        if let Some(maxd) = solution.solved().map(|r| r.distance).reduce(f64::max) {
            println!("Max finite distance (m): {:.2}", maxd);
        }
    }

    Ok(())
}
