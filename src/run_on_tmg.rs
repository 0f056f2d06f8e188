use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wedge_sssp::{parallel, serial, tmg, Graph, Solution, SolveConfig, VertexId};

#[derive(Parser, Debug)]
#[command(name = "tmg")]
#[command(about = "Load a TMG road graph, run the parallel SSP from a named vertex and report its error against exact Dijkstra.", long_about = None)]
struct Cli {
    /// Path to the .tmg file
    #[arg(short, long)]
    graph: PathBuf,

    /// Name of the source vertex
    #[arg(short, long)]
    source: String,

    /// Print the route from the source to this vertex
    #[arg(short, long)]
    dest: Option<String>,

    /// Number of wedges (worker threads)
    #[arg(short, long, default_value_t = 4)]
    wedges: usize,

    /// Meters a wedge may run ahead of its slower neighbor
    #[arg(short, long, default_value_t = 0.0)]
    elasticity: f64,

    /// Number of timed parallel runs.
    #[arg(short, long, default_value_t = 1)]
    num_runs: usize,

    /// Abort a parallel run after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

fn print_route(graph: &Graph, solution: &Solution, dest: VertexId) {
    let Some(path) = solution.path_to(graph, dest) else {
        println!("{} is unreachable", graph.vertex(dest).name);
        return;
    };
    let mut total = 0.0;
    println!("{:>12}  {}", "0.00", graph.vertex(solution.source()).name);
    for e in path {
        let edge = graph.edge(e);
        total += edge.weight;
        println!(
            "{:>12.2}  {} via {}",
            total,
            graph.vertex(edge.end).name,
            edge.name
        );
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

    let graph = tmg::load(&cli.graph).with_context(|| format!("loading {}", cli.graph.display()))?;
    let src_idx = graph.resolve(&cli.source)?;
    let dest_idx = cli.dest.as_deref().map(|d| graph.resolve(d)).transpose()?;

    let now = Instant::now();
    let exact = serial::shortest_paths(&graph, src_idx)?;
    let serial_millis = now.elapsed().as_secs_f64() * 1000.0;
    info!(serial_millis, solved = exact.len(), "exact baseline ready");

    let mut duration_millis = Vec::with_capacity(cli.num_runs);
    let mut last = None;
    for run in 0..cli.num_runs {
        let solve = parallel::shortest_paths(&graph, src_idx, &config)
            .with_context(|| format!("parallel run {}", run))?;
        duration_millis.push(solve.elapsed.as_secs_f64() * 1000.0);
        let cmp = solve.solution.compare(&exact);
        println!(
            "run {}: max error {:.3} m ({:.4}%), mean error {:.4}%, missing {}",
            run,
            cmp.max_abs_error,
            cmp.max_rel_error * 100.0,
            cmp.mean_rel_error * 100.0,
            cmp.missing
        );
        last = Some(solve);
    }
    println!("serial: {:.3} ms", serial_millis);
    println!("parallel: {:?}", duration_millis);

    if let Some(solve) = &last {
        for stats in &solve.workers {
            info!(
                wedge = stats.wedge,
                accepted = stats.accepted,
                handoffs = stats.handoffs,
                waits = stats.waits,
                "wedge stats"
            );
        }
    }
    if let Some(dest) = dest_idx {
        // With zero runs there is only the exact route to show.
        let solution = last.as_ref().map_or(&exact, |solve| &solve.solution);
        print_route(&graph, solution, dest);
    }

    Ok(())
}
