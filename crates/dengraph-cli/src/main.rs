//! `dengraph`: build a clustering from a CSV adjacency matrix, optionally replay an incremental
//! operations script against it, and print the resulting clusters and noise set.

use std::io::{IsTerminal, Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dengraph_core::{DenGraphIO, Graph, NodeEdges};
use dengraph_utils::stdio::{get_input_reader, get_output_writer};
use eyre::{Context, eyre};

/// Incrementally cluster a graph given as a CSV adjacency matrix.
///
/// Reads the §6 adjacency-matrix CSV wire format, runs the DenGraph engine over it, and
/// (optionally) replays a script of insert/remove operations before printing the final
/// clusters and noise set.
#[derive(Debug, Parser)]
#[clap(version, verbatim_doc_comment)]
struct Args {
    /// Logging level
    #[clap(long, default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,

    /// Input adjacency-matrix CSV (stdin if '-' or omitted)
    #[clap(short, long, global = true)]
    input: Option<PathBuf>,

    /// Treat the input matrix as symmetric, mirroring each edge on load
    #[clap(long, global = true)]
    symmetric: bool,

    /// ε: maximum distance between density-connected neighbours
    #[clap(short = 'e', long, default_value_t = 0.1)]
    cluster_distance: f64,

    /// η: minimum ε-neighbourhood size for a core node
    #[clap(short = 'n', long, default_value_t = 4)]
    core_neighbours: usize,

    /// Output file (stdout if '-' or omitted)
    #[clap(short, long, global = true)]
    output: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay a script of incremental operations, one per line, before printing results
    ///
    /// Script lines: `insert,<node>,<neighbour>:<weight>,...` or `remove,<node>`. A node with no
    /// neighbours given is inserted with [`NodeEdges::Ensure`].
    Apply {
        /// Script file (stdin if '-' or omitted)
        script: Option<PathBuf>,
    },
}

fn main() -> eyre::Result<()> {
    let use_color = std::io::stderr().is_terminal();
    if use_color {
        color_eyre::install()?;
    }

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(args.log_level.into())
        .with_env_var("DENGRAPH_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(use_color)
        .with_writer(std::io::stderr)
        .init();

    let is_stdio = |p: &PathBuf| p.as_os_str() == "-";
    let input_path = args.input.filter(|p| !is_stdio(p));
    let output_path = args.output.filter(|p| !is_stdio(p));

    let mut input = get_input_reader(&input_path)?;
    let graph = dengraph_csv::read_adjacency(&mut input, args.symmetric)
        .wrap_err("failed to read adjacency-matrix CSV")?;
    tracing::info!(
        nodes = graph.nodes().count(),
        "parsed adjacency graph"
    );

    let mut engine = DenGraphIO::new(graph, args.cluster_distance, args.core_neighbours)
        .map_err(|e| eyre!("{e}"))?;
    tracing::info!(
        clusters = engine.clusters().count(),
        noise = engine.noise().len(),
        "initial build complete"
    );

    if let Some(Command::Apply { script }) = args.command {
        let script_path = script.filter(|p| !is_stdio(p));
        let mut reader = get_input_reader(&script_path)?;
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        for (line_number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            apply_line(&mut engine, line)
                .wrap_err_with(|| format!("script line {}: {line:?}", line_number + 1))?;
        }
        tracing::info!(
            clusters = engine.clusters().count(),
            noise = engine.noise().len(),
            "script replay complete"
        );
    }

    let mut output = get_output_writer(&output_path)?;
    print_results(&engine, &mut output)
}

fn apply_line(
    engine: &mut DenGraphIO<String, dengraph_core::AdjacencyGraph<String>>,
    line: &str,
) -> eyre::Result<()> {
    let mut fields = line.split(',');
    let op = fields.next().ok_or_else(|| eyre!("missing operation"))?;
    match op {
        "remove" => {
            let node = fields.next().ok_or_else(|| eyre!("missing node"))?;
            engine.remove(&node.to_string()).map_err(|e| eyre!("{e}"))?;
        }
        "insert" => {
            let node = fields
                .next()
                .ok_or_else(|| eyre!("missing node"))?
                .to_string();
            let mut edges = indexmap::IndexMap::new();
            for field in fields {
                let (neighbour, weight) = field
                    .split_once(':')
                    .ok_or_else(|| eyre!("expected <neighbour>:<weight>, got {field:?}"))?;
                let weight: f64 = weight
                    .parse()
                    .wrap_err_with(|| format!("invalid weight {weight:?}"))?;
                edges.insert(neighbour.to_string(), weight);
            }
            let edges = if edges.is_empty() {
                NodeEdges::Ensure
            } else {
                NodeEdges::Edges(edges)
            };
            engine.insert(node, edges).map_err(|e| eyre!("{e}"))?;
        }
        other => return Err(eyre!("unknown operation {other:?}")),
    }
    Ok(())
}

fn print_results(
    engine: &DenGraphIO<String, dengraph_core::AdjacencyGraph<String>>,
    output: &mut dyn Write,
) -> eyre::Result<()> {
    for (index, cluster) in engine.clusters().enumerate() {
        let mut core: Vec<&String> = cluster.core().iter().collect();
        let mut border: Vec<&String> = cluster.border().iter().collect();
        core.sort();
        border.sort();
        writeln!(
            output,
            "cluster {index}: core={core:?} border={border:?}"
        )?;
    }
    let mut noise: Vec<&String> = engine.noise().iter().collect();
    noise.sort();
    writeln!(output, "noise: {noise:?}")?;
    Ok(())
}
