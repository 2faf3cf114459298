use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use collabnet::config::{init_tracing, GraphArgs, DEFAULT_OUT_DIR};
use collabnet::plot::generate_plots;
use collabnet::{load, Paths, Schema};

/// Render the chart set for the collaboration network.
#[derive(Debug, Parser)]
#[command(name = "analyze_collabnet", version)]
struct Cli {
    #[command(flatten)]
    graph: GraphArgs,

    /// Directory charts are written to
    #[arg(long, default_value = DEFAULT_OUT_DIR)]
    out_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.graph.node.verbose);

    let paths = Paths {
        out_dir: cli.out_dir.clone(),
        ..cli.graph.paths()
    };
    let (nodes, graph) = load(&paths, &Schema::plots(), cli.graph.endpoints)?;
    generate_plots(&nodes, &graph, &paths.out_dir)?;

    println!("All plots saved under '{}/'.", paths.out_dir.display());
    Ok(())
}
