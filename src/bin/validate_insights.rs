use std::error::Error;

use clap::Parser;
use collabnet::config::{init_tracing, GraphArgs};
use collabnet::report::run_insights;
use collabnet::{load, Schema};

/// Check the claimed structural insights against the data.
#[derive(Debug, Parser)]
#[command(name = "validate_insights", version)]
struct Cli {
    #[command(flatten)]
    graph: GraphArgs,

    /// Print all results as one JSON array instead of text sections
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.graph.node.verbose);

    let (nodes, graph) = load(&cli.graph.paths(), &Schema::insights(), cli.graph.endpoints)?;

    let mut first = true;
    let insights = run_insights(&nodes, &graph, |insight| {
        if cli.json {
            return;
        }
        if !first {
            println!();
        }
        first = false;
        println!("{insight}");
    })?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&insights)?);
    }
    Ok(())
}
