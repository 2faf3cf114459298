use std::error::Error;

use clap::Parser;
use collabnet::config::{init_tracing, NodeArgs};
use collabnet::report::{ClusteringReport, ClusteringSummary};
use collabnet::{read_nodes, Schema};

/// Summarize the clustering-coefficient column of the node table.
#[derive(Debug, Parser)]
#[command(name = "clustering_check", version)]
struct Cli {
    #[command(flatten)]
    node: NodeArgs,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.node.verbose);

    let nodes = read_nodes(&cli.node.nodes, &Schema::clustering_check())?;
    let summary = ClusteringSummary::compute(&nodes)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", ClusteringReport(&summary));
    }
    Ok(())
}
