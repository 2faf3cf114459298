use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_NODES: &str = "DataNodes.csv";
pub const DEFAULT_EDGES: &str = "edges.csv";
pub const DEFAULT_OUT_DIR: &str = "plots";

/// What to do with an edge whose endpoint is not a node `Id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EndpointPolicy {
    /// Add the endpoint as a new vertex.
    #[default]
    Extend,
    /// Abort the load.
    Reject,
}

/// Input and output locations for one run.
#[derive(Debug, Clone)]
pub struct Paths {
    pub nodes: PathBuf,
    pub edges: PathBuf,
    pub out_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            nodes: PathBuf::from(DEFAULT_NODES),
            edges: PathBuf::from(DEFAULT_EDGES),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
        }
    }
}

impl Paths {
    /// All three paths resolved under `dir`, using the default file names.
    pub fn in_dir(dir: &Path) -> Self {
        Paths {
            nodes: dir.join(DEFAULT_NODES),
            edges: dir.join(DEFAULT_EDGES),
            out_dir: dir.join(DEFAULT_OUT_DIR),
        }
    }
}

/// Arguments of every binary: the node table and log verbosity.
#[derive(Debug, Args)]
pub struct NodeArgs {
    /// Node table (CSV, or Parquet by extension)
    #[arg(long, default_value = DEFAULT_NODES)]
    pub nodes: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Arguments of the binaries that also build the graph.
#[derive(Debug, Args)]
pub struct GraphArgs {
    #[command(flatten)]
    pub node: NodeArgs,

    /// Edge table; the first two columns are the endpoints
    #[arg(long, default_value = DEFAULT_EDGES)]
    pub edges: PathBuf,

    /// Handling of edge endpoints missing from the node table
    #[arg(long, value_enum, default_value_t = EndpointPolicy::Extend)]
    pub endpoints: EndpointPolicy,
}

impl GraphArgs {
    /// Input paths; the output directory keeps its default.
    pub fn paths(&self) -> Paths {
        Paths {
            nodes: self.node.nodes.clone(),
            edges: self.edges.clone(),
            ..Paths::default()
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
