//! Descriptive statistics, insight checks and charts for a static
//! collaboration network given as a node table and an edge list.

pub mod centrality;
pub mod config;
pub mod error;
pub mod loader;
pub mod plot;
pub mod report;
pub mod schema;
pub mod stats;

pub use config::{EndpointPolicy, GraphArgs, NodeArgs, Paths};
pub use error::{AnalysisError, Result};
pub use loader::{load, read_edges, read_nodes, CollabGraph, NodeTable, SocialGraph};
pub use schema::{Column, Schema};
