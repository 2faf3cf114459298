//! Chart generation for the collaboration network.
//!
//! Everything is rasterized in-crate and written as PNG: a small bitmap
//! font, a clipped RGB canvas, a handful of chart shapes and a
//! force-directed layout for the subgraph drawing.

mod canvas;
mod chart;
mod font;
mod layout;
mod png;

use std::fs;
use std::path::{Path, PathBuf};

use petgraph::visit::EdgeRef;
use tracing::{info, warn};

use crate::error::{AnalysisError, Result};
use crate::loader::{CollabGraph, NodeTable};
use crate::schema::Column;
use crate::stats;

pub use canvas::{Canvas, Rgb};
pub use chart::{Axis, Labels, Scale};
pub use layout::{circular_layout, spring_layout};

pub const BINS: usize = 50;
pub const TOP_DEGREE: usize = 100;

/// Metrics compared in the correlation matrix, in display order.
pub const CORRELATED: [Column; 8] = [
    Column::Followers,
    Column::Popularity,
    Column::Degree,
    Column::PageRank,
    Column::Clustering,
    Column::Triangles,
    Column::Eigencentrality,
    Column::Betweenness,
];

/// Write every chart into `out_dir`, creating it if needed, and return the
/// files written in order. Existing files with the same names are replaced.
pub fn generate_plots(nodes: &NodeTable, graph: &CollabGraph, out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir).map_err(|e| AnalysisError::io(out_dir, e))?;
    let mut written = Vec::new();
    let mut target = |name: &str| {
        let path = out_dir.join(name);
        written.push(path.clone());
        path
    };

    let linear = (Scale::Linear, Scale::Linear);

    hist(
        nodes,
        Column::Degree,
        &target("degree_distribution.png"),
        &labels("Degree Distribution", "Degree", "Count"),
    )?;
    hist(
        nodes,
        Column::PageRank,
        &target("pagerank_distribution.png"),
        &labels("PageRank Distribution", "PageRank", "Count"),
    )?;
    scatter(
        nodes,
        (Column::Degree, Column::PageRank),
        linear,
        &target("degree_vs_pagerank.png"),
        &labels("Degree vs. PageRank", "Degree", "PageRank"),
    )?;
    scatter(
        nodes,
        (Column::Followers, Column::Degree),
        (Scale::Log, Scale::Log),
        &target("followers_vs_degree.png"),
        &labels("Followers vs. Degree (log–log)", "Followers", "Degree"),
    )?;
    hist(
        nodes,
        Column::Clustering,
        &target("clustering_distribution.png"),
        &labels(
            "Clustering Coefficient Distribution",
            "Clustering Coefficient",
            "Count",
        ),
    )?;
    correlation_matrix(nodes, &target("correlation_matrix.png"))?;

    let groups = [
        ("Degree", stats::present(nodes.numeric(Column::Degree)?)),
        ("PageRank", stats::present(nodes.numeric(Column::PageRank)?)),
        ("Clustering", stats::present(nodes.numeric(Column::Clustering)?)),
    ];
    chart::boxplot(
        &target("centrality_boxplot.png"),
        &groups,
        &labels("Boxplot of Degree, PageRank & Clustering", "", "Value"),
    )?;

    scatter(
        nodes,
        (Column::Degree, Column::Triangles),
        linear,
        &target("triangles_vs_degree.png"),
        &labels("Triangles vs. Degree", "Degree", "Triangle Count"),
    )?;
    scatter(
        nodes,
        (Column::Betweenness, Column::Closeness),
        linear,
        &target("betweenness_vs_closeness.png"),
        &labels(
            "Betweenness vs. Closeness Centrality",
            "Betweenness",
            "Closeness",
        ),
    )?;

    // one sample per community: its member count
    let sizes: Vec<f64> = stats::value_counts(nodes.text(Column::ModularityClass)?)
        .into_iter()
        .map(|(_, size)| size as f64)
        .collect();
    chart::histogram(
        &target("community_size_distribution.png"),
        &sizes,
        BINS,
        &labels(
            "Community Size Distribution",
            "Nodes per Community",
            "Number of Communities",
        ),
    )?;

    hist(
        nodes,
        Column::Eccentricity,
        &target("eccentricity_distribution.png"),
        &labels("Eccentricity Distribution", "Eccentricity", "Count"),
    )?;

    if nodes.has(Column::X) && nodes.has(Column::Y) {
        scatter(
            nodes,
            (Column::X, Column::Y),
            linear,
            &target("positions_xy.png"),
            &labels("Node Positions (X vs Y)", "X coordinate", "Y coordinate"),
        )?;
    } else {
        warn!("No X/Y columns in the node table; skipping positions_xy.png");
    }

    top_degree_subgraph(nodes, graph, &target("top100_subgraph.png"))?;

    info!("Wrote {} charts to {}", written.len(), out_dir.display());
    Ok(written)
}

fn labels<'a>(title: &'a str, x: &'a str, y: &'a str) -> Labels<'a> {
    Labels { title, x, y }
}

fn hist(nodes: &NodeTable, column: Column, path: &Path, labels: &Labels) -> Result<()> {
    let data = stats::present(nodes.numeric(column)?);
    chart::histogram(path, &data, BINS, labels)
}

/// Rows where both values are present; the rest are left out silently.
fn scatter(
    nodes: &NodeTable,
    (x, y): (Column, Column),
    scales: (Scale, Scale),
    path: &Path,
    labels: &Labels,
) -> Result<()> {
    let (xs, ys) = stats::paired(nodes.numeric(x)?, nodes.numeric(y)?);
    chart::scatter(path, &xs, &ys, scales, labels)
}

/// Pairwise-complete Pearson coefficients; pairs that cannot be correlated
/// (too few rows, constant input) are left blank.
fn correlation_matrix(nodes: &NodeTable, path: &Path) -> Result<()> {
    let columns = CORRELATED
        .iter()
        .map(|&column| nodes.numeric(column))
        .collect::<Result<Vec<_>>>()?;

    let matrix: Vec<Vec<f64>> = columns
        .iter()
        .map(|a| {
            columns
                .iter()
                .map(|b| {
                    let (xs, ys) = stats::paired(a, b);
                    stats::pearson(&xs, &ys).map_or(f64::NAN, |c| c.r)
                })
                .collect()
        })
        .collect();

    let names: Vec<&str> = CORRELATED.iter().map(|c| c.name()).collect();
    chart::heatmap(path, &names, &matrix, "Correlation Matrix of Key Metrics")
}

/// Spring-layout drawing of the subgraph induced by the highest-degree rows.
fn top_degree_subgraph(nodes: &NodeTable, graph: &CollabGraph, path: &Path) -> Result<()> {
    let ids = nodes.ids();
    let top = stats::nlargest(nodes.numeric(Column::Degree)?, TOP_DEGREE);
    let subgraph = graph.induced(top.iter().map(|&row| ids[row].as_str()));

    let positions = layout::spring_layout(&subgraph);
    let edges: Vec<(usize, usize)> = subgraph
        .edge_references()
        .map(|edge| (edge.source().index(), edge.target().index()))
        .collect();
    chart::network(path, &positions, &edges, "Top-100 Degree Subgraph")
}
