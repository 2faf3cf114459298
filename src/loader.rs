use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::iter;
use std::path::Path;

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{EndpointPolicy, Paths};
use crate::error::{AnalysisError, Result};
use crate::schema::{Column, ColumnKind, Schema};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    pub id: String,
}

pub type SocialGraph = UnGraph<Vertex, ()>;

/// Node table restricted to the columns a program asked for.
#[derive(Debug, Clone)]
pub struct NodeTable {
    ids: Vec<String>,
    numeric: BTreeMap<Column, Vec<Option<f64>>>,
    text: BTreeMap<Column, Vec<Option<String>>>,
}

impl NodeTable {
    /// Validate `frame` against `schema` and pull out the typed columns.
    pub fn from_frame(frame: DataFrame, schema: &Schema) -> Result<Self> {
        let present: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let missing = schema.missing(present.iter().map(String::as_str));
        if !missing.is_empty() {
            return Err(AnalysisError::MissingColumns(missing));
        }

        let mut wanted: Vec<Column> = iter::once(Column::Id)
            .chain(schema.required.iter().copied())
            .chain(
                schema
                    .optional
                    .iter()
                    .copied()
                    .filter(|column| present.iter().any(|name| name == column.name())),
            )
            .collect();
        wanted.sort();
        wanted.dedup();

        let projection: Vec<Expr> = wanted.iter().map(|column| col(column.name())).collect();
        let frame = frame.lazy().select(projection).collect()?;

        let mut ids = Vec::new();
        let mut numeric = BTreeMap::new();
        let mut text = BTreeMap::new();
        for column in wanted {
            let series = frame.column(column.name())?;
            match column.kind() {
                ColumnKind::Identifier => {
                    let values = series.cast(&DataType::Utf8)?;
                    for (row, value) in values.utf8()?.into_iter().enumerate() {
                        match value {
                            Some(id) => ids.push(normalize_id(id)),
                            None => return Err(AnalysisError::NullId { row }),
                        }
                    }
                }
                ColumnKind::Text | ColumnKind::Category => {
                    let values = series.cast(&DataType::Utf8)?;
                    let values: Vec<Option<String>> = values
                        .utf8()?
                        .into_iter()
                        .map(|value| value.map(str::to_string))
                        .collect();
                    text.insert(column, values);
                }
                ColumnKind::Numeric => {
                    let values = series.cast(&DataType::Float64)?;
                    // NaN cells count as missing, like nulls.
                    let values: Vec<Option<f64>> = values
                        .f64()?
                        .into_iter()
                        .map(|value| value.filter(|v| !v.is_nan()))
                        .collect();
                    numeric.insert(column, values);
                }
            }
        }

        Ok(NodeTable { ids, numeric, text })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn has(&self, column: Column) -> bool {
        column == Column::Id || self.numeric.contains_key(&column) || self.text.contains_key(&column)
    }

    pub fn numeric(&self, column: Column) -> Result<&[Option<f64>]> {
        self.numeric
            .get(&column)
            .map(Vec::as_slice)
            .ok_or_else(|| AnalysisError::MissingColumns(vec![column.name().to_string()]))
    }

    pub fn text(&self, column: Column) -> Result<&[Option<String>]> {
        self.text
            .get(&column)
            .map(Vec::as_slice)
            .ok_or_else(|| AnalysisError::MissingColumns(vec![column.name().to_string()]))
    }
}

pub fn read_nodes(path: &Path, schema: &Schema) -> Result<NodeTable> {
    let file = File::open(path).map_err(|e| AnalysisError::io(path, e))?;
    let frame = if path.extension().map_or(false, |ext| ext == "parquet") {
        ParquetReader::new(file).finish()?
    } else {
        CsvReader::new(file)
            .has_header(true)
            .infer_schema(None)
            .finish()?
    };
    let table = NodeTable::from_frame(frame, schema)?;
    info!("Loaded {} node rows from {}", table.len(), path.display());
    Ok(table)
}

/// Canonical text of a node identifier, applied to node `Id`s and edge
/// endpoints alike so both tables agree however their cells were typed.
///
/// Numbers compare by value: `007`, `7` and `7.0` all become `7`, and
/// `2.50` becomes `2.5`. Anything else is kept as trimmed text.
pub fn normalize_id(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return n.to_string();
    }
    match raw.parse::<f64>() {
        // below 2^53 every integral f64 is exactly an i64
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 9_007_199_254_740_992.0 => {
            (v as i64).to_string()
        }
        Ok(v) if v.is_finite() => v.to_string(),
        _ => raw.to_string(),
    }
}

/// Endpoint pairs from the first two columns of the edge table.
#[derive(Debug, Clone)]
pub struct EdgeList {
    pub source_column: String,
    pub target_column: String,
    pub pairs: Vec<(String, String)>,
}

pub fn read_edges(path: &Path) -> Result<EdgeList> {
    let file = File::open(path).map_err(|e| AnalysisError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(AnalysisError::EdgeColumns(headers.len()));
    }
    let source_column = headers[0].to_string();
    let target_column = headers[1].to_string();

    let mut pairs = Vec::new();
    for record in reader.records() {
        let record = record?;
        let source = normalize_id(record.get(0).unwrap_or_default());
        let target = normalize_id(record.get(1).unwrap_or_default());
        pairs.push((source, target));
    }

    Ok(EdgeList {
        source_column,
        target_column,
        pairs,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub vertices: usize,
    pub edges: usize,
    pub self_loops: usize,
    pub components: usize,
}

/// Undirected simple graph over node ids, plus the id lookup.
#[derive(Debug, Clone)]
pub struct CollabGraph {
    graph: SocialGraph,
    index: HashMap<String, NodeIndex>,
}

impl CollabGraph {
    pub fn build(nodes: &NodeTable, edges: &EdgeList, policy: EndpointPolicy) -> Result<Self> {
        let mut graph = SocialGraph::default();
        let mut index: HashMap<String, NodeIndex> = HashMap::new();

        for id in nodes.ids() {
            index
                .entry(id.clone())
                .or_insert_with(|| graph.add_node(Vertex { id: id.clone() }));
        }

        let mut extended = 0;
        for (row, (source, target)) in edges.pairs.iter().enumerate() {
            let mut endpoint = |id: &String| -> Result<NodeIndex> {
                if let Some(&node) = index.get(id) {
                    return Ok(node);
                }
                match policy {
                    EndpointPolicy::Reject => Err(AnalysisError::UnknownEndpoint {
                        row,
                        id: id.clone(),
                    }),
                    EndpointPolicy::Extend => {
                        extended += 1;
                        let node = graph.add_node(Vertex { id: id.clone() });
                        index.insert(id.clone(), node);
                        Ok(node)
                    }
                }
            };
            let a = endpoint(source)?;
            let b = endpoint(target)?;
            // Parallel edges collapse onto the existing one.
            graph.update_edge(a, b, ());
        }

        if extended > 0 {
            debug!("Added {} vertices for edge endpoints missing from the node table", extended);
        }

        let graph = CollabGraph { graph, index };
        let summary = graph.summary();
        info!(
            "Graph has {} vertices, {} edges ({} self-loops), {} connected components",
            summary.vertices, summary.edges, summary.self_loops, summary.components
        );
        Ok(graph)
    }

    pub fn graph(&self) -> &SocialGraph {
        &self.graph
    }

    pub fn node(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn summary(&self) -> GraphSummary {
        let self_loops = self
            .graph
            .raw_edges()
            .iter()
            .filter(|edge| edge.source() == edge.target())
            .count();
        GraphSummary {
            vertices: self.graph.node_count(),
            edges: self.graph.edge_count(),
            self_loops,
            components: connected_components(&self.graph),
        }
    }

    /// Subgraph induced by `ids`; unknown ids are ignored.
    pub fn induced<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> SocialGraph {
        let keep: HashSet<NodeIndex> = ids.into_iter().filter_map(|id| self.node(id)).collect();
        self.graph.filter_map(
            |node, vertex| keep.contains(&node).then(|| vertex.clone()),
            |_, edge| Some(*edge),
        )
    }
}

/// Load both tables and build the graph, all-or-nothing.
pub fn load(paths: &Paths, schema: &Schema, policy: EndpointPolicy) -> Result<(NodeTable, CollabGraph)> {
    let nodes = read_nodes(&paths.nodes, schema)?;
    let edges = read_edges(&paths.edges)?;
    info!(
        "Using edge columns: {:?} → {:?}",
        edges.source_column, edges.target_column
    );
    let graph = CollabGraph::build(&nodes, &edges, policy)?;
    Ok((nodes, graph))
}
