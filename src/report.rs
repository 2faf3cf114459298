use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::centrality::{betweenness_centrality, closeness_centrality};
use crate::error::Result;
use crate::loader::{CollabGraph, GraphSummary, NodeTable};
use crate::schema::Column;
use crate::stats::{self, Correlation};

const LARGE_COMMUNITY: usize = 1000;
const SMALL_COMMUNITY: usize = 100;
const BRIDGE_COUNT: usize = 5;

/// Clustering-coefficient tallies shared by both report binaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusteringSummary {
    pub total: usize,
    pub at_least_half: usize,
    pub exactly_one: usize,
    pub mean: Option<f64>,
}

impl ClusteringSummary {
    pub fn compute(nodes: &NodeTable) -> Result<Self> {
        let clustering = nodes.numeric(Column::Clustering)?;
        Ok(ClusteringSummary {
            total: nodes.len(),
            at_least_half: stats::count_where(clustering, |v| v >= 0.5),
            exactly_one: stats::count_where(clustering, |v| v == 1.0),
            mean: stats::mean(clustering),
        })
    }

    fn mean_text(&self) -> String {
        fixed(self.mean.unwrap_or(f64::NAN), 4)
    }
}

/// Terminal report of the metrics reporter.
pub struct ClusteringReport<'a>(pub &'a ClusteringSummary);

impl fmt::Display for ClusteringReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.0;
        writeln!(f, "Total nodes:      {}", summary.total)?;
        writeln!(f, "Clustering ≥0.5:   {}", summary.at_least_half)?;
        writeln!(f, "Clustering =1.0:   {}", summary.exactly_one)?;
        write!(f, "Mean clustering:  {}", summary.mean_text())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleFree {
    pub p90_threshold: f64,
    pub p50_threshold: f64,
    pub top10_fraction: f64,
    pub top50_fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommunitySizes {
    pub communities: usize,
    pub large: usize,
    pub small: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bridge {
    pub row: usize,
    pub label: Option<String>,
    pub betweenness: f64,
    pub closeness: f64,
}

/// One labelled result of the insight validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Insight {
    Graph(GraphSummary),
    ScaleFree(ScaleFree),
    DegreePagerank(Correlation),
    FollowersDegree(Correlation),
    Clustering(ClusteringSummary),
    CommunitySizes(CommunitySizes),
    Bridges { nodes: Vec<Bridge> },
    EccentricityCloseness(Correlation),
}

pub fn scale_free(nodes: &NodeTable) -> Result<ScaleFree> {
    let degree = nodes.numeric(Column::Degree)?;
    let total = nodes.len() as f64;
    let p90_threshold = stats::quantile(degree, 0.90)?;
    let p50_threshold = stats::quantile(degree, 0.50)?;
    Ok(ScaleFree {
        p90_threshold,
        p50_threshold,
        top10_fraction: stats::count_where(degree, |d| d >= p90_threshold) as f64 / total,
        top50_fraction: stats::count_where(degree, |d| d >= p50_threshold) as f64 / total,
    })
}

pub fn correlate(nodes: &NodeTable, x: Column, y: Column) -> Result<Correlation> {
    let (x, y) = stats::paired(nodes.numeric(x)?, nodes.numeric(y)?);
    stats::pearson(&x, &y)
}

/// Correlation of `ln(1 + x)` over rows where followers and degree are both positive.
pub fn followers_degree(nodes: &NodeTable) -> Result<Correlation> {
    let (followers, degree): (Vec<f64>, Vec<f64>) = nodes
        .numeric(Column::Followers)?
        .iter()
        .zip(nodes.numeric(Column::Degree)?)
        .filter_map(|(f, d)| match (*f, *d) {
            (Some(f), Some(d)) if f > 0.0 && d > 0.0 => Some((f.ln_1p(), d.ln_1p())),
            _ => None,
        })
        .unzip();
    stats::pearson(&followers, &degree)
}

pub fn community_sizes(nodes: &NodeTable) -> Result<CommunitySizes> {
    let sizes = stats::value_counts(nodes.text(Column::ModularityClass)?);
    Ok(CommunitySizes {
        communities: sizes.len(),
        large: sizes.iter().filter(|(_, n)| *n > LARGE_COMMUNITY).count(),
        small: sizes.iter().filter(|(_, n)| *n < SMALL_COMMUNITY).count(),
    })
}

/// Highest-betweenness rows, computed over the whole graph.
pub fn bridges(nodes: &NodeTable, graph: &CollabGraph) -> Result<Vec<Bridge>> {
    let labels = nodes.text(Column::Label)?;
    let betweenness = betweenness_centrality(graph.graph());
    let closeness = closeness_centrality(graph.graph());

    let score = |scores: &[f64], id: &str| graph.node(id).map(|node| scores[node.index()]);
    let by_row: Vec<Option<f64>> = nodes
        .ids()
        .iter()
        .map(|id| score(betweenness.as_slice(), id.as_str()))
        .collect();

    Ok(stats::nlargest(&by_row, BRIDGE_COUNT)
        .into_iter()
        .map(|row| {
            let id = &nodes.ids()[row];
            Bridge {
                row,
                label: labels[row].clone(),
                betweenness: score(betweenness.as_slice(), id.as_str()).unwrap_or(f64::NAN),
                closeness: score(closeness.as_slice(), id.as_str()).unwrap_or(f64::NAN),
            }
        })
        .collect())
}

/// Run every check in order, handing each result to `emit` as soon as it
/// is ready. Stops at the first failing check.
pub fn run_insights(
    nodes: &NodeTable,
    graph: &CollabGraph,
    mut emit: impl FnMut(&Insight),
) -> Result<Vec<Insight>> {
    let mut insights = Vec::with_capacity(8);
    let mut record = |insight: Insight| {
        debug!("Finished check: {}", insight.title());
        emit(&insight);
        insights.push(insight);
    };

    record(Insight::Graph(graph.summary()));
    record(Insight::ScaleFree(scale_free(nodes)?));
    record(Insight::DegreePagerank(correlate(nodes, Column::Degree, Column::PageRank)?));
    record(Insight::FollowersDegree(followers_degree(nodes)?));
    record(Insight::Clustering(ClusteringSummary::compute(nodes)?));
    record(Insight::CommunitySizes(community_sizes(nodes)?));
    record(Insight::Bridges {
        nodes: bridges(nodes, graph)?,
    });
    record(Insight::EccentricityCloseness(correlate(
        nodes,
        Column::Eccentricity,
        Column::Closeness,
    )?));

    Ok(insights)
}

impl Insight {
    pub fn title(&self) -> &'static str {
        match self {
            Insight::Graph(_) => "Graph",
            Insight::ScaleFree(_) => "Scale-free structure",
            Insight::DegreePagerank(_) => "Degree ↔ PageRank",
            Insight::FollowersDegree(_) => "Followers ↔ Degree",
            Insight::Clustering(_) => "Clustering distribution",
            Insight::CommunitySizes(_) => "Community sizes",
            Insight::Bridges { .. } => "Bridge nodes analysis",
            Insight::EccentricityCloseness(_) => "Eccentricity ↔ Closeness",
        }
    }
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.title())?;
        match self {
            Insight::Graph(summary) => {
                writeln!(f, "Vertices: {}", summary.vertices)?;
                writeln!(f, "Edges: {} ({} self-loops)", summary.edges, summary.self_loops)?;
                write!(f, "Connected components: {}", summary.components)
            }
            Insight::ScaleFree(check) => {
                writeln!(f, "Top 10% degree nodes: {}", percent(check.top10_fraction))?;
                write!(f, "Top 50% degree nodes: {}", percent(check.top50_fraction))
            }
            Insight::DegreePagerank(c) => {
                write!(f, "Degree vs PageRank Pearson r: {}", correlation_text(c))
            }
            Insight::FollowersDegree(c) => {
                write!(f, "log(Followers) vs log(Degree) Pearson r: {}", correlation_text(c))
            }
            Insight::Clustering(summary) => {
                let share = |n: usize| percent(n as f64 / summary.total as f64);
                writeln!(
                    f,
                    "Clustering ≥0.5: {} / {} ({})",
                    summary.at_least_half,
                    summary.total,
                    share(summary.at_least_half)
                )?;
                writeln!(
                    f,
                    "Clustering =1.0: {} / {} ({})",
                    summary.exactly_one,
                    summary.total,
                    share(summary.exactly_one)
                )?;
                write!(f, "Mean clustering: {}", summary.mean_text())
            }
            Insight::CommunitySizes(sizes) => {
                writeln!(f, "Communities >{} nodes: {}", LARGE_COMMUNITY, sizes.large)?;
                write!(f, "Communities <{} nodes: {}", SMALL_COMMUNITY, sizes.small)
            }
            Insight::Bridges { nodes } => {
                writeln!(f, "Top {} bridge nodes (by betweenness):", BRIDGE_COUNT)?;
                write!(f, "{}", bridge_table(nodes))
            }
            Insight::EccentricityCloseness(c) => {
                write!(f, "Eccentricity vs Closeness Pearson r: {}", correlation_text(c))
            }
        }
    }
}

fn correlation_text(c: &Correlation) -> String {
    format!("{} (p={})", fixed(c.r, 3), general(c.p_value, 3))
}

fn bridge_table(rows: &[Bridge]) -> String {
    let cells: Vec<[String; 4]> = rows
        .iter()
        .map(|b| {
            [
                b.row.to_string(),
                b.label.clone().unwrap_or_else(|| "NaN".to_string()),
                fixed(b.betweenness, 6),
                fixed(b.closeness, 6),
            ]
        })
        .collect();
    let header = ["", "Label", "betweenness", "closeness"];
    let widths: Vec<usize> = (0..4)
        .map(|i| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |row: [&str; 4]| -> String {
        row.iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{:>width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
    };
    std::iter::once(line(header))
        .chain(cells.iter().map(|row| {
            line([
                row[0].as_str(),
                row[1].as_str(),
                row[2].as_str(),
                row[3].as_str(),
            ])
        }))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `value` as a percentage with two decimals, e.g. `40.00%`.
pub fn percent(value: f64) -> String {
    format!("{}%", fixed(value * 100.0, 2))
}

/// Fixed-point with `decimals` places; NaN prints as `nan`.
pub fn fixed(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{:.*}", decimals, value)
    }
}

/// General notation with `precision` significant digits, like C's `%g`:
/// scientific when the exponent is below -4 or at least `precision`,
/// fixed otherwise, trailing zeros removed.
pub fn general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointPolicy;
    use crate::loader::{load, read_nodes, tests::write_inputs};
    use crate::schema::Schema;

    const FIVE_NODES: &str = "Id,Label,Degree,pageranks,followers,clustering,modularity_class,Eccentricity,closnesscentrality\n\
                              1,alice,4,0.40,100,0.0,A,2,0.80\n\
                              2,bob,3,0.25,50,0.5,A,3,0.60\n\
                              3,carol,2,0.20,0,1.0,A,3,0.55\n\
                              4,dave,1,0.10,20,1.0,B,4,0.40\n\
                              5,erin,0,0.05,5,0.0,B,5,0.30\n";

    const STAR_EDGES: &str = "Source,Target\n1,2\n1,3\n1,4\n1,5\n";

    #[test]
    fn test_clustering_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_inputs(dir.path(), FIVE_NODES, STAR_EDGES);
        let nodes = read_nodes(&paths.nodes, &Schema::clustering_check()).unwrap();

        let summary = ClusteringSummary::compute(&nodes).unwrap();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.at_least_half, 3);
        assert_eq!(summary.exactly_one, 2);
        assert_eq!(summary.mean, Some(0.5));
        assert!(summary.exactly_one <= summary.at_least_half);
        assert!(summary.at_least_half <= summary.total);

        assert_eq!(
            ClusteringReport(&summary).to_string(),
            "Total nodes:      5\n\
             Clustering ≥0.5:   3\n\
             Clustering =1.0:   2\n\
             Mean clustering:  0.5000"
        );
    }

    #[test]
    fn test_both_reports_share_the_mean() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_inputs(dir.path(), FIVE_NODES, STAR_EDGES);
        let reporter = read_nodes(&paths.nodes, &Schema::clustering_check()).unwrap();
        let (validator, graph) = load(&paths, &Schema::insights(), EndpointPolicy::Extend).unwrap();

        let expected = ClusteringSummary::compute(&reporter).unwrap().mean.unwrap();
        let insights = run_insights(&validator, &graph, |_| {}).unwrap();
        let mean = insights
            .iter()
            .find_map(|insight| match insight {
                Insight::Clustering(summary) => summary.mean,
                _ => None,
            })
            .unwrap();
        assert_eq!(mean.to_bits(), expected.to_bits());
    }

    #[test]
    fn test_community_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_inputs(dir.path(), FIVE_NODES, STAR_EDGES);
        let nodes = read_nodes(&paths.nodes, &Schema::insights()).unwrap();

        let sizes = community_sizes(&nodes).unwrap();
        assert_eq!(
            sizes,
            CommunitySizes {
                communities: 2,
                large: 0,
                small: 2
            }
        );
    }

    #[test]
    fn test_scale_free_fractions_are_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_inputs(dir.path(), FIVE_NODES, STAR_EDGES);
        let nodes = read_nodes(&paths.nodes, &Schema::insights()).unwrap();

        let check = scale_free(&nodes).unwrap();
        assert!((check.p90_threshold - 3.6).abs() < 1e-12);
        assert_eq!(check.p50_threshold, 2.0);
        assert_eq!(check.top10_fraction, 0.2);
        assert_eq!(check.top50_fraction, 0.6);
        assert!(check.top10_fraction <= check.top50_fraction);
    }

    #[test]
    fn test_followers_degree_skips_non_positive_rows() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_inputs(dir.path(), FIVE_NODES, STAR_EDGES);
        let nodes = read_nodes(&paths.nodes, &Schema::insights()).unwrap();

        // carol has no followers and erin has degree 0
        let c = followers_degree(&nodes).unwrap();
        assert_eq!(c.n, 3);
        assert!((-1.0..=1.0).contains(&c.r));
    }

    #[test]
    fn test_bridges_rank_the_star_center_first() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_inputs(dir.path(), FIVE_NODES, STAR_EDGES);
        let (nodes, graph) = load(&paths, &Schema::insights(), EndpointPolicy::Extend).unwrap();

        let top = bridges(&nodes, &graph).unwrap();
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].label.as_deref(), Some("alice"));
        assert!((top[0].betweenness - 1.0).abs() < 1e-12);
        assert_eq!(top[0].closeness, 1.0);
        // the leaves tie at zero and keep table order
        let rows: Vec<usize> = top.iter().map(|b| b.row).collect();
        assert_eq!(rows, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_run_insights_emits_every_section_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_inputs(dir.path(), FIVE_NODES, STAR_EDGES);
        let (nodes, graph) = load(&paths, &Schema::insights(), EndpointPolicy::Extend).unwrap();

        let mut titles = Vec::new();
        let insights = run_insights(&nodes, &graph, |insight| titles.push(insight.title())).unwrap();
        assert_eq!(insights.len(), 8);
        assert_eq!(titles.first(), Some(&"Graph"));
        assert_eq!(titles.last(), Some(&"Eccentricity ↔ Closeness"));

        let text = insights[1].to_string();
        assert_eq!(
            text,
            "=== Scale-free structure ===\n\
             Top 10% degree nodes: 20.00%\n\
             Top 50% degree nodes: 60.00%"
        );
        assert!(serde_json::to_string(&insights).unwrap().contains("\"check\":\"scale_free\""));
    }

    #[test]
    fn test_insight_sections_render_exact_text() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_inputs(dir.path(), FIVE_NODES, STAR_EDGES);
        let (nodes, graph) = load(&paths, &Schema::insights(), EndpointPolicy::Extend).unwrap();

        let text: Vec<String> = run_insights(&nodes, &graph, |_| {})
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            text[0],
            "=== Graph ===\n\
             Vertices: 5\n\
             Edges: 4 (0 self-loops)\n\
             Connected components: 1"
        );
        assert_eq!(
            text[2],
            "=== Degree ↔ PageRank ===\n\
             Degree vs PageRank Pearson r: 0.981 (p=0.00301)"
        );
        assert_eq!(
            text[3],
            "=== Followers ↔ Degree ===\n\
             log(Followers) vs log(Degree) Pearson r: 0.977 (p=0.136)"
        );
        assert_eq!(
            text[4],
            "=== Clustering distribution ===\n\
             Clustering ≥0.5: 3 / 5 (60.00%)\n\
             Clustering =1.0: 2 / 5 (40.00%)\n\
             Mean clustering: 0.5000"
        );
        assert_eq!(
            text[5],
            "=== Community sizes ===\n\
             Communities >1000 nodes: 0\n\
             Communities <100 nodes: 2"
        );
        assert_eq!(
            text[6],
            [
                "=== Bridge nodes analysis ===",
                "Top 5 bridge nodes (by betweenness):",
                "   Label  betweenness  closeness",
                "0  alice     1.000000   1.000000",
                "1    bob     0.000000   0.571429",
                "2  carol     0.000000   0.571429",
                "3   dave     0.000000   0.571429",
                "4   erin     0.000000   0.571429",
            ]
            .join("\n")
        );
        assert_eq!(
            text[7],
            "=== Eccentricity ↔ Closeness ===\n\
             Eccentricity vs Closeness Pearson r: -0.980 (p=0.00331)"
        );
    }

    #[test]
    fn test_run_insights_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_inputs(
            dir.path(),
            "Id,Label,Degree,pageranks,followers,clustering,modularity_class,Eccentricity,closnesscentrality\n\
             1,alice,,,1,0.0,A,1,0.5\n",
            "s,t\n1,1\n",
        );
        let (nodes, graph) = load(&paths, &Schema::insights(), EndpointPolicy::Extend).unwrap();

        let mut emitted = 0;
        assert!(run_insights(&nodes, &graph, |_| emitted += 1).is_err());
        // only the graph summary precedes the degree quantiles
        assert_eq!(emitted, 1);
    }

    #[test]
    fn test_general_format_matches_printf() {
        assert_eq!(general(0.124_027_062_657_554_57, 3), "0.124");
        assert_eq!(general(0.000_012_345, 3), "1.23e-05");
        assert_eq!(general(0.0, 3), "0");
        assert_eq!(general(1.0, 3), "1");
        assert_eq!(general(1_234_567.0, 3), "1.23e+06");
        assert_eq!(general(0.001, 3), "0.001");
        assert_eq!(general(2.5e-300, 3), "2.5e-300");
        assert_eq!(general(f64::NAN, 3), "nan");
    }

    #[test]
    fn test_percent_and_fixed() {
        assert_eq!(percent(0.4), "40.00%");
        assert_eq!(percent(2.0 / 3.0), "66.67%");
        assert_eq!(fixed(f64::NAN, 3), "nan");
        assert_eq!(fixed(0.774_596_669, 3), "0.775");
    }
}
