use std::collections::VecDeque;

use petgraph::graph::NodeIndex;
use tracing::debug;

use crate::loader::SocialGraph;

/// Shortest-path betweenness for every vertex, indexed by `NodeIndex::index()`.
///
/// Unweighted Brandes accumulation. With `n > 2` vertices each score is the
/// fraction of vertex pairs (excluding the vertex itself) whose shortest
/// paths pass through it, split evenly among equal-length paths.
pub fn betweenness_centrality(graph: &SocialGraph) -> Vec<f64> {
    let n = graph.node_count();
    let mut centrality = vec![0.0; n];
    for source in graph.node_indices() {
        let dependency = brandes_from_source(graph, source);
        for (total, partial) in centrality.iter_mut().zip(dependency) {
            *total += partial;
        }
    }

    // Every unordered pair was visited from both ends.
    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for score in &mut centrality {
            *score *= scale;
        }
    }
    debug!("Computed betweenness for {} vertices", n);
    centrality
}

/// Closeness for every vertex, indexed by `NodeIndex::index()`.
///
/// For a vertex reaching `r` vertices (itself included) at total distance
/// `d`, closeness is `((r - 1) / d) * ((r - 1) / (n - 1))`: the mean inverse
/// distance within its component, damped by the component's share of the
/// graph. Isolated vertices score 0.
pub fn closeness_centrality(graph: &SocialGraph) -> Vec<f64> {
    let n = graph.node_count();
    let mut centrality = vec![0.0; n];
    if n < 2 {
        return centrality;
    }

    for node in graph.node_indices() {
        let distances = bfs_distances(graph, node);
        let (reached, total) = distances
            .iter()
            .flatten()
            .fold((0usize, 0usize), |(reached, total), &d| (reached + 1, total + d));
        if total > 0 {
            let others = (reached - 1) as f64;
            centrality[node.index()] = (others / total as f64) * (others / (n - 1) as f64);
        }
    }
    debug!("Computed closeness for {} vertices", n);
    centrality
}

fn brandes_from_source(graph: &SocialGraph, source: NodeIndex) -> Vec<f64> {
    let n = graph.node_count();
    let mut stack = Vec::with_capacity(n);
    let mut paths = vec![0f64; n];
    let mut distance: Vec<Option<usize>> = vec![None; n];
    let mut predecessors: Vec<Vec<NodeIndex>> = vec![Vec::new(); n];
    let mut dependency = vec![0.0; n];

    paths[source.index()] = 1.0;
    distance[source.index()] = Some(0);
    let mut queue = VecDeque::new();
    queue.push_back(source);

    while let Some(v) = queue.pop_front() {
        stack.push(v);
        let next = distance[v.index()].map(|d| d + 1);
        for w in graph.neighbors(v) {
            if distance[w.index()].is_none() {
                distance[w.index()] = next;
                queue.push_back(w);
            }
            if distance[w.index()] == next {
                paths[w.index()] += paths[v.index()];
                predecessors[w.index()].push(v);
            }
        }
    }

    while let Some(w) = stack.pop() {
        for &v in &predecessors[w.index()] {
            dependency[v.index()] +=
                paths[v.index()] / paths[w.index()] * (1.0 + dependency[w.index()]);
        }
    }
    dependency[source.index()] = 0.0;
    dependency
}

/// Hop counts from `source`; `None` for unreachable vertices.
fn bfs_distances(graph: &SocialGraph, source: NodeIndex) -> Vec<Option<usize>> {
    let mut distances = vec![None; graph.node_count()];
    distances[source.index()] = Some(0);

    let mut queue = VecDeque::new();
    queue.push_back((source, 0));
    while let Some((v, d)) = queue.pop_front() {
        for w in graph.neighbors(v) {
            if distances[w.index()].is_none() {
                distances[w.index()] = Some(d + 1);
                queue.push_back((w, d + 1));
            }
        }
    }

    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Vertex;

    fn graph(n: usize, edges: &[(usize, usize)]) -> SocialGraph {
        let mut graph = SocialGraph::default();
        let nodes: Vec<NodeIndex> = (0..n)
            .map(|i| graph.add_node(Vertex { id: i.to_string() }))
            .collect();
        for &(a, b) in edges {
            graph.update_edge(nodes[a], nodes[b], ());
        }
        graph
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_path_of_three() {
        let g = graph(3, &[(0, 1), (1, 2)]);
        assert_close(&betweenness_centrality(&g), &[0.0, 1.0, 0.0]);
        assert_close(&closeness_centrality(&g), &[2.0 / 3.0, 1.0, 2.0 / 3.0]);
    }

    #[test]
    fn test_disconnected_graph() {
        // 0-1-2-3 with chord 1-3, pendant 3-4, isolated 5, separate pair 6-7
        let g = graph(8, &[(0, 1), (1, 2), (2, 3), (1, 3), (3, 4), (6, 7)]);
        let one_seventh = 1.0 / 7.0;
        assert_close(
            &betweenness_centrality(&g),
            &[0.0, one_seventh, 0.0, one_seventh, 0.0, 0.0, 0.0, 0.0],
        );
        assert_close(
            &closeness_centrality(&g),
            &[
                0.285_714_285_714_285_7,
                0.457_142_857_142_857_13,
                0.380_952_380_952_380_93,
                0.457_142_857_142_857_13,
                0.285_714_285_714_285_7,
                0.0,
                one_seventh,
                one_seventh,
            ],
        );
    }

    #[test]
    fn test_self_loop_does_not_change_scores() {
        let plain = graph(3, &[(0, 1), (1, 2)]);
        let looped = graph(3, &[(0, 1), (1, 2), (1, 1)]);
        assert_eq!(betweenness_centrality(&plain), betweenness_centrality(&looped));
        assert_eq!(closeness_centrality(&plain), closeness_centrality(&looped));
    }

    #[test]
    fn test_tiny_graphs() {
        assert!(betweenness_centrality(&graph(0, &[])).is_empty());
        assert_eq!(closeness_centrality(&graph(1, &[])), vec![0.0]);
        assert_eq!(betweenness_centrality(&graph(2, &[(0, 1)])), vec![0.0, 0.0]);
    }
}
