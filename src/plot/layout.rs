use std::f64::consts::PI;

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};
use petgraph::visit::EdgeRef;
use tracing::{debug, warn};

use crate::loader::SocialGraph;

const ITERATIONS: usize = 500;
const TIME_STEP: f32 = 0.035;
const SEED_RADIUS: f64 = 100.0;

/// Force-directed positions, indexed by `NodeIndex::index()`.
///
/// Vertices start on a circle in index order, so the same graph always
/// lays out the same way.
pub fn spring_layout(graph: &SocialGraph) -> Vec<(f64, f64)> {
    let n = graph.node_count();
    let seed = circular_layout(n);
    if n < 2 {
        return seed;
    }

    let mut simulation = ForceGraph::<usize, ()>::new(SimulationParameters {
        force_charge: 150.0,
        force_spring: 0.05,
        force_max: 100.0,
        node_speed: 3000.0,
        damping_factor: 0.9,
    });
    let handles: Vec<_> = seed
        .iter()
        .enumerate()
        .map(|(index, &(x, y))| {
            simulation.add_node(NodeData {
                x: x as f32,
                y: y as f32,
                mass: 10.0,
                is_anchor: false,
                user_data: index,
            })
        })
        .collect();
    for edge in graph.edge_references() {
        let (a, b) = (edge.source().index(), edge.target().index());
        if a != b {
            simulation.add_edge(handles[a], handles[b], EdgeData::default());
        }
    }

    for _ in 0..ITERATIONS {
        simulation.update(TIME_STEP);
    }

    let mut positions = vec![(f64::NAN, f64::NAN); n];
    simulation.visit_nodes(|node| {
        positions[node.data.user_data] = (f64::from(node.x()), f64::from(node.y()));
    });
    if positions.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        warn!("Spring layout diverged; falling back to a circle");
        return seed;
    }
    debug!("Laid out {} vertices in {} steps", n, ITERATIONS);
    positions
}

/// Vertices evenly spaced on a circle, first one at angle zero.
pub fn circular_layout(n: usize) -> Vec<(f64, f64)> {
    (0..n)
        .map(|i| {
            let angle = i as f64 * 2.0 * PI / n as f64;
            (SEED_RADIUS * angle.cos(), SEED_RADIUS * angle.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Vertex;

    fn ring(n: usize) -> SocialGraph {
        let mut graph = SocialGraph::default();
        let nodes: Vec<_> = (0..n)
            .map(|i| graph.add_node(Vertex { id: i.to_string() }))
            .collect();
        for i in 0..n {
            graph.update_edge(nodes[i], nodes[(i + 1) % n], ());
        }
        graph
    }

    #[test]
    fn test_circular_layout() {
        let positions = circular_layout(4);
        assert_eq!(positions.len(), 4);
        assert!((positions[0].0 - SEED_RADIUS).abs() < 1e-9);
        assert!((positions[1].1 - SEED_RADIUS).abs() < 1e-9);
        assert!(circular_layout(0).is_empty());
    }

    #[test]
    fn test_spring_layout_positions_every_vertex() {
        let mut graph = ring(6);
        let first = graph.node_indices().next().unwrap();
        graph.update_edge(first, first, ());

        let positions = spring_layout(&graph);
        assert_eq!(positions.len(), 6);
        assert!(positions.iter().all(|(x, y)| x.is_finite() && y.is_finite()));
    }

    #[test]
    fn test_single_vertex_stays_on_seed() {
        assert_eq!(spring_layout(&ring(1)), circular_layout(1));
        assert!(spring_layout(&SocialGraph::default()).is_empty());
    }
}
