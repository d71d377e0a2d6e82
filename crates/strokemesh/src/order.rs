//! Node processing order.

use std::cmp::Ordering;

use strokemesh_math::Vec3;

use crate::graph::StrokeGraph;

/// Node indices in processing order.
///
/// Branch nodes (degree ≥ 3) come first: higher degree, then larger
/// radius, then higher Y, Z and X. Chain and leaf nodes follow, laid
/// out along the axis most aligned with the summed direction between
/// consecutive nodes, with the end nearest the world origin first.
pub fn sort_node_indices(graph: &StrokeGraph) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..graph.node_count()).collect();
    indices.sort_by(|&a, &b| compare_nodes(graph, a, b));

    let split = indices
        .iter()
        .position(|&i| graph.degree(i) < 3)
        .unwrap_or(indices.len());
    order_along_dominant_axis(graph, &mut indices[split..]);
    indices
}

fn compare_nodes(graph: &StrokeGraph, a: usize, b: usize) -> Ordering {
    let (na, nb) = (&graph.nodes[a], &graph.nodes[b]);
    nb.degree()
        .cmp(&na.degree())
        .then_with(|| nb.radius.total_cmp(&na.radius))
        .then_with(|| nb.position.y.total_cmp(&na.position.y))
        .then_with(|| nb.position.z.total_cmp(&na.position.z))
        .then_with(|| nb.position.x.total_cmp(&na.position.x))
}

fn order_along_dominant_axis(graph: &StrokeGraph, chain: &mut [usize]) {
    if chain.len() < 2 {
        return;
    }
    let travel: Vec3 = chain
        .windows(2)
        .map(|pair| graph.nodes[pair[1]].position - graph.nodes[pair[0]].position)
        .sum();
    let axis = (0..3)
        .max_by(|&a, &b| travel[a].abs().total_cmp(&travel[b].abs()))
        .unwrap_or(0);

    let coord = |i: usize| graph.nodes[i].position[axis];
    chain.sort_by(|&a, &b| coord(a).total_cmp(&coord(b)));
    if let (Some(&head), Some(&tail)) = (chain.first(), chain.last()) {
        if coord(head).abs() > coord(tail).abs() {
            chain.reverse();
        }
    }
}
