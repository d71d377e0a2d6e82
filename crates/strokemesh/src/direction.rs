//! Traverse direction field.

use strokemesh_math::{try_normalize, Vec3};

use crate::graph::StrokeGraph;

/// Depth-first walk from every unvisited node, in reverse `sorted`
/// order, giving each node its visitation order and the direction from
/// the node it was reached from.
///
/// The walk uses an explicit stack; neighbours are pushed in reverse so
/// the visitation order matches a recursive preorder walk.
pub fn resolve_initial_traverse_directions(graph: &mut StrokeGraph, sorted: &[usize]) {
    let mut visited = vec![false; graph.node_count()];
    let mut order = 0;
    for &root in sorted.iter().rev() {
        if visited[root] {
            continue;
        }
        let mut stack: Vec<(usize, Option<usize>)> = vec![(root, None)];
        while let Some((node, parent)) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            graph.nodes[node].traverse_order = Some(order);
            order += 1;
            if let Some(parent) = parent {
                let delta = graph.nodes[node].position - graph.nodes[parent].position;
                graph.nodes[node].initial_traverse_direction = try_normalize(&delta);
            }
            let next: Vec<usize> = graph.neighbors(node).filter(|&n| !visited[n]).collect();
            stack.extend(next.into_iter().rev().map(|n| (n, Some(node))));
        }
    }
}

/// Final traverse directions.
///
/// Nodes the walk started from borrow their first neighbour's initial
/// direction. A degree-2 node takes the average of the direction it is
/// entered with and the direction it leaves with, following visitation
/// order; every other node keeps its initial direction. Nodes with no
/// usable direction fall back to +Z.
pub fn resolve_traverse_directions(graph: &mut StrokeGraph, sorted: &[usize]) {
    for &node in sorted.iter().rev() {
        if graph.nodes[node].initial_traverse_direction.is_none() {
            let borrowed = graph
                .neighbors(node)
                .next()
                .and_then(|n| graph.nodes[n].initial_traverse_direction);
            graph.nodes[node].initial_traverse_direction = borrowed;
        }
    }

    for node in 0..graph.node_count() {
        let initial = graph.nodes[node].initial_traverse_direction;
        let direction = if graph.degree(node) == 2 {
            chain_direction(graph, node).or(initial)
        } else {
            initial
        };
        graph.nodes[node].traverse_direction = direction.unwrap_or_else(Vec3::z);
    }
}

fn chain_direction(graph: &StrokeGraph, node: usize) -> Option<Vec3> {
    let mut ends: Vec<usize> = graph.neighbors(node).collect();
    ends.sort_by_key(|&n| graph.nodes[n].traverse_order);
    let (prev, next) = (ends[0], ends[1]);
    let p = graph.nodes[node].position;
    let incoming = try_normalize(&(p - graph.nodes[prev].position))?;
    let outgoing = try_normalize(&(graph.nodes[next].position - p))?;
    try_normalize(&(incoming + outgoing))
}
