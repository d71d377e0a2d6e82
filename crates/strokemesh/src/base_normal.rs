//! Base-normal field: the "up" reference of every cross-section.
//!
//! Normals are derived from neighbour geometry where a node has enough
//! of it, borrowed from nearby nodes where it does not, and finally
//! smoothed so consecutive cuts do not flip or twist.

use std::collections::VecDeque;

use strokemesh_math::{
    axis_vector, least_aligned_axis, most_aligned_axis, plane_normal, try_normalize, Vec3,
};

use crate::config::{AxisMask, BuilderConfig};
use crate::graph::StrokeGraph;

/// Dot product above which two unit vectors count as parallel (15°).
pub(crate) const PARALLEL_DOT: f64 = 0.966;

/// Normal derived from a tangent alone: the cross product with the world
/// axis least aligned with it, signed so that opposite tangents agree.
pub fn base_normal_from_traverse_direction(traverse: &Vec3) -> Vec3 {
    let axis = axis_vector(least_aligned_axis(traverse));
    let Some(normal) = try_normalize(&traverse.cross(&axis)) else {
        return Vec3::y();
    };
    let (_, alignment) = most_aligned_axis(traverse);
    if alignment < 0.0 {
        -normal
    } else {
        normal
    }
}

/// Run the whole base-normal pipeline over `graph`.
pub fn resolve_base_normals(graph: &mut StrokeGraph, sorted: &[usize], config: &BuilderConfig) {
    let mask = config.axis_mask();
    for node in 0..graph.node_count() {
        let initial = initial_base_normal(graph, node, &mask);
        graph.nodes[node].initial_base_normal = initial;
    }
    if config.base_normal_average {
        average_initial_base_normals(graph);
    }

    for node in graph.nodes.iter_mut() {
        node.base_normal_resolved = false;
    }
    for &node in sorted {
        if graph.nodes[node].base_normal_resolved {
            continue;
        }
        let seed = graph.nodes[node]
            .initial_base_normal
            .or_else(|| search_base_normal_from_neighbors(graph, node))
            .unwrap_or_else(|| base_normal_from_traverse_direction(&graph.nodes[node].traverse_direction));
        propagate_base_normal(graph, node, seed);
    }

    unify_base_normals(graph);
    local_average_base_normals(graph);
    unify_base_normals(graph);
}

fn initial_base_normal(graph: &StrokeGraph, node: usize, mask: &AxisMask) -> Option<Vec3> {
    let origin = mask.apply_point(&graph.nodes[node].position);
    // (ray, weight, masked neighbour position)
    let mut rays: Vec<_> = graph
        .neighbors(node)
        .filter_map(|n| {
            let p = mask.apply_point(&graph.nodes[n].position);
            let delta = p - origin;
            let ray = try_normalize(&delta)?;
            Some((ray, 1.0 / delta.norm(), p))
        })
        .collect();

    let raw = match rays.len() {
        0 | 1 => return None,
        2 => {
            let (a, b) = (rays[0].0, rays[1].0);
            if a.dot(&b).abs() >= PARALLEL_DOT {
                return None;
            }
            try_normalize(&a.cross(&b))?
        }
        _ => {
            rays.sort_by(|a, b| b.1.total_cmp(&a.1));
            plane_normal(&rays[0].2, &rays[1].2, &rays[2].2)
                .or_else(|| least_parallel_cross(&rays.iter().map(|r| r.0).collect::<Vec<_>>()))?
        }
    };
    Some(revise(raw, &graph.nodes[node].traverse_direction))
}

fn least_parallel_cross(rays: &[Vec3]) -> Option<Vec3> {
    let mut best: Option<(f64, Vec3)> = None;
    for (i, a) in rays.iter().enumerate() {
        for b in &rays[i + 1..] {
            let dot = a.dot(b).abs();
            if best.map_or(true, |(d, _)| dot < d) {
                best = Some((dot, a.cross(b)));
            }
        }
    }
    best.and_then(|(_, n)| try_normalize(&n))
}

/// A normal too close to the tangent cannot orient a cut.
fn revise(raw: Vec3, traverse: &Vec3) -> Vec3 {
    let fallback = base_normal_from_traverse_direction(traverse);
    if raw.dot(traverse).abs() > PARALLEL_DOT {
        return fallback;
    }
    if raw.dot(&fallback) < 0.0 {
        -raw
    } else {
        raw
    }
}

/// Replace every initial normal by the radius-weighted average of the
/// existing ones, each flipped to agree with the running sum.
fn average_initial_base_normals(graph: &mut StrokeGraph) {
    let mut sum = Vec3::zeros();
    for node in &graph.nodes {
        if let Some(n) = node.initial_base_normal {
            let v = n * node.radius;
            sum += if sum.dot(&v) < 0.0 { -v } else { v };
        }
    }
    if let Some(average) = try_normalize(&sum) {
        for node in graph.nodes.iter_mut() {
            node.initial_base_normal = Some(average);
        }
    }
}

/// Breadth-first search for a usable normal, one ring of neighbours at a
/// time. Within a ring, already resolved normals win over initial ones.
fn search_base_normal_from_neighbors(graph: &StrokeGraph, start: usize) -> Option<Vec3> {
    let mut visited = vec![false; graph.node_count()];
    visited[start] = true;
    let mut level: Vec<usize> = vec![start];
    while !level.is_empty() {
        let mut next = Vec::new();
        for &node in &level {
            for n in graph.neighbors(node) {
                if !visited[n] {
                    visited[n] = true;
                    next.push(n);
                }
            }
        }
        let nodes = &graph.nodes;
        let found = next
            .iter()
            .find(|&&n| nodes[n].base_normal_resolved)
            .map(|&n| nodes[n].base_normal)
            .or_else(|| next.iter().find_map(|&n| nodes[n].initial_base_normal));
        if found.is_some() {
            return found;
        }
        level = next;
    }
    None
}

/// Flood `normal` from `start` along chains, stopping at branch nodes.
/// Chain nodes with an initial normal of their own pass that on instead.
fn propagate_base_normal(graph: &mut StrokeGraph, start: usize, normal: Vec3) {
    let mut queue = VecDeque::from([(start, normal)]);
    while let Some((node, normal)) = queue.pop_front() {
        if graph.nodes[node].base_normal_resolved {
            continue;
        }
        graph.nodes[node].base_normal = normal;
        graph.nodes[node].base_normal_resolved = true;
        let next: Vec<usize> = graph.neighbors(node).collect();
        for n in next {
            if graph.nodes[n].base_normal_resolved {
                continue;
            }
            match graph.degree(n) {
                1 => queue.push_back((n, normal)),
                2 => queue.push_back((n, graph.nodes[n].initial_base_normal.unwrap_or(normal))),
                _ => {}
            }
        }
    }
}

/// Flip any normal facing away from its predecessor in visitation order.
fn unify_base_normals(graph: &mut StrokeGraph) {
    let mut order: Vec<usize> = (0..graph.node_count()).collect();
    order.sort_by_key(|&n| graph.nodes[n].traverse_order);
    let mut previous: Option<Vec3> = None;
    for node in order {
        let normal = &mut graph.nodes[node].base_normal;
        if let Some(prev) = previous {
            if normal.dot(&prev) <= 0.0 {
                *normal = -*normal;
            }
        }
        previous = Some(*normal);
    }
}

fn local_average_base_normals(graph: &mut StrokeGraph) {
    let averaged: Vec<Vec3> = (0..graph.node_count())
        .map(|node| {
            let sum = graph
                .neighbors(node)
                .fold(graph.nodes[node].base_normal, |acc, n| acc + graph.nodes[n].base_normal);
            try_normalize(&sum).unwrap_or(graph.nodes[node].base_normal)
        })
        .collect();
    for (node, normal) in graph.nodes.iter_mut().zip(averaged) {
        node.base_normal = normal;
    }
}
