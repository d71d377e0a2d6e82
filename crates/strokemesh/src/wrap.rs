//! Branch wrapping: capping a node of degree three or more.
//!
//! Every incident edge gets a ring placed on the node's sphere, the
//! rings are wrapped into one cap and the cap is checked. Failing rings
//! are pushed out along their edge a step at a time; once a ring cannot
//! move further, the short chain segment behind it is swallowed so the
//! edge reaches one node further. Each node gets at most
//! `ceil(1 / step) × degree` attempts.

use std::collections::BTreeSet;

use strokemesh_math::{angle_between_degrees, try_normalize, Vec3};
use strokemesh_ops::{is_manifold, Face};
use strokemesh_stitch::CutRing;
use tracing::{debug, trace, warn};

use crate::builder::StrokeMeshBuilder;
use crate::cut::{make_cut, CutRequest};
use crate::place::update_cut_normal;

/// Placements within this fraction of the neighbour radius swallow the edge.
const SWALLOW_REACH: f64 = 0.5;

/// Bounds on the half-angle of the cone each ring occupies, in degrees.
const MIN_HALF_ANGLE: f64 = 15.0;
const MAX_HALF_ANGLE: f64 = 45.0;

/// Outcome of wrapping one branch node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WrapStats {
    /// Attempts made, including ones restarted by a swallow.
    pub attempts: usize,
    /// Edges swallowed while searching.
    pub swallowed_edges: usize,
    /// Whether a cap was committed.
    pub succeeded: bool,
}

enum Attempt {
    Wrapped,
    Swallowed(Swallow),
    Failed(BTreeSet<usize>),
}

/// Record of one chain node spliced out of a branch, enough to undo it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Swallow {
    slot: usize,
    edge: usize,
    neighbor: usize,
    onward_edge: usize,
    onward: usize,
}

impl StrokeMeshBuilder {
    pub(crate) fn try_wrap_multiple_branches_for_node(&mut self, node: usize) -> bool {
        let degree = self.graph.degree(node);
        let step = self.config.wrap_step_back_factor;
        let max_attempts = (1.0 / step).ceil() as usize * degree;
        let mut steps = vec![0usize; degree];
        let mut stats = WrapStats::default();
        let mut swallows = Vec::new();

        while stats.attempts < max_attempts {
            stats.attempts += 1;
            let failed = match self.wrap_attempt(node, &steps) {
                Attempt::Wrapped => {
                    stats.succeeded = true;
                    break;
                }
                Attempt::Swallowed(swallow) => {
                    swallows.push(swallow);
                    stats.swallowed_edges += 1;
                    continue;
                }
                Attempt::Failed(slots) => slots,
            };
            trace!(node, attempt = stats.attempts, ?failed, "branch wrap failed");

            let mut stepped = false;
            for &slot in &failed {
                if ((steps[slot] + 1) as f64 * step) < 1.0 - 1e-9 {
                    steps[slot] += 1;
                    stepped = true;
                }
            }
            if stepped {
                continue;
            }
            match failed.iter().find_map(|&slot| self.swallow_edge_for_node(node, slot)) {
                Some(swallow) => {
                    steps[swallow.slot] = 0;
                    swallows.push(swallow);
                    stats.swallowed_edges += 1;
                }
                None => break,
            }
        }

        if stats.succeeded {
            debug!(node, attempts = stats.attempts, swallowed = stats.swallowed_edges, "branch wrapped");
        } else {
            for swallow in swallows.iter().rev() {
                self.restore_swallowed_edge(node, swallow);
            }
            warn!(node, attempts = stats.attempts, "branch wrap gave up");
        }
        self.wrap_stats.insert(node, stats);
        stats.succeeded
    }

    /// One speculative wrap. Buffers are only kept on success.
    fn wrap_attempt(&mut self, node: usize, steps: &[usize]) -> Attempt {
        let degree = self.graph.degree(node);
        let checkpoint = self.buffers.checkpoint();
        let center = self.graph.nodes[node].position;
        let radius = self.graph.nodes[node].radius;
        let base_normal = self.graph.nodes[node].base_normal;

        let rays: Vec<Vec3> = self
            .graph
            .neighbors(node)
            .map(|n| try_normalize(&(self.graph.nodes[n].position - center)).unwrap_or_else(Vec3::z))
            .collect();

        let mut rings = Vec::with_capacity(degree);
        for slot in 0..degree {
            let neighbor = self.graph.neighbor_at(node, slot);
            let ray = rays[slot];
            let neighbor_radius = self.graph.nodes[neighbor].radius;
            let length = (self.graph.nodes[neighbor].position - center).norm();

            let min_angle = rays
                .iter()
                .enumerate()
                .filter(|&(other, _)| other != slot)
                .map(|(_, r)| angle_between_degrees(&ray, r))
                .fold(180.0, f64::min);
            let half_angle = (0.5 * min_angle)
                .clamp(MIN_HALF_ANGLE, MAX_HALF_ANGLE)
                .to_radians();
            let base_distance = radius * half_angle.cos();
            let base_radius = radius * half_angle.sin();
            let offset = steps[slot] as f64 * self.config.wrap_step_back_factor;
            let distance = base_distance + offset * (length - radius - neighbor_radius).max(0.0);

            if distance >= length - neighbor_radius * SWALLOW_REACH {
                if let Some(swallow) = self.swallow_edge_for_node(node, slot) {
                    self.buffers.rollback(checkpoint);
                    return Attempt::Swallowed(swallow);
                }
            }

            let t = ((distance - base_distance) / (length - base_distance).max(1e-9)).clamp(0.0, 1.0);
            let ring_radius = base_radius + (neighbor_radius - base_radius) * t;
            let nb = &self.graph.nodes[neighbor];
            let extent = nb
                .cut_template
                .iter()
                .map(|p| p.norm())
                .fold(0.0, f64::max)
                .max(1e-12);

            let cut_normal = self.onward_blended_ray(node, neighbor, ray);
            let cut = make_cut(&CutRequest {
                position: center + ray * distance,
                radius: ring_radius / extent,
                template: &nb.cut_template,
                rotation: nb.cut_rotation,
                base_normal,
                cut_normal,
                traverse_direction: nb.traverse_direction,
            });
            let vertices = self.buffers.push_ring(&cut.points, node, cut_normal);
            rings.push(CutRing::new(vertices, -cut_normal));
        }

        let outward: Vec<CutRing> = rings.iter().map(CutRing::reversed).collect();
        let all_slots = || (0..degree).collect::<BTreeSet<usize>>();
        let cap = match self.branch_stitcher.stitch(&self.buffers.vertices, &outward) {
            Ok(cap) => cap,
            Err(err) => {
                self.buffers.rollback(checkpoint);
                let slots: BTreeSet<usize> = err
                    .failed_edge_loops()
                    .iter()
                    .copied()
                    .filter(|&s| s < degree)
                    .collect();
                return Attempt::Failed(if slots.is_empty() { all_slots() } else { slots });
            }
        };

        let mut closed: Vec<Face> = cap.clone();
        closed.extend(outward.iter().map(|r| r.vertices.clone()));
        if !is_manifold(&closed) || !self.validator.is_valid(&self.buffers.vertices, &closed) {
            self.buffers.rollback(checkpoint);
            return Attempt::Failed(all_slots());
        }

        self.weld_close_ring_vertices(&rings, radius * self.config.wrap_weld_factor);
        self.buffers.faces.extend(cap);
        for (slot, ring) in rings.into_iter().enumerate() {
            let edge = self.graph.nodes[node].edges[slot];
            self.graph.edges[edge].cuts.push(ring);
        }
        Attempt::Wrapped
    }

    /// The ray toward `neighbor`, bent toward where the chain continues
    /// when the neighbour is a chain node.
    fn onward_blended_ray(&self, node: usize, neighbor: usize, ray: Vec3) -> Vec3 {
        if self.graph.degree(neighbor) != 2 {
            return ray;
        }
        let onward = self
            .graph
            .neighbors(neighbor)
            .find(|&n| n != node)
            .and_then(|n| try_normalize(&(self.graph.nodes[n].position - self.graph.nodes[neighbor].position)));
        onward
            .and_then(|onward| try_normalize(&(ray + onward)))
            .unwrap_or(ray)
    }

    fn weld_close_ring_vertices(&mut self, rings: &[CutRing], threshold: f64) {
        let vertices = &self.buffers.vertices;
        for (i, first) in rings.iter().enumerate() {
            for second in &rings[i + 1..] {
                for &a in &first.vertices {
                    for &b in &second.vertices {
                        if !self.buffers.weld_map.contains_key(&a) && (vertices[a] - vertices[b]).norm() < threshold {
                            self.buffers.weld_map.insert(b, a);
                        }
                    }
                }
            }
        }
    }

    /// Splice the chain node behind `slot` out of the branch, so the
    /// slot's edge continues to the node after it.
    ///
    /// Only possible when the neighbour is an unswallowed chain node
    /// whose far side is not already adjacent to `node`.
    pub(crate) fn swallow_edge_for_node(&mut self, node: usize, slot: usize) -> Option<Swallow> {
        let edge = self.graph.nodes[node].edges[slot];
        if self.swallowed_edges.contains(&edge) {
            return None;
        }
        let neighbor = self.graph.edges[edge].neighbor_of(node);
        if self.graph.degree(neighbor) != 2 || self.swallowed_nodes.contains(&neighbor) {
            return None;
        }
        let onward_edge = *self.graph.nodes[neighbor].edges.iter().find(|&&e| e != edge)?;
        if self.swallowed_edges.contains(&onward_edge) {
            return None;
        }
        let onward = self.graph.edges[onward_edge].neighbor_of(neighbor);
        if onward == node || self.graph.neighbors(node).any(|n| n == onward) {
            return None;
        }

        self.swallowed_edges.insert(edge);
        self.swallowed_nodes.insert(neighbor);
        self.graph.edges[onward_edge].replace_endpoint(neighbor, node);
        self.graph.nodes[node].edges[slot] = onward_edge;
        update_cut_normal(&mut self.graph, onward);
        debug!(node, swallowed = neighbor, "swallowed chain node");
        Some(Swallow {
            slot,
            edge,
            neighbor,
            onward_edge,
            onward,
        })
    }

    /// Put a swallowed chain node back between `node` and its onward node.
    fn restore_swallowed_edge(&mut self, node: usize, swallow: &Swallow) {
        self.graph.edges[swallow.onward_edge].replace_endpoint(node, swallow.neighbor);
        self.graph.nodes[node].edges[swallow.slot] = swallow.edge;
        self.swallowed_edges.remove(&swallow.edge);
        self.swallowed_nodes.remove(&swallow.neighbor);
        update_cut_normal(&mut self.graph, swallow.onward);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strokemesh_math::Point3;
    use strokemesh_ops::{MeshValidator, SolidValidator};

    use crate::config::BuilderConfig;

    /// Unit directions of an exactly symmetric three-way junction.
    fn y_directions() -> [Vec3; 3] {
        let s = 3f64.sqrt() / 2.0;
        [Vec3::x(), Vec3::new(-0.5, s, 0.0), Vec3::new(-0.5, -s, 0.0)]
    }

    /// Hub with one arm through a chain node and two plain leaves.
    fn arm_graph(builder: &mut StrokeMeshBuilder, mid_at: f64) -> (usize, usize, usize) {
        let hub = builder.add_node(Point3::origin(), 1.0, Vec::new(), 0.0);
        let mid = builder.add_node(Point3::new(mid_at, 0.0, 0.0), 0.5, Vec::new(), 0.0);
        let tip = builder.add_node(Point3::new(mid_at + 3.0, 0.0, 0.0), 0.5, Vec::new(), 0.0);
        builder.add_edge(hub, mid).unwrap();
        builder.add_edge(mid, tip).unwrap();
        for dir in &y_directions()[1..] {
            let leaf = builder.add_node(Point3::from(dir * 3.0), 0.5, Vec::new(), 0.0);
            builder.add_edge(hub, leaf).unwrap();
        }
        (hub, mid, tip)
    }

    /// Hub with a leaf three units out along each of `directions`.
    fn star(builder: &mut StrokeMeshBuilder, directions: &[Vec3]) -> usize {
        let hub = builder.add_node(Point3::origin(), 1.0, Vec::new(), 0.0);
        for dir in directions {
            let leaf = builder.add_node(Point3::from(dir * 3.0), 0.5, Vec::new(), 0.0);
            builder.add_edge(hub, leaf).unwrap();
        }
        hub
    }

    fn cross_directions() -> [Vec3; 4] {
        [Vec3::x(), Vec3::y(), -Vec3::x(), -Vec3::y()]
    }

    fn hub_vertices(builder: &StrokeMeshBuilder, hub: usize) -> Vec<Point3> {
        let vertices = builder.generated_vertices();
        builder
            .generated_vertices_source_node_indices()
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n == hub)
            .map(|(i, _)| vertices[i])
            .collect()
    }

    #[test]
    fn test_swallow_redirects_edge() {
        let mut builder = StrokeMeshBuilder::new();
        let (hub, mid, tip) = arm_graph(&mut builder, 3.0);
        let before = builder.graph.nodes[hub].edges[0];
        assert!(builder.swallow_edge_for_node(hub, 0).is_some());
        let after = builder.graph.nodes[hub].edges[0];
        assert_ne!(before, after);
        assert_eq!(builder.graph.edges[after].neighbor_of(hub), tip);
        assert!(builder.is_node_swallowed(mid));
        assert!(builder.swallowed_edges.contains(&before));
        // The tip now faces the hub.
        assert!(builder.graph.nodes[tip].cut_normal.x < 0.0);
        // A leaf cannot be swallowed, nor can the same slot twice.
        assert!(builder.swallow_edge_for_node(hub, 1).is_none());
        assert!(builder.swallow_edge_for_node(hub, 0).is_none());
    }

    #[test]
    fn test_swallow_refuses_existing_neighbour() {
        let mut builder = StrokeMeshBuilder::new();
        let (hub, _, tip) = arm_graph(&mut builder, 3.0);
        builder.add_edge(hub, tip).unwrap();
        // The tip is now a chain node reachable directly from the hub.
        assert!(builder.swallow_edge_for_node(hub, 0).is_none());
    }

    #[test]
    fn test_restore_undoes_swallow() {
        let mut builder = StrokeMeshBuilder::new();
        let (hub, mid, tip) = arm_graph(&mut builder, 3.0);
        crate::place::update_cut_normal(&mut builder.graph, tip);
        let edges = builder.graph.nodes[hub].edges.clone();
        let tip_normal = builder.graph.nodes[tip].cut_normal;

        let swallow = builder.swallow_edge_for_node(hub, 0).unwrap();
        builder.restore_swallowed_edge(hub, &swallow);
        assert_eq!(builder.graph.nodes[hub].edges, edges);
        assert_eq!(builder.graph.edges[1].neighbor_of(tip), mid);
        assert!(!builder.is_node_swallowed(mid));
        assert!(builder.swallowed_edges.is_empty());
        assert_eq!(builder.graph.nodes[tip].cut_normal, tip_normal);
    }

    #[test]
    fn test_failed_wrap_restores_swallowed_chain() {
        struct Reject;
        impl strokemesh_stitch::Stitcher for Reject {
            fn stitch(
                &self,
                _: &[Point3],
                _: &[CutRing],
            ) -> strokemesh_stitch::Result<Vec<Face>> {
                Err(strokemesh_stitch::StitchError::Unclosed {
                    failed_loops: vec![0],
                    open_edges: 1,
                })
            }
        }
        let mut builder = StrokeMeshBuilder::new().with_branch_stitcher(Reject);
        let (hub, mid, _) = arm_graph(&mut builder, 3.0);
        let edges = builder.node_edge_indices(hub).unwrap().to_vec();
        assert!(!builder.build());
        let stats = *builder.wrap_stats(hub).unwrap();
        assert!(!stats.succeeded);
        // Ten step-backs, one swallow, ten more step-backs.
        assert_eq!(stats.attempts, 20);
        assert_eq!(stats.swallowed_edges, 1);
        assert!(stats.attempts <= 10 * 3);

        // The search's swallow is undone, so the chain keeps its node.
        assert!(!builder.is_node_swallowed(mid));
        assert_eq!(builder.node_edge_indices(hub).unwrap(), edges.as_slice());
        assert_eq!(builder.edge_cut_count(0), Some(1));
        assert_eq!(builder.edge_cut_count(1), Some(2));
        assert!(hub_vertices(&builder, hub).is_empty());
    }

    #[test]
    fn test_successful_cap_passes_default_oracle() {
        let mut builder = StrokeMeshBuilder::new();
        let (hub, _, _) = arm_graph(&mut builder, 3.0);
        assert!(builder.build());
        let stats = builder.wrap_stats(hub).unwrap();
        assert!(stats.succeeded);
        assert!(stats.attempts >= 1);
        let solid = SolidValidator {
            check_self_intersections: false,
            ..Default::default()
        };
        assert!(solid.is_valid(builder.generated_vertices(), builder.generated_faces()));
    }

    #[test]
    fn test_symmetric_junctions_wrap_first_time() {
        let six = [Vec3::x(), -Vec3::x(), Vec3::y(), -Vec3::y(), Vec3::z(), -Vec3::z()];
        for directions in [&y_directions()[..], &cross_directions()[..], &six[..]] {
            let mut builder = StrokeMeshBuilder::new();
            let hub = star(&mut builder, directions);
            assert!(builder.build(), "{} arms", directions.len());
            assert!(is_manifold(builder.generated_faces()));
            let stats = builder.wrap_stats(hub).unwrap();
            assert!(stats.succeeded);
            for &edge in builder.node_edge_indices(hub).unwrap() {
                assert_eq!(builder.edge_cut_count(edge), Some(2));
            }
        }

        let mut cross = StrokeMeshBuilder::new();
        let hub = star(&mut cross, &cross_directions());
        assert!(cross.build());
        assert_eq!(cross.wrap_stats(hub).unwrap().attempts, 1);
        assert_eq!(hub_vertices(&cross, hub).len(), 16);
    }

    #[test]
    fn test_t_junction_of_chains() {
        let mut builder = StrokeMeshBuilder::new();
        let hub = builder.add_node(Point3::origin(), 1.0, Vec::new(), 0.0);
        let mut mids = Vec::new();
        for dir in [Vec3::x(), -Vec3::x(), Vec3::y()] {
            let mid = builder.add_node(Point3::from(dir * 3.0), 0.5, Vec::new(), 0.0);
            let tip = builder.add_node(Point3::from(dir * 6.0), 0.5, Vec::new(), 0.0);
            builder.add_edge(hub, mid).unwrap();
            builder.add_edge(mid, tip).unwrap();
            mids.push(mid);
        }
        assert!(builder.build());
        assert!(is_manifold(builder.generated_faces()));
        assert_eq!(builder.wrap_stats(hub).unwrap().swallowed_edges, 0);
        assert!(mids.iter().all(|&m| !builder.is_node_swallowed(m)));
    }

    #[test]
    fn test_rejected_cap_succeeds_after_stepping_back() {
        // Only caps whose rings all sit at least 1.05 from the hub pass.
        let far_enough = |vertices: &[Point3], faces: &[Face]| {
            faces
                .iter()
                .flatten()
                .all(|&v| vertices[v].coords.norm() >= 1.05)
        };
        let mut builder = StrokeMeshBuilder::new().with_validator(far_enough);
        let hub = star(&mut builder, &cross_directions());
        assert!(builder.build());
        assert!(is_manifold(builder.generated_faces()));
        let stats = builder.wrap_stats(hub).unwrap();
        assert!(stats.succeeded);
        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.swallowed_edges, 0);
        // First placement puts ring corners exactly on the hub sphere.
        for v in hub_vertices(&builder, hub) {
            assert!(v.coords.norm() >= 1.05);
        }
    }

    #[test]
    fn test_close_ring_corners_are_welded() {
        let mut plain = StrokeMeshBuilder::new();
        star(&mut plain, &cross_directions());
        assert!(plain.build());
        assert_eq!(plain.generated_vertices().len(), 32);

        // Corners of neighbouring rings are about 0.29 apart.
        let config = BuilderConfig {
            wrap_weld_factor: 0.3,
            ..Default::default()
        };
        let mut welded = StrokeMeshBuilder::new().with_config(config);
        let hub = star(&mut welded, &cross_directions());
        assert!(welded.build());
        assert!(welded.buffers.weld_map.is_empty());
        assert_eq!(welded.generated_vertices().len(), 32 - 8);
        assert_eq!(hub_vertices(&welded, hub).len(), 8);
        assert!(is_manifold(welded.generated_faces()));
    }
}
