//! Per-node cut placement for leaves and chain nodes.

use strokemesh_math::{try_normalize, Vec3};
use strokemesh_stitch::CutRing;

use crate::builder::StrokeMeshBuilder;
use crate::cut::{make_cut, CutRequest};
use crate::graph::StrokeGraph;

/// Multiplier applied to the near/far distance fraction when blending
/// chain cut normals.
const ORIGIN_BLEND_FACTOR: f64 = 1.75;

/// Recompute the cut normal of `node` from its current neighbours.
///
/// Leaves face their neighbour, chain nodes bisect their two rays and
/// everything else follows the traverse direction.
pub(crate) fn update_cut_normal(graph: &mut StrokeGraph, node: usize) {
    let position = graph.nodes[node].position;
    let rays: Vec<Vec3> = graph
        .neighbors(node)
        .map(|n| try_normalize(&(graph.nodes[n].position - position)).unwrap_or_else(Vec3::zeros))
        .collect();
    let traverse = graph.nodes[node].traverse_direction;
    graph.nodes[node].cut_normal = match rays.as_slice() {
        [ray] => try_normalize(ray).unwrap_or(traverse),
        [a, b] => try_normalize(&(a - b)).unwrap_or(traverse),
        _ => traverse,
    };
}

/// Blend a chain node's cut normal toward the cut normal of whichever
/// origin node it is closer to.
///
/// `near_distance` and `far_distance` are the node's distances to the
/// two origin nodes. The closer origin's normal gets weight `1 - f` and
/// the node's own normal weight `f`, where `f` is 1.75 times the
/// distance fraction to that origin. The result keeps the sign of
/// `node_cut`.
pub fn blend_cut_normal(node_cut: &Vec3, near_cut: &Vec3, far_cut: &Vec3, near_distance: f64, far_distance: f64) -> Vec3 {
    let total = near_distance + far_distance;
    if total <= 0.0 {
        return *node_cut;
    }
    let mut factor = near_distance / total;
    let mut origin = near_cut;
    if factor > 0.5 {
        factor = 1.0 - factor;
        origin = far_cut;
    }
    factor *= ORIGIN_BLEND_FACTOR;
    let origin = if node_cut.dot(origin) <= 0.0 { -origin } else { *origin };
    let Some(blended) = try_normalize(&(node_cut * factor + origin * (1.0 - factor))) else {
        return *node_cut;
    };
    if blended.dot(node_cut) <= 0.0 {
        -blended
    } else {
        blended
    }
}

impl StrokeMeshBuilder {
    /// Generate and register the cuts of one node.
    ///
    /// Returns `false` only when a branch node could not be wrapped.
    pub(crate) fn generate_cuts_for_node(&mut self, node: usize) -> bool {
        if self.swallowed_nodes.contains(&node) {
            return true;
        }
        match self.graph.degree(node) {
            0 => {
                self.add_box_for_node(node);
                true
            }
            1 => {
                self.generate_leaf_cut(node);
                true
            }
            2 => {
                self.generate_chain_cut(node);
                true
            }
            _ => self.try_wrap_multiple_branches_for_node(node),
        }
    }

    fn generate_leaf_cut(&mut self, node: usize) {
        let cut_normal = self.graph.nodes[node].cut_normal;
        let ring = self.place_node_cut(node, cut_normal);
        if self.config.hollow_thickness > 0.0 {
            self.buffers.end_cuts.push(ring.vertices.clone());
        } else {
            self.buffers.faces.push(ring.vertices.clone());
        }
        let edge = self.graph.nodes[node].edges[0];
        self.graph.edges[edge].cuts.push(ring);
    }

    fn generate_chain_cut(&mut self, node: usize) {
        let mut cut_normal = self.graph.nodes[node].cut_normal;
        if let Some(blended) = self.origin_blended_cut_normal(node) {
            cut_normal = blended;
        }
        let ring = self.place_node_cut(node, cut_normal);
        let (first, second) = (self.graph.nodes[node].edges[0], self.graph.nodes[node].edges[1]);
        self.graph.edges[second].cuts.push(ring.reversed());
        self.graph.edges[first].cuts.push(ring);
    }

    fn origin_blended_cut_normal(&self, node: usize) -> Option<Vec3> {
        let n = &self.graph.nodes[node];
        let (near, far) = (n.near_origin?, n.far_origin?);
        if self.graph.degree(near) > 2 || self.graph.degree(far) > 2 {
            return None;
        }
        let (near, far) = (&self.graph.nodes[near], &self.graph.nodes[far]);
        Some(blend_cut_normal(
            &n.cut_normal,
            &near.cut_normal,
            &far.cut_normal,
            (n.position - near.position).norm(),
            (n.position - far.position).norm(),
        ))
    }

    /// Cut `node` with its own template, append the ring and remember
    /// its template mapping. The ring faces away from `cut_normal`.
    fn place_node_cut(&mut self, node: usize, cut_normal: Vec3) -> CutRing {
        let n = &self.graph.nodes[node];
        let cut = make_cut(&CutRequest {
            position: n.position,
            radius: n.radius,
            template: &n.cut_template,
            rotation: n.cut_rotation,
            base_normal: n.base_normal,
            cut_normal,
            traverse_direction: n.traverse_direction,
        });
        let vertices = self.buffers.push_ring(&cut.points, node, cut_normal);
        self.graph.nodes[node].cut_face_transform = Some(cut.transform);
        CutRing::new(vertices, -cut_normal)
    }
}
