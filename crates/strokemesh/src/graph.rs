//! Stroke graph: sized joints, their connections and cross-section templates.

use std::f64::consts::PI;

use strokemesh_math::{Point3, Vec2, Vec3};
use strokemesh_stitch::CutRing;

use crate::cut::CutFaceTransform;
use crate::error::{BuilderError, Result};

/// A sized joint of the stroke graph.
///
/// The input fields are set when the node is added; the rest are
/// derived during `build()`.
#[derive(Debug, Clone)]
pub struct StrokeNode {
    /// Joint centre.
    pub position: Point3,
    /// Joint radius.
    pub radius: f64,
    /// Counter-clockwise cross-section polygon in profile space.
    pub cut_template: Vec<Vec2>,
    /// Twist of the cross-section about the cut normal, in turns.
    pub cut_rotation: f64,
    /// Upstream hint: node the chain segment starts from.
    pub near_origin: Option<usize>,
    /// Upstream hint: node the chain segment ends at.
    pub far_origin: Option<usize>,
    pub(crate) edges: Vec<usize>,
    pub(crate) initial_traverse_direction: Option<Vec3>,
    pub(crate) traverse_direction: Vec3,
    pub(crate) cut_normal: Vec3,
    pub(crate) initial_base_normal: Option<Vec3>,
    pub(crate) base_normal: Vec3,
    pub(crate) base_normal_resolved: bool,
    pub(crate) traverse_order: Option<usize>,
    pub(crate) cut_face_transform: Option<CutFaceTransform>,
}

impl StrokeNode {
    fn new(position: Point3, radius: f64, cut_template: Vec<Vec2>, cut_rotation: f64) -> Self {
        Self {
            position,
            radius,
            cut_template,
            cut_rotation,
            near_origin: None,
            far_origin: None,
            edges: Vec::new(),
            initial_traverse_direction: None,
            traverse_direction: Vec3::z(),
            cut_normal: Vec3::z(),
            initial_base_normal: None,
            base_normal: Vec3::y(),
            base_normal_resolved: false,
            traverse_order: None,
            cut_face_transform: None,
        }
    }

    /// Number of incident edges.
    pub fn degree(&self) -> usize {
        self.edges.len()
    }
}

/// A connection between two nodes, carrying up to one cut ring per end.
#[derive(Debug, Clone)]
pub struct StrokeEdge {
    /// Endpoint node indices.
    pub nodes: [usize; 2],
    pub(crate) cuts: Vec<CutRing>,
}

impl StrokeEdge {
    /// The endpoint that is not `node`.
    pub fn neighbor_of(&self, node: usize) -> usize {
        if self.nodes[0] == node {
            self.nodes[1]
        } else {
            self.nodes[0]
        }
    }

    pub(crate) fn replace_endpoint(&mut self, from: usize, to: usize) {
        for n in &mut self.nodes {
            if *n == from {
                *n = to;
            }
        }
    }
}

/// Index arena of nodes and edges.
#[derive(Debug, Clone, Default)]
pub struct StrokeGraph {
    pub(crate) nodes: Vec<StrokeNode>,
    pub(crate) edges: Vec<StrokeEdge>,
}

impl StrokeGraph {
    /// Add a node and return its index.
    ///
    /// An empty or degenerate template is replaced by
    /// [`default_cut_template`]; a clockwise template is reversed.
    pub fn add_node(&mut self, position: Point3, radius: f64, cut_template: Vec<Vec2>, cut_rotation: f64) -> usize {
        let template = normalize_template(cut_template);
        self.nodes
            .push(StrokeNode::new(position, radius, template, cut_rotation));
        self.nodes.len() - 1
    }

    /// Connect two existing nodes and return the edge index.
    pub fn add_edge(&mut self, a: usize, b: usize) -> Result<usize> {
        self.check_node(a)?;
        self.check_node(b)?;
        if a == b {
            return Err(BuilderError::SelfLoop(a));
        }
        let index = self.edges.len();
        self.edges.push(StrokeEdge {
            nodes: [a, b],
            cuts: Vec::new(),
        });
        self.nodes[a].edges.push(index);
        self.nodes[b].edges.push(index);
        Ok(index)
    }

    /// Record the near/far chain origin hints of `node`.
    pub fn set_node_origin_info(&mut self, node: usize, near: usize, far: usize) -> Result<()> {
        self.check_node(node)?;
        self.check_node(near)?;
        self.check_node(far)?;
        self.nodes[node].near_origin = Some(near);
        self.nodes[node].far_origin = Some(far);
        Ok(())
    }

    pub(crate) fn check_node(&self, index: usize) -> Result<()> {
        if index < self.nodes.len() {
            Ok(())
        } else {
            Err(BuilderError::NodeOutOfRange {
                index,
                count: self.nodes.len(),
            })
        }
    }

    /// Node at `index`, if any.
    pub fn node(&self, index: usize) -> Option<&StrokeNode> {
        self.nodes.get(index)
    }

    /// Edge at `index`, if any.
    pub fn edge(&self, index: usize) -> Option<&StrokeEdge> {
        self.edges.get(index)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub(crate) fn degree(&self, node: usize) -> usize {
        self.nodes[node].edges.len()
    }

    /// Neighbour of `node` across each incident edge, in edge order.
    pub(crate) fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes[node]
            .edges
            .iter()
            .map(move |&e| self.edges[e].neighbor_of(node))
    }

    pub(crate) fn neighbor_at(&self, node: usize, slot: usize) -> usize {
        self.edges[self.nodes[node].edges[slot]].neighbor_of(node)
    }
}

/// The default cross-section: a unit-circumradius square.
pub fn default_cut_template() -> Vec<Vec2> {
    regular_polygon_template(4)
}

/// Regular counter-clockwise polygon with unit circumradius.
///
/// The first corner sits just clockwise of `-Y`, so a square starts at
/// `(-√½, -√½)`.
pub fn regular_polygon_template(sides: usize) -> Vec<Vec2> {
    let sides = sides.max(3);
    let step = 2.0 * PI / sides as f64;
    let start = -PI / 2.0 - step / 2.0;
    (0..sides)
        .map(|k| {
            let t = start + step * k as f64;
            Vec2::new(t.cos(), t.sin())
        })
        .collect()
}

/// Signed area of a template polygon (positive when counter-clockwise).
pub(crate) fn template_area(template: &[Vec2]) -> f64 {
    let n = template.len();
    0.5 * (0..n)
        .map(|i| {
            let (a, b) = (template[i], template[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
}

fn normalize_template(mut template: Vec<Vec2>) -> Vec<Vec2> {
    if template.len() < 3 {
        return default_cut_template();
    }
    if template_area(&template) < 0.0 {
        template.reverse();
    }
    template
}
