//! The stroke mesh builder.

use std::collections::{BTreeMap, HashSet};

use image::GrayImage;
use strokemesh_math::{Point3, Vec2, Vec3};
use strokemesh_ops::{Face, MeshValidator, SolidValidator};
use strokemesh_stitch::{GiftWrapper, RingStitcher, Stitcher};
use tracing::{debug, warn};

use crate::base_normal::resolve_base_normals;
use crate::buffers::{CutInfo, MeshBuffers};
use crate::config::BuilderConfig;
use crate::cut::CutFaceTransform;
use crate::direction::{resolve_initial_traverse_directions, resolve_traverse_directions};
use crate::error::Result;
use crate::graph::StrokeGraph;
use crate::order::sort_node_indices;
use crate::primitive::{box_subdivisions, build_box_mesh};
use crate::wrap::WrapStats;

/// Output buffers of a finished build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Consistently wound polygons.
    pub faces: Vec<Face>,
    /// Node each vertex was generated for.
    pub source_nodes: Vec<usize>,
    /// Cut normal of the ring each vertex belongs to.
    pub cut_directions: Vec<Vec3>,
    /// Position of each vertex within its ring.
    pub cut_infos: Vec<CutInfo>,
}

/// Turns a graph of sized joints into a closed polygon mesh.
///
/// Nodes and edges are added first, then [`build`](Self::build) runs
/// every pass once. The builder is single use: later calls to `build`
/// return the first result without recomputing.
///
/// ```
/// use strokemesh::{StrokeMeshBuilder, Point3};
///
/// let mut builder = StrokeMeshBuilder::new();
/// let a = builder.add_node(Point3::new(0.0, 0.0, 0.0), 0.5, Vec::new(), 0.0);
/// let b = builder.add_node(Point3::new(0.0, 0.0, 2.0), 0.5, Vec::new(), 0.0);
/// builder.add_edge(a, b).unwrap();
/// assert!(builder.build());
/// assert_eq!(builder.generated_vertices().len(), 8);
/// ```
pub struct StrokeMeshBuilder {
    pub(crate) graph: StrokeGraph,
    pub(crate) config: BuilderConfig,
    pub(crate) deform_map: Option<GrayImage>,
    pub(crate) tube_stitcher: Box<dyn Stitcher + Send>,
    pub(crate) branch_stitcher: Box<dyn Stitcher + Send>,
    pub(crate) validator: Box<dyn MeshValidator + Send>,
    pub(crate) buffers: MeshBuffers,
    pub(crate) swallowed_edges: HashSet<usize>,
    pub(crate) swallowed_nodes: HashSet<usize>,
    pub(crate) wrap_stats: BTreeMap<usize, WrapStats>,
    result: Option<bool>,
}

impl Default for StrokeMeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StrokeMeshBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrokeMeshBuilder")
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("config", &self.config)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl StrokeMeshBuilder {
    /// Empty builder with the default configuration and collaborators.
    pub fn new() -> Self {
        Self {
            graph: StrokeGraph::default(),
            config: BuilderConfig::default(),
            deform_map: None,
            tube_stitcher: Box::new(RingStitcher),
            branch_stitcher: Box::new(GiftWrapper::default()),
            validator: Box::new(SolidValidator::default()),
            buffers: MeshBuffers::default(),
            swallowed_edges: HashSet::new(),
            swallowed_nodes: HashSet::new(),
            wrap_stats: BTreeMap::new(),
            result: None,
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// Stitcher joining the two rings of a chain segment.
    pub fn with_tube_stitcher(mut self, stitcher: impl Stitcher + Send + 'static) -> Self {
        self.tube_stitcher = Box::new(stitcher);
        self
    }

    /// Stitcher capping the rings around a branch node.
    pub fn with_branch_stitcher(mut self, stitcher: impl Stitcher + Send + 'static) -> Self {
        self.branch_stitcher = Box::new(stitcher);
        self
    }

    /// Oracle every branch cap must satisfy.
    pub fn with_validator(mut self, validator: impl MeshValidator + Send + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Add a joint; an empty template selects the default square.
    pub fn add_node(&mut self, position: Point3, radius: f64, cut_template: Vec<Vec2>, cut_rotation: f64) -> usize {
        self.graph.add_node(position, radius, cut_template, cut_rotation)
    }

    /// Connect two joints.
    pub fn add_edge(&mut self, a: usize, b: usize) -> Result<usize> {
        self.graph.add_edge(a, b)
    }

    /// Record the chain segment `node` was interpolated on.
    pub fn set_node_origin_info(&mut self, node: usize, near: usize, far: usize) -> Result<()> {
        self.graph.set_node_origin_info(node, near, far)
    }

    /// Scale of cross-sections along their base normal.
    pub fn set_deform_thickness(&mut self, thickness: f64) {
        self.config.deform_thickness = thickness;
    }

    /// Scale of cross-sections across their base normal.
    pub fn set_deform_width(&mut self, width: f64) {
        self.config.deform_width = width;
    }

    /// Grayscale displacement map, or `None` to disable it.
    pub fn set_deform_map_image(&mut self, image: Option<GrayImage>) {
        self.deform_map = image;
    }

    /// Displacement per unit of map gray level, in radii.
    pub fn set_deform_map_scale(&mut self, scale: f64) {
        self.config.deform_map_scale = scale;
    }

    /// Inner shell offset as a fraction of the radius; 0 keeps the mesh solid.
    pub fn set_hollow_thickness(&mut self, thickness: f64) {
        self.config.hollow_thickness = thickness;
    }

    /// Let the X coordinate take part in base-normal derivation.
    pub fn enable_base_normal_on_x(&mut self, enabled: bool) {
        self.config.base_normal_on_x = enabled;
    }

    /// Let the Y coordinate take part in base-normal derivation.
    pub fn enable_base_normal_on_y(&mut self, enabled: bool) {
        self.config.base_normal_on_y = enabled;
    }

    /// Let the Z coordinate take part in base-normal derivation.
    pub fn enable_base_normal_on_z(&mut self, enabled: bool) {
        self.config.base_normal_on_z = enabled;
    }

    /// Pull every initial base normal toward the graph-wide average.
    pub fn enable_base_normal_average(&mut self, enabled: bool) {
        self.config.base_normal_average = enabled;
    }

    /// Generate the mesh.
    ///
    /// Returns `false` if any node failed to get its cuts or branch cap,
    /// or a tube could not be stitched; the buffers then hold a
    /// best-effort mesh.
    pub fn build(&mut self) -> bool {
        if let Some(result) = self.result {
            warn!("build() called again on a finished builder");
            return result;
        }
        debug!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "building stroke mesh"
        );
        let result = self.run();
        self.result = Some(result);
        debug!(
            vertices = self.buffers.vertices.len(),
            faces = self.buffers.faces.len(),
            succeeded = result,
            "stroke mesh built"
        );
        result
    }

    fn run(&mut self) -> bool {
        if let Err(err) = self.config.validate() {
            warn!(%err, "refusing to build");
            return false;
        }
        let succeeded = match self.graph.node_count() {
            0 => return true,
            1 => {
                self.add_box_for_node(0);
                true
            }
            _ => self.generate_graph_mesh(),
        };
        self.apply_weld();
        self.apply_deform();
        self.finalize_hollow();
        succeeded
    }

    fn generate_graph_mesh(&mut self) -> bool {
        let sorted = sort_node_indices(&self.graph);
        resolve_initial_traverse_directions(&mut self.graph, &sorted);
        resolve_traverse_directions(&mut self.graph, &sorted);
        resolve_base_normals(&mut self.graph, &sorted, &self.config);
        for node in 0..self.graph.node_count() {
            crate::place::update_cut_normal(&mut self.graph, node);
        }

        let mut succeeded = true;
        for &node in &sorted {
            if !self.generate_cuts_for_node(node) {
                warn!(node, "failed to generate cuts");
                succeeded = false;
            }
        }
        if !self.stitch_edge_cuts() {
            succeeded = false;
        }
        succeeded
    }

    pub(crate) fn add_box_for_node(&mut self, node: usize) {
        let n = &self.graph.nodes[node];
        let (position, radius) = (n.position, n.radius);
        let (vertices, faces) = build_box_mesh(position, radius, box_subdivisions(n.cut_template.len()));
        let base = self.buffers.vertices.len();
        let cut_size = vertices.len();
        for (order_in_cut, v) in vertices.into_iter().enumerate() {
            let direction = strokemesh_math::try_normalize(&(v - position)).unwrap_or_else(Vec3::z);
            self.buffers
                .push_vertex(v, node, direction, CutInfo { order_in_cut, cut_size });
        }
        self.buffers
            .faces
            .extend(faces.into_iter().map(|f| f.into_iter().map(|i| base + i).collect()));
    }

    /// Collapse vertices recorded by branch welding. Safe to call again.
    pub fn apply_weld(&mut self) {
        self.buffers.apply_weld();
    }

    /// Current configuration.
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Vertex positions generated so far.
    pub fn generated_vertices(&self) -> &[Point3] {
        &self.buffers.vertices
    }

    /// Generated polygons.
    pub fn generated_faces(&self) -> &[Face] {
        &self.buffers.faces
    }

    /// Node each vertex was generated for.
    pub fn generated_vertices_source_node_indices(&self) -> &[usize] {
        &self.buffers.source_nodes
    }

    /// Cut normal of the ring each vertex belongs to.
    pub fn generated_vertices_cut_directions(&self) -> &[Vec3] {
        &self.buffers.cut_directions
    }

    /// Position of each vertex within its ring.
    pub fn generated_vertices_cut_infos(&self) -> &[CutInfo] {
        &self.buffers.cut_infos
    }

    /// Resolved tangent of `node`.
    pub fn node_traverse_direction(&self, node: usize) -> Option<Vec3> {
        self.graph.node(node).map(|n| n.traverse_direction)
    }

    /// Resolved base normal of `node`.
    pub fn node_base_normal(&self, node: usize) -> Option<Vec3> {
        self.graph.node(node).map(|n| n.base_normal)
    }

    /// Visitation order of `node`.
    pub fn node_traverse_order(&self, node: usize) -> Option<usize> {
        self.graph.node(node).and_then(|n| n.traverse_order)
    }

    /// Template mapping of the cut generated at a leaf or chain node.
    pub fn node_adjustable_cut_face_transform(&self, node: usize) -> Option<&CutFaceTransform> {
        self.graph.node(node).and_then(|n| n.cut_face_transform.as_ref())
    }

    /// Edges currently attached to `node`, after any swallowing.
    pub fn node_edge_indices(&self, node: usize) -> Option<&[usize]> {
        self.graph.node(node).map(|n| n.edges.as_slice())
    }

    /// Number of cut rings registered on `edge`.
    pub fn edge_cut_count(&self, edge: usize) -> Option<usize> {
        self.graph.edge(edge).map(|e| e.cuts.len())
    }

    /// Whether `node` was spliced out of a branch.
    pub fn is_node_swallowed(&self, node: usize) -> bool {
        self.swallowed_nodes.contains(&node)
    }

    /// Branch wrap statistics of `node`, if it is a branch node.
    pub fn wrap_stats(&self, node: usize) -> Option<&WrapStats> {
        self.wrap_stats.get(&node)
    }

    /// Move the generated buffers out of the builder.
    pub fn into_mesh(self) -> GeneratedMesh {
        let buffers = self.buffers;
        GeneratedMesh {
            vertices: buffers.vertices,
            faces: buffers.faces,
            source_nodes: buffers.source_nodes,
            cut_directions: buffers.cut_directions,
            cut_infos: buffers.cut_infos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::regular_polygon_template;
    use approx::assert_relative_eq;
    use strokemesh_ops::is_manifold;

    fn chain(builder: &mut StrokeMeshBuilder, points: &[Point3], radius: f64) -> Vec<usize> {
        let nodes: Vec<usize> = points
            .iter()
            .map(|p| builder.add_node(*p, radius, Vec::new(), 0.0))
            .collect();
        for pair in nodes.windows(2) {
            builder.add_edge(pair[0], pair[1]).unwrap();
        }
        nodes
    }

    fn straight_chain(builder: &mut StrokeMeshBuilder) -> Vec<usize> {
        chain(
            builder,
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(4.0, 0.0, 0.0),
            ],
            0.5,
        )
    }

    /// Three points 3 from the origin, exactly 120 degrees apart.
    fn y_leaf_positions() -> [Point3; 3] {
        let s = 1.5 * 3f64.sqrt();
        [Point3::new(3.0, 0.0, 0.0), Point3::new(-1.5, s, 0.0), Point3::new(-1.5, -s, 0.0)]
    }

    /// Hub at the origin with three leaves in the XY plane.
    fn y_branch(builder: &mut StrokeMeshBuilder) -> (usize, Vec<usize>) {
        let hub = builder.add_node(Point3::origin(), 1.0, Vec::new(), 0.0);
        let leaves = y_leaf_positions()
            .into_iter()
            .map(|p| {
                let leaf = builder.add_node(p, 0.5, Vec::new(), 0.0);
                builder.add_edge(hub, leaf).unwrap();
                leaf
            })
            .collect();
        (hub, leaves)
    }

    #[test]
    fn test_empty_graph_builds_nothing() {
        let mut builder = StrokeMeshBuilder::new();
        assert!(builder.build());
        assert!(builder.generated_vertices().is_empty());
    }

    #[test]
    fn test_single_node_is_a_box() {
        let mut builder = StrokeMeshBuilder::new();
        builder.add_node(Point3::new(1.0, 1.0, 1.0), 0.5, Vec::new(), 0.0);
        assert!(builder.build());
        assert_eq!(builder.generated_vertices().len(), 8);
        assert_eq!(builder.generated_faces().len(), 6);
        assert!(is_manifold(builder.generated_faces()));
        assert!(builder.generated_vertices_source_node_indices().iter().all(|&n| n == 0));

        let mut octagon = StrokeMeshBuilder::new();
        octagon.add_node(Point3::origin(), 0.5, regular_polygon_template(8), 0.0);
        assert!(octagon.build());
        assert_eq!(octagon.generated_vertices().len(), 26);
        assert_eq!(octagon.generated_faces().len(), 24);
    }

    #[test]
    fn test_single_node_box_is_finished() {
        let center = Point3::new(1.0, 1.0, 1.0);
        let mut builder = StrokeMeshBuilder::new();
        builder.add_node(center, 0.5, Vec::new(), 0.0);
        builder.set_hollow_thickness(0.25);
        assert!(builder.build());
        assert_eq!(builder.generated_vertices().len(), 16);
        assert_eq!(builder.generated_faces().len(), 12);
        assert!(is_manifold(builder.generated_faces()));
        let vertices = builder.generated_vertices();
        for i in 0..8 {
            assert_relative_eq!(vertices[i + 8] - center, (vertices[i] - center) * 0.75, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_isolated_node_next_to_a_chain() {
        let mut builder = StrokeMeshBuilder::new();
        straight_chain(&mut builder);
        builder.add_node(Point3::new(0.0, 10.0, 0.0), 1.0, Vec::new(), 0.0);
        assert!(builder.build());
        assert_eq!(builder.generated_vertices().len(), 12 + 8);
        assert_eq!(builder.generated_faces().len(), 10 + 6);
        assert!(is_manifold(builder.generated_faces()));
    }

    #[test]
    fn test_straight_chain_is_a_tube() {
        let mut builder = StrokeMeshBuilder::new();
        let nodes = straight_chain(&mut builder);
        assert!(builder.build());
        assert_eq!(builder.generated_vertices().len(), 12);
        assert_eq!(builder.generated_faces().len(), 10);
        assert!(is_manifold(builder.generated_faces()));

        let rings: Vec<Vec<Point3>> = nodes
            .iter()
            .map(|&n| {
                let vertices = builder.generated_vertices();
                builder
                    .generated_vertices_source_node_indices()
                    .iter()
                    .enumerate()
                    .filter(|&(_, &source)| source == n)
                    .map(|(i, _)| vertices[i] - Vec3::new(2.0 * n as f64, 0.0, 0.0))
                    .collect()
            })
            .collect();
        for ring in &rings {
            assert_eq!(ring.len(), 4);
            for p in ring {
                assert!(rings[0].iter().any(|q| (p - q).norm() < 1e-9));
            }
        }
        for &n in &nodes {
            assert!(builder.node_adjustable_cut_face_transform(n).is_some());
        }
    }

    #[test]
    fn test_chain_cut_infos() {
        let mut builder = StrokeMeshBuilder::new();
        straight_chain(&mut builder);
        builder.build();
        let infos = builder.generated_vertices_cut_infos();
        assert_eq!(infos.len(), 12);
        assert!(infos.iter().all(|info| info.cut_size == 4 && info.order_in_cut < 4));
        for d in builder.generated_vertices_cut_directions() {
            assert_relative_eq!(d.x.abs(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_second_build_returns_cached_result() {
        let mut builder = StrokeMeshBuilder::new();
        straight_chain(&mut builder);
        assert!(builder.build());
        let faces = builder.generated_faces().to_vec();
        assert!(builder.build());
        assert_eq!(builder.generated_faces(), faces.as_slice());
    }

    #[test]
    fn test_branch_is_manifold() {
        let mut builder = StrokeMeshBuilder::new();
        let (hub, leaves) = y_branch(&mut builder);
        assert!(builder.build());
        assert!(is_manifold(builder.generated_faces()));
        for edge in builder.node_edge_indices(hub).unwrap() {
            assert_eq!(builder.edge_cut_count(*edge), Some(2));
        }
        let stats = builder.wrap_stats(hub).unwrap();
        assert!(stats.succeeded);
        assert_eq!(stats.attempts, 1);
        assert!(leaves.iter().all(|&l| builder.wrap_stats(l).is_none()));
    }

    #[test]
    fn test_rejecting_validator_bounds_retries() {
        let mut builder =
            StrokeMeshBuilder::new().with_validator(|_: &[Point3], _: &[Face]| false);
        let (hub, _) = y_branch(&mut builder);
        assert!(!builder.build());
        let stats = builder.wrap_stats(hub).unwrap();
        assert!(!stats.succeeded);
        assert_eq!(stats.attempts, 10);
        assert!(stats.attempts <= 10 * 3);
    }

    #[test]
    fn test_short_arm_is_swallowed() {
        let mut builder = StrokeMeshBuilder::new();
        let hub = builder.add_node(Point3::origin(), 1.0, Vec::new(), 0.0);
        let mid = builder.add_node(Point3::new(0.8, 0.0, 0.0), 0.5, Vec::new(), 0.0);
        let tip = builder.add_node(Point3::new(5.0, 0.0, 0.0), 0.5, Vec::new(), 0.0);
        builder.add_edge(hub, mid).unwrap();
        let outer = builder.add_edge(mid, tip).unwrap();
        for p in &y_leaf_positions()[1..] {
            let leaf = builder.add_node(*p, 0.5, Vec::new(), 0.0);
            builder.add_edge(hub, leaf).unwrap();
        }
        assert!(builder.build());
        assert!(builder.is_node_swallowed(mid));
        assert!(!builder.is_node_swallowed(tip));
        assert_eq!(builder.node_edge_indices(hub).unwrap()[0], outer);
        assert_eq!(builder.edge_cut_count(outer), Some(2));
        assert!(builder.wrap_stats(hub).unwrap().swallowed_edges >= 1);
        assert!(is_manifold(builder.generated_faces()));
        assert!(builder
            .generated_vertices_source_node_indices()
            .iter()
            .all(|&n| n != mid));
    }

    #[test]
    fn test_weld_is_idempotent_after_build() {
        let mut builder = StrokeMeshBuilder::new();
        y_branch(&mut builder);
        builder.build();
        let vertices = builder.generated_vertices().to_vec();
        let faces = builder.generated_faces().to_vec();
        builder.apply_weld();
        assert_eq!(builder.generated_vertices(), vertices.as_slice());
        assert_eq!(builder.generated_faces(), faces.as_slice());
    }

    #[test]
    fn test_invalid_config_fails_build() {
        let config = BuilderConfig {
            wrap_step_back_factor: 2.0,
            ..Default::default()
        };
        let mut builder = StrokeMeshBuilder::new().with_config(config);
        straight_chain(&mut builder);
        assert!(!builder.build());
        assert!(builder.generated_vertices().is_empty());
    }

    #[test]
    fn test_into_mesh_moves_buffers() {
        let mut builder = StrokeMeshBuilder::new();
        straight_chain(&mut builder);
        builder.build();
        let vertex_count = builder.generated_vertices().len();
        let mesh = builder.into_mesh();
        assert_eq!(mesh.vertices.len(), vertex_count);
        assert_eq!(mesh.source_nodes.len(), vertex_count);
        assert_eq!(mesh.faces.len(), 10);
    }

    #[test]
    fn test_builder_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<StrokeMeshBuilder>();
    }
}
