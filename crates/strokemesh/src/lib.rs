#![warn(missing_docs)]

//! Stroke-to-mesh synthesis.
//!
//! Turns a graph of sized joints ("stroke nodes") joined by edges into
//! one closed polygon mesh. [`StrokeMeshBuilder::build`] runs these
//! passes in order:
//!
//! 1. order nodes, branch nodes first ([`sort_node_indices`])
//! 2. resolve a tangent per node from a depth-first walk
//! 3. resolve and smooth a base normal per node
//! 4. place a cross-section ring at every leaf and chain node
//!    ([`make_cut`]), and wrap a cap around every branch node,
//!    backing rings off or swallowing short segments until the cap is
//!    a valid solid
//! 5. stitch the two rings on every edge into a tube
//! 6. weld vertices merged by branch capping, deform, and optionally
//!    hollow out the result
//!
//! A graph with a single node yields a box.
//!
//! # Example
//!
//! ```
//! use strokemesh::{is_manifold, Point3, StrokeMeshBuilder};
//!
//! let mut builder = StrokeMeshBuilder::new();
//! let hub = builder.add_node(Point3::origin(), 1.0, Vec::new(), 0.0);
//! for k in 0..3 {
//!     let t = std::f64::consts::TAU * k as f64 / 3.0;
//!     let leaf = builder.add_node(Point3::new(3.0 * t.cos(), 3.0 * t.sin(), 0.0), 0.5, Vec::new(), 0.0);
//!     builder.add_edge(hub, leaf).unwrap();
//! }
//! assert!(builder.build());
//! assert!(is_manifold(builder.generated_faces()));
//! ```

mod base_normal;
mod buffers;
mod builder;
mod config;
mod cut;
mod direction;
mod error;
mod finish;
mod graph;
mod order;
mod place;
mod primitive;
mod wrap;

pub use base_normal::{base_normal_from_traverse_direction, resolve_base_normals};
pub use buffers::CutInfo;
pub use builder::{GeneratedMesh, StrokeMeshBuilder};
pub use config::BuilderConfig;
pub use cut::{make_cut, Cut, CutFaceTransform, CutRequest};
pub use direction::{resolve_initial_traverse_directions, resolve_traverse_directions};
pub use error::{BuilderError, Result};
pub use graph::{default_cut_template, regular_polygon_template, StrokeEdge, StrokeGraph, StrokeNode};
pub use order::sort_node_indices;
pub use place::blend_cut_normal;
pub use primitive::{box_subdivisions, build_box_mesh};
pub use wrap::WrapStats;

pub use strokemesh_math::{Point3, Vec2, Vec3};
pub use strokemesh_ops::{is_manifold, Face, MeshValidator, SolidValidator};
pub use strokemesh_stitch::{CutRing, GiftWrapper, RingStitcher, StitchError, Stitcher};
