#![warn(missing_docs)]

//! Polygon mesh kernels for the strokemesh engine.
//!
//! Meshes are plain index buffers: a `&[Point3]` vertex array plus
//! faces that are variable-length, consistently wound index polygons.
//! The kernels here are:
//!
//! 1. [`is_manifold`]: directed half-edge uniqueness and pairing
//! 2. [`triangulate`]: ear clipping for n-gon faces
//! 3. [`weld_seam`]: merging of short seam edges on triangle meshes
//! 4. [`angle_smooth`]: per-corner normals with hard-edge threshold
//! 5. [`MeshValidator`]: the validity oracle consulted by branch wrapping

mod intersect;
mod manifold;
mod smooth;
mod triangulate;
mod validate;
mod weld;

pub use intersect::{edge_triangle_intersect, triangles_intersect};
pub use manifold::{face_half_edges, is_manifold};
pub use smooth::{angle_smooth, triangle_normals};
pub use triangulate::{triangulate, Triangulation};
pub use validate::{MeshValidator, SolidValidator};
pub use weld::{weld_seam, SeamWeld, MAX_WELD_CHASE};

/// A polygon face: vertex indices in winding order.
pub type Face = Vec<usize>;

/// A triangle: three vertex indices in winding order.
pub type Triangle = [usize; 3];
