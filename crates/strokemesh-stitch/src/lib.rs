#![warn(missing_docs)]

//! Skin stitching between cut rings.
//!
//! A cut ring is a closed loop of vertex indices whose winding normal
//! points away from the body it will be joined to. Stitchers turn a set
//! of such rings into faces that, together with the rings themselves,
//! close the surface between them:
//!
//! - [`RingStitcher`] joins exactly two rings into a tube
//! - [`GiftWrapper`] wraps any number of rings into a convex cap

mod error;
mod gift;
mod ring;

pub use error::{Result, StitchError};
pub use gift::GiftWrapper;
pub use ring::RingStitcher;

use strokemesh_math::{Point3, Vec3};
use strokemesh_ops::Face;

/// A closed vertex loop produced by one cut.
#[derive(Debug, Clone, PartialEq)]
pub struct CutRing {
    /// Vertex indices in winding order.
    pub vertices: Vec<usize>,
    /// Direction the ring faces, matching its winding normal.
    pub normal: Vec3,
}

impl CutRing {
    /// Create a ring from its vertex loop and facing direction.
    pub fn new(vertices: Vec<usize>, normal: Vec3) -> Self {
        Self { vertices, normal }
    }

    /// The same loop wound the other way, facing the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            vertices: self.vertices.iter().rev().copied().collect(),
            normal: -self.normal,
        }
    }

    /// Number of vertices in the loop.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// True if the loop has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Average position of the loop's vertices.
    pub fn centroid(&self, vertices: &[Point3]) -> Point3 {
        if self.vertices.is_empty() {
            return Point3::origin();
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vec3::zeros(), |acc, &i| acc + vertices[i].coords);
        Point3::from(sum / self.vertices.len() as f64)
    }
}

/// Produces faces that join cut rings.
///
/// `rings` reference positions in `vertices`. On failure the error
/// names the ring indices ("edge loops") that could not be closed, so
/// the caller can adjust just those rings and retry.
pub trait Stitcher {
    /// Stitch `rings` together, returning the new faces.
    fn stitch(&self, vertices: &[Point3], rings: &[CutRing]) -> Result<Vec<Face>>;
}
