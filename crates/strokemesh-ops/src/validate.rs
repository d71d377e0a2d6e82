//! Mesh validity oracle.

use strokemesh_math::{triangle_area, Point3};

use crate::{is_manifold, triangles_intersect, triangulate, Face, Triangle};

/// Well-formedness check consulted before a branch wrap is accepted.
///
/// Implementations must not mutate or retain the mesh; they only answer
/// whether the given closed polygon set is usable as a solid.
pub trait MeshValidator {
    /// Returns true if `faces` over `vertices` form a valid solid.
    fn is_valid(&self, vertices: &[Point3], faces: &[Face]) -> bool;
}

impl<F> MeshValidator for F
where
    F: Fn(&[Point3], &[Face]) -> bool,
{
    fn is_valid(&self, vertices: &[Point3], faces: &[Face]) -> bool {
        self(vertices, faces)
    }
}

/// Default oracle: the mesh must triangulate completely, be a closed
/// 2-manifold without degenerate triangles and, optionally, free of
/// intersections between triangles that share no vertex.
#[derive(Debug, Clone, Copy)]
pub struct SolidValidator {
    /// Reject meshes whose non-adjacent triangles intersect.
    pub check_self_intersections: bool,
    /// Triangles with an area below this are degenerate.
    pub area_epsilon: f64,
    /// Tolerance for the edge-triangle intersection test.
    pub intersection_epsilon: f64,
}

impl Default for SolidValidator {
    fn default() -> Self {
        Self {
            check_self_intersections: true,
            area_epsilon: 1e-12,
            intersection_epsilon: 1e-9,
        }
    }
}

impl MeshValidator for SolidValidator {
    fn is_valid(&self, vertices: &[Point3], faces: &[Face]) -> bool {
        let triangulation = triangulate(vertices, faces);
        if !triangulation.is_complete() {
            return false;
        }
        let triangles = triangulation.triangles;
        if triangles
            .iter()
            .any(|t| triangle_area(&vertices[t[0]], &vertices[t[1]], &vertices[t[2]]) < self.area_epsilon)
        {
            return false;
        }
        let tri_faces: Vec<Face> = triangles.iter().map(|t| t.to_vec()).collect();
        if !is_manifold(&tri_faces) {
            return false;
        }
        !(self.check_self_intersections && has_self_intersection(vertices, &triangles, self.intersection_epsilon))
    }
}

fn corners<'a>(vertices: &'a [Point3], t: &Triangle) -> [&'a Point3; 3] {
    [&vertices[t[0]], &vertices[t[1]], &vertices[t[2]]]
}

fn has_self_intersection(vertices: &[Point3], triangles: &[Triangle], epsilon: f64) -> bool {
    let bounds: Vec<(Point3, Point3)> = triangles
        .iter()
        .map(|t| {
            let [a, b, c] = corners(vertices, t);
            (a.inf(&b.inf(c)), a.sup(&b.sup(c)))
        })
        .collect();

    for i in 0..triangles.len() {
        for j in (i + 1)..triangles.len() {
            let (ti, tj) = (&triangles[i], &triangles[j]);
            if ti.iter().any(|v| tj.contains(v)) {
                continue;
            }
            let (lo_i, hi_i) = &bounds[i];
            let (lo_j, hi_j) = &bounds[j];
            if (0..3).any(|k| lo_i[k] > hi_j[k] + epsilon || lo_j[k] > hi_i[k] + epsilon) {
                continue;
            }
            if triangles_intersect(corners(vertices, ti), corners(vertices, tj), epsilon) {
                return true;
            }
        }
    }
    false
}
