//! Ear-clipping triangulation of polygon faces.

use strokemesh_math::{polygon_normal, signed_angle_degrees, Point3, Vec3};

use crate::{Face, Triangle};

/// Smallest turn angle (degrees) accepted at an ear tip.
const MIN_EAR_ANGLE: f64 = 1.0;
/// Largest turn angle (degrees) accepted at an ear tip.
const MAX_EAR_ANGLE: f64 = 179.0;

/// Result of triangulating a face list.
#[derive(Debug, Clone, Default)]
pub struct Triangulation {
    /// Triangles of every face that could be triangulated, in face order.
    pub triangles: Vec<Triangle>,
    /// Indices of faces for which no ear sequence was found.
    pub failed_faces: Vec<usize>,
}

impl Triangulation {
    /// True if every input face was triangulated.
    pub fn is_complete(&self) -> bool {
        self.failed_faces.is_empty()
    }
}

/// Triangulates `faces` by ear clipping.
///
/// An ear tip is accepted when the turn from the incoming to the
/// outgoing edge, measured about the polygon's winding normal, lies in
/// `[1°, 179°]` and no other polygon vertex lies inside the ear. Faces
/// that run out of ears are listed in [`Triangulation::failed_faces`]
/// and contribute no triangles; the rest of the mesh is still processed.
pub fn triangulate(vertices: &[Point3], faces: &[Face]) -> Triangulation {
    let mut result = Triangulation::default();
    for (face_index, face) in faces.iter().enumerate() {
        match face.len() {
            0..=2 => result.failed_faces.push(face_index),
            3 => result.triangles.push([face[0], face[1], face[2]]),
            _ => match ear_clip(vertices, face) {
                Some(tris) => result.triangles.extend(tris),
                None => result.failed_faces.push(face_index),
            },
        }
    }
    result
}

fn ear_clip(vertices: &[Point3], face: &[usize]) -> Option<Vec<Triangle>> {
    let normal = polygon_normal(face.iter().map(|&i| &vertices[i]))?;
    let mut ring: Vec<usize> = face.to_vec();
    let mut out = Vec::with_capacity(face.len() - 2);

    while ring.len() > 3 {
        let n = ring.len();
        let ear = (0..n).find(|&i| {
            let prev = ring[(i + n - 1) % n];
            let tip = ring[i];
            let next = ring[(i + 1) % n];
            is_ear(vertices, &ring, [prev, tip, next], &normal)
        })?;
        out.push([ring[(ear + n - 1) % n], ring[ear], ring[(ear + 1) % n]]);
        ring.remove(ear);
    }

    out.push([ring[0], ring[1], ring[2]]);
    Some(out)
}

fn is_ear(vertices: &[Point3], ring: &[usize], tri: Triangle, normal: &Vec3) -> bool {
    let [prev, tip, next] = tri;
    let (a, b, c) = (&vertices[prev], &vertices[tip], &vertices[next]);
    let turn = signed_angle_degrees(&(b - a), &(c - b), normal);
    if !(MIN_EAR_ANGLE..=MAX_EAR_ANGLE).contains(&turn) {
        return false;
    }
    !ring
        .iter()
        .filter(|&&j| j != prev && j != tip && j != next)
        .any(|&j| point_in_triangle(&vertices[j], a, b, c, normal))
}

/// Inside-or-on-boundary test of `p` against triangle `abc` seen along
/// `normal`. Boundary hits count so that collinear vertices block an ear.
fn point_in_triangle(p: &Point3, a: &Point3, b: &Point3, c: &Point3, normal: &Vec3) -> bool {
    let eps = 1e-12;
    let e0 = (b - a).cross(&(p - a)).dot(normal);
    let e1 = (c - b).cross(&(p - b)).dot(normal);
    let e2 = (a - c).cross(&(p - c)).dot(normal);
    e0 >= -eps && e1 >= -eps && e2 >= -eps
}
