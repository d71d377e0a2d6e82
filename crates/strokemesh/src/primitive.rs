//! Closed primitive emitted for nodes without connections.

use std::collections::HashMap;

use strokemesh_math::{Point3, Vec3};
use strokemesh_ops::Face;

/// Subdivision level matching a cross-section template: a square gives
/// a plain box, every further four template points add one level.
pub fn box_subdivisions(template_len: usize) -> usize {
    (template_len / 4).saturating_sub(1)
}

/// Cube surface around `position` with `subdivisions + 1` segments per
/// edge. Faces are outward-facing quads sharing their vertices, so the
/// mesh has `6n² + 2` vertices and `6n²` faces for `n` segments.
///
/// A plain box has half-size `radius`; subdivided boxes are pushed onto
/// the sphere of `radius`.
pub fn build_box_mesh(position: Point3, radius: f64, subdivisions: usize) -> (Vec<Point3>, Vec<Face>) {
    let n = subdivisions + 1;
    let mut vertices = Vec::new();
    let mut lookup: HashMap<[usize; 3], usize> = HashMap::new();
    let mut faces = Vec::with_capacity(6 * n * n);

    let mut vertex = |key: [usize; 3]| -> usize {
        *lookup.entry(key).or_insert_with(|| {
            let cube = key.map(|k| 2.0 * k as f64 / n as f64 - 1.0);
            let offset = Vec3::from(cube);
            let offset = if subdivisions > 0 {
                offset.normalize() * radius
            } else {
                offset * radius
            };
            vertices.push(position + offset);
            vertices.len() - 1
        })
    };

    for axis in 0..3 {
        let (b, c) = ((axis + 1) % 3, (axis + 2) % 3);
        for positive in [true, false] {
            // b × c points along +axis; swap for the far side.
            let (b, c) = if positive { (b, c) } else { (c, b) };
            let fixed = if positive { n } else { 0 };
            for s in 0..n {
                for t in 0..n {
                    let corner = |ds: usize, dt: usize| {
                        let mut key = [0usize; 3];
                        key[axis] = fixed;
                        key[b] = s + ds;
                        key[c] = t + dt;
                        key
                    };
                    faces.push(vec![
                        vertex(corner(0, 0)),
                        vertex(corner(1, 0)),
                        vertex(corner(1, 1)),
                        vertex(corner(0, 1)),
                    ]);
                }
            }
        }
    }
    (vertices, faces)
}
