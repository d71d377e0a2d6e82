//! Angle-weighted vertex normals with a hard-edge threshold.

use strokemesh_math::{angle_between_degrees, plane_normal, triangle_area, Point3, Vec3};

use crate::Triangle;

/// Unit face normal of every triangle; zero for degenerate triangles.
pub fn triangle_normals(vertices: &[Point3], triangles: &[Triangle]) -> Vec<Vec3> {
    triangles
        .iter()
        .map(|t| plane_normal(&vertices[t[0]], &vertices[t[1]], &vertices[t[2]]).unwrap_or_else(Vec3::zeros))
        .collect()
}

/// Per-corner normals for `triangles`.
///
/// Each corner's normal is the sum of the normals of every triangle
/// sharing that vertex, weighted by triangle area times the corner angle,
/// restricted to triangles whose face normal is within
/// `threshold_degrees` of the corner's own face. Corners whose sum
/// vanishes keep the face normal.
pub fn angle_smooth(vertices: &[Point3], triangles: &[Triangle], threshold_degrees: f64) -> Vec<[Vec3; 3]> {
    let face_normals = triangle_normals(vertices, triangles);

    let mut incident: Vec<Vec<(usize, f64)>> = vec![Vec::new(); vertices.len()];
    for (fi, tri) in triangles.iter().enumerate() {
        let area = triangle_area(&vertices[tri[0]], &vertices[tri[1]], &vertices[tri[2]]);
        for k in 0..3 {
            let p = vertices[tri[k]];
            let a = vertices[tri[(k + 1) % 3]] - p;
            let b = vertices[tri[(k + 2) % 3]] - p;
            let angle = angle_between_degrees(&a, &b).to_radians();
            incident[tri[k]].push((fi, area * angle));
        }
    }

    triangles
        .iter()
        .enumerate()
        .map(|(fi, tri)| {
            let own = face_normals[fi];
            tri.map(|v| {
                let sum = incident[v]
                    .iter()
                    .filter(|&&(other, _)| angle_between_degrees(&own, &face_normals[other]) <= threshold_degrees)
                    .fold(Vec3::zeros(), |acc, &(other, weight)| acc + face_normals[other] * weight);
                strokemesh_math::try_normalize(&sum).unwrap_or(own)
            })
        })
        .collect()
}
