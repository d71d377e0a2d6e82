//! Tube stitching between two rings.

use strokemesh_math::Point3;
use strokemesh_ops::Face;

use crate::{CutRing, Result, StitchError, Stitcher};

/// Joins two facing rings with a band of faces.
///
/// Both rings must face away from each other (each ring's winding
/// normal points away from the other ring). Rings of equal size are
/// joined with quads at the cyclic alignment that minimizes total
/// twist; otherwise triangles are zipped greedily along the shorter
/// diagonal.
#[derive(Debug, Clone, Copy, Default)]
pub struct RingStitcher;

impl Stitcher for RingStitcher {
    fn stitch(&self, vertices: &[Point3], rings: &[CutRing]) -> Result<Vec<Face>> {
        let [first, second] = rings else {
            return Err(StitchError::RingCount {
                expected: 2,
                found: rings.len(),
            });
        };
        for (i, ring) in rings.iter().enumerate() {
            if ring.len() < 3 {
                return Err(StitchError::DegenerateRing(i));
            }
        }

        let a = &first.vertices;
        let b: Vec<usize> = second.vertices.iter().rev().copied().collect();
        if a.len() == b.len() {
            Ok(stitch_quads(vertices, first, a, &b, second))
        } else {
            Ok(stitch_zip(vertices, a, &b))
        }
    }
}

/// Quads `[a(i+1), a(i), b(i+o), b(i+1+o)]` with the offset `o` that
/// best lines up the two rings around their centroids.
fn stitch_quads(vertices: &[Point3], first: &CutRing, a: &[usize], b: &[usize], second: &CutRing) -> Vec<Face> {
    let n = a.len();
    let ca = first.centroid(vertices);
    let cb = second.centroid(vertices);

    let cost = |offset: usize| -> f64 {
        (0..n)
            .map(|i| ((vertices[a[i]] - ca) - (vertices[b[(i + offset) % n]] - cb)).norm_squared())
            .sum()
    };
    let offset = (0..n)
        .min_by(|&x, &y| cost(x).total_cmp(&cost(y)))
        .unwrap_or(0);

    (0..n)
        .map(|i| {
            vec![
                a[(i + 1) % n],
                a[i],
                b[(i + offset) % n],
                b[(i + 1 + offset) % n],
            ]
        })
        .collect()
}

/// Greedy triangle zip for rings of different sizes.
fn stitch_zip(vertices: &[Point3], a: &[usize], b: &[usize]) -> Vec<Face> {
    let (na, nb) = (a.len(), b.len());
    let start = (0..nb)
        .min_by(|&x, &y| {
            let dx = (vertices[b[x]] - vertices[a[0]]).norm_squared();
            let dy = (vertices[b[y]] - vertices[a[0]]).norm_squared();
            dx.total_cmp(&dy)
        })
        .unwrap_or(0);

    let mut faces = Vec::with_capacity(na + nb);
    let (mut i, mut j) = (0, 0);
    while i < na || j < nb {
        let ai = a[i % na];
        let ai1 = a[(i + 1) % na];
        let bj = b[(start + j) % nb];
        let bj1 = b[(start + j + 1) % nb];
        let advance_a = if i == na {
            false
        } else if j == nb {
            true
        } else {
            (vertices[ai1] - vertices[bj]).norm_squared() <= (vertices[ai] - vertices[bj1]).norm_squared()
        };
        if advance_a {
            faces.push(vec![ai1, ai, bj]);
            i += 1;
        } else {
            faces.push(vec![bj, bj1, ai]);
            j += 1;
        }
    }
    faces
}
