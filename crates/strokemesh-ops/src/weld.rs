//! Seam welding for triangle meshes.

use std::collections::{HashMap, HashSet};

use strokemesh_math::Point3;

use crate::Triangle;

/// Upper bound on remap hops when resolving chained welds.
pub const MAX_WELD_CHASE: usize = 500;

/// Vertices with more incident faces than this are never merged away.
const MAX_MERGED_VALENCE: usize = 4;

/// Output of [`weld_seam`].
#[derive(Debug, Clone, Default)]
pub struct SeamWeld {
    /// Compacted vertex positions, in first-reference order.
    pub vertices: Vec<Point3>,
    /// Remapped triangles; faces that collapsed are dropped.
    pub triangles: Vec<Triangle>,
    /// Number of vertices merged into a seam partner.
    pub welded_count: usize,
}

/// Closes short seam edges on a triangle mesh.
///
/// For every edge shorter than `threshold` that has an opposing face,
/// the endpoint with fewer incident faces (at most four) is merged into
/// the other one. Both faces on the seam collapse and are dropped.
/// Chained merges are resolved with at most [`MAX_WELD_CHASE`] hops.
pub fn weld_seam(vertices: &[Point3], triangles: &[Triangle], threshold: f64) -> SeamWeld {
    let mut valence = vec![0usize; vertices.len()];
    let mut edge_face: HashMap<(usize, usize), usize> = HashMap::new();
    for (fi, tri) in triangles.iter().enumerate() {
        for k in 0..3 {
            valence[tri[k]] += 1;
            edge_face.insert((tri[k], tri[(k + 1) % 3]), fi);
        }
    }

    let threshold_sq = threshold * threshold;
    let mut weld_map: HashMap<usize, usize> = HashMap::new();
    let mut touched: HashSet<usize> = HashSet::new();
    for (fi, tri) in triangles.iter().enumerate() {
        if touched.contains(&fi) {
            continue;
        }
        for k in 0..3 {
            let (a, b) = (tri[k], tri[(k + 1) % 3]);
            if (vertices[a] - vertices[b]).norm_squared() >= threshold_sq {
                continue;
            }
            let Some(&opposite) = edge_face.get(&(b, a)) else {
                continue;
            };
            if touched.contains(&opposite) {
                continue;
            }
            let (from, to) = if valence[a] <= valence[b] { (a, b) } else { (b, a) };
            if valence[from] > MAX_MERGED_VALENCE || weld_map.contains_key(&from) {
                continue;
            }
            weld_map.insert(from, to);
            touched.insert(fi);
            touched.insert(opposite);
            break;
        }
    }

    let resolve = |v: usize| {
        let mut cur = v;
        for _ in 0..MAX_WELD_CHASE {
            match weld_map.get(&cur) {
                Some(&next) if next != cur => cur = next,
                _ => break,
            }
        }
        cur
    };

    let mut new_index: HashMap<usize, usize> = HashMap::new();
    let mut out = SeamWeld {
        welded_count: weld_map.len(),
        ..SeamWeld::default()
    };
    for tri in triangles {
        let mapped = tri.map(resolve);
        if mapped[0] == mapped[1] || mapped[1] == mapped[2] || mapped[2] == mapped[0] {
            continue;
        }
        let remapped = mapped.map(|v| {
            *new_index.entry(v).or_insert_with(|| {
                out.vertices.push(vertices[v]);
                out.vertices.len() - 1
            })
        });
        out.triangles.push(remapped);
    }
    out
}
