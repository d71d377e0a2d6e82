//! Half-edge manifold check.

use std::collections::HashSet;

use crate::Face;

/// Directed half-edges `(from, to)` of a closed polygon, in winding order.
pub fn face_half_edges(face: &[usize]) -> impl Iterator<Item = (usize, usize)> + '_ {
    let n = face.len();
    (0..n).map(move |i| (face[i], face[(i + 1) % n]))
}

/// Returns true when every directed half-edge across `faces` is unique
/// and is matched by exactly one opposing half-edge.
///
/// This is the closed, consistently oriented 2-manifold condition on
/// edges. An empty face list is trivially manifold.
pub fn is_manifold(faces: &[Face]) -> bool {
    let mut half_edges: HashSet<(usize, usize)> = HashSet::new();
    for face in faces {
        if face.len() < 3 {
            return false;
        }
        for (a, b) in face_half_edges(face) {
            if a == b || !half_edges.insert((a, b)) {
                return false;
            }
        }
    }
    half_edges
        .iter()
        .all(|&(a, b)| half_edges.contains(&(b, a)))
}
