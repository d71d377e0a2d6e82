//! Edge-triangle and triangle-triangle intersection tests.

use strokemesh_math::Point3;

/// Segment `e0`-`e1` against triangle `v0 v1 v2` (Möller-Trumbore).
///
/// Returns the parameter along the segment (`0` at `e0`, `1` at `e1`)
/// of the hit, or `None` when the segment misses or runs parallel to
/// the triangle plane.
pub fn edge_triangle_intersect(
    e0: &Point3,
    e1: &Point3,
    v0: &Point3,
    v1: &Point3,
    v2: &Point3,
    epsilon: f64,
) -> Option<f64> {
    let direction = e1 - e0;
    if direction.norm_squared() < epsilon * epsilon {
        return None;
    }

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);
    if a.abs() < epsilon {
        return None;
    }

    let f = 1.0 / a;
    let s = e0 - v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    if t < -epsilon || t > 1.0 + epsilon {
        return None;
    }
    Some(t.clamp(0.0, 1.0))
}

/// True if triangles `a` and `b` intersect, tested as the six edges of
/// one against the face of the other.
pub fn triangles_intersect(a: [&Point3; 3], b: [&Point3; 3], epsilon: f64) -> bool {
    edges_cross_face(a, b, epsilon) || edges_cross_face(b, a, epsilon)
}

fn edges_cross_face(edges: [&Point3; 3], face: [&Point3; 3], epsilon: f64) -> bool {
    (0..3).any(|k| {
        edge_triangle_intersect(edges[k], edges[(k + 1) % 3], face[0], face[1], face[2], epsilon).is_some()
    })
}
