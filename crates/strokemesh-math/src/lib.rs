#![warn(missing_docs)]

//! Math types for the strokemesh engine.
//!
//! Thin wrappers around nalgebra providing the points, vectors,
//! directions and affine transforms used by
//! the stroke graph, the cut generator and the mesh kernels, plus a
//! handful of vector helpers that are shared between them.

use nalgebra::{Matrix4, Rotation3, Unit, Vector2, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// Homogeneous affine map used to place cut templates in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Column-major homogeneous matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Pure translation by `offset`.
    pub fn translation(offset: &Vec3) -> Self {
        Self {
            matrix: Matrix4::new_translation(offset),
        }
    }

    /// Frame transform mapping the local X/Y/Z axes onto `x`, `y`, `z`
    /// and the local origin onto `origin`.
    pub fn from_basis(x: &Vec3, y: &Vec3, z: &Vec3, origin: &Point3) -> Self {
        let mut matrix = Matrix4::identity();
        for (column, axis) in [x, y, z, &origin.coords].into_iter().enumerate() {
            matrix.fixed_view_mut::<3, 1>(0, column).copy_from(axis);
        }
        Self { matrix }
    }

    /// Right-handed rotation by `angle` radians about `axis` through the origin.
    pub fn rotation_about_axis(axis: &Dir3, angle: f64) -> Self {
        Self {
            matrix: Rotation3::from_axis_angle(axis, angle).to_homogeneous(),
        }
    }

    /// `self * other`: `other` is applied first.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Map a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        self.matrix.transform_point(p)
    }

    /// The inverse map, or `None` for a singular frame.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }
}

/// Normalizes `v`, or returns `None` when it is too short (or not finite)
/// to carry a direction.
pub fn try_normalize(v: &Vec3) -> Option<Vec3> {
    let len = v.norm();
    if len.is_finite() && len > 1e-12 {
        Some(v / len)
    } else {
        None
    }
}

/// Unit normal of the plane through `a`, `b`, `c` following the
/// right-hand rule, or `None` for collinear points.
pub fn plane_normal(a: &Point3, b: &Point3, c: &Point3) -> Option<Vec3> {
    try_normalize(&(b - a).cross(&(c - a)))
}

/// Winding normal of a closed polygon (Newell's method).
pub fn polygon_normal<'a, I>(points: I) -> Option<Vec3>
where
    I: IntoIterator<Item = &'a Point3>,
    I::IntoIter: Clone,
{
    let iter = points.into_iter();
    let mut next = iter.clone().cycle().skip(1);
    let mut n = Vec3::zeros();
    for p in iter {
        let q = next.next()?;
        n.x += (p.y - q.y) * (p.z + q.z);
        n.y += (p.z - q.z) * (p.x + q.x);
        n.z += (p.x - q.x) * (p.y + q.y);
    }
    try_normalize(&n)
}

/// Unsigned angle between two vectors in degrees, in `[0, 180]`.
pub fn angle_between_degrees(a: &Vec3, b: &Vec3) -> f64 {
    let denom = a.norm() * b.norm();
    if denom <= 0.0 {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Angle in degrees, in `[0, 360)`, turning `from` into `to`
/// counter-clockwise when viewed from the tip of `axis`.
///
/// Both vectors are projected onto the plane perpendicular to `axis`
/// first; a degenerate projection yields `0`.
pub fn signed_angle_degrees(from: &Vec3, to: &Vec3, axis: &Vec3) -> f64 {
    let Some(axis) = try_normalize(axis) else {
        return 0.0;
    };
    let a = from - axis * from.dot(&axis);
    let b = to - axis * to.dot(&axis);
    if a.norm() <= 1e-12 || b.norm() <= 1e-12 {
        return 0.0;
    }
    let angle = a.cross(&b).dot(&axis).atan2(a.dot(&b)).to_degrees();
    if angle < 0.0 {
        angle + 360.0
    } else {
        angle
    }
}

/// Area of triangle `abc`.
pub fn triangle_area(a: &Point3, b: &Point3, c: &Point3) -> f64 {
    0.5 * (b - a).cross(&(c - a)).norm()
}

/// Unit vector along world axis `index` (0 = X, 1 = Y, 2 = Z).
pub fn axis_vector(index: usize) -> Vec3 {
    match index {
        0 => Vec3::x(),
        1 => Vec3::y(),
        _ => Vec3::z(),
    }
}

/// Index of the world axis most aligned with `v`, and the signed
/// dot product of `v` with it.
pub fn most_aligned_axis(v: &Vec3) -> (usize, f64) {
    (0..3)
        .map(|i| (i, v[i]))
        .fold((0, v[0]), |best, cur| {
            if cur.1.abs() > best.1.abs() {
                cur
            } else {
                best
            }
        })
}

/// Index of the world axis least aligned with `v`.
pub fn least_aligned_axis(v: &Vec3) -> usize {
    (0..3)
        .min_by(|&a, &b| v[a].abs().total_cmp(&v[b].abs()))
        .unwrap_or(2)
}
