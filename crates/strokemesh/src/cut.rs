//! Cross-section generation.

use strokemesh_math::{try_normalize, Dir3, Point3, Transform, Vec2, Vec3};

use crate::base_normal::{base_normal_from_traverse_direction, PARALLEL_DOT};

/// Everything needed to place one cross-section.
#[derive(Debug, Clone)]
pub struct CutRequest<'a> {
    /// Centre of the cut.
    pub position: Point3,
    /// Template scale.
    pub radius: f64,
    /// Counter-clockwise profile polygon.
    pub template: &'a [Vec2],
    /// Twist about the cut normal, in turns.
    pub rotation: f64,
    /// In-plane "up" reference.
    pub base_normal: Vec3,
    /// Axis of the cut.
    pub cut_normal: Vec3,
    /// Local tangent; only decides whether the cut is flipped.
    pub traverse_direction: Vec3,
}

/// A generated cross-section.
#[derive(Debug, Clone)]
pub struct Cut {
    /// Ring of world-space points, one per template point. The ring
    /// winds clockwise around the requested cut normal.
    pub points: Vec<Point3>,
    /// The cut normal was flipped to follow the traverse direction.
    pub flipped: bool,
    /// Mapping from template space to the placed cut.
    pub transform: CutFaceTransform,
}

/// Reusable template-to-world mapping of a cut, for tools that need
/// to re-derive profile coordinates without regenerating geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct CutFaceTransform {
    /// Cut centre.
    pub translation: Vec3,
    /// Template scale.
    pub scale: f64,
    /// World direction of the template X axis before rotation.
    pub u_factor: Vec3,
    /// World direction of the template Y axis before rotation.
    pub v_factor: Vec3,
    /// Twist about the cut normal.
    pub rotation_degrees: f64,
    /// The template was reversed because the cut normal was flipped.
    pub reverse: bool,
}

impl CutFaceTransform {
    /// The effective cut normal (`v × u`).
    pub fn normal(&self) -> Vec3 {
        self.v_factor.cross(&self.u_factor)
    }

    /// Affine transform taking template points (`z = 0`) to world space.
    pub fn to_transform(&self) -> Transform {
        let n = self.normal();
        let frame = Transform::from_basis(
            &(self.u_factor * self.scale),
            &(self.v_factor * self.scale),
            &n,
            &Point3::origin(),
        );
        let rotation = Dir3::try_new(n, 1e-12)
            .filter(|_| self.rotation_degrees != 0.0)
            .map(|axis| Transform::rotation_about_axis(&axis, self.rotation_degrees.to_radians()))
            .unwrap_or_default();
        Transform::translation(&self.translation).then(&rotation).then(&frame)
    }

    /// World position of a template point.
    pub fn apply(&self, point: &Vec2) -> Point3 {
        self.to_transform()
            .apply_point(&Point3::new(point.x, point.y, 0.0))
    }
}

/// Place `request.template` as a ring of points around the cut normal.
///
/// When the cut normal opposes the traverse direction it is flipped and
/// the template is reversed keeping its first point, so the ring keeps
/// winding the same way around the requested normal either way.
pub fn make_cut(request: &CutRequest<'_>) -> Cut {
    let mut normal = try_normalize(&request.cut_normal).unwrap_or_else(Vec3::z);
    let mut template = request.template.to_vec();
    let flipped = normal.dot(&request.traverse_direction) <= 0.0;
    if flipped {
        normal = -normal;
        template = reverse_keep_first(&template);
    }

    let base = try_normalize(&request.base_normal)
        .filter(|b| b.dot(&normal).abs() < PARALLEL_DOT)
        .unwrap_or_else(|| base_normal_from_traverse_direction(&normal));
    let u = try_normalize(&normal.cross(&base)).unwrap_or_else(Vec3::x);
    let v = u.cross(&normal);

    let transform = CutFaceTransform {
        translation: request.position.coords,
        scale: request.radius,
        u_factor: u,
        v_factor: v,
        rotation_degrees: request.rotation * 360.0,
        reverse: flipped,
    };
    let frame = transform.to_transform();
    let points = template
        .iter()
        .map(|p| frame.apply_point(&Point3::new(p.x, p.y, 0.0)))
        .collect();

    Cut {
        points,
        flipped,
        transform,
    }
}

/// `[p0, p(n-1), ..., p1]`
fn reverse_keep_first(template: &[Vec2]) -> Vec<Vec2> {
    let n = template.len();
    (0..n).map(|k| template[(n - k) % n]).collect()
}
