//! Gift-wrapping of several rings into one convex cap.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::f64::consts::TAU;

use strokemesh_math::{angle_between_degrees, try_normalize, Point3, Vec3};
use strokemesh_ops::{face_half_edges, Face};

use crate::{CutRing, Result, StitchError, Stitcher};

/// Angles closer than this (radians) are treated as equal.
const ANGLE_EPSILON: f64 = 1e-7;

/// Sine of the smallest turn counted as a corner of a hull facet.
const TURN_EPSILON: f64 = 1e-9;

/// Wraps a set of outward-facing rings with triangles, walking the
/// convex hull of the ring vertices facet by facet.
///
/// Every open half-edge is closed by the hull facet reached last when
/// the attached face is rotated outward about the edge. All candidates
/// lying on that facet are collected and the whole convex facet is
/// triangulated at once, so flat and cocircular regions are split the
/// same way no matter which of their edges reaches them first.
/// Triangles never use three vertices of the same ring.
#[derive(Debug, Clone, Copy)]
pub struct GiftWrapper {
    /// Maximum faces per ring vertex before giving up.
    pub max_faces_per_vertex: usize,
}

impl Default for GiftWrapper {
    fn default() -> Self {
        Self {
            max_faces_per_vertex: 4,
        }
    }
}

/// Open half-edge bookkeeping: each open edge remembers a point on the
/// face already attached to its twin.
struct Front {
    queue: VecDeque<(usize, usize)>,
    reference: HashMap<(usize, usize), Point3>,
    used: HashSet<(usize, usize)>,
}

impl Front {
    fn open(&mut self, edge: (usize, usize), reference: Point3) {
        self.reference.insert(edge, reference);
        self.queue.push_back(edge);
    }
}

impl Stitcher for GiftWrapper {
    fn stitch(&self, vertices: &[Point3], rings: &[CutRing]) -> Result<Vec<Face>> {
        if rings.len() < 2 {
            return Err(StitchError::RingCount {
                expected: 2,
                found: rings.len(),
            });
        }

        let mut ring_of: HashMap<usize, usize> = HashMap::new();
        let mut candidates = Vec::new();
        for (ri, ring) in rings.iter().enumerate() {
            if ring.len() < 3 {
                return Err(StitchError::DegenerateRing(ri));
            }
            for &v in &ring.vertices {
                if ring_of.insert(v, ri).is_none() {
                    candidates.push(v);
                }
            }
        }

        let mut failed: BTreeSet<usize> = BTreeSet::new();
        let mut front = Front {
            queue: VecDeque::new(),
            reference: HashMap::new(),
            used: HashSet::new(),
        };
        for (ri, ring) in rings.iter().enumerate() {
            for edge in face_half_edges(&ring.vertices) {
                if !front.used.insert(edge) {
                    failed.insert(ri);
                }
            }
        }
        if !failed.is_empty() {
            return Err(StitchError::Unclosed {
                failed_loops: failed.into_iter().collect(),
                open_edges: 0,
            });
        }
        for ring in rings {
            let centroid = ring.centroid(vertices);
            for (a, b) in face_half_edges(&ring.vertices) {
                if !front.used.contains(&(b, a)) {
                    front.open((b, a), centroid);
                }
            }
        }

        let limit = self.max_faces_per_vertex * candidates.len();
        let mut faces: Vec<Face> = Vec::new();
        while let Some((p, q)) = front.queue.pop_front() {
            let Some(&reference) = front.reference.get(&(p, q)) else {
                continue;
            };
            if faces.len() >= limit {
                break;
            }
            let Some(facet) = hull_facet(vertices, &candidates, &ring_of, p, q, &reference) else {
                failed.extend([p, q].iter().filter_map(|v| ring_of.get(v)));
                continue;
            };
            let triangles = triangulate_facet(vertices, &ring_of, &facet);
            let half_edges: Vec<(usize, usize)> = triangles
                .iter()
                .flat_map(|t| face_half_edges(t))
                .collect();
            let mut fresh = HashSet::new();
            if triangles.is_empty()
                || half_edges
                    .iter()
                    .any(|e| front.used.contains(e) || !fresh.insert(*e))
            {
                failed.extend(facet.polygon.iter().filter_map(|v| ring_of.get(v)));
                continue;
            }

            for t in &triangles {
                for (k, (x, y)) in face_half_edges(t).enumerate() {
                    front.used.insert((x, y));
                    if front.reference.remove(&(x, y)).is_none() {
                        front.open((y, x), vertices[t[(k + 2) % 3]]);
                    }
                }
                faces.push(t.to_vec());
            }
        }

        if !front.reference.is_empty() || !failed.is_empty() {
            for (a, b) in front.reference.keys() {
                failed.extend([a, b].iter().filter_map(|v| ring_of.get(*v)));
            }
            return Err(StitchError::Unclosed {
                failed_loops: failed.into_iter().collect(),
                open_edges: front.reference.len(),
            });
        }
        Ok(faces)
    }
}

/// A convex hull facet: its corners counter-clockwise around `normal`,
/// starting with the open edge it was found from.
struct Facet {
    polygon: Vec<usize>,
    normal: Vec3,
}

/// The hull facet closing the open half-edge `p -> q`.
///
/// Candidates are ranked by the angle swept about the edge from the
/// attached face (through `reference`); the largest angle is the
/// outermost plane, and every candidate within [`ANGLE_EPSILON`] of it
/// belongs to the facet.
fn hull_facet(
    vertices: &[Point3],
    candidates: &[usize],
    ring_of: &HashMap<usize, usize>,
    p: usize,
    q: usize,
    reference: &Point3,
) -> Option<Facet> {
    let origin = vertices[p];
    let axis = try_normalize(&(vertices[q] - origin))?;
    let project = |v: Vec3| v - axis * v.dot(&axis);
    let start = try_normalize(&project(reference - origin))?;
    let edge_ring = ring_of.get(&p).filter(|&r| ring_of.get(&q) == Some(r));

    let mut swept: Vec<(usize, f64)> = Vec::new();
    for &c in candidates {
        if c == p || c == q || (edge_ring.is_some() && ring_of.get(&c) == edge_ring) {
            continue;
        }
        let Some(dir) = try_normalize(&project(vertices[c] - origin)) else {
            continue;
        };
        let mut angle = start.cross(&dir).dot(&axis).atan2(start.dot(&dir));
        if angle < 0.0 {
            angle += TAU;
        }
        if angle >= ANGLE_EPSILON && angle <= TAU - ANGLE_EPSILON {
            swept.push((c, angle));
        }
    }
    let &(apex, best) = swept.iter().max_by(|a, b| a.1.total_cmp(&b.1))?;
    let normal = try_normalize(&(vertices[q] - origin).cross(&(vertices[apex] - origin)))?;

    let mut members = vec![p, q];
    members.extend(
        swept
            .iter()
            .filter(|&&(_, angle)| best - angle <= ANGLE_EPSILON)
            .map(|&(c, _)| c),
    );
    let mut polygon = convex_polygon(vertices, &members, &axis, &normal);
    let at = polygon.iter().position(|&v| v == p)?;
    polygon.rotate_left(at);
    (polygon.get(1) == Some(&q)).then_some(Facet { polygon, normal })
}

/// Convex hull of coplanar `members`, counter-clockwise around `normal`.
///
/// Points on the hull boundary are kept so that neighbouring facets
/// agree on how a shared edge is split.
fn convex_polygon(vertices: &[Point3], members: &[usize], axis: &Vec3, normal: &Vec3) -> Vec<usize> {
    let origin = vertices[members[0]];
    let side = normal.cross(axis);
    let mut planar: Vec<Planar> = members
        .iter()
        .map(|&v| {
            let d = vertices[v] - origin;
            (v, d.dot(axis), d.dot(&side))
        })
        .collect();
    planar.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.2.total_cmp(&b.2)));

    let scale = planar
        .iter()
        .map(|&(_, x, y)| x.abs().max(y.abs()))
        .fold(0.0, f64::max);
    let tolerance = TURN_EPSILON * scale * scale;
    let mut polygon = monotone_chain(planar.iter(), tolerance);
    polygon.extend(monotone_chain(planar.iter().rev(), tolerance));
    polygon.into_iter().map(|(v, _, _)| v).collect()
}

/// Vertex index with its in-plane coordinates.
type Planar = (usize, f64, f64);

/// One half of Andrew's monotone chain, dropping its last point. Only
/// strict right turns are removed, so collinear points survive.
fn monotone_chain<'a>(points: impl Iterator<Item = &'a Planar>, tolerance: f64) -> Vec<Planar> {
    let cross = |o: &Planar, a: &Planar, b: &Planar| (a.1 - o.1) * (b.2 - o.2) - (a.2 - o.2) * (b.1 - o.1);
    let mut hull: Vec<Planar> = Vec::new();
    for &point in points {
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], &point) < -tolerance {
            hull.pop();
        }
        hull.push(point);
    }
    hull.pop();
    hull
}

/// Split a convex facet into triangles by clipping corners.
///
/// Each clipped corner must turn strictly, must not leave the rest of
/// the polygon on one line, and must not join three vertices of one
/// ring; among those the corner with the widest smallest angle wins.
/// Returns no triangles when the facet cannot be split.
fn triangulate_facet(vertices: &[Point3], ring_of: &HashMap<usize, usize>, facet: &Facet) -> Vec<[usize; 3]> {
    let turn = |a: usize, v: usize, b: usize| {
        let (da, db) = (vertices[v] - vertices[a], vertices[b] - vertices[v]);
        let len = da.norm() * db.norm();
        if len <= 0.0 {
            0.0
        } else {
            da.cross(&db).dot(&facet.normal) / len
        }
    };
    let has_corner = |polygon: &[usize]| {
        let n = polygon.len();
        (0..n).any(|i| turn(polygon[(i + n - 1) % n], polygon[i], polygon[(i + 1) % n]) > TURN_EPSILON)
    };
    let one_ring = |t: &[usize; 3]| {
        let r = ring_of.get(&t[0]);
        r.is_some() && ring_of.get(&t[1]) == r && ring_of.get(&t[2]) == r
    };

    let mut remaining = facet.polygon.clone();
    let mut triangles = Vec::with_capacity(remaining.len().saturating_sub(2));
    while remaining.len() > 3 {
        let n = remaining.len();
        let ear = (0..n)
            .filter_map(|i| {
                let t = [remaining[(i + n - 1) % n], remaining[i], remaining[(i + 1) % n]];
                if turn(t[0], t[1], t[2]) <= TURN_EPSILON || one_ring(&t) {
                    return None;
                }
                let mut rest = remaining.clone();
                rest.remove(i);
                has_corner(&rest).then(|| (i, t, smallest_angle(vertices, &t)))
            })
            .max_by(|a, b| a.2.total_cmp(&b.2));
        let Some((i, t, _)) = ear else {
            return Vec::new();
        };
        triangles.push(t);
        remaining.remove(i);
    }
    let last = [remaining[0], remaining[1], remaining[2]];
    if turn(last[0], last[1], last[2]) <= TURN_EPSILON || one_ring(&last) {
        return Vec::new();
    }
    triangles.push(last);
    triangles
}

/// Smallest interior angle of a triangle, in degrees.
fn smallest_angle(vertices: &[Point3], t: &[usize; 3]) -> f64 {
    (0..3)
        .map(|k| {
            let (a, v, b) = (vertices[t[(k + 2) % 3]], vertices[t[k]], vertices[t[(k + 1) % 3]]);
            angle_between_degrees(&(a - v), &(b - v))
        })
        .fold(180.0, f64::min)
}
