//! Generated mesh buffers and vertex provenance.

use std::collections::HashMap;

use strokemesh_math::{Point3, Vec3};
use strokemesh_ops::{Face, MAX_WELD_CHASE};

/// Position of a vertex within the cut it was generated by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CutInfo {
    /// Index of the vertex in its ring.
    pub order_in_cut: usize,
    /// Number of vertices in the ring.
    pub cut_size: usize,
}

/// Append-only output of one build, with per-vertex metadata kept
/// parallel to `vertices`.
#[derive(Debug, Clone, Default)]
pub(crate) struct MeshBuffers {
    pub(crate) vertices: Vec<Point3>,
    pub(crate) faces: Vec<Face>,
    pub(crate) source_nodes: Vec<usize>,
    pub(crate) cut_directions: Vec<Vec3>,
    pub(crate) cut_infos: Vec<CutInfo>,
    /// Leaf rings left open for the hollow shell to close.
    pub(crate) end_cuts: Vec<Vec<usize>>,
    /// Welded-away vertex -> surviving vertex.
    pub(crate) weld_map: HashMap<usize, usize>,
}

/// Buffer lengths recorded before a speculative append.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    vertices: usize,
    faces: usize,
    end_cuts: usize,
}

impl MeshBuffers {
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            vertices: self.vertices.len(),
            faces: self.faces.len(),
            end_cuts: self.end_cuts.len(),
        }
    }

    /// Drop everything appended since `checkpoint`.
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        self.vertices.truncate(checkpoint.vertices);
        self.source_nodes.truncate(checkpoint.vertices);
        self.cut_directions.truncate(checkpoint.vertices);
        self.cut_infos.truncate(checkpoint.vertices);
        self.faces.truncate(checkpoint.faces);
        self.end_cuts.truncate(checkpoint.end_cuts);
    }

    /// Append one vertex and its metadata, returning its index.
    pub(crate) fn push_vertex(&mut self, position: Point3, source: usize, direction: Vec3, info: CutInfo) -> usize {
        self.vertices.push(position);
        self.source_nodes.push(source);
        self.cut_directions.push(direction);
        self.cut_infos.push(info);
        self.vertices.len() - 1
    }

    /// Append a ring of cut points, returning their indices.
    pub(crate) fn push_ring(&mut self, points: &[Point3], source: usize, direction: Vec3) -> Vec<usize> {
        let cut_size = points.len();
        points
            .iter()
            .enumerate()
            .map(|(order_in_cut, p)| {
                self.push_vertex(*p, source, direction, CutInfo { order_in_cut, cut_size })
            })
            .collect()
    }

    /// Collapse every vertex in `weld_map` into its surviving target.
    ///
    /// Chains of remaps are followed (bounded by [`MAX_WELD_CHASE`]).
    /// Faces lose repeated indices and are dropped below three; welded
    /// vertices are removed and the rest renumbered in order. The map
    /// is consumed, so a second call changes nothing.
    pub(crate) fn apply_weld(&mut self) {
        if self.weld_map.is_empty() {
            return;
        }
        let count = self.vertices.len();
        let target: Vec<usize> = (0..count).map(|v| self.resolve_weld(v)).collect();
        let mut keep = vec![false; count];
        for &t in &target {
            keep[t] = true;
        }
        let mut new_index = vec![0usize; count];
        let mut next = 0;
        for v in 0..count {
            if keep[v] {
                new_index[v] = next;
                next += 1;
            }
        }
        let remap = |v: usize| new_index[target[v]];

        let remap_loop = |face: &Face| -> Face {
            let mut out: Face = Vec::with_capacity(face.len());
            for v in face.iter().map(|&v| remap(v)) {
                if !out.contains(&v) {
                    out.push(v);
                }
            }
            out
        };
        self.faces = self
            .faces
            .iter()
            .map(|f| remap_loop(f))
            .filter(|f| f.len() >= 3)
            .collect();
        self.end_cuts = self
            .end_cuts
            .iter()
            .map(|f| remap_loop(f))
            .filter(|f| f.len() >= 3)
            .collect();

        retain_kept(&mut self.vertices, &keep);
        retain_kept(&mut self.source_nodes, &keep);
        retain_kept(&mut self.cut_directions, &keep);
        retain_kept(&mut self.cut_infos, &keep);
        self.weld_map.clear();
    }

    fn resolve_weld(&self, mut v: usize) -> usize {
        for _ in 0..MAX_WELD_CHASE {
            match self.weld_map.get(&v) {
                Some(&t) if t != v && t < self.vertices.len() => v = t,
                _ => break,
            }
        }
        v
    }
}

fn retain_kept<T>(items: &mut Vec<T>, keep: &[bool]) {
    let mut i = 0;
    items.retain(|_| {
        i += 1;
        keep[i - 1]
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffers_with(points: usize, faces: Vec<Face>) -> MeshBuffers {
        let mut buffers = MeshBuffers::default();
        let ring: Vec<Point3> = (0..points).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect();
        buffers.push_ring(&ring, 0, Vec3::x());
        buffers.faces = faces;
        buffers
    }

    #[test]
    fn test_rollback_truncates_all_buffers() {
        let mut buffers = buffers_with(3, vec![vec![0, 1, 2]]);
        let checkpoint = buffers.checkpoint();
        buffers.push_ring(&[Point3::origin(); 4], 1, Vec3::y());
        buffers.faces.push(vec![3, 4, 5]);
        buffers.end_cuts.push(vec![3, 4, 5, 6]);
        buffers.rollback(checkpoint);
        assert_eq!(buffers.vertices.len(), 3);
        assert_eq!(buffers.source_nodes.len(), 3);
        assert_eq!(buffers.cut_infos.len(), 3);
        assert_eq!(buffers.faces.len(), 1);
        assert!(buffers.end_cuts.is_empty());
    }

    #[test]
    fn test_ring_metadata() {
        let buffers = buffers_with(4, Vec::new());
        assert_eq!(buffers.cut_infos[2], CutInfo { order_in_cut: 2, cut_size: 4 });
        assert_eq!(buffers.cut_directions[3], Vec3::x());
    }

    #[test]
    fn test_weld_follows_chains_and_drops_collapsed_faces() {
        let mut buffers = buffers_with(6, vec![vec![0, 1, 2, 3], vec![3, 4, 5], vec![1, 2, 5]]);
        buffers.weld_map.insert(5, 4);
        buffers.weld_map.insert(4, 3);
        buffers.apply_weld();
        assert_eq!(buffers.vertices.len(), 4);
        assert_eq!(buffers.source_nodes.len(), 4);
        assert_eq!(buffers.faces, vec![vec![0, 1, 2, 3], vec![1, 2, 3]]);
        assert!(buffers.weld_map.is_empty());
    }

    #[test]
    fn test_weld_is_idempotent() {
        let mut buffers = buffers_with(5, vec![vec![0, 1, 2], vec![2, 3, 4]]);
        buffers.weld_map.insert(4, 0);
        buffers.apply_weld();
        let (vertices, faces) = (buffers.vertices.clone(), buffers.faces.clone());
        buffers.apply_weld();
        assert_eq!(buffers.vertices, vertices);
        assert_eq!(buffers.faces, faces);
    }

    #[test]
    fn test_weld_remaps_end_cuts() {
        let mut buffers = buffers_with(4, Vec::new());
        buffers.end_cuts.push(vec![1, 2, 3]);
        buffers.weld_map.insert(0, 1);
        buffers.apply_weld();
        assert_eq!(buffers.end_cuts, vec![vec![0, 1, 2]]);
    }
}
