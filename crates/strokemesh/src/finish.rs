//! Finishing passes run after every node has its cuts.

use image::GrayImage;
use strokemesh_math::{signed_angle_degrees, try_normalize, Point3, Vec3};
use strokemesh_ops::Face;
use tracing::warn;

use crate::builder::StrokeMeshBuilder;
use crate::graph::StrokeGraph;

impl StrokeMeshBuilder {
    /// Join the two rings of every live edge into a tube.
    ///
    /// Returns `false` if any edge could not be stitched.
    pub(crate) fn stitch_edge_cuts(&mut self) -> bool {
        let mut succeeded = true;
        for (edge, e) in self.graph.edges.iter().enumerate() {
            if self.swallowed_edges.contains(&edge) || e.cuts.len() != 2 {
                continue;
            }
            match self.tube_stitcher.stitch(&self.buffers.vertices, &e.cuts) {
                Ok(faces) => self.buffers.faces.extend(faces),
                Err(err) => {
                    warn!(edge, %err, "failed to stitch edge");
                    succeeded = false;
                }
            }
        }
        succeeded
    }

    /// Displace vertices by the deform map and scale cross-sections by
    /// the thickness and width factors.
    pub(crate) fn apply_deform(&mut self) {
        let config = &self.config;
        let thickness = (config.deform_thickness != 1.0).then_some(config.deform_thickness);
        let width = (config.deform_width != 1.0).then_some(config.deform_width);
        if thickness.is_none() && width.is_none() && self.deform_map.is_none() {
            return;
        }
        let node_count = self.graph.node_count();
        for i in 0..self.buffers.vertices.len() {
            let node = &self.graph.nodes[self.buffers.source_nodes[i]];
            let mut position = self.buffers.vertices[i];
            if let Some(map) = &self.deform_map {
                let ray = position - node.position;
                if let Some(dir) = try_normalize(&ray) {
                    let gray = sample_deform_map(map, &self.graph, self.buffers.source_nodes[i], &dir, node_count);
                    position += dir * (config.deform_map_scale * gray * node.radius);
                }
            }

            let ray = position - node.position;
            let base = node.base_normal;
            let along_thickness = thickness.map(|f| position + base * (base.dot(&ray) * (f - 1.0)));
            let along_width = width.and_then(|f| {
                let across = try_normalize(&base.cross(&self.buffers.cut_directions[i]))?;
                Some(position + across * (across.dot(&ray) * (f - 1.0)))
            });
            self.buffers.vertices[i] = match (along_thickness, along_width) {
                (Some(a), Some(b)) => Point3::from((a.coords + b.coords) * 0.5),
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => position,
            };
        }
    }

    /// Turn the surface into a shell of `hollow_thickness` radii.
    ///
    /// Every vertex is duplicated toward its node, the duplicate faces
    /// are reversed, and each deferred leaf ring is closed with one quad
    /// per ring edge.
    pub(crate) fn finalize_hollow(&mut self) {
        let thickness = self.config.hollow_thickness;
        if thickness <= 0.0 {
            return;
        }
        let shift = self.buffers.vertices.len();
        for i in 0..shift {
            let node = &self.graph.nodes[self.buffers.source_nodes[i]];
            let outer = self.buffers.vertices[i];
            let inner = outer - (outer - node.position) * thickness;
            let (direction, info) = (self.buffers.cut_directions[i], self.buffers.cut_infos[i]);
            self.buffers
                .push_vertex(inner, self.buffers.source_nodes[i], direction, info);
        }

        let inner_faces: Vec<Face> = self
            .buffers
            .faces
            .iter()
            .map(|f| f.iter().rev().map(|&v| v + shift).collect())
            .collect();
        self.buffers.faces.extend(inner_faces);

        for ring in std::mem::take(&mut self.buffers.end_cuts) {
            let n = ring.len();
            for k in 0..n {
                let (a, b) = (ring[k], ring[(k + 1) % n]);
                self.buffers.faces.push(vec![a, b, b + shift, a + shift]);
            }
        }
    }
}

/// Gray level in `[-1, 1]` for the vertex of `node` in direction `ray`.
///
/// Columns follow the traversal order, rows the angle of the ray about
/// the traverse direction measured from the base normal.
fn sample_deform_map(map: &GrayImage, graph: &StrokeGraph, node: usize, ray: &Vec3, node_count: usize) -> f64 {
    let (width, height) = map.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }
    let n = &graph.nodes[node];
    let order = n.traverse_order.unwrap_or(0);
    let column = (order * width as usize / node_count.max(1)).min(width as usize - 1);
    let angle = signed_angle_degrees(&n.base_normal, ray, &n.traverse_direction);
    let row = ((angle * height as f64 / 360.0) as usize).min(height as usize - 1);
    let luma = map.get_pixel(column as u32, row as u32).0[0];
    (f64::from(luma) - 127.0) / 127.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;
    use strokemesh_ops::is_manifold;

    fn straight_chain(builder: &mut StrokeMeshBuilder) -> Vec<usize> {
        let nodes: Vec<usize> = (0..3)
            .map(|k| builder.add_node(Point3::new(0.0, 0.0, 2.0 * k as f64), 0.5, Vec::new(), 0.0))
            .collect();
        builder.add_edge(nodes[0], nodes[1]).unwrap();
        builder.add_edge(nodes[1], nodes[2]).unwrap();
        nodes
    }

    fn offsets(builder: &StrokeMeshBuilder) -> Vec<Vec3> {
        let vertices = builder.generated_vertices();
        builder
            .generated_vertices_source_node_indices()
            .iter()
            .enumerate()
            .map(|(i, &n)| vertices[i] - Point3::new(0.0, 0.0, 2.0 * n as f64))
            .collect()
    }

    #[test]
    fn test_hollow_doubles_the_surface() {
        let mut solid = StrokeMeshBuilder::new();
        straight_chain(&mut solid);
        assert!(solid.build());

        let mut hollow = StrokeMeshBuilder::new();
        straight_chain(&mut hollow);
        hollow.set_hollow_thickness(0.25);
        assert!(hollow.build());
        assert_eq!(hollow.generated_vertices().len(), 2 * solid.generated_vertices().len());
        // Tube quads on both shells plus four rim quads per end.
        assert_eq!(hollow.generated_faces().len(), 24);
        assert!(is_manifold(hollow.generated_faces()));

        let outer = offsets(&hollow);
        let half = outer.len() / 2;
        for i in 0..half {
            assert_relative_eq!(outer[half + i], outer[i] * 0.75, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_hollow_is_a_no_op() {
        let mut builder = StrokeMeshBuilder::new();
        straight_chain(&mut builder);
        builder.build();
        let (vertices, faces) = (builder.generated_vertices().len(), builder.generated_faces().len());
        builder.finalize_hollow();
        assert_eq!(builder.generated_vertices().len(), vertices);
        assert_eq!(builder.generated_faces().len(), faces);
    }

    #[test]
    fn test_thickness_scales_along_base_normal() {
        let mut plain = StrokeMeshBuilder::new();
        let nodes = straight_chain(&mut plain);
        plain.build();
        let mut thick = StrokeMeshBuilder::new();
        straight_chain(&mut thick);
        thick.set_deform_thickness(2.0);
        thick.build();

        let base = thick.node_base_normal(nodes[1]).unwrap();
        for (a, b) in offsets(&plain).iter().zip(offsets(&thick)) {
            assert_relative_eq!(base.dot(&b), 2.0 * base.dot(a), epsilon = 1e-12);
            let across = a - base * base.dot(a);
            assert_relative_eq!(b - base * base.dot(&b), across, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_width_and_thickness_average() {
        let mut builder = StrokeMeshBuilder::new();
        straight_chain(&mut builder);
        builder.set_deform_thickness(3.0);
        builder.set_deform_width(3.0);
        builder.build();
        // Either scaling alone moves half the offset, so the average is 2x.
        for offset in offsets(&builder) {
            assert_relative_eq!(offset.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_deform_map_displaces_along_ray() {
        let mut builder = StrokeMeshBuilder::new();
        straight_chain(&mut builder);
        builder.set_deform_map_image(Some(GrayImage::from_pixel(4, 4, Luma([254]))));
        builder.set_deform_map_scale(0.5);
        builder.build();
        for offset in offsets(&builder) {
            assert_relative_eq!(offset.norm(), 0.75, epsilon = 1e-12);
        }

        let mut neutral = StrokeMeshBuilder::new();
        straight_chain(&mut neutral);
        neutral.set_deform_map_image(Some(GrayImage::from_pixel(4, 4, Luma([127]))));
        neutral.build();
        for offset in offsets(&neutral) {
            assert_relative_eq!(offset.norm(), 0.5, epsilon = 1e-12);
        }
    }
}
