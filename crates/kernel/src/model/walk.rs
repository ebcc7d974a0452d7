//! Traversal of the topology chain instance -> geometry -> shell -> face ->
//! loop -> half-edge -> edge.

use std::collections::HashSet;

use crate::error::{KernelResult, lookup};
use crate::geometry::point::Point3d;

use super::ProductData;

/// Indices in first-seen order, each kept once.
#[derive(Debug, Default)]
struct UniqueIndices {
    seen: HashSet<usize>,
    order: Vec<usize>,
}

impl UniqueIndices {
    fn push(&mut self, index: usize) {
        if self.seen.insert(index) {
            self.order.push(index);
        }
    }

    fn into_vec(self) -> Vec<usize> {
        self.order
    }
}

impl ProductData {
    /// Faces of a geometry, through its solids and loose shells.
    pub fn geometry_faces(&self, geometry: usize) -> KernelResult<Vec<usize>> {
        let geom = lookup(&self.geometries, geometry, "geometry")?;
        let mut shells = UniqueIndices::default();
        for &solid in &geom.solids {
            for &shell in &lookup(&self.solids, solid, "solid")?.shells {
                shells.push(shell);
            }
        }
        for &shell in &geom.shells {
            shells.push(shell);
        }

        let mut faces = UniqueIndices::default();
        for shell in shells.into_vec() {
            for &face in &lookup(&self.shells, shell, "shell")?.faces {
                faces.push(face);
            }
        }
        Ok(faces.into_vec())
    }

    pub fn instance_faces(&self, instance: usize) -> KernelResult<Vec<usize>> {
        let geometry = lookup(&self.instances, instance, "instance")?.geometry;
        self.geometry_faces(geometry)
    }

    /// Edges bounding a face, outer loop first, each listed once.
    pub fn face_edges(&self, face: usize) -> KernelResult<Vec<usize>> {
        let f = lookup(&self.faces, face, "face")?;
        let mut edges = UniqueIndices::default();
        for &l in std::iter::once(&f.outer_loop).chain(&f.inner_loops) {
            for edge in self.loop_edges(l)? {
                edges.push(edge);
            }
        }
        Ok(edges.into_vec())
    }

    pub fn loop_edges(&self, loop_index: usize) -> KernelResult<Vec<usize>> {
        let l = lookup(&self.loops, loop_index, "loop")?;
        l.half_edges
            .iter()
            .map(|&he| Ok(lookup(&self.half_edges, he, "half-edge")?.edge))
            .collect()
    }

    /// Edges of every face of an instance, each listed once.
    pub fn instance_edges(&self, instance: usize) -> KernelResult<Vec<usize>> {
        let mut edges = UniqueIndices::default();
        for face in self.instance_faces(instance)? {
            for edge in self.face_edges(face)? {
                edges.push(edge);
            }
        }
        Ok(edges.into_vec())
    }

    /// Vertex a half-edge starts from, if its edge has end vertices.
    pub fn half_edge_start(&self, half_edge: usize) -> KernelResult<Option<Point3d>> {
        let he = lookup(&self.half_edges, half_edge, "half-edge")?;
        let edge = lookup(&self.edges, he.edge, "edge")?;
        let Some([a, b]) = edge.vertices else {
            return Ok(None);
        };
        let start = if he.direction >= 0 { a } else { b };
        Ok(Some(self.vertex(start)?))
    }

    /// Corner positions of a loop in traversal order; empty when any of its
    /// edges lacks end vertices.
    pub fn loop_vertices(&self, loop_index: usize) -> KernelResult<Vec<Point3d>> {
        let l = lookup(&self.loops, loop_index, "loop")?;
        let mut points = Vec::with_capacity(l.half_edges.len());
        for &he in &l.half_edges {
            match self.half_edge_start(he)? {
                Some(p) => points.push(p),
                None => return Ok(Vec::new()),
            }
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_indices_keep_first_seen_order() {
        let mut indices = UniqueIndices::default();
        for i in [3, 1, 3, 2, 1, 0] {
            indices.push(i);
        }
        assert_eq!(indices.into_vec(), vec![3, 1, 2, 0]);
    }
}
