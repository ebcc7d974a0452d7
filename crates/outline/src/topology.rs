//! Triangle/edge/vertex adjacency of one face's triangulation.

use std::collections::HashMap;

use brep_kernel::GeometryFactory;
use brep_kernel::ProductData;
use brep_kernel::error::lookup;
use brep_kernel::geometry::point::{Point2d, Point3d};
use brep_kernel::geometry::transform::Transform;
use brep_kernel::geometry::vector::Vec3;
use tracing::{debug, instrument};

use crate::OutlineConfig;
use crate::error::{OutlineError, OutlineResult};

/// Union-find over triangulation vertex indices.
#[derive(Debug, Clone)]
struct DisjointSet {
    parent: Vec<u32>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len as u32).collect(),
        }
    }

    fn find(&mut self, mut v: u32) -> u32 {
        while self.parent[v as usize] != v {
            let grand = self.parent[self.parent[v as usize] as usize];
            self.parent[v as usize] = grand;
            v = grand;
        }
        v
    }

    /// The smaller index becomes the representative.
    fn union(&mut self, a: u32, b: u32) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[drop as usize] = keep;
        }
    }
}

/// Edge between two canonical vertices, `a < b`.
#[derive(Debug, Clone, PartialEq)]
pub struct TopoEdge {
    pub a: u32,
    pub b: u32,
    pub triangles: Vec<usize>,
}

impl TopoEdge {
    pub fn is_boundary(&self) -> bool {
        self.triangles.len() == 1
    }
}

#[derive(Debug, Clone)]
pub struct TriangleTopology {
    pub face: usize,
    /// World positions, one per triangulation vertex.
    pub positions: Vec<Point3d>,
    /// World unit normals, one per triangulation vertex.
    pub normals: Vec<Vec3>,
    /// Triangles over canonical (seam-merged) vertex indices.
    pub triangles: Vec<[u32; 3]>,
    pub edges: Vec<TopoEdge>,
    pub triangle_edges: Vec<[usize; 3]>,
    edge_lookup: HashMap<(u32, u32), usize>,
}

impl TriangleTopology {
    /// Build the topology of `face`, evaluating its triangulation through the
    /// face's surface placed by `world`.
    ///
    /// `Ok(None)` for faces without a surface or without a triangulation.
    #[instrument(skip(factory, product, world, config))]
    pub fn build(
        factory: &GeometryFactory,
        product: &ProductData,
        face: usize,
        world: &Transform,
        config: &OutlineConfig,
    ) -> OutlineResult<Option<Self>> {
        let f = lookup(&product.faces, face, "face")?;
        let Some(tri) = &f.triangulation else {
            return Ok(None);
        };
        let Some(surface) = factory.surface(product, face, world)? else {
            return Ok(None);
        };
        if tri.indices.len() % 3 != 0 || tri.vertices.len() % 2 != 0 {
            return Err(OutlineError::BadTriangulation {
                face,
                reason: "buffers are not whole triangles/uv pairs".into(),
            });
        }

        let count = tri.vertex_count();
        let mut positions = Vec::with_capacity(count);
        let mut normals = Vec::with_capacity(count);
        for uv in tri.vertices.chunks_exact(2) {
            let uv = Point2d::new(uv[0], uv[1]);
            positions.push(surface.eval_position(uv)?);
            normals.push(surface.eval_normal(uv)?);
        }

        let check_index = |i: u32| {
            if (i as usize) < count {
                Ok(i)
            } else {
                Err(OutlineError::BadTriangulation {
                    face,
                    reason: format!("vertex index {i} out of range ({count} vertices)"),
                })
            }
        };

        let mut sets = DisjointSet::new(count);
        for edge_index in product.face_edges(face)? {
            let edge = lookup(&product.edges, edge_index, "edge")?;
            if !edge.is_virtual {
                continue;
            }
            let [left, right] = match edge.half_edges.as_slice() {
                &[l, r] => [
                    &lookup(&product.half_edges, l, "half-edge")?.face_vertex_indices,
                    &lookup(&product.half_edges, r, "half-edge")?.face_vertex_indices,
                ],
                _ => continue,
            };
            if left.len() != right.len() {
                return Err(OutlineError::SeamLength {
                    face,
                    edge: edge_index,
                    left: left.len(),
                    right: right.len(),
                });
            }
            // The two sides run in opposite directions.
            for (&a, &b) in left.iter().zip(right.iter().rev()) {
                let (a, b) = (check_index(a)?, check_index(b)?);
                let delta = positions[a as usize].distance_to(&positions[b as usize]);
                if delta >= config.seam_epsilon {
                    return Err(OutlineError::SeamMismatch { face, a, b, delta });
                }
                if normals[a as usize].dot(&normals[b as usize]) < -config.normal_epsilon {
                    return Err(OutlineError::SeamNormal { face, a, b });
                }
                sets.union(a, b);
            }
        }

        let mut triangles = Vec::with_capacity(tri.triangle_count());
        for (index, t) in tri.indices.chunks_exact(3).enumerate() {
            let raw = [check_index(t[0])?, check_index(t[1])?, check_index(t[2])?];
            let [p0, p1, p2] = raw.map(|i| positions[i as usize]);
            if let Some(geometric) = (p1 - p0).cross(&(p2 - p0)).normalized() {
                let mean = raw
                    .iter()
                    .fold(Vec3::ZERO, |acc, &i| acc + normals[i as usize])
                    .normalize();
                if geometric.dot(&mean) < -config.normal_epsilon {
                    return Err(OutlineError::NormalSign {
                        face,
                        triangle: index,
                    });
                }
            }
            let merged = raw.map(|i| sets.find(i));
            if merged[0] == merged[1] || merged[1] == merged[2] || merged[0] == merged[2] {
                continue;
            }
            triangles.push(merged);
        }

        let mut topology = Self {
            face,
            positions,
            normals,
            triangles: Vec::new(),
            edges: Vec::new(),
            triangle_edges: Vec::new(),
            edge_lookup: HashMap::new(),
        };
        for t in triangles {
            topology.add_triangle(t);
        }
        debug!(
            face,
            triangles = topology.triangles.len(),
            edges = topology.edges.len(),
            "triangle topology built"
        );
        Ok(Some(topology))
    }

    fn add_triangle(&mut self, t: [u32; 3]) {
        let index = self.triangles.len();
        let mut edges = [0; 3];
        for (k, slot) in edges.iter_mut().enumerate() {
            let (u, v) = (t[k], t[(k + 1) % 3]);
            let key = (u.min(v), u.max(v));
            let edge = *self.edge_lookup.entry(key).or_insert_with(|| {
                self.edges.push(TopoEdge {
                    a: key.0,
                    b: key.1,
                    triangles: Vec::new(),
                });
                self.edges.len() - 1
            });
            self.edges[edge].triangles.push(index);
            *slot = edge;
        }
        self.triangles.push(t);
        self.triangle_edges.push(edges);
    }

    pub fn edge_between(&self, a: u32, b: u32) -> Option<usize> {
        self.edge_lookup.get(&(a.min(b), a.max(b))).copied()
    }

    pub fn position(&self, v: u32) -> Point3d {
        self.positions[v as usize]
    }

    pub fn normal(&self, v: u32) -> Vec3 {
        self.normals[v as usize]
    }

    pub fn boundary_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_boundary()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disjoint_set_keeps_smallest() {
        let mut sets = DisjointSet::new(5);
        sets.union(4, 2);
        sets.union(2, 3);
        assert_eq!(sets.find(4), 2);
        assert_eq!(sets.find(3), 2);
        sets.union(0, 3);
        assert_eq!(sets.find(4), 0);
        assert_eq!(sets.find(1), 1);
    }
}
