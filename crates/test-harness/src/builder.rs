//! Fluent construction of [`ProductData`] for tests.
//!
//! Everything lands in geometry 0, shell 0, which instance 0 refers to.
//! Further instances of the same geometry can be added with
//! [`ProductBuilder::add_instance`].

use brep_kernel::geometry::transform::Transform;
use brep_kernel::model::{
    Curve3dData, CurveSegment, Edge, Face, Geometry, HalfEdge, Instance, Loop, Shell,
    SnappingPoint, SurfaceData, Triangulation, Units, Vertex,
};
use brep_kernel::ProductData;
use tracing::debug;

/// Builder over a single-geometry product.
#[derive(Debug, Clone)]
pub struct ProductBuilder {
    product: ProductData,
}

impl Default for ProductBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductBuilder {
    pub fn new() -> Self {
        let product = ProductData {
            geometries: vec![Geometry {
                shells: vec![0],
                ..Default::default()
            }],
            instances: vec![Instance {
                geometry: 0,
                transformation: None,
            }],
            shells: vec![Shell::default()],
            ..Default::default()
        };
        Self { product }
    }

    pub fn units(&mut self, units: &str) -> &mut Self {
        self.product.units = Units::from(units.to_string());
        self
    }

    /// Place instance 0.
    pub fn instance_transform(&mut self, transform: &Transform) -> &mut Self {
        self.product.instances[0].transformation = Some(transform.m);
        self
    }

    /// Another instance of the same geometry.
    pub fn add_instance(&mut self, transform: &Transform) -> usize {
        self.product.instances.push(Instance {
            geometry: 0,
            transformation: Some(transform.m),
        });
        self.product.instances.len() - 1
    }

    pub fn vertex(&mut self, position: [f64; 3]) -> usize {
        self.product.vertices.push(Vertex { position });
        self.product.vertices.len() - 1
    }

    pub fn curve(&mut self, curve: Curve3dData) -> usize {
        self.product.curves_3d.push(curve);
        self.product.curves_3d.len() - 1
    }

    pub fn surface(&mut self, surface: SurfaceData) -> usize {
        self.product.surfaces.push(surface);
        self.product.surfaces.len() - 1
    }

    /// New face with an empty outer loop, added to shell 0.
    pub fn face(&mut self, surface: Option<usize>, facing: i8) -> usize {
        let outer_loop = self.new_loop();
        self.product.faces.push(Face {
            surface,
            outer_loop,
            inner_loops: Vec::new(),
            triangulation: None,
            facing,
        });
        let face = self.product.faces.len() - 1;
        self.product.shells[0].faces.push(face);
        face
    }

    /// Add an empty inner loop to `face`, returning the loop index.
    pub fn inner_loop(&mut self, face: usize) -> usize {
        let l = self.new_loop();
        self.product.faces[face].inner_loops.push(l);
        l
    }

    fn new_loop(&mut self) -> usize {
        self.product.loops.push(Loop::default());
        self.product.loops.len() - 1
    }

    pub fn outer_loop(&self, face: usize) -> usize {
        self.product.faces[face].outer_loop
    }

    fn half_edge(&mut self, edge: usize, face: usize, loop_index: usize, direction: i8) -> usize {
        self.product.half_edges.push(HalfEdge {
            edge,
            face,
            loop_index,
            curve_2d: None,
            direction,
            face_vertex_indices: Vec::new(),
        });
        let he = self.product.half_edges.len() - 1;
        self.product.loops[loop_index].half_edges.push(he);
        self.product.edges[edge].half_edges.push(he);
        he
    }

    /// New edge with its first half-edge in `loop_index` of `face`.
    pub fn edge(
        &mut self,
        face: usize,
        loop_index: usize,
        curve: Option<usize>,
        bounds: [f64; 2],
        vertices: Option<[usize; 2]>,
    ) -> usize {
        self.product.edges.push(Edge {
            curve_3d: curve,
            parameter_bounds: bounds,
            vertices,
            half_edges: Vec::new(),
            is_virtual: false,
            tessellation_parameters: Vec::new(),
        });
        let edge = self.product.edges.len() - 1;
        self.half_edge(edge, face, loop_index, 1);
        edge
    }

    /// Straight edge between two existing vertices.
    pub fn line_edge(&mut self, face: usize, loop_index: usize, a: usize, b: usize) -> usize {
        let pa = self.product.vertices[a].position;
        let pb = self.product.vertices[b].position;
        let d = [pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]];
        let length = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
        let curve = self.curve(Curve3dData::Line {
            origin: pa,
            direction: [d[0] / length, d[1] / length, d[2] / length],
        });
        self.edge(face, loop_index, Some(curve), [0.0, length], Some([a, b]))
    }

    /// Second, reversed half-edge of an existing edge on another face.
    pub fn share_edge(&mut self, edge: usize, face: usize, loop_index: usize) -> usize {
        self.half_edge(edge, face, loop_index, -1)
    }

    /// Virtual seam edge of `face` whose two sides list the given
    /// triangulation vertices in traversal order.
    pub fn seam(&mut self, face: usize, left: Vec<u32>, right: Vec<u32>) -> usize {
        let loop_index = self.outer_loop(face);
        self.product.edges.push(Edge {
            curve_3d: None,
            parameter_bounds: [0.0, 1.0],
            vertices: None,
            half_edges: Vec::new(),
            is_virtual: true,
            tessellation_parameters: Vec::new(),
        });
        let edge = self.product.edges.len() - 1;
        let l = self.half_edge(edge, face, loop_index, 1);
        let r = self.half_edge(edge, face, loop_index, -1);
        self.product.half_edges[l].face_vertex_indices = left;
        self.product.half_edges[r].face_vertex_indices = right;
        edge
    }

    pub fn triangulation(&mut self, face: usize, vertices: Vec<f64>, indices: Vec<u32>) -> &mut Self {
        self.product.faces[face].triangulation = Some(Triangulation { vertices, indices });
        self
    }

    /// Curve segment listed in geometry 0.
    pub fn segment(&mut self, curve: usize, bounds: [f64; 2]) -> usize {
        self.product.curve_segments.push(CurveSegment {
            curve_3d: curve,
            parameter_bounds: bounds,
            tessellation_parameters: Vec::new(),
        });
        let segment = self.product.curve_segments.len() - 1;
        self.product.geometries[0].curve_segments.push(segment);
        segment
    }

    /// Straight curve segment from `a` to `b`, parametrized by length.
    pub fn line_segment(&mut self, a: [f64; 3], b: [f64; 3]) -> usize {
        let d = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let length = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
        let curve = self.curve(Curve3dData::Line {
            origin: a,
            direction: [d[0] / length, d[1] / length, d[2] / length],
        });
        self.segment(curve, [0.0, length])
    }

    /// Line-strip curve segment through `points`, parametrized by vertex
    /// index, with one tessellation marker per vertex.
    pub fn strip_segment(&mut self, points: &[[f64; 3]]) -> usize {
        let curve = self.curve(Curve3dData::LineStrip {
            vertices: points.iter().flatten().copied().collect(),
        });
        let last = points.len().saturating_sub(1) as f64;
        let segment = self.segment(curve, [0.0, last]);
        self.product.curve_segments[segment].tessellation_parameters =
            (0..points.len()).map(|i| i as f64).collect();
        segment
    }

    pub fn snapping_point(&mut self, position: [f64; 3]) -> usize {
        self.product.snapping_points.push(SnappingPoint { position });
        let point = self.product.snapping_points.len() - 1;
        self.product.geometries[0].snapping_points.push(point);
        point
    }

    pub fn product(&self) -> &ProductData {
        &self.product
    }

    pub fn build(self) -> ProductData {
        debug!(
            faces = self.product.faces.len(),
            edges = self.product.edges.len(),
            segments = self.product.curve_segments.len(),
            "built product"
        );
        self.product
    }
}
