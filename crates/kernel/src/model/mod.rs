//! B-rep product data as streamed per object.
//!
//! Everything is plain data; cross references are indices into the arrays of
//! [`ProductData`]. [`ProductData::validate`] checks that they resolve.

mod validate;
mod walk;

use serde::{Deserialize, Serialize};

use crate::error::{KernelResult, lookup};
use crate::geometry::point::Point3d;
use crate::geometry::transform::Transform;

/// Length unit of a product, with its scale to meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Units {
    Millimeters,
    Centimeters,
    Inches,
    #[default]
    Meters,
}

impl Units {
    pub fn scale(&self) -> f64 {
        match self {
            Units::Millimeters => 0.001,
            Units::Centimeters => 0.01,
            Units::Inches => 0.0254,
            Units::Meters => 1.0,
        }
    }
}

impl From<String> for Units {
    fn from(s: String) -> Self {
        match s.as_str() {
            "mm" => Units::Millimeters,
            "cm" => Units::Centimeters,
            "in" => Units::Inches,
            _ => Units::Meters,
        }
    }
}

impl From<Units> for String {
    fn from(u: Units) -> Self {
        match u {
            Units::Millimeters => "mm",
            Units::Centimeters => "cm",
            Units::Inches => "in",
            Units::Meters => "m",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: [f64; 3],
}

impl Vertex {
    pub fn point(&self) -> Point3d {
        Point3d::from_array(self.position)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Geometry {
    pub shells: Vec<usize>,
    pub solids: Vec<usize>,
    pub curve_segments: Vec<usize>,
    pub snapping_points: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub geometry: usize,
    /// Column-major local-to-object transform; identity when absent.
    #[serde(default)]
    pub transformation: Option<[f64; 16]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solid {
    pub shells: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shell {
    pub faces: Vec<usize>,
}

/// Pre-tessellated face mesh: `vertices` are flat (u, v) pairs in the
/// face's surface parameter space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Triangulation {
    pub vertices: Vec<f64>,
    pub indices: Vec<u32>,
}

impl Triangulation {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 2
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn uv(&self, index: usize) -> Option<[f64; 2]> {
        let uv = self.vertices.get(index * 2..index * 2 + 2)?;
        Some([uv[0], uv[1]])
    }
}

fn forward() -> i8 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Face {
    /// Faces without an analytic surface are handled as polygons.
    #[serde(default)]
    pub surface: Option<usize>,
    pub outer_loop: usize,
    #[serde(default)]
    pub inner_loops: Vec<usize>,
    #[serde(default)]
    pub triangulation: Option<Triangulation>,
    /// +1 when the face normal agrees with the surface normal, -1 otherwise.
    #[serde(default = "forward")]
    pub facing: i8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loop {
    pub half_edges: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(rename = "curve3D", default)]
    pub curve_3d: Option<usize>,
    pub parameter_bounds: [f64; 2],
    #[serde(default)]
    pub vertices: Option<[usize; 2]>,
    /// One entry for non-manifold edges, two otherwise.
    pub half_edges: Vec<usize>,
    #[serde(rename = "virtual", default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub tessellation_parameters: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HalfEdge {
    pub edge: usize,
    pub face: usize,
    #[serde(rename = "loop")]
    pub loop_index: usize,
    #[serde(rename = "curve2D", default)]
    pub curve_2d: Option<usize>,
    /// +1 when traversal follows the edge curve's parametrization.
    #[serde(default = "forward")]
    pub direction: i8,
    /// Triangulation vertices along this half-edge, in traversal order.
    #[serde(default)]
    pub face_vertex_indices: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum SurfaceData {
    Plane {
        #[serde(default)]
        transform: Option<[f64; 16]>,
    },
    Cylinder {
        radius: f64,
        #[serde(default)]
        transform: Option<[f64; 16]>,
    },
    Cone {
        radius: f64,
        half_angle: f64,
        #[serde(default)]
        transform: Option<[f64; 16]>,
    },
    Sphere {
        radius: f64,
        #[serde(default)]
        transform: Option<[f64; 16]>,
    },
    Torus {
        major_radius: f64,
        minor_radius: f64,
        #[serde(default)]
        transform: Option<[f64; 16]>,
    },
    Nurbs {
        order_u: usize,
        order_v: usize,
        count_u: usize,
        count_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        control_points: Vec<f64>,
        #[serde(default)]
        weights: Option<Vec<f64>>,
        #[serde(default)]
        transform: Option<[f64; 16]>,
    },
}

impl SurfaceData {
    /// Surface placement relative to the instance; identity when absent.
    pub fn placement(&self) -> Transform {
        let transform = match self {
            SurfaceData::Plane { transform }
            | SurfaceData::Cylinder { transform, .. }
            | SurfaceData::Cone { transform, .. }
            | SurfaceData::Sphere { transform, .. }
            | SurfaceData::Torus { transform, .. }
            | SurfaceData::Nurbs { transform, .. } => *transform,
        };
        transform
            .map(Transform::from_column_major)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Curve3dData {
    Line {
        origin: [f64; 3],
        direction: [f64; 3],
    },
    Circle {
        origin: [f64; 3],
        axis_x: [f64; 3],
        axis_y: [f64; 3],
        radius: f64,
    },
    Nurbs {
        order: usize,
        knots: Vec<f64>,
        control_points: Vec<f64>,
        #[serde(default)]
        weights: Option<Vec<f64>>,
    },
    LineStrip {
        vertices: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Curve2dData {
    Line {
        origin: [f64; 2],
        direction: [f64; 2],
    },
    Circle {
        origin: [f64; 2],
        radius: f64,
    },
    Nurbs {
        order: usize,
        knots: Vec<f64>,
        /// Flat (u, v) pairs.
        control_points: Vec<f64>,
        #[serde(default)]
        weights: Option<Vec<f64>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveSegment {
    #[serde(rename = "curve3D")]
    pub curve_3d: usize,
    pub parameter_bounds: [f64; 2],
    #[serde(default)]
    pub tessellation_parameters: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnappingPoint {
    pub position: [f64; 3],
}

/// All B-rep data of one object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductData {
    pub vertices: Vec<Vertex>,
    pub geometries: Vec<Geometry>,
    pub instances: Vec<Instance>,
    pub solids: Vec<Solid>,
    pub shells: Vec<Shell>,
    pub faces: Vec<Face>,
    pub loops: Vec<Loop>,
    pub edges: Vec<Edge>,
    pub half_edges: Vec<HalfEdge>,
    pub surfaces: Vec<SurfaceData>,
    #[serde(rename = "curves3D")]
    pub curves_3d: Vec<Curve3dData>,
    #[serde(rename = "curves2D")]
    pub curves_2d: Vec<Curve2dData>,
    pub curve_segments: Vec<CurveSegment>,
    pub snapping_points: Vec<SnappingPoint>,
    pub units: Units,
    pub version: Option<u32>,
}

impl ProductData {
    pub fn from_json(json: &str) -> KernelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_slice(bytes: &[u8]) -> KernelResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn unit_scale(&self) -> f64 {
        self.units.scale()
    }

    /// Local-to-object transform of an instance (identity when absent).
    pub fn instance_transform(&self, instance: usize) -> KernelResult<Transform> {
        let inst = lookup(&self.instances, instance, "instance")?;
        Ok(inst
            .transformation
            .map(Transform::from_column_major)
            .unwrap_or_default())
    }

    pub fn vertex(&self, index: usize) -> KernelResult<Point3d> {
        Ok(lookup(&self.vertices, index, "vertex")?.point())
    }
}
