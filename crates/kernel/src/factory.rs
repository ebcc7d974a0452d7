//! Builds curve and surface objects from product data.
//!
//! The factory owns the numeric-library capability and is passed explicitly
//! to every operation that needs geometry.

use std::sync::Arc;

use tracing::trace;

use crate::Tolerance;
use crate::error::{KernelResult, lookup};
use crate::geometry::curves::{Arc as ArcCurve, Curve3d, Line, LineStrip, NurbsCurve};
use crate::geometry::curves2d::Curve2d;
use crate::geometry::native::{
    CurveSpec, NativeResource, NumericLibrary, ResourceSpec, SoftwareNumerics, SurfaceSpec,
};
use crate::geometry::point::{Point2d, Point3d};
use crate::geometry::surfaces::{Surface, SurfaceShape};
use crate::geometry::transform::Transform;
use crate::geometry::vector::Vec3;
use crate::model::{Curve2dData, Curve3dData, ProductData, SurfaceData};

#[derive(Debug, Clone)]
pub struct GeometryFactory {
    numerics: Arc<dyn NumericLibrary>,
    tolerance: Tolerance,
}

impl Default for GeometryFactory {
    fn default() -> Self {
        Self::new(Arc::new(SoftwareNumerics::new()))
    }
}

impl GeometryFactory {
    pub fn new(numerics: Arc<dyn NumericLibrary>) -> Self {
        Self {
            numerics,
            tolerance: Tolerance::default(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> &Tolerance {
        &self.tolerance
    }

    pub fn numerics(&self) -> &Arc<dyn NumericLibrary> {
        &self.numerics
    }

    /// Local-to-world transform of an instance: unit scale applied after the
    /// instance transform, so world coordinates are meters.
    pub fn world_transform(&self, product: &ProductData, instance: usize) -> KernelResult<Transform> {
        let local = product.instance_transform(instance)?;
        Ok(Transform::uniform_scaling(product.unit_scale()).multiply(&local))
    }

    /// Curve of an edge, or `None` when the edge carries no 3D curve.
    pub fn curve3d_from_edge(
        &self,
        product: &ProductData,
        edge: usize,
        transform: &Transform,
    ) -> KernelResult<Option<Curve3d>> {
        let e = lookup(&product.edges, edge, "edge")?;
        let Some(curve) = e.curve_3d else {
            return Ok(None);
        };
        let data = lookup(&product.curves_3d, curve, "curve3D")?;
        self.build_curve(data, e.parameter_bounds, &e.tessellation_parameters, transform)
            .map(Some)
    }

    pub fn curve3d_from_segment(
        &self,
        product: &ProductData,
        segment: usize,
        transform: &Transform,
    ) -> KernelResult<Curve3d> {
        let s = lookup(&product.curve_segments, segment, "curve segment")?;
        let data = lookup(&product.curves_3d, s.curve_3d, "curve3D")?;
        self.build_curve(data, s.parameter_bounds, &s.tessellation_parameters, transform)
    }

    fn build_curve(
        &self,
        data: &Curve3dData,
        [begin, end]: [f64; 2],
        tessellation: &[f64],
        transform: &Transform,
    ) -> KernelResult<Curve3d> {
        let tess = if tessellation.is_empty() {
            vec![begin, end]
        } else {
            tessellation.to_vec()
        };
        let point = |xyz: &[f64; 3]| transform.transform_point(&Point3d::from_array(*xyz));
        let vector = |xyz: &[f64; 3]| transform.transform_vector(&Vec3::from_array(*xyz));

        let curve = match data {
            Curve3dData::Line { origin, direction } => {
                let mut line = Line::new(point(origin), vector(direction), begin, end);
                line.tessellation_parameters = tess;
                Curve3d::Line(line)
            }
            Curve3dData::Circle {
                origin,
                axis_x,
                axis_y,
                radius,
            } => {
                let x = vector(axis_x);
                let y = vector(axis_y);
                let scale = x.length();
                let mut arc = ArcCurve::new(
                    point(origin),
                    x.normalize(),
                    y.normalize(),
                    radius * scale,
                    begin,
                    end,
                );
                arc.tessellation_parameters = tess;
                Curve3d::Arc(arc)
            }
            Curve3dData::Nurbs {
                order,
                knots,
                control_points,
                weights,
            } => {
                let control_points = control_points
                    .chunks_exact(3)
                    .flat_map(|c| point(&[c[0], c[1], c[2]]).to_array())
                    .collect();
                let spec = CurveSpec {
                    order: *order,
                    knots: knots.clone(),
                    control_points,
                    weights: weights.clone(),
                };
                Curve3d::Nurbs(NurbsCurve {
                    resource: NativeResource::new(self.numerics.clone(), ResourceSpec::Curve(spec)),
                    begin_param: begin,
                    end_param: end,
                    tessellation_parameters: tess,
                })
            }
            Curve3dData::LineStrip { vertices } => {
                let points = vertices
                    .chunks_exact(3)
                    .map(|c| point(&[c[0], c[1], c[2]]))
                    .collect();
                Curve3d::LineStrip(LineStrip::new(points, begin, end, tessellation.to_vec()))
            }
        };
        trace!(kind = curve.kind().name(), "built curve");
        Ok(curve)
    }

    /// Parameter-space trimming curve of a half-edge.
    pub fn curve2d_from_half_edge(
        &self,
        product: &ProductData,
        half_edge: usize,
    ) -> KernelResult<Option<Curve2d>> {
        let he = lookup(&product.half_edges, half_edge, "half-edge")?;
        let Some(index) = he.curve_2d else {
            return Ok(None);
        };
        let curve = match lookup(&product.curves_2d, index, "curve2D")? {
            Curve2dData::Line { origin, direction } => Curve2d::Line {
                origin: Point2d::new(origin[0], origin[1]),
                direction: Point2d::new(direction[0], direction[1]),
            },
            Curve2dData::Circle { origin, radius } => Curve2d::Circle {
                origin: Point2d::new(origin[0], origin[1]),
                radius: *radius,
            },
            Curve2dData::Nurbs {
                order,
                knots,
                control_points,
                weights,
            } => {
                let spec = CurveSpec {
                    order: *order,
                    knots: knots.clone(),
                    control_points: control_points
                        .chunks_exact(2)
                        .flat_map(|c| [c[0], c[1], 0.0])
                        .collect(),
                    weights: weights.clone(),
                };
                Curve2d::Nurbs(NativeResource::new(
                    self.numerics.clone(),
                    ResourceSpec::Curve(spec),
                ))
            }
        };
        Ok(Some(curve))
    }

    /// Surface of a face placed by `transform`, or `None` for faces without
    /// an analytic or NURBS surface.
    ///
    /// The sense is the face's facing times the handedness of the composed
    /// transform, so mirrored instances keep outward normals outward.
    pub fn surface(
        &self,
        product: &ProductData,
        face: usize,
        transform: &Transform,
    ) -> KernelResult<Option<Surface>> {
        let f = lookup(&product.faces, face, "face")?;
        let Some(index) = f.surface else {
            return Ok(None);
        };
        let data = lookup(&product.surfaces, index, "surface")?;
        let placed = transform.multiply(&data.placement());

        let (shape, unit_to_world) = match data {
            SurfaceData::Plane { .. } => (SurfaceShape::Plane, placed),
            SurfaceData::Cylinder { radius, .. } => (
                SurfaceShape::Cylinder,
                placed.multiply(&Transform::scaling(*radius, *radius, 1.0)),
            ),
            SurfaceData::Cone {
                radius, half_angle, ..
            } => (
                SurfaceShape::Cone {
                    slope: half_angle.tan() / radius,
                },
                placed.multiply(&Transform::scaling(*radius, *radius, 1.0)),
            ),
            SurfaceData::Sphere { radius, .. } => (
                SurfaceShape::Sphere,
                placed.multiply(&Transform::uniform_scaling(*radius)),
            ),
            SurfaceData::Torus {
                major_radius,
                minor_radius,
                ..
            } => (
                SurfaceShape::Torus {
                    major_radius: *major_radius,
                    minor_radius: *minor_radius,
                },
                placed,
            ),
            SurfaceData::Nurbs {
                order_u,
                order_v,
                count_u,
                count_v,
                knots_u,
                knots_v,
                control_points,
                weights,
                ..
            } => {
                let spec = SurfaceSpec {
                    order_u: *order_u,
                    order_v: *order_v,
                    count_u: *count_u,
                    count_v: *count_v,
                    knots_u: knots_u.clone(),
                    knots_v: knots_v.clone(),
                    control_points: control_points.clone(),
                    weights: weights.clone(),
                };
                (
                    SurfaceShape::Nurbs(NativeResource::new(
                        self.numerics.clone(),
                        ResourceSpec::Surface(spec),
                    )),
                    placed,
                )
            }
        };
        let sense = f64::from(f.facing.signum()) * unit_to_world.handedness();
        Surface::new(shape, unit_to_world, sense).map(Some)
    }
}
