//! Properties of a single measured entity.

use serde::{Deserialize, Serialize};

use crate::error::{KernelResult, lookup};
use crate::geometry::curves::Curve3d;
use crate::geometry::point::{Point2d, Point3d};
use crate::geometry::surfaces::Surface;
use crate::geometry::vector::Vec3;
use crate::model::ProductData;

use super::Measurable;
use super::area::mesh_area;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SingleMeasurementValues {
    Point {
        position: Point3d,
    },
    Line {
        start: Point3d,
        end: Point3d,
        length: f64,
        direction: Vec3,
    },
    Arc {
        center: Point3d,
        radius: f64,
        /// Swept angle in radians.
        angle: f64,
        length: f64,
        start: Point3d,
        end: Point3d,
    },
    Curve {
        length: f64,
        start: Point3d,
        end: Point3d,
    },
    Plane {
        origin: Point3d,
        normal: Vec3,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        area: Option<f64>,
    },
    Cylinder {
        radius: f64,
        start: Point3d,
        end: Point3d,
        length: f64,
        valid_measure_settings: bool,
    },
    Face {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        area: Option<f64>,
    },
}

/// Area of a face from its triangulation evaluated on `surface`; `None`
/// when the face carries no triangulation.
pub fn face_area(
    product: &ProductData,
    face: usize,
    surface: &Surface,
) -> KernelResult<Option<f64>> {
    let Some(tri) = &lookup(&product.faces, face, "face")?.triangulation else {
        return Ok(None);
    };
    let mut positions = Vec::with_capacity(tri.vertex_count());
    let mut normals = Vec::with_capacity(tri.vertex_count());
    for uv in tri.vertices.chunks_exact(2) {
        let uv = Point2d::new(uv[0], uv[1]);
        positions.push(surface.eval_position(uv)?);
        normals.push(surface.eval_normal(uv)?);
    }
    mesh_area(&positions, &normals, &tri.indices).map(Some)
}

fn curve_values(curve: &Curve3d) -> KernelResult<SingleMeasurementValues> {
    let start = curve.position(curve.begin_param())?;
    let end = curve.position(curve.end_param())?;
    let values = match curve {
        Curve3d::Line(line) => SingleMeasurementValues::Line {
            start,
            end,
            length: line.length(),
            direction: (end - start).normalize(),
        },
        Curve3d::Arc(arc) => SingleMeasurementValues::Arc {
            center: arc.origin,
            radius: arc.radius,
            angle: arc.sweep().abs(),
            length: arc.length(),
            start,
            end,
        },
        Curve3d::LineStrip(_) | Curve3d::Nurbs(_) => SingleMeasurementValues::Curve {
            length: curve.length()?,
            start,
            end,
        },
    };
    Ok(values)
}

pub fn measure_single(
    entity: &Measurable,
    product: Option<&ProductData>,
) -> KernelResult<Option<SingleMeasurementValues>> {
    let values = match entity {
        Measurable::Point(p) => SingleMeasurementValues::Point { position: *p },
        Measurable::Curve(curve) => curve_values(curve)?,
        Measurable::Plane(plane) => SingleMeasurementValues::Plane {
            origin: plane.origin,
            normal: plane.normal,
            area: match product {
                Some(product) => face_area(product, plane.face, &plane.surface)?,
                None => None,
            },
        },
        Measurable::Cylinder(cyl) => SingleMeasurementValues::Cylinder {
            radius: cyl.axis.radius,
            start: cyl.axis.start,
            end: cyl.axis.end,
            length: cyl.axis.length(),
            valid_measure_settings: cyl.axis.valid_measure_settings,
        },
        Measurable::Face { surface, face } => SingleMeasurementValues::Face {
            area: match product {
                Some(product) => face_area(product, *face, surface)?,
                None => None,
            },
        },
    };
    Ok(Some(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::curves::{Arc, Line};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_line_values() {
        let line = Curve3d::Line(Line::from_points(
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(1.0, 3.0, 4.0),
        ));
        let SingleMeasurementValues::Line {
            length, direction, ..
        } = curve_values(&line).unwrap()
        else {
            panic!("expected line values");
        };
        assert!((length - 5.0).abs() < 1e-12);
        assert!((direction.y - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_quarter_arc_values() {
        let arc = Curve3d::Arc(Arc::new(
            Point3d::ORIGIN,
            Vec3::X,
            Vec3::Y,
            2.0,
            0.0,
            FRAC_PI_2,
        ));
        let SingleMeasurementValues::Arc {
            angle, length, end, ..
        } = curve_values(&arc).unwrap()
        else {
            panic!("expected arc values");
        };
        assert!((angle - FRAC_PI_2).abs() < 1e-12);
        assert!((length - std::f64::consts::PI).abs() < 1e-12);
        assert!(end.distance_to(&Point3d::new(0.0, 2.0, 0.0)) < 1e-12);
    }

    #[test]
    fn test_single_values_wire_format() {
        let v = SingleMeasurementValues::Cylinder {
            radius: 0.5,
            start: Point3d::ORIGIN,
            end: Point3d::new(0.0, 0.0, 1.0),
            length: 1.0,
            valid_measure_settings: false,
        };
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("\"kind\":\"cylinder\""));
        assert!(json.contains("\"validMeasureSettings\":false"));
    }
}
