//! Distance and angle measurement between picked entities.
//!
//! Entities are resolved to world-space [`Measurable`]s, ordered by kind name
//! so every unordered kind combination has exactly one implementation in
//! [`pairs`], and the result is swapped back to the caller's order.

pub mod area;
pub mod cylinder;
pub mod pairs;
pub mod primitives;
pub mod single;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{KernelResult, lookup};
use crate::factory::GeometryFactory;
use crate::geometry::curves::Curve3d;
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{Surface, SurfaceKind};
use crate::geometry::transform::Transform;
use crate::geometry::vector::Vec3;
use crate::model::ProductData;

pub use cylinder::{CylinderAxis, CylinderMeasure, cylinder_center_line, full_circle_cylinder};
pub use single::SingleMeasurementValues;

/// Reference to a topological entity of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParametricEntity {
    pub object_id: String,
    /// Index of the edge, face or curve segment.
    pub path_index: usize,
    pub instance_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<f64>,
}

/// A free point in world space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointEntity {
    pub object_id: String,
    pub parameter: Point3d,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "drawKind", rename_all = "camelCase")]
pub enum MeasureEntity {
    Edge(ParametricEntity),
    Face(ParametricEntity),
    CurveSegment(ParametricEntity),
    Vertex(PointEntity),
}

impl MeasureEntity {
    pub fn draw_kind(&self) -> &'static str {
        match self {
            MeasureEntity::Edge(_) => "edge",
            MeasureEntity::Face(_) => "face",
            MeasureEntity::CurveSegment(_) => "curveSegment",
            MeasureEntity::Vertex(_) => "vertex",
        }
    }

    pub fn object_id(&self) -> &str {
        match self {
            MeasureEntity::Edge(e) | MeasureEntity::Face(e) | MeasureEntity::CurveSegment(e) => {
                &e.object_id
            }
            MeasureEntity::Vertex(p) => &p.object_id,
        }
    }

    pub fn instance_index(&self) -> Option<usize> {
        match self {
            MeasureEntity::Edge(e) | MeasureEntity::Face(e) | MeasureEntity::CurveSegment(e) => {
                Some(e.instance_index)
            }
            MeasureEntity::Vertex(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeasureSettings {
    pub cylinder_measure: CylinderMeasure,
}

/// Where a measurement touches one of its entities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureInfo {
    pub point: Point3d,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<f64>,
    /// Present for cylinder faces: whether the requested mode was honored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_measure_settings: Option<bool>,
}

impl MeasureInfo {
    pub fn at(point: Point3d) -> Self {
        Self {
            point,
            parameter: None,
            valid_measure_settings: None,
        }
    }

    pub fn with_parameter(mut self, parameter: f64) -> Self {
        self.parameter = Some(parameter);
        self
    }

    pub fn with_validity(mut self, valid: bool) -> Self {
        self.valid_measure_settings = Some(valid);
        self
    }
}

/// Result of measuring between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuoMeasurementValues {
    pub distance: f64,
    pub distance_x: f64,
    pub distance_y: f64,
    pub distance_z: f64,
    /// Unsigned angle in `[0, π/2]` between non-parallel directions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    pub measure_info_a: MeasureInfo,
    pub measure_info_b: MeasureInfo,
    /// Draw-only helper line, emitted when an axis had to be reversed to
    /// fold the angle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_line: Option<[Point3d; 2]>,
}

impl DuoMeasurementValues {
    pub fn between(a: MeasureInfo, b: MeasureInfo) -> Self {
        let d = b.point - a.point;
        Self {
            distance: d.length(),
            distance_x: d.x.abs(),
            distance_y: d.y.abs(),
            distance_z: d.z.abs(),
            angle: None,
            measure_info_a: a,
            measure_info_b: b,
            additional_line: None,
        }
    }

    /// Replace the distance with a signed offset, keeping the components.
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = Some(angle);
        self
    }

    pub fn swapped(self) -> Self {
        Self {
            measure_info_a: self.measure_info_b,
            measure_info_b: self.measure_info_a,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MeasurementValues {
    Duo(DuoMeasurementValues),
    Single(SingleMeasurementValues),
}

/// An entity together with the product data it refers to. Vertices carry
/// their own position and need no product.
#[derive(Debug, Clone, Copy)]
pub struct EntityRef<'a> {
    pub entity: &'a MeasureEntity,
    pub product: Option<&'a ProductData>,
}

impl<'a> EntityRef<'a> {
    pub fn new(entity: &'a MeasureEntity, product: Option<&'a ProductData>) -> Self {
        Self { entity, product }
    }
}

/// Planar face reduced to a reference point and its outward normal.
#[derive(Debug, Clone)]
pub struct PlaneFace {
    pub origin: Point3d,
    pub normal: Vec3,
    pub surface: Surface,
    pub face: usize,
}

impl PlaneFace {
    /// Signed distance of `p` above the plane.
    pub fn offset(&self, p: &Point3d) -> f64 {
        (*p - self.origin).dot(&self.normal)
    }

    pub fn project(&self, p: &Point3d) -> Point3d {
        *p - self.normal * self.offset(p)
    }
}

#[derive(Debug, Clone)]
pub struct CylinderFace {
    pub axis: CylinderAxis,
    pub surface: Surface,
    pub face: usize,
}

/// An entity resolved to world-space geometry.
#[derive(Debug, Clone)]
pub enum Measurable {
    Point(Point3d),
    Curve(Curve3d),
    Plane(PlaneFace),
    Cylinder(CylinderFace),
    /// Any other surface, measured by inversion.
    Face { surface: Surface, face: usize },
}

impl Measurable {
    /// Name used to order a pair before dispatch.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Measurable::Point(_) => "point",
            Measurable::Curve(c) => c.kind().name(),
            Measurable::Plane(_) => "plane",
            Measurable::Cylinder(_) => "cylinder",
            Measurable::Face { .. } => "face",
        }
    }
}

/// Reference point of a planar face: centroid of its outer loop corners,
/// projected onto the plane, or the surface origin when the loop has no
/// corner vertices.
fn plane_reference_point(
    product: &ProductData,
    face: usize,
    transform: &Transform,
    origin: Point3d,
    normal: &Vec3,
) -> KernelResult<Point3d> {
    let outer = lookup(&product.faces, face, "face")?.outer_loop;
    let corners = product.loop_vertices(outer)?;
    if corners.is_empty() {
        return Ok(origin);
    }
    let sum = corners
        .iter()
        .map(|p| transform.transform_point(p).to_vec3())
        .fold(Vec3::ZERO, |acc, v| acc + v);
    let centroid = Point3d::ORIGIN + sum / corners.len() as f64;
    Ok(centroid - *normal * (centroid - origin).dot(normal))
}

/// Resolve an entity to world-space geometry. `Ok(None)` when the entity
/// has no geometry to measure (missing product, edge without curve, face
/// without surface).
pub fn resolve(
    factory: &GeometryFactory,
    entity: EntityRef<'_>,
    settings: &MeasureSettings,
) -> KernelResult<Option<Measurable>> {
    let parametric = match entity.entity {
        MeasureEntity::Vertex(p) => return Ok(Some(Measurable::Point(p.parameter))),
        MeasureEntity::Edge(e) | MeasureEntity::Face(e) | MeasureEntity::CurveSegment(e) => e,
    };
    let Some(product) = entity.product else {
        debug!(object = %parametric.object_id, "no product data for entity");
        return Ok(None);
    };
    let transform = factory.world_transform(product, parametric.instance_index)?;
    let index = parametric.path_index;

    let measurable = match entity.entity {
        MeasureEntity::Edge(_) => factory
            .curve3d_from_edge(product, index, &transform)?
            .map(Measurable::Curve),
        MeasureEntity::CurveSegment(_) => Some(Measurable::Curve(
            factory.curve3d_from_segment(product, index, &transform)?,
        )),
        MeasureEntity::Face(_) => {
            let Some(surface) = factory.surface(product, index, &transform)? else {
                return Ok(None);
            };
            match surface.kind() {
                SurfaceKind::Plane => {
                    let normal = surface.plane_normal().unwrap_or(Vec3::Z);
                    let origin =
                        plane_reference_point(product, index, &transform, surface.origin(), &normal)?;
                    Some(Measurable::Plane(PlaneFace {
                        origin,
                        normal,
                        surface,
                        face: index,
                    }))
                }
                SurfaceKind::Cylinder => cylinder_center_line(
                    factory,
                    product,
                    index,
                    &surface,
                    &transform,
                    settings.cylinder_measure,
                )?
                .map(|axis| {
                    Measurable::Cylinder(CylinderFace {
                        axis,
                        surface,
                        face: index,
                    })
                }),
                _ => Some(Measurable::Face {
                    surface,
                    face: index,
                }),
            }
        }
        MeasureEntity::Vertex(_) => None,
    };
    Ok(measurable)
}

/// Measure one entity, or the distance/angle between two.
///
/// Returns `Ok(None)` for kind combinations without a defined measurement
/// and for entities that cannot be resolved.
#[instrument(skip_all, fields(a = a.entity.draw_kind(), b = b.map(|b| b.entity.draw_kind())))]
pub fn measure(
    factory: &GeometryFactory,
    a: EntityRef<'_>,
    b: Option<EntityRef<'_>>,
    settings_a: Option<&MeasureSettings>,
    settings_b: Option<&MeasureSettings>,
) -> KernelResult<Option<MeasurementValues>> {
    let settings_a = settings_a.copied().unwrap_or_default();
    let settings_b = settings_b.copied().unwrap_or_default();

    let Some(first) = resolve(factory, a, &settings_a)? else {
        return Ok(None);
    };
    let Some(b) = b else {
        return Ok(single::measure_single(&first, a.product)?.map(MeasurementValues::Single));
    };
    let Some(second) = resolve(factory, b, &settings_b)? else {
        return Ok(None);
    };

    let swap = first.kind_name() > second.kind_name();
    let (lo, hi) = if swap { (&second, &first) } else { (&first, &second) };
    let result = pairs::measure_pair(factory.tolerance(), lo, hi)?;
    debug!(
        kinds = %format!("{}_{}", lo.kind_name(), hi.kind_name()),
        found = result.is_some(),
        "measured pair"
    );
    Ok(result
        .map(|values| if swap { values.swapped() } else { values })
        .map(MeasurementValues::Duo))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f64, y: f64, z: f64) -> MeasureEntity {
        MeasureEntity::Vertex(PointEntity {
            object_id: "free".into(),
            parameter: Point3d::new(x, y, z),
        })
    }

    #[test]
    fn test_entity_wire_format() {
        let json = r#"{"drawKind":"curveSegment","objectId":"road","pathIndex":2,"instanceIndex":0}"#;
        let entity: MeasureEntity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.draw_kind(), "curveSegment");
        assert_eq!(entity.object_id(), "road");
        let back = serde_json::to_string(&entity).unwrap();
        assert!(back.contains("\"drawKind\":\"curveSegment\""));
        assert!(!back.contains("parameter"));
    }

    #[test]
    fn test_point_to_point() {
        let factory = GeometryFactory::default();
        let a = vertex(0.0, 0.0, 0.0);
        let b = vertex(1.0, 2.0, 2.0);
        let result = measure(
            &factory,
            EntityRef::new(&a, None),
            Some(EntityRef::new(&b, None)),
            None,
            None,
        )
        .unwrap()
        .unwrap();
        let MeasurementValues::Duo(duo) = result else {
            panic!("expected a duo measurement");
        };
        assert!((duo.distance - 3.0).abs() < 1e-12);
        assert!((duo.distance_y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_product_is_soft_failure() {
        let factory = GeometryFactory::default();
        let edge = MeasureEntity::Edge(ParametricEntity {
            object_id: "gone".into(),
            path_index: 0,
            instance_index: 0,
            parameter: None,
        });
        let p = vertex(0.0, 0.0, 0.0);
        let result = measure(
            &factory,
            EntityRef::new(&edge, None),
            Some(EntityRef::new(&p, None)),
            None,
            None,
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_measurement_values_are_tagged() {
        let duo = DuoMeasurementValues::between(
            MeasureInfo::at(Point3d::ORIGIN),
            MeasureInfo::at(Point3d::new(1.0, 0.0, 0.0)),
        );
        let json = serde_json::to_string(&MeasurementValues::Duo(duo)).unwrap();
        assert!(json.contains("\"type\":\"duo\""));
        assert!(json.contains("\"distanceX\":1.0"));
    }
}
