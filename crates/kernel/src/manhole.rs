//! Manhole dimensions from horizontal planes and vertical cylinders.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::KernelResult;
use crate::factory::GeometryFactory;
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::SurfaceKind;
use crate::geometry::transform::Transform;
use crate::measure::{MeasureEntity, ParametricEntity};
use crate::model::ProductData;

/// Minimum top-to-bottom height, in meters.
pub const MIN_HEIGHT: f64 = 0.1;

const VERTICAL_EPS: f64 = 1e-3;
const LEVEL_EPS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManholeLevel {
    pub entity: MeasureEntity,
    pub elevation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManholeWall {
    pub entity: MeasureEntity,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManholeMeasureValues {
    pub top: ManholeLevel,
    pub bottom_outer: ManholeLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom_inner: Option<ManholeLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer: Option<ManholeWall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner: Option<ManholeWall>,
    /// Top to outer bottom.
    pub height: f64,
    /// Top to inner bottom.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_height: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PlaneCandidate {
    pub face: usize,
    pub elevation: f64,
    /// Horizontal extent around the face centroid.
    pub radius: f64,
    pub upward: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CylinderCandidate {
    pub face: usize,
    pub radius: f64,
    pub z_min: f64,
    pub z_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Classified {
    pub top: PlaneCandidate,
    pub bottom_outer: PlaneCandidate,
    pub bottom_inner: Option<PlaneCandidate>,
    pub outer: Option<CylinderCandidate>,
    pub inner: Option<CylinderCandidate>,
}

/// Pick the extreme plane by elevation; equal elevations prefer the wider
/// face.
fn extreme<'a>(
    planes: impl Iterator<Item = &'a PlaneCandidate>,
    highest: bool,
) -> Option<PlaneCandidate> {
    planes.copied().reduce(|best, p| {
        let delta = if highest {
            p.elevation - best.elevation
        } else {
            best.elevation - p.elevation
        };
        if delta > LEVEL_EPS || (delta.abs() <= LEVEL_EPS && p.radius > best.radius) {
            p
        } else {
            best
        }
    })
}

pub(crate) fn classify(
    planes: &[PlaneCandidate],
    cylinders: &[CylinderCandidate],
) -> Option<Classified> {
    let top = extreme(planes.iter().filter(|p| p.upward), true)?;
    let bottom_outer = extreme(planes.iter().filter(|p| !p.upward), false)?;
    if (top.elevation - bottom_outer.elevation).abs() <= LEVEL_EPS {
        debug!(elevation = top.elevation, "top and bottom planes coincide");
        return None;
    }
    let bottom_inner = extreme(
        planes.iter().filter(|p| p.upward && p.face != top.face),
        false,
    );

    let span = top.elevation - bottom_outer.elevation;
    let walls: Vec<CylinderCandidate> = cylinders
        .iter()
        .copied()
        .filter(|c| c.z_max - c.z_min > span.abs() / 3.0)
        .collect();
    let outer = walls.iter().copied().reduce(|a, b| if b.radius > a.radius { b } else { a });
    let inner = walls
        .iter()
        .copied()
        .reduce(|a, b| if b.radius < a.radius { b } else { a })
        .filter(|c| outer.is_some_and(|o| o.face != c.face));

    Some(Classified {
        top,
        bottom_outer,
        bottom_inner,
        outer,
        inner,
    })
}

fn face_points(
    factory: &GeometryFactory,
    product: &ProductData,
    face: usize,
    transform: &Transform,
) -> KernelResult<Vec<Point3d>> {
    let mut points = Vec::new();
    for edge in product.face_edges(face)? {
        if let Some(curve) = factory.curve3d_from_edge(product, edge, transform)? {
            for t in curve.sample_parameters(16) {
                points.push(curve.position(t)?);
            }
        }
    }
    Ok(points)
}

fn candidates(
    factory: &GeometryFactory,
    product: &ProductData,
    instance: usize,
) -> KernelResult<(Vec<PlaneCandidate>, Vec<CylinderCandidate>)> {
    let transform = factory.world_transform(product, instance)?;
    let mut planes = Vec::new();
    let mut cylinders = Vec::new();
    for face in product.instance_faces(instance)? {
        let Some(surface) = factory.surface(product, face, &transform)? else {
            continue;
        };
        match surface.kind() {
            SurfaceKind::Plane => {
                let Some(normal) = surface.plane_normal() else { continue };
                if normal.z.abs() < 1.0 - VERTICAL_EPS {
                    continue;
                }
                let points = face_points(factory, product, face, &transform)?;
                let (elevation, radius) = if points.is_empty() {
                    (surface.origin().z, 0.0)
                } else {
                    let n = points.len() as f64;
                    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
                    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
                    let cz = points.iter().map(|p| p.z).sum::<f64>() / n;
                    let r = points
                        .iter()
                        .map(|p| (p.x - cx).hypot(p.y - cy))
                        .fold(0.0, f64::max);
                    (cz, r)
                };
                planes.push(PlaneCandidate {
                    face,
                    elevation,
                    radius,
                    upward: normal.z > 0.0,
                });
            }
            SurfaceKind::Cylinder => {
                if surface.axis().z.abs() < 1.0 - VERTICAL_EPS {
                    continue;
                }
                let Some(radius) = surface.radius() else { continue };
                let points = face_points(factory, product, face, &transform)?;
                if points.is_empty() {
                    continue;
                }
                let z_min = points.iter().map(|p| p.z).fold(f64::INFINITY, f64::min);
                let z_max = points.iter().map(|p| p.z).fold(f64::NEG_INFINITY, f64::max);
                cylinders.push(CylinderCandidate {
                    face,
                    radius,
                    z_min,
                    z_max,
                });
            }
            _ => {}
        }
    }
    Ok((planes, cylinders))
}

/// Detect manhole levels and walls in the first instance that looks like
/// one. `Ok(None)` when no instance qualifies.
#[instrument(skip(factory, product))]
pub fn detect_manhole(
    factory: &GeometryFactory,
    product: &ProductData,
    object_id: &str,
) -> KernelResult<Option<ManholeMeasureValues>> {
    for instance in 0..product.instances.len() {
        let (planes, cylinders) = candidates(factory, product, instance)?;
        let Some(found) = classify(&planes, &cylinders) else {
            continue;
        };
        let height = found.top.elevation - found.bottom_outer.elevation;
        if height < MIN_HEIGHT {
            debug!(instance, height, "too shallow for a manhole");
            continue;
        }

        let entity = |face: usize| {
            MeasureEntity::Face(ParametricEntity {
                object_id: object_id.to_string(),
                path_index: face,
                instance_index: instance,
                parameter: None,
            })
        };
        let level = |p: PlaneCandidate| ManholeLevel {
            entity: entity(p.face),
            elevation: p.elevation,
        };
        let wall = |c: CylinderCandidate| ManholeWall {
            entity: entity(c.face),
            radius: c.radius,
        };
        return Ok(Some(ManholeMeasureValues {
            top: level(found.top),
            bottom_outer: level(found.bottom_outer),
            bottom_inner: found.bottom_inner.map(level),
            outer: found.outer.map(wall),
            inner: found.inner.map(wall),
            height,
            inner_height: found
                .bottom_inner
                .map(|b| found.top.elevation - b.elevation),
        }));
    }
    Ok(None)
}
