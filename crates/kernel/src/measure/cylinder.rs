//! Cylinder axis reconstruction from face topology, and the radius-aware
//! measurement modes it enables.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Tolerance;
use crate::error::{KernelResult, lookup};
use crate::factory::GeometryFactory;
use crate::geometry::curves::Curve3d;
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::Surface;
use crate::geometry::transform::Transform;
use crate::geometry::vector::Vec3;
use crate::model::{Curve3dData, ProductData};

/// Reference line used when measuring against a cylinder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CylinderMeasure {
    /// The axis itself.
    #[default]
    Center,
    /// Axis moved up by the radius, perpendicular to the axis.
    Top,
    /// Axis moved down by the radius, perpendicular to the axis.
    Bottom,
    /// Nearest point of the cylinder wall.
    Closest,
    /// Farthest point of the cylinder wall.
    Furthest,
}

impl CylinderMeasure {
    pub fn needs_radius(&self) -> bool {
        !matches!(self, CylinderMeasure::Center)
    }
}

/// Reference up direction for the top/bottom modes.
pub const WORLD_UP: Vec3 = Vec3::Z;

/// A cylinder face reduced to its (possibly offset) axis segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylinderAxis {
    pub start: Point3d,
    pub end: Point3d,
    pub radius: f64,
    /// Whether the face is bounded by two full circles.
    pub full_circle: bool,
    /// Mode actually applied.
    pub mode: CylinderMeasure,
    /// False when the requested mode needed a full-circle face and was
    /// replaced by [`CylinderMeasure::Center`].
    pub valid_measure_settings: bool,
}

impl CylinderAxis {
    pub fn direction(&self) -> Vec3 {
        (self.end - self.start).normalize()
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    /// Move a point found on the axis onto the cylinder wall for the
    /// closest/furthest modes, relative to `other`. Other modes return the
    /// axis point unchanged.
    pub fn wall_point(&self, axis_point: Point3d, other: &Point3d) -> Point3d {
        let sign = match self.mode {
            CylinderMeasure::Closest => 1.0,
            CylinderMeasure::Furthest => -1.0,
            _ => return axis_point,
        };
        let towards = (*other - axis_point)
            .normalized()
            .unwrap_or_else(|| self.direction().any_perpendicular());
        axis_point + towards * (sign * self.radius)
    }
}

fn circle_edges(product: &ProductData, face: usize) -> KernelResult<Vec<usize>> {
    let f = lookup(&product.faces, face, "face")?;
    let mut circles = Vec::new();
    for edge_index in product.loop_edges(f.outer_loop)? {
        let edge = lookup(&product.edges, edge_index, "edge")?;
        if edge.is_virtual || circles.contains(&edge_index) {
            continue;
        }
        let Some(curve) = edge.curve_3d else { continue };
        if matches!(
            lookup(&product.curves_3d, curve, "curve3D")?,
            Curve3dData::Circle { .. }
        ) {
            circles.push(edge_index);
        }
    }
    Ok(circles)
}

/// True iff the face's outer loop has exactly two circular edges and each
/// spans a full turn (within `tolerance.full_circle` of 2π).
pub fn full_circle_cylinder(
    product: &ProductData,
    face: usize,
    tolerance: &Tolerance,
) -> KernelResult<bool> {
    let circles = circle_edges(product, face)?;
    if circles.len() != 2 {
        return Ok(false);
    }
    for edge in circles {
        let [begin, end] = lookup(&product.edges, edge, "edge")?.parameter_bounds;
        if !tolerance.is_full_circle(end - begin) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Direction perpendicular to `axis` pointing as far "up" as possible.
fn up_offset_direction(axis: &Vec3) -> Vec3 {
    let project = |v: Vec3| v - *axis * v.dot(axis);
    let up = project(WORLD_UP);
    if up.length() > 1e-6 {
        return up.normalize();
    }
    // Vertical axis: any horizontal helper will do.
    project(Vec3::X).normalized().unwrap_or(Vec3::Y)
}

/// Axis of a cylinder face in the space of `transform`.
///
/// The direction is the surface's local Z axis; the extent runs between the
/// origins of the two bounding circles, or over the projections of the
/// boundary onto the axis when the face has fewer circles. For the top and
/// bottom modes the segment is moved by the radius perpendicular to the
/// axis. Radius-aware modes are honored only for full-circle faces.
pub fn cylinder_center_line(
    factory: &GeometryFactory,
    product: &ProductData,
    face: usize,
    surface: &Surface,
    transform: &Transform,
    requested: CylinderMeasure,
) -> KernelResult<Option<CylinderAxis>> {
    let direction = surface.axis();
    let mut origins = Vec::new();
    let mut radius = None;
    for edge in circle_edges(product, face)? {
        if let Some(Curve3d::Arc(arc)) = factory.curve3d_from_edge(product, edge, transform)? {
            origins.push(arc.origin);
            radius.get_or_insert(arc.radius);
        }
    }
    let Some(radius) = radius.or_else(|| surface.radius()) else {
        return Ok(None);
    };

    let (start, end) = if let [o1, o2, ..] = origins[..] {
        let delta = o2 - o1;
        let span = delta.length() * if delta.dot(&direction) < 0.0 { -1.0 } else { 1.0 };
        (o1, o1 + direction * span)
    } else {
        let base = surface.origin();
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for edge in product.face_edges(face)? {
            let Some(curve) = factory.curve3d_from_edge(product, edge, transform)? else {
                continue;
            };
            for t in curve.sample_parameters(8) {
                let s = (curve.position(t)? - base).dot(&direction);
                lo = lo.min(s);
                hi = hi.max(s);
            }
        }
        if lo > hi {
            debug!(face, "cylinder face has no boundary to measure its axis from");
            return Ok(None);
        }
        (base + direction * lo, base + direction * hi)
    };

    let full_circle = full_circle_cylinder(product, face, factory.tolerance())?;
    let valid = full_circle || !requested.needs_radius();
    if !valid {
        warn!(face, ?requested, "cylinder is not a full circle, measuring from the axis");
    }
    let mode = if valid { requested } else { CylinderMeasure::Center };

    let offset = match mode {
        CylinderMeasure::Top => up_offset_direction(&direction) * radius,
        CylinderMeasure::Bottom => up_offset_direction(&direction) * -radius,
        _ => Vec3::ZERO,
    };
    Ok(Some(CylinderAxis {
        start: start + offset,
        end: end + offset,
        radius,
        full_circle,
        mode,
        valid_measure_settings: valid,
    }))
}
