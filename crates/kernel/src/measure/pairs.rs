//! Pairwise measurements, one implementation per kind combination.
//!
//! Callers order the pair by kind name first (see [`super::measure`]), so
//! `a` always sorts before `b`: arc < cylinder < face < line < lineStrip <
//! nurbs < plane < point.

use std::f64::consts::FRAC_PI_2;

use tracing::{debug, trace};

use crate::Tolerance;
use crate::error::KernelResult;
use crate::geometry::curves::Curve3d;
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::Surface;
use crate::geometry::vector::Vec3;

use super::primitives::{
    ClosestPoints, closest_point_to_line, closest_points_to_intersection, closest_projected_points,
};
use super::{CylinderFace, DuoMeasurementValues, MeasureInfo, Measurable, PlaneFace};

const MAX_PROJECTION_STEPS: usize = 64;
const CURVE_SAMPLES: usize = 16;

pub fn measure_pair(
    tolerance: &Tolerance,
    a: &Measurable,
    b: &Measurable,
) -> KernelResult<Option<DuoMeasurementValues>> {
    use Measurable as M;
    let values = match (a, b) {
        (M::Point(p), M::Point(q)) => Some(DuoMeasurementValues::between(
            MeasureInfo::at(*p),
            MeasureInfo::at(*q),
        )),
        (M::Curve(c), M::Point(p)) => Some(curve_point(c, p)?),
        (M::Plane(plane), M::Point(p)) => Some(plane_point(plane, p)),
        (M::Cylinder(cyl), M::Point(p)) => Some(cylinder_point(cyl, p)),
        (M::Face { surface, .. }, M::Point(p)) => Some(face_point(surface, p)?),
        (M::Curve(c1), M::Curve(c2)) => Some(curve_curve(c1, c2)?),
        (M::Curve(c), M::Plane(plane)) => line_plane(tolerance, c, plane),
        (M::Curve(c), M::Cylinder(cyl)) => Some(cylinder_curve(cyl, c)?.swapped()),
        (M::Cylinder(cyl), M::Curve(c)) => Some(cylinder_curve(cyl, c)?),
        (M::Cylinder(c1), M::Cylinder(c2)) => Some(cylinder_cylinder(tolerance, c1, c2)),
        (M::Cylinder(cyl), M::Plane(plane)) => cylinder_plane(tolerance, cyl, plane),
        (M::Plane(p1), M::Plane(p2)) => Some(plane_plane(tolerance, p1, p2)),
        _ => {
            debug!(a = a.kind_name(), b = b.kind_name(), "no measurement for kind pair");
            None
        }
    };
    Ok(values)
}

fn curve_point(curve: &Curve3d, p: &Point3d) -> KernelResult<DuoMeasurementValues> {
    let (t, q) = curve.closest_point(p)?;
    Ok(DuoMeasurementValues::between(
        MeasureInfo::at(q).with_parameter(t),
        MeasureInfo::at(*p),
    ))
}

/// Foot of the perpendicular on the plane, then the point itself.
fn plane_point(plane: &PlaneFace, p: &Point3d) -> DuoMeasurementValues {
    DuoMeasurementValues::between(MeasureInfo::at(plane.project(p)), MeasureInfo::at(*p))
}

fn cylinder_info(cyl: &CylinderFace, point: Point3d, parameter: f64) -> MeasureInfo {
    MeasureInfo::at(point)
        .with_parameter(parameter)
        .with_validity(cyl.axis.valid_measure_settings)
}

fn cylinder_point(cyl: &CylinderFace, p: &Point3d) -> DuoMeasurementValues {
    let (on_axis, s) = closest_point_to_line(p, &cyl.axis.start, &cyl.axis.end);
    let wall = cyl.axis.wall_point(on_axis, p);
    DuoMeasurementValues::between(cylinder_info(cyl, wall, s), MeasureInfo::at(*p))
}

fn face_point(surface: &Surface, p: &Point3d) -> KernelResult<DuoMeasurementValues> {
    let (_, q) = surface.closest_point(p)?;
    Ok(DuoMeasurementValues::between(
        MeasureInfo::at(q),
        MeasureInfo::at(*p),
    ))
}

/// Straight segment or whole curve; line strips are measured per segment.
enum Piece<'a> {
    Segment {
        start: Point3d,
        end: Point3d,
        t0: f64,
        t1: f64,
    },
    Curve(&'a Curve3d),
}

impl Piece<'_> {
    fn segment(start: Point3d, end: Point3d, t0: f64, t1: f64) -> Self {
        Piece::Segment { start, end, t0, t1 }
    }

    /// Closest point and its curve parameter.
    fn closest(&self, p: &Point3d) -> KernelResult<(f64, Point3d)> {
        match self {
            Piece::Segment { start, end, t0, t1 } => {
                let (q, s) = closest_point_to_line(p, start, end);
                Ok((t0 + s * (t1 - t0), q))
            }
            Piece::Curve(c) => c.closest_point(p),
        }
    }

    fn samples(&self) -> KernelResult<Vec<(f64, Point3d)>> {
        match self {
            Piece::Segment { start, end, t0, t1 } => Ok(vec![
                (*t0, *start),
                (0.5 * (t0 + t1), start.midpoint(end)),
                (*t1, *end),
            ]),
            Piece::Curve(c) => c
                .sample_parameters(CURVE_SAMPLES)
                .into_iter()
                .map(|t| Ok((t, c.position(t)?)))
                .collect(),
        }
    }
}

fn pieces(curve: &Curve3d) -> Vec<Piece<'_>> {
    match curve {
        Curve3d::Line(line) => vec![Piece::segment(
            line.start(),
            line.end(),
            line.begin_param,
            line.end_param,
        )],
        Curve3d::LineStrip(strip) => strip
            .segments()
            .map(|(line, t0, t1)| Piece::segment(line.start(), line.end(), t0, t1))
            .collect(),
        Curve3d::Arc(_) | Curve3d::Nurbs(_) => vec![Piece::Curve(curve)],
    }
}

/// Alternate closest-point projections between the two pieces, starting
/// from samples of both, and keep the best converged pair.
fn mutual_projection(a: &Piece<'_>, b: &Piece<'_>) -> KernelResult<ClosestPoints> {
    let mut best: Option<ClosestPoints> = None;
    let mut keep = |candidate: ClosestPoints| {
        if best.is_none_or(|b| candidate.distance < b.distance) {
            best = Some(candidate);
        }
    };

    for (_, start) in a.samples()? {
        let (mut ta, mut pa) = a.closest(&start)?;
        let (mut tb, mut pb) = b.closest(&pa)?;
        for _ in 0..MAX_PROJECTION_STEPS {
            let (na, qa) = a.closest(&pb)?;
            let (nb, qb) = b.closest(&qa)?;
            let moved = qa.distance_to(&pa) + qb.distance_to(&pb);
            (ta, pa, tb, pb) = (na, qa, nb, qb);
            if moved < 1e-13 {
                break;
            }
        }
        keep(ClosestPoints::new(pa, ta, pb, tb));
    }
    for (_, start) in b.samples()? {
        let (mut tb, mut pb) = b.closest(&start)?;
        let (mut ta, mut pa) = a.closest(&pb)?;
        for _ in 0..MAX_PROJECTION_STEPS {
            let (nb, qb) = b.closest(&pa)?;
            let (na, qa) = a.closest(&qb)?;
            let moved = qa.distance_to(&pa) + qb.distance_to(&pb);
            (ta, pa, tb, pb) = (na, qa, nb, qb);
            if moved < 1e-13 {
                break;
            }
        }
        keep(ClosestPoints::new(pa, ta, pb, tb));
    }
    Ok(best.unwrap_or_else(|| ClosestPoints::new(Point3d::ORIGIN, 0.0, Point3d::ORIGIN, 0.0)))
}

fn piece_pair(a: &Piece<'_>, b: &Piece<'_>) -> KernelResult<ClosestPoints> {
    match (a, b) {
        (
            Piece::Segment {
                start: a0,
                end: a1,
                t0: ta0,
                t1: ta1,
            },
            Piece::Segment {
                start: b0,
                end: b1,
                t0: tb0,
                t1: tb1,
            },
        ) => {
            let c = closest_projected_points(a0, a1, b0, b1);
            Ok(ClosestPoints {
                param_a: ta0 + c.param_a * (ta1 - ta0),
                param_b: tb0 + c.param_b * (tb1 - tb0),
                ..c
            })
        }
        _ => mutual_projection(a, b),
    }
}

/// Closest points over every pair of pieces; the global minimum wins.
fn closest_between(a: &[Piece<'_>], b: &[Piece<'_>]) -> KernelResult<Option<ClosestPoints>> {
    let mut best: Option<ClosestPoints> = None;
    for pa in a {
        for pb in b {
            let c = piece_pair(pa, pb)?;
            if best.is_none_or(|b| c.distance < b.distance) {
                best = Some(c);
            }
        }
    }
    Ok(best)
}

fn curve_curve(a: &Curve3d, b: &Curve3d) -> KernelResult<DuoMeasurementValues> {
    let c = closest_between(&pieces(a), &pieces(b))?.unwrap_or_else(|| {
        trace!("empty line strip, measuring between start points");
        ClosestPoints::new(Point3d::ORIGIN, 0.0, Point3d::ORIGIN, 0.0)
    });
    Ok(DuoMeasurementValues::between(
        MeasureInfo::at(c.point_a).with_parameter(c.param_a),
        MeasureInfo::at(c.point_b).with_parameter(c.param_b),
    ))
}

/// Only defined for a straight line parallel to the plane; the distance is
/// the signed offset of the line above the plane.
fn line_plane(
    tolerance: &Tolerance,
    curve: &Curve3d,
    plane: &PlaneFace,
) -> Option<DuoMeasurementValues> {
    let Curve3d::Line(line) = curve else {
        return None;
    };
    if !tolerance.are_perpendicular(&line.direction, &plane.normal) {
        return None;
    }
    let start = line.start();
    let offset = plane.offset(&start);
    Some(
        DuoMeasurementValues::between(
            MeasureInfo::at(start).with_parameter(line.begin_param),
            MeasureInfo::at(plane.project(&start)),
        )
        .with_distance(offset),
    )
}

fn cylinder_curve(cyl: &CylinderFace, curve: &Curve3d) -> KernelResult<DuoMeasurementValues> {
    let axis = [Piece::segment(cyl.axis.start, cyl.axis.end, 0.0, 1.0)];
    let c = closest_between(&axis, &pieces(curve))?
        .unwrap_or_else(|| ClosestPoints::new(cyl.axis.start, 0.0, cyl.axis.start, 0.0));
    let wall = cyl.axis.wall_point(c.point_a, &c.point_b);
    Ok(DuoMeasurementValues::between(
        cylinder_info(cyl, wall, c.param_a),
        MeasureInfo::at(c.point_b).with_parameter(c.param_b),
    ))
}

/// Fold an angle between two directions into `[0, π/2]`. Returns whether
/// the second direction had to be reversed.
fn fold_angle(a: &Vec3, b: &Vec3) -> (f64, bool) {
    let angle = a.angle_to(b);
    if angle > FRAC_PI_2 {
        (std::f64::consts::PI - angle, true)
    } else {
        (angle, false)
    }
}

fn cylinder_cylinder(
    tolerance: &Tolerance,
    a: &CylinderFace,
    b: &CylinderFace,
) -> DuoMeasurementValues {
    let (a0, a1) = (a.axis.start, a.axis.end);
    let (b0, b1) = (b.axis.start, b.axis.end);
    let c = closest_projected_points(&a0, &a1, &b0, &b1);
    let wall_a = a.axis.wall_point(c.point_a, &c.point_b);
    let wall_b = b.axis.wall_point(c.point_b, &c.point_a);
    let mut values = DuoMeasurementValues::between(
        cylinder_info(a, wall_a, c.param_a),
        cylinder_info(b, wall_b, c.param_b),
    );

    let (da, db) = (a.axis.direction(), b.axis.direction());
    if tolerance.are_parallel(&da, &db) {
        return values;
    }
    let Some(crossing) = closest_points_to_intersection(&a0, &a1, &b0, &b1) else {
        return values;
    };
    if crossing.distance > a.axis.radius + b.axis.radius {
        trace!(gap = crossing.distance, "axes too far apart for an angle");
        return values;
    }
    let (angle, reversed) = fold_angle(&da, &db);
    if reversed {
        let from = crossing.point_b;
        values.additional_line = Some([from, from - db * b.axis.length()]);
    }
    values.with_angle(angle)
}

/// Axis parallel to the plane: signed offset, moved by the radius for the
/// closest/furthest modes. Axis along the normal: offset of the nearer axis
/// end. Otherwise undefined.
fn cylinder_plane(
    tolerance: &Tolerance,
    cyl: &CylinderFace,
    plane: &PlaneFace,
) -> Option<DuoMeasurementValues> {
    let direction = cyl.axis.direction();
    if tolerance.are_perpendicular(&direction, &plane.normal) {
        let start = cyl.axis.start;
        let wall = cyl.axis.wall_point(start, &plane.project(&start));
        return Some(
            DuoMeasurementValues::between(
                cylinder_info(cyl, wall, 0.0),
                MeasureInfo::at(plane.project(&wall)),
            )
            .with_distance(plane.offset(&wall)),
        );
    }
    if tolerance.are_parallel(&direction, &plane.normal) {
        let (start, end) = (cyl.axis.start, cyl.axis.end);
        let (point, s) = if plane.offset(&start).abs() <= plane.offset(&end).abs() {
            (start, 0.0)
        } else {
            (end, 1.0)
        };
        return Some(
            DuoMeasurementValues::between(
                cylinder_info(cyl, point, s),
                MeasureInfo::at(plane.project(&point)),
            )
            .with_distance(plane.offset(&point)),
        );
    }
    None
}

/// Parallel planes: signed offset. Otherwise the folded angle between the
/// normals, reported at a point of the intersection line.
fn plane_plane(tolerance: &Tolerance, a: &PlaneFace, b: &PlaneFace) -> DuoMeasurementValues {
    if tolerance.are_parallel(&a.normal, &b.normal) {
        let offset = b.offset(&a.origin);
        return DuoMeasurementValues::between(
            MeasureInfo::at(a.origin),
            MeasureInfo::at(b.project(&a.origin)),
        )
        .with_distance(offset);
    }
    // Walk inside plane a, perpendicular to the intersection line, onto b.
    let along = a.normal.cross(&b.normal).cross(&a.normal);
    let t = -b.offset(&a.origin) / b.normal.dot(&along);
    let on_both = a.origin + along * t;
    let (angle, _) = fold_angle(&a.normal, &b.normal);
    DuoMeasurementValues::between(MeasureInfo::at(on_both), MeasureInfo::at(on_both)).with_angle(angle)
}
