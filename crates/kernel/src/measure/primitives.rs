//! Nearest-point primitives on segments and lines.

use crate::geometry::point::Point3d;

/// Closest pair between two entities; parameters are normalized to the
/// segments (0 at the start, 1 at the end).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoints {
    pub point_a: Point3d,
    pub point_b: Point3d,
    pub param_a: f64,
    pub param_b: f64,
    pub distance: f64,
}

impl ClosestPoints {
    pub fn new(point_a: Point3d, param_a: f64, point_b: Point3d, param_b: f64) -> Self {
        Self {
            point_a,
            point_b,
            param_a,
            param_b,
            distance: point_a.distance_to(&point_b),
        }
    }

    pub fn swapped(self) -> Self {
        Self {
            point_a: self.point_b,
            point_b: self.point_a,
            param_a: self.param_b,
            param_b: self.param_a,
            distance: self.distance,
        }
    }
}

/// Projection of `p` onto the segment `start..end`, clamped to the segment.
/// Returns the point and its normalized parameter.
pub fn closest_point_to_line(p: &Point3d, start: &Point3d, end: &Point3d) -> (Point3d, f64) {
    let d = *end - *start;
    let len2 = d.length_squared();
    if len2 < 1e-30 {
        return (*start, 0.0);
    }
    let t = ((*p - *start).dot(&d) / len2).clamp(0.0, 1.0);
    (*start + d * t, t)
}

/// Mutual closest points of the infinite lines through `a0..a1` and
/// `b0..b1`. `None` for parallel lines.
pub fn closest_points_to_intersection(
    a0: &Point3d,
    a1: &Point3d,
    b0: &Point3d,
    b1: &Point3d,
) -> Option<ClosestPoints> {
    let da = *a1 - *a0;
    let db = *b1 - *b0;
    let n = da.cross(&db);
    let n2 = n.length_squared();
    if n2 <= 1e-24 * da.length_squared() * db.length_squared() || n2 < 1e-300 {
        return None;
    }
    let w = *b0 - *a0;
    let ta = w.cross(&db).dot(&n) / n2;
    let tb = w.cross(&da).dot(&n) / n2;
    Some(ClosestPoints::new(*a0 + da * ta, ta, *b0 + db * tb, tb))
}

/// Closest points between the segments `a0..a1` and `b0..b1`.
///
/// The four endpoint-to-opposite-segment projections are compared; when the
/// segments are not parallel and their crossing lies inside both, the
/// crossing wins if it is closer.
pub fn closest_projected_points(
    a0: &Point3d,
    a1: &Point3d,
    b0: &Point3d,
    b1: &Point3d,
) -> ClosestPoints {
    let (pb, sb) = closest_point_to_line(a0, b0, b1);
    let mut best = ClosestPoints::new(*a0, 0.0, pb, sb);

    let (pb, sb) = closest_point_to_line(a1, b0, b1);
    let candidate = ClosestPoints::new(*a1, 1.0, pb, sb);
    if candidate.distance < best.distance {
        best = candidate;
    }
    for (b, tb) in [(b0, 0.0), (b1, 1.0)] {
        let (pa, sa) = closest_point_to_line(b, a0, a1);
        let candidate = ClosestPoints::new(pa, sa, *b, tb);
        if candidate.distance < best.distance {
            best = candidate;
        }
    }

    if let Some(crossing) = closest_points_to_intersection(a0, a1, b0, b1) {
        let inside = (0.0..=1.0).contains(&crossing.param_a) && (0.0..=1.0).contains(&crossing.param_b);
        if inside && crossing.distance < best.distance {
            best = crossing;
        }
    }
    best
}
