//! Planar polygon faces for objects whose faces carry no surface.

use crate::geometry::point::{Point2d, Point3d};
use crate::geometry::transform::BoundingBox;
use crate::geometry::vector::Vec3;

/// A face reduced to its best-fit plane and the plane-projected boundary.
#[derive(Debug, Clone)]
pub struct PolygonFace {
    pub face: usize,
    pub origin: Point3d,
    pub normal: Vec3,
    u: Vec3,
    v: Vec3,
    /// Outer loop first, then holes; each ring is implicitly closed.
    rings: Vec<Vec<Point2d>>,
    pub bbox: BoundingBox,
}

/// Newell normal of a closed polygon; zero for degenerate input.
pub fn newell_normal(points: &[Point3d]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for (i, a) in points.iter().enumerate() {
        let b = &points[(i + 1) % points.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n.normalize()
}

impl PolygonFace {
    /// `None` when the outer loop has fewer than three corners or is
    /// degenerate.
    pub fn new(face: usize, outer: &[Point3d], holes: &[Vec<Point3d>]) -> Option<Self> {
        if outer.len() < 3 {
            return None;
        }
        let normal = newell_normal(outer);
        if normal == Vec3::ZERO {
            return None;
        }
        let sum = outer
            .iter()
            .fold(Vec3::ZERO, |acc, p| acc + p.to_vec3());
        let origin = Point3d::ORIGIN + sum / outer.len() as f64;
        let u = normal.any_perpendicular();
        let v = normal.cross(&u);

        let project = |p: &Point3d| {
            let d = *p - origin;
            Point2d::new(d.dot(&u), d.dot(&v))
        };
        let rings = std::iter::once(outer)
            .chain(holes.iter().map(Vec::as_slice))
            .filter(|ring| ring.len() >= 3)
            .map(|ring| ring.iter().map(project).collect())
            .collect();
        Some(Self {
            face,
            origin,
            normal,
            u,
            v,
            rings,
            bbox: BoundingBox::from_points(outer),
        })
    }

    pub fn signed_distance(&self, p: &Point3d) -> f64 {
        (*p - self.origin).dot(&self.normal)
    }

    pub fn project(&self, p: &Point3d) -> Point3d {
        *p - self.normal * self.signed_distance(p)
    }

    /// Ray-crossing parity test of the plane projection of `p` against all
    /// rings.
    pub fn contains(&self, p: &Point3d) -> bool {
        let d = *p - self.origin;
        let (x, y) = (d.dot(&self.u), d.dot(&self.v));
        let mut inside = false;
        for ring in &self.rings {
            let n = ring.len();
            for i in 0..n {
                let a = ring[i];
                let b = ring[(i + n - 1) % n];
                if (a.y > y) != (b.y > y) && x < (b.x - a.x) * (y - a.y) / (b.y - a.y) + a.x {
                    inside = !inside;
                }
            }
        }
        inside
    }
}
