//! Trimming curves in a face's (u, v) parameter space.

use crate::error::KernelResult;

use super::native::NativeResource;
use super::point::{Point2d, Point3d};

#[derive(Debug, Clone)]
pub enum Curve2d {
    Line {
        origin: Point2d,
        direction: Point2d,
    },
    Circle {
        origin: Point2d,
        radius: f64,
    },
    /// Evaluated through the numeric library with z fixed at zero.
    Nurbs(NativeResource),
}

impl Curve2d {
    pub fn eval(&self, t: f64) -> KernelResult<Point2d> {
        match self {
            Curve2d::Line { origin, direction } => Ok(Point2d::new(
                origin.x + direction.x * t,
                origin.y + direction.y * t,
            )),
            Curve2d::Circle { origin, radius } => {
                let (s, c) = t.sin_cos();
                Ok(Point2d::new(origin.x + radius * c, origin.y + radius * s))
            }
            Curve2d::Nurbs(resource) => {
                let handle = resource.handle()?;
                let mut out = [0.0; 3];
                resource
                    .numerics()
                    .eval_curve(handle, t, Some(&mut out), None)?;
                Ok(Point2d::new(out[0], out[1]))
            }
        }
    }

    pub fn invert(&self, p: &Point2d) -> KernelResult<f64> {
        match self {
            Curve2d::Line { origin, direction } => {
                let len2 = direction.x * direction.x + direction.y * direction.y;
                if len2 < 1e-30 {
                    return Ok(0.0);
                }
                Ok(((p.x - origin.x) * direction.x + (p.y - origin.y) * direction.y) / len2)
            }
            Curve2d::Circle { origin, .. } => Ok((p.y - origin.y).atan2(p.x - origin.x)),
            Curve2d::Nurbs(resource) => {
                let handle = resource.handle()?;
                let q = Point3d::new(p.x, p.y, 0.0);
                Ok(resource.numerics().invert_curve(handle, &q.to_array())?)
            }
        }
    }
}
