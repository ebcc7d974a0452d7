//! Analytic and NURBS surfaces.
//!
//! Each analytic kind is evaluated in a canonical unit space (plane `z = 0`,
//! unit cylinder/sphere around the Z axis, ...). A [`Surface`] carries the
//! composed unit-to-world transform, its inverse and normal matrix, and a
//! `sense` that flips the outward-normal convention.

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};

use super::curves::Ray;
use super::native::NativeResource;
use super::point::{Point2d, Point3d};
use super::roots::{solve_quadratic, solve_quartic};
use super::transform::{NormalMatrix, Transform};
use super::vector::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SurfaceKind {
    Plane,
    Cylinder,
    Cone,
    Sphere,
    Torus,
    Nurbs,
}

impl SurfaceKind {
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceKind::Plane => "plane",
            SurfaceKind::Cylinder => "cylinder",
            SurfaceKind::Cone => "cone",
            SurfaceKind::Sphere => "sphere",
            SurfaceKind::Torus => "torus",
            SurfaceKind::Nurbs => "nurbs",
        }
    }
}

/// Unit-space shape of a surface.
#[derive(Debug, Clone)]
pub enum SurfaceShape {
    /// `(u, v, 0)`, normal `+Z`.
    Plane,
    /// `(cos u, sin u, v)`.
    Cylinder,
    /// `(r cos u, r sin u, v)` with `r = 1 + slope * v`.
    Cone { slope: f64 },
    /// `(cos u cos v, sin u cos v, sin v)`.
    Sphere,
    /// Torus around the Z axis, radii kept in unit space.
    Torus { major_radius: f64, minor_radius: f64 },
    Nurbs(NativeResource),
}

#[derive(Debug, Clone)]
pub struct Surface {
    shape: SurfaceShape,
    transform: Transform,
    inverse: Transform,
    normal_matrix: NormalMatrix,
    sense: f64,
}

impl Surface {
    /// `transform` maps unit space to world space; `sense` is +1 or -1.
    pub fn new(shape: SurfaceShape, transform: Transform, sense: f64) -> KernelResult<Self> {
        let singular = || KernelError::contract("surface transform is singular");
        let inverse = transform.inverse().ok_or_else(singular)?;
        let normal_matrix = transform.normal_matrix().ok_or_else(singular)?;
        Ok(Self {
            shape,
            transform,
            inverse,
            normal_matrix,
            sense: if sense < 0.0 { -1.0 } else { 1.0 },
        })
    }

    pub fn kind(&self) -> SurfaceKind {
        match self.shape {
            SurfaceShape::Plane => SurfaceKind::Plane,
            SurfaceShape::Cylinder => SurfaceKind::Cylinder,
            SurfaceShape::Cone { .. } => SurfaceKind::Cone,
            SurfaceShape::Sphere => SurfaceKind::Sphere,
            SurfaceShape::Torus { .. } => SurfaceKind::Torus,
            SurfaceShape::Nurbs(_) => SurfaceKind::Nurbs,
        }
    }

    pub fn shape(&self) -> &SurfaceShape {
        &self.shape
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn sense(&self) -> f64 {
        self.sense
    }

    /// World position of the unit-space origin (plane origin, axis base).
    pub fn origin(&self) -> Point3d {
        self.transform.origin()
    }

    /// Unit direction of the unit-space Z axis in world space.
    pub fn axis(&self) -> Vec3 {
        self.transform.axis(2).normalize()
    }

    /// World radius of cylinders, cones (at `v = 0`) and spheres; major
    /// radius of tori.
    pub fn radius(&self) -> Option<f64> {
        match self.shape {
            SurfaceShape::Cylinder | SurfaceShape::Cone { .. } | SurfaceShape::Sphere => {
                Some(self.transform.axis(0).length())
            }
            SurfaceShape::Torus { major_radius, .. } => {
                Some(major_radius * self.transform.axis(0).length())
            }
            SurfaceShape::Plane | SurfaceShape::Nurbs(_) => None,
        }
    }

    /// Plane normal in world space, sense applied.
    pub fn plane_normal(&self) -> Option<Vec3> {
        match self.shape {
            SurfaceShape::Plane => Some(
                self.normal_matrix
                    .transform_normal(&(Vec3::Z * self.sense))
                    .normalize(),
            ),
            _ => None,
        }
    }

    pub fn eval_position(&self, uv: Point2d) -> KernelResult<Point3d> {
        let local = match &self.shape {
            SurfaceShape::Nurbs(resource) => {
                let handle = resource.handle()?;
                let mut out = [0.0; 3];
                resource
                    .numerics()
                    .eval_surface_position(handle, uv.to_array(), &mut out)?;
                Point3d::from_array(out)
            }
            shape => unit_position(shape, uv.x, uv.y),
        };
        Ok(self.transform.transform_point(&local))
    }

    /// Unit normal, oriented by `sense`.
    pub fn eval_normal(&self, uv: Point2d) -> KernelResult<Vec3> {
        let local = match &self.shape {
            SurfaceShape::Nurbs(resource) => {
                let handle = resource.handle()?;
                let mut out = [0.0; 3];
                resource
                    .numerics()
                    .eval_surface_normal(handle, uv.to_array(), &mut out)?;
                Vec3::from_array(out)
            }
            shape => unit_normal(shape, uv.x, uv.y),
        };
        Ok(self
            .normal_matrix
            .transform_normal(&(local * self.sense))
            .normalize())
    }

    /// Parameters of the closest point on the (untrimmed) surface.
    pub fn invert(&self, p: &Point3d) -> KernelResult<Point2d> {
        let q = self.inverse.transform_point(p);
        match &self.shape {
            SurfaceShape::Nurbs(resource) => {
                let handle = resource.handle()?;
                let [u, v] = resource.numerics().invert_surface(handle, &q.to_array())?;
                Ok(Point2d::new(u, v))
            }
            shape => Ok(unit_invert(shape, &q)),
        }
    }

    /// Closest point on the surface and its parameters.
    pub fn closest_point(&self, p: &Point3d) -> KernelResult<(Point2d, Point3d)> {
        let uv = self.invert(p)?;
        Ok((uv, self.eval_position(uv)?))
    }

    /// First hit of a world-space ray, as surface parameters.
    pub fn intersect(&self, ray: &Ray) -> Option<Point2d> {
        let o = self.inverse.transform_point(&ray.origin);
        let d = self.inverse.transform_vector(&ray.direction);

        let t = match self.shape {
            SurfaceShape::Plane => {
                // Only rays travelling against the world normal see the
                // plane; mirroring flips sense without flipping the normal.
                if d.z * self.sense * self.transform.handedness() >= 0.0 {
                    return None;
                }
                let t = -o.z / d.z;
                (t > 0.0).then_some(t)?
            }
            SurfaceShape::Cylinder => {
                let a = d.x * d.x + d.y * d.y;
                let b = 2.0 * (o.x * d.x + o.y * d.y);
                let c = o.x * o.x + o.y * o.y - 1.0;
                self.pick_root(solve_quadratic(a, b, c))?
            }
            SurfaceShape::Cone { slope } => {
                let k = slope;
                let r0 = 1.0 + k * o.z;
                let a = d.x * d.x + d.y * d.y - k * k * d.z * d.z;
                let b = 2.0 * (o.x * d.x + o.y * d.y - k * r0 * d.z);
                let c = o.x * o.x + o.y * o.y - r0 * r0;
                self.pick_root(solve_quadratic(a, b, c))?
            }
            SurfaceShape::Sphere => {
                let a = d.dot(&d);
                let b = 2.0 * o.to_vec3().dot(&d);
                let c = o.to_vec3().length_squared() - 1.0;
                self.pick_root(solve_quadratic(a, b, c))?
            }
            SurfaceShape::Torus {
                major_radius,
                minor_radius,
            } => torus_hit(&o, &d, major_radius, minor_radius)?,
            SurfaceShape::Nurbs(_) => return None,
        };

        let hit = o + d * t;
        Some(unit_invert(&self.shape, &hit))
    }

    /// Smallest positive root for outward sense, largest for inward sense.
    fn pick_root(&self, roots: Vec<f64>) -> Option<f64> {
        let positive = roots.into_iter().filter(|t| *t > 1e-12);
        if self.sense > 0.0 {
            positive.min_by(f64::total_cmp)
        } else {
            positive.max_by(f64::total_cmp)
        }
    }
}

fn torus_hit(o: &Point3d, d: &Vec3, major: f64, minor: f64) -> Option<f64> {
    // (|p|^2 + R^2 - r^2)^2 = 4 R^2 (px^2 + py^2) with p = o + t d
    let ov = o.to_vec3();
    let a = d.dot(d);
    let b = 2.0 * ov.dot(d);
    let k = ov.length_squared() + major * major - minor * minor;
    let e = d.x * d.x + d.y * d.y;
    let f = 2.0 * (o.x * d.x + o.y * d.y);
    let g = o.x * o.x + o.y * o.y;
    let r4 = 4.0 * major * major;

    let roots = solve_quartic(
        a * a,
        2.0 * a * b,
        b * b + 2.0 * a * k - r4 * e,
        2.0 * b * k - r4 * f,
        k * k - r4 * g,
    );
    roots
        .into_iter()
        .filter(|t| *t > 1e-12)
        .min_by(f64::total_cmp)
}

fn unit_position(shape: &SurfaceShape, u: f64, v: f64) -> Point3d {
    let (su, cu) = u.sin_cos();
    match *shape {
        SurfaceShape::Plane => Point3d::new(u, v, 0.0),
        SurfaceShape::Cylinder => Point3d::new(cu, su, v),
        SurfaceShape::Cone { slope } => {
            let r = 1.0 + slope * v;
            Point3d::new(r * cu, r * su, v)
        }
        SurfaceShape::Sphere => {
            let (sv, cv) = v.sin_cos();
            Point3d::new(cu * cv, su * cv, sv)
        }
        SurfaceShape::Torus {
            major_radius,
            minor_radius,
        } => {
            let (sv, cv) = v.sin_cos();
            let r = major_radius + minor_radius * cv;
            Point3d::new(r * cu, r * su, minor_radius * sv)
        }
        SurfaceShape::Nurbs(_) => Point3d::ORIGIN,
    }
}

fn unit_normal(shape: &SurfaceShape, u: f64, v: f64) -> Vec3 {
    let (su, cu) = u.sin_cos();
    match *shape {
        SurfaceShape::Plane => Vec3::Z,
        SurfaceShape::Cylinder => Vec3::new(cu, su, 0.0),
        SurfaceShape::Cone { slope } => Vec3::new(cu, su, -slope).normalize(),
        SurfaceShape::Sphere | SurfaceShape::Torus { .. } => {
            let (sv, cv) = v.sin_cos();
            Vec3::new(cu * cv, su * cv, sv)
        }
        SurfaceShape::Nurbs(_) => Vec3::Z,
    }
}

fn unit_invert(shape: &SurfaceShape, q: &Point3d) -> Point2d {
    let u = q.y.atan2(q.x);
    let rho = (q.x * q.x + q.y * q.y).sqrt();
    match *shape {
        SurfaceShape::Plane => Point2d::new(q.x, q.y),
        SurfaceShape::Cylinder => Point2d::new(u, q.z),
        SurfaceShape::Cone { slope } => {
            let v = ((rho - 1.0) * slope + q.z) / (1.0 + slope * slope);
            Point2d::new(u, v)
        }
        SurfaceShape::Sphere => Point2d::new(u, q.z.atan2(rho)),
        SurfaceShape::Torus { major_radius, .. } => {
            Point2d::new(u, q.z.atan2(rho - major_radius))
        }
        SurfaceShape::Nurbs(_) => Point2d::ORIGIN,
    }
}
