use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::error::KernelResult;

use super::native::NativeResource;
use super::point::Point3d;
use super::vector::Vec3;

/// Position and first derivative of a curve at one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSample {
    pub position: Point3d,
    pub tangent: Vec3,
}

/// Closed set of 3D curve kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CurveKind {
    Line,
    Arc,
    LineStrip,
    Nurbs,
}

impl CurveKind {
    pub fn name(&self) -> &'static str {
        match self {
            CurveKind::Line => "line",
            CurveKind::Arc => "arc",
            CurveKind::LineStrip => "lineStrip",
            CurveKind::Nurbs => "nurbs",
        }
    }
}

/// Straight line `origin + t * direction`.
///
/// `direction` is not normalized: its length sets the parameter speed, and
/// inversion divides by its squared length accordingly.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub origin: Point3d,
    pub direction: Vec3,
    pub begin_param: f64,
    pub end_param: f64,
    pub tessellation_parameters: Vec<f64>,
}

impl Line {
    pub fn new(origin: Point3d, direction: Vec3, begin_param: f64, end_param: f64) -> Self {
        Self {
            origin,
            direction,
            begin_param,
            end_param,
            tessellation_parameters: vec![begin_param, end_param],
        }
    }

    /// Segment from `a` (t = 0) to `b` (t = 1).
    pub fn from_points(a: Point3d, b: Point3d) -> Self {
        Self::new(a, b - a, 0.0, 1.0)
    }

    pub fn eval(&self, t: f64) -> CurveSample {
        CurveSample {
            position: self.origin + self.direction * t,
            tangent: self.direction,
        }
    }

    pub fn invert(&self, p: &Point3d) -> f64 {
        let len2 = self.direction.length_squared();
        if len2 < 1e-30 {
            return self.begin_param;
        }
        (*p - self.origin).dot(&self.direction) / len2
    }

    pub fn start(&self) -> Point3d {
        self.eval(self.begin_param).position
    }

    pub fn end(&self) -> Point3d {
        self.eval(self.end_param).position
    }

    pub fn length(&self) -> f64 {
        self.direction.length() * (self.end_param - self.begin_param).abs()
    }
}

/// Circular arc about `origin` in the plane of the orthonormal `axis_x`,
/// `axis_y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    pub origin: Point3d,
    pub axis_x: Vec3,
    pub axis_y: Vec3,
    pub radius: f64,
    pub begin_param: f64,
    pub end_param: f64,
    pub tessellation_parameters: Vec<f64>,
}

impl Arc {
    pub fn new(
        origin: Point3d,
        axis_x: Vec3,
        axis_y: Vec3,
        radius: f64,
        begin_param: f64,
        end_param: f64,
    ) -> Self {
        Self {
            origin,
            axis_x,
            axis_y,
            radius,
            begin_param,
            end_param,
            tessellation_parameters: Vec::new(),
        }
    }

    pub fn normal(&self) -> Vec3 {
        self.axis_x.cross(&self.axis_y).normalize()
    }

    pub fn eval(&self, t: f64) -> CurveSample {
        let (s, c) = t.sin_cos();
        CurveSample {
            position: self.origin + (self.axis_x * c + self.axis_y * s) * self.radius,
            tangent: (self.axis_y * c - self.axis_x * s) * self.radius,
        }
    }

    /// Angle of the point's projection onto the arc plane. Angles outside
    /// `[begin_param, end_param]` clamp to whichever bound is angularly
    /// closer, going around through 2π.
    pub fn invert(&self, p: &Point3d) -> f64 {
        let v = *p - self.origin;
        let x = v.dot(&self.axis_x);
        let y = v.dot(&self.axis_y);
        if x.abs() < 1e-300 && y.abs() < 1e-300 {
            return self.begin_param;
        }
        let raw = y.atan2(x);
        let angle = self.begin_param + (raw - self.begin_param).rem_euclid(TAU);
        if angle <= self.end_param {
            return angle;
        }
        let past_end = angle - self.end_param;
        let before_begin = self.begin_param + TAU - angle;
        if past_end <= before_begin {
            self.end_param
        } else {
            self.begin_param
        }
    }

    /// Angular extent of the arc.
    pub fn sweep(&self) -> f64 {
        self.end_param - self.begin_param
    }

    pub fn length(&self) -> f64 {
        self.radius * self.sweep().abs()
    }
}

/// Piecewise-linear curve; vertex `i` sits at `tessellation_parameters[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LineStrip {
    pub vertices: Vec<Point3d>,
    pub begin_param: f64,
    pub end_param: f64,
    pub tessellation_parameters: Vec<f64>,
}

impl LineStrip {
    /// When the parameter list does not match the vertex count, vertices are
    /// spread uniformly over `[begin_param, end_param]`.
    pub fn new(
        vertices: Vec<Point3d>,
        begin_param: f64,
        end_param: f64,
        tessellation_parameters: Vec<f64>,
    ) -> Self {
        let tessellation_parameters = if tessellation_parameters.len() == vertices.len() {
            tessellation_parameters
        } else {
            let n = vertices.len().saturating_sub(1).max(1) as f64;
            (0..vertices.len())
                .map(|i| begin_param + (end_param - begin_param) * i as f64 / n)
                .collect()
        };
        Self {
            vertices,
            begin_param,
            end_param,
            tessellation_parameters,
        }
    }

    /// Straight pieces of the strip with their global parameter spans.
    pub fn segments(&self) -> impl Iterator<Item = (Line, f64, f64)> + '_ {
        self.vertices
            .windows(2)
            .zip(self.tessellation_parameters.windows(2))
            .map(|(v, p)| (Line::from_points(v[0], v[1]), p[0], p[1]))
    }

    pub fn eval(&self, t: f64) -> CurveSample {
        let params = &self.tessellation_parameters;
        match self.vertices.len() {
            0 => {
                return CurveSample {
                    position: Point3d::ORIGIN,
                    tangent: Vec3::ZERO,
                };
            }
            1 => {
                return CurveSample {
                    position: self.vertices[0],
                    tangent: Vec3::ZERO,
                };
            }
            _ => {}
        }
        let i = params
            .partition_point(|&p| p <= t)
            .saturating_sub(1)
            .min(self.vertices.len() - 2);
        let span = params[i + 1] - params[i];
        let delta = self.vertices[i + 1] - self.vertices[i];
        if span.abs() < 1e-300 {
            return CurveSample {
                position: self.vertices[i],
                tangent: delta,
            };
        }
        let s = (t - params[i]) / span;
        CurveSample {
            position: self.vertices[i] + delta * s,
            tangent: delta / span,
        }
    }

    /// Global parameter of the closest point over all pieces.
    pub fn invert(&self, p: &Point3d) -> f64 {
        let mut best_t = self.begin_param;
        let mut best_d = f64::INFINITY;
        for (line, p0, p1) in self.segments() {
            let s = line.invert(p).clamp(0.0, 1.0);
            let d = line.eval(s).position.distance_squared_to(p);
            if d < best_d {
                best_d = d;
                best_t = p0 + s * (p1 - p0);
            }
        }
        best_t
    }

    pub fn length(&self) -> f64 {
        self.vertices.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
    }
}

/// NURBS curve evaluated by the numeric library.
#[derive(Debug, Clone)]
pub struct NurbsCurve {
    pub resource: NativeResource,
    pub begin_param: f64,
    pub end_param: f64,
    pub tessellation_parameters: Vec<f64>,
}

impl NurbsCurve {
    pub fn eval(&self, t: f64) -> KernelResult<CurveSample> {
        let handle = self.resource.handle()?;
        let mut point = [0.0; 3];
        let mut tangent = [0.0; 3];
        self.resource
            .numerics()
            .eval_curve(handle, t, Some(&mut point), Some(&mut tangent))?;
        Ok(CurveSample {
            position: Point3d::from_array(point),
            tangent: Vec3::from_array(tangent),
        })
    }

    pub fn invert(&self, p: &Point3d) -> KernelResult<f64> {
        let handle = self.resource.handle()?;
        let t = self
            .resource
            .numerics()
            .invert_curve(handle, &p.to_array())?;
        Ok(t.clamp(
            self.begin_param.min(self.end_param),
            self.begin_param.max(self.end_param),
        ))
    }
}

/// A 3D curve of any supported kind.
#[derive(Debug, Clone)]
pub enum Curve3d {
    Line(Line),
    Arc(Arc),
    LineStrip(LineStrip),
    Nurbs(NurbsCurve),
}

impl Curve3d {
    pub fn kind(&self) -> CurveKind {
        match self {
            Curve3d::Line(_) => CurveKind::Line,
            Curve3d::Arc(_) => CurveKind::Arc,
            Curve3d::LineStrip(_) => CurveKind::LineStrip,
            Curve3d::Nurbs(_) => CurveKind::Nurbs,
        }
    }

    pub fn begin_param(&self) -> f64 {
        match self {
            Curve3d::Line(c) => c.begin_param,
            Curve3d::Arc(c) => c.begin_param,
            Curve3d::LineStrip(c) => c.begin_param,
            Curve3d::Nurbs(c) => c.begin_param,
        }
    }

    pub fn end_param(&self) -> f64 {
        match self {
            Curve3d::Line(c) => c.end_param,
            Curve3d::Arc(c) => c.end_param,
            Curve3d::LineStrip(c) => c.end_param,
            Curve3d::Nurbs(c) => c.end_param,
        }
    }

    pub fn tessellation_parameters(&self) -> &[f64] {
        match self {
            Curve3d::Line(c) => &c.tessellation_parameters,
            Curve3d::Arc(c) => &c.tessellation_parameters,
            Curve3d::LineStrip(c) => &c.tessellation_parameters,
            Curve3d::Nurbs(c) => &c.tessellation_parameters,
        }
    }

    pub fn eval(&self, t: f64) -> KernelResult<CurveSample> {
        match self {
            Curve3d::Line(c) => Ok(c.eval(t)),
            Curve3d::Arc(c) => Ok(c.eval(t)),
            Curve3d::LineStrip(c) => Ok(c.eval(t)),
            Curve3d::Nurbs(c) => c.eval(t),
        }
    }

    pub fn position(&self, t: f64) -> KernelResult<Point3d> {
        Ok(self.eval(t)?.position)
    }

    /// Parameter of the closest (or coincident) point. Lines are not clamped
    /// to their bounds; see [`Curve3d::closest_point`].
    pub fn invert(&self, p: &Point3d) -> KernelResult<f64> {
        match self {
            Curve3d::Line(c) => Ok(c.invert(p)),
            Curve3d::Arc(c) => Ok(c.invert(p)),
            Curve3d::LineStrip(c) => Ok(c.invert(p)),
            Curve3d::Nurbs(c) => c.invert(p),
        }
    }

    /// Closest point within the parameter bounds, with its parameter.
    pub fn closest_point(&self, p: &Point3d) -> KernelResult<(f64, Point3d)> {
        let lo = self.begin_param().min(self.end_param());
        let hi = self.begin_param().max(self.end_param());
        let t = self.invert(p)?.clamp(lo, hi);
        Ok((t, self.position(t)?))
    }

    /// Parameters to sample the curve at. Straight pieces use their
    /// tessellation markers; arcs and NURBS always get `fallback` uniform
    /// steps across the bounds, merged with any markers.
    pub fn sample_parameters(&self, fallback: usize) -> Vec<f64> {
        let markers = self.tessellation_parameters();
        if matches!(self, Curve3d::Line(_) | Curve3d::LineStrip(_)) && markers.len() >= 2 {
            return markers.to_vec();
        }
        let (t0, t1) = (self.begin_param(), self.end_param());
        let n = fallback.max(1);
        let mut params: Vec<f64> = (0..=n)
            .map(|i| t0 + (t1 - t0) * i as f64 / n as f64)
            .chain(markers.iter().copied())
            .collect();
        params.sort_by(f64::total_cmp);
        params.dedup_by(|a, b| (*a - *b).abs() <= 1e-12);
        if t1 < t0 {
            params.reverse();
        }
        params
    }

    pub fn length(&self) -> KernelResult<f64> {
        match self {
            Curve3d::Line(c) => Ok(c.length()),
            Curve3d::Arc(c) => Ok(c.length()),
            Curve3d::LineStrip(c) => Ok(c.length()),
            Curve3d::Nurbs(_) => {
                let params = self.sample_parameters(64);
                let mut length = 0.0;
                let mut prev = self.position(params[0])?;
                for &t in &params[1..] {
                    let curr = self.position(t)?;
                    length += prev.distance_to(&curr);
                    prev = curr;
                }
                Ok(length)
            }
        }
    }
}

/// A ray for intersection tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3d,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Point3d, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f64) -> Point3d {
        self.origin + self.direction * t
    }
}
