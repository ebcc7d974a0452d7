//! Pure-Rust B-spline / NURBS evaluation backing [`SoftwareNumerics`].
//!
//! [`SoftwareNumerics`]: super::native::SoftwareNumerics

use crate::error::NativeError;

use super::native::{CurveSpec, SurfaceSpec};
use super::point::Point3d;
use super::vector::Vec3;

const INVERT_ITERATIONS: usize = 24;

fn invalid(reason: impl Into<String>) -> NativeError {
    NativeError::InvalidInput {
        reason: reason.into(),
    }
}

/// Knot span containing `t`, by binary search.
fn find_span(knots: &[f64], degree: usize, count: usize, t: f64) -> usize {
    let n = count - 1;
    if t >= knots[n + 1] {
        return n;
    }
    if t <= knots[degree] {
        return degree;
    }
    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Non-vanishing basis functions at `t` (The NURBS Book, A2.2).
fn basis_functions(knots: &[f64], span: usize, t: f64, degree: usize) -> Vec<f64> {
    let mut n_vals = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];

    n_vals[0] = 1.0;
    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom.abs() < 1e-300 { 0.0 } else { n_vals[r] / denom };
            n_vals[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n_vals[j] = saved;
    }
    n_vals
}

fn check_knots(knots: &[f64], count: usize, order: usize, axis: &str) -> Result<(), NativeError> {
    if order < 1 {
        return Err(invalid(format!("{axis} order must be at least 1")));
    }
    if count < order {
        return Err(invalid(format!(
            "{axis}: {count} control points cannot carry order {order}"
        )));
    }
    if knots.len() != count + order {
        return Err(invalid(format!(
            "{axis}: knot vector length {} must be {}",
            knots.len(),
            count + order
        )));
    }
    if knots.windows(2).any(|w| w[1] < w[0]) {
        return Err(invalid(format!("{axis}: knot vector is not monotonic")));
    }
    Ok(())
}

/// Rational B-spline curve over flat xyz control points.
#[derive(Debug, Clone)]
pub struct BSplineCurve {
    degree: usize,
    knots: Vec<f64>,
    control_points: Vec<Point3d>,
    weights: Vec<f64>,
}

impl BSplineCurve {
    pub fn from_spec(spec: &CurveSpec) -> Result<Self, NativeError> {
        if spec.control_points.len() % 3 != 0 {
            return Err(invalid("control point buffer is not a multiple of 3"));
        }
        let count = spec.control_points.len() / 3;
        check_knots(&spec.knots, count, spec.order, "curve")?;
        let weights = match &spec.weights {
            Some(w) if w.len() != count => {
                return Err(invalid(format!(
                    "{} weights for {count} control points",
                    w.len()
                )));
            }
            Some(w) => w.clone(),
            None => vec![1.0; count],
        };
        let control_points = (0..count)
            .filter_map(|i| Point3d::from_slice(&spec.control_points, i))
            .collect();
        Ok(Self {
            degree: spec.order - 1,
            knots: spec.knots.clone(),
            control_points,
            weights,
        })
    }

    pub fn domain(&self) -> (f64, f64) {
        (
            self.knots[self.degree],
            self.knots[self.knots.len() - self.degree - 1],
        )
    }

    pub fn evaluate(&self, t: f64) -> Point3d {
        let (t0, t1) = self.domain();
        let t = t.clamp(t0, t1);
        let count = self.control_points.len();
        let span = find_span(&self.knots, self.degree, count, t);
        let basis = basis_functions(&self.knots, span, t, self.degree);

        let mut acc = Vec3::ZERO;
        let mut w_sum = 0.0;
        for (i, b) in basis.iter().enumerate() {
            let idx = span - self.degree + i;
            let bw = b * self.weights[idx];
            acc += self.control_points[idx].to_vec3() * bw;
            w_sum += bw;
        }
        if w_sum.abs() < 1e-300 {
            return self.control_points[span - self.degree];
        }
        Point3d::ORIGIN + acc / w_sum
    }

    /// First derivative by central differences, one-sided at the domain ends.
    pub fn derivative(&self, t: f64) -> Vec3 {
        let (tmin, tmax) = self.domain();
        let dt = 1e-7 * (tmax - tmin).max(1.0);
        let t0 = (t - dt).max(tmin);
        let t1 = (t + dt).min(tmax);
        if (t1 - t0).abs() < 1e-15 {
            return Vec3::ZERO;
        }
        (self.evaluate(t1) - self.evaluate(t0)) / (t1 - t0)
    }

    /// Parameter of the point on the curve closest to `p`: coarse sampling
    /// over every knot span, then Newton iterations on `(c(t) - p) . c'(t)`.
    pub fn invert(&self, p: &Point3d) -> f64 {
        let (tmin, tmax) = self.domain();
        let samples = 16 * self.control_points.len().max(4);
        let mut best_t = tmin;
        let mut best_d = f64::INFINITY;
        for i in 0..=samples {
            let t = tmin + (tmax - tmin) * (i as f64 / samples as f64);
            let d = self.evaluate(t).distance_squared_to(p);
            if d < best_d {
                best_d = d;
                best_t = t;
            }
        }

        let mut t = best_t;
        for _ in 0..INVERT_ITERATIONS {
            let c = self.evaluate(t);
            let d1 = self.derivative(t);
            let denom = d1.length_squared();
            if denom < 1e-30 {
                break;
            }
            let step = (c - *p).dot(&d1) / denom;
            let next = (t - step).clamp(tmin, tmax);
            if (next - t).abs() < 1e-14 {
                t = next;
                break;
            }
            t = next;
        }
        if self.evaluate(t).distance_squared_to(p) <= best_d {
            t
        } else {
            best_t
        }
    }
}

/// Rational tensor-product B-spline surface; control points are stored
/// u-major (`u_index * count_v + v_index`).
#[derive(Debug, Clone)]
pub struct BSplineSurface {
    degree_u: usize,
    degree_v: usize,
    knots_u: Vec<f64>,
    knots_v: Vec<f64>,
    count_u: usize,
    count_v: usize,
    control_points: Vec<Point3d>,
    weights: Vec<f64>,
}

impl BSplineSurface {
    pub fn from_spec(spec: &SurfaceSpec) -> Result<Self, NativeError> {
        let count = spec.count_u * spec.count_v;
        if spec.control_points.len() != count * 3 {
            return Err(invalid(format!(
                "{} coordinates for a {}x{} control grid",
                spec.control_points.len(),
                spec.count_u,
                spec.count_v
            )));
        }
        check_knots(&spec.knots_u, spec.count_u, spec.order_u, "u")?;
        check_knots(&spec.knots_v, spec.count_v, spec.order_v, "v")?;
        let weights = match &spec.weights {
            Some(w) if w.len() != count => {
                return Err(invalid(format!("{} weights for {count} control points", w.len())));
            }
            Some(w) => w.clone(),
            None => vec![1.0; count],
        };
        Ok(Self {
            degree_u: spec.order_u - 1,
            degree_v: spec.order_v - 1,
            knots_u: spec.knots_u.clone(),
            knots_v: spec.knots_v.clone(),
            count_u: spec.count_u,
            count_v: spec.count_v,
            control_points: (0..count)
                .filter_map(|i| Point3d::from_slice(&spec.control_points, i))
                .collect(),
            weights,
        })
    }

    pub fn domain_u(&self) -> (f64, f64) {
        (
            self.knots_u[self.degree_u],
            self.knots_u[self.knots_u.len() - self.degree_u - 1],
        )
    }

    pub fn domain_v(&self) -> (f64, f64) {
        (
            self.knots_v[self.degree_v],
            self.knots_v[self.knots_v.len() - self.degree_v - 1],
        )
    }

    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        let (u0, u1) = self.domain_u();
        let (v0, v1) = self.domain_v();
        let u = u.clamp(u0, u1);
        let v = v.clamp(v0, v1);
        let span_u = find_span(&self.knots_u, self.degree_u, self.count_u, u);
        let span_v = find_span(&self.knots_v, self.degree_v, self.count_v, v);
        let basis_u = basis_functions(&self.knots_u, span_u, u, self.degree_u);
        let basis_v = basis_functions(&self.knots_v, span_v, v, self.degree_v);

        let mut acc = Vec3::ZERO;
        let mut w_sum = 0.0;
        for (i, bu) in basis_u.iter().enumerate() {
            let u_idx = span_u - self.degree_u + i;
            for (j, bv) in basis_v.iter().enumerate() {
                let idx = u_idx * self.count_v + span_v - self.degree_v + j;
                let bw = bu * bv * self.weights[idx];
                acc += self.control_points[idx].to_vec3() * bw;
                w_sum += bw;
            }
        }
        if w_sum.abs() < 1e-300 {
            return self.control_points[0];
        }
        Point3d::ORIGIN + acc / w_sum
    }

    /// Partial derivatives by central differences.
    pub fn partials(&self, u: f64, v: f64) -> (Vec3, Vec3) {
        let (u_min, u_max) = self.domain_u();
        let (v_min, v_max) = self.domain_v();
        let du = 1e-7 * (u_max - u_min).max(1.0);
        let dv = 1e-7 * (v_max - v_min).max(1.0);
        let ua = (u - du).max(u_min);
        let ub = (u + du).min(u_max);
        let va = (v - dv).max(v_min);
        let vb = (v + dv).min(v_max);
        let su = (self.evaluate(ub, v) - self.evaluate(ua, v)) / (ub - ua).max(1e-300);
        let sv = (self.evaluate(u, vb) - self.evaluate(u, va)) / (vb - va).max(1e-300);
        (su, sv)
    }

    pub fn normal(&self, u: f64, v: f64) -> Vec3 {
        let (su, sv) = self.partials(u, v);
        su.cross(&sv).normalized().unwrap_or(Vec3::Z)
    }

    /// Closest (u, v) to `p`: grid sampling, then Gauss-Newton on the 2x2
    /// normal equations.
    pub fn invert(&self, p: &Point3d) -> [f64; 2] {
        let (u_min, u_max) = self.domain_u();
        let (v_min, v_max) = self.domain_v();
        let nu = 8 * self.count_u.max(3);
        let nv = 8 * self.count_v.max(3);
        let mut best = [u_min, v_min];
        let mut best_d = f64::INFINITY;
        for i in 0..=nu {
            let u = u_min + (u_max - u_min) * (i as f64 / nu as f64);
            for j in 0..=nv {
                let v = v_min + (v_max - v_min) * (j as f64 / nv as f64);
                let d = self.evaluate(u, v).distance_squared_to(p);
                if d < best_d {
                    best_d = d;
                    best = [u, v];
                }
            }
        }

        let [mut u, mut v] = best;
        for _ in 0..INVERT_ITERATIONS {
            let r = self.evaluate(u, v) - *p;
            let (su, sv) = self.partials(u, v);
            let a = su.dot(&su);
            let b = su.dot(&sv);
            let c = sv.dot(&sv);
            let det = a * c - b * b;
            if det.abs() < 1e-30 {
                break;
            }
            let gu = r.dot(&su);
            let gv = r.dot(&sv);
            let step_u = (c * gu - b * gv) / det;
            let step_v = (a * gv - b * gu) / det;
            let next_u = (u - step_u).clamp(u_min, u_max);
            let next_v = (v - step_v).clamp(v_min, v_max);
            let converged = (next_u - u).abs() < 1e-14 && (next_v - v).abs() < 1e-14;
            u = next_u;
            v = next_v;
            if converged {
                break;
            }
        }
        if self.evaluate(u, v).distance_squared_to(p) <= best_d {
            [u, v]
        } else {
            best
        }
    }
}
