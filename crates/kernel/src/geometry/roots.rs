//! Real roots of low-order polynomials, used by the analytic ray/surface
//! intersections. Roots are returned unsorted and may contain near-duplicates.

use std::f64::consts::PI;

const EPS: f64 = 1e-15;

/// Solve `a*x^2 + b*x + c = 0`.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a.abs() < EPS {
        if b.abs() < EPS {
            return vec![];
        }
        return vec![-c / b];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < -EPS {
        return vec![];
    }
    let disc = disc.max(0.0).sqrt();
    vec![(-b - disc) / (2.0 * a), (-b + disc) / (2.0 * a)]
}

/// Solve `a*x^3 + b*x^2 + c*x + d = 0` (Cardano, trigonometric branch for
/// three real roots).
pub fn solve_cubic(a: f64, b: f64, c: f64, d: f64) -> Vec<f64> {
    if a.abs() < EPS {
        return solve_quadratic(b, c, d);
    }

    let p = b / a;
    let q = c / a;
    let r = d / a;

    // x = t - p/3 gives t^3 + a_dep*t + b_dep = 0
    let a_dep = q - p * p / 3.0;
    let b_dep = r - p * q / 3.0 + 2.0 * p * p * p / 27.0;
    let shift = -p / 3.0;

    let disc = -4.0 * a_dep * a_dep * a_dep - 27.0 * b_dep * b_dep;

    if disc > EPS {
        let m = (-a_dep / 3.0).sqrt();
        let theta = (-b_dep / (2.0 * m * m * m)).clamp(-1.0, 1.0).acos() / 3.0;
        let two_pi_3 = 2.0 * PI / 3.0;
        vec![
            2.0 * m * theta.cos() + shift,
            2.0 * m * (theta - two_pi_3).cos() + shift,
            2.0 * m * (theta + two_pi_3).cos() + shift,
        ]
    } else {
        let half_b = b_dep / 2.0;
        let inner = half_b * half_b + a_dep * a_dep * a_dep / 27.0;
        let sqrt_inner = inner.max(0.0).sqrt();
        let u = (-half_b + sqrt_inner).cbrt();
        let v = (-half_b - sqrt_inner).cbrt();
        vec![u + v + shift]
    }
}

/// Solve `a*x^4 + b*x^3 + c*x^2 + d*x + e = 0` through the depressed quartic
/// and Ferrari's resolvent cubic. Returns no roots when the resolvent path
/// shows there is no real solution.
pub fn solve_quartic(a: f64, b: f64, c: f64, d: f64, e: f64) -> Vec<f64> {
    if a.abs() < EPS {
        return solve_cubic(b, c, d, e);
    }

    let p = b / a;
    let q = c / a;
    let r = d / a;
    let s = e / a;

    // x = t - p/4 gives t^4 + alpha*t^2 + beta*t + gamma = 0
    let p2 = p * p;
    let alpha = q - 3.0 * p2 / 8.0;
    let beta = r - p * q / 2.0 + p2 * p / 8.0;
    let gamma = s - p * r / 4.0 + p2 * q / 16.0 - 3.0 * p2 * p2 / 256.0;
    let shift = -p / 4.0;

    if beta.abs() < EPS {
        // biquadratic
        let mut roots = Vec::new();
        for t2 in solve_quadratic(1.0, alpha, gamma) {
            if t2 >= -EPS {
                let t = t2.max(0.0).sqrt();
                roots.push(t + shift);
                roots.push(-t + shift);
            }
        }
        return roots;
    }

    // resolvent: y^3 - alpha/2 y^2 - gamma y + alpha gamma/2 - beta^2/8 = 0
    let resolvent = solve_cubic(
        1.0,
        -alpha / 2.0,
        -gamma,
        alpha * gamma / 2.0 - beta * beta / 8.0,
    );
    let Some(y) = resolvent
        .iter()
        .copied()
        .find(|&y| 2.0 * y - alpha > EPS)
        .or_else(|| resolvent.first().copied())
    else {
        return vec![];
    };

    let w2 = 2.0 * y - alpha;
    if w2 < -1e-12 {
        return vec![];
    }
    let w = w2.max(0.0).sqrt();
    if w < 1e-12 {
        return vec![];
    }

    // t^2 + w t + (y - beta/(2w)) = 0 and t^2 - w t + (y + beta/(2w)) = 0
    let bw = beta / (2.0 * w);
    let mut roots = Vec::new();
    for (sign, offset) in [(1.0, y - bw), (-1.0, y + bw)] {
        for t in solve_quadratic(1.0, sign * w, offset) {
            roots.push(t + shift);
        }
    }
    roots
}
