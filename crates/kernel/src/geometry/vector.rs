use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// A vector in 3D Euclidean space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const X: Self = Self {
        x: 1.0,
        y: 0.0,
        z: 0.0,
    };
    pub const Y: Self = Self {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };
    pub const Z: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(&self) -> f64 {
        self.dot(self)
    }

    pub fn normalized(&self) -> Option<Self> {
        let len = self.length();
        if len < 1e-15 {
            None
        } else {
            Some(*self / len)
        }
    }

    /// Normalize, yielding the zero vector for near-zero input.
    pub fn normalize(&self) -> Self {
        self.normalized().unwrap_or(Self::ZERO)
    }

    /// Unsigned angle in `[0, PI]`.
    pub fn angle_to(&self, other: &Self) -> f64 {
        let d = self.dot(other);
        let len_product = self.length() * other.length();
        if len_product < 1e-15 {
            return 0.0;
        }
        (d / len_product).clamp(-1.0, 1.0).acos()
    }

    /// Parallel or anti-parallel, judged on the normalized dot product.
    pub fn is_parallel_to(&self, other: &Self, epsilon: f64) -> bool {
        let len_product = self.length() * other.length();
        if len_product < 1e-15 {
            return true;
        }
        1.0 - (self.dot(other) / len_product).abs() < epsilon
    }

    pub fn is_perpendicular_to(&self, other: &Self, epsilon: f64) -> bool {
        let len_product = self.length() * other.length();
        if len_product < 1e-15 {
            return true;
        }
        (self.dot(other) / len_product).abs() < epsilon
    }

    /// Any unit vector perpendicular to this one.
    pub fn any_perpendicular(&self) -> Self {
        let helper = if self.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
        helper.cross(self).normalize()
    }

    pub fn abs(&self) -> Self {
        Self::new(self.x.abs(), self.y.abs(), self.z.abs())
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn from_array(arr: [f64; 3]) -> Self {
        Self {
            x: arr[0],
            y: arr[1],
            z: arr[2],
        }
    }

    /// Triple scalar product: self . (b x c)
    pub fn triple(&self, b: &Self, c: &Self) -> f64 {
        self.dot(&b.cross(c))
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Vec3> for f64 {
    type Output = Vec3;
    fn mul(self, rhs: Vec3) -> Self::Output {
        Vec3::new(self * rhs.x, self * rhs.y, self * rhs.z)
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_cross_product() {
        let result = Vec3::X.cross(&Vec3::Y);
        assert!((result - Vec3::Z).length() < 1e-12);
    }

    #[test]
    fn test_normalize_zero_is_zero() {
        assert_eq!(Vec3::ZERO.normalize(), Vec3::ZERO);
        assert!(Vec3::ZERO.normalized().is_none());
    }

    #[test]
    fn test_angle_to() {
        assert!((Vec3::X.angle_to(&Vec3::Y) - FRAC_PI_2).abs() < 1e-12);
        assert!((Vec3::X.angle_to(&(-Vec3::X)) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_parallel() {
        assert!(Vec3::X.is_parallel_to(&(Vec3::X * 5.0), 1e-10));
        assert!(Vec3::X.is_parallel_to(&(-Vec3::X), 1e-10));
        assert!(!Vec3::X.is_parallel_to(&Vec3::Y, 1e-10));
        assert!(Vec3::X.is_perpendicular_to(&Vec3::Z, 1e-10));
    }

    #[test]
    fn test_any_perpendicular() {
        for v in [Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(1.0, 2.0, 3.0)] {
            let p = v.any_perpendicular();
            assert!(p.dot(&v).abs() < 1e-12);
            assert!((p.length() - 1.0).abs() < 1e-12);
        }
    }
}
