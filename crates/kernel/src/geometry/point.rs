use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

use super::vector::Vec3;

/// A point in 3D Euclidean space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3d {
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        self.distance_squared_to(other).sqrt()
    }

    pub fn distance_squared_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn midpoint(&self, other: &Self) -> Self {
        self.lerp(other, 0.5)
    }

    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self {
            x: self.x + t * (other.x - self.x),
            y: self.y + t * (other.y - self.y),
            z: self.z + t * (other.z - self.z),
        }
    }

    pub fn to_vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
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

    /// Read the `index`-th xyz triple of a flat coordinate buffer.
    pub fn from_slice(buffer: &[f64], index: usize) -> Option<Self> {
        let xyz = buffer.get(index * 3..index * 3 + 3)?;
        Some(Self::new(xyz[0], xyz[1], xyz[2]))
    }
}

impl Add<Vec3> for Point3d {
    type Output = Point3d;
    fn add(self, rhs: Vec3) -> Self::Output {
        Point3d::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3d {
    type Output = Vec3;
    fn sub(self, rhs: Self) -> Self::Output {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Sub<Vec3> for Point3d {
    type Output = Point3d;
    fn sub(self, rhs: Vec3) -> Self::Output {
        Point3d::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// A point in 2D space (surface parameters, view-space projections).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2d {
    pub x: f64,
    pub y: f64,
}

impl Point2d {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self::new(self.x + t * (other.x - self.x), self.y + t * (other.y - self.y))
    }

    pub fn to_array(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point3d::new(1.0, 0.0, 0.0);
        let b = Point3d::new(4.0, 0.0, 0.0);
        assert!((a.distance_to(&b) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_sub_gives_vector() {
        let v = Point3d::new(3.0, 4.0, 5.0) - Point3d::new(1.0, 1.0, 1.0);
        assert!((v.x - 2.0).abs() < 1e-12);
        assert!((v.y - 3.0).abs() < 1e-12);
        assert!((v.z - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_slice() {
        let buffer = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(Point3d::from_slice(&buffer, 1), Some(Point3d::new(3.0, 4.0, 5.0)));
        assert_eq!(Point3d::from_slice(&buffer, 2), None);
    }

    #[test]
    fn test_lerp_2d() {
        let mid = Point2d::ORIGIN.lerp(&Point2d::new(2.0, 4.0), 0.5);
        assert!((mid.x - 1.0).abs() < 1e-12);
        assert!((mid.y - 2.0).abs() < 1e-12);
    }
}
