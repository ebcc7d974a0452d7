use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;

/// A 4x4 affine transformation matrix stored in column-major order, the same
/// layout instance transforms use on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Column-major 4x4 matrix entries.
    pub m: [f64; 16],
}

impl Transform {
    pub fn identity() -> Self {
        #[rustfmt::skip]
        let m = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self { m }
    }

    pub fn from_column_major(m: [f64; 16]) -> Self {
        Self { m }
    }

    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        #[rustfmt::skip]
        let m = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            dx,  dy,  dz,  1.0,
        ];
        Self { m }
    }

    pub fn scaling(sx: f64, sy: f64, sz: f64) -> Self {
        #[rustfmt::skip]
        let m = [
            sx,  0.0, 0.0, 0.0,
            0.0, sy,  0.0, 0.0,
            0.0, 0.0, sz,  0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self { m }
    }

    pub fn uniform_scaling(s: f64) -> Self {
        Self::scaling(s, s, s)
    }

    /// Rotation around the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let c = angle.cos();
        let s = angle.sin();
        #[rustfmt::skip]
        let m = [
            c,   s,   0.0, 0.0,
            -s,  c,   0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self { m }
    }

    /// Rotation around the X axis by `angle` radians.
    pub fn rotation_x(angle: f64) -> Self {
        let c = angle.cos();
        let s = angle.sin();
        #[rustfmt::skip]
        let m = [
            1.0, 0.0, 0.0, 0.0,
            0.0, c,   s,   0.0,
            0.0, -s,  c,   0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self { m }
    }

    /// Frame whose columns are the given axes and origin.
    pub fn from_frame(origin: Point3d, x_axis: Vec3, y_axis: Vec3, z_axis: Vec3) -> Self {
        #[rustfmt::skip]
        let m = [
            x_axis.x, x_axis.y, x_axis.z, 0.0,
            y_axis.x, y_axis.y, y_axis.z, 0.0,
            z_axis.x, z_axis.y, z_axis.z, 0.0,
            origin.x, origin.y, origin.z, 1.0,
        ];
        Self { m }
    }

    /// Matrix element access (row, col), 0-indexed.
    fn at(&self, row: usize, col: usize) -> f64 {
        self.m[col * 4 + row]
    }

    /// Column `col` of the rotational part, as a vector.
    pub fn axis(&self, col: usize) -> Vec3 {
        Vec3::new(self.at(0, col), self.at(1, col), self.at(2, col))
    }

    pub fn origin(&self) -> Point3d {
        Point3d::new(self.at(0, 3), self.at(1, 3), self.at(2, 3))
    }

    /// Transform a point (applies translation).
    pub fn transform_point(&self, p: &Point3d) -> Point3d {
        let x = self.at(0, 0) * p.x + self.at(0, 1) * p.y + self.at(0, 2) * p.z + self.at(0, 3);
        let y = self.at(1, 0) * p.x + self.at(1, 1) * p.y + self.at(1, 2) * p.z + self.at(1, 3);
        let z = self.at(2, 0) * p.x + self.at(2, 1) * p.y + self.at(2, 2) * p.z + self.at(2, 3);
        Point3d::new(x, y, z)
    }

    /// Transform a vector (no translation).
    pub fn transform_vector(&self, v: &Vec3) -> Vec3 {
        let x = self.at(0, 0) * v.x + self.at(0, 1) * v.y + self.at(0, 2) * v.z;
        let y = self.at(1, 0) * v.x + self.at(1, 1) * v.y + self.at(1, 2) * v.z;
        let z = self.at(2, 0) * v.x + self.at(2, 1) * v.y + self.at(2, 2) * v.z;
        Vec3::new(x, y, z)
    }

    /// Matrix product `self * other`: `other` is applied first.
    pub fn multiply(&self, other: &Transform) -> Transform {
        let mut result = [0.0f64; 16];
        for col in 0..4 {
            for row in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += self.at(row, k) * other.at(k, col);
                }
                result[col * 4 + row] = sum;
            }
        }
        Transform { m: result }
    }

    #[rustfmt::skip]
    fn rotational_part(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.at(0, 0), self.at(0, 1), self.at(0, 2),
            self.at(1, 0), self.at(1, 1), self.at(1, 2),
            self.at(2, 0), self.at(2, 1), self.at(2, 2),
        )
    }

    /// Determinant of the 3x3 rotational part.
    pub fn determinant3(&self) -> f64 {
        self.rotational_part().determinant()
    }

    /// Handedness of the transform: -1 for mirroring transforms, +1 otherwise.
    pub fn handedness(&self) -> f64 {
        if self.determinant3() < 0.0 { -1.0 } else { 1.0 }
    }

    /// Largest column length of the rotational part.
    pub fn max_scale(&self) -> f64 {
        (0..3)
            .map(|col| self.axis(col).length())
            .fold(0.0, f64::max)
    }

    /// Cofactor matrix of the rotational part (inverse-transpose scaled by
    /// the determinant), for transforming normals. Like a cross product of
    /// transformed tangents, it reverses normals under mirroring.
    pub fn normal_matrix(&self) -> Option<NormalMatrix> {
        let rotational = self.rotational_part();
        let det = rotational.determinant();
        let inverse = rotational.try_inverse()?;
        Some(NormalMatrix {
            m: inverse.transpose() * det,
        })
    }

    /// Compute the inverse transform. Returns None if the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let mut inv = [0.0f64; 16];
        let m = &self.m;

        inv[0] = m[5] * m[10] * m[15] - m[5] * m[11] * m[14] - m[9] * m[6] * m[15]
            + m[9] * m[7] * m[14]
            + m[13] * m[6] * m[11]
            - m[13] * m[7] * m[10];

        inv[4] = -m[4] * m[10] * m[15] + m[4] * m[11] * m[14] + m[8] * m[6] * m[15]
            - m[8] * m[7] * m[14]
            - m[12] * m[6] * m[11]
            + m[12] * m[7] * m[10];

        inv[8] = m[4] * m[9] * m[15] - m[4] * m[11] * m[13] - m[8] * m[5] * m[15]
            + m[8] * m[7] * m[13]
            + m[12] * m[5] * m[11]
            - m[12] * m[7] * m[9];

        inv[12] = -m[4] * m[9] * m[14] + m[4] * m[10] * m[13] + m[8] * m[5] * m[14]
            - m[8] * m[6] * m[13]
            - m[12] * m[5] * m[10]
            + m[12] * m[6] * m[9];

        let det = m[0] * inv[0] + m[1] * inv[4] + m[2] * inv[8] + m[3] * inv[12];
        if det.abs() < 1e-15 {
            return None;
        }

        inv[1] = -m[1] * m[10] * m[15] + m[1] * m[11] * m[14] + m[9] * m[2] * m[15]
            - m[9] * m[3] * m[14]
            - m[13] * m[2] * m[11]
            + m[13] * m[3] * m[10];

        inv[5] = m[0] * m[10] * m[15] - m[0] * m[11] * m[14] - m[8] * m[2] * m[15]
            + m[8] * m[3] * m[14]
            + m[12] * m[2] * m[11]
            - m[12] * m[3] * m[10];

        inv[9] = -m[0] * m[9] * m[15] + m[0] * m[11] * m[13] + m[8] * m[1] * m[15]
            - m[8] * m[3] * m[13]
            - m[12] * m[1] * m[11]
            + m[12] * m[3] * m[9];

        inv[13] = m[0] * m[9] * m[14] - m[0] * m[10] * m[13] - m[8] * m[1] * m[14]
            + m[8] * m[2] * m[13]
            + m[12] * m[1] * m[10]
            - m[12] * m[2] * m[9];

        inv[2] = m[1] * m[6] * m[15] - m[1] * m[7] * m[14] - m[5] * m[2] * m[15]
            + m[5] * m[3] * m[14]
            + m[13] * m[2] * m[7]
            - m[13] * m[3] * m[6];

        inv[6] = -m[0] * m[6] * m[15] + m[0] * m[7] * m[14] + m[4] * m[2] * m[15]
            - m[4] * m[3] * m[14]
            - m[12] * m[2] * m[7]
            + m[12] * m[3] * m[6];

        inv[10] = m[0] * m[5] * m[15] - m[0] * m[7] * m[13] - m[4] * m[1] * m[15]
            + m[4] * m[3] * m[13]
            + m[12] * m[1] * m[7]
            - m[12] * m[3] * m[5];

        inv[14] = -m[0] * m[5] * m[14] + m[0] * m[6] * m[13] + m[4] * m[1] * m[14]
            - m[4] * m[2] * m[13]
            - m[12] * m[1] * m[6]
            + m[12] * m[2] * m[5];

        inv[3] = -m[1] * m[6] * m[11] + m[1] * m[7] * m[10] + m[5] * m[2] * m[11]
            - m[5] * m[3] * m[10]
            - m[9] * m[2] * m[7]
            + m[9] * m[3] * m[6];

        inv[7] = m[0] * m[6] * m[11] - m[0] * m[7] * m[10] - m[4] * m[2] * m[11]
            + m[4] * m[3] * m[10]
            + m[8] * m[2] * m[7]
            - m[8] * m[3] * m[6];

        inv[11] = -m[0] * m[5] * m[11] + m[0] * m[7] * m[9] + m[4] * m[1] * m[11]
            - m[4] * m[3] * m[9]
            - m[8] * m[1] * m[7]
            + m[8] * m[3] * m[5];

        inv[15] = m[0] * m[5] * m[10] - m[0] * m[6] * m[9] - m[4] * m[1] * m[10]
            + m[4] * m[2] * m[9]
            + m[8] * m[1] * m[6]
            - m[8] * m[2] * m[5];

        let inv_det = 1.0 / det;
        for val in &mut inv {
            *val *= inv_det;
        }

        Some(Transform { m: inv })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Transforms surface normals; results are not normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalMatrix {
    m: Matrix3<f64>,
}

impl NormalMatrix {
    pub fn identity() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }

    pub fn transform_normal(&self, n: &Vec3) -> Vec3 {
        let v = self.m * nalgebra::Vector3::new(n.x, n.y, n.z);
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3d,
    pub max: Point3d,
}

impl BoundingBox {
    pub fn new(min: Point3d, max: Point3d) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Point3d::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3d::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3d>) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.expand_to_include(p);
        }
        bb
    }

    pub fn expand_to_include(&mut self, p: &Point3d) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Point3d::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3d::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// True when `p` lies inside the box grown by `margin` on every side.
    pub fn contains_within(&self, p: &Point3d, margin: f64) -> bool {
        p.x >= self.min.x - margin
            && p.x <= self.max.x + margin
            && p.y >= self.min.y - margin
            && p.y <= self.max.y + margin
            && p.z >= self.min.z - margin
            && p.z <= self.max.z + margin
    }

    pub fn center(&self) -> Point3d {
        self.min.midpoint(&self.max)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_rotation_z_90() {
        let t = Transform::rotation_z(FRAC_PI_2);
        let result = t.transform_point(&Point3d::new(1.0, 0.0, 0.0));
        assert!(result.x.abs() < 1e-12);
        assert!((result.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_multiply_applies_right_operand_first() {
        let scale = Transform::uniform_scaling(2.0);
        let shift = Transform::translation(1.0, 0.0, 0.0);
        let p = scale.multiply(&shift).transform_point(&Point3d::ORIGIN);
        assert!((p.x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = Transform::translation(5.0, -3.0, 7.0).multiply(&Transform::rotation_x(0.3));
        let inv = t.inverse().unwrap();
        let p = Point3d::new(1.0, 2.0, 3.0);
        let back = inv.transform_point(&t.transform_point(&p));
        assert!(back.distance_to(&p) < 1e-12);
    }

    #[test]
    fn test_mirror_handedness() {
        assert_eq!(Transform::identity().handedness(), 1.0);
        let n = Transform::scaling(-1.0, 1.0, 1.0)
            .normal_matrix()
            .unwrap()
            .transform_normal(&Vec3::X);
        assert!((n - Vec3::X).length() < 1e-12);
        assert_eq!(Transform::scaling(-1.0, 1.0, 1.0).handedness(), -1.0);
        assert!((Transform::uniform_scaling(3.0).max_scale() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_normal_matrix_under_non_uniform_scale() {
        // Plane x + y = 0 squashed along x: its normal tilts towards x.
        let t = Transform::scaling(0.5, 1.0, 1.0);
        let n = t
            .normal_matrix()
            .unwrap()
            .transform_normal(&Vec3::new(1.0, 1.0, 0.0))
            .normalize();
        let tangent = t.transform_vector(&Vec3::new(1.0, -1.0, 0.0));
        assert!(n.dot(&tangent).abs() < 1e-12);
    }

    #[test]
    fn test_bounding_box_contains_within() {
        let bb = BoundingBox::from_points(&[Point3d::ORIGIN, Point3d::new(1.0, 1.0, 1.0)]);
        assert!(bb.contains_within(&Point3d::new(1.05, 0.5, 0.5), 0.1));
        assert!(!bb.contains_within(&Point3d::new(1.2, 0.5, 0.5), 0.1));
    }
}
