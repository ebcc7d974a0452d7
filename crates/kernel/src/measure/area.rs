use crate::error::{KernelError, KernelResult};
use crate::geometry::point::Point3d;
use crate::geometry::vector::Vec3;

/// Area of an indexed triangle mesh with per-vertex normals.
///
/// Each triangle contributes its area projected onto the mean of its vertex
/// normals, which keeps folded or flipped slivers from inflating the total.
pub fn mesh_area(positions: &[Point3d], normals: &[Vec3], indices: &[u32]) -> KernelResult<f64> {
    if positions.len() != normals.len() {
        return Err(KernelError::contract(format!(
            "{} positions but {} normals",
            positions.len(),
            normals.len()
        )));
    }
    if indices.len() % 3 != 0 {
        return Err(KernelError::contract(format!(
            "index count {} is not a multiple of 3",
            indices.len()
        )));
    }

    let mut area = 0.0;
    for tri in indices.chunks_exact(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if i0.max(i1).max(i2) >= positions.len() {
            return Err(KernelError::contract(format!(
                "triangle ({i0}, {i1}, {i2}) indexes past {} vertices",
                positions.len()
            )));
        }
        let cross = (positions[i1] - positions[i0]).cross(&(positions[i2] - positions[i0]));
        let area2 = match (normals[i0] + normals[i1] + normals[i2]).normalized() {
            Some(n) => cross.dot(&n).abs(),
            None => cross.length(),
        };
        area += 0.5 * area2;
    }
    Ok(area)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> (Vec<Point3d>, Vec<Vec3>, Vec<u32>) {
        let positions = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(1.0, 1.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
        ];
        (positions, vec![Vec3::Z; 4], vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn test_square_area() {
        let (p, n, i) = unit_square();
        assert!((mesh_area(&p, &n, &i).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_normals_rejected() {
        let (p, n, i) = unit_square();
        let err = mesh_area(&p, &n[..3], &i).unwrap_err();
        assert_eq!(err.tag(), "contract");
    }

    #[test]
    fn test_bad_index_rejected() {
        let (p, n, _) = unit_square();
        assert_eq!(mesh_area(&p, &n, &[0, 1, 9]).unwrap_err().tag(), "contract");
        assert_eq!(mesh_area(&p, &n, &[0, 1]).unwrap_err().tag(), "contract");
    }
}
