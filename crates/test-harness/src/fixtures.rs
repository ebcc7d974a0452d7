//! Ready-made products: boxes, cylinders, a triangulated sphere, manholes
//! and loose line segments.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use brep_kernel::geometry::point::Point3d;
use brep_kernel::geometry::transform::Transform;
use brep_kernel::geometry::vector::Vec3;
use brep_kernel::model::{Curve3dData, SurfaceData};
use brep_kernel::ProductData;

use crate::builder::ProductBuilder;

/// Plane surface whose local frame is `origin, x, y, x × y`.
fn plane(origin: [f64; 3], x: Vec3, y: Vec3) -> SurfaceData {
    let frame = Transform::from_frame(Point3d::from_array(origin), x, y, x.cross(&y));
    SurfaceData::Plane {
        transform: Some(frame.m),
    }
}

fn translated(z: f64) -> Option<[f64; 16]> {
    Some(Transform::translation(0.0, 0.0, z).m)
}

fn circle(center: [f64; 3], radius: f64) -> Curve3dData {
    Curve3dData::Circle {
        origin: center,
        axis_x: [1.0, 0.0, 0.0],
        axis_y: [0.0, 1.0, 0.0],
        radius,
    }
}

/// Axis-aligned box from the origin to `size`, six planar faces with
/// outward normals, shared edges and a two-triangle mesh per face.
pub fn box_solid(size: [f64; 3]) -> ProductData {
    let [sx, sy, sz] = size;
    let mut b = ProductBuilder::new();
    let corners = [
        [0.0, 0.0, 0.0],
        [sx, 0.0, 0.0],
        [sx, sy, 0.0],
        [0.0, sy, 0.0],
        [0.0, 0.0, sz],
        [sx, 0.0, sz],
        [sx, sy, sz],
        [0.0, sy, sz],
    ];
    let v: Vec<usize> = corners.iter().map(|&c| b.vertex(c)).collect();

    // Corner cycles run counter-clockwise seen from outside; the plane frame
    // starts at the first corner with x towards the second.
    let faces: [[usize; 4]; 6] = [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [1, 2, 6, 5],
        [2, 3, 7, 6],
        [3, 0, 4, 7],
    ];
    let mut edges: Vec<([usize; 2], usize)> = Vec::new();
    for cycle in faces {
        let p = |i: usize| Point3d::from_array(corners[cycle[i]]);
        let x = p(1) - p(0);
        let y = p(3) - p(0);
        let surface = b.surface(plane(corners[cycle[0]], x.normalize(), y.normalize()));
        let face = b.face(Some(surface), 1);
        let outer = b.outer_loop(face);
        for k in 0..4 {
            let (a, c) = (v[cycle[k]], v[cycle[(k + 1) % 4]]);
            match edges.iter().find(|(ends, _)| *ends == [c, a]) {
                Some(&(_, edge)) => {
                    b.share_edge(edge, face, outer);
                }
                None => {
                    let edge = b.line_edge(face, outer, a, c);
                    edges.push(([a, c], edge));
                }
            }
        }
        let (w, h) = (x.length(), y.length());
        b.triangulation(
            face,
            vec![0.0, 0.0, w, 0.0, w, h, 0.0, h],
            vec![0, 1, 2, 0, 2, 3],
        );
    }
    b.build()
}

/// Cylinder of `radius` around the Z axis from z = 0 to `height`, one face
/// bounded by two circles. A full cylinder closes with a virtual seam; a
/// half cylinder (`full = false`, swept over [0, π]) closes with two
/// straight edges.
pub fn cylinder(radius: f64, height: f64, full: bool) -> ProductData {
    let mut b = ProductBuilder::new();
    let surface = b.surface(SurfaceData::Cylinder {
        radius,
        transform: None,
    });
    let face = b.face(Some(surface), 1);
    let outer = b.outer_loop(face);
    let sweep = if full { TAU } else { PI };

    let bottom = b.curve(circle([0.0, 0.0, 0.0], radius));
    let top = b.curve(circle([0.0, 0.0, height], radius));
    if full {
        let v0 = b.vertex([radius, 0.0, 0.0]);
        let v1 = b.vertex([radius, 0.0, height]);
        b.edge(face, outer, Some(bottom), [0.0, sweep], Some([v0, v0]));
        let seam = b.curve(Curve3dData::Line {
            origin: [radius, 0.0, 0.0],
            direction: [0.0, 0.0, 1.0],
        });
        let seam_edge = b.edge(face, outer, Some(seam), [0.0, height], Some([v0, v1]));
        b.share_edge(seam_edge, face, outer);
        b.edge(face, outer, Some(top), [0.0, sweep], Some([v1, v1]));
        let mut product = b.build();
        product.edges[seam_edge].is_virtual = true;
        return product;
    }

    let a0 = b.vertex([radius, 0.0, 0.0]);
    let a1 = b.vertex([-radius, 0.0, 0.0]);
    let b0 = b.vertex([radius, 0.0, height]);
    let b1 = b.vertex([-radius, 0.0, height]);
    b.edge(face, outer, Some(bottom), [0.0, sweep], Some([a0, a1]));
    b.line_edge(face, outer, a1, b1);
    b.edge(face, outer, Some(top), [0.0, sweep], Some([b0, b1]));
    b.line_edge(face, outer, b0, a0);
    b.build()
}

/// Triangulated UV sphere around the origin: one vertex per pole, `columns`
/// meridians and `stacks` bands, closed by a virtual seam at u = 0.
pub fn sphere(radius: f64, columns: usize, stacks: usize) -> ProductData {
    let mut b = ProductBuilder::new();
    let surface = b.surface(SurfaceData::Sphere {
        radius,
        transform: None,
    });
    let face = b.face(Some(surface), 1);

    let rows = stacks - 1;
    let index = |i: usize, j: usize| (2 + i * rows + (j - 1)) as u32;
    let mut uv = vec![0.0, -FRAC_PI_2, 0.0, FRAC_PI_2];
    for i in 0..=columns {
        for j in 1..stacks {
            uv.push(TAU * i as f64 / columns as f64);
            uv.push(-FRAC_PI_2 + PI * j as f64 / stacks as f64);
        }
    }
    let mut indices = Vec::new();
    for i in 0..columns {
        indices.extend([0, index(i + 1, 1), index(i, 1)]);
        for j in 1..rows {
            indices.extend([index(i, j), index(i + 1, j), index(i + 1, j + 1)]);
            indices.extend([index(i, j), index(i + 1, j + 1), index(i, j + 1)]);
        }
        indices.extend([index(i, rows), index(i + 1, rows), 1]);
    }
    b.triangulation(face, uv, indices);

    // South to north along u = 0, back down along u = 2π.
    let mut left = vec![0];
    left.extend((1..stacks).map(|j| index(0, j)));
    left.push(1);
    let mut right = vec![1];
    right.extend((1..stacks).rev().map(|j| index(columns, j)));
    right.push(0);
    b.seam(face, left, right);
    b.build()
}

/// Dimensions of a [`manhole`] fixture, in product units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManholeShape {
    pub top: f64,
    pub bottom: f64,
    /// Inner floor elevation, above `bottom`.
    pub floor: f64,
    pub outer_radius: f64,
    pub inner_radius: f64,
}

impl Default for ManholeShape {
    fn default() -> Self {
        Self {
            top: 2.0,
            bottom: 0.0,
            floor: 0.2,
            outer_radius: 0.8,
            inner_radius: 0.6,
        }
    }
}

/// Circle of radius `r` at height `z` with its start vertex.
fn ring(b: &mut ProductBuilder, z: f64, r: f64) -> (usize, usize) {
    let v = b.vertex([r, 0.0, z]);
    (b.curve(circle([0.0, 0.0, z], r)), v)
}

/// Hollow vertical cylinder: annular top, closed bottom, inner floor, outer
/// and inner walls.
pub fn manhole(shape: ManholeShape, units: &str) -> ProductData {
    let ManholeShape {
        top,
        bottom,
        floor,
        outer_radius,
        inner_radius,
    } = shape;
    let mut b = ProductBuilder::new();
    b.units(units);

    let full = [0.0, TAU];
    let (top_outer, v_top_outer) = ring(&mut b, top, outer_radius);
    let (top_inner, v_top_inner) = ring(&mut b, top, inner_radius);
    let (bottom_outer, v_bottom_outer) = ring(&mut b, bottom, outer_radius);
    let (floor_inner, v_floor_inner) = ring(&mut b, floor, inner_radius);

    let up = b.surface(SurfaceData::Plane {
        transform: translated(top),
    });
    let top_face = b.face(Some(up), 1);
    let top_outer_loop = b.outer_loop(top_face);
    let e_top_outer = b.edge(top_face, top_outer_loop, Some(top_outer), full, Some([v_top_outer; 2]));
    let top_hole = b.inner_loop(top_face);
    let e_top_inner = b.edge(top_face, top_hole, Some(top_inner), full, Some([v_top_inner; 2]));

    let down = b.surface(SurfaceData::Plane {
        transform: translated(bottom),
    });
    let bottom_face = b.face(Some(down), -1);
    let bottom_loop = b.outer_loop(bottom_face);
    let e_bottom = b.edge(bottom_face, bottom_loop, Some(bottom_outer), full, Some([v_bottom_outer; 2]));

    let floor_surface = b.surface(SurfaceData::Plane {
        transform: translated(floor),
    });
    let floor_face = b.face(Some(floor_surface), 1);
    let floor_loop = b.outer_loop(floor_face);
    let e_floor = b.edge(floor_face, floor_loop, Some(floor_inner), full, Some([v_floor_inner; 2]));

    let outer_surface = b.surface(SurfaceData::Cylinder {
        radius: outer_radius,
        transform: None,
    });
    let outer_wall = b.face(Some(outer_surface), 1);
    let outer_loop = b.outer_loop(outer_wall);
    b.share_edge(e_bottom, outer_wall, outer_loop);
    b.share_edge(e_top_outer, outer_wall, outer_loop);

    let inner_surface = b.surface(SurfaceData::Cylinder {
        radius: inner_radius,
        transform: None,
    });
    let inner_wall = b.face(Some(inner_surface), -1);
    let inner_loop = b.outer_loop(inner_wall);
    b.share_edge(e_floor, inner_wall, inner_loop);
    b.share_edge(e_top_inner, inner_wall, inner_loop);

    b.build()
}

/// Two straight curve segments, `a` and `b`, each given by its end points.
pub fn two_segments(a: [[f64; 3]; 2], b: [[f64; 3]; 2]) -> ProductData {
    let mut builder = ProductBuilder::new();
    builder.line_segment(a[0], a[1]);
    builder.line_segment(b[0], b[1]);
    builder.build()
}

/// Sloped road centerline as a single line-strip segment.
pub fn ramp(points: &[[f64; 3]]) -> ProductData {
    let mut b = ProductBuilder::new();
    b.strip_segment(points);
    b.build()
}
