//! Outline scenarios: silhouettes of a triangulated sphere and trim loops of
//! a box, under a few views.

use brep_kernel::geometry::transform::Transform;
use brep_kernel::GeometryFactory;
use brep_outline::{OutlineConfig, object_outlines, projected_loops};
use brep_test_harness::assertions::*;
use brep_test_harness::{fixtures, init_tracing};

// ── Scenario 1: Sphere silhouette ───────────────────────────────────────

#[test]
fn test_sphere_silhouette_is_one_closed_loop() {
    init_tracing();
    let product = fixtures::sphere(2.0, 8, 7);
    product.validate().unwrap();

    let loops = projected_loops(
        &GeometryFactory::default(),
        &product,
        0,
        0,
        &Transform::identity(),
        &OutlineConfig::default(),
    )
    .unwrap();

    assert_loop_counts(&loops, 1, 0, "sphere").unwrap();
    assert!(loops.trim_loops.is_empty(), "a closed surface has no trim loops");
    for p in &loops.contour_loops[0].points {
        let r = (p.x * p.x + p.y * p.y).sqrt();
        assert!(r > 1.7 && r <= 2.0 + 1e-9, "silhouette radius {r}");
    }
}

#[test]
fn test_sphere_silhouette_under_tilted_view() {
    let product = fixtures::sphere(1.0, 12, 9);
    let loops = object_outlines(
        &GeometryFactory::default(),
        &product,
        0,
        &Transform::rotation_x(0.3),
        &OutlineConfig::default(),
    )
    .unwrap();
    assert_loop_counts(&loops, 1, 0, "tilted sphere").unwrap();
}

#[test]
fn test_translated_instance_moves_silhouette() {
    let mut product = fixtures::sphere(1.0, 8, 7);
    product.instances[0].transformation = Some(Transform::translation(5.0, 0.0, 0.0).m);
    let loops = projected_loops(
        &GeometryFactory::default(),
        &product,
        0,
        0,
        &Transform::identity(),
        &OutlineConfig::default(),
    )
    .unwrap();
    assert_loop_counts(&loops, 1, 0, "moved sphere").unwrap();
    for p in &loops.loops[0].points {
        assert!((p.x - 5.0).hypot(p.y) <= 1.0 + 1e-9);
    }
}

// ── Scenario 2: Box trim loops ──────────────────────────────────────────

#[test]
fn test_box_from_above_shows_top_rim() {
    let product = fixtures::box_solid([2.0, 1.0, 1.0]);
    let loops = object_outlines(
        &GeometryFactory::default(),
        &product,
        0,
        &Transform::identity(),
        &OutlineConfig::default(),
    )
    .unwrap();

    // Only the top face looks at the viewer; side faces are edge-on.
    assert_eq!(loops.trim_loops.len(), 1);
    assert!(loops.contour_loops.is_empty());
    assert_loop_counts(&loops, 1, 0, "box rim").unwrap();
    for p in &loops.trim_loops[0].points {
        assert!((-1e-9..=2.0 + 1e-9).contains(&p.x));
        assert!((-1e-9..=1.0 + 1e-9).contains(&p.y));
    }
}

#[test]
fn test_back_face_has_no_outline() {
    let product = fixtures::box_solid([1.0, 1.0, 1.0]);
    // Face 0 is the bottom, facing away from a viewer looking down -Z.
    let loops = projected_loops(
        &GeometryFactory::default(),
        &product,
        0,
        0,
        &Transform::identity(),
        &OutlineConfig::default(),
    )
    .unwrap();
    assert!(loops.is_empty());
}

#[test]
fn test_flattening_view_is_rejected() {
    let product = fixtures::box_solid([1.0, 1.0, 1.0]);
    let err = object_outlines(
        &GeometryFactory::default(),
        &product,
        0,
        &Transform::scaling(1.0, 1.0, 0.0),
        &OutlineConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err.tag(), "contract");
}
