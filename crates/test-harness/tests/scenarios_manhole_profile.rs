//! Domain scenarios: manhole detection and road profiles.

use brep_kernel::{GeometryFactory, MeasureEntity, detect_manhole, segment_profile};
use brep_test_harness::assertions::*;
use brep_test_harness::fixtures::{self, ManholeShape};
use brep_test_harness::init_tracing;

fn face_index(entity: &MeasureEntity) -> usize {
    match entity {
        MeasureEntity::Face(e) => e.path_index,
        other => panic!("expected a face entity, got {other:?}"),
    }
}

// ── Scenario 1: Manholes ────────────────────────────────────────────────

#[test]
fn test_default_manhole_levels_and_walls() {
    init_tracing();
    let product = fixtures::manhole(ManholeShape::default(), "m");
    product.validate().unwrap();

    let values = detect_manhole(&GeometryFactory::default(), &product, "mh-1")
        .unwrap()
        .unwrap();
    assert_close(values.height, 2.0, 1e-9, "height").unwrap();
    assert_close(values.inner_height.unwrap(), 1.8, 1e-9, "inner height").unwrap();
    assert_close(values.top.elevation, 2.0, 1e-9, "top").unwrap();
    assert_close(values.bottom_outer.elevation, 0.0, 1e-9, "bottom").unwrap();

    // Faces are built top, bottom, floor, outer wall, inner wall.
    assert_eq!(face_index(&values.top.entity), 0);
    assert_eq!(face_index(&values.bottom_outer.entity), 1);
    assert_eq!(face_index(&values.bottom_inner.unwrap().entity), 2);
    let outer = values.outer.unwrap();
    let inner = values.inner.unwrap();
    assert_eq!(face_index(&outer.entity), 3);
    assert_eq!(face_index(&inner.entity), 4);
    assert_close(outer.radius, 0.8, 1e-9, "outer radius").unwrap();
    assert_close(inner.radius, 0.6, 1e-9, "inner radius").unwrap();
    assert_eq!(values.top.entity.object_id(), "mh-1");
}

#[test]
fn test_millimeter_manhole_is_scaled() {
    let shape = ManholeShape {
        top: 1500.0,
        bottom: 0.0,
        floor: 150.0,
        outer_radius: 500.0,
        inner_radius: 400.0,
    };
    let product = fixtures::manhole(shape, "mm");
    let values = detect_manhole(&GeometryFactory::default(), &product, "mh-2")
        .unwrap()
        .unwrap();
    assert_close(values.height, 1.5, 1e-9, "height in meters").unwrap();
    assert_close(values.outer.unwrap().radius, 0.5, 1e-9, "radius in meters").unwrap();
}

#[test]
fn test_shallow_manhole_rejected() {
    // 80 mm deep: below the 0.1 m minimum once scaled.
    let shape = ManholeShape {
        top: 80.0,
        bottom: 0.0,
        floor: 10.0,
        outer_radius: 300.0,
        inner_radius: 250.0,
    };
    let product = fixtures::manhole(shape, "mm");
    let values = detect_manhole(&GeometryFactory::default(), &product, "shallow").unwrap();
    assert!(values.is_none());
}

#[test]
fn test_segments_are_not_a_manhole() {
    let product = fixtures::two_segments(
        [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
        [[0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
    );
    let values = detect_manhole(&GeometryFactory::default(), &product, "road").unwrap();
    assert!(values.is_none());
}

// ── Scenario 2: Profiles ────────────────────────────────────────────────

#[test]
fn test_ramp_profile_hits_every_vertex() {
    let product = fixtures::ramp(&[[0.0, 0.0, 0.0], [3.0, 4.0, 1.0], [6.0, 8.0, 1.0]]);
    product.validate().unwrap();

    let points = segment_profile(&GeometryFactory::default(), &product, 0, &[0], 1.0).unwrap();
    assert!(points.windows(2).all(|w| w[0].station <= w[1].station));

    let first = points.first().unwrap();
    assert_close(first.station, 0.0, 1e-12, "start station").unwrap();
    let crest = points
        .iter()
        .find(|p| (p.station - 5.0).abs() < 1e-9)
        .expect("a sample on the middle vertex");
    assert_close(crest.elevation, 1.0, 1e-9, "crest elevation").unwrap();
    let last = points.last().unwrap();
    assert_close(last.station, 10.0, 1e-9, "end station").unwrap();
    assert_close(last.elevation, 1.0, 1e-9, "end elevation").unwrap();
}

#[test]
fn test_profile_step_controls_density() {
    let product = fixtures::ramp(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]]);
    let factory = GeometryFactory::default();
    let coarse = segment_profile(&factory, &product, 0, &[0], 5.0).unwrap();
    let fine = segment_profile(&factory, &product, 0, &[0], 0.5).unwrap();
    assert_eq!(coarse.len(), 3);
    assert_eq!(fine.len(), 21);
}

#[test]
fn test_profile_needs_exactly_one_segment() {
    let product = fixtures::two_segments(
        [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
        [[0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
    );
    let factory = GeometryFactory::default();

    let err = segment_profile(&factory, &product, 0, &[0, 1], 1.0).unwrap_err();
    assert_eq!(err.tag(), "profile");
    assert_eq!(err.to_string(), "multiple segments in profile");

    let err = segment_profile(&factory, &product, 0, &[], 1.0).unwrap_err();
    assert_eq!(err.to_string(), "no segment in profile");
}
