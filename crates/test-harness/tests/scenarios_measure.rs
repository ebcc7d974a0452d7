//! Measurement scenarios on built products: segments, box faces and
//! cylinders in their radius-aware modes.

use std::f64::consts::FRAC_PI_2;

use brep_kernel::geometry::point::Point3d;
use brep_kernel::geometry::transform::Transform;
use brep_kernel::measure::{CylinderMeasure, ParametricEntity, PointEntity, SingleMeasurementValues};
use brep_kernel::model::Units;
use brep_kernel::{EntityRef, GeometryFactory, MeasureEntity, MeasureSettings, ProductData, measure};
use brep_test_harness::assertions::*;
use brep_test_harness::{ProductBuilder, fixtures, init_tracing};

fn segment(object: &str, index: usize) -> MeasureEntity {
    MeasureEntity::CurveSegment(ParametricEntity {
        object_id: object.into(),
        path_index: index,
        instance_index: 0,
        parameter: None,
    })
}

fn face(object: &str, index: usize) -> MeasureEntity {
    MeasureEntity::Face(ParametricEntity {
        object_id: object.into(),
        path_index: index,
        instance_index: 0,
        parameter: None,
    })
}

fn vertex(x: f64, y: f64, z: f64) -> MeasureEntity {
    MeasureEntity::Vertex(PointEntity {
        object_id: "free".into(),
        parameter: Point3d::new(x, y, z),
    })
}

fn closest() -> MeasureSettings {
    MeasureSettings {
        cylinder_measure: CylinderMeasure::Closest,
    }
}

/// Measure two entities that both live in `product`.
fn measure_in(
    product: &ProductData,
    a: &MeasureEntity,
    b: &MeasureEntity,
    settings_a: Option<&MeasureSettings>,
) -> Result<brep_kernel::measure::DuoMeasurementValues, HarnessError> {
    let factory = GeometryFactory::default();
    let product_b = match b {
        MeasureEntity::Vertex(_) => None,
        _ => Some(product),
    };
    let values = measure(
        &factory,
        EntityRef::new(a, Some(product)),
        Some(EntityRef::new(b, product_b)),
        settings_a,
        None,
    )
    .unwrap();
    expect_duo(values, "measure")
}

// ── Scenario 1: Parallel segments ───────────────────────────────────────

#[test]
fn test_parallel_segments_one_meter_apart() {
    init_tracing();
    let product = fixtures::two_segments(
        [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
        [[0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
    );
    product.validate().unwrap();

    let duo = measure_in(&product, &segment("road", 0), &segment("road", 1), None).unwrap();
    assert_distances(&duo, [1.0, 0.0, 1.0, 0.0], 1e-9, "parallel segments").unwrap();
    assert!(duo.angle.is_none());
}

#[test]
fn test_segment_order_only_swaps_touch_points() {
    let product = fixtures::two_segments(
        [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
        [[1.0, 1.0, 1.0], [1.0, 3.0, 1.0]],
    );
    let ab = measure_in(&product, &segment("x", 0), &segment("x", 1), None).unwrap();
    let ba = measure_in(&product, &segment("x", 1), &segment("x", 0), None).unwrap();

    assert_close(ab.distance, 2.0_f64.sqrt(), 1e-9, "skew distance").unwrap();
    assert_close(ba.distance, ab.distance, 1e-12, "symmetric distance").unwrap();
    assert_point_close(&ab.measure_info_a.point, &ba.measure_info_b.point, 1e-9, "swapped a").unwrap();
    assert_point_close(&ab.measure_info_b.point, &ba.measure_info_a.point, 1e-9, "swapped b").unwrap();
}

#[test]
fn test_segment_to_point() {
    let product = fixtures::two_segments(
        [[0.0, 0.0, 0.0], [4.0, 0.0, 0.0]],
        [[0.0, 5.0, 0.0], [1.0, 5.0, 0.0]],
    );
    let duo = measure_in(&product, &segment("x", 0), &vertex(1.0, 0.0, 3.0), None).unwrap();
    assert_distances(&duo, [3.0, 0.0, 0.0, 3.0], 1e-9, "segment to point").unwrap();
    assert_close(duo.measure_info_a.parameter.unwrap(), 1.0, 1e-9, "foot parameter").unwrap();
}

// ── Scenario 2: Box faces ───────────────────────────────────────────────

#[test]
fn test_box_opposite_faces_are_offset() {
    let product = fixtures::box_solid([2.0, 1.0, 3.0]);
    product.validate().unwrap();

    // Faces 0 and 1 are the bottom and the top.
    let duo = measure_in(&product, &face("box", 0), &face("box", 1), None).unwrap();
    assert_close(duo.distance.abs(), 3.0, 1e-9, "face offset").unwrap();
    assert_close(duo.distance_z, 3.0, 1e-9, "offset along Z").unwrap();
    assert!(duo.angle.is_none());
}

#[test]
fn test_box_adjacent_faces_report_right_angle() {
    let product = fixtures::box_solid([1.0, 1.0, 1.0]);
    let duo = measure_in(&product, &face("box", 0), &face("box", 2), None).unwrap();
    assert_close(duo.angle.unwrap(), FRAC_PI_2, 1e-9, "fold angle").unwrap();
}

#[test]
fn test_box_face_area() {
    let product = fixtures::box_solid([2.0, 1.5, 1.0]);
    let factory = GeometryFactory::default();
    let top = face("box", 1);
    let values = measure(&factory, EntityRef::new(&top, Some(&product)), None, None, None).unwrap();
    match expect_single(values, "top face").unwrap() {
        SingleMeasurementValues::Plane { normal, area, .. } => {
            assert_close(normal.z, 1.0, 1e-12, "outward normal").unwrap();
            assert_close(area.unwrap(), 3.0, 1e-9, "face area").unwrap();
        }
        other => panic!("expected plane values, got {other:?}"),
    }
}

#[test]
fn test_millimeter_box_measures_in_meters() {
    let mut product = fixtures::box_solid([1000.0, 1000.0, 250.0]);
    product.units = Units::Millimeters;
    let duo = measure_in(&product, &face("box", 0), &face("box", 1), None).unwrap();
    assert_close(duo.distance.abs(), 0.25, 1e-9, "mm offset").unwrap();
}

#[test]
fn test_instance_transform_moves_measured_face() {
    let mut b = ProductBuilder::new();
    b.line_segment([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
    b.instance_transform(&Transform::translation(0.0, 0.0, 5.0));
    let product = b.build();

    let duo = measure_in(&product, &segment("x", 0), &vertex(0.5, 0.0, 0.0), None).unwrap();
    assert_distances(&duo, [5.0, 0.0, 0.0, 5.0], 1e-9, "placed segment").unwrap();
}

// ── Scenario 3: Cylinders ───────────────────────────────────────────────

#[test]
fn test_full_cylinder_closest_mode() {
    init_tracing();
    let product = fixtures::cylinder(0.5, 2.0, true);
    product.validate().unwrap();

    let settings = closest();
    let duo = measure_in(&product, &face("pipe", 0), &vertex(3.0, 0.0, 1.0), Some(&settings)).unwrap();
    assert_close(duo.distance, 2.5, 1e-9, "closest wall distance").unwrap();
    assert_point_close(&duo.measure_info_a.point, &Point3d::new(0.5, 0.0, 1.0), 1e-9, "wall point")
        .unwrap();
    assert_eq!(duo.measure_info_a.valid_measure_settings, Some(true));
}

#[test]
fn test_full_cylinder_center_mode() {
    let product = fixtures::cylinder(0.5, 2.0, true);
    let duo = measure_in(&product, &face("pipe", 0), &vertex(3.0, 0.0, 1.0), None).unwrap();
    assert_close(duo.distance, 3.0, 1e-9, "axis distance").unwrap();
    assert_eq!(duo.measure_info_a.valid_measure_settings, Some(true));
}

#[test]
fn test_half_cylinder_falls_back_to_axis() {
    let product = fixtures::cylinder(0.5, 2.0, false);
    product.validate().unwrap();

    let settings = closest();
    let duo = measure_in(&product, &face("half", 0), &vertex(3.0, 0.0, 1.0), Some(&settings)).unwrap();
    assert_close(duo.distance, 3.0, 1e-9, "axis distance").unwrap();
    assert_eq!(duo.measure_info_a.valid_measure_settings, Some(false));
}

#[test]
fn test_single_cylinder_reports_axis() {
    let product = fixtures::cylinder(0.25, 4.0, true);
    let factory = GeometryFactory::default();
    let pipe = face("pipe", 0);
    let values = measure(&factory, EntityRef::new(&pipe, Some(&product)), None, None, None).unwrap();
    match expect_single(values, "cylinder").unwrap() {
        SingleMeasurementValues::Cylinder {
            radius,
            length,
            valid_measure_settings,
            ..
        } => {
            assert_close(radius, 0.25, 1e-12, "radius").unwrap();
            assert_close(length, 4.0, 1e-9, "axis length").unwrap();
            assert!(valid_measure_settings);
        }
        other => panic!("expected cylinder values, got {other:?}"),
    }
}

#[test]
fn test_unresolvable_entity_measures_nothing() {
    let factory = GeometryFactory::default();
    let a = segment("missing", 0);
    let b = vertex(0.0, 0.0, 0.0);
    let values = measure(
        &factory,
        EntityRef::new(&a, None),
        Some(EntityRef::new(&b, None)),
        None,
        None,
    )
    .unwrap();
    assert!(values.is_none());
}
