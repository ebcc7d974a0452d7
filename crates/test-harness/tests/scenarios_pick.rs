//! Picking scenarios: kind precedence, vertex snapping, instances and units.

use brep_kernel::geometry::point::Point3d;
use brep_kernel::geometry::transform::Transform;
use brep_kernel::model::{SurfaceData, Units};
use brep_kernel::{GeometryFactory, MeasureEntity, PickConfig, PickInterface, PickTolerance, ProductData};
use brep_test_harness::assertions::*;
use brep_test_harness::{ProductBuilder, fixtures, init_tracing};

fn interface(product: &ProductData) -> PickInterface {
    PickInterface::build(&GeometryFactory::default(), product, "obj", PickConfig::default()).unwrap()
}

fn tolerance(segment: Option<f64>, edge: Option<f64>, face: Option<f64>, point: Option<f64>) -> PickTolerance {
    PickTolerance {
        segment,
        edge,
        face,
        point,
    }
}

/// Unit square plate in the XY plane with a centerline segment across it.
fn plate_with_centerline() -> ProductData {
    let mut b = ProductBuilder::new();
    let surface = b.surface(SurfaceData::Plane { transform: None });
    let face = b.face(Some(surface), 1);
    let outer = b.outer_loop(face);
    let corners = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
    let v: Vec<usize> = corners.iter().map(|&c| b.vertex(c)).collect();
    for k in 0..4 {
        b.line_edge(face, outer, v[k], v[(k + 1) % 4]);
    }
    b.line_segment([0.0, 0.5, 0.0], [1.0, 0.5, 0.0]);
    b.build()
}

// ── Scenario 1: Precedence ──────────────────────────────────────────────

#[test]
fn test_segment_wins_over_face() {
    init_tracing();
    let product = plate_with_centerline();
    product.validate().unwrap();
    let pick = interface(&product);

    let all = tolerance(Some(0.01), Some(0.01), Some(0.01), None);
    let hit = pick.pick(&Point3d::new(0.25, 0.5, 0.0), &all).unwrap().unwrap();
    match &hit.entity {
        MeasureEntity::CurveSegment(e) => {
            assert_eq!(e.path_index, 0);
            assert_close(e.parameter.unwrap(), 0.25, 1e-9, "segment parameter").unwrap();
        }
        other => panic!("expected a curve segment, got {other:?}"),
    }

    let faces_only = tolerance(None, None, Some(0.01), None);
    let hit = pick.pick(&Point3d::new(0.25, 0.5, 0.0), &faces_only).unwrap().unwrap();
    assert_eq!(hit.entity.draw_kind(), "face");
}

#[test]
fn test_box_face_pick() {
    let pick = interface(&fixtures::box_solid([1.0, 1.0, 1.0]));
    let hit = pick
        .pick(&Point3d::new(0.4, 0.6, 1.005), &tolerance(None, None, Some(0.01), None))
        .unwrap()
        .unwrap();
    match &hit.entity {
        MeasureEntity::Face(e) => assert_eq!(e.path_index, 1, "top face"),
        other => panic!("expected a face, got {other:?}"),
    }
    assert_point_close(&hit.connection_point, &Point3d::new(0.4, 0.6, 1.0), 1e-9, "face foot").unwrap();
}

#[test]
fn test_box_edge_pick() {
    let pick = interface(&fixtures::box_solid([1.0, 1.0, 1.0]));
    let hit = pick
        .pick(&Point3d::new(0.5, -0.01, 1.0), &tolerance(None, Some(0.05), Some(0.05), None))
        .unwrap()
        .unwrap();
    match &hit.entity {
        // Edge 4 is the first edge of the top face, (0,0,1) to (1,0,1).
        MeasureEntity::Edge(e) => {
            assert_eq!(e.path_index, 4);
            assert_close(e.parameter.unwrap(), 0.5, 1e-9, "edge parameter").unwrap();
        }
        other => panic!("expected an edge, got {other:?}"),
    }
}

#[test]
fn test_vertex_snaps_before_edge() {
    let pick = interface(&fixtures::box_solid([1.0, 1.0, 1.0]));
    let hit = pick
        .pick(&Point3d::new(0.98, 0.0, 1.0), &tolerance(None, Some(0.05), None, Some(0.05)))
        .unwrap()
        .unwrap();
    match &hit.entity {
        MeasureEntity::Vertex(p) => {
            assert_point_close(&p.parameter, &Point3d::new(1.0, 0.0, 1.0), 1e-9, "corner").unwrap();
        }
        other => panic!("expected a vertex, got {other:?}"),
    }
}

#[test]
fn test_nothing_in_reach() {
    let pick = interface(&fixtures::box_solid([1.0, 1.0, 1.0]));
    let all = tolerance(Some(0.01), Some(0.01), Some(0.01), Some(0.01));
    assert!(pick.pick(&Point3d::new(5.0, 5.0, 5.0), &all).unwrap().is_none());
}

#[test]
fn test_nearest_of_two_faces_wins() {
    // Inside both planes' reach near the top rim: the side wall is closer.
    let pick = interface(&fixtures::box_solid([1.0, 1.0, 1.0]));
    let hit = pick
        .pick(&Point3d::new(1.002, 0.5, 0.995), &tolerance(None, None, Some(0.01), None))
        .unwrap()
        .unwrap();
    match &hit.entity {
        MeasureEntity::Face(e) => assert_eq!(e.path_index, 3, "x = 1 side face"),
        other => panic!("expected a face, got {other:?}"),
    }
    assert_point_close(&hit.connection_point, &Point3d::new(1.0, 0.5, 0.995), 1e-9, "side foot")
        .unwrap();
}

// ── Scenario 2: Curved faces and circle edges ───────────────────────────

#[test]
fn test_cylinder_wall_pick() {
    let pick = interface(&fixtures::cylinder(0.5, 2.0, true));

    let hit = pick
        .pick(&Point3d::new(-0.505, 0.0, 1.0), &tolerance(None, None, Some(0.01), None))
        .unwrap()
        .unwrap();
    match &hit.entity {
        MeasureEntity::Face(e) => assert_eq!(e.path_index, 0),
        other => panic!("expected the cylinder face, got {other:?}"),
    }
    assert_point_close(&hit.connection_point, &Point3d::new(-0.5, 0.0, 1.0), 1e-9, "wall foot")
        .unwrap();

    let miss = pick
        .pick(&Point3d::new(-0.55, 0.0, 1.0), &tolerance(None, None, Some(0.01), None))
        .unwrap();
    assert!(miss.is_none());
}

#[test]
fn test_circle_edge_pick() {
    let pick = interface(&fixtures::cylinder(0.5, 2.0, true));
    let hit = pick
        .pick(&Point3d::new(0.0, 0.505, 0.0), &tolerance(None, Some(0.01), None, None))
        .unwrap()
        .unwrap();
    match &hit.entity {
        // Edge 0 is the bottom circle.
        MeasureEntity::Edge(e) => {
            assert_eq!(e.path_index, 0);
            assert_close(e.parameter.unwrap(), std::f64::consts::FRAC_PI_2, 1e-9, "angle").unwrap();
        }
        other => panic!("expected the bottom circle, got {other:?}"),
    }
    assert_point_close(&hit.connection_point, &Point3d::new(0.0, 0.5, 0.0), 1e-9, "rim").unwrap();

    let top = pick
        .pick(&Point3d::new(-0.5, 0.0, 2.004), &tolerance(None, Some(0.01), None, None))
        .unwrap()
        .unwrap();
    match &top.entity {
        MeasureEntity::Edge(e) => assert_eq!(e.path_index, 2, "top circle"),
        other => panic!("expected the top circle, got {other:?}"),
    }
}

#[test]
fn test_half_cylinder_corner_snap() {
    // Arcs carry no end snaps; the corner comes from the straight edge
    // starting there.
    let pick = interface(&fixtures::cylinder(0.5, 2.0, false));
    let hit = pick
        .pick(&Point3d::new(-0.49, 0.01, 0.0), &tolerance(None, None, None, Some(0.05)))
        .unwrap()
        .unwrap();
    match &hit.entity {
        MeasureEntity::Vertex(p) => {
            assert_point_close(&p.parameter, &Point3d::new(-0.5, 0.0, 0.0), 1e-9, "corner").unwrap();
        }
        other => panic!("expected a vertex, got {other:?}"),
    }
}

// ── Scenario 3: Snapping points ─────────────────────────────────────────

#[test]
fn test_isolated_snapping_point() {
    let mut b = ProductBuilder::new();
    b.snapping_point([2.0, 2.0, 0.0]);
    let pick = interface(&b.build());

    let hit = pick
        .pick(&Point3d::new(2.05, 1.95, 0.0), &tolerance(None, None, None, Some(0.01)))
        .unwrap()
        .unwrap();
    assert_eq!(hit.entity.draw_kind(), "vertex");
    assert_point_close(&hit.connection_point, &Point3d::new(2.0, 2.0, 0.0), 1e-12, "snap").unwrap();

    let far = pick
        .pick(&Point3d::new(2.5, 2.0, 0.0), &tolerance(None, None, None, Some(0.01)))
        .unwrap();
    assert!(far.is_none());
}

// ── Scenario 4: Instances and units ─────────────────────────────────────

#[test]
fn test_second_instance_is_reported() {
    let mut b = ProductBuilder::new();
    b.line_segment([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
    b.add_instance(&Transform::translation(10.0, 0.0, 0.0));
    let pick = interface(&b.build());

    let hit = pick
        .pick(&Point3d::new(10.5, 0.0, 0.0), &tolerance(Some(0.01), None, None, None))
        .unwrap()
        .unwrap();
    match &hit.entity {
        MeasureEntity::CurveSegment(e) => assert_eq!(e.instance_index, 1),
        other => panic!("expected a curve segment, got {other:?}"),
    }
    assert_point_close(&hit.connection_point, &Point3d::new(10.5, 0.0, 0.0), 1e-9, "world point")
        .unwrap();
}

#[test]
fn test_millimeter_product_picks_in_meters() {
    let mut product = fixtures::box_solid([1000.0, 1000.0, 1000.0]);
    product.units = Units::Millimeters;
    let pick = interface(&product);

    // 5 mm above the top face with a 1 cm tolerance.
    let hit = pick
        .pick(&Point3d::new(0.5, 0.5, 1.005), &tolerance(None, None, Some(0.01), None))
        .unwrap()
        .unwrap();
    assert_eq!(hit.entity.draw_kind(), "face");
    assert_point_close(&hit.connection_point, &Point3d::new(0.5, 0.5, 1.0), 1e-9, "scaled foot").unwrap();

    // 2 cm away is out of reach.
    let miss = pick
        .pick(&Point3d::new(0.5, 0.5, 1.02), &tolerance(None, None, Some(0.01), None))
        .unwrap();
    assert!(miss.is_none());
}
