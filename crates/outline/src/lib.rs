//! Silhouette and trim outlines of triangulated B-rep faces, projected into
//! a 2D view.
//!
//! Each face's triangulation is lifted through its surface into world space
//! ([`topology::TriangleTopology`]); contours are traced where vertex normals
//! change facing relative to the view, trim loops follow the visible part of
//! the face boundary.

pub mod contour;
pub mod error;
pub mod topology;

use brep_kernel::GeometryFactory;
use brep_kernel::ProductData;
use brep_kernel::geometry::point::Point2d;
use brep_kernel::geometry::transform::{NormalMatrix, Transform};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

pub use contour::{Polyline, contours, stitch_strips, trim_loops};
pub use error::{OutlineError, OutlineResult};
pub use topology::TriangleTopology;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutlineConfig {
    /// View-space normal depth above which a vertex faces the viewer.
    pub facing_epsilon: f64,
    /// Largest allowed distance between merged seam vertices.
    pub seam_epsilon: f64,
    /// Slack for normal-sign agreement checks.
    pub normal_epsilon: f64,
    /// Endpoint distance for joining strips across faces.
    pub stitch_epsilon: f64,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            facing_epsilon: 1e-4,
            seam_epsilon: 1e-4,
            normal_epsilon: 1e-4,
            stitch_epsilon: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedLoop {
    pub points: Vec<Point2d>,
    pub closed: bool,
}

/// 2D outlines in view space. `loops` holds the trim loops followed by the
/// contour loops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedLoops {
    pub loops: Vec<ProjectedLoop>,
    pub trim_loops: Vec<ProjectedLoop>,
    pub contour_loops: Vec<ProjectedLoop>,
}

impl ProjectedLoops {
    fn new(trim: &[Polyline], contour: &[Polyline], view: &Transform) -> Self {
        let project = |lines: &[Polyline]| -> Vec<ProjectedLoop> {
            lines
                .iter()
                .map(|l| ProjectedLoop {
                    points: l.project(view),
                    closed: l.closed,
                })
                .collect()
        };
        let trim_loops = project(trim);
        let contour_loops = project(contour);
        let loops = trim_loops.iter().chain(&contour_loops).cloned().collect();
        Self {
            loops,
            trim_loops,
            contour_loops,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }
}

fn view_normals(view: &Transform) -> OutlineResult<NormalMatrix> {
    view.normal_matrix().ok_or(OutlineError::SingularView)
}

/// Outlines of one face of an instance under the world-to-view transform
/// `view`. Faces without a triangulation or surface give empty loops.
#[instrument(skip(factory, product, view, config))]
pub fn projected_loops(
    factory: &GeometryFactory,
    product: &ProductData,
    instance: usize,
    face: usize,
    view: &Transform,
    config: &OutlineConfig,
) -> OutlineResult<ProjectedLoops> {
    let normals = view_normals(view)?;
    let world = factory.world_transform(product, instance)?;
    let Some(topology) = TriangleTopology::build(factory, product, face, &world, config)? else {
        return Ok(ProjectedLoops::default());
    };
    let trim = trim_loops(&topology, &normals, config);
    let contour = contours(&topology, &normals, config);
    Ok(ProjectedLoops::new(&trim, &contour, view))
}

/// Outlines of every face of an instance, with open contour strips joined
/// across neighbouring faces.
#[instrument(skip(factory, product, view, config))]
pub fn object_outlines(
    factory: &GeometryFactory,
    product: &ProductData,
    instance: usize,
    view: &Transform,
    config: &OutlineConfig,
) -> OutlineResult<ProjectedLoops> {
    let normals = view_normals(view)?;
    let world = factory.world_transform(product, instance)?;
    let mut trim = Vec::new();
    let mut contour = Vec::new();
    for face in product.instance_faces(instance)? {
        let Some(topology) = TriangleTopology::build(factory, product, face, &world, config)?
        else {
            continue;
        };
        trim.extend(trim_loops(&topology, &normals, config));
        contour.extend(contours(&topology, &normals, config));
    }
    let contour = stitch_strips(contour, config.stitch_epsilon);
    info!(
        trim = trim.len(),
        contour = contour.len(),
        "object outlines traced"
    );
    Ok(ProjectedLoops::new(&trim, &contour, view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    use serde_json::json;

    /// UV sphere of radius 1 with one vertex per pole and a virtual seam edge
    /// at u = 0 / u = 2π. `stacks` rows, `columns` columns.
    fn sphere(columns: usize, stacks: usize, seam_reversed: bool) -> ProductData {
        let rows = stacks - 1;
        let index = |i: usize, j: usize| (2 + i * rows + (j - 1)) as u32;
        let mut uv = vec![0.0, -FRAC_PI_2, 0.0, FRAC_PI_2];
        for i in 0..=columns {
            for j in 1..stacks {
                uv.push(2.0 * PI * i as f64 / columns as f64);
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

        let mut left = vec![0];
        left.extend((1..stacks).map(|j| index(0, j)));
        left.push(1);
        let mut right = vec![1];
        right.extend((1..stacks).rev().map(|j| index(columns, j)));
        right.push(0);
        if seam_reversed {
            right.reverse();
        }

        let data = json!({
            "geometries": [{"shells": [0]}],
            "instances": [{"geometry": 0}],
            "shells": [{"faces": [0]}],
            "faces": [{
                "surface": 0,
                "outerLoop": 0,
                "triangulation": {"vertices": uv, "indices": indices}
            }],
            "loops": [{"halfEdges": [0, 1]}],
            "edges": [{"parameterBounds": [0, 1], "halfEdges": [0, 1], "virtual": true}],
            "halfEdges": [
                {"edge": 0, "face": 0, "loop": 0, "faceVertexIndices": left},
                {"edge": 0, "face": 0, "loop": 0, "faceVertexIndices": right}
            ],
            "surfaces": [{"kind": "sphere", "radius": 1.0}]
        });
        serde_json::from_value(data).unwrap()
    }

    #[test]
    fn test_sphere_has_one_closed_contour() {
        let product = sphere(8, 7, false);
        let factory = GeometryFactory::default();
        let config = OutlineConfig::default();
        let world = factory.world_transform(&product, 0).unwrap();
        let topology = TriangleTopology::build(&factory, &product, 0, &world, &config)
            .unwrap()
            .unwrap();
        assert_eq!(topology.boundary_edge_count(), 0);

        let normals = Transform::identity().normal_matrix().unwrap();
        let lines = contours(&topology, &normals, &config);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].closed);
        assert_eq!(lines[0].points.len(), 16);
        for p in &lines[0].points {
            assert!(p.z.abs() < 1e-12);
            let r = p.x.hypot(p.y);
            assert!(r > 0.85 && r < 1.0, "r = {r}");
        }
        assert!(trim_loops(&topology, &normals, &config).is_empty());
    }

    #[test]
    fn test_projected_loops_of_sphere() {
        let product = sphere(12, 9, false);
        let loops = projected_loops(
            &GeometryFactory::default(),
            &product,
            0,
            0,
            &Transform::rotation_x(0.3),
            &OutlineConfig::default(),
        )
        .unwrap();
        assert!(loops.trim_loops.is_empty());
        assert_eq!(loops.contour_loops.len(), 1);
        assert_eq!(loops.loops.len(), 1);
        assert!(loops.contour_loops[0].closed);
    }

    #[test]
    fn test_seam_mismatch_is_error() {
        let product = sphere(8, 7, true);
        let factory = GeometryFactory::default();
        let world = factory.world_transform(&product, 0).unwrap();
        let err = TriangleTopology::build(&factory, &product, 0, &world, &OutlineConfig::default())
            .unwrap_err();
        assert!(matches!(err, OutlineError::SeamMismatch { .. }));
        assert_eq!(err.tag(), "seam");
    }

    #[test]
    fn test_inverted_winding_is_error() {
        let mut product = sphere(8, 7, false);
        let tri = product.faces[0].triangulation.as_mut().unwrap();
        for t in tri.indices.chunks_exact_mut(3) {
            t.swap(1, 2);
        }
        let factory = GeometryFactory::default();
        let world = factory.world_transform(&product, 0).unwrap();
        let err = TriangleTopology::build(&factory, &product, 0, &world, &OutlineConfig::default())
            .unwrap_err();
        assert!(matches!(err, OutlineError::NormalSign { .. }));
    }

    #[test]
    fn test_singular_view_rejected() {
        let product = sphere(8, 7, false);
        let err = projected_loops(
            &GeometryFactory::default(),
            &product,
            0,
            0,
            &Transform::scaling(1.0, 1.0, 0.0),
            &OutlineConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.tag(), "contract");
    }

    #[test]
    fn test_face_without_triangulation_is_empty() {
        let mut product = sphere(8, 7, false);
        product.faces[0].triangulation = None;
        let loops = object_outlines(
            &GeometryFactory::default(),
            &product,
            0,
            &Transform::identity(),
            &OutlineConfig::default(),
        )
        .unwrap();
        assert!(loops.is_empty());
    }
}
