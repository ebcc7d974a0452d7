//! Tolerance-based picking and snapping.
//!
//! A [`PickInterface`] is built once per object. It keeps, per instance,
//! local-space curves and surfaces with bounding boxes so that a world point
//! can be resolved to the nearest segment, edge, vertex, face or snapping
//! point.

pub mod polygon;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{KernelError, KernelResult, lookup};
use crate::factory::GeometryFactory;
use crate::geometry::curves::Curve3d;
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::Surface;
use crate::geometry::transform::{BoundingBox, Transform};
use crate::measure::{MeasureEntity, ParametricEntity, PointEntity};
use crate::model::ProductData;

use polygon::PolygonFace;

/// Per-kind pick radii in meters. Kinds without a tolerance are not picked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PickTolerance {
    pub segment: Option<f64>,
    pub edge: Option<f64>,
    pub face: Option<f64>,
    pub point: Option<f64>,
}

impl PickTolerance {
    fn scaled(&self, unit_scale: f64) -> Self {
        let local = |t: Option<f64>| t.map(|t| t / unit_scale);
        Self {
            segment: local(self.segment),
            edge: local(self.edge),
            face: local(self.face),
            point: local(self.point),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PickConfig {
    /// Per-axis box half-size (meters) for isolated snapping points.
    pub snap_fallback_tolerance: f64,
}

impl Default for PickConfig {
    fn default() -> Self {
        Self {
            snap_fallback_tolerance: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickResult {
    pub entity: MeasureEntity,
    /// Picked location on the entity, in world space.
    pub connection_point: Point3d,
}

#[derive(Debug)]
struct PickSegment {
    index: usize,
    curve: Curve3d,
}

#[derive(Debug)]
struct PickEdge {
    index: usize,
    curve: Curve3d,
    bbox: BoundingBox,
    /// Vertex positions at the begin/end bound, for non-arc edges only.
    ends: Option<[Point3d; 2]>,
}

#[derive(Debug)]
struct PickSurface {
    face: usize,
    surface: Surface,
    bbox: Option<BoundingBox>,
}

#[derive(Debug)]
struct PickInstance {
    index: usize,
    to_world: Transform,
    to_local: Transform,
    segments: Vec<PickSegment>,
    edges: Vec<PickEdge>,
    surfaces: Vec<PickSurface>,
    polygons: Vec<PolygonFace>,
    snapping_points: Vec<Point3d>,
}

/// Candidate found in local space, before conversion to a result.
#[derive(Debug, Clone, Copy)]
enum Hit {
    Segment { index: usize, parameter: f64 },
    Edge { index: usize, parameter: f64 },
    Vertex,
    Face { index: usize },
}

#[derive(Debug)]
pub struct PickInterface {
    object_id: String,
    unit_scale: f64,
    config: PickConfig,
    instances: Vec<PickInstance>,
}

fn curve_bbox(curve: &Curve3d) -> KernelResult<BoundingBox> {
    let mut bbox = BoundingBox::empty();
    for t in curve.sample_parameters(16) {
        bbox.expand_to_include(&curve.position(t)?);
    }
    Ok(bbox)
}

impl PickInterface {
    #[instrument(skip(factory, product, config))]
    pub fn build(
        factory: &GeometryFactory,
        product: &ProductData,
        object_id: &str,
        config: PickConfig,
    ) -> KernelResult<Self> {
        let local = Transform::identity();
        let mut instances = Vec::with_capacity(product.instances.len());

        for (index, instance) in product.instances.iter().enumerate() {
            let to_world = factory.world_transform(product, index)?;
            let to_local = to_world.inverse().ok_or_else(|| {
                KernelError::contract(format!("instance {index} has a singular transform"))
            })?;
            let geometry = lookup(&product.geometries, instance.geometry, "geometry")?;

            let mut segments = Vec::new();
            for &s in &geometry.curve_segments {
                segments.push(PickSegment {
                    index: s,
                    curve: factory.curve3d_from_segment(product, s, &local)?,
                });
            }

            let mut edges = Vec::new();
            for e in product.instance_edges(index)? {
                let edge = lookup(&product.edges, e, "edge")?;
                if edge.is_virtual {
                    continue;
                }
                let Some(curve) = factory.curve3d_from_edge(product, e, &local)? else {
                    continue;
                };
                let ends = match (edge.vertices, &curve) {
                    (_, Curve3d::Arc(_)) | (None, _) => None,
                    (Some([a, b]), _) => Some([product.vertex(a)?, product.vertex(b)?]),
                };
                edges.push(PickEdge {
                    index: e,
                    bbox: curve_bbox(&curve)?,
                    curve,
                    ends,
                });
            }

            let mut surfaces = Vec::new();
            let mut polygons = Vec::new();
            for f in product.instance_faces(index)? {
                match factory.surface(product, f, &local)? {
                    Some(surface) => {
                        let mut bbox = BoundingBox::empty();
                        for e in product.face_edges(f)? {
                            if let Some(curve) = factory.curve3d_from_edge(product, e, &local)? {
                                bbox = bbox.union(&curve_bbox(&curve)?);
                            }
                        }
                        surfaces.push(PickSurface {
                            face: f,
                            surface,
                            bbox: bbox.is_valid().then_some(bbox),
                        });
                    }
                    None => {
                        let face = lookup(&product.faces, f, "face")?;
                        let outer = product.loop_vertices(face.outer_loop)?;
                        let holes = face
                            .inner_loops
                            .iter()
                            .map(|&l| product.loop_vertices(l))
                            .collect::<KernelResult<Vec<_>>>()?;
                        match PolygonFace::new(f, &outer, &holes) {
                            Some(polygon) => polygons.push(polygon),
                            None => debug!(face = f, "face has no surface and no usable loop"),
                        }
                    }
                }
            }

            let snapping_points = geometry
                .snapping_points
                .iter()
                .map(|&s| {
                    lookup(&product.snapping_points, s, "snapping point")
                        .map(|sp| Point3d::from_array(sp.position))
                })
                .collect::<KernelResult<Vec<_>>>()?;

            instances.push(PickInstance {
                index,
                to_world,
                to_local,
                segments,
                edges,
                surfaces,
                polygons,
                snapping_points,
            });
        }

        info!(
            instances = instances.len(),
            edges = instances.iter().map(|i| i.edges.len()).sum::<usize>(),
            faces = instances
                .iter()
                .map(|i| i.surfaces.len() + i.polygons.len())
                .sum::<usize>(),
            "pick interface built"
        );
        Ok(Self {
            object_id: object_id.to_string(),
            unit_scale: product.unit_scale(),
            config,
            instances,
        })
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Resolve a world point to the entity it touches.
    ///
    /// Segments win over everything else; then the closest edge or vertex;
    /// then faces; isolated snapping points are the last resort.
    pub fn pick(
        &self,
        position: &Point3d,
        tolerance: &PickTolerance,
    ) -> KernelResult<Option<PickResult>> {
        let tol = tolerance.scaled(self.unit_scale);

        if let Some(seg_tol) = tol.segment {
            for inst in &self.instances {
                let p = inst.to_local.transform_point(position);
                for seg in &inst.segments {
                    let (t, q) = seg.curve.closest_point(&p)?;
                    if q.distance_to(&p) <= seg_tol {
                        let hit = Hit::Segment {
                            index: seg.index,
                            parameter: t,
                        };
                        return Ok(Some(self.result(inst, hit, q)));
                    }
                }
            }
        }

        if tol.edge.is_some() || tol.point.is_some() {
            let mut best: Option<(f64, &PickInstance, Hit, Point3d)> = None;
            for inst in &self.instances {
                let p = inst.to_local.transform_point(position);
                for edge in &inst.edges {
                    if let Some((d, hit, q)) = Self::pick_edge(edge, &p, &tol)? {
                        if best.as_ref().is_none_or(|(bd, ..)| d < *bd) {
                            best = Some((d, inst, hit, q));
                        }
                    }
                }
            }
            if let Some((_, inst, hit, q)) = best {
                return Ok(Some(self.result(inst, hit, q)));
            }
        }

        if let Some(face_tol) = tol.face {
            for inst in &self.instances {
                let p = inst.to_local.transform_point(position);
                if let Some((hit, q)) = Self::pick_face(inst, &p, face_tol)? {
                    return Ok(Some(self.result(inst, hit, q)));
                }
            }
        }

        if tol.point.is_some() {
            let fallback = self.config.snap_fallback_tolerance / self.unit_scale;
            let mut best: Option<(f64, &PickInstance, Point3d)> = None;
            for inst in &self.instances {
                let p = inst.to_local.transform_point(position);
                for s in &inst.snapping_points {
                    let within = (s.x - p.x).abs() <= fallback
                        && (s.y - p.y).abs() <= fallback
                        && (s.z - p.z).abs() <= fallback;
                    let d = s.distance_to(&p);
                    if within && best.as_ref().is_none_or(|(bd, ..)| d < *bd) {
                        best = Some((d, inst, *s));
                    }
                }
            }
            if let Some((_, inst, q)) = best {
                return Ok(Some(self.result(inst, Hit::Vertex, q)));
            }
        }

        Ok(None)
    }

    /// Vertex snap at a bound first; mid-edge only when no vertex qualifies.
    fn pick_edge(
        edge: &PickEdge,
        p: &Point3d,
        tol: &PickTolerance,
    ) -> KernelResult<Option<(f64, Hit, Point3d)>> {
        let reach = tol.edge.unwrap_or(0.0).max(tol.point.unwrap_or(0.0));
        if !edge.bbox.contains_within(p, reach) {
            return Ok(None);
        }

        if let (Some(point_tol), Some([start, end])) = (tol.point, edge.ends) {
            let (lo, hi) = (edge.curve.begin_param(), edge.curve.end_param());
            let t = edge.curve.invert(p)?;
            let nearer = if (t - lo).abs() <= (t - hi).abs() { start } else { end };
            let d = nearer.distance_to(p);
            if d <= point_tol {
                return Ok(Some((d, Hit::Vertex, nearer)));
            }
        }

        if let Some(edge_tol) = tol.edge {
            let (t, q) = edge.curve.closest_point(p)?;
            let d = q.distance_to(p);
            if d <= edge_tol {
                let hit = Hit::Edge {
                    index: edge.index,
                    parameter: t,
                };
                return Ok(Some((d, hit, q)));
            }
        }
        Ok(None)
    }

    /// Nearest analytic face first, then the nearest polygon face.
    fn pick_face(
        inst: &PickInstance,
        p: &Point3d,
        face_tol: f64,
    ) -> KernelResult<Option<(Hit, Point3d)>> {
        let mut nearest: Option<(f64, usize, Point3d)> = None;
        for s in &inst.surfaces {
            if s.bbox.is_some_and(|bbox| !bbox.contains_within(p, face_tol)) {
                continue;
            }
            let (_, q) = s.surface.closest_point(p)?;
            let d = q.distance_to(p);
            if d <= face_tol && nearest.is_none_or(|(bd, ..)| d < bd) {
                nearest = Some((d, s.face, q));
            }
        }
        if let Some((_, index, q)) = nearest {
            return Ok(Some((Hit::Face { index }, q)));
        }

        let mut best: Option<(f64, &PolygonFace)> = None;
        for poly in &inst.polygons {
            if !poly.bbox.contains_within(p, face_tol) {
                continue;
            }
            let d = poly.signed_distance(p).abs();
            if d <= face_tol && poly.contains(p) && best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, poly));
            }
        }
        Ok(best.map(|(_, poly)| (Hit::Face { index: poly.face }, poly.project(p))))
    }

    fn result(&self, inst: &PickInstance, hit: Hit, local: Point3d) -> PickResult {
        let connection_point = inst.to_world.transform_point(&local);
        let parametric = |path_index: usize, parameter: Option<f64>| ParametricEntity {
            object_id: self.object_id.clone(),
            path_index,
            instance_index: inst.index,
            parameter,
        };
        let entity = match hit {
            Hit::Segment { index, parameter } => {
                MeasureEntity::CurveSegment(parametric(index, Some(parameter)))
            }
            Hit::Edge { index, parameter } => MeasureEntity::Edge(parametric(index, Some(parameter))),
            Hit::Face { index } => MeasureEntity::Face(parametric(index, None)),
            Hit::Vertex => MeasureEntity::Vertex(PointEntity {
                object_id: self.object_id.clone(),
                parameter: connection_point,
            }),
        };
        debug!(kind = entity.draw_kind(), "picked");
        PickResult {
            entity,
            connection_point,
        }
    }
}
