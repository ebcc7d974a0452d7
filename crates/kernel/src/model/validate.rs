use tracing::{debug, instrument};

use crate::error::{KernelError, KernelResult, lookup};

use super::ProductData;

fn check(len: usize, index: usize, kind: &'static str) -> KernelResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(KernelError::IndexOutOfRange { kind, index, len })
    }
}

fn check_all(len: usize, indices: &[usize], kind: &'static str) -> KernelResult<()> {
    indices.iter().try_for_each(|&i| check(len, i, kind))
}

impl ProductData {
    /// Check that every cross reference resolves and that half-edges agree
    /// with their edges, loops and faces.
    #[instrument(skip(self), fields(faces = self.faces.len(), edges = self.edges.len()))]
    pub fn validate(&self) -> KernelResult<()> {
        for g in &self.geometries {
            check_all(self.shells.len(), &g.shells, "shell")?;
            check_all(self.solids.len(), &g.solids, "solid")?;
            check_all(self.curve_segments.len(), &g.curve_segments, "curve segment")?;
            check_all(self.snapping_points.len(), &g.snapping_points, "snapping point")?;
        }
        for inst in &self.instances {
            check(self.geometries.len(), inst.geometry, "geometry")?;
        }
        for solid in &self.solids {
            check_all(self.shells.len(), &solid.shells, "shell")?;
        }
        for shell in &self.shells {
            check_all(self.faces.len(), &shell.faces, "face")?;
        }
        for face in &self.faces {
            if let Some(s) = face.surface {
                check(self.surfaces.len(), s, "surface")?;
            }
            check(self.loops.len(), face.outer_loop, "loop")?;
            check_all(self.loops.len(), &face.inner_loops, "loop")?;
            if let Some(tri) = &face.triangulation {
                if tri.indices.len() % 3 != 0 || tri.vertices.len() % 2 != 0 {
                    return Err(KernelError::topology("triangulation buffers are not whole"));
                }
                for &i in &tri.indices {
                    check(tri.vertex_count(), i as usize, "triangulation vertex")?;
                }
            }
        }
        for l in &self.loops {
            check_all(self.half_edges.len(), &l.half_edges, "half-edge")?;
        }
        for seg in &self.curve_segments {
            check(self.curves_3d.len(), seg.curve_3d, "curve3D")?;
        }
        for (index, edge) in self.edges.iter().enumerate() {
            self.validate_edge(index)?;
            if let Some(c) = edge.curve_3d {
                check(self.curves_3d.len(), c, "curve3D")?;
            }
            if let Some(vs) = edge.vertices {
                check_all(self.vertices.len(), &vs, "vertex")?;
            }
        }
        for (index, he) in self.half_edges.iter().enumerate() {
            check(self.edges.len(), he.edge, "edge")?;
            let face = lookup(&self.faces, he.face, "face")?;
            let l = lookup(&self.loops, he.loop_index, "loop")?;
            if let Some(c) = he.curve_2d {
                check(self.curves_2d.len(), c, "curve2D")?;
            }
            if !l.half_edges.contains(&index) {
                return Err(KernelError::topology(format!(
                    "half-edge {index} is not part of its loop {}",
                    he.loop_index
                )));
            }
            let on_face = face.outer_loop == he.loop_index || face.inner_loops.contains(&he.loop_index);
            if !on_face {
                return Err(KernelError::topology(format!(
                    "loop {} of half-edge {index} does not bound face {}",
                    he.loop_index, he.face
                )));
            }
        }
        debug!("product data validated");
        Ok(())
    }

    fn validate_edge(&self, index: usize) -> KernelResult<()> {
        let edge = &self.edges[index];
        if edge.half_edges.is_empty() || edge.half_edges.len() > 2 {
            return Err(KernelError::topology(format!(
                "edge {index} has {} half-edges",
                edge.half_edges.len()
            )));
        }
        for &he in &edge.half_edges {
            let half_edge = lookup(&self.half_edges, he, "half-edge")?;
            if half_edge.edge != index {
                return Err(KernelError::topology(format!(
                    "half-edge {he} does not point back at edge {index}"
                )));
            }
        }
        if edge.is_virtual {
            let faces: Vec<usize> = edge
                .half_edges
                .iter()
                .map(|&he| self.half_edges[he].face)
                .collect();
            if faces.windows(2).any(|w| w[0] != w[1]) {
                return Err(KernelError::topology(format!(
                    "virtual edge {index} joins two different faces"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{ProductData, Units};

    const SQUARE: &str = r#"{
        "units": "mm",
        "version": 3,
        "vertices": [
            {"position": [0, 0, 0]}, {"position": [1, 0, 0]},
            {"position": [1, 1, 0]}, {"position": [0, 1, 0]}
        ],
        "geometries": [{"shells": [0]}],
        "instances": [{"geometry": 0}],
        "shells": [{"faces": [0]}],
        "faces": [{"surface": 0, "outerLoop": 0}],
        "surfaces": [{"kind": "plane"}],
        "loops": [{"halfEdges": [0, 1, 2, 3]}],
        "curves3D": [
            {"kind": "line", "origin": [0, 0, 0], "direction": [1, 0, 0]},
            {"kind": "line", "origin": [1, 0, 0], "direction": [0, 1, 0]},
            {"kind": "line", "origin": [1, 1, 0], "direction": [-1, 0, 0]},
            {"kind": "line", "origin": [0, 1, 0], "direction": [0, -1, 0]}
        ],
        "edges": [
            {"curve3D": 0, "parameterBounds": [0, 1], "vertices": [0, 1], "halfEdges": [0]},
            {"curve3D": 1, "parameterBounds": [0, 1], "vertices": [1, 2], "halfEdges": [1]},
            {"curve3D": 2, "parameterBounds": [0, 1], "vertices": [2, 3], "halfEdges": [2]},
            {"curve3D": 3, "parameterBounds": [0, 1], "vertices": [3, 0], "halfEdges": [3]}
        ],
        "halfEdges": [
            {"edge": 0, "face": 0, "loop": 0},
            {"edge": 1, "face": 0, "loop": 0},
            {"edge": 2, "face": 0, "loop": 0},
            {"edge": 3, "face": 0, "loop": 0}
        ]
    }"#;

    #[test]
    fn test_parse_and_validate() {
        let product = ProductData::from_json(SQUARE).unwrap();
        assert_eq!(product.units, Units::Millimeters);
        assert!((product.unit_scale() - 0.001).abs() < 1e-15);
        assert_eq!(product.version, Some(3));
        assert_eq!(product.half_edges[0].direction, 1);
        product.validate().unwrap();
        assert_eq!(product.instance_faces(0).unwrap(), vec![0]);
        assert_eq!(product.face_edges(0).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(product.loop_vertices(0).unwrap().len(), 4);
    }

    #[test]
    fn test_unknown_units_are_meters() {
        let product = ProductData::from_json(r#"{"units": "furlong"}"#).unwrap();
        assert_eq!(product.units, Units::Meters);
        assert_eq!(ProductData::from_json("{}").unwrap().units, Units::Meters);
    }

    #[test]
    fn test_out_of_range_reference() {
        let mut product = ProductData::from_json(SQUARE).unwrap();
        product.faces[0].surface = Some(7);
        let err = product.validate().unwrap_err();
        assert_eq!(err.tag(), "index");
    }

    #[test]
    fn test_virtual_edge_must_stay_on_one_face() {
        let mut product = ProductData::from_json(SQUARE).unwrap();
        product.faces.push(product.faces[0].clone());
        product.shells[0].faces.push(1);
        product.edges[0].is_virtual = true;
        product.edges[0].half_edges = vec![0, 1];
        product.half_edges[1].edge = 0;
        product.half_edges[1].face = 1;
        let err = product.validate().unwrap_err();
        assert_eq!(err.tag(), "topology");
    }

    #[test]
    fn test_half_edge_must_point_back_at_edge() {
        let mut product = ProductData::from_json(SQUARE).unwrap();
        product.half_edges[0].edge = 1;
        assert_eq!(product.validate().unwrap_err().tag(), "topology");
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let err = ProductData::from_json("{\"faces\": 3}").unwrap_err();
        assert_eq!(err.tag(), "parse");
    }
}
