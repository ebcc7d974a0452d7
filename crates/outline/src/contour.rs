//! Silhouette contours and trim loops traced over a [`TriangleTopology`].

use std::collections::BTreeMap;

use brep_kernel::geometry::point::{Point2d, Point3d};
use brep_kernel::geometry::transform::{NormalMatrix, Transform};
use tracing::debug;

use crate::OutlineConfig;
use crate::topology::TriangleTopology;

/// World-space polyline. Closed polylines do not repeat their first point.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point3d>,
    pub closed: bool,
}

impl Polyline {
    fn first(&self) -> Option<&Point3d> {
        self.points.first()
    }

    fn last(&self) -> Option<&Point3d> {
        self.points.last()
    }

    /// 2D view-space points: `view` applied, depth dropped.
    pub fn project(&self, view: &Transform) -> Vec<Point2d> {
        self.points
            .iter()
            .map(|p| {
                let q = view.transform_point(p);
                Point2d::new(q.x, q.y)
            })
            .collect()
    }
}

/// View-space normal depth and facing of every vertex.
struct Facing {
    z: Vec<f64>,
    front: Vec<bool>,
}

impl Facing {
    fn new(topology: &TriangleTopology, view: &NormalMatrix, epsilon: f64) -> Self {
        let z: Vec<f64> = topology
            .normals
            .iter()
            .map(|n| view.transform_normal(n).z)
            .collect();
        let front = z.iter().map(|&z| z > epsilon).collect();
        Self { z, front }
    }

    fn is_front(&self, v: u32) -> bool {
        self.front[v as usize]
    }
}

/// Point where the view-space normal depth changes sign along edge `edge`.
fn crossing(topology: &TriangleTopology, facing: &Facing, edge: usize) -> Point3d {
    let e = &topology.edges[edge];
    let (za, zb) = (facing.z[e.a as usize], facing.z[e.b as usize]);
    let t = if za != zb {
        (za / (za - zb)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    topology.position(e.a).lerp(&topology.position(e.b), t)
}

/// Trace the silhouette of a face: strips through triangles whose vertices
/// disagree on facing. Strips that come back to their first edge are closed.
pub fn contours(
    topology: &TriangleTopology,
    view: &NormalMatrix,
    config: &OutlineConfig,
) -> Vec<Polyline> {
    let facing = Facing::new(topology, view, config.facing_epsilon);
    let straddles: Vec<bool> = topology
        .edges
        .iter()
        .map(|e| facing.is_front(e.a) != facing.is_front(e.b))
        .collect();

    // A straddling triangle has exactly two straddling edges.
    let pairs: Vec<Option<[usize; 2]>> = topology
        .triangle_edges
        .iter()
        .map(|edges| {
            let mut it = edges.iter().copied().filter(|&e| straddles[e]);
            match (it.next(), it.next()) {
                (Some(a), Some(b)) => Some([a, b]),
                _ => None,
            }
        })
        .collect();

    let mut edge_done = vec![false; topology.edges.len()];
    let mut triangle_done = vec![false; topology.triangles.len()];
    let mut strips = Vec::new();

    // Open strips first, starting at edges on the mesh boundary, then cycles.
    let boundary_starts = (0..topology.edges.len())
        .filter(|&e| straddles[e] && topology.edges[e].triangles.len() != 2);
    let interior_starts = (0..topology.edges.len()).filter(|&e| straddles[e]);
    for start in boundary_starts.chain(interior_starts) {
        if edge_done[start] {
            continue;
        }
        edge_done[start] = true;
        let mut points = vec![crossing(topology, &facing, start)];
        let mut closed = false;
        let mut edge = start;
        while let Some(triangle) = topology.edges[edge]
            .triangles
            .iter()
            .copied()
            .find(|&t| !triangle_done[t])
        {
            triangle_done[triangle] = true;
            let Some([e0, e1]) = pairs[triangle] else {
                break;
            };
            let next = if e0 == edge { e1 } else { e0 };
            if next == start {
                closed = true;
                break;
            }
            if edge_done[next] {
                break;
            }
            edge_done[next] = true;
            points.push(crossing(topology, &facing, next));
            edge = next;
        }
        strips.push(Polyline { points, closed });
    }

    debug!(
        face = topology.face,
        strips = strips.len(),
        closed = strips.iter().filter(|s| s.closed).count(),
        "contours traced"
    );
    strips
}

/// Trace the face boundary on the visible side: boundary edges (one
/// adjacent triangle) of triangles with at least one front-facing vertex,
/// directed by the triangle winding.
pub fn trim_loops(
    topology: &TriangleTopology,
    view: &NormalMatrix,
    config: &OutlineConfig,
) -> Vec<Polyline> {
    let facing = Facing::new(topology, view, config.facing_epsilon);
    let mut next: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    let mut incoming: BTreeMap<u32, usize> = BTreeMap::new();
    for (index, t) in topology.triangles.iter().enumerate() {
        if !t.iter().any(|&v| facing.is_front(v)) {
            continue;
        }
        for (k, &edge) in topology.triangle_edges[index].iter().enumerate() {
            if topology.edges[edge].is_boundary() {
                let (from, to) = (t[k], t[(k + 1) % 3]);
                next.entry(from).or_default().push(to);
                *incoming.entry(to).or_default() += 1;
            }
        }
    }

    let mut loops = Vec::new();
    let starts: Vec<u32> = next
        .keys()
        .copied()
        .filter(|v| !incoming.contains_key(v))
        .collect();
    for start in starts {
        while let Some(chain) = follow(&mut next, start) {
            loops.push(to_polyline(topology, chain));
        }
    }
    while let Some(start) = next
        .iter()
        .find(|(_, targets)| !targets.is_empty())
        .map(|(&v, _)| v)
    {
        if let Some(chain) = follow(&mut next, start) {
            loops.push(to_polyline(topology, chain));
        }
    }
    loops
}

/// Consume directed edges from `start` until the chain ends or returns.
fn follow(next: &mut BTreeMap<u32, Vec<u32>>, start: u32) -> Option<Vec<u32>> {
    let mut chain = vec![start];
    let mut current = start;
    while let Some(to) = next.get_mut(&current).and_then(Vec::pop) {
        chain.push(to);
        if to == start {
            break;
        }
        current = to;
    }
    (chain.len() > 1).then_some(chain)
}

fn to_polyline(topology: &TriangleTopology, mut chain: Vec<u32>) -> Polyline {
    let closed = chain.len() > 2 && chain.first() == chain.last();
    if closed {
        chain.pop();
    }
    Polyline {
        points: chain.into_iter().map(|v| topology.position(v)).collect(),
        closed,
    }
}

/// Join open strips whose ends meet within `epsilon`, reversing strips as
/// needed. A chain whose ends meet becomes closed.
pub fn stitch_strips(strips: Vec<Polyline>, epsilon: f64) -> Vec<Polyline> {
    let meets = |a: Option<&Point3d>, b: Option<&Point3d>| match (a, b) {
        (Some(a), Some(b)) => a.distance_to(b) < epsilon,
        _ => false,
    };

    let (mut done, mut open): (Vec<Polyline>, Vec<Polyline>) =
        strips.into_iter().partition(|s| s.closed);
    open.reverse();
    while let Some(mut current) = open.pop() {
        loop {
            if current.points.len() > 2 && meets(current.first(), current.last()) {
                current.points.pop();
                current.closed = true;
                break;
            }
            let end = current.last().copied();
            if let Some(i) = open
                .iter()
                .position(|s| meets(s.first(), end.as_ref()) || meets(s.last(), end.as_ref()))
            {
                let mut tail = open.remove(i);
                if !meets(tail.first(), end.as_ref()) {
                    tail.points.reverse();
                }
                current.points.extend(tail.points.into_iter().skip(1));
                continue;
            }
            let start = current.first().copied();
            if let Some(i) = open
                .iter()
                .position(|s| meets(s.last(), start.as_ref()) || meets(s.first(), start.as_ref()))
            {
                let mut head = open.remove(i);
                if !meets(head.last(), start.as_ref()) {
                    head.points.reverse();
                }
                head.points.extend(current.points.into_iter().skip(1));
                current.points = head.points;
                continue;
            }
            break;
        }
        done.push(current);
    }
    done
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(points: &[(f64, f64)]) -> Polyline {
        Polyline {
            points: points.iter().map(|&(x, y)| Point3d::new(x, y, 0.0)).collect(),
            closed: false,
        }
    }

    #[test]
    fn test_stitch_square_from_pieces() {
        let pieces = vec![
            strip(&[(0.0, 0.0), (1.0, 0.0)]),
            // Reversed piece.
            strip(&[(1.0, 1.0), (1.0, 0.0)]),
            strip(&[(1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
        ];
        let stitched = stitch_strips(pieces, 1e-9);
        assert_eq!(stitched.len(), 1);
        assert!(stitched[0].closed);
        assert_eq!(stitched[0].points.len(), 4);
    }

    #[test]
    fn test_stitch_keeps_disjoint_strips_open() {
        let pieces = vec![
            strip(&[(0.0, 0.0), (1.0, 0.0)]),
            strip(&[(5.0, 5.0), (6.0, 5.0)]),
        ];
        let stitched = stitch_strips(pieces, 1e-9);
        assert_eq!(stitched.len(), 2);
        assert!(stitched.iter().all(|s| !s.closed));
    }

    #[test]
    fn test_stitch_prepends() {
        let pieces = vec![
            strip(&[(1.0, 0.0), (2.0, 0.0)]),
            strip(&[(0.0, 0.0), (1.0, 0.0)]),
        ];
        let stitched = stitch_strips(pieces, 1e-9);
        assert_eq!(stitched.len(), 1);
        let xs: Vec<f64> = stitched[0].points.iter().map(|p| p.x).collect();
        assert!(xs == vec![0.0, 1.0, 2.0] || xs == vec![2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_project_drops_depth() {
        let line = strip(&[(1.0, 2.0)]);
        let view = Transform::translation(0.0, 0.0, 5.0);
        let projected = line.project(&view);
        assert_eq!(projected, vec![Point2d::new(1.0, 2.0)]);
    }
}
