//! Elevation profile along a curve segment.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{KernelError, KernelResult};
use crate::factory::GeometryFactory;
use crate::geometry::point::Point3d;
use crate::model::ProductData;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePoint {
    /// Horizontal distance travelled from the start of the segment.
    pub station: f64,
    pub elevation: f64,
    pub position: Point3d,
}

/// Sample the selected curve segment into (station, elevation) pairs in
/// world units.
///
/// Exactly one segment may be selected. Samples fall on every tessellation
/// marker plus a uniform parameter grid fine enough for `step` meters of
/// curve length between samples.
#[instrument(skip(factory, product))]
pub fn segment_profile(
    factory: &GeometryFactory,
    product: &ProductData,
    instance: usize,
    segments: &[usize],
    step: f64,
) -> KernelResult<Vec<ProfilePoint>> {
    let segment = match segments {
        [] => {
            return Err(KernelError::Profile {
                reason: "no segment in profile".into(),
            });
        }
        [segment] => *segment,
        _ => {
            return Err(KernelError::Profile {
                reason: "multiple segments in profile".into(),
            });
        }
    };
    if step.is_nan() || step <= 0.0 {
        return Err(KernelError::contract(format!("profile step must be positive, got {step}")));
    }

    let transform = factory.world_transform(product, instance)?;
    let curve = factory.curve3d_from_segment(product, segment, &transform)?;
    let (t0, t1) = (curve.begin_param(), curve.end_param());
    let steps = (curve.length()? / step).ceil().clamp(1.0, 100_000.0) as usize;

    let mut params: Vec<f64> = (0..=steps)
        .map(|i| t0 + (t1 - t0) * i as f64 / steps as f64)
        .chain(
            curve
                .tessellation_parameters()
                .iter()
                .copied()
                .filter(|t| (t0.min(t1)..=t0.max(t1)).contains(t)),
        )
        .collect();
    if t1 >= t0 {
        params.sort_by(f64::total_cmp);
    } else {
        params.sort_by(|a, b| b.total_cmp(a));
    }
    params.dedup_by(|a, b| (*a - *b).abs() < 1e-12);

    let mut points = Vec::with_capacity(params.len());
    let mut station = 0.0;
    let mut previous: Option<Point3d> = None;
    for t in params {
        let position = curve.position(t)?;
        if let Some(prev) = previous {
            station += (position.x - prev.x).hypot(position.y - prev.y);
        }
        previous = Some(position);
        points.push(ProfilePoint {
            station,
            elevation: position.z,
            position,
        });
    }
    Ok(points)
}
