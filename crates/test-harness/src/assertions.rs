//! Assertion helpers that report what was expected and what came back.

use brep_kernel::geometry::point::Point3d;
use brep_kernel::measure::{DuoMeasurementValues, SingleMeasurementValues};
use brep_kernel::MeasurementValues;
use brep_outline::ProjectedLoops;

/// Failure of a harness assertion.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HarnessError {
    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("[{ctx}] expected a result, got none")]
    Missing { ctx: String },
}

fn failed(detail: String) -> Result<(), HarnessError> {
    Err(HarnessError::AssertionFailed { detail })
}

/// Assert `|actual - expected| <= tol`.
pub fn assert_close(actual: f64, expected: f64, tol: f64, ctx: &str) -> Result<(), HarnessError> {
    if (actual - expected).abs() <= tol {
        Ok(())
    } else {
        failed(format!(
            "[{}] expected {:.9}, got {:.9} (tol={})",
            ctx, expected, actual, tol,
        ))
    }
}

pub fn assert_point_close(
    actual: &Point3d,
    expected: &Point3d,
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let d = actual.distance_to(expected);
    if d <= tol {
        Ok(())
    } else {
        failed(format!(
            "[{}] expected ({:.6}, {:.6}, {:.6}), got ({:.6}, {:.6}, {:.6}), off by {:.3e}",
            ctx, expected.x, expected.y, expected.z, actual.x, actual.y, actual.z, d,
        ))
    }
}

/// Unwrap a two-entity measurement.
pub fn expect_duo(
    values: Option<MeasurementValues>,
    ctx: &str,
) -> Result<DuoMeasurementValues, HarnessError> {
    match values {
        Some(MeasurementValues::Duo(duo)) => Ok(duo),
        Some(other) => Err(HarnessError::AssertionFailed {
            detail: format!("[{}] expected a two-entity measurement, got {:?}", ctx, other),
        }),
        None => Err(HarnessError::Missing {
            ctx: ctx.to_string(),
        }),
    }
}

/// Unwrap a single-entity measurement.
pub fn expect_single(
    values: Option<MeasurementValues>,
    ctx: &str,
) -> Result<SingleMeasurementValues, HarnessError> {
    match values {
        Some(MeasurementValues::Single(single)) => Ok(single),
        Some(other) => Err(HarnessError::AssertionFailed {
            detail: format!("[{}] expected a single measurement, got {:?}", ctx, other),
        }),
        None => Err(HarnessError::Missing {
            ctx: ctx.to_string(),
        }),
    }
}

/// Assert the distance components of a measurement.
pub fn assert_distances(
    duo: &DuoMeasurementValues,
    expected: [f64; 4],
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let [d, dx, dy, dz] = expected;
    assert_close(duo.distance, d, tol, &format!("{ctx}: distance"))?;
    assert_close(duo.distance_x, dx, tol, &format!("{ctx}: distanceX"))?;
    assert_close(duo.distance_y, dy, tol, &format!("{ctx}: distanceY"))?;
    assert_close(duo.distance_z, dz, tol, &format!("{ctx}: distanceZ"))
}

/// Assert how many closed and open loops an outline has.
pub fn assert_loop_counts(
    loops: &ProjectedLoops,
    closed: usize,
    open: usize,
    ctx: &str,
) -> Result<(), HarnessError> {
    let actual_closed = loops.loops.iter().filter(|l| l.closed).count();
    let actual_open = loops.loops.len() - actual_closed;
    if actual_closed == closed && actual_open == open {
        Ok(())
    } else {
        failed(format!(
            "[{}] expected {} closed / {} open loops, got {} / {} (trim={}, contour={})",
            ctx,
            closed,
            open,
            actual_closed,
            actual_open,
            loops.trim_loops.len(),
            loops.contour_loops.len(),
        ))
    }
}
