pub mod error;
pub mod geometry;
pub mod model;
pub mod factory;
pub mod measure;
pub mod pick;
pub mod manhole;
pub mod profile;

pub use error::{KernelError, KernelResult, NativeError};
pub use factory::GeometryFactory;
pub use geometry::native::{NumericLibrary, SoftwareNumerics};
pub use manhole::{ManholeMeasureValues, detect_manhole};
pub use measure::{EntityRef, MeasureEntity, MeasureSettings, MeasurementValues, measure};
pub use model::ProductData;
pub use pick::{PickConfig, PickInterface, PickResult, PickTolerance};
pub use profile::{ProfilePoint, segment_profile};

/// Tolerances for geometric comparisons.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tolerance {
    /// Points closer than this are considered coincident (meters).
    pub coincidence: f64,
    /// Parameter-space tolerance for curve/surface evaluations.
    pub parametric: f64,
    /// Allowed deviation of a circle edge's parameter span from 2π for it
    /// to count as a full circle.
    pub full_circle: f64,
    /// `1 - |cos|` below which two directions are parallel. Also sets the
    /// gap for perpendicular checks.
    pub parallel: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            coincidence: 1e-7,
            parametric: 1e-9,
            full_circle: 1e-4,
            parallel: 1e-9,
        }
    }
}

impl Tolerance {
    pub fn points_coincident(
        &self,
        a: &geometry::point::Point3d,
        b: &geometry::point::Point3d,
    ) -> bool {
        a.distance_to(b) < self.coincidence
    }

    pub fn is_zero_length(&self, length: f64) -> bool {
        length.abs() < self.coincidence
    }

    pub fn is_full_circle(&self, sweep: f64) -> bool {
        (sweep.abs() - std::f64::consts::TAU).abs() < self.full_circle
    }

    pub fn are_parallel(&self, a: &geometry::vector::Vec3, b: &geometry::vector::Vec3) -> bool {
        a.is_parallel_to(b, self.parallel)
    }

    /// Perpendicular within the same angular gap that `are_parallel`
    /// allows: `1 - |cos| < parallel` is about `sqrt(2 * parallel)` radians.
    pub fn are_perpendicular(
        &self,
        a: &geometry::vector::Vec3,
        b: &geometry::vector::Vec3,
    ) -> bool {
        a.is_perpendicular_to(b, (2.0 * self.parallel).sqrt())
    }
}
